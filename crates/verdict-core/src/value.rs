//! Dynamic values inspected by rules.
//!
//! Properties validated by rules are not statically typed: a schema may
//! declare that a field holds a number, a callable, an instance of some
//! class, or that it is absent altogether. [`Value`] models that space,
//! including [`Value::Missing`], the absence sentinel that is distinct from
//! [`Value::Null`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CallError, CoreError};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// The absence sentinel: a property that was never set.
    #[default]
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Function(Callable),
    Instance(Instance),
}

pub(crate) static MISSING: Value = Value::Missing;

/// Coarse classification of a [`Value`], also usable as a class reference
/// when lifting a rule-like value into a structural type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Any,
    Missing,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Function,
    Instance,
}

impl Kind {
    /// Whether `value` belongs to this kind.
    pub fn matches(self, value: &Value) -> bool {
        self == Kind::Any || value.kind() == self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Any => "Any",
            Kind::Missing => "Missing",
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::Array => "Array",
            Kind::Object => "Object",
            Kind::Function => "Function",
            Kind::Instance => "Instance",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Missing => Kind::Missing,
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
            Value::Function(_) => Kind::Function,
            Value::Instance(_) => Kind::Instance,
        }
    }

    /// Kind name, or the class name for instances.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Instance(instance) => instance.class().name(),
            other => other.kind().as_str(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Strict identity without coercion.
    ///
    /// Data variants compare by content; callables and instances compare by
    /// identity. Values of different variants are never equal, and `NaN` is
    /// not equal to itself.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => a.strict_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Convert a data-only value to JSON.
    ///
    /// Missing properties inside objects are skipped; non-finite numbers
    /// become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => {
                Json::Array(items.iter().map(Value::to_json).collect::<Result<_, _>>()?)
            }
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.iter() {
                    if value.is_missing() {
                        continue;
                    }
                    map.insert(key.clone(), value.to_json()?);
                }
                Json::Object(map)
            }
            Value::Missing | Value::Function(_) | Value::Instance(_) => {
                return Err(CoreError::NotRepresentable(self.to_string()))
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => f.write_str("Missing"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Function(c) => fmt::Debug::fmt(c, f),
            Value::Instance(i) => fmt::Debug::fmt(i, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => write!(f, "[array({})]", items.len()),
            Value::Object(o) => write!(f, "{{object({})}}", o.len()),
            Value::Function(c) => write!(f, "[function {}]", c.name().unwrap_or("anonymous")),
            Value::Instance(i) => write!(f, "[instance {}]", i.class().name()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Function(c)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// A container of named properties.
///
/// Reading an absent key yields [`Value::Missing`] rather than an `Option`,
/// matching how rules observe unset properties.
#[derive(Clone, Default, PartialEq)]
pub struct Object {
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// The property at `key`, or [`Value::Missing`] when unset.
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&MISSING)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Call the method stored at `key` with this object as receiver.
    pub fn invoke(&self, key: &str, args: &[Value]) -> Result<Value, CallError> {
        match self.get(key) {
            Value::Function(callable) => callable.call(&Value::Object(self.clone()), args),
            other => Err(CallError::NotCallable(format!("{} is {}", key, other.type_name()))),
        }
    }

    fn strict_eq(&self, other: &Object) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((ka, va), (kb, vb))| ka == kb && va.strict_eq(vb))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(&self.fields).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Signature of native callables stored in values.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync;

/// A callable value: a native function plus identity.
///
/// Wrapping a callable records a tag on the result, so a wrapper can tell
/// whether it has already been applied to a given function.
#[derive(Clone)]
pub struct Callable {
    func: Arc<NativeFn>,
    name: Option<Arc<str>>,
    tags: Arc<[u64]>,
}

impl Callable {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            name: None,
            tags: Arc::from(Vec::new()),
        }
    }

    pub fn named<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            name: Some(Arc::from(name)),
            ..Self::new(func)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke with an explicit receiver.
    pub fn call(&self, receiver: &Value, args: &[Value]) -> Result<Value, CallError> {
        (self.func)(receiver, args)
    }

    /// Build a new callable around this one, tagged with `tag`.
    ///
    /// `wrapper` receives the wrapped callable along with each call's
    /// receiver and arguments.
    pub fn wrap<F>(&self, tag: u64, wrapper: F) -> Callable
    where
        F: Fn(&Callable, &Value, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        let inner = self.clone();
        let tags: Vec<u64> = self.tags.iter().copied().chain(std::iter::once(tag)).collect();
        Callable {
            func: Arc::new(move |receiver, args| wrapper(&inner, receiver, args)),
            name: self.name.clone(),
            tags: Arc::from(tags),
        }
    }

    pub fn is_wrapped_by(&self, tag: u64) -> bool {
        self.tags.contains(&tag)
    }

    /// Number of wrappers applied to the original function.
    pub fn wrap_depth(&self) -> usize {
        self.tags.len()
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// A named class with optional single inheritance.
///
/// Classes compare by identity: two classes created with the same name are
/// still distinct.
#[derive(Clone)]
pub struct Class(Arc<ClassDef>);

struct ClassDef {
    name: String,
    parent: Option<Class>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(ClassDef {
            name: name.into(),
            parent: None,
        }))
    }

    pub fn extends(name: impl Into<String>, parent: &Class) -> Self {
        Self(Arc::new(ClassDef {
            name: name.into(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if Arc::ptr_eq(&class.0, &other.0) {
                return true;
            }
            current = class.parent();
        }
        false
    }

    pub fn instantiate(&self, fields: Object) -> Value {
        Value::Instance(Instance(Arc::new(InstanceData {
            class: self.clone(),
            fields,
        })))
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.0.name)
    }
}

/// An object created from a [`Class`].
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

struct InstanceData {
    class: Class,
    fields: Object,
}

impl Instance {
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    pub fn fields(&self) -> &Object {
        &self.0.fields
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.0.class)
            .field("fields", &self.0.fields)
            .finish()
    }
}
