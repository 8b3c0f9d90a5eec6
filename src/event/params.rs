//! Custom event parameters.
//!
//! Callers hand over loosely-shaped parameter objects. Objects are shared
//! handles, so a caller can build a graph that refers back to itself; the
//! deep copy into the backend payload detects that (and excessive nesting)
//! instead of looping.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::error::AnalyticsError;
use crate::host::Payload;

/// Nesting limit for custom parameter objects.
pub const MAX_PARAM_DEPTH: usize = 8;

#[derive(Debug, Clone)]
pub enum ParamValue {
    Str(String),
    Num(f64),
    Bool(bool),
    StrList(Vec<String>),
    /// Present key without a value; stripped from the payload.
    Undefined,
    Object(ParamObject),
}

/// Shared, mutable parameter object.
#[derive(Clone, Default)]
pub struct ParamObject(Rc<RefCell<BTreeMap<String, ParamValue>>>);

impl ParamObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: &str, value: impl Into<ParamValue>) {
        self.0.borrow_mut().insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Deep copy into a JSON object, dropping `Undefined` and non-finite
    /// numbers.
    pub fn to_payload(&self) -> Result<Payload, AnalyticsError> {
        let mut ancestors = Vec::new();
        copy_object(self, &mut ancestors, "")
    }

    fn id(&self) -> *const RefCell<BTreeMap<String, ParamValue>> {
        Rc::as_ptr(&self.0)
    }
}

// Keys only: a derived impl would recurse forever on a cyclic object.
impl fmt::Debug for ParamObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(map) => f.debug_set().entries(map.keys()).finish(),
            Err(_) => f.write_str("{<borrowed>}"),
        }
    }
}

type ObjectId = *const RefCell<BTreeMap<String, ParamValue>>;

fn copy_object(
    object: &ParamObject,
    ancestors: &mut Vec<ObjectId>,
    path: &str,
) -> Result<Payload, AnalyticsError> {
    if ancestors.contains(&object.id()) {
        return Err(AnalyticsError::CircularParameterReference(path.to_string()));
    }
    if ancestors.len() >= MAX_PARAM_DEPTH {
        return Err(AnalyticsError::ParameterTooDeep(MAX_PARAM_DEPTH));
    }
    ancestors.push(object.id());

    let mut out = Map::new();
    for (key, value) in object.0.borrow().iter() {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        let copied = match value {
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Num(n) => match Number::from_f64(*n) {
                Some(n) => Value::Number(n),
                None => continue,
            },
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::StrList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            ParamValue::Undefined => continue,
            ParamValue::Object(child) => Value::Object(copy_object(child, ancestors, &child_path)?),
        };
        out.insert(key.clone(), copied);
    }

    ancestors.pop();
    Ok(out)
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Num(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Num(v as f64)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Num(v as f64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Num(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::StrList(v)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(v: &[&str]) -> Self {
        ParamValue::StrList(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<ParamObject> for ParamValue {
    fn from(v: ParamObject) -> Self {
        ParamValue::Object(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Undefined, Into::into)
    }
}
