//! Runtime value types for the Opal interpreter.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The type tag of a runtime value.
///
/// `typeof` reports these names, and `as` / `is` resolve their target from
/// them. The `Object` tag covers every struct instance regardless of its
/// declared struct name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Array,
    Bool,
    Float,
    Int,
    String,
    Object,
}

impl ScalarType {
    /// Resolve a type name as written in source (`x as int`, `x is string`).
    pub fn from_name(name: &str) -> Option<ScalarType> {
        match name {
            "array" => Some(ScalarType::Array),
            "bool" => Some(ScalarType::Bool),
            "float" => Some(ScalarType::Float),
            "int" => Some(ScalarType::Int),
            "string" => Some(ScalarType::String),
            "object" => Some(ScalarType::Object),
            _ => None,
        }
    }

    /// The name reported by `typeof`.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Array => "array",
            ScalarType::Bool => "bool",
            ScalarType::Float => "float",
            ScalarType::Int => "int",
            ScalarType::String => "string",
            ScalarType::Object => "object",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instance of a user-declared struct.
///
/// Members are fixed at instantiation to the declared name list; only their
/// values change afterwards. The member map is shared, so copies of the
/// surrounding [`Value`] alias the same instance.
#[derive(Debug)]
pub struct StructInstance {
    name: String,
    members: RefCell<HashMap<String, Value>>,
}

impl StructInstance {
    /// Create an instance with every declared member bound to the
    /// "no value yet" placeholder.
    pub fn instantiate(name: &str, member_names: &[String]) -> Self {
        let members = member_names
            .iter()
            .map(|m| (m.clone(), Value::Empty))
            .collect();
        Self {
            name: name.to_string(),
            members: RefCell::new(members),
        }
    }

    /// The declared struct name.
    pub fn struct_name(&self) -> &str {
        &self.name
    }

    /// Whether `member` is among the declared members.
    pub fn has_member(&self, member: &str) -> bool {
        self.members.borrow().contains_key(member)
    }

    /// Current value of `member`, or the placeholder if it was never set.
    pub fn member_value(&self, member: &str) -> Value {
        self.members
            .borrow()
            .get(member)
            .cloned()
            .unwrap_or(Value::Empty)
    }

    /// Replace the value of `member` in place.
    pub fn set_member(&self, member: &str, value: Value) {
        self.members.borrow_mut().insert(member.to_string(), value);
    }
}

/// A runtime datum.
///
/// The tag never changes after construction; mutation only happens through
/// array element replacement/removal or struct member replacement. Arrays and
/// structs are shared handles, so assigning them copies the handle, not the
/// contents (reference semantics). `Empty` is the "no value yet" placeholder
/// bound to appended array slots and uninitialized struct members.
#[derive(Debug, Clone)]
pub enum Value {
    /// Placeholder for a slot that has not been assigned yet
    Empty,
    /// Ordered sequence of values, mutable in place
    Array(Rc<RefCell<Vec<Value>>>),
    /// Boolean
    Bool(bool),
    /// 64-bit float
    Float(f64),
    /// 64-bit signed integer
    Int(i64),
    /// Text string
    Str(String),
    /// Struct instance
    Struct(Rc<StructInstance>),
}

impl Value {
    /// Create an array value from element values.
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// The type tag, or `None` for the placeholder.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Value::Empty => None,
            Value::Array(_) => Some(ScalarType::Array),
            Value::Bool(_) => Some(ScalarType::Bool),
            Value::Float(_) => Some(ScalarType::Float),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Str(_) => Some(ScalarType::String),
            Value::Struct(_) => Some(ScalarType::Object),
        }
    }

    /// The name reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self.scalar_type() {
            Some(ty) => ty.name(),
            None => "empty",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Truthiness: arrays and strings are true when non-empty, numerics when
    /// non-zero. Structs are always true (stubbed pending real struct
    /// semantics).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Bool(b) => *b,
            Value::Float(f) => *f != 0.0,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Struct(_) => true,
        }
    }

    /// Numeric conversion to float. String parse failures silently yield 0.
    pub fn to_float(&self) -> f64 {
        match self {
            Value::Empty => 0.0,
            Value::Array(_) | Value::Bool(_) => {
                if self.to_boolean() {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Float(f) => *f,
            Value::Int(n) => *n as f64,
            Value::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Struct(_) => 1.0,
        }
    }

    /// Numeric conversion to integer. String parse failures silently yield 0,
    /// and floats truncate toward zero.
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Empty => 0,
            Value::Array(_) | Value::Bool(_) => {
                if self.to_boolean() {
                    1
                } else {
                    0
                }
            }
            Value::Float(f) => *f as i64,
            Value::Int(n) => *n,
            Value::Str(s) => s.trim().parse::<i64>().unwrap_or(0),
            Value::Struct(_) => 1,
        }
    }

    /// Array conversion. An array keeps its shared storage; any other value
    /// becomes a fresh one-element array containing it.
    pub fn to_array(&self) -> Value {
        match self {
            Value::Array(items) => Value::Array(Rc::clone(items)),
            other => Value::array(vec![other.clone()]),
        }
    }

    /// Element list used for length-based ordering. Non-arrays count as a
    /// single-element list, matching `to_array`.
    fn element_count(&self) -> usize {
        match self {
            Value::Array(items) => items.borrow().len(),
            _ => 1,
        }
    }
}

/// Structural equality per variant. Arrays compare element lists, structs
/// compare by instance identity, and mixed tags are never equal (no numeric
/// coercion in `==`).
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Empty, Value::Empty) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Ordering used by the relational operators, dispatched on the left tag:
/// arrays compare by length only, bool/int compare numerically with boolean
/// coerced to 0/1, floats compare as floats, strings lexicographically.
/// Structs have no defined ordering and always report Less (stubbed).
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match left {
        Value::Array(_) => left.element_count().cmp(&right.element_count()),
        Value::Bool(_) | Value::Int(_) => left.to_int().cmp(&right.to_int()),
        Value::Float(_) => left
            .to_float()
            .partial_cmp(&right.to_float())
            .unwrap_or(Ordering::Equal),
        Value::Str(s) => s.as_str().cmp(&right.to_string()),
        Value::Struct(_) => Ordering::Less,
        Value::Empty => Ordering::Less,
    }
}

impl fmt::Display for Value {
    /// String conversion. Arrays render as `[e0, e1, ...]`; structs render as
    /// the empty string (stubbed); the placeholder renders as the empty
    /// string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Struct(_) => Ok(()),
        }
    }
}
