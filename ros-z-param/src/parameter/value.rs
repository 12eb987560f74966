//! User-facing parameter types.
//!
//! A [`ParameterValue`] holds exactly one typed value. Typed reads go through
//! [`ParameterKind`], which refuses to convert between types: an integer
//! parameter is never read back as a double.

use std::fmt;

use super::error::{ParameterError, Result};

/// The type of a parameter value.
///
/// Renders with the names used in parameter dumps (`integer`, `byte_array`, ...)
/// and converts to the rcl_interfaces `uint8` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ParameterType {
    #[default]
    #[strum(serialize = "not set")]
    NotSet,
    Bool,
    Integer,
    Double,
    String,
    ByteArray,
    BoolArray,
    IntegerArray,
    DoubleArray,
    StringArray,
}

impl From<ParameterType> for u8 {
    fn from(value: ParameterType) -> Self {
        value as u8
    }
}

impl From<u8> for ParameterType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Bool,
            2 => Self::Integer,
            3 => Self::Double,
            4 => Self::String,
            5 => Self::ByteArray,
            6 => Self::BoolArray,
            7 => Self::IntegerArray,
            8 => Self::DoubleArray,
            9 => Self::StringArray,
            _ => Self::NotSet,
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParameterValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
    BoolArray(Vec<bool>),
    IntegerArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl ParameterValue {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::NotSet => ParameterType::NotSet,
            Self::Bool(_) => ParameterType::Bool,
            Self::Integer(_) => ParameterType::Integer,
            Self::Double(_) => ParameterType::Double,
            Self::String(_) => ParameterType::String,
            Self::ByteArray(_) => ParameterType::ByteArray,
            Self::BoolArray(_) => ParameterType::BoolArray,
            Self::IntegerArray(_) => ParameterType::IntegerArray,
            Self::DoubleArray(_) => ParameterType::DoubleArray,
            Self::StringArray(_) => ParameterType::StringArray,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::NotSet)
    }
}

fn join<T, F: Fn(&T) -> String>(items: &[T], f: F) -> String {
    let items: Vec<String> = items.iter().map(f).collect();
    format!("[{}]", items.join(", "))
}

/// Value as it appears in a parameter dump: doubles with six decimals,
/// sequences as `[a, b, c]`.
impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSet => write!(f, "not set"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{:.6}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::ByteArray(v) => write!(f, "{}", join(v, |b| b.to_string())),
            Self::BoolArray(v) => write!(f, "{}", join(v, |b| b.to_string())),
            Self::IntegerArray(v) => write!(f, "{}", join(v, |i| i.to_string())),
            Self::DoubleArray(v) => write!(f, "{}", join(v, |d| format!("{:.6}", d))),
            Self::StringArray(v) => write!(f, "{}", join(v, |s| s.clone())),
        }
    }
}

/// Rust types that map onto exactly one [`ParameterType`].
pub trait ParameterKind: Sized {
    const TYPE: ParameterType;

    /// Extract the value, or give it back when it holds another type.
    fn from_value(value: ParameterValue) -> std::result::Result<Self, ParameterValue>;

    fn into_value(self) -> ParameterValue;
}

macro_rules! impl_parameter_kind {
    ($ty:ty, $variant:ident) => {
        impl ParameterKind for $ty {
            const TYPE: ParameterType = ParameterType::$variant;

            fn from_value(value: ParameterValue) -> std::result::Result<Self, ParameterValue> {
                match value {
                    ParameterValue::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn into_value(self) -> ParameterValue {
                ParameterValue::$variant(self)
            }
        }

        impl From<$ty> for ParameterValue {
            fn from(value: $ty) -> Self {
                ParameterValue::$variant(value)
            }
        }
    };
}

impl_parameter_kind!(bool, Bool);
impl_parameter_kind!(i64, Integer);
impl_parameter_kind!(f64, Double);
impl_parameter_kind!(String, String);
impl_parameter_kind!(Vec<u8>, ByteArray);
impl_parameter_kind!(Vec<bool>, BoolArray);
impl_parameter_kind!(Vec<i64>, IntegerArray);
impl_parameter_kind!(Vec<f64>, DoubleArray);
impl_parameter_kind!(Vec<String>, StringArray);

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Integer(value.into())
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<&[u8]> for ParameterValue {
    fn from(value: &[u8]) -> Self {
        ParameterValue::ByteArray(value.to_vec())
    }
}

/// Read `value` stored under `name` as `T`.
///
/// `NotSet` is reported as [`ParameterError::NotFound`], any other type
/// than `T` as [`ParameterError::TypeMismatch`].
pub fn extract<T: ParameterKind>(name: &str, value: ParameterValue) -> Result<T> {
    let actual = value.parameter_type();
    if actual == ParameterType::NotSet {
        return Err(ParameterError::NotFound(name.to_string()));
    }
    T::from_value(value).map_err(|_| ParameterError::TypeMismatch {
        name: name.to_string(),
        requested: T::TYPE,
        actual,
    })
}

/// Like [`extract`], with `default` standing in for an absent value.
pub fn extract_or<T: ParameterKind>(name: &str, value: ParameterValue, default: T) -> Result<T> {
    if value.is_set() {
        extract(name, value)
    } else {
        Ok(default)
    }
}

/// A parameter with its name and value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A parameter carrying `NotSet`; in a set request this deletes `name`.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::NotSet,
        }
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.value.parameter_type()
    }

    /// Typed read; see [`extract`].
    pub fn get<T: ParameterKind>(&self) -> Result<T> {
        extract(&self.name, self.value.clone())
    }

    /// `"name": {"type": ..., "value": ...}`
    pub fn to_json_dict_entry(&self) -> String {
        format!(
            "\"{}\": {{\"type\": \"{}\", \"value\": \"{}\"}}",
            self.name,
            self.parameter_type(),
            self.value
        )
    }
}

/// `{"name": ..., "type": ..., "value": ...}`
impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"name\": \"{}\", \"type\": \"{}\", \"value\": \"{}\"}}",
            self.name,
            self.parameter_type(),
            self.value
        )
    }
}

/// Render a list of parameters as one JSON dictionary keyed by name.
pub fn parameters_to_json(parameters: &[Parameter]) -> String {
    let entries: Vec<String> = parameters.iter().map(Parameter::to_json_dict_entry).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Outcome of setting one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetParametersResult {
    pub successful: bool,
    pub reason: String,
}

impl SetParametersResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            reason: String::new(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            successful: false,
            reason: reason.into(),
        }
    }
}

/// Static description of a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub type_: ParameterType,
    pub description: String,
    pub read_only: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, type_: ParameterType) -> Self {
        Self {
            name: name.into(),
            type_,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Names and sub-prefixes returned by a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParametersResult {
    pub names: Vec<String>,
    pub prefixes: Vec<String>,
}
