//! Typed value model.
//!
//! Every value carries its type, so any value can be encoded without outside
//! context and its format character (`i`, `f`, `s`, `b`, `l`) is derived from
//! the variant alone.

use crate::error::ProtocolError;
use bytes::Bytes;

/// Wire type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Int = 0,
    Float = 1,
    String = 2,
    Blob = 3,
    List = 4,
}

impl ValueType {
    /// Returns the wire tag byte.
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Returns the format character used in signatures.
    pub fn format_char(&self) -> char {
        match self {
            ValueType::Int => 'i',
            ValueType::Float => 'f',
            ValueType::String => 's',
            ValueType::Blob => 'b',
            ValueType::List => 'l',
        }
    }

    /// Parses a signature format character.
    pub fn from_format_char(c: char) -> Result<Self, ProtocolError> {
        match c {
            'i' => Ok(ValueType::Int),
            'f' => Ok(ValueType::Float),
            's' => Ok(ValueType::String),
            'b' => Ok(ValueType::Blob),
            'l' => Ok(ValueType::List),
            other => Err(ProtocolError::UnknownFormat(other)),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Blob => "blob",
            ValueType::List => "list",
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ValueType::Int),
            1 => Ok(ValueType::Float),
            2 => Ok(ValueType::String),
            3 => Ok(ValueType::Blob),
            4 => Ok(ValueType::List),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// A self-describing argument value.
///
/// `String` holds raw bytes: the content is conventionally printable but is
/// not required to be valid UTF-8. Its length is the exact content length,
/// with no terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int(i64),
    Float(f64),
    String(Bytes),
    Blob(Bytes),
    List(Vec<TypedValue>),
}

impl TypedValue {
    pub fn int(value: i64) -> Self {
        TypedValue::Int(value)
    }

    pub fn float(value: f64) -> Self {
        TypedValue::Float(value)
    }

    pub fn string(value: impl AsRef<[u8]>) -> Self {
        TypedValue::String(Bytes::copy_from_slice(value.as_ref()))
    }

    pub fn blob(value: impl Into<Bytes>) -> Self {
        TypedValue::Blob(value.into())
    }

    pub fn list(values: impl IntoIterator<Item = TypedValue>) -> Self {
        TypedValue::List(values.into_iter().collect())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Int(_) => ValueType::Int,
            TypedValue::Float(_) => ValueType::Float,
            TypedValue::String(_) => ValueType::String,
            TypedValue::Blob(_) => ValueType::Blob,
            TypedValue::List(_) => ValueType::List,
        }
    }

    /// Returns the signature character for this value.
    pub fn format_char(&self) -> char {
        self.value_type().format_char()
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TypedValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string content if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the raw bytes of a `String` or `Blob`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedValue::String(b) | TypedValue::Blob(b) => Some(&b[..]),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::List(items) => Some(&items[..]),
            _ => None,
        }
    }

    fn unexpected(&self, expected: ValueType) -> ProtocolError {
        ProtocolError::UnexpectedType {
            expected: expected.format_char(),
            actual: self.format_char(),
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Int(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        TypedValue::Int(v as i64)
    }
}

impl From<u32> for TypedValue {
    fn from(v: u32) -> Self {
        TypedValue::Int(v as i64)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Float(v)
    }
}

impl From<f32> for TypedValue {
    fn from(v: f32) -> Self {
        TypedValue::Float(v as f64)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::string(v)
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::String(Bytes::from(v))
    }
}

impl From<&[u8]> for TypedValue {
    fn from(v: &[u8]) -> Self {
        TypedValue::Blob(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(v: Vec<u8>) -> Self {
        TypedValue::Blob(Bytes::from(v))
    }
}

impl From<Bytes> for TypedValue {
    fn from(v: Bytes) -> Self {
        TypedValue::Blob(v)
    }
}

impl From<Vec<TypedValue>> for TypedValue {
    fn from(v: Vec<TypedValue>) -> Self {
        TypedValue::List(v)
    }
}

impl From<Args> for TypedValue {
    fn from(v: Args) -> Self {
        TypedValue::List(v.0)
    }
}

impl TryFrom<&TypedValue> for i64 {
    type Error = ProtocolError;

    fn try_from(value: &TypedValue) -> Result<Self, Self::Error> {
        value.as_int().ok_or_else(|| value.unexpected(ValueType::Int))
    }
}

impl TryFrom<&TypedValue> for f64 {
    type Error = ProtocolError;

    fn try_from(value: &TypedValue) -> Result<Self, Self::Error> {
        value
            .as_float()
            .ok_or_else(|| value.unexpected(ValueType::Float))
    }
}

impl<'a> TryFrom<&'a TypedValue> for &'a str {
    type Error = ProtocolError;

    fn try_from(value: &'a TypedValue) -> Result<Self, Self::Error> {
        value
            .as_str()
            .ok_or_else(|| value.unexpected(ValueType::String))
    }
}

impl<'a> TryFrom<&'a TypedValue> for &'a [u8] {
    type Error = ProtocolError;

    fn try_from(value: &'a TypedValue) -> Result<Self, Self::Error> {
        match value {
            TypedValue::Blob(b) => Ok(&b[..]),
            other => Err(other.unexpected(ValueType::Blob)),
        }
    }
}

/// Concatenates the format characters of `values` in order.
pub fn signature_of(values: &[TypedValue]) -> String {
    values.iter().map(TypedValue::format_char).collect()
}

/// Validates a signature string, returning its value types in order.
pub fn parse_signature(signature: &str) -> Result<Vec<ValueType>, ProtocolError> {
    signature.chars().map(ValueType::from_format_char).collect()
}

/// Checks that `format` names the types of `values`, in order.
pub fn validate_format(format: &str, values: &[TypedValue]) -> Result<(), ProtocolError> {
    let types = parse_signature(format)?;
    let matches = types.len() == values.len()
        && types.iter().zip(values).all(|(ty, v)| *ty == v.value_type());
    if !matches {
        return Err(ProtocolError::FormatMismatch {
            format: format.to_string(),
            actual: signature_of(values),
        });
    }
    Ok(())
}

/// Ordered call arguments, appended one value at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<TypedValue>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: impl Into<TypedValue>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn with_int(self, value: i64) -> Self {
        self.with(TypedValue::Int(value))
    }

    pub fn with_float(self, value: f64) -> Self {
        self.with(TypedValue::Float(value))
    }

    pub fn with_string(self, value: impl AsRef<[u8]>) -> Self {
        self.with(TypedValue::string(value))
    }

    pub fn with_blob(self, value: impl Into<Bytes>) -> Self {
        self.with(TypedValue::blob(value))
    }

    pub fn with_list(self, values: impl IntoIterator<Item = TypedValue>) -> Self {
        self.with(TypedValue::list(values))
    }

    pub fn push(&mut self, value: impl Into<TypedValue>) -> &mut Self {
        self.0.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn signature(&self) -> String {
        signature_of(&self.0)
    }

    pub fn as_slice(&self) -> &[TypedValue] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<TypedValue> {
        self.0
    }
}

impl FromIterator<TypedValue> for Args {
    fn from_iter<I: IntoIterator<Item = TypedValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<TypedValue>> for Args {
    fn from(values: Vec<TypedValue>) -> Self {
        Self(values)
    }
}

/// Conversion into an ordered argument list for a call.
pub trait IntoArgs {
    fn into_args(self) -> Vec<TypedValue>;
}

impl IntoArgs for Args {
    fn into_args(self) -> Vec<TypedValue> {
        self.0
    }
}

impl IntoArgs for Vec<TypedValue> {
    fn into_args(self) -> Vec<TypedValue> {
        self
    }
}

impl IntoArgs for &[TypedValue] {
    fn into_args(self) -> Vec<TypedValue> {
        self.to_vec()
    }
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<TypedValue> {
        Vec::new()
    }
}

macro_rules! impl_into_args_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<TypedValue>),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<TypedValue> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_args_for_tuple!(A);
impl_into_args_for_tuple!(A, B);
impl_into_args_for_tuple!(A, B, C);
impl_into_args_for_tuple!(A, B, C, D);
impl_into_args_for_tuple!(A, B, C, D, E);
impl_into_args_for_tuple!(A, B, C, D, E, F);
impl_into_args_for_tuple!(A, B, C, D, E, F, G);
impl_into_args_for_tuple!(A, B, C, D, E, F, G, H);
