//! Local signals and their typed values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, SignalName};

/// Element type of a signal vector.
///
/// Only 32-bit integers and floats are supported; any other type tag is
/// rejected when the signal or mapping is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ElementType {
    Int32,
    Float32,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Int32 => std::mem::size_of::<i32>(),
            Self::Float32 => std::mem::size_of::<f32>(),
        }
    }

    /// Single-character type tag (`i` / `f`).
    pub const fn tag(self) -> char {
        match self {
            Self::Int32 => 'i',
            Self::Float32 => 'f',
        }
    }
}

impl TryFrom<char> for ElementType {
    type Error = ContractError;

    fn try_from(tag: char) -> Result<Self, Self::Error> {
        match tag {
            'i' => Ok(Self::Int32),
            'f' => Ok(Self::Float32),
            other => Err(ContractError::UnsupportedType {
                tag: other.to_string(),
            }),
        }
    }
}

impl FromStr for ElementType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "i" | "i32" | "int32" => Ok(Self::Int32),
            "f" | "f32" | "float32" => Ok(Self::Float32),
            _ => Err(ContractError::UnsupportedType { tag: s.to_string() }),
        }
    }
}

impl TryFrom<String> for ElementType {
    type Error = ContractError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        t.tag().to_string()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32 => f.write_str("int32"),
            Self::Float32 => f.write_str("float32"),
        }
    }
}

/// One scalar element of a signal vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalValue {
    Int32(i32),
    Float32(f32),
}

impl SignalValue {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Int32(_) => ElementType::Int32,
            Self::Float32(_) => ElementType::Float32,
        }
    }

    /// Convert to `target`. Float to int truncates toward zero and
    /// saturates at the i32 range.
    pub fn cast(self, target: ElementType) -> Self {
        match (self, target) {
            (Self::Int32(v), ElementType::Float32) => Self::Float32(v as f32),
            (Self::Float32(v), ElementType::Int32) => Self::Int32(v as i32),
            (v, _) => v,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int32(v) => f64::from(v),
            Self::Float32(v) => f64::from(v),
        }
    }
}

/// A typed, fixed-length vector value as produced by a local signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalVector {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

impl SignalVector {
    /// Empty vector of the given type with room for `capacity` elements.
    pub fn with_capacity(element_type: ElementType, capacity: usize) -> Self {
        match element_type {
            ElementType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            ElementType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Int32(_) => ElementType::Int32,
            Self::Float32(_) => ElementType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `None` past the end.
    pub fn element(&self, index: usize) -> Option<SignalValue> {
        match self {
            Self::Int32(v) => v.get(index).copied().map(SignalValue::Int32),
            Self::Float32(v) => v.get(index).copied().map(SignalValue::Float32),
        }
    }

    /// Append `value`, converting it to this vector's element type.
    pub fn push(&mut self, value: SignalValue) {
        match self {
            Self::Int32(v) => v.push(match value.cast(ElementType::Int32) {
                SignalValue::Int32(x) => x,
                SignalValue::Float32(x) => x as i32,
            }),
            Self::Float32(v) => v.push(match value.cast(ElementType::Float32) {
                SignalValue::Float32(x) => x,
                SignalValue::Int32(x) => x as f32,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SignalValue> + '_ {
        (0..self.len()).filter_map(move |i| self.element(i))
    }

    /// Parse whitespace-separated textual values as `element_type`.
    pub fn parse<'a>(
        element_type: ElementType,
        items: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ContractError> {
        let mut out = Self::with_capacity(element_type, 4);
        for item in items {
            let value = match element_type {
                ElementType::Int32 => item.parse::<i32>().map(SignalValue::Int32).map_err(|e| {
                    ContractError::Other(format!("invalid int32 value '{item}': {e}"))
                })?,
                ElementType::Float32 => {
                    item.parse::<f32>().map(SignalValue::Float32).map_err(|e| {
                        ContractError::Other(format!("invalid float32 value '{item}': {e}"))
                    })?
                }
            };
            out.push(value);
        }
        Ok(out)
    }
}

impl From<Vec<f32>> for SignalVector {
    fn from(v: Vec<f32>) -> Self {
        Self::Float32(v)
    }
}

impl From<Vec<i32>> for SignalVector {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32(v)
    }
}

/// Identity of a local signal, assigned by the owning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub u32);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig#{}", self.0)
    }
}

/// A named, typed, fixed-length signal on the local device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSignal {
    pub id: SignalId,
    pub name: SignalName,
    pub element_type: ElementType,
    pub length: usize,
}

impl LocalSignal {
    pub fn new(
        id: SignalId,
        name: impl Into<SignalName>,
        element_type: ElementType,
        length: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            element_type,
            length,
        }
    }
}
