use std::fmt;

use crate::data_type::DataType;

/// Mask applied when a variable does not declare one.
pub const DEFAULT_MASK: u64 = u64::MAX;

/// A typed location in an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    pub ty: DataType,
    pub address: usize,
    pub mask: u64,
}

impl Variable {
    pub fn new(ty: DataType, address: usize) -> Self {
        Variable {
            ty,
            address,
            mask: DEFAULT_MASK,
        }
    }

    pub fn with_mask(mut self, mask: u64) -> Self {
        self.mask = mask;
        self
    }

    pub fn is_default_mask(&self) -> bool {
        self.mask == DEFAULT_MASK
    }
}

/// Value of a variable that does not live in memory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Variant {
    Bool(bool),
    Int(i64),
    Float(f64),
    #[default]
    Empty,
}

impl Variant {
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    pub fn to_i64(&self) -> i64 {
        match *self {
            Variant::Bool(b) => i64::from(b),
            Variant::Int(i) => i,
            Variant::Float(f) => f as i64,
            Variant::Empty => 0,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Variant::Bool(b) => f64::from(u8::from(b)),
            Variant::Int(i) => i as f64,
            Variant::Float(f) => f,
            Variant::Empty => 0.0,
        }
    }

    pub fn to_bool(&self) -> bool {
        match *self {
            Variant::Bool(b) => b,
            Variant::Int(i) => i != 0,
            Variant::Float(f) => f != 0.0,
            Variant::Empty => false,
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Float(value)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(x) => write!(f, "{x}"),
            Variant::Empty => f.write_str("<empty>"),
        }
    }
}
