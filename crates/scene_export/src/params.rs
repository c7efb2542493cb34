//! Typed parameter sets exchanged between converter and receiver
//!
//! A [`ParameterSet`] is an insertion-ordered list of named, type-tagged
//! values with a fixed capacity. Entries are never merged: adding the same
//! name twice stores two entries, and both are serialized in call order.
//! Consumers of the text protocol resolve duplicates themselves.

use std::fmt;

use thiserror::Error;

use crate::foundation::math::{Color, Vec3};

/// Capacity used by the converter's reusable parameter sets
pub const DEFAULT_CAPACITY: usize = 32;

/// Errors raised when adding a parameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The set already holds `capacity` entries
    #[error("Parameter set is full ({capacity} entries)")]
    CapacityExhausted {
        /// Fixed capacity of the set
        capacity: usize,
    },

    /// Parameter names must not be empty
    #[error("Parameter name is empty")]
    EmptyName,

    /// Parameter value arrays must hold at least one element
    #[error("Parameter '{name}' has no values")]
    EmptyValue {
        /// Parameter name
        name: String,
    },

    /// The values do not fit the declared type tag
    #[error("Parameter '{name}' declared as {expected} but given {found} values")]
    TypeMismatch {
        /// Parameter name
        name: String,
        /// Declared type tag
        expected: ParamType,
        /// Kind of the supplied values
        found: &'static str,
    },

    /// A flat triangle index list whose length is not a multiple of three
    #[error("Parameter '{name}' has {len} indices, not a whole number of triangles")]
    RaggedTriangles {
        /// Parameter name
        name: String,
        /// Number of indices supplied
        len: usize,
    },
}

/// Type tag of a parameter entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Boolean flag
    Bool,
    /// Signed integer
    Int,
    /// Floating point scalar
    Float,
    /// Direction vector
    Vector,
    /// RGB color
    Color,
    /// Position
    Point,
    /// Surface normal
    Normal,
    /// Text
    String,
    /// Reference to a previously declared texture by name
    Texture,
    /// Triangle vertex index triple
    Triangle,
}

impl ParamType {
    /// Keyword used for this type in the text protocol
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int | Self::Triangle => "integer",
            Self::Float => "float",
            Self::Vector => "vector",
            Self::Color => "color",
            Self::Point => "point",
            Self::Normal => "normal",
            Self::String => "string",
            Self::Texture => "texture",
        }
    }

    /// Whether `values` can be stored under this type tag
    pub fn accepts(self, values: &ParamValues) -> bool {
        matches!(
            (self, values),
            (Self::Bool, ParamValues::Bool(_))
                | (Self::Int, ParamValues::Int(_))
                | (Self::Float, ParamValues::Float(_))
                | (Self::Vector | Self::Color | Self::Point | Self::Normal, ParamValues::Triple(_))
                | (Self::String | Self::Texture, ParamValues::Text(_))
                | (Self::Triangle, ParamValues::Index(_))
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Value array of a parameter entry
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValues {
    /// Boolean values
    Bool(Vec<bool>),
    /// Integer values
    Int(Vec<i32>),
    /// Float values
    Float(Vec<f32>),
    /// Three-component values (vector, color, point, normal)
    Triple(Vec<[f32; 3]>),
    /// String values (strings and texture names)
    Text(Vec<String>),
    /// Triangle index triples
    Index(Vec<[u32; 3]>),
}

impl ParamValues {
    /// Number of elements (the entry's array length)
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Triple(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Index(v) => v.len(),
        }
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Triple(_) => "triple",
            Self::Text(_) => "string",
            Self::Index(_) => "index triple",
        }
    }
}

impl From<bool> for ParamValues {
    fn from(value: bool) -> Self {
        Self::Bool(vec![value])
    }
}

impl From<i32> for ParamValues {
    fn from(value: i32) -> Self {
        Self::Int(vec![value])
    }
}

impl From<f32> for ParamValues {
    fn from(value: f32) -> Self {
        Self::Float(vec![value])
    }
}

impl From<Vec3> for ParamValues {
    fn from(value: Vec3) -> Self {
        Self::Triple(vec![[value.x, value.y, value.z]])
    }
}

impl From<&str> for ParamValues {
    fn from(value: &str) -> Self {
        Self::Text(vec![value.to_string()])
    }
}

impl From<Vec<f32>> for ParamValues {
    fn from(values: Vec<f32>) -> Self {
        Self::Float(values)
    }
}

impl From<Vec<i32>> for ParamValues {
    fn from(values: Vec<i32>) -> Self {
        Self::Int(values)
    }
}

/// One named, typed entry
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    param_type: ParamType,
    name: String,
    values: ParamValues,
}

impl ParamEntry {
    /// Declared type tag
    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored values
    pub fn values(&self) -> &ParamValues {
        &self.values
    }

    /// Number of values stored
    pub fn array_len(&self) -> usize {
        self.values.len()
    }
}

/// Fixed-capacity, insertion-ordered parameter buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    entries: Vec<ParamEntry>,
    capacity: usize,
}

impl ParameterSet {
    /// Create a set holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an entry
    ///
    /// Fails without touching the set when it is full, when `name` or
    /// `values` is empty, or when `values` does not fit `param_type`.
    pub fn add(
        &mut self,
        param_type: ParamType,
        name: &str,
        values: impl Into<ParamValues>,
    ) -> Result<(), ParamError> {
        if self.entries.len() >= self.capacity {
            return Err(ParamError::CapacityExhausted { capacity: self.capacity });
        }
        if name.is_empty() {
            return Err(ParamError::EmptyName);
        }
        let values = values.into();
        if values.is_empty() {
            return Err(ParamError::EmptyValue { name: name.to_string() });
        }
        if !param_type.accepts(&values) {
            return Err(ParamError::TypeMismatch {
                name: name.to_string(),
                expected: param_type,
                found: values.kind(),
            });
        }

        self.entries.push(ParamEntry {
            param_type,
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    /// Add a boolean
    pub fn add_bool(&mut self, name: &str, value: bool) -> Result<(), ParamError> {
        self.add(ParamType::Bool, name, value)
    }

    /// Add an integer
    pub fn add_int(&mut self, name: &str, value: i32) -> Result<(), ParamError> {
        self.add(ParamType::Int, name, value)
    }

    /// Add a float
    pub fn add_float(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        self.add(ParamType::Float, name, value)
    }

    /// Add an array of floats
    pub fn add_floats(&mut self, name: &str, values: &[f32]) -> Result<(), ParamError> {
        self.add(ParamType::Float, name, values.to_vec())
    }

    /// Add a string
    pub fn add_string(&mut self, name: &str, value: &str) -> Result<(), ParamError> {
        self.add(ParamType::String, name, value)
    }

    /// Add a color
    pub fn add_color(&mut self, name: &str, value: Color) -> Result<(), ParamError> {
        self.add(ParamType::Color, name, value)
    }

    /// Add a point
    pub fn add_point(&mut self, name: &str, value: Vec3) -> Result<(), ParamError> {
        self.add(ParamType::Point, name, value)
    }

    /// Add a vector
    pub fn add_vector(&mut self, name: &str, value: Vec3) -> Result<(), ParamError> {
        self.add(ParamType::Vector, name, value)
    }

    /// Add an array of points
    pub fn add_points(&mut self, name: &str, values: &[Vec3]) -> Result<(), ParamError> {
        self.add(ParamType::Point, name, triples(values))
    }

    /// Add an array of normals
    pub fn add_normals(&mut self, name: &str, values: &[Vec3]) -> Result<(), ParamError> {
        self.add(ParamType::Normal, name, triples(values))
    }

    /// Reference a texture declared earlier by `texture_name`
    pub fn add_texture(&mut self, name: &str, texture_name: &str) -> Result<(), ParamError> {
        self.add(ParamType::Texture, name, texture_name)
    }

    /// Add a flat triangle index list, three indices per triangle
    pub fn add_triangles(&mut self, name: &str, indices: &[u32]) -> Result<(), ParamError> {
        if indices.len() % 3 != 0 {
            return Err(ParamError::RaggedTriangles {
                name: name.to_string(),
                len: indices.len(),
            });
        }
        let tris = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        self.add(ParamType::Triangle, name, ParamValues::Index(tris))
    }

    /// Remove all entries, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, ParamEntry> {
        self.entries.iter()
    }

    /// First entry called `name`
    pub fn get(&self, name: &str) -> Option<&ParamEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a ParamEntry;
    type IntoIter = std::slice::Iter<'a, ParamEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn triples(values: &[Vec3]) -> ParamValues {
    ParamValues::Triple(values.iter().map(|v| [v.x, v.y, v.z]).collect())
}
