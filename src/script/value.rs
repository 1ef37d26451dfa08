use std::fmt;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Typed value of a script variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float3(Vec3),
    Float4(Vec4),
    Color(Vec4),
    String(String),
    /// Value of a type this reader does not know, kept verbatim.
    Unknown(String),
}

impl Value {
    /// Type token used in variable scripts.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Float3(_) => "float3",
            Value::Float4(_) => "float4",
            Value::Color(_) => "color",
            Value::String(_) => "string",
            Value::Unknown(_) => "unknown",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floats, and ints widened to floats.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f32),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<Vec3> {
        match self {
            Value::Float3(value) => Some(*value),
            _ => None,
        }
    }

    /// Four-component floats and colors.
    pub fn as_float4(&self) -> Option<Vec4> {
        match self {
            Value::Float4(value) | Value::Color(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Formats the payload the way it appears after the type token.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Float3(v) => write!(f, "{} {} {}", v.x, v.y, v.z),
            Value::Float4(v) | Value::Color(v) => write!(f, "{} {} {} {}", v.x, v.y, v.z, v.w),
            Value::String(value) => write!(f, "\"{value}\""),
            Value::Unknown(value) => f.write_str(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Value::Float3(value)
    }
}

impl From<Vec4> for Value {
    fn from(value: Vec4) -> Self {
        Value::Float4(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_script_syntax() {
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
        assert_eq!(Value::Float3(Vec3::new(1.0, 2.5, -3.0)).to_string(), "1 2.5 -3");
        assert_eq!(Value::from("a b").to_string(), "\"a b\"");
        assert_eq!(Value::Unknown("x y".into()).to_string(), "x y");
    }

    #[test]
    fn ints_widen_to_floats() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Bool(true).as_float(), None);
        assert_eq!(Value::Color(Vec4::ONE).as_float4(), Some(Vec4::ONE));
    }
}
