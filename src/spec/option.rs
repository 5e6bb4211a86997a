//! Named configuration options declared by nodes.
//!
//! JSON shape:
//! { "name": "period-timer", "type": "int", "default": { "int": 1000 }, "help": "..." }
//!
//! The default is externally tagged so that its own type is explicit and can
//! be checked against the declared one.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    Int,
    Int64,
    Float,
    Double,
    String,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bool(bool),
}

impl Variant {
    pub fn variant_type(&self) -> VariantType {
        match self {
            Variant::Int(_) => VariantType::Int,
            Variant::Int64(_) => VariantType::Int64,
            Variant::Float(_) => VariantType::Float,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::Bool(_) => VariantType::Bool,
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariantType::Int => "int",
            VariantType::Int64 => "int64",
            VariantType::Float => "float",
            VariantType::Double => "double",
            VariantType::String => "string",
            VariantType::Bool => "bool",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Variant>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
}

impl ConfigParamSpec {
    pub fn new(name: impl Into<String>, default: Variant, help: &str) -> Self {
        Self {
            name: name.into(),
            kind: default.variant_type(),
            default: Some(default),
            help: help.to_string(),
        }
    }

    /// The default's type differs from the declared one.
    pub fn has_type_mismatch(&self) -> bool {
        self.default
            .as_ref()
            .is_some_and(|d| d.variant_type() != self.kind)
    }
}

/// Push `option` unless an option with the same name exists.
pub fn add_option_if_missing(options: &mut Vec<ConfigParamSpec>, option: ConfigParamSpec) {
    if !options.iter().any(|o| o.name == option.name) {
        options.push(option);
    }
}
