#![deny(missing_docs)]

//! # Type Mapping
//!
//! Converts schema primitive type names into Swagger primitive types and
//! parses default literals into typed JSON values.
//!
//! Any type name that is not a primitive is a class reference; resolving it is
//! the job of [`crate::schema_index::SchemaIndex`].

use crate::error::{AppError, AppResult};
use serde_json::{Number, Value};
use std::fmt::Display;

/// Represents the Swagger primitive types a schema type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// `bool`
    Boolean,
    /// `array` (element type carried separately)
    Array,
    /// `int`, `bigint`
    Integer,
    /// `float`
    Number,
    /// `string`
    String,
    /// `map`
    Object,
    /// `file`: a valid parameter encoding only, never a value type.
    File,
}

impl PrimitiveType {
    /// The Swagger `type` keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Array => "array",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::String => "string",
            PrimitiveType::Object => "object",
            PrimitiveType::File => "file",
        }
    }

    /// The type to use where a value (not an upload) is described.
    pub fn value_type(self) -> PrimitiveType {
        match self {
            PrimitiveType::File => PrimitiveType::String,
            other => other,
        }
    }

    /// Whether the type is numeric.
    pub fn is_numeric(self) -> bool {
        matches!(self, PrimitiveType::Integer | PrimitiveType::Number)
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a schema type name is one of the known primitives.
pub fn is_primitive_name(type_name: &str) -> bool {
    lookup_primitive(type_name).is_some()
}

fn lookup_primitive(type_name: &str) -> Option<PrimitiveType> {
    match type_name {
        "bool" => Some(PrimitiveType::Boolean),
        "array" => Some(PrimitiveType::Array),
        "int" | "bigint" => Some(PrimitiveType::Integer),
        "float" => Some(PrimitiveType::Number),
        "string" => Some(PrimitiveType::String),
        "map" => Some(PrimitiveType::Object),
        "file" => Some(PrimitiveType::File),
        _ => None,
    }
}

/// Trait for converting schema type names and default literals.
pub trait TypeMapper {
    /// Maps a primitive type name (e.g. `int`) to a Swagger primitive.
    fn map(&self, type_name: &str) -> AppResult<PrimitiveType>;

    /// Parses a default literal under `ty`.
    ///
    /// Missing, empty and `null` literals yield `Ok(None)`.
    /// `context` names the declaring property or parameter for error reporting.
    fn parse_default(
        &self,
        literal: Option<&str>,
        ty: PrimitiveType,
        context: &str,
    ) -> AppResult<Option<Value>>;
}

/// The standard implementation of `TypeMapper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcTypeMapper;

impl TypeMapper for RpcTypeMapper {
    fn map(&self, type_name: &str) -> AppResult<PrimitiveType> {
        lookup_primitive(type_name)
            .ok_or_else(|| AppError::malformed(format!("Unknown type: '{}'", type_name)))
    }

    fn parse_default(
        &self,
        literal: Option<&str>,
        ty: PrimitiveType,
        context: &str,
    ) -> AppResult<Option<Value>> {
        let raw = match literal.map(str::trim) {
            None | Some("") | Some("null") => return Ok(None),
            Some(raw) => raw,
        };
        let bad = || AppError::unknown_default(raw, ty.as_str(), context);

        let value = match ty {
            PrimitiveType::String => Value::String(raw.to_string()),
            PrimitiveType::Integer => Value::from(raw.parse::<i64>().map_err(|_| bad())?),
            PrimitiveType::Number => {
                let parsed = raw.parse::<f64>().map_err(|_| bad())?;
                Value::Number(Number::from_f64(parsed).ok_or_else(bad)?)
            }
            PrimitiveType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(bad()),
            },
            PrimitiveType::Array | PrimitiveType::Object | PrimitiveType::File => {
                return Err(bad())
            }
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_mapping() {
        let mapper = RpcTypeMapper;

        let cases = vec![
            ("bool", PrimitiveType::Boolean),
            ("int", PrimitiveType::Integer),
            ("bigint", PrimitiveType::Integer),
            ("float", PrimitiveType::Number),
            ("string", PrimitiveType::String),
            ("map", PrimitiveType::Object),
            ("array", PrimitiveType::Array),
            ("file", PrimitiveType::File),
        ];

        for (input, expected) in cases {
            let res = mapper.map(input).expect(input);
            assert_eq!(res, expected);
        }
    }

    #[test]
    fn test_unknown_primitive_is_malformed() {
        let err = RpcTypeMapper.map("double").unwrap_err();
        assert!(matches!(err, AppError::MalformedSchema(_)));
    }

    #[test]
    fn test_defaults() {
        let mapper = RpcTypeMapper;
        let ctx = "Foo.bar";
        assert_eq!(
            mapper.parse_default(Some("42"), PrimitiveType::Integer, ctx).unwrap(),
            Some(json!(42))
        );
        assert_eq!(
            mapper.parse_default(Some("-1.5"), PrimitiveType::Number, ctx).unwrap(),
            Some(json!(-1.5))
        );
        assert_eq!(
            mapper.parse_default(Some("FALSE"), PrimitiveType::Boolean, ctx).unwrap(),
            Some(json!(false))
        );
        assert_eq!(
            mapper.parse_default(Some("abc"), PrimitiveType::String, ctx).unwrap(),
            Some(json!("abc"))
        );
        assert_eq!(
            mapper.parse_default(Some("null"), PrimitiveType::Integer, ctx).unwrap(),
            None
        );
        assert_eq!(mapper.parse_default(None, PrimitiveType::Integer, ctx).unwrap(), None);
    }

    #[test]
    fn test_unparsable_default_is_fatal() {
        let mapper = RpcTypeMapper;
        let err = mapper
            .parse_default(Some("ten"), PrimitiveType::Integer, "Foo.count")
            .unwrap_err();
        match err {
            AppError::UnknownDefault { literal, type_name, context } => {
                assert_eq!(literal, "ten");
                assert_eq!(type_name, "integer");
                assert_eq!(context, "Foo.count");
            }
            other => panic!("Expected UnknownDefault, got {}", other),
        }
        assert!(mapper
            .parse_default(Some("[]"), PrimitiveType::Array, "Foo.list")
            .is_err());
    }

    #[test]
    fn test_file_value_type() {
        assert_eq!(PrimitiveType::File.value_type(), PrimitiveType::String);
        assert_eq!(PrimitiveType::Integer.value_type(), PrimitiveType::Integer);
        assert_eq!(PrimitiveType::File.to_string(), "file");
    }
}
