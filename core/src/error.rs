//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the compiler.
//!
//! Only fatal conditions are errors. Lookup misses that the compiler can
//! degrade around are reported as [`Diagnostic`] values instead.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// The input tree references something that does not exist
    /// (class, base class, primitive type) or declares a class twice.
    #[from(ignore)]
    #[display("Malformed Schema: {_0}")]
    MalformedSchema(String),

    /// A default or enum literal that cannot be parsed under its declared type.
    #[from(ignore)]
    #[display("Unknown Default: '{literal}' is not a valid {type_name} (in {context})")]
    UnknownDefault {
        /// The raw literal as found in the input.
        literal: String,
        /// The declared type the literal was parsed against.
        type_name: String,
        /// Where the literal was declared (e.g. `Foo.bar`).
        context: String,
    },

    /// Wrapper for JSON (de)serialization errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// Wrapper for YAML deserialization errors.
    #[display("YAML Error: {_0}")]
    Yaml(serde_yaml::Error),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// A non-fatal condition. The affected fragment is omitted and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Diagnostic {
    /// A name that should resolve but does not (enum reference, error name).
    #[display("{what} '{name}' not found (in {context})")]
    LookupMiss {
        /// What kind of name was looked up.
        what: &'static str,
        /// The name itself.
        name: String,
        /// Where the lookup happened.
        context: String,
    },

    /// A flattened parameter branch cut off at the depth bound.
    #[display("Expansion of '{root}' truncated at '{path}'")]
    Truncated {
        /// Class being expanded.
        root: String,
        /// Bracket path at which recursion stopped.
        path: String,
    },
}

impl Diagnostic {
    /// Logs the diagnostic and records it in `sink`.
    pub(crate) fn emit(self, sink: &mut Vec<Diagnostic>) {
        tracing::warn!(diagnostic = %self, "degraded output");
        sink.push(self);
    }
}

impl AppError {
    /// Shorthand for an unresolvable name.
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        AppError::MalformedSchema(msg.into())
    }

    /// Shorthand for an unparsable literal.
    pub(crate) fn unknown_default(
        literal: impl Into<String>,
        type_name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        AppError::UnknownDefault {
            literal: literal.into(),
            type_name: type_name.into(),
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversion() {
        // Test that String defaults to General, not MalformedSchema
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }

    #[test]
    fn test_unknown_default_display() {
        let err = AppError::unknown_default("abc", "integer", "Foo.bar");
        assert_eq!(
            format!("{}", err),
            "Unknown Default: 'abc' is not a valid integer (in Foo.bar)"
        );
    }

    #[test]
    fn test_malformed_display() {
        let err = AppError::malformed("Unknown class 'Nope'");
        assert_eq!(format!("{}", err), "Malformed Schema: Unknown class 'Nope'");
    }
}
