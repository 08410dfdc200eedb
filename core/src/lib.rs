#![deny(missing_docs)]

//! # CDD RPC Core
//!
//! Compiles a normalized RPC API schema tree (classes, enums, services,
//! errors) into a Swagger 2.0 document.

/// Shared error types.
pub mod error;

/// Build configuration.
pub mod config;

/// Input schema tree.
pub mod model;

/// Description clean-up.
pub mod text;

/// Type mapping logic (schema types -> JSON Schema primitives).
pub mod type_mapper;

/// Enumeration registry.
pub mod enum_catalog;

/// Class hierarchy index.
pub mod schema_index;

/// Class definitions and polymorphism.
pub mod definitions;

/// Query parameter flattening.
pub mod expander;

/// Operation generation.
pub mod operations;

/// Document assembly.
pub mod document;

/// Post-processing passes.
pub mod finishing;

pub use config::{BuilderConfig, ConnectionInfo, ListLookup, OperationStyle, TargetProfile};
pub use definitions::{DefinitionBuilder, DefinitionSet};
pub use document::{build_document, SwaggerBuilder, SwaggerDocument};
pub use enum_catalog::EnumCatalog;
pub use error::{AppError, AppResult, Diagnostic};
pub use expander::{Expansion, FlatParam, ParameterExpander};
pub use model::{
    ActionNode, ApiSchema, ClassNode, EnumConstant, EnumKind, EnumNode, ErrorNode, ParamNode,
    PropertyNode, RequestConfigParam, ResultNode, ServiceNode,
};
pub use schema_index::SchemaIndex;
pub use type_mapper::{PrimitiveType, RpcTypeMapper, TypeMapper};
