#![deny(missing_docs)]

//! # Builder Configuration
//!
//! The explicit configuration value consumed by [`crate::SwaggerBuilder`].
//!
//! Every knob has a default matching the production schema, so
//! `BuilderConfig::default()` is a complete configuration. `from_env` lets an
//! outer driver select the profile and operation style from the environment.

use crate::error::{AppError, AppResult};
use serde::Deserialize;

/// Default bracket-nesting bound for flattened query parameters.
pub const DEFAULT_MAX_QUERY_DEPTH: usize = 4;

/// Environment variable selecting the [`TargetProfile`].
pub const ENV_TARGET_PROFILE: &str = "CDD_TARGET_PROFILE";
/// Environment variable selecting the [`OperationStyle`].
pub const ENV_OPERATION_STYLE: &str = "CDD_OPERATION_STYLE";
/// Environment variable overriding the maximum expansion depth.
pub const ENV_MAX_QUERY_DEPTH: &str = "CDD_MAX_QUERY_DEPTH";

/// Which API flavour the document describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetProfile {
    /// Session key travels as a query parameter.
    #[default]
    Standard,
    /// Session key and API version travel inside a JSON request envelope.
    Enveloped,
}

impl TargetProfile {
    /// Parses `standard` / `enveloped` (case-insensitive).
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(TargetProfile::Standard),
            "enveloped" => Ok(TargetProfile::Enveloped),
            other => Err(AppError::General(format!(
                "Unknown target profile '{}' (expected 'standard' or 'enveloped')",
                other
            ))),
        }
    }
}

/// How actions are exposed as HTTP operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStyle {
    /// `POST` with a JSON body mirroring the action parameters.
    #[default]
    Body,
    /// `GET` with (flattened) query parameters.
    Query,
}

impl OperationStyle {
    /// Parses `body` / `query` (case-insensitive).
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "body" | "post" => Ok(OperationStyle::Body),
            "query" | "get" => Ok(OperationStyle::Query),
            other => Err(AppError::General(format!(
                "Unknown operation style '{}' (expected 'body' or 'query')",
                other
            ))),
        }
    }

    /// The HTTP method key used in `paths`.
    pub fn method(self) -> &'static str {
        match self {
            OperationStyle::Body => "post",
            OperationStyle::Query => "get",
        }
    }
}

/// Host, base path and `info` block of the generated document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Host name (no scheme).
    pub host: String,
    /// Base path all action paths hang off.
    pub base_path: String,
    /// `info.title`.
    pub title: String,
    /// `info.description`.
    pub description: Option<String>,
}

impl ConnectionInfo {
    /// Default connection info for a profile.
    pub fn for_profile(profile: TargetProfile) -> Self {
        match profile {
            TargetProfile::Standard => Self {
                host: "api.example.com".into(),
                base_path: "/api_v3".into(),
                title: "RPC API".into(),
                description: Some("HTTP description of the RPC service schema".into()),
            },
            TargetProfile::Enveloped => Self {
                host: "api.example.com".into(),
                base_path: "/api_v3".into(),
                title: "RPC API (enveloped)".into(),
                description: Some("HTTP description of the enveloped RPC service schema".into()),
            },
        }
    }
}

/// A "pick from list" hint: parameters named `parameter` get their options
/// from the `list` action of `service`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLookup {
    /// Parameter (or body property) name the hint applies to.
    pub parameter: String,
    /// Service whose `list` action provides the options.
    pub service: String,
    /// Action of `service` whose operation carries the hint.
    #[serde(default = "default_lookup_action")]
    pub action: String,
    /// Field of the listed objects used as the option label.
    pub label: String,
}

fn default_lookup_action() -> String {
    "get".into()
}

/// Configuration for a single compiler run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderConfig {
    /// Target profile (connection info, security scheme, envelope definition).
    pub profile: TargetProfile,
    /// Preferred operation style. Actions with file parameters always use query style.
    pub operation_style: OperationStyle,
    /// Maximum bracket-nesting depth of flattened query parameter names.
    pub max_query_depth: usize,
    /// Service names that are skipped when generating paths.
    pub excluded_services: Vec<String>,
    /// Name of the synthetic, property-less root definition.
    pub root_class: String,
    /// Name of the session credential parameter.
    pub session_parameter: String,
    /// Connection info; `None` picks the profile default.
    pub connection: Option<ConnectionInfo>,
    /// "Pick from list" hints.
    pub list_lookups: Vec<ListLookup>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            profile: TargetProfile::Standard,
            operation_style: OperationStyle::Body,
            max_query_depth: DEFAULT_MAX_QUERY_DEPTH,
            excluded_services: [
                "document",
                "search",
                "mixing",
                "liveChannel",
                "liveChannelSegment",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            root_class: "ObjectBase".into(),
            session_parameter: "ks".into(),
            connection: None,
            list_lookups: vec![ListLookup {
                parameter: "entryId".into(),
                service: "media".into(),
                action: default_lookup_action(),
                label: "name".into(),
            }],
        }
    }
}

impl BuilderConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_TARGET_PROFILE) {
            config.profile = TargetProfile::parse(&raw)?;
        }
        if let Some(raw) = lookup(ENV_OPERATION_STYLE) {
            config.operation_style = OperationStyle::parse(&raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_QUERY_DEPTH) {
            let depth = raw.trim().parse::<usize>().map_err(|e| {
                AppError::General(format!("Invalid {} '{}': {}", ENV_MAX_QUERY_DEPTH, raw, e))
            })?;
            config.max_query_depth = depth;
        }
        Ok(config)
    }

    /// Sets the target profile.
    pub fn with_profile(mut self, profile: TargetProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the preferred operation style.
    pub fn with_operation_style(mut self, style: OperationStyle) -> Self {
        self.operation_style = style;
        self
    }

    /// Sets the maximum bracket depth of flattened parameters.
    pub fn with_max_query_depth(mut self, depth: usize) -> Self {
        self.max_query_depth = depth;
        self
    }

    /// Replaces the excluded-service list.
    pub fn with_excluded_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Sets explicit connection info.
    pub fn with_connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Effective connection info.
    pub fn connection_info(&self) -> ConnectionInfo {
        self.connection
            .clone()
            .unwrap_or_else(|| ConnectionInfo::for_profile(self.profile))
    }

    /// Whether a service is on the deny-list.
    pub fn is_excluded(&self, service_name: &str) -> bool {
        self.excluded_services.iter().any(|s| s == service_name)
    }
}
