#![deny(missing_docs)]

//! # Swagger Command
//!
//! Reads a schema tree, compiles it, and writes the document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use cdd_rpc_core::{
    ApiSchema, BuilderConfig, OperationStyle, SwaggerBuilder, SwaggerDocument, TargetProfile,
};

use crate::error::{CliError, CliResult};

/// Arguments for the swagger command.
#[derive(clap::Args, Debug, Clone)]
pub struct SwaggerArgs {
    /// Path to the schema tree. `.yaml` / `.yml` files are read as YAML, anything else as JSON.
    #[clap(long, default_value = "schema.json")]
    pub schema_path: PathBuf,

    /// Output path for the document (`-` writes to stdout).
    #[clap(long, default_value = "swagger.json")]
    pub output_path: PathBuf,

    /// Target profile (`standard` or `enveloped`).
    #[clap(long, env = "CDD_TARGET_PROFILE")]
    pub profile: Option<String>,

    /// Operation style (`body` or `query`).
    #[clap(long, env = "CDD_OPERATION_STYLE")]
    pub style: Option<String>,

    /// Maximum bracket depth of flattened query parameters.
    #[clap(long, env = "CDD_MAX_QUERY_DEPTH")]
    pub max_depth: Option<usize>,

    /// Fail when the build recorded any diagnostic.
    #[clap(long)]
    pub strict: bool,
}

impl SwaggerArgs {
    /// Builds the compiler configuration from the flags.
    pub fn config(&self) -> CliResult<BuilderConfig> {
        let mut config = BuilderConfig::default();
        if let Some(profile) = &self.profile {
            config = config.with_profile(TargetProfile::parse(profile)?);
        }
        if let Some(style) = &self.style {
            config = config.with_operation_style(OperationStyle::parse(style)?);
        }
        if let Some(depth) = self.max_depth {
            config = config.with_max_query_depth(depth);
        }
        Ok(config)
    }
}

fn read_schema(path: &Path) -> CliResult<ApiSchema> {
    if !path.exists() {
        return Err(CliError::General(format!("Schema file not found: {:?}", path)));
    }
    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let schema = if is_yaml {
        ApiSchema::from_yaml_str(&content)?
    } else {
        ApiSchema::from_json_str(&content)?
    };
    Ok(schema)
}

/// Executes the compilation and returns the built document.
pub fn execute(args: &SwaggerArgs) -> CliResult<SwaggerDocument> {
    let config = args.config()?;
    let schema = read_schema(&args.schema_path)?;
    let doc = SwaggerBuilder::new(config).run(&schema)?;

    if args.strict && !doc.diagnostics().is_empty() {
        return Err(CliError::General(format!(
            "{} diagnostic(s) recorded, first: {}",
            doc.diagnostics().len(),
            doc.diagnostics()[0]
        )));
    }

    let json = doc.to_json_string()?;
    if args.output_path.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        if let Some(parent) = args.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&args.output_path, json)?;
        tracing::info!(output = ?args.output_path, "wrote swagger document");
    }

    Ok(doc)
}
