//! Project configuration loading and validation for the shortest test runner.
//!
//! A project directory holds exactly one of `shortest.config.toml` or
//! `shortest.config.lua`. The file is loaded into an untyped value, legacy
//! AI settings are migrated, environment variables fill provider gaps, and
//! the result is validated into a [`ResolvedConfig`].
//!
//! TOML string values support `${ENV_VAR}` substitution. Lua configs are
//! evaluated fresh on every load.

pub mod env;
pub mod error;
pub mod loader;
pub mod migrate;
pub mod schema;
mod script;
pub mod validate;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use {
    env::{EnvLookup, ProcessEnv},
    error::{ERROR_NAME, Error, ErrorKind, Issue, IssueCode, LoadError, Result, ValidationError},
    loader::{CONFIG_FILENAMES, ConfigFormat, FileLoader, RawConfigLoader, find_config_file},
    schema::{
        AiProviderConfig, AmazonBedrockConfig, AnthropicConfig, DEFAULT_ANTHROPIC_MODEL,
        MailosaurConfig, ResolvedConfig,
    },
    validate::{Diagnostic, check_unknown_fields, parse_config},
};

/// Resolve the configuration in `dir` using the process environment.
pub fn resolve(dir: &Path) -> Result<ResolvedConfig> {
    let env = ProcessEnv;
    resolve_with(dir, &FileLoader::new(&env), &env)
}

/// Resolve the configuration in `dir` with an explicit loader and
/// environment source.
pub fn resolve_with(
    dir: &Path,
    loader: &dyn RawConfigLoader,
    env: &dyn EnvLookup,
) -> Result<ResolvedConfig> {
    let path = find_config_file(dir)?;
    let raw = loader.load(&path)?;
    for diagnostic in check_unknown_fields(&raw) {
        warn!(path = %diagnostic.path, "{}", diagnostic.message);
    }
    let config = parse_config(&raw, env)?;
    info!(
        path = %path.display(),
        provider = config.ai.provider(),
        "loaded config"
    );
    Ok(config)
}

/// Async entry point: resolves on the blocking pool.
///
/// Every call re-reads the config file; nothing is cached between calls.
pub async fn initialize_config(dir: impl Into<PathBuf>) -> Result<ResolvedConfig> {
    let dir = dir.into();
    tokio::task::spawn_blocking(move || resolve(&dir)).await?
}
