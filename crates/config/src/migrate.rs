//! Legacy `anthropicKey` handling.
//!
//! Older configs carried a flat `anthropicKey` string; current ones use the
//! structured `ai` object. This module reconciles the two into a single raw
//! `ai` value before provider resolution.

use serde_json::{Map, Value, json};

use crate::{
    env::{ANTHROPIC_API_KEY, EnvLookup},
    error::{Issue, IssueCode},
    schema::PROVIDER_ANTHROPIC,
    validate::type_name,
};

/// Deprecated top-level key superseded by `ai`.
pub const LEGACY_KEY: &str = "anthropicKey";

/// Produce the raw `ai` value to resolve, or the single issue that makes it
/// impossible.
///
/// - `ai` alone is returned unchanged.
/// - `anthropicKey` alone becomes `{ provider: "anthropic", apiKey }`.
/// - Both at once is a conflict.
/// - Neither is accepted only when [`ANTHROPIC_API_KEY`] is set, yielding a
///   bare anthropic section the env key completes later.
pub(crate) fn ai_section(root: &Map<String, Value>, env: &dyn EnvLookup) -> Result<Value, Issue> {
    match (root.get(LEGACY_KEY), root.get("ai")) {
        (Some(_), Some(_)) => Err(Issue::new(
            "",
            IssueCode::Conflict,
            "Both 'ai' and legacy 'anthropicKey' are provided. Please remove the deprecated \
             'anthropicKey'.",
        )),
        (Some(legacy), None) => migrate_legacy_key(legacy),
        (None, Some(ai)) => Ok(ai.clone()),
        (None, None) if env.var(ANTHROPIC_API_KEY).is_some() => {
            Ok(json!({ "provider": PROVIDER_ANTHROPIC }))
        },
        (None, None) => Err(Issue::new(
            "",
            IssueCode::MissingAi,
            "No AI configuration provided. Please provide the 'ai' configuration.",
        )),
    }
}

fn migrate_legacy_key(legacy: &Value) -> Result<Value, Issue> {
    match legacy {
        Value::String(key) => Ok(json!({
            "provider": PROVIDER_ANTHROPIC,
            "apiKey": key,
        })),
        other => Err(Issue::invalid_type(LEGACY_KEY, "string", type_name(other))),
    }
}
