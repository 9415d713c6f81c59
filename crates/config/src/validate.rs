//! Configuration validation and normalization.
//!
//! Turns an untyped raw config into a [`ResolvedConfig`]: checks primitive
//! fields, reconciles legacy AI settings, resolves the provider-specific
//! section (filling gaps from the environment) and validates the optional
//! Mailosaur block. All issues found in one pass are reported together.
//!
//! Unknown keys are not errors; they are surfaced as [`Diagnostic`]s with a
//! "did you mean" suggestion when a known key is close.

use {
    secrecy::Secret,
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::{
    env::{
        ANTHROPIC_API_KEY, AWS_ACCESS_KEY_ID, AWS_REGION, AWS_SECRET_ACCESS_KEY,
        AWS_SESSION_TOKEN, EnvLookup,
    },
    error::{Issue, ValidationError},
    migrate::{self, LEGACY_KEY},
    schema::{
        AiProviderConfig, AmazonBedrockConfig, AnthropicConfig, DEFAULT_ANTHROPIC_MODEL,
        KNOWN_PROVIDERS, MailosaurConfig, PROVIDER_AMAZON_BEDROCK, PROVIDER_ANTHROPIC,
        ResolvedConfig,
    },
};

const TOP_LEVEL_KEYS: &[&str] = &[
    "headless",
    "baseUrl",
    "testPattern",
    "ai",
    LEGACY_KEY,
    "mailosaur",
];
const ANTHROPIC_KEYS: &[&str] = &["provider", "apiKey", "model"];
const BEDROCK_KEYS: &[&str] = &[
    "provider",
    "region",
    "accessKeyId",
    "secretAccessKey",
    "sessionToken",
    "model",
];
const MAILOSAUR_KEYS: &[&str] = &["apiKey", "serverId"];

/// JSON type name as reported in type-mismatch messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field_path(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{section}.{key}")
    }
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate `raw` and build the resolved configuration.
///
/// Environment values fill absent provider fields; `ANTHROPIC_API_KEY`
/// additionally overrides the anthropic `apiKey` from the file. Unknown keys
/// are not reported here; see [`check_unknown_fields`].
pub fn parse_config(raw: &Value, env: &dyn EnvLookup) -> Result<ResolvedConfig, ValidationError> {
    let Some(root) = raw.as_object() else {
        return Err(ValidationError::new(vec![Issue::invalid_type(
            "",
            "object",
            type_name(raw),
        )]));
    };

    let mut issues = Vec::new();

    // 1. Primitive fields
    let headless = record(&mut issues, parse_headless(root));
    let base_url = record(&mut issues, parse_base_url(root));
    let test_pattern = record(&mut issues, parse_test_pattern(root));

    // 2-4. Legacy migration, conflicts, missing AI settings
    // 5-6. Provider resolution with env gap-filling and key precedence
    let ai = match migrate::ai_section(root, env) {
        Ok(section) => resolve_provider(&section, env, &mut issues),
        Err(issue) => {
            issues.push(issue);
            None
        },
    };

    // 7. Mailosaur
    let mailosaur = parse_mailosaur(root, &mut issues);

    match (headless, base_url, test_pattern, ai, mailosaur) {
        (Some(headless), Some(base_url), Some(test_pattern), Some(ai), Some(mailosaur))
            if issues.is_empty() =>
        {
            Ok(ResolvedConfig {
                headless,
                base_url,
                test_pattern,
                ai,
                mailosaur,
            })
        },
        _ => Err(ValidationError::new(issues)),
    }
}

fn record<T>(issues: &mut Vec<Issue>, result: Result<T, Issue>) -> Option<T> {
    result.map_err(|issue| issues.push(issue)).ok()
}

fn parse_headless(root: &Map<String, Value>) -> Result<bool, Issue> {
    match root.get("headless") {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Issue::invalid_type("headless", "boolean", type_name(other))),
        None => Err(Issue::required("headless")),
    }
}

fn parse_base_url(root: &Map<String, Value>) -> Result<String, Issue> {
    match root.get("baseUrl") {
        Some(Value::String(s)) => match url::Url::parse(s) {
            Ok(_) => Ok(s.clone()),
            Err(e) => {
                debug!(base_url = %s, error = %e, "rejecting baseUrl");
                Err(Issue::invalid_url("baseUrl"))
            },
        },
        Some(other) => Err(Issue::invalid_type("baseUrl", "string", type_name(other))),
        None => Err(Issue::required("baseUrl")),
    }
}

fn parse_test_pattern(root: &Map<String, Value>) -> Result<String, Issue> {
    match root.get("testPattern") {
        Some(Value::String(s)) if s.is_empty() => Err(Issue::empty("testPattern")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Issue::invalid_type("testPattern", "string", type_name(other))),
        None => Err(Issue::required("testPattern")),
    }
}

// ── Provider resolution ─────────────────────────────────────────────────────

/// Read an optional string field. Absent is `Ok(None)`; any non-string value
/// (including null) is an issue.
fn optional_string(
    obj: &Map<String, Value>,
    section: &str,
    key: &str,
) -> Result<Option<String>, Issue> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Issue::invalid_type(
            field_path(section, key),
            "string",
            type_name(other),
        )),
    }
}

/// File value if present, otherwise `env_var`. Malformed file values are
/// never replaced by the environment.
fn string_or_env(
    obj: &Map<String, Value>,
    section: &str,
    key: &str,
    env_var: &str,
    env: &dyn EnvLookup,
) -> Result<Option<String>, Issue> {
    match optional_string(obj, section, key)? {
        Some(value) => Ok(Some(value)),
        None => {
            let value = env.var(env_var);
            if value.is_some() {
                debug!(field = %field_path(section, key), env_var, "filled from environment");
            }
            Ok(value)
        },
    }
}

fn required_string_or_env(
    obj: &Map<String, Value>,
    section: &str,
    key: &str,
    env_var: &str,
    env: &dyn EnvLookup,
) -> Result<String, Issue> {
    string_or_env(obj, section, key, env_var, env)?
        .ok_or_else(|| Issue::required(field_path(section, key)))
}

fn resolve_provider(
    section: &Value,
    env: &dyn EnvLookup,
    issues: &mut Vec<Issue>,
) -> Option<AiProviderConfig> {
    let Some(obj) = section.as_object() else {
        issues.push(Issue::invalid_type("ai", "object", type_name(section)));
        return None;
    };

    match obj.get("provider").and_then(Value::as_str) {
        Some(PROVIDER_ANTHROPIC) => resolve_anthropic(obj, env, issues),
        Some(PROVIDER_AMAZON_BEDROCK) => resolve_bedrock(obj, env, issues),
        _ => {
            issues.push(Issue::invalid_discriminator("ai.provider", KNOWN_PROVIDERS));
            None
        },
    }
}

fn resolve_anthropic(
    obj: &Map<String, Value>,
    env: &dyn EnvLookup,
    issues: &mut Vec<Issue>,
) -> Option<AiProviderConfig> {
    let api_key = match (optional_string(obj, "ai", "apiKey"), env.var(ANTHROPIC_API_KEY)) {
        (Err(issue), _) => Err(issue),
        (Ok(file_key), Some(env_key)) => {
            if file_key.is_some() {
                debug!("{ANTHROPIC_API_KEY} overrides the apiKey from the config file");
            }
            Ok(env_key)
        },
        (Ok(Some(file_key)), None) => Ok(file_key),
        (Ok(None), None) => Err(Issue::required("ai.apiKey")),
    };
    let api_key = record(issues, api_key);
    let model = record(issues, optional_string(obj, "ai", "model"));

    Some(AiProviderConfig::Anthropic(AnthropicConfig {
        api_key: Secret::new(api_key?),
        model: model?.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
    }))
}

fn resolve_bedrock(
    obj: &Map<String, Value>,
    env: &dyn EnvLookup,
    issues: &mut Vec<Issue>,
) -> Option<AiProviderConfig> {
    let region = record(
        issues,
        required_string_or_env(obj, "ai", "region", AWS_REGION, env),
    );
    let access_key_id = record(
        issues,
        required_string_or_env(obj, "ai", "accessKeyId", AWS_ACCESS_KEY_ID, env),
    );
    let secret_access_key = record(
        issues,
        required_string_or_env(obj, "ai", "secretAccessKey", AWS_SECRET_ACCESS_KEY, env),
    );
    let session_token = record(
        issues,
        string_or_env(obj, "ai", "sessionToken", AWS_SESSION_TOKEN, env),
    );
    let model = record(issues, optional_string(obj, "ai", "model"));

    Some(AiProviderConfig::AmazonBedrock(AmazonBedrockConfig {
        region: region?,
        access_key_id: Secret::new(access_key_id?),
        secret_access_key: Secret::new(secret_access_key?),
        session_token: session_token?.map(Secret::new),
        model: model?,
    }))
}

// ── Mailosaur ───────────────────────────────────────────────────────────────

/// `Some(None)` when the block is absent, `None` when it is invalid.
fn parse_mailosaur(
    root: &Map<String, Value>,
    issues: &mut Vec<Issue>,
) -> Option<Option<MailosaurConfig>> {
    let Some(block) = root.get("mailosaur") else {
        return Some(None);
    };
    let Some(obj) = block.as_object() else {
        issues.push(Issue::invalid_type("mailosaur", "object", type_name(block)));
        return None;
    };

    let required = |key: &str| {
        optional_string(obj, "mailosaur", key)?
            .ok_or_else(|| Issue::required(field_path("mailosaur", key)))
    };
    let api_key = record(issues, required("apiKey"));
    let server_id = record(issues, required("serverId"));

    Some(Some(MailosaurConfig {
        api_key: Secret::new(api_key?),
        server_id: server_id?,
    }))
}

// ── Unknown-field diagnostics ───────────────────────────────────────────────

/// An unknown key found in a raw config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dotted path, e.g. `ai.regoin`.
    pub path: String,
    pub message: String,
    pub suggestion: Option<&'static str>,
}

/// Report keys the schema does not know, with close-match suggestions.
///
/// Covers the top level, the `ai` section (per its provider) and the
/// `mailosaur` block. Never fails; unrecognized shapes are skipped.
#[must_use]
pub fn check_unknown_fields(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let Some(root) = raw.as_object() else {
        return diagnostics;
    };

    check_keys(root, "", TOP_LEVEL_KEYS, &mut diagnostics);

    if let Some(ai) = root.get("ai").and_then(Value::as_object) {
        let known = match ai.get("provider").and_then(Value::as_str) {
            Some(PROVIDER_ANTHROPIC) => Some(ANTHROPIC_KEYS),
            Some(PROVIDER_AMAZON_BEDROCK) => Some(BEDROCK_KEYS),
            _ => None,
        };
        if let Some(known) = known {
            check_keys(ai, "ai", known, &mut diagnostics);
        }
    }

    if let Some(mailosaur) = root.get("mailosaur").and_then(Value::as_object) {
        check_keys(mailosaur, "mailosaur", MAILOSAUR_KEYS, &mut diagnostics);
    }

    diagnostics
}

fn check_keys(
    obj: &Map<String, Value>,
    section: &str,
    known: &[&'static str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in obj.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        let suggestion = suggest(key, known, 3);
        let message = match suggestion {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic {
            path: field_path(section, key),
            message,
            suggestion,
        });
    }
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Best match for `needle` among `candidates` within `max_distance` edits.
fn suggest(needle: &str, candidates: &[&'static str], max_distance: usize) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}
