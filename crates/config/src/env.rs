//! Environment lookups and `${ENV_VAR}` substitution.
//!
//! Nothing in this crate reads `std::env` directly except [`ProcessEnv`];
//! everything else goes through [`EnvLookup`] so validation can be exercised
//! without mutating the process environment.

/// Canonical API key for the default (anthropic) provider. Wins over any key
/// declared in the config file.
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Bedrock region used when the config file omits `ai.region`.
pub const AWS_REGION: &str = "SHORTEST_AWS_REGION";
pub const AWS_ACCESS_KEY_ID: &str = "SHORTEST_AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "SHORTEST_AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "SHORTEST_AWS_SESSION_TOKEN";

/// Name → value lookup. Empty values are reported as unset.
pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Option<String> {
        self(name).filter(|v| !v.is_empty())
    }
}

/// Substitute `${ENV_VAR}` placeholders in a config string value.
///
/// Returns `None` when the whole value is a single placeholder whose
/// variable is unset, so the field reads as absent. Unresolved placeholders
/// inside longer strings are left as-is.
pub fn substitute_env(input: &str, env: &dyn EnvLookup) -> Option<String> {
    if let Some(name) = sole_placeholder(input) {
        return env.var(name);
    }
    Some(substitute_env_with(input, env))
}

fn sole_placeholder(input: &str) -> Option<&str> {
    input
        .strip_prefix("${")?
        .strip_suffix('}')
        .filter(|name| !name.is_empty() && !name.contains(|c| matches!(c, '$' | '{' | '}')))
}

fn substitute_env_with(input: &str, env: &dyn EnvLookup) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if closed && !var_name.is_empty() {
                match env.var(&var_name) {
                    Some(val) => result.push_str(&val),
                    None => {
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    },
                }
            } else {
                // Malformed, emit literal.
                result.push_str("${");
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}
