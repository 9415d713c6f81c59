//! Config file discovery and raw loading.

use std::path::{Path, PathBuf};

use {serde_json::Value, tracing::debug};

use crate::{
    env::{EnvLookup, substitute_env},
    error::{Error, LoadError, Result},
    script,
};

/// Recognized config file names. Exactly one may exist per project directory.
pub const CONFIG_FILENAMES: &[&str] = &["shortest.config.toml", "shortest.config.lua"];

/// Supported config source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Declarative TOML document.
    Toml,
    /// Lua chunk whose return value is the config.
    Lua,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> std::result::Result<Self, LoadError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "toml" => Ok(Self::Toml),
            "lua" => Ok(Self::Lua),
            _ => Err(LoadError::UnsupportedFormat {
                extension: ext.to_string(),
            }),
        }
    }
}

/// Find the single config file in `dir`.
///
/// Only the fixed names in [`CONFIG_FILENAMES`] are considered; a directory
/// carrying one of those names does not count.
pub fn find_config_file(dir: &Path) -> Result<PathBuf> {
    let found: Vec<PathBuf> = CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|p| p.is_file())
        .collect();

    match found.as_slice() {
        [] => {
            debug!(dir = %dir.display(), "no config file found");
            Err(Error::NoConfig {
                dir: dir.to_path_buf(),
            })
        },
        [path] => {
            debug!(path = %path.display(), "found config file");
            Ok(path.clone())
        },
        _ => Err(Error::MultipleConfig { files: found }),
    }
}

/// Turns a located config file into an unvalidated value.
pub trait RawConfigLoader {
    fn load(&self, path: &Path) -> Result<Value>;
}

/// Loads config files from disk, dispatching on the file extension.
///
/// Nothing is cached: each call re-reads the file and, for scripts,
/// evaluates it in a fresh interpreter.
pub struct FileLoader<'a> {
    env: &'a dyn EnvLookup,
}

impl<'a> FileLoader<'a> {
    /// `env` resolves `${VAR}` placeholders in TOML string values.
    pub fn new(env: &'a dyn EnvLookup) -> Self {
        Self { env }
    }

    fn load_value(&self, path: &Path) -> std::result::Result<Value, LoadError> {
        let format = ConfigFormat::from_path(path)?;
        let raw = std::fs::read_to_string(path)?;
        match format {
            ConfigFormat::Toml => {
                let table: toml::Table = toml::from_str(&raw)?;
                let value = serde_json::to_value(table)?;
                Ok(substitute_strings(value, self.env).unwrap_or(Value::Null))
            },
            ConfigFormat::Lua => script::evaluate(&raw, &path.to_string_lossy()),
        }
    }
}

impl RawConfigLoader for FileLoader<'_> {
    fn load(&self, path: &Path) -> Result<Value> {
        debug!(path = %path.display(), "loading config");
        self.load_value(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Apply env substitution to every string in `value`. Strings that resolve
/// to nothing are removed from their parent.
fn substitute_strings(value: Value, env: &dyn EnvLookup) -> Option<Value> {
    match value {
        Value::String(s) => substitute_env(&s, env).map(Value::String),
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .filter_map(|v| substitute_strings(v, env))
                .collect(),
        )),
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| substitute_strings(v, env).map(|v| (k, v)))
                .collect(),
        )),
        other => Some(other),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::error::ErrorKind, serde_json::json, tempfile::TempDir};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn finds_single_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shortest.config.toml", "headless = true\n");
        assert_eq!(find_config_file(dir.path()).unwrap(), path);
    }

    #[test]
    fn finds_single_lua() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shortest.config.lua", "return {}\n");
        assert_eq!(find_config_file(dir.path()).unwrap(), path);
    }

    #[test]
    fn empty_dir_is_no_config() {
        let dir = TempDir::new().unwrap();
        let err = find_config_file(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConfig);
        assert_eq!(err.to_string(), "No config file found. Please create one.");
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        write(&dir, "shortest.config.ts", "export default {}");
        write(&dir, "shortest.toml", "headless = true");
        std::fs::create_dir(dir.path().join("shortest.config.lua")).unwrap();
        let err = find_config_file(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConfig);
    }

    #[test]
    fn both_files_is_multiple_config() {
        let dir = TempDir::new().unwrap();
        write(&dir, "shortest.config.toml", "");
        write(&dir, "shortest.config.lua", "");
        let err = find_config_file(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MultipleConfig);
        assert!(err.to_string().contains("Multiple config files found"));
        assert!(err.to_string().contains("shortest.config.toml"));
        assert!(err.to_string().contains("shortest.config.lua"));
    }

    #[test]
    fn loads_toml_document_as_object() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "shortest.config.toml",
            r#"
headless = false
baseUrl = "http://localhost:3000"

[ai]
provider = "anthropic"
"#,
        );
        let value = FileLoader::new(&no_env).load(&path).unwrap();
        assert_eq!(
            value,
            json!({
                "headless": false,
                "baseUrl": "http://localhost:3000",
                "ai": { "provider": "anthropic" },
            })
        );
    }

    #[test]
    fn toml_placeholders_are_substituted() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "shortest.config.toml",
            r#"
baseUrl = "http://${HOST}/app"

[mailosaur]
apiKey = "${MAILOSAUR_API_KEY}"
serverId = "${MAILOSAUR_SERVER_ID}"
"#,
        );
        let env = |name: &str| match name {
            "HOST" => Some("localhost:3000".to_string()),
            "MAILOSAUR_API_KEY" => Some("mk".to_string()),
            _ => None,
        };
        let value = FileLoader::new(&env).load(&path).unwrap();
        assert_eq!(value["baseUrl"], "http://localhost:3000/app");
        assert_eq!(value["mailosaur"]["apiKey"], "mk");
        assert!(value["mailosaur"].get("serverId").is_none());
    }

    #[test]
    fn invalid_toml_is_load_failure() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shortest.config.toml", "headless = \n");
        let err = FileLoader::new(&no_env).load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailure);
        assert!(matches!(
            err,
            Error::Load {
                source: LoadError::Toml(_),
                ..
            }
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shortest.config.ts", "export default {}");
        let err = FileLoader::new(&no_env).load(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Load {
                source: LoadError::UnsupportedFormat { .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let err = FileLoader::new(&no_env)
            .load(&dir.path().join("shortest.config.toml"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Load {
                source: LoadError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn repeated_loads_reread_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shortest.config.lua", "return { headless = true }");
        let loader = FileLoader::new(&no_env);
        assert_eq!(loader.load(&path).unwrap()["headless"], true);

        write(&dir, "shortest.config.lua", "return { headless = false }");
        assert_eq!(loader.load(&path).unwrap()["headless"], false);
    }
}
