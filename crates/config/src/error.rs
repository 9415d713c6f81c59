use std::{fmt, path::PathBuf};

/// Category identifier shared by every resolution error.
pub const ERROR_NAME: &str = "ConfigError";

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoConfig,
    MultipleConfig,
    LoadFailure,
    Validation,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoConfig => "no-config",
            Self::MultipleConfig => "multiple-config",
            Self::LoadFailure => "load-failure",
            Self::Validation => "validation-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No config file found. Please create one.")]
    NoConfig { dir: PathBuf },

    #[error(
        "Multiple config files found: {}. Please keep only one.",
        file_names(files)
    )]
    MultipleConfig { files: Vec<PathBuf> },

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config resolution task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Always [`ERROR_NAME`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        ERROR_NAME
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoConfig { .. } => ErrorKind::NoConfig,
            Self::MultipleConfig { .. } => ErrorKind::MultipleConfig,
            Self::Load { .. } | Self::Task(_) => ErrorKind::LoadFailure,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Field-level issues, empty unless this is a validation error.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Validation(err) => &err.issues,
            _ => &[],
        }
    }
}

fn file_names(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a located config file could not be turned into a raw value.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Script(#[from] mlua::Error),

    #[error("config script has no default export; it must `return` a table")]
    NoExport,

    #[error("default export must be a table, got {found}")]
    NotATable { found: &'static str },

    #[error("cannot represent {type_name} value at '{path}' as configuration")]
    Unrepresentable {
        path: String,
        type_name: &'static str,
    },

    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },
}

// ── Validation ──────────────────────────────────────────────────────────────

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueCode {
    InvalidType {
        expected: &'static str,
        received: &'static str,
    },
    Required,
    InvalidUrl,
    TooSmall,
    InvalidDiscriminator {
        options: Vec<&'static str>,
    },
    /// Legacy and structured AI settings given together.
    Conflict,
    /// No AI settings from any source.
    MissingAi,
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted field path, e.g. `ai.region`. Empty for whole-document issues.
    pub path: String,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }

    pub fn invalid_type(
        path: impl Into<String>,
        expected: &'static str,
        received: &'static str,
    ) -> Self {
        Self::new(
            path,
            IssueCode::InvalidType { expected, received },
            format!("Expected {expected}, received {received}"),
        )
    }

    pub fn required(path: impl Into<String>) -> Self {
        Self::new(path, IssueCode::Required, "Required")
    }

    pub fn invalid_url(path: impl Into<String>) -> Self {
        Self::new(path, IssueCode::InvalidUrl, "must be a valid URL")
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self::new(path, IssueCode::TooSmall, "must not be empty")
    }

    pub fn invalid_discriminator(path: impl Into<String>, options: &[&'static str]) -> Self {
        let expected = options
            .iter()
            .map(|o| format!("'{o}'"))
            .collect::<Vec<_>>()
            .join(" | ");
        Self::new(
            path,
            IssueCode::InvalidDiscriminator {
                options: options.to_vec(),
            },
            format!("Invalid discriminator value. Expected {expected}"),
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every issue found while validating one raw config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// True if any issue sits at `path`.
    #[must_use]
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("; "))
    }
}

impl std::error::Error for ValidationError {}
