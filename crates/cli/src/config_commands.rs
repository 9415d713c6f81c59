use std::path::{Path, PathBuf};

use {anyhow::Result, clap::Subcommand};

use shortest_config::{
    Diagnostic, EnvLookup, Error, FileLoader, ProcessEnv, RawConfigLoader, ResolvedConfig,
    check_unknown_fields, find_config_file, parse_config,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the project config file and report errors/warnings.
    Check {
        /// Project directory containing the config file.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Also print a summary of the resolved configuration.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the resolved configuration as JSON, with secrets redacted.
    Show {
        /// Project directory containing the config file.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

pub async fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { dir, verbose } => check(&dir, verbose),
        ConfigAction::Show { dir } => show(dir).await,
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Outcome of checking one project directory.
struct CheckReport {
    path: Option<PathBuf>,
    warnings: Vec<Diagnostic>,
    outcome: std::result::Result<ResolvedConfig, Error>,
}

/// Same pipeline as `resolve_with`, keeping the raw value around so unknown
/// fields can be reported alongside the result.
fn run_check(dir: &Path, env: &dyn EnvLookup) -> CheckReport {
    let path = match find_config_file(dir) {
        Ok(path) => path,
        Err(e) => {
            return CheckReport {
                path: None,
                warnings: Vec::new(),
                outcome: Err(e),
            };
        },
    };

    let raw = match FileLoader::new(env).load(&path) {
        Ok(raw) => raw,
        Err(e) => {
            return CheckReport {
                path: Some(path),
                warnings: Vec::new(),
                outcome: Err(e),
            };
        },
    };

    CheckReport {
        path: Some(path),
        warnings: check_unknown_fields(&raw),
        outcome: parse_config(&raw, env).map_err(Error::from),
    }
}

fn check(dir: &Path, verbose: bool) -> Result<()> {
    let report = run_check(dir, &ProcessEnv);

    if let Some(ref path) = report.path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("Checking {}\n", dir.display());
    }

    for d in &report.warnings {
        eprintln!("  {BOLD}{YELLOW}warning{RESET} {}: {}", d.path, d.message);
    }

    let errors = match &report.outcome {
        Ok(config) => {
            if verbose {
                print_summary(config);
            }
            0
        },
        Err(e) => print_error(e),
    };
    let warnings = report.warnings.len();

    if errors > 0 || warnings > 0 || verbose {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Print `err` and return how many errors it represents.
fn print_error(err: &Error) -> usize {
    let kind = err.kind();
    if err.issues().is_empty() {
        eprintln!("  {BOLD}{RED}error{RESET} [{kind}] {err}");
        return 1;
    }
    for issue in err.issues() {
        eprintln!("  {BOLD}{RED}error{RESET} [{kind}] {issue}");
    }
    err.issues().len()
}

fn print_summary(config: &ResolvedConfig) {
    let info = |label: &str, value: &str| {
        eprintln!("  {BOLD}{CYAN}info{RESET} {label}: {value}");
    };
    info("provider", config.ai.provider());
    if let Some(model) = config.ai.model() {
        info("model", model);
    }
    info("baseUrl", &config.base_url);
    info("testPattern", &config.test_pattern);
    info("headless", if config.headless { "true" } else { "false" });
    info(
        "mailosaur",
        if config.mailosaur.is_some() {
            "configured"
        } else {
            "not configured"
        },
    );
}

async fn show(dir: PathBuf) -> Result<()> {
    match shortest_config::initialize_config(dir).await {
        Ok(config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        },
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        },
    }
}
