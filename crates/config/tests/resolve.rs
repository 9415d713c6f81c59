#![allow(clippy::unwrap_used, clippy::expect_used)]
use {
    secrecy::ExposeSecret,
    shortest_config::{
        AiProviderConfig, ErrorKind, FileLoader, ResolvedConfig, initialize_config, resolve,
        resolve_with,
    },
    std::path::Path,
    tempfile::TempDir,
};

const TOML_CONFIG: &str = r#"
headless = true
baseUrl = "https://example.com"
testPattern = "app/**/*.test.ts"

[ai]
provider = "anthropic"
apiKey = "file-key"

[mailosaur]
apiKey = "mailosaur-key"
serverId = "server-1"
"#;

const LUA_CONFIG: &str = r#"
return {
  headless = true,
  baseUrl = "https://example.com",
  testPattern = "app/**/*.test.ts",
  ai = { provider = "anthropic", apiKey = "file-key" },
  mailosaur = { apiKey = "mailosaur-key", serverId = "server-1" },
}
"#;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn resolve_in(dir: &Path, env: &[(&str, &str)]) -> shortest_config::Result<ResolvedConfig> {
    let pairs: Vec<(String, String)> = env
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let lookup = move |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    resolve_with(dir, &FileLoader::new(&lookup), &lookup)
}

fn api_key(config: &ResolvedConfig) -> String {
    match &config.ai {
        AiProviderConfig::Anthropic(cfg) => cfg.api_key.expose_secret().clone(),
        other => panic!("expected anthropic, got {other:?}"),
    }
}

#[test]
fn toml_and_lua_resolve_identically() {
    let toml_dir = project(&[("shortest.config.toml", TOML_CONFIG)]);
    let lua_dir = project(&[("shortest.config.lua", LUA_CONFIG)]);

    let from_toml = resolve_in(toml_dir.path(), &[]).unwrap();
    let from_lua = resolve_in(lua_dir.path(), &[]).unwrap();

    assert_eq!(
        serde_json::to_value(&from_toml).unwrap(),
        serde_json::to_value(&from_lua).unwrap()
    );
    assert_eq!(api_key(&from_toml), api_key(&from_lua));
    assert_eq!(from_toml.mailosaur.unwrap().server_id, "server-1");
}

#[test]
fn env_key_beats_file_key_in_both_formats() {
    for (name, content) in [
        ("shortest.config.toml", TOML_CONFIG),
        ("shortest.config.lua", LUA_CONFIG),
    ] {
        let dir = project(&[(name, content)]);
        let config = resolve_in(dir.path(), &[("ANTHROPIC_API_KEY", "env-key")]).unwrap();
        assert_eq!(api_key(&config), "env-key", "{name}");
    }
}

#[test]
fn toml_placeholder_reads_key_from_env() {
    let dir = project(&[(
        "shortest.config.toml",
        r#"
headless = false
baseUrl = "http://localhost:3000"
testPattern = ".*"

[ai]
provider = "amazon-bedrock"
region = "${DEPLOY_REGION}"
accessKeyId = "${MISSING_VAR}"
secretAccessKey = "secret"
"#,
    )]);
    let config = resolve_in(dir.path(), &[
        ("DEPLOY_REGION", "ap-south-1"),
        ("SHORTEST_AWS_ACCESS_KEY_ID", "AKIA-env"),
    ])
    .unwrap();
    match &config.ai {
        AiProviderConfig::AmazonBedrock(cfg) => {
            assert_eq!(cfg.region, "ap-south-1");
            // unresolved placeholder leaves the field absent for env fill-in
            assert_eq!(cfg.access_key_id.expose_secret(), "AKIA-env");
        },
        other => panic!("expected bedrock, got {other:?}"),
    }
}

#[test]
fn empty_directory_reports_no_config() {
    let dir = TempDir::new().unwrap();
    let err = resolve_in(dir.path(), &[]).unwrap_err();
    assert_eq!(err.to_string(), "No config file found. Please create one.");
    assert_eq!(err.name(), "ConfigError");
    assert_eq!(err.kind(), ErrorKind::NoConfig);
}

#[test]
fn two_config_files_are_rejected() {
    let dir = project(&[
        ("shortest.config.toml", TOML_CONFIG),
        ("shortest.config.lua", LUA_CONFIG),
    ]);
    let err = resolve_in(dir.path(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MultipleConfig);
}

#[test]
fn lua_runtime_error_is_load_failure() {
    let dir = project(&[("shortest.config.lua", r#"error("cannot read secrets")"#)]);
    let err = resolve_in(dir.path(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailure);
    assert_eq!(err.name(), "ConfigError");
    assert!(err.issues().is_empty());
}

#[test]
fn invalid_file_reports_every_issue() {
    let dir = project(&[(
        "shortest.config.toml",
        r#"
headless = "yes"
baseUrl = "not-a-url"
testPattern = ""
anthropicKey = "k"
"#,
    )]);
    let err = resolve_in(dir.path(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, ["headless", "baseUrl", "testPattern"]);
}

#[test]
fn edits_are_seen_on_next_resolution() {
    let dir = project(&[("shortest.config.lua", LUA_CONFIG)]);
    assert!(resolve_in(dir.path(), &[]).unwrap().headless);

    std::fs::write(
        dir.path().join("shortest.config.lua"),
        LUA_CONFIG.replace("headless = true", "headless = false"),
    )
    .unwrap();
    assert!(!resolve_in(dir.path(), &[]).unwrap().headless);
}

#[test]
fn resolve_reads_process_environment() {
    let dir = project(&[("shortest.config.toml", TOML_CONFIG)]);
    let config = resolve(dir.path()).unwrap();
    assert_eq!(config.ai.provider(), "anthropic");
}

#[tokio::test]
async fn initialize_config_resolves_on_blocking_pool() {
    let dir = project(&[("shortest.config.lua", LUA_CONFIG)]);
    let config = initialize_config(dir.path()).await.unwrap();
    assert_eq!(config.base_url, "https://example.com");
    assert_eq!(config.test_pattern, "app/**/*.test.ts");

    let empty = TempDir::new().unwrap();
    let err = initialize_config(empty.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoConfig);
}
