use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text");
    assert_eq!(config.ollama.retry_attempts, 1);
    assert_eq!(config.corpus.extension, "json");
    assert_eq!(config.search.default_limit, 5);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.retry_attempts = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.corpus.extension = ".json".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.search.default_limit = 100;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidDefaultLimit(100, 50))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
            [ollama]
            host = "gpu-box"
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(parsed.ollama.host, "gpu-box");
    assert_eq!(parsed.ollama.port, 11434);
    assert_eq!(parsed.corpus, CorpusConfig::default());
    assert_eq!(parsed.search, SearchConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_timeout_seconds(120).is_ok());
    assert!(config.set_retry_attempts(3).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_timeout_seconds(0).is_err());
    assert!(config.set_retry_attempts(11).is_err());

    assert_eq!(config.protocol, "https");
    assert_eq!(config.retry_attempts, 3);
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("missing config should load defaults");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn save_then_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.ollama.model = "mxbai-embed-large".to_string();
    config.search.default_limit = 8;

    config.save().expect("config should save");
    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path().join("nested")).expect("config should load");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[ollama]\nprotocol = \"gopher\"\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn storage_paths() {
    let config = Config {
        base_dir: PathBuf::from("/srv/catalog"),
        ..Config::default()
    };
    assert_eq!(config.index_dir(), PathBuf::from("/srv/catalog/index"));
    assert_eq!(config.documents_dir(), PathBuf::from("/srv/catalog/documents"));

    let relative = Config {
        corpus: CorpusConfig {
            documents_dir: Some(PathBuf::from("products")),
            ..CorpusConfig::default()
        },
        ..config.clone()
    };
    assert_eq!(relative.documents_dir(), PathBuf::from("/srv/catalog/products"));

    let absolute = Config {
        corpus: CorpusConfig {
            documents_dir: Some(PathBuf::from("/data/products")),
            ..CorpusConfig::default()
        },
        ..config
    };
    assert_eq!(absolute.documents_dir(), PathBuf::from("/data/products"));
}

#[test]
fn effective_limit_clamps() {
    let config = Config::default();
    assert_eq!(config.effective_limit(None), 5);
    assert_eq!(config.effective_limit(Some(0)), 1);
    assert_eq!(config.effective_limit(Some(12)), 12);
    assert_eq!(config.effective_limit(Some(5000)), 50);
}
