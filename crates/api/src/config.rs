use centrality::{DEFAULT_BASE_OFFSET, ScoringScope, SizePolicy};
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Character graph enrichment service", long_about = None)]
pub struct Cli {
    /// Config file path (TOML, JSON or YAML)
    #[arg(short, long, env = "LORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "LORE_PORT")]
    pub port: Option<u16>,

    /// Relationship model artifact
    #[arg(long)]
    pub model: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub scoring: ScoringConfig,
    pub extractor: ExtractorConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base_offset: f64,
    pub scope: ScoringScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Longer texts are cut before they reach the model.
    pub max_input_chars: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            model: ModelConfig {
                artifact_path: PathBuf::from(classifier::DEFAULT_ARTIFACT_PATH),
            },
            scoring: ScoringConfig {
                base_offset: DEFAULT_BASE_OFFSET,
                scope: ScoringScope::Global,
            },
            extractor: ExtractorConfig {
                enabled: true,
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
                max_input_chars: 5000,
                timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 10000,
            },
            log: LogConfig { json: false },
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_args(std::env::args_os())
    }

    /// Priority: CLI flag > `LORE_*` environment > config file > defaults.
    /// E.g. `LORE_SCORING__SCOPE=per_component`.
    pub fn load_from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;

        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.clone()));
        }

        builder = builder.add_source(
            Environment::with_prefix("LORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(model) = &cli.model {
            builder = builder.set_override("model.artifact_path", model.to_string_lossy().to_string())?;
        }

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.size_policy()?;
        if self.cache.enabled && self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be positive when the cache is enabled");
        }
        if self.extractor.max_input_chars == 0 {
            anyhow::bail!("extractor.max_input_chars must be positive");
        }
        Ok(())
    }

    pub fn size_policy(&self) -> anyhow::Result<SizePolicy> {
        Ok(SizePolicy::new(self.scoring.base_offset)?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.size_policy().unwrap().base_offset(), 5.0);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_file_and_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lore.toml");
        fs::write(
            &path,
            "[scoring]\nbase_offset = 4.5\nscope = \"per_component\"\n\n[cache]\nenabled = false\nmax_entries = 0\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from_args([
            "api",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9100",
            "--model",
            "/srv/models/rel.json",
        ])
        .unwrap();

        assert_eq!(cfg.scoring.base_offset, 4.5);
        assert_eq!(cfg.scoring.scope, ScoringScope::PerComponent);
        assert!(!cfg.cache.enabled);
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.model.artifact_path, PathBuf::from("/srv/models/rel.json"));
        // untouched sections keep their defaults
        assert_eq!(cfg.extractor.model, "llama3");
    }

    #[test]
    fn test_flags_only_read_lore_variables() {
        let command = Cli::command();
        let envs: Vec<String> = command
            .get_arguments()
            .filter_map(|arg| arg.get_env())
            .map(|env| env.to_string_lossy().to_string())
            .collect();

        assert_eq!(envs, vec!["LORE_CONFIG".to_string(), "LORE_PORT".to_string()]);
    }

    #[test]
    fn test_out_of_range_base_offset_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[scoring]\nbase_offset = 10.0\n").unwrap();

        let err = AppConfig::load_from_args(["api", "--config", path.to_str().unwrap()]).unwrap_err();
        assert!(err.to_string().contains("base offset"), "{err}");
    }
}
