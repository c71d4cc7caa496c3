use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vault: VaultConfig,
    pub embedding: EmbeddingConfig,
    pub watcher: WatcherConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root of the note tree to index.
    pub root: String,
    pub db_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
    pub threshold: f32,
    pub graph_depth: usize,
    pub graph_max_per_level: usize,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NOTEGRAPH_VAULT_ROOT") {
            self.vault.root = v;
        }
        if let Ok(v) = std::env::var("NOTEGRAPH_DB_PATH") {
            self.vault.db_path = v;
        }
        if let Ok(v) = std::env::var("NOTEGRAPH_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("NOTEGRAPH_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            embedding: EmbeddingConfig::default(),
            watcher: WatcherConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: ".".into(),
            db_path: "./notegraph.db".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            batch_size: 32,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            threshold: 0.3,
            graph_depth: 2,
            graph_max_per_level: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = Config::load(Path::new("/does/not/exist.toml")).unwrap();
        assert_eq!(config.embedding.base_url, "http://localhost:11434");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.watcher.debounce_ms, 500);
        assert_eq!(config.search.graph_depth, 2);
    }

    #[test]
    fn parse_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
[vault]
root = "/vault"
db_path = "/vault/.notegraph.db"

[embedding]
model = "mxbai-embed-large"
batch_size = 16

[search]
threshold = 0.5
"#
        )
        .unwrap();

        for key in [
            "NOTEGRAPH_VAULT_ROOT",
            "NOTEGRAPH_DB_PATH",
            "NOTEGRAPH_EMBEDDING_BASE_URL",
            "NOTEGRAPH_EMBEDDING_MODEL",
        ] {
            unsafe { std::env::remove_var(key) };
        }

        let config = Config::load(&path).unwrap();
        assert_eq!(config.vault.root, "/vault");
        assert_eq!(config.embedding.model, "mxbai-embed-large");
        assert_eq!(config.embedding.batch_size, 16);
        // Unset sections and fields keep their defaults.
        assert_eq!(config.embedding.base_url, "http://localhost:11434");
        assert!((config.search.threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.search.limit, 10);
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        assert_eq!(config.embedding.model, "nomic-embed-text");

        unsafe { std::env::set_var("NOTEGRAPH_EMBEDDING_MODEL", "all-minilm") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("NOTEGRAPH_EMBEDDING_MODEL") };

        assert_eq!(config.embedding.model, "all-minilm");
    }
}
