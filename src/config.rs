use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub app_name: String,
    /// Largest k a caller may request
    pub max_k: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            app_name: "NYC Court Finder".to_string(),
            max_k: 10,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// One named dataset; declaration order is merge order
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub min_delay_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "tennis-practice".to_string(),
            min_delay_ms: 1000,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)?;

        // Relative dataset paths are resolved against the config file location
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.with_base_dir(base))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.server.max_k == 0 {
            anyhow::bail!("server.max_k must be at least 1");
        }
        Ok(config)
    }

    fn with_base_dir(mut self, base: &Path) -> Self {
        for dataset in &mut self.datasets {
            if dataset.path.is_relative() {
                dataset.path = base.join(&dataset.path);
            }
        }
        self
    }

    /// (name, path) pairs in declaration order
    pub fn dataset_sources(&self) -> Vec<(String, PathBuf)> {
        self.datasets
            .iter()
            .map(|d| (d.name.clone(), d.path.clone()))
            .collect()
    }
}
