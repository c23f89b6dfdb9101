//! Configuration loading for Snowball.
//! Reads snowball.toml from the current directory or path in SNOWBALL_CONFIG env var.

use serde::{Deserialize, Serialize};
use snowball_common::FilterCriteria;
use snowball_engine::{Direction, EngineConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub snowball: SnowballConfig,
    /// Applied to a project when it is first created.
    #[serde(default)]
    pub filters: FilterCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    #[serde(default = "default_project_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn default_project_dir()  -> PathBuf { PathBuf::from("./review") }
fn default_project_name() -> String  { "Literature review".to_string() }

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dir: default_project_dir(),
            name: default_project_name(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnowballConfig {
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_limit")]
    pub reference_limit: usize,
    #[serde(default = "default_limit")]
    pub citation_limit: usize,
    #[serde(default = "default_true")]
    pub enrich_extracted_references: bool,
}

fn default_limit() -> usize { 1000 }
fn default_true()  -> bool  { true }

impl Default for SnowballConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            reference_limit: default_limit(),
            citation_limit: default_limit(),
            enrich_extracted_references: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from snowball.toml.
    /// Checks SNOWBALL_CONFIG env var first, then current directory.
    /// A missing default file yields the built-in defaults; a missing file
    /// named by SNOWBALL_CONFIG is an error.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("SNOWBALL_CONFIG") {
            Ok(path) => Self::from_file(&path),
            Err(_) if Path::new("snowball.toml").exists() => Self::from_file("snowball.toml"),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let (Some(min), Some(max)) = (self.filters.min_year, self.filters.max_year) {
            if min > max {
                anyhow::bail!("filters.min_year ({min}) is after filters.max_year ({max})");
            }
        }
        if let (Some(min), Some(max)) = (self.filters.min_citations, self.filters.max_citations) {
            if min > max {
                anyhow::bail!("filters.min_citations ({min}) exceeds filters.max_citations ({max})");
            }
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            reference_limit: self.snowball.reference_limit,
            citation_limit: self.snowball.citation_limit,
            enrich_extracted_references: self.snowball.enrich_extracted_references,
        }
    }

    pub fn direction(&self) -> Direction {
        self.snowball.direction
    }
}

mod tests;
