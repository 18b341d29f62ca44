//! Analysis settings.
//!
//! Values come from an optional TOML file; CLI flags and `HERDBOOK_*`
//! environment variables are layered on top by the binary.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::pedigree::MAX_GENERATIONS;
use crate::recommend::RecommendOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Generations per pedigree, subject included
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,

    #[serde(default = "default_max_population")]
    pub max_population_per_sex: usize,

    /// Pedigree builds in flight during recommendation
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Wall-clock budget for recommendation runs
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_population_per_sex: default_max_population(),
            concurrency: default_concurrency(),
            timeout_secs: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_depth() -> u8 {
    MAX_GENERATIONS
}

fn default_max_population() -> usize {
    200
}

fn default_concurrency() -> usize {
    8
}

fn default_max_connections() -> u32 {
    5
}

impl AnalysisConfig {
    /// A missing file is not an error; defaults apply.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_GENERATIONS).contains(&self.max_depth),
            "max_depth must be between 1 and {MAX_GENERATIONS}"
        );
        anyhow::ensure!(self.max_population_per_sex > 0, "max_population_per_sex must be positive");
        anyhow::ensure!(self.concurrency > 0, "concurrency must be positive");
        Ok(())
    }

    pub fn recommend_options(&self, limit: Option<usize>) -> RecommendOptions {
        RecommendOptions {
            max_depth: self.max_depth,
            max_population_per_sex: self.max_population_per_sex,
            concurrency: self.concurrency,
            limit,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        match self.timeout_secs {
            Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
            None => CancellationToken::new(),
        }
    }
}
