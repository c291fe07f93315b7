//! Organisation configuration.
//!
//! Loaded from TOML or built from one of the presets.

use crate::curve::CurveVersion;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Organisation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgConfig {
    /// Governance token name
    pub name: String,
    /// Governance token symbol
    pub symbol: String,
    /// Token decimals
    pub decimals: u8,
    /// Share of every deposit retained in the reserve (percent)
    pub reserve_ratio_percent: u8,
    /// Buy formula
    pub curve_version: CurveVersion,
    /// Vote weight is `isqrt(balance * multiplier)`
    pub vote_weight_multiplier: u64,
    pub reward_name: String,
    pub reward_symbol: String,
    /// Reward tokens minted per governance token bought; 0 disables rewards
    pub reward_multiplier: u64,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl OrgConfig {
    pub fn mainnet() -> Self {
        Self {
            name: "Mogul Token".to_string(),
            symbol: "MGL".to_string(),
            decimals: 18,
            reserve_ratio_percent: 20,
            curve_version: CurveVersion::Algebraic,
            vote_weight_multiplier: 10,
            reward_name: "Mogul Movie Token".to_string(),
            reward_symbol: "MOVIE".to_string(),
            reward_multiplier: 10,
        }
    }

    /// Development preset using the original square-root-of-ratio curve.
    pub fn devnet() -> Self {
        Self {
            name: "Mogul Dev Token".to_string(),
            symbol: "dMGL".to_string(),
            curve_version: CurveVersion::SqrtRatio,
            ..Self::mainnet()
        }
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: OrgConfig = toml::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.reserve_ratio_percent > 100 {
            anyhow::bail!(
                "reserve_ratio_percent must be at most 100, got {}",
                self.reserve_ratio_percent
            );
        }
        if self.vote_weight_multiplier == 0 {
            anyhow::bail!("vote_weight_multiplier cannot be 0");
        }
        if self.symbol.is_empty() {
            anyhow::bail!("Token symbol cannot be empty");
        }
        if self.reward_multiplier > 0 && self.reward_symbol.is_empty() {
            anyhow::bail!("Reward symbol cannot be empty while rewards are enabled");
        }
        Ok(())
    }
}
