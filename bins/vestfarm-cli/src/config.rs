//! Deployment configuration loaded from a TOML or JSON file, overlaid by
//! `VESTFARM__*` environment variables.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use vestfarm_core::constants::{DEFAULT_REWARD_DURATION, DEFAULT_SPLITS, DEFAULT_VESTING_PERIOD};
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp};
use vestfarm_engine::FarmParams;

/// Environment prefix; `VESTFARM__FACTORY__GENESIS_TIME=0` overrides
/// `factory.genesis_time`.
const ENV_PREFIX: &str = "VESTFARM";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeploymentConfig {
    pub factory: FactoryConfig,
    #[serde(default)]
    pub farms: Vec<FarmEntry>,
    /// Initial custody balances. Simulation only.
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
    /// Timed actions in non-decreasing `at` order. Simulation only.
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FactoryConfig {
    pub owner: AccountId,
    pub reward_asset: AssetClass,
    pub genesis_time: Timestamp,
    /// Units moved from the owner into the factory pool before any step.
    #[serde(default)]
    pub funding: Amount,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FarmEntry {
    pub staking_asset: AssetClass,
    pub reward_amount: Amount,
    #[serde(default = "default_reward_duration")]
    pub reward_duration: u64,
    #[serde(default = "default_vesting_period")]
    pub vesting_period: u64,
    #[serde(default = "default_splits")]
    pub splits: u32,
    /// Unavailable farms are skipped at deployment.
    #[serde(default = "default_available")]
    pub available: bool,
}

impl FarmEntry {
    pub fn params(&self) -> FarmParams {
        FarmParams {
            staked_asset: self.staking_asset.clone(),
            reward_amount: self.reward_amount,
            reward_duration: self.reward_duration,
            vesting_period: self.vesting_period,
            splits: self.splits,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BalanceEntry {
    pub account: AccountId,
    pub asset: AssetClass,
    pub amount: Amount,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Step {
    pub at: Timestamp,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Stake {
        account: AccountId,
        asset: AssetClass,
        amount: Amount,
    },
    Withdraw {
        account: AccountId,
        asset: AssetClass,
        amount: Amount,
    },
    GetReward {
        account: AccountId,
        asset: AssetClass,
    },
    Exit {
        account: AccountId,
        asset: AssetClass,
    },
    SetVestingConfig {
        account: AccountId,
        asset: AssetClass,
        opt_in: bool,
    },
    DistributeAll,
    Distribute {
        asset: AssetClass,
    },
    Fund {
        from: AccountId,
        amount: Amount,
    },
}

fn default_reward_duration() -> u64 {
    DEFAULT_REWARD_DURATION
}

fn default_vesting_period() -> u64 {
    DEFAULT_VESTING_PERIOD
}

fn default_splits() -> u32 {
    DEFAULT_SPLITS
}

fn default_available() -> bool {
    true
}

impl DeploymentConfig {
    /// Load and validate `path`. The format follows the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read deployment config {}", path.display()))?;
        let cfg: Self = settings
            .try_deserialize()
            .with_context(|| format!("invalid deployment config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `$CONFIG_DIR/vestfarm/deployment.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vestfarm")
            .join("deployment.toml")
    }

    pub fn available_farms(&self) -> impl Iterator<Item = &FarmEntry> {
        self.farms.iter().filter(|f| f.available)
    }

    /// Reject parameters the engine would refuse, before anything runs.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for farm in &self.farms {
            let asset = &farm.staking_asset;
            if !seen.insert(asset) {
                bail!("farm {asset}: staking asset listed twice");
            }
            if farm.reward_duration == 0 {
                bail!("farm {asset}: reward_duration must be positive");
            }
            if farm.splits == 0 {
                bail!("farm {asset}: splits must be positive");
            }
            if farm.available && farm.reward_amount == 0 {
                bail!("farm {asset}: reward_amount must be positive");
            }
        }
        if let Some(pair) = self.steps.windows(2).find(|w| w[1].at < w[0].at) {
            bail!("steps out of order: {} after {}", pair[1].at, pair[0].at);
        }
        Ok(())
    }
}
