//! Observable farm and factory events.

use serde::Serialize;

use crate::types::{AccountId, Amount, AssetClass, Timestamp};

/// One externally visible state change. `farm` is the staked asset the
/// farm is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FarmEvent {
    Staked {
        farm: AssetClass,
        staker: AccountId,
        amount: Amount,
    },
    Withdrawn {
        farm: AssetClass,
        staker: AccountId,
        amount: Amount,
    },
    RewardPaid {
        farm: AssetClass,
        staker: AccountId,
        amount: Amount,
        claimed_splits: u32,
    },
    /// Reward burned by the opt-out penalty.
    RewardForfeited {
        farm: AssetClass,
        staker: AccountId,
        amount: Amount,
    },
    VestingConfigured {
        farm: AssetClass,
        staker: AccountId,
        opt_in: bool,
    },
    RewardAdded {
        farm: AssetClass,
        budget: Amount,
        rate: Amount,
        period_start: Timestamp,
        period_end: Timestamp,
    },
    FarmRegistered {
        farm: AssetClass,
        reward_amount: Amount,
        reward_duration: u64,
        vesting_period: u64,
        splits: u32,
    },
    FarmFunded {
        farm: AssetClass,
        amount: Amount,
    },
}

impl FarmEvent {
    /// Staked asset of the farm the event belongs to.
    pub fn farm(&self) -> &AssetClass {
        match self {
            Self::Staked { farm, .. }
            | Self::Withdrawn { farm, .. }
            | Self::RewardPaid { farm, .. }
            | Self::RewardForfeited { farm, .. }
            | Self::VestingConfigured { farm, .. }
            | Self::RewardAdded { farm, .. }
            | Self::FarmRegistered { farm, .. }
            | Self::FarmFunded { farm, .. } => farm,
        }
    }
}
