//! # vestfarm-engine: Reward accrual and split vesting.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Reward ledger**: a global reward-per-token accumulator apportions a
//!   linear reward stream among stakers in O(1) per call.
//! - **Vesting scheduler**: accrued reward unlocks in `splits` equal steps
//!   after the reward period ends; opting out of the schedule and deferring
//!   the first claim past the vesting period burns half.
//! - **Farm**: one ledger plus one schedule bound to a staked asset.
//! - **Factory**: registers farms and funds them all at once after genesis.

pub mod factory;
pub mod farm;
pub mod ledger;
pub mod position;
pub mod vesting;

pub use factory::{FarmFactory, FarmInfo, FarmParams, Funding};
pub use farm::{Claim, Exit, Farm, FarmConfig};
pub use ledger::{RewardAdded, RewardLedger, RewardPeriod};
pub use position::{StakerPosition, VestingElection};
pub use vesting::{Release, VestingProgress, VestingSchedule};
