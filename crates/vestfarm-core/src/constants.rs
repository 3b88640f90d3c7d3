//! Engine constants. All amounts in base units (1 token = 10^8 units).

/// Base units per whole token.
pub const COIN: u64 = 100_000_000;

/// Fixed-point scale of the reward-per-token accumulator.
///
/// The accumulator is a `u128` holding `reward * REWARD_PRECISION / staked`,
/// so a staker's share is recovered as `balance * delta / REWARD_PRECISION`.
///
/// # Examples
///
/// ```
/// use vestfarm_core::constants::{COIN, REWARD_PRECISION};
/// // One token of reward over one token of stake is exactly one unit per unit.
/// let per_token = (COIN as u128) * REWARD_PRECISION / COIN as u128;
/// assert_eq!(per_token, REWARD_PRECISION);
/// ```
pub const REWARD_PRECISION: u128 = 1_000_000_000_000_000_000;

pub const BPS_PRECISION: u64 = 10_000;

/// Share of the entitlement burned when an opted-out staker defers the first
/// claim until the vesting period is over.
pub const OPT_OUT_PENALTY_BPS: u64 = 5_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default length of a reward period (30 days).
pub const DEFAULT_REWARD_DURATION: u64 = 30 * SECONDS_PER_DAY;

/// Default vesting period following the reward period (90 days).
pub const DEFAULT_VESTING_PERIOD: u64 = 90 * SECONDS_PER_DAY;

/// Default number of vesting splits.
pub const DEFAULT_SPLITS: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_is_half() {
        assert_eq!(OPT_OUT_PENALTY_BPS * 2, BPS_PRECISION);
    }

    #[test]
    fn precision_divisible_by_coin() {
        // Whole-token stakes never lose precision in the accumulator.
        assert_eq!(REWARD_PRECISION % COIN as u128, 0);
    }

    #[test]
    fn default_vesting_splits_evenly() {
        assert_eq!(DEFAULT_VESTING_PERIOD % DEFAULT_SPLITS as u64, 0);
    }
}
