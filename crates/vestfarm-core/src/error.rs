//! Error types for Vestfarm.
use thiserror::Error;

use crate::types::{AccountId, Amount, AssetClass, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient funds in {account} for {asset}: have {have}, need {need}")] InsufficientFunds { account: AccountId, asset: AssetClass, have: Amount, need: Amount },
    #[error("balance overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    #[error("invalid amount: {0}")] InvalidAmount(&'static str),
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("unauthorized caller: {0}")] Unauthorized(AccountId),
    #[error("farm already registered for {0}")] AlreadyRegistered(AssetClass),
    #[error("too early: now {now} before genesis {genesis}")] TooEarly { now: Timestamp, genesis: Timestamp },
    #[error("no farms registered")] NoFarmsRegistered,
    #[error("insufficient funding: have {have}, need {need}")] InsufficientFunding { have: Amount, need: Amount },
    #[error("vesting election locked after first claim")] VestingLocked,
    #[error("reward rate too low: budget {budget} over {duration}s")] RateTooLow { budget: Amount, duration: u64 },
    #[error("unknown farm: {0}")] UnknownFarm(AssetClass),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

impl From<CustodyError> for FarmError {
    fn from(err: CustodyError) -> Self {
        match err {
            CustodyError::InsufficientFunds { have, need, .. } => Self::InsufficientBalance { have, need },
            CustodyError::Overflow => Self::ArithmeticOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custody_shortfall_maps_to_insufficient_balance() {
        let err = CustodyError::InsufficientFunds {
            account: AccountId::user("alice"),
            asset: AssetClass::new("LP"),
            have: 3,
            need: 5,
        };
        assert_eq!(FarmError::from(err), FarmError::InsufficientBalance { have: 3, need: 5 });
    }

    #[test]
    fn messages_name_the_offender() {
        let msg = FarmError::AlreadyRegistered(AssetClass::new("LP-A")).to_string();
        assert!(msg.contains("LP-A"));
        let msg = FarmError::Unauthorized(AccountId::user("mallory")).to_string();
        assert!(msg.contains("mallory"));
    }
}
