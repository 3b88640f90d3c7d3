//! Trait interfaces for the collaborators a farm depends on.
//!
//! - [`Clock`]: the sole authority on current time
//! - [`AssetCustody`]: atomic movement of staked and reward balances

use crate::error::CustodyError;
use crate::types::{AccountId, Amount, AssetClass, Timestamp, Transfer};

/// Monotonically non-decreasing time source.
///
/// Engine operations take `now` as an argument; callers read it from a
/// `Clock` once per operation.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> Timestamp;
}

/// Custody of fungible balances.
///
/// Implementations must apply a batch atomically: either every transfer in
/// the slice takes effect or none does.
pub trait AssetCustody {
    /// Balance of `account` in `asset`. Unknown accounts hold zero.
    fn balance_of(&self, asset: &AssetClass, account: &AccountId) -> Amount;

    /// Apply a single transfer.
    ///
    /// Default implementation delegates to [`transfer_batch`](Self::transfer_batch).
    fn transfer(&mut self, transfer: &Transfer) -> Result<(), CustodyError> {
        self.transfer_batch(std::slice::from_ref(transfer))
    }

    /// Apply all transfers in order, or none of them.
    ///
    /// # Errors
    ///
    /// - [`CustodyError::InsufficientFunds`] if any sender would go negative
    /// - [`CustodyError::Overflow`] if any receiver would exceed `u64::MAX`
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError>;
}
