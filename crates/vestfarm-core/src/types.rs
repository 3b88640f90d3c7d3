//! Identity and unit types shared by every farm component.
//!
//! Amounts are `u64` base units, times are `u64` seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quantity of an asset in base units.
pub type Amount = u64;

/// Seconds since the Unix epoch (or any monotone origin).
pub type Timestamp = u64;

/// Symbol of a fungible asset class, e.g. a staked LP token or the reward token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssetClass(String);

impl AssetClass {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetClass {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

/// Holder of custody balances.
///
/// Textual form: `factory`, `burn`, `farm:<asset>`; any other string names a
/// user account. User names that would read as one of those forms, or that
/// are empty or start with `user:`, are written as `user:<name>`.
///
/// # Examples
///
/// ```
/// use vestfarm_core::types::{AccountId, AssetClass};
/// assert_eq!("burn".parse::<AccountId>().unwrap(), AccountId::Burn);
/// assert_eq!(
///     "farm:LP-A".parse::<AccountId>().unwrap(),
///     AccountId::Farm(AssetClass::new("LP-A"))
/// );
/// assert_eq!(AccountId::user("alice").to_string(), "alice");
/// assert_eq!(AccountId::user("burn").to_string(), "user:burn");
/// assert_eq!("user:burn".parse::<AccountId>().unwrap(), AccountId::user("burn"));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum AccountId {
    /// An external participant (staker or operator).
    User(String),
    /// The account a farm keeps its staked and reward balances in.
    Farm(AssetClass),
    /// The factory's undistributed funding pool.
    Factory,
    /// Sink for forfeited rewards.
    Burn,
}

impl AccountId {
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

const USER_PREFIX: &str = "user:";
const FARM_PREFIX: &str = "farm:";

/// A bare user name would parse back as something else.
fn needs_user_prefix(name: &str) -> bool {
    matches!(name, "" | "factory" | "burn") || name.starts_with(FARM_PREFIX) || name.starts_with(USER_PREFIX)
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(name) if needs_user_prefix(name) => write!(f, "{USER_PREFIX}{name}"),
            Self::User(name) => f.write_str(name),
            Self::Farm(asset) => write!(f, "{FARM_PREFIX}{asset}"),
            Self::Factory => f.write_str("factory"),
            Self::Burn => f.write_str("burn"),
        }
    }
}

/// Error returned when an account string is empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("empty account identifier")]
pub struct EmptyAccountId;

impl FromStr for AccountId {
    type Err = EmptyAccountId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(EmptyAccountId),
            "factory" => Ok(Self::Factory),
            "burn" => Ok(Self::Burn),
            _ => {
                if let Some(name) = s.strip_prefix(USER_PREFIX) {
                    return Ok(Self::User(name.to_string()));
                }
                match s.strip_prefix(FARM_PREFIX) {
                    Some("") => Err(EmptyAccountId),
                    Some(asset) => Ok(Self::Farm(AssetClass::new(asset))),
                    None => Ok(Self::User(s.to_string())),
                }
            }
        }
    }
}

impl TryFrom<String> for AccountId {
    type Error = EmptyAccountId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

/// One movement of an asset between two custody accounts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub asset: AssetClass,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

impl Transfer {
    pub fn new(asset: &AssetClass, from: &AccountId, to: &AccountId, amount: Amount) -> Self {
        Self {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_account() -> impl Strategy<Value = AccountId> {
        prop_oneof![
            ".*".prop_map(AccountId::user),
            prop_oneof![Just("factory"), Just("burn"), Just("farm:LP"), Just("user:x"), Just("")]
                .prop_map(AccountId::user),
            ".+".prop_map(|s| AccountId::Farm(AssetClass::new(s))),
            Just(AccountId::Factory),
            Just(AccountId::Burn),
        ]
    }

    proptest! {
        #[test]
        fn account_text_form_roundtrips(id in any_account()) {
            prop_assert_eq!(id.to_string().parse::<AccountId>().unwrap(), id.clone());
            let json = serde_json::to_string(&id).unwrap();
            prop_assert_eq!(serde_json::from_str::<AccountId>(&json).unwrap(), id);
        }
    }

    #[test]
    fn reserved_user_names_stay_users() {
        for name in ["factory", "burn", "farm:LP-A", "user:bob", ""] {
            let id = AccountId::user(name);
            let text = id.to_string();
            assert_eq!(text, format!("user:{name}"));
            assert_eq!(text.parse::<AccountId>().unwrap(), id);
        }
        let json = serde_json::to_string(&AccountId::user("burn")).unwrap();
        assert_eq!(json, "\"user:burn\"");
        assert_ne!(serde_json::from_str::<AccountId>(&json).unwrap(), AccountId::Burn);
    }

    #[test]
    fn account_display_roundtrips_through_parse() {
        for id in [
            AccountId::user("alice"),
            AccountId::Farm(AssetClass::new("LP-A")),
            AccountId::Factory,
            AccountId::Burn,
        ] {
            assert_eq!(id.to_string().parse::<AccountId>().unwrap(), id);
        }
    }

    #[test]
    fn empty_account_rejected() {
        assert_eq!("".parse::<AccountId>(), Err(EmptyAccountId));
        assert_eq!("farm:".parse::<AccountId>(), Err(EmptyAccountId));
    }

    #[test]
    fn account_serializes_as_string() {
        let json = serde_json::to_string(&AccountId::Farm(AssetClass::new("LP"))).unwrap();
        assert_eq!(json, "\"farm:LP\"");
        let back: AccountId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(back, AccountId::user("bob"));
    }

    #[test]
    fn asset_is_transparent_in_json() {
        let json = serde_json::to_string(&AssetClass::new("REWARD")).unwrap();
        assert_eq!(json, "\"REWARD\"");
    }

    #[test]
    fn only_users_are_users() {
        assert!(AccountId::user("x").is_user());
        assert!(!AccountId::Factory.is_user());
        assert!(!AccountId::Burn.is_user());
    }
}
