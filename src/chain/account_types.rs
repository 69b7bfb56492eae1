//! Polymorphic account decoding for auth module queries.
//!
//! The node returns accounts wrapped in `google.protobuf.Any`; the concrete
//! type decides where the `BaseAccount` (and so the account number and
//! sequence) lives.

use prost::Message;
use serde::Serialize;

use crate::chain::proto::{
    type_urls, Any, BaseAccount, BaseVestingAccount, ContinuousVestingAccount,
    DelayedVestingAccount, ModuleAccount, PeriodicVestingAccount, PermanentLockedAccount,
};
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum Account {
    Base(BaseAccount),
    Module(ModuleAccount),

    BaseVesting(BaseVestingAccount),
    ContinuousVesting(ContinuousVestingAccount),
    DelayedVesting(DelayedVestingAccount),
    PeriodicVesting(PeriodicVestingAccount),
    PermanentLocked(PermanentLockedAccount),

    Unsupported { type_url: String, raw_value: Vec<u8> },
}

/// Common account information extracted from any account type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
    #[serde(skip)]
    pub pub_key: Option<Any>,
}

impl Account {
    pub fn decode_any(any: &Any) -> Result<Self> {
        let value = any.value.as_slice();
        let account = match any.type_url.as_str() {
            type_urls::BASE_ACCOUNT => Account::Base(BaseAccount::decode(value)?),
            type_urls::MODULE_ACCOUNT => Account::Module(ModuleAccount::decode(value)?),
            type_urls::BASE_VESTING_ACCOUNT => {
                Account::BaseVesting(BaseVestingAccount::decode(value)?)
            }
            type_urls::CONTINUOUS_VESTING_ACCOUNT => {
                Account::ContinuousVesting(ContinuousVestingAccount::decode(value)?)
            }
            type_urls::DELAYED_VESTING_ACCOUNT => {
                Account::DelayedVesting(DelayedVestingAccount::decode(value)?)
            }
            type_urls::PERIODIC_VESTING_ACCOUNT => {
                Account::PeriodicVesting(PeriodicVestingAccount::decode(value)?)
            }
            type_urls::PERMANENT_LOCKED_ACCOUNT => {
                Account::PermanentLocked(PermanentLockedAccount::decode(value)?)
            }
            unsupported => {
                log::warn!("Encountered unsupported account type: {}", unsupported);
                Account::Unsupported {
                    type_url: unsupported.to_string(),
                    raw_value: any.value.clone(),
                }
            }
        };
        Ok(account)
    }

    fn base_account(&self) -> Option<&BaseAccount> {
        fn from_vesting(v: Option<&BaseVestingAccount>) -> Option<&BaseAccount> {
            v.and_then(|bva| bva.base_account.as_ref())
        }

        match self {
            Account::Base(acc) => Some(acc),
            Account::Module(acc) => acc.base_account.as_ref(),
            Account::BaseVesting(acc) => acc.base_account.as_ref(),
            Account::ContinuousVesting(acc) => from_vesting(acc.base_vesting_account.as_ref()),
            Account::DelayedVesting(acc) => from_vesting(acc.base_vesting_account.as_ref()),
            Account::PeriodicVesting(acc) => from_vesting(acc.base_vesting_account.as_ref()),
            Account::PermanentLocked(acc) => from_vesting(acc.base_vesting_account.as_ref()),
            Account::Unsupported { .. } => None,
        }
    }

    /// None when the account type carries no base account.
    pub fn get_account_info(&self) -> Option<AccountInfo> {
        self.base_account().map(|base| AccountInfo {
            address: base.address.clone(),
            account_number: base.account_number,
            sequence: base.sequence,
            pub_key: base.pub_key.clone(),
        })
    }

    pub fn account_type(&self) -> &'static str {
        match self {
            Account::Base(_) => "BaseAccount",
            Account::Module(_) => "ModuleAccount",
            Account::BaseVesting(_) => "BaseVestingAccount",
            Account::ContinuousVesting(_) => "ContinuousVestingAccount",
            Account::DelayedVesting(_) => "DelayedVestingAccount",
            Account::PeriodicVesting(_) => "PeriodicVestingAccount",
            Account::PermanentLocked(_) => "PermanentLockedAccount",
            Account::Unsupported { .. } => "UnsupportedAccount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(sequence: u64) -> BaseAccount {
        BaseAccount {
            address: "cosmos1test".to_string(),
            pub_key: None,
            account_number: 12345,
            sequence,
        }
    }

    #[test]
    fn test_base_account_info() {
        let any = Any {
            type_url: type_urls::BASE_ACCOUNT.to_string(),
            value: base(5).encode_to_vec(),
        };
        let account = Account::decode_any(&any).unwrap();
        let info = account.get_account_info().unwrap();
        assert_eq!(info.address, "cosmos1test");
        assert_eq!(info.sequence, 5);
        assert_eq!(info.account_number, 12345);
        assert_eq!(account.account_type(), "BaseAccount");
    }

    #[test]
    fn test_nested_vesting_account_info() {
        let vesting = ContinuousVestingAccount {
            base_vesting_account: Some(BaseVestingAccount {
                base_account: Some(base(9)),
                ..Default::default()
            }),
            ..Default::default()
        };
        let any = Any {
            type_url: type_urls::CONTINUOUS_VESTING_ACCOUNT.to_string(),
            value: vesting.encode_to_vec(),
        };
        let info = Account::decode_any(&any).unwrap().get_account_info().unwrap();
        assert_eq!(info.sequence, 9);
    }

    #[test]
    fn test_unsupported_account() {
        let any = Any {
            type_url: "/unknown.type".to_string(),
            value: vec![1, 2, 3],
        };
        let account = Account::decode_any(&any).unwrap();
        assert!(account.get_account_info().is_none());
        assert_eq!(account.account_type(), "UnsupportedAccount");
    }
}
