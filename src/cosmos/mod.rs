//! Cosmos SDK support for authz grants
//!
//! Provides:
//! - Timestamp conversion between protobuf and Amino JSON
//! - Amino converters for authz messages
//! - Grant message construction per signing capability
//! - Fee and transaction assembly

pub mod amino;
pub mod authz;
pub mod timestamp;
pub mod transaction;

pub use amino::{AminoConverter, AminoMsg, AminoTypes};
pub use authz::{build, strategy_for, AminoGrantStrategy, DirectGrantStrategy, GrantStrategy};
pub use timestamp::{from_iso, to_iso};
pub use transaction::{calculate_fee, tx_hash, Fee, GasPrice, StdFee, StdSignDoc};

/// Type URLs of the protobuf messages handled here.
pub mod type_urls {
    pub const MSG_GRANT: &str = "/cosmos.authz.v1beta1.MsgGrant";
    pub const GENERIC_AUTHORIZATION: &str = "/cosmos.authz.v1beta1.GenericAuthorization";
    pub const STAKE_AUTHORIZATION: &str = "/cosmos.staking.v1beta1.StakeAuthorization";
    pub const MSG_BEGIN_REDELEGATE: &str = "/cosmos.staking.v1beta1.MsgBeginRedelegate";
    pub const BASE_ACCOUNT: &str = "/cosmos.auth.v1beta1.BaseAccount";
    pub const CONTINUOUS_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.ContinuousVestingAccount";
    pub const DELAYED_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.DelayedVestingAccount";
    pub const PERIODIC_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.PeriodicVestingAccount";
}

/// Amino type names matching the entries in [`type_urls`].
pub mod amino_types {
    pub const MSG_GRANT: &str = "cosmos-sdk/MsgGrant";
    pub const GENERIC_AUTHORIZATION: &str = "cosmos-sdk/GenericAuthorization";
}
