//! Protobuf wire types for the messages this crate encodes or inspects.
//!
//! Only the fields we read or write are declared; prost skips unknown fields on decode,
//! so the wider account and transaction messages decode through these narrower views.

pub use prost_types::{Any, Timestamp};

// ========== cosmos.authz.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgGrant {
    #[prost(string, tag = "1")]
    pub granter: String,
    #[prost(string, tag = "2")]
    pub grantee: String,
    #[prost(message, optional, tag = "3")]
    pub grant: Option<Grant>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Grant {
    #[prost(message, optional, tag = "1")]
    pub authorization: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub expiration: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenericAuthorization {
    #[prost(string, tag = "1")]
    pub msg: String,
}

// ========== cosmos.staking.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StakeAuthorization {
    #[prost(message, optional, tag = "1")]
    pub max_tokens: Option<Coin>,
    #[prost(oneof = "stake_authorization::Policy", tags = "2, 3")]
    pub validators: Option<stake_authorization::Policy>,
    #[prost(enumeration = "AuthorizationType", tag = "4")]
    pub authorization_type: i32,
}

pub mod stake_authorization {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Validators {
        #[prost(string, repeated, tag = "1")]
        pub address: Vec<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Policy {
        #[prost(message, tag = "2")]
        AllowList(Validators),
        #[prost(message, tag = "3")]
        DenyList(Validators),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AuthorizationType {
    Unspecified = 0,
    Delegate = 1,
    Undelegate = 2,
    Redelegate = 3,
}

// ========== cosmos.base.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

// ========== cosmos.auth.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BaseAccount {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pub_key: Option<Any>,
    #[prost(uint64, tag = "3")]
    pub account_number: u64,
    #[prost(uint64, tag = "4")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryAccountRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Any>,
}

// ========== cosmos.vesting.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BaseVestingAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
}

/// Continuous, delayed and periodic vesting accounts all embed the base vesting account at tag 1.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VestingAccount {
    #[prost(message, optional, tag = "1")]
    pub base_vesting_account: Option<BaseVestingAccount>,
}

// ========== cosmos.tx.v1beta1 ==========

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignDoc {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModeInfo {
    #[prost(message, optional, tag = "1")]
    pub single: Option<ModeInfoSingle>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModeInfoSingle {
    #[prost(int32, tag = "1")]
    pub mode: i32,
}
