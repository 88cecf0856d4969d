use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum GrantError {
    #[error("Wallet extension is not installed")]
    SignerUnavailable,

    #[error("Chain {chain_id} is not enabled in the wallet: {reason}")]
    ChainNotEnabled { chain_id: String, reason: String },

    #[error("Wallet did not provide a signer")]
    NoSigner,

    #[error("Signer returned no accounts")]
    NoAccounts,

    #[error("Unsupported grant type: '{type_url}'")]
    UnsupportedAuthorization { type_url: String },

    #[error("No amino converter registered for message type '{type_url}'")]
    UnsupportedMessage { type_url: String },

    #[error("Malformed timestamp: {input}")]
    MalformedTimestamp { input: String },

    #[error("Account details are missing or incorrect: {field} is not set")]
    InvalidAccountState { field: &'static str },

    #[error("Operation not allowed in session state {0:?}")]
    InvalidState(SessionState),

    #[error("Invalid gas price: {0}")]
    InvalidGasPrice(String),

    #[error("Invalid fee: {0}")]
    InvalidFee(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Failed to send transaction: {message}")]
    BroadcastFailed { message: String },

    #[error("Transaction construction error: {0}")]
    Transaction(String),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GrantError {
    /// Codec failures point at a builder/codec mismatch rather than a user or network problem.
    pub fn is_codec_defect(&self) -> bool {
        matches!(
            self,
            GrantError::UnsupportedAuthorization { .. }
                | GrantError::UnsupportedMessage { .. }
                | GrantError::MalformedTimestamp { .. }
        )
    }
}

/// Failures reported across the wallet extension boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Request rejected by user")]
    Rejected,

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GrantError>;
