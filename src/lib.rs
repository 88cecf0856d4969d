//! Authz grant signing for Cosmos SDK chains.
//!
//! Builds a `MsgGrant` letting a third party redelegate on the user's behalf and signs it
//! through a browser wallet in whichever mode the wallet supports: protobuf direct signing
//! with a validator-scoped `StakeAuthorization`, or legacy Amino JSON with a
//! `GenericAuthorization` for `MsgBeginRedelegate`.

pub mod client;
pub mod config;
pub mod cosmos;
pub mod errors;
pub mod logging;
pub mod proto;
pub mod rpc;
pub mod session;
pub mod types;
pub mod wallet;

// Re-export the main entry points
pub use client::SigningClient;
pub use config::SessionConfig;
pub use cosmos::{Fee, GasPrice};
pub use errors::{GrantError, Result, WalletError};
pub use rpc::{ChainClient, ChainConnector, RpcConnector};
pub use session::{SessionState, SigningSession};
pub use types::*;
pub use wallet::{detect, DirectSigner, OfflineSigner, WalletExtension};
