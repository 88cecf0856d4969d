//! Chain RPC boundary
//!
//! [`ChainClient`] is what the signing flow needs from a node: account lookup and
//! transaction broadcast. [`RpcChainClient`] implements it over Tendermint RPC.

use std::sync::Arc;

use async_trait::async_trait;
use cosmrs::rpc::{Client, HttpClient};
use prost::Message;

use crate::cosmos::type_urls;
use crate::errors::{GrantError, Result};
use crate::proto;
use crate::types::{AccountInfo, BroadcastResult};

const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account number and sequence, or `None` if the chain has never seen the address.
    async fn get_account(&self, address: &str) -> Result<Option<AccountInfo>>;

    /// Submit signed transaction bytes and wait for CheckTx.
    async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> Result<BroadcastResult>;
}

#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainClient>>;
}

/// Connects to Tendermint RPC endpoints over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcConnector;

#[async_trait]
impl ChainConnector for RpcConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainClient>> {
        Ok(Arc::new(RpcChainClient::new(endpoint)?))
    }
}

pub struct RpcChainClient {
    client: HttpClient,
    endpoint: String,
}

impl RpcChainClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| GrantError::Rpc(format!("invalid endpoint {}: {}", endpoint, e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_account(&self, address: &str) -> Result<Option<AccountInfo>> {
        let request = proto::QueryAccountRequest {
            address: address.to_string(),
        };

        let response = self
            .client
            .abci_query(
                Some(ACCOUNT_QUERY_PATH.to_string()),
                request.encode_to_vec(),
                None,
                false,
            )
            .await
            .map_err(|e| GrantError::Rpc(e.to_string()))?;

        if response.code.is_err() {
            if response.log.contains("not found") {
                return Ok(None);
            }
            return Err(GrantError::Rpc(format!(
                "account query failed with code {}: {}",
                response.code.value(),
                response.log
            )));
        }

        let account = proto::QueryAccountResponse::decode(response.value.as_slice())?.account;
        account.as_ref().map(decode_account).transpose()
    }

    async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> Result<BroadcastResult> {
        let response = self
            .client
            .broadcast_tx_sync(tx_bytes)
            .await
            .map_err(|e| GrantError::Rpc(e.to_string()))?;

        Ok(BroadcastResult {
            transaction_hash: response.hash.to_string(),
            code: response.code.value(),
            raw_log: response.log,
        })
    }
}

/// Extract account number and sequence from an auth module account.
pub fn decode_account(any: &proto::Any) -> Result<AccountInfo> {
    let base = match any.type_url.as_str() {
        type_urls::BASE_ACCOUNT => Some(proto::BaseAccount::decode(any.value.as_slice())?),
        type_urls::CONTINUOUS_VESTING_ACCOUNT
        | type_urls::DELAYED_VESTING_ACCOUNT
        | type_urls::PERIODIC_VESTING_ACCOUNT => {
            proto::VestingAccount::decode(any.value.as_slice())?
                .base_vesting_account
                .and_then(|vesting| vesting.base_account)
        }
        other => {
            return Err(GrantError::Rpc(format!("unsupported account type: {}", other)));
        }
    }
    .unwrap_or_default();

    Ok(AccountInfo {
        account_number: base.account_number,
        sequence: base.sequence,
    })
}
