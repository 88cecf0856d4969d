//! Signing session: wallet connection, account state and the grant sign-and-broadcast flow

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::SigningClient;
use crate::config::SessionConfig;
use crate::cosmos::{authz, calculate_fee, strategy_for, AminoTypes, Fee, GasPrice, GrantStrategy};
use crate::errors::{GrantError, Result};
use crate::rpc::{ChainConnector, RpcConnector};
use crate::types::{Account, BroadcastResult, SignerData, SigningCapability, Timestamp};
use crate::wallet::{detect, WalletExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Signing,
    Broadcast,
    Failed,
}

struct Connection {
    client: SigningClient,
    chain_id: String,
    gas_price: GasPrice,
    strategy: &'static dyn GrantStrategy,
}

/// One wallet connection driving authz grants.
///
/// Both operations take `&mut self`, so a session never has two operations in flight.
pub struct SigningSession {
    wallet: Option<Arc<dyn WalletExtension>>,
    connector: Arc<dyn ChainConnector>,
    state: SessionState,
    connection: Option<Connection>,
}

impl SigningSession {
    /// `wallet` is `None` when no wallet extension is installed.
    pub fn new(
        wallet: Option<Arc<dyn WalletExtension>>,
        connector: Arc<dyn ChainConnector>,
    ) -> Self {
        Self {
            wallet,
            connector,
            state: SessionState::Disconnected,
            connection: None,
        }
    }

    /// Session talking to nodes over Tendermint RPC.
    pub fn with_rpc(wallet: Option<Arc<dyn WalletExtension>>) -> Self {
        Self::new(wallet, Arc::new(RpcConnector))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capability selected at connect time.
    pub fn capability(&self) -> Option<SigningCapability> {
        self.connection.as_ref().map(|c| c.strategy.capability())
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.chain_id.as_str())
    }

    /// Whether the authz Amino converters were installed for this connection.
    pub fn amino_authz_installed(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.client.amino_types().is_registered(crate::cosmos::type_urls::MSG_GRANT))
            .unwrap_or(false)
    }

    /// Enable the chain in the wallet, pick the signing strategy and fetch account state.
    ///
    /// Accounts the chain has never seen get account number and sequence `0`.
    #[tracing::instrument(skip(self))]
    pub async fn connect(
        &mut self,
        chain_id: &str,
        rpc_endpoint: &str,
        gas_price: &str,
    ) -> Result<Account> {
        self.state = SessionState::Connecting;
        self.connection = None;

        match self.establish(chain_id, rpc_endpoint, gas_price).await {
            Ok((connection, account)) => {
                tracing::info!(
                    address = %account.address,
                    account_number = ?account.account_number,
                    sequence = ?account.sequence,
                    direct = account.supports_direct_signing,
                    "connected"
                );
                self.connection = Some(connection);
                self.state = SessionState::Connected;
                Ok(account)
            }
            Err(e) => {
                tracing::warn!(error = %e, "connect failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    pub async fn connect_with_config(&mut self, config: &SessionConfig) -> Result<Account> {
        config.validate()?;
        self.connect(&config.chain_id, &config.rpc_endpoint, &config.gas_price)
            .await
    }

    async fn establish(
        &self,
        chain_id: &str,
        rpc_endpoint: &str,
        gas_price: &str,
    ) -> Result<(Connection, Account)> {
        let wallet = self.wallet.as_ref().ok_or(GrantError::SignerUnavailable)?;

        let not_enabled = |e: crate::errors::WalletError| GrantError::ChainNotEnabled {
            chain_id: chain_id.to_string(),
            reason: e.to_string(),
        };
        wallet.enable(chain_id).await.map_err(not_enabled)?;
        let signer = wallet
            .get_offline_signer_auto(chain_id)
            .await
            .map_err(not_enabled)?;

        let capability = detect(signer.as_deref())?;
        let signer = signer.ok_or(GrantError::NoSigner)?;

        let account_data = signer
            .get_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(GrantError::NoAccounts)?;

        let mut amino_types = AminoTypes::new();
        if capability == SigningCapability::AminoOnly {
            amino_types.register_authz();
        }

        let gas_price: GasPrice = gas_price.parse()?;
        let chain = self.connector.connect(rpc_endpoint).await?;
        let client = SigningClient::new(signer, chain, capability, amino_types);

        let (account_number, sequence) = client
            .get_account(&account_data.address)
            .await?
            .map(|info| (info.account_number, info.sequence))
            .unwrap_or((0, 0));

        let account = Account {
            address: account_data.address,
            account_number: Some(account_number),
            sequence: Some(sequence),
            supports_direct_signing: capability.supports_direct(),
            pub_key: account_data.pubkey,
        };
        let connection = Connection {
            client,
            chain_id: chain_id.to_string(),
            gas_price,
            strategy: strategy_for(capability),
        };
        Ok((connection, account))
    }

    /// Fee for `gas_limit` at the gas price given to `connect`.
    pub fn fee_for_gas(&self, gas_limit: u64) -> Result<Fee> {
        let connection = self
            .connection
            .as_ref()
            .ok_or(GrantError::InvalidState(self.state))?;
        calculate_fee(gas_limit, &connection.gas_price)
    }

    /// Grant `grantee` permission to redelegate on behalf of `account`, without expiry.
    pub async fn sign_and_broadcast(
        &mut self,
        account: &Account,
        grantee: &str,
        validator: &str,
        fee: &Fee,
        memo: &str,
    ) -> Result<BroadcastResult> {
        self.sign_and_broadcast_grant(account, grantee, validator, None, fee, memo)
            .await
    }

    /// As [`Self::sign_and_broadcast`], with an optional grant expiration.
    #[tracing::instrument(skip(self, account, fee), fields(granter = %account.address))]
    pub async fn sign_and_broadcast_grant(
        &mut self,
        account: &Account,
        grantee: &str,
        validator: &str,
        expiration: Option<Timestamp>,
        fee: &Fee,
        memo: &str,
    ) -> Result<BroadcastResult> {
        if self.state != SessionState::Connected {
            return Err(GrantError::InvalidState(self.state));
        }
        let account_number = account
            .account_number
            .ok_or(GrantError::InvalidAccountState { field: "account_number" })?;
        let sequence = account
            .sequence
            .ok_or(GrantError::InvalidAccountState { field: "sequence" })?;

        let connection = self
            .connection
            .take()
            .ok_or(GrantError::InvalidState(self.state))?;
        self.state = SessionState::Signing;

        let grant = authz::build(
            &account.address,
            grantee,
            validator,
            connection.strategy.capability(),
            expiration,
        );
        let signer_data = SignerData {
            address: account.address.clone(),
            pub_key: account.pub_key.clone(),
            chain_id: connection.chain_id.clone(),
            account_number,
            sequence,
        };

        let outcome = connection
            .client
            .sign_and_broadcast(&signer_data, vec![grant.to_any()], fee, memo)
            .await;
        self.connection = Some(connection);

        match outcome {
            Ok(result) => {
                tracing::info!(hash = %result.transaction_hash, code = result.code, "grant broadcast");
                self.state = SessionState::Broadcast;
                Ok(result)
            }
            Err(e) if e.is_codec_defect() => {
                tracing::error!(error = %e, "grant message rejected by the amino codec");
                self.state = SessionState::Failed;
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to send transaction");
                self.state = SessionState::Failed;
                Err(match e {
                    GrantError::BroadcastFailed { .. } => e,
                    other => GrantError::BroadcastFailed {
                        message: other.to_string(),
                    },
                })
            }
        }
    }
}
