//! Signing client: turns messages into a signed transaction and broadcasts it

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::cosmos::transaction::{amino_tx_bytes, direct_sign_doc, public_key, tx_raw_bytes};
use crate::cosmos::{tx_hash, AminoTypes, Fee, StdSignDoc};
use crate::errors::{GrantError, Result};
use crate::proto;
use crate::rpc::ChainClient;
use crate::types::{AccountInfo, BroadcastResult, SignerData, SigningCapability};
use crate::wallet::OfflineSigner;

pub struct SigningClient {
    signer: Arc<dyn OfflineSigner>,
    chain: Arc<dyn ChainClient>,
    capability: SigningCapability,
    amino_types: AminoTypes,
}

impl SigningClient {
    pub fn new(
        signer: Arc<dyn OfflineSigner>,
        chain: Arc<dyn ChainClient>,
        capability: SigningCapability,
        amino_types: AminoTypes,
    ) -> Self {
        Self {
            signer,
            chain,
            capability,
            amino_types,
        }
    }

    pub fn capability(&self) -> SigningCapability {
        self.capability
    }

    pub fn amino_types(&self) -> &AminoTypes {
        &self.amino_types
    }

    pub async fn get_account(&self, address: &str) -> Result<Option<AccountInfo>> {
        self.chain.get_account(address).await
    }

    /// Sign `messages` in the client's signing mode and return the raw transaction bytes.
    pub async fn sign(
        &self,
        signer_data: &SignerData,
        messages: Vec<proto::Any>,
        fee: &Fee,
        memo: &str,
    ) -> Result<Vec<u8>> {
        match self.capability {
            SigningCapability::Direct => self.sign_direct(signer_data, messages, fee, memo).await,
            SigningCapability::AminoOnly => self.sign_amino(signer_data, messages, fee, memo).await,
        }
    }

    async fn sign_direct(
        &self,
        signer_data: &SignerData,
        messages: Vec<proto::Any>,
        fee: &Fee,
        memo: &str,
    ) -> Result<Vec<u8>> {
        let direct = self.signer.as_direct().ok_or(GrantError::NoSigner)?;
        let sign_doc = direct_sign_doc(signer_data, messages, fee, memo)?;

        tracing::debug!(address = %signer_data.address, "requesting direct signature");
        let response = direct.sign_direct(&signer_data.address, sign_doc).await?;

        Ok(tx_raw_bytes(
            response.signed.body_bytes,
            response.signed.auth_info_bytes,
            response.signature,
        ))
    }

    async fn sign_amino(
        &self,
        signer_data: &SignerData,
        messages: Vec<proto::Any>,
        fee: &Fee,
        memo: &str,
    ) -> Result<Vec<u8>> {
        let msgs = messages
            .iter()
            .map(|message| self.amino_types.to_amino(message))
            .collect::<Result<Vec<_>>>()?;
        // Reject an unusable fee or key before the wallet prompts the user.
        fee.to_cosmrs()?;
        public_key(signer_data)?;
        let sign_doc = StdSignDoc::new(signer_data, fee.to_std_fee(), memo, msgs);

        tracing::debug!(address = %signer_data.address, "requesting amino signature");
        let response = self.signer.sign_amino(&signer_data.address, sign_doc).await?;

        // Rebuild the protobuf messages from what was actually signed.
        let signed_messages = response
            .signed
            .msgs
            .iter()
            .map(|msg| self.amino_types.from_amino(msg))
            .collect::<Result<Vec<_>>>()?;
        let signature = BASE64
            .decode(&response.signature.signature)
            .map_err(|e| GrantError::Transaction(format!("invalid amino signature: {}", e)))?;

        amino_tx_bytes(signer_data, signed_messages, &response.signed, signature)
    }

    /// Sign and broadcast in one step. A CheckTx rejection is returned as `BroadcastFailed`.
    pub async fn sign_and_broadcast(
        &self,
        signer_data: &SignerData,
        messages: Vec<proto::Any>,
        fee: &Fee,
        memo: &str,
    ) -> Result<BroadcastResult> {
        let tx_bytes = self.sign(signer_data, messages, fee, memo).await?;

        tracing::info!(hash = %tx_hash(&tx_bytes), size = tx_bytes.len(), "broadcasting transaction");
        let result = self.chain.broadcast_tx_sync(tx_bytes).await?;

        if !result.is_ok() {
            return Err(GrantError::BroadcastFailed {
                message: format!(
                    "Broadcasting transaction failed with code {}. Log: {}",
                    result.code, result.raw_log
                ),
            });
        }
        Ok(result)
    }
}
