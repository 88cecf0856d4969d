//! Wallet extension boundary
//!
//! The browser wallet (Keplr-style) is reached through these traits. Only the calls the
//! grant flow needs are modelled: enabling a chain, obtaining the signer, listing its
//! accounts and signing in either mode.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cosmos::StdSignDoc;
use crate::errors::{GrantError, Result, WalletError};
use crate::proto;
use crate::types::{AccountData, SigningCapability};

#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Ask the user to approve access to `chain_id`.
    async fn enable(&self, chain_id: &str) -> std::result::Result<(), WalletError>;

    /// The signer best suited to the key type behind `chain_id`: direct-capable for
    /// software keys, Amino-only for hardware-backed ones.
    async fn get_offline_signer_auto(
        &self,
        chain_id: &str,
    ) -> std::result::Result<Option<Arc<dyn OfflineSigner>>, WalletError>;
}

#[async_trait]
pub trait OfflineSigner: Send + Sync {
    async fn get_accounts(&self) -> std::result::Result<Vec<AccountData>, WalletError>;

    async fn sign_amino(
        &self,
        signer_address: &str,
        sign_doc: StdSignDoc,
    ) -> std::result::Result<AminoSignResponse, WalletError>;

    /// Direct signing capability, if the signer has one.
    fn as_direct(&self) -> Option<&dyn DirectSigner> {
        None
    }
}

#[async_trait]
pub trait DirectSigner: Send + Sync {
    async fn sign_direct(
        &self,
        signer_address: &str,
        sign_doc: proto::SignDoc,
    ) -> std::result::Result<DirectSignResponse, WalletError>;
}

/// Amino signature. The wallet may adjust the document (fee, memo) before signing, so
/// `signed` is what the transaction must be built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AminoSignResponse {
    pub signed: StdSignDoc,
    pub signature: StdSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKeyJson,
    /// Base64 signature bytes.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyJson {
    #[serde(rename = "type")]
    pub type_: String,
    /// Base64 key bytes.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectSignResponse {
    pub signed: proto::SignDoc,
    pub signature: Vec<u8>,
}

/// Report what `signer` can sign.
pub fn detect(signer: Option<&dyn OfflineSigner>) -> Result<SigningCapability> {
    let signer = signer.ok_or(GrantError::NoSigner)?;
    Ok(SigningCapability::from_supports_direct(
        signer.as_direct().is_some(),
    ))
}
