//! Fees, sign documents and raw transaction assembly

use std::str::FromStr;

use cosmrs::crypto::PublicKey;
use cosmrs::tx::{self, ModeInfo, SignMode, SignerInfo, SignerPublicKey};
use once_cell::sync::Lazy;
use prost::Message;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::amino::AminoMsg;
use crate::errors::{GrantError, Result};
use crate::proto;
use crate::types::{Coin, SignerData};

static GAS_PRICE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9.]+)([a-zA-Z][a-zA-Z0-9/:._-]{2,127})$").expect("valid gas price pattern")
});

/// Maximum fractional digits accepted in a gas price.
const MAX_GAS_PRICE_DECIMALS: usize = 18;

/// Transaction fee. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    denom: String,
    amount: String,
    gas_limit: u64,
}

impl Fee {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>, gas_limit: u64) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
            gas_limit,
        }
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Integer amount in base units, as text.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn to_std_fee(&self) -> StdFee {
        StdFee {
            amount: vec![Coin {
                denom: self.denom.clone(),
                amount: self.amount.clone(),
            }],
            gas: self.gas_limit.to_string(),
        }
    }

    pub fn to_cosmrs(&self) -> Result<tx::Fee> {
        self.to_std_fee().to_cosmrs()
    }
}

/// Gas price such as `0.025uatom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPrice {
    amount: String,
    denom: String,
}

impl GasPrice {
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// `(mantissa, decimals)` such that the price is `mantissa / 10^decimals`.
    fn as_fraction(&self) -> Option<(u128, u32)> {
        let (whole, fraction) = self.amount.split_once('.').unwrap_or((&self.amount, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if fraction.len() > MAX_GAS_PRICE_DECIMALS || fraction.contains('.') {
            return None;
        }
        let digits = format!("{}{}", whole, fraction);
        let mantissa = digits.parse::<u128>().ok()?;
        Some((mantissa, fraction.len() as u32))
    }
}

impl FromStr for GasPrice {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self> {
        let captures = GAS_PRICE_PATTERN
            .captures(s)
            .ok_or_else(|| GrantError::InvalidGasPrice(format!("invalid format: '{}'", s)))?;

        let price = GasPrice {
            amount: captures[1].to_string(),
            denom: captures[2].to_string(),
        };
        if price.as_fraction().is_none() {
            return Err(GrantError::InvalidGasPrice(format!(
                "invalid amount: '{}'",
                price.amount
            )));
        }
        Ok(price)
    }
}

impl std::fmt::Display for GasPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Fee for `gas_limit` at `gas_price`, rounded up to a whole base unit.
pub fn calculate_fee(gas_limit: u64, gas_price: &GasPrice) -> Result<Fee> {
    let (mantissa, decimals) = gas_price
        .as_fraction()
        .ok_or_else(|| GrantError::InvalidGasPrice(gas_price.to_string()))?;

    let scale = 10u128.pow(decimals);
    let scaled = mantissa
        .checked_mul(u128::from(gas_limit))
        .ok_or_else(|| GrantError::InvalidGasPrice(format!("fee overflow at {}", gas_price)))?;
    let amount = (scaled + scale - 1) / scale;

    Ok(Fee::new(gas_price.denom.clone(), amount.to_string(), gas_limit))
}

/// Amino JSON fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl StdFee {
    pub fn to_cosmrs(&self) -> Result<tx::Fee> {
        let amount = self
            .amount
            .iter()
            .map(|coin| -> Result<cosmrs::Coin> {
                Ok(cosmrs::Coin {
                    denom: coin
                        .denom
                        .parse()
                        .map_err(|e| GrantError::InvalidFee(format!("denom '{}': {}", coin.denom, e)))?,
                    amount: coin
                        .amount
                        .parse()
                        .map_err(|_| GrantError::InvalidFee(format!("amount '{}'", coin.amount)))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let gas_limit = self
            .gas
            .parse::<u64>()
            .map_err(|_| GrantError::InvalidFee(format!("gas '{}'", self.gas)))?;

        Ok(tx::Fee {
            amount,
            gas_limit,
            payer: None,
            granter: None,
        })
    }
}

/// Amino JSON sign document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<AminoMsg>,
    pub sequence: String,
}

impl StdSignDoc {
    pub fn new(signer: &SignerData, fee: StdFee, memo: &str, msgs: Vec<AminoMsg>) -> Self {
        Self {
            account_number: signer.account_number.to_string(),
            chain_id: signer.chain_id.clone(),
            fee,
            memo: memo.to_string(),
            msgs,
            sequence: signer.sequence.to_string(),
        }
    }

    /// Canonical bytes the signer signs: keys sorted at every level, `&<>` escaped.
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        // Value maps are ordered, so re-serializing through Value sorts the keys.
        let sorted = serde_json::to_string(&serde_json::to_value(self)?)?;
        Ok(sorted
            .replace('&', "\\u0026")
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .into_bytes())
    }
}

/// Uppercase hex SHA-256 of the raw transaction, as reported by the chain.
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

pub(crate) fn to_cosmrs_any(any: proto::Any) -> cosmrs::Any {
    cosmrs::Any {
        type_url: any.type_url,
        value: any.value,
    }
}

pub(crate) fn public_key(signer: &SignerData) -> Result<PublicKey> {
    cosmrs::tendermint::PublicKey::from_raw_secp256k1(&signer.pub_key)
        .map(PublicKey::from)
        .ok_or_else(|| {
            GrantError::Transaction(format!(
                "invalid secp256k1 public key for {}: {}",
                signer.address,
                hex::encode(&signer.pub_key)
            ))
        })
}

fn body_bytes(messages: Vec<proto::Any>, memo: &str) -> Result<Vec<u8>> {
    tx::Body::new(messages.into_iter().map(to_cosmrs_any), memo, 0u32)
        .into_bytes()
        .map_err(|e| GrantError::Transaction(e.to_string()))
}

fn auth_info_bytes(signer: &SignerData, mode: SignMode, fee: tx::Fee) -> Result<Vec<u8>> {
    let signer_info = SignerInfo {
        public_key: Some(SignerPublicKey::from(public_key(signer)?)),
        mode_info: ModeInfo::single(mode),
        sequence: signer.sequence,
    };
    signer_info
        .auth_info(fee)
        .into_bytes()
        .map_err(|e| GrantError::Transaction(e.to_string()))
}

/// `SIGN_MODE_DIRECT` sign document for `messages`.
pub fn direct_sign_doc(
    signer: &SignerData,
    messages: Vec<proto::Any>,
    fee: &Fee,
    memo: &str,
) -> Result<proto::SignDoc> {
    Ok(proto::SignDoc {
        body_bytes: body_bytes(messages, memo)?,
        auth_info_bytes: auth_info_bytes(signer, SignMode::Direct, fee.to_cosmrs()?)?,
        chain_id: signer.chain_id.clone(),
        account_number: signer.account_number,
    })
}

/// Raw transaction bytes for a `SIGN_MODE_LEGACY_AMINO_JSON` signature over `signed`.
pub fn amino_tx_bytes(
    signer: &SignerData,
    messages: Vec<proto::Any>,
    signed: &StdSignDoc,
    signature: Vec<u8>,
) -> Result<Vec<u8>> {
    let body_bytes = body_bytes(messages, &signed.memo)?;
    let auth_info_bytes =
        auth_info_bytes(signer, SignMode::LegacyAminoJson, signed.fee.to_cosmrs()?)?;
    Ok(tx_raw_bytes(body_bytes, auth_info_bytes, signature))
}

pub fn tx_raw_bytes(body_bytes: Vec<u8>, auth_info_bytes: Vec<u8>, signature: Vec<u8>) -> Vec<u8> {
    proto::TxRaw {
        body_bytes,
        auth_info_bytes,
        signatures: vec![signature],
    }
    .encode_to_vec()
}
