use serde::{Deserialize, Serialize};

// ========== Account Types ==========

/// Signer account as seen at connect time.
///
/// `account_number` and `sequence` are only authoritative at fetch time; after a successful
/// broadcast the sequence is stale and the account must be fetched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub account_number: Option<u64>,
    pub sequence: Option<u64>,
    pub supports_direct_signing: bool,
    /// Compressed secp256k1 public key reported by the wallet.
    #[serde(with = "hex_bytes")]
    pub pub_key: Vec<u8>,
}

/// Account entry as listed by a wallet signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub address: String,
    pub algo: String,
    #[serde(with = "hex_bytes")]
    pub pubkey: Vec<u8>,
}

/// On-chain account numbers as returned by the auth module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Everything the signing client needs to know about the signer for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub address: String,
    pub pub_key: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

// ========== Signing Mode ==========

/// What the connected signer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningCapability {
    /// Protobuf `SIGN_MODE_DIRECT` and Amino JSON.
    Direct,
    /// Amino JSON only.
    AminoOnly,
}

impl SigningCapability {
    pub fn from_supports_direct(supports_direct: bool) -> Self {
        if supports_direct {
            SigningCapability::Direct
        } else {
            SigningCapability::AminoOnly
        }
    }

    pub fn supports_direct(&self) -> bool {
        matches!(self, SigningCapability::Direct)
    }
}

// ========== Grant Types ==========

/// Protobuf-style timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StakeAuthorizationType {
    Delegate,
    Undelegate,
    Redelegate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAuthorization {
    pub allowed_validators: Vec<String>,
    pub authorization_type: StakeAuthorizationType,
    /// `None` means no upper bound on the amount.
    pub max_tokens: Option<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAuthorization {
    /// Type URL of the single message the grantee may execute.
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    Stake(StakeAuthorization),
    Generic(GenericAuthorization),
}

/// "grantee may act as granter, limited by `authorization`, until `expiration`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    pub granter: String,
    pub grantee: String,
    pub authorization: Authorization,
    pub expiration: Option<Timestamp>,
}

// ========== Broadcast Types ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub transaction_hash: String,
    pub code: u32,
    pub raw_log: String,
}

impl BroadcastResult {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
