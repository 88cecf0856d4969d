use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use authz_signer::cosmos::{type_urls, StdSignDoc};
use authz_signer::proto;
use authz_signer::wallet::{AminoSignResponse, DirectSignResponse, PubKeyJson, StdSignature};
use authz_signer::{
    Account, AccountData, AccountInfo, Authorization, AuthorizationGrant, BroadcastResult,
    ChainClient, ChainConnector, DirectSigner, Fee, GrantError, OfflineSigner, SessionConfig,
    SessionState, SigningSession, Timestamp, WalletError, WalletExtension,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cosmrs::tx::SignMode;
use prost::Message;

const GRANTER: &str = "cosmos1abc";
const GRANTEE: &str = "cosmos1grantee";
const VALIDATOR: &str = "cosmosvaloper1xyz";
const CHAIN_ID: &str = "cosmoshub-4";
const RPC: &str = "https://rpc.example.com";
// Compressed secp256k1 generator point.
const PUB_KEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

// ========== Mock wallet ==========

struct MockSigner {
    direct: bool,
    memo_override: Option<String>,
    reject_signing: bool,
    amino_docs: Mutex<Vec<StdSignDoc>>,
    direct_docs: Mutex<Vec<proto::SignDoc>>,
}

impl MockSigner {
    fn new(direct: bool) -> Self {
        Self {
            direct,
            memo_override: None,
            reject_signing: false,
            amino_docs: Mutex::new(Vec::new()),
            direct_docs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OfflineSigner for MockSigner {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, WalletError> {
        Ok(vec![AccountData {
            address: GRANTER.to_string(),
            algo: "secp256k1".to_string(),
            pubkey: hex::decode(PUB_KEY).unwrap(),
        }])
    }

    async fn sign_amino(
        &self,
        _signer_address: &str,
        sign_doc: StdSignDoc,
    ) -> Result<AminoSignResponse, WalletError> {
        if self.reject_signing {
            return Err(WalletError::Rejected);
        }
        self.amino_docs.lock().unwrap().push(sign_doc.clone());

        let mut signed = sign_doc;
        if let Some(memo) = &self.memo_override {
            signed.memo = memo.clone();
        }
        Ok(AminoSignResponse {
            signed,
            signature: StdSignature {
                pub_key: PubKeyJson {
                    type_: "tendermint/PubKeySecp256k1".to_string(),
                    value: BASE64.encode(hex::decode(PUB_KEY).unwrap()),
                },
                signature: BASE64.encode([7u8; 64]),
            },
        })
    }

    fn as_direct(&self) -> Option<&dyn DirectSigner> {
        if self.direct {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl DirectSigner for MockSigner {
    async fn sign_direct(
        &self,
        _signer_address: &str,
        sign_doc: proto::SignDoc,
    ) -> Result<DirectSignResponse, WalletError> {
        if self.reject_signing {
            return Err(WalletError::Rejected);
        }
        self.direct_docs.lock().unwrap().push(sign_doc.clone());
        Ok(DirectSignResponse {
            signed: sign_doc,
            signature: vec![9u8; 64],
        })
    }
}

struct MockWallet {
    signer: Option<Arc<MockSigner>>,
    refuse_chain: bool,
}

#[async_trait]
impl WalletExtension for MockWallet {
    async fn enable(&self, chain_id: &str) -> Result<(), WalletError> {
        if self.refuse_chain {
            return Err(WalletError::UnknownChain(chain_id.to_string()));
        }
        Ok(())
    }

    async fn get_offline_signer_auto(
        &self,
        _chain_id: &str,
    ) -> Result<Option<Arc<dyn OfflineSigner>>, WalletError> {
        Ok(self
            .signer
            .clone()
            .map(|signer| signer as Arc<dyn OfflineSigner>))
    }
}

// ========== Mock chain ==========

#[derive(Default)]
struct MockChain {
    account: Option<AccountInfo>,
    reject_code: Option<u32>,
    transport_error: bool,
    account_queries: AtomicUsize,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_account(&self, _address: &str) -> authz_signer::Result<Option<AccountInfo>> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.account)
    }

    async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> authz_signer::Result<BroadcastResult> {
        if self.transport_error {
            return Err(GrantError::Rpc("connection reset by peer".to_string()));
        }
        let hash = authz_signer::cosmos::tx_hash(&tx_bytes);
        self.broadcasts.lock().unwrap().push(tx_bytes);

        Ok(match self.reject_code {
            Some(code) => BroadcastResult {
                transaction_hash: hash,
                code,
                raw_log: "insufficient fees".to_string(),
            },
            None => BroadcastResult {
                transaction_hash: hash,
                code: 0,
                raw_log: "[]".to_string(),
            },
        })
    }
}

struct MockConnector {
    chain: Arc<MockChain>,
}

#[async_trait]
impl ChainConnector for MockConnector {
    async fn connect(&self, _endpoint: &str) -> authz_signer::Result<Arc<dyn ChainClient>> {
        Ok(self.chain.clone())
    }
}

// ========== Helpers ==========

fn on_chain(account_number: u64, sequence: u64) -> MockChain {
    MockChain {
        account: Some(AccountInfo {
            account_number,
            sequence,
        }),
        ..Default::default()
    }
}

fn session_with(signer: Option<Arc<MockSigner>>, chain: Arc<MockChain>) -> SigningSession {
    let _ = env_logger::try_init();
    let wallet = MockWallet {
        signer,
        refuse_chain: false,
    };
    SigningSession::new(Some(Arc::new(wallet)), Arc::new(MockConnector { chain }))
}

fn scenario_fee() -> Fee {
    Fee::new("uatom", "5000", 200_000)
}

struct DecodedTx {
    body: proto::TxBody,
    auth_info: proto::AuthInfo,
    signatures: Vec<Vec<u8>>,
}

fn decode_tx(bytes: &[u8]) -> DecodedTx {
    let raw = proto::TxRaw::decode(bytes).unwrap();
    DecodedTx {
        body: proto::TxBody::decode(raw.body_bytes.as_slice()).unwrap(),
        auth_info: proto::AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap(),
        signatures: raw.signatures,
    }
}

fn sign_mode(tx: &DecodedTx) -> i32 {
    tx.auth_info.signer_infos[0]
        .mode_info
        .as_ref()
        .and_then(|mode| mode.single.as_ref())
        .map(|single| single.mode)
        .unwrap()
}

// ========== Tests ==========

#[tokio::test]
async fn test_amino_only_end_to_end() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = Arc::new(MockSigner::new(false));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    assert_eq!(account.address, GRANTER);
    assert_eq!(account.account_number, Some(42));
    assert_eq!(account.sequence, Some(7));
    assert!(!account.supports_direct_signing);
    assert!(session.amino_authz_installed());

    let result = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "redelegate grant")
        .await
        .unwrap();
    assert!(!result.transaction_hash.is_empty());
    assert_eq!(result.code, 0);
    assert_eq!(session.state(), SessionState::Broadcast);

    let broadcasts = chain.broadcasts.lock().unwrap();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(result.transaction_hash, authz_signer::cosmos::tx_hash(&broadcasts[0]));

    let tx = decode_tx(&broadcasts[0]);
    assert_eq!(tx.body.messages.len(), 1);
    assert_eq!(tx.body.memo, "redelegate grant");
    assert_eq!(sign_mode(&tx), SignMode::LegacyAminoJson as i32);
    assert_eq!(tx.auth_info.signer_infos[0].sequence, 7);
    assert_eq!(tx.signatures, vec![vec![7u8; 64]]);

    let grant = AuthorizationGrant::from_any(&tx.body.messages[0]).unwrap();
    assert_eq!(grant.granter, GRANTER);
    assert_eq!(grant.grantee, GRANTEE);
    match grant.authorization {
        Authorization::Generic(generic) => assert_eq!(generic.msg, type_urls::MSG_BEGIN_REDELEGATE),
        other => panic!("expected generic authorization, got {:?}", other),
    }

    let docs = signer.amino_docs.lock().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].account_number, "42");
    assert_eq!(docs[0].sequence, "7");
    assert_eq!(docs[0].chain_id, CHAIN_ID);
    assert_eq!(docs[0].fee.gas, "200000");
    assert_eq!(docs[0].msgs[0].type_, "cosmos-sdk/MsgGrant");
}

#[tokio::test]
async fn test_amino_only_chain_rejection() {
    let chain = Arc::new(MockChain {
        reject_code: Some(13),
        ..on_chain(42, 7)
    });
    let mut session = session_with(Some(Arc::new(MockSigner::new(false))), chain);

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "redelegate grant")
        .await
        .unwrap_err();

    match err {
        GrantError::BroadcastFailed { message } => {
            assert!(message.contains("code 13"), "{}", message);
            assert!(message.contains("insufficient fees"), "{}", message);
        }
        other => panic!("expected BroadcastFailed, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_transport_error_wrapped() {
    let chain = Arc::new(MockChain {
        transport_error: true,
        ..on_chain(1, 1)
    });
    let mut session = session_with(Some(Arc::new(MockSigner::new(true))), chain);

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GrantError::BroadcastFailed { ref message } if message.contains("connection reset by peer")
    ));
}

#[tokio::test]
async fn test_wallet_signing_rejection_wrapped() {
    let chain = Arc::new(on_chain(1, 1));
    let signer = MockSigner {
        reject_signing: true,
        ..MockSigner::new(false)
    };
    let mut session = session_with(Some(Arc::new(signer)), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, GrantError::BroadcastFailed { .. }));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_direct_end_to_end() {
    let chain = Arc::new(on_chain(5, 11));
    let signer = Arc::new(MockSigner::new(true));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    assert!(account.supports_direct_signing);
    assert!(!session.amino_authz_installed());

    session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "memo")
        .await
        .unwrap();

    let docs = signer.direct_docs.lock().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].account_number, 5);
    assert_eq!(docs[0].chain_id, CHAIN_ID);

    let broadcasts = chain.broadcasts.lock().unwrap();
    let tx = decode_tx(&broadcasts[0]);
    assert_eq!(sign_mode(&tx), SignMode::Direct as i32);
    assert_eq!(tx.auth_info.signer_infos[0].sequence, 11);
    assert_eq!(tx.signatures, vec![vec![9u8; 64]]);

    let grant = AuthorizationGrant::from_any(&tx.body.messages[0]).unwrap();
    match grant.authorization {
        Authorization::Stake(stake) => {
            assert_eq!(stake.allowed_validators, vec![VALIDATOR.to_string()]);
            assert!(stake.max_tokens.is_none());
        }
        other => panic!("expected stake authorization, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_account_number_makes_no_rpc_call() {
    let chain = Arc::new(on_chain(42, 7));
    let mut session = session_with(Some(Arc::new(MockSigner::new(false))), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let queries_after_connect = chain.account_queries.load(Ordering::SeqCst);

    let broken = Account {
        account_number: None,
        ..account
    };
    let err = session
        .sign_and_broadcast(&broken, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GrantError::InvalidAccountState { field: "account_number" }
    ));
    assert_eq!(chain.account_queries.load(Ordering::SeqCst), queries_after_connect);
    assert!(chain.broadcasts.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_missing_sequence() {
    let chain = Arc::new(on_chain(42, 7));
    let mut session = session_with(Some(Arc::new(MockSigner::new(true))), chain);

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let broken = Account {
        sequence: None,
        ..account
    };
    let err = session
        .sign_and_broadcast(&broken, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, GrantError::InvalidAccountState { field: "sequence" }));
}

#[tokio::test]
async fn test_unknown_account_defaults_to_zero() {
    let chain = Arc::new(MockChain::default());
    let mut session = session_with(Some(Arc::new(MockSigner::new(false))), chain);

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    assert_eq!(account.account_number, Some(0));
    assert_eq!(account.sequence, Some(0));
}

#[tokio::test]
async fn test_connect_without_wallet() {
    let chain = Arc::new(MockChain::default());
    let mut session = SigningSession::new(None, Arc::new(MockConnector { chain }));

    let err = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap_err();
    assert!(matches!(err, GrantError::SignerUnavailable));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_connect_chain_refused() {
    let chain = Arc::new(MockChain::default());
    let wallet = MockWallet {
        signer: Some(Arc::new(MockSigner::new(true))),
        refuse_chain: true,
    };
    let mut session = SigningSession::new(Some(Arc::new(wallet)), Arc::new(MockConnector { chain }));

    let err = session.connect("unknown-1", RPC, "0.025uatom").await.unwrap_err();
    assert!(matches!(
        err,
        GrantError::ChainNotEnabled { ref chain_id, .. } if chain_id == "unknown-1"
    ));
}

#[tokio::test]
async fn test_connect_without_signer() {
    let chain = Arc::new(MockChain::default());
    let mut session = session_with(None, chain);

    let err = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap_err();
    assert!(matches!(err, GrantError::NoSigner));
}

#[tokio::test]
async fn test_connect_with_bad_gas_price() {
    let chain = Arc::new(on_chain(1, 1));
    let mut session = session_with(Some(Arc::new(MockSigner::new(true))), chain);

    let err = session.connect(CHAIN_ID, RPC, "free").await.unwrap_err();
    assert!(matches!(err, GrantError::InvalidGasPrice(_)));
}

#[tokio::test]
async fn test_sign_before_connect_rejected() {
    let chain = Arc::new(on_chain(1, 1));
    let mut session = session_with(Some(Arc::new(MockSigner::new(true))), chain.clone());
    let account = Account {
        address: GRANTER.to_string(),
        account_number: Some(1),
        sequence: Some(1),
        supports_direct_signing: true,
        pub_key: hex::decode(PUB_KEY).unwrap(),
    };

    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::InvalidState(SessionState::Disconnected)));
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reuse_after_broadcast_requires_reconnect() {
    let chain = Arc::new(on_chain(42, 7));
    let mut session = session_with(Some(Arc::new(MockSigner::new(true))), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap();

    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::InvalidState(SessionState::Broadcast)));

    session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_amino_expiration_truncated_to_millis() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = Arc::new(MockSigner::new(false));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    session
        .sign_and_broadcast_grant(
            &account,
            GRANTEE,
            VALIDATOR,
            Some(Timestamp::new(1_900_000_000, 123_456_789)),
            &scenario_fee(),
            "",
        )
        .await
        .unwrap();

    let docs = signer.amino_docs.lock().unwrap();
    assert_eq!(
        docs[0].msgs[0].value["grant"]["expiration"],
        "2030-03-17T17:46:40.123Z"
    );

    let broadcasts = chain.broadcasts.lock().unwrap();
    let grant = AuthorizationGrant::from_any(&decode_tx(&broadcasts[0]).body.messages[0]).unwrap();
    assert_eq!(grant.expiration, Some(Timestamp::new(1_900_000_000, 123_000_000)));
}

#[tokio::test]
async fn test_unrepresentable_expiration_not_wrapped() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = Arc::new(MockSigner::new(false));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let err = session
        .sign_and_broadcast_grant(
            &account,
            GRANTEE,
            VALIDATOR,
            Some(Timestamp::new(i64::MAX, 0)),
            &scenario_fee(),
            "",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GrantError::MalformedTimestamp { .. }), "{:?}", err);
    assert!(err.is_codec_defect());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(signer.amino_docs.lock().unwrap().is_empty());
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_amino_bad_fee_rejected_before_wallet_prompt() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = Arc::new(MockSigner::new(false));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let err = session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &Fee::new("uatom", "5k", 200_000), "")
        .await
        .unwrap_err();

    assert!(matches!(err, GrantError::BroadcastFailed { ref message } if message.contains("5k")));
    assert!(signer.amino_docs.lock().unwrap().is_empty());
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_amino_bad_public_key_rejected_before_wallet_prompt() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = Arc::new(MockSigner::new(false));
    let mut session = session_with(Some(signer.clone()), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    let broken = Account {
        pub_key: vec![1, 2, 3],
        ..account
    };
    let err = session
        .sign_and_broadcast(&broken, GRANTEE, VALIDATOR, &scenario_fee(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, GrantError::BroadcastFailed { ref message } if message.contains("public key")));
    assert!(signer.amino_docs.lock().unwrap().is_empty());
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transaction_built_from_signed_document() {
    let chain = Arc::new(on_chain(42, 7));
    let signer = MockSigner {
        memo_override: Some("edited in wallet".to_string()),
        ..MockSigner::new(false)
    };
    let mut session = session_with(Some(Arc::new(signer)), chain.clone());

    let account = session.connect(CHAIN_ID, RPC, "0.025uatom").await.unwrap();
    session
        .sign_and_broadcast(&account, GRANTEE, VALIDATOR, &scenario_fee(), "original")
        .await
        .unwrap();

    let broadcasts = chain.broadcasts.lock().unwrap();
    assert_eq!(decode_tx(&broadcasts[0]).body.memo, "edited in wallet");
}

#[tokio::test]
async fn test_fee_for_gas_and_config() {
    let chain = Arc::new(on_chain(42, 7));
    let mut session = session_with(Some(Arc::new(MockSigner::new(false))), chain);

    assert!(matches!(
        session.fee_for_gas(200_000),
        Err(GrantError::InvalidState(SessionState::Disconnected))
    ));

    let config = SessionConfig::from_json(
        r#"{"chainId":"cosmoshub-4","rpcEndpoint":"https://rpc.example.com","gasPrice":"0.03uatom","gasLimit":250000}"#,
    )
    .unwrap();
    session.connect_with_config(&config).await.unwrap();

    assert_eq!(session.chain_id(), Some(CHAIN_ID));
    assert_eq!(
        session.fee_for_gas(config.gas_limit).unwrap(),
        Fee::new("uatom", "7500", 250_000)
    );
}
