//! Authz grant construction
//!
//! The authorization embedded in a grant depends on what the signer can sign:
//! a direct signer gets a `StakeAuthorization` scoped to one validator, an Amino-only
//! signer gets a `GenericAuthorization` for the redelegate message, which the Amino
//! converters in [`super::amino`] know how to encode.

use prost::Message;

use super::type_urls;
use crate::errors::{GrantError, Result};
use crate::proto::{self, stake_authorization};
use crate::types::{
    Authorization, AuthorizationGrant, Coin, GenericAuthorization, SigningCapability,
    StakeAuthorization, StakeAuthorizationType, Timestamp,
};

/// Picks the authorization payload for one signing capability.
pub trait GrantStrategy: Send + Sync + std::fmt::Debug {
    fn capability(&self) -> SigningCapability;

    /// Authorization permitting redelegation involving `validator`.
    fn authorization(&self, validator: &str) -> Authorization;
}

/// Narrow grant: redelegation only, only for the given validator, unlimited amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectGrantStrategy;

impl GrantStrategy for DirectGrantStrategy {
    fn capability(&self) -> SigningCapability {
        SigningCapability::Direct
    }

    fn authorization(&self, validator: &str) -> Authorization {
        Authorization::Stake(StakeAuthorization {
            allowed_validators: vec![validator.to_string()],
            authorization_type: StakeAuthorizationType::Redelegate,
            max_tokens: None,
        })
    }
}

/// Coarse grant: any `MsgBeginRedelegate`. The validator cannot be expressed here.
#[derive(Debug, Clone, Copy, Default)]
pub struct AminoGrantStrategy;

impl GrantStrategy for AminoGrantStrategy {
    fn capability(&self) -> SigningCapability {
        SigningCapability::AminoOnly
    }

    fn authorization(&self, _validator: &str) -> Authorization {
        Authorization::Generic(GenericAuthorization {
            msg: type_urls::MSG_BEGIN_REDELEGATE.to_string(),
        })
    }
}

static DIRECT_STRATEGY: DirectGrantStrategy = DirectGrantStrategy;
static AMINO_STRATEGY: AminoGrantStrategy = AminoGrantStrategy;

pub fn strategy_for(capability: SigningCapability) -> &'static dyn GrantStrategy {
    match capability {
        SigningCapability::Direct => &DIRECT_STRATEGY,
        SigningCapability::AminoOnly => &AMINO_STRATEGY,
    }
}

/// Build the grant for `capability`. `None` expiration means the grant never expires.
pub fn build(
    granter: &str,
    grantee: &str,
    validator: &str,
    capability: SigningCapability,
    expiration: Option<Timestamp>,
) -> AuthorizationGrant {
    AuthorizationGrant {
        granter: granter.to_string(),
        grantee: grantee.to_string(),
        authorization: strategy_for(capability).authorization(validator),
        expiration,
    }
}

// ========== Protobuf conversion ==========

impl StakeAuthorizationType {
    pub fn to_proto(self) -> proto::AuthorizationType {
        match self {
            StakeAuthorizationType::Delegate => proto::AuthorizationType::Delegate,
            StakeAuthorizationType::Undelegate => proto::AuthorizationType::Undelegate,
            StakeAuthorizationType::Redelegate => proto::AuthorizationType::Redelegate,
        }
    }

    pub fn from_proto(value: i32) -> Option<Self> {
        match proto::AuthorizationType::try_from(value).ok()? {
            proto::AuthorizationType::Delegate => Some(StakeAuthorizationType::Delegate),
            proto::AuthorizationType::Undelegate => Some(StakeAuthorizationType::Undelegate),
            proto::AuthorizationType::Redelegate => Some(StakeAuthorizationType::Redelegate),
            proto::AuthorizationType::Unspecified => None,
        }
    }
}

impl Authorization {
    pub fn type_url(&self) -> &'static str {
        match self {
            Authorization::Stake(_) => type_urls::STAKE_AUTHORIZATION,
            Authorization::Generic(_) => type_urls::GENERIC_AUTHORIZATION,
        }
    }

    pub fn to_any(&self) -> proto::Any {
        let value = match self {
            Authorization::Stake(stake) => proto::StakeAuthorization {
                max_tokens: stake.max_tokens.as_ref().map(|coin| proto::Coin {
                    denom: coin.denom.clone(),
                    amount: coin.amount.clone(),
                }),
                validators: Some(stake_authorization::Policy::AllowList(
                    stake_authorization::Validators {
                        address: stake.allowed_validators.clone(),
                    },
                )),
                authorization_type: stake.authorization_type.to_proto() as i32,
            }
            .encode_to_vec(),
            Authorization::Generic(generic) => proto::GenericAuthorization {
                msg: generic.msg.clone(),
            }
            .encode_to_vec(),
        };

        proto::Any {
            type_url: self.type_url().to_string(),
            value,
        }
    }

    pub fn from_any(any: &proto::Any) -> Result<Self> {
        match any.type_url.as_str() {
            type_urls::GENERIC_AUTHORIZATION => {
                let generic = proto::GenericAuthorization::decode(any.value.as_slice())?;
                Ok(Authorization::Generic(GenericAuthorization { msg: generic.msg }))
            }
            type_urls::STAKE_AUTHORIZATION => {
                let stake = proto::StakeAuthorization::decode(any.value.as_slice())?;
                let allowed_validators = match stake.validators {
                    Some(stake_authorization::Policy::AllowList(list)) => list.address,
                    // Deny lists are never produced by this crate.
                    _ => {
                        return Err(GrantError::UnsupportedAuthorization {
                            type_url: format!("{} (deny list)", any.type_url),
                        })
                    }
                };
                let authorization_type = StakeAuthorizationType::from_proto(
                    stake.authorization_type,
                )
                .ok_or_else(|| GrantError::UnsupportedAuthorization {
                    type_url: format!(
                        "{} (authorization type {})",
                        any.type_url, stake.authorization_type
                    ),
                })?;
                Ok(Authorization::Stake(StakeAuthorization {
                    allowed_validators,
                    authorization_type,
                    max_tokens: stake.max_tokens.map(|coin| Coin {
                        denom: coin.denom,
                        amount: coin.amount,
                    }),
                }))
            }
            other => Err(GrantError::UnsupportedAuthorization {
                type_url: other.to_string(),
            }),
        }
    }
}

impl AuthorizationGrant {
    pub fn to_msg_grant(&self) -> proto::MsgGrant {
        proto::MsgGrant {
            granter: self.granter.clone(),
            grantee: self.grantee.clone(),
            grant: Some(proto::Grant {
                authorization: Some(self.authorization.to_any()),
                expiration: self.expiration.map(|ts| proto::Timestamp {
                    seconds: ts.seconds,
                    nanos: ts.nanos,
                }),
            }),
        }
    }

    /// The grant as a transaction message.
    pub fn to_any(&self) -> proto::Any {
        proto::Any {
            type_url: type_urls::MSG_GRANT.to_string(),
            value: self.to_msg_grant().encode_to_vec(),
        }
    }

    pub fn from_msg_grant(msg: proto::MsgGrant) -> Result<Self> {
        let grant = msg.grant.unwrap_or_default();
        let authorization = grant
            .authorization
            .ok_or_else(|| GrantError::UnsupportedAuthorization {
                type_url: String::new(),
            })?;

        Ok(AuthorizationGrant {
            granter: msg.granter,
            grantee: msg.grantee,
            authorization: Authorization::from_any(&authorization)?,
            expiration: grant
                .expiration
                .map(|ts| Timestamp::new(ts.seconds, ts.nanos)),
        })
    }

    pub fn from_any(any: &proto::Any) -> Result<Self> {
        if any.type_url != type_urls::MSG_GRANT {
            return Err(GrantError::UnsupportedMessage {
                type_url: any.type_url.clone(),
            });
        }
        Self::from_msg_grant(proto::MsgGrant::decode(any.value.as_slice())?)
    }
}
