//! Amino JSON converters for authz messages
//!
//! Converts between protobuf `Any` messages and their legacy Amino JSON form, which is
//! what an Amino-only signer displays and signs. Only the message kinds listed in
//! [`AminoConverter`] are supported; anything else is rejected rather than dropped.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::timestamp::{from_iso, to_iso};
use super::{amino_types, type_urls};
use crate::errors::{GrantError, Result};
use crate::proto;

/// An Amino message: `{"type": "...", "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct AminoMsgGrant {
    granter: String,
    grantee: String,
    grant: AminoGrant,
}

#[derive(Debug, Serialize, Deserialize)]
struct AminoGrant {
    authorization: AminoMsg,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AminoGenericAuthorization {
    msg: String,
}

/// Message kinds with an Amino representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AminoConverter {
    /// The grant envelope, `MsgGrant`.
    MsgGrant,
    /// Authorization payload naming one permitted message type.
    GenericAuthorization,
}

impl AminoConverter {
    pub const AUTHZ: [AminoConverter; 2] =
        [AminoConverter::MsgGrant, AminoConverter::GenericAuthorization];

    pub fn from_type_url(type_url: &str) -> Option<Self> {
        match type_url {
            type_urls::MSG_GRANT => Some(AminoConverter::MsgGrant),
            type_urls::GENERIC_AUTHORIZATION => Some(AminoConverter::GenericAuthorization),
            _ => None,
        }
    }

    pub fn from_amino_type(amino_type: &str) -> Option<Self> {
        match amino_type {
            amino_types::MSG_GRANT => Some(AminoConverter::MsgGrant),
            amino_types::GENERIC_AUTHORIZATION => Some(AminoConverter::GenericAuthorization),
            _ => None,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            AminoConverter::MsgGrant => type_urls::MSG_GRANT,
            AminoConverter::GenericAuthorization => type_urls::GENERIC_AUTHORIZATION,
        }
    }

    pub fn amino_type(&self) -> &'static str {
        match self {
            AminoConverter::MsgGrant => amino_types::MSG_GRANT,
            AminoConverter::GenericAuthorization => amino_types::GENERIC_AUTHORIZATION,
        }
    }

    /// Whether this kind can appear as the authorization inside a grant.
    pub fn is_authorization(&self) -> bool {
        matches!(self, AminoConverter::GenericAuthorization)
    }

    pub fn to_amino(&self, any: &proto::Any) -> Result<AminoMsg> {
        let value = match self {
            AminoConverter::MsgGrant => encode_msg_grant(any)?,
            AminoConverter::GenericAuthorization => {
                let generic = proto::GenericAuthorization::decode(any.value.as_slice())?;
                serde_json::to_value(AminoGenericAuthorization { msg: generic.msg })?
            }
        };

        Ok(AminoMsg {
            type_: self.amino_type().to_string(),
            value,
        })
    }

    pub fn from_amino(&self, msg: &AminoMsg) -> Result<proto::Any> {
        let value = match self {
            AminoConverter::MsgGrant => decode_msg_grant(msg)?,
            AminoConverter::GenericAuthorization => {
                let generic: AminoGenericAuthorization = serde_json::from_value(msg.value.clone())?;
                proto::GenericAuthorization { msg: generic.msg }.encode_to_vec()
            }
        };

        Ok(proto::Any {
            type_url: self.type_url().to_string(),
            value,
        })
    }
}

fn encode_msg_grant(any: &proto::Any) -> Result<Value> {
    let msg = proto::MsgGrant::decode(any.value.as_slice())?;
    let grant = msg.grant.unwrap_or_default();
    let authorization = grant
        .authorization
        .ok_or_else(|| GrantError::UnsupportedAuthorization {
            type_url: String::new(),
        })?;

    let converter = AminoConverter::from_type_url(&authorization.type_url)
        .filter(AminoConverter::is_authorization)
        .ok_or_else(|| GrantError::UnsupportedAuthorization {
            type_url: authorization.type_url.clone(),
        })?;

    let expiration = grant
        .expiration
        .map(|ts| to_iso(ts.seconds, ts.nanos))
        .transpose()?;

    Ok(serde_json::to_value(AminoMsgGrant {
        granter: msg.granter,
        grantee: msg.grantee,
        grant: AminoGrant {
            authorization: converter.to_amino(&authorization)?,
            expiration,
        },
    })?)
}

fn decode_msg_grant(msg: &AminoMsg) -> Result<Vec<u8>> {
    let amino: AminoMsgGrant = serde_json::from_value(msg.value.clone())?;
    let authorization = amino.grant.authorization;

    let converter = AminoConverter::from_amino_type(&authorization.type_)
        .filter(AminoConverter::is_authorization)
        .ok_or_else(|| GrantError::UnsupportedAuthorization {
            type_url: authorization.type_.clone(),
        })?;

    let expiration = amino
        .grant
        .expiration
        .as_deref()
        .map(from_iso)
        .transpose()?
        .map(|(seconds, nanos)| proto::Timestamp { seconds, nanos });

    Ok(proto::MsgGrant {
        granter: amino.granter,
        grantee: amino.grantee,
        grant: Some(proto::Grant {
            authorization: Some(converter.from_amino(&authorization)?),
            expiration,
        }),
    }
    .encode_to_vec())
}

/// The Amino translation layer of a signing client: the converters it has installed.
#[derive(Debug, Clone, Default)]
pub struct AminoTypes {
    converters: Vec<AminoConverter>,
}

impl AminoTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authz() -> Self {
        let mut types = Self::new();
        types.register_authz();
        types
    }

    pub fn register(&mut self, converter: AminoConverter) {
        if !self.converters.contains(&converter) {
            log::debug!("Registering amino converter {}", converter.type_url());
            self.converters.push(converter);
        }
    }

    pub fn register_authz(&mut self) {
        for converter in AminoConverter::AUTHZ {
            self.register(converter);
        }
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.converters.iter().any(|c| c.type_url() == type_url)
    }

    pub fn to_amino(&self, any: &proto::Any) -> Result<AminoMsg> {
        let converter = self
            .converters
            .iter()
            .find(|c| c.type_url() == any.type_url)
            .ok_or_else(|| GrantError::UnsupportedMessage {
                type_url: any.type_url.clone(),
            })?;
        converter.to_amino(any)
    }

    pub fn from_amino(&self, msg: &AminoMsg) -> Result<proto::Any> {
        let converter = self
            .converters
            .iter()
            .find(|c| c.amino_type() == msg.type_)
            .ok_or_else(|| GrantError::UnsupportedMessage {
                type_url: msg.type_.clone(),
            })?;
        converter.from_amino(msg)
    }
}
