//! Typed section payloads and their canonical serialization.
//!
//! The `(tag, serialization)` pair is the schema of the chain: the
//! byte image of a payload is what gets hashed into the signing scope
//! and counted by the gas formula, so serialization here must stay
//! canonical and stable.

use crate::key::Hash;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};
use vb_crypto::SchemeId;

use std::fmt;

/// Tag enumeration of all known section payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionTag {
    SignatureScheme = 0,
    PublicKey = 1,
    Signature = 2,
    TokenIssuance = 3,
    AccountCreation = 4,
    Transfer = 5,
    Description = 6,
    Endpoint = 7,
    ApplicationDeclaration = 8,
    ActorDeclaration = 9,
    ChannelDeclaration = 10,
    ChannelSubscription = 11,
    LedgerDeclaration = 12,
    LedgerRecord = 13,
    ValidatorDeclaration = 14,
    ProtocolUpgrade = 15,
}

impl SectionTag {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(SectionTag::SignatureScheme),
            1 => Some(SectionTag::PublicKey),
            2 => Some(SectionTag::Signature),
            3 => Some(SectionTag::TokenIssuance),
            4 => Some(SectionTag::AccountCreation),
            5 => Some(SectionTag::Transfer),
            6 => Some(SectionTag::Description),
            7 => Some(SectionTag::Endpoint),
            8 => Some(SectionTag::ApplicationDeclaration),
            9 => Some(SectionTag::ActorDeclaration),
            10 => Some(SectionTag::ChannelDeclaration),
            11 => Some(SectionTag::ChannelSubscription),
            12 => Some(SectionTag::LedgerDeclaration),
            13 => Some(SectionTag::LedgerRecord),
            14 => Some(SectionTag::ValidatorDeclaration),
            15 => Some(SectionTag::ProtocolUpgrade),
            _ => None,
        }
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SectionTag::SignatureScheme => "signature-scheme",
            SectionTag::PublicKey => "public-key",
            SectionTag::Signature => "signature",
            SectionTag::TokenIssuance => "token-issuance",
            SectionTag::AccountCreation => "account-creation",
            SectionTag::Transfer => "transfer",
            SectionTag::Description => "description",
            SectionTag::Endpoint => "endpoint",
            SectionTag::ApplicationDeclaration => "application-declaration",
            SectionTag::ActorDeclaration => "actor-declaration",
            SectionTag::ChannelDeclaration => "channel-declaration",
            SectionTag::ChannelSubscription => "channel-subscription",
            SectionTag::LedgerDeclaration => "ledger-declaration",
            SectionTag::LedgerRecord => "ledger-record",
            SectionTag::ValidatorDeclaration => "validator-declaration",
            SectionTag::ProtocolUpgrade => "protocol-upgrade",
        };
        write!(f, "{}", s)
    }
}

/// Declares which signature scheme authenticates the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureScheme {
    pub scheme: SchemeId,
}

/// Declares (or rotates) the chain's public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyDeclaration {
    pub key: Vec<u8>,
}

/// Seals the microblock: a signature over the signing scope of every
/// preceding section plus the header prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSeal {
    pub signature: Vec<u8>,
}

/// Mints the initial token offer on a new account chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssuance {
    pub amount: u64,
}

/// Opens an account chain with no initial funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreation;

/// Moves tokens from this account chain to a payee account chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub payee: Hash,
    pub amount: u64,
}

/// Human readable name of the entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub name: String,
}

/// Network endpoint the entity is reachable at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
}

/// Binds an application chain to its owning organization chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDeclaration {
    pub organization: Hash,
}

/// Declares a named actor of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorDeclaration {
    pub name: String,
}

/// Declares a named channel of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDeclaration {
    pub name: String,
}

/// Subscribes a declared actor to a declared channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub actor: String,
    pub channel: String,
}

/// Binds an application-ledger chain to its application chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDeclaration {
    pub application: Hash,
}

/// One record appended to an application ledger on behalf of an actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub channel: String,
    pub actor: String,
    pub payload: Vec<u8>,
}

/// Binds a validator node chain to its operating organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorDeclaration {
    pub organization: Hash,
}

/// Raises the protocol chain to a new version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolUpgrade {
    pub version: u32,
}

/// All possible payloads recordable in a microblock body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPayload {
    SignatureScheme(SignatureScheme),
    PublicKey(PublicKeyDeclaration),
    Signature(SignatureSeal),
    TokenIssuance(TokenIssuance),
    AccountCreation(AccountCreation),
    Transfer(Transfer),
    Description(Description),
    Endpoint(Endpoint),
    ApplicationDeclaration(ApplicationDeclaration),
    ActorDeclaration(ActorDeclaration),
    ChannelDeclaration(ChannelDeclaration),
    ChannelSubscription(ChannelSubscription),
    LedgerDeclaration(LedgerDeclaration),
    LedgerRecord(LedgerRecord),
    ValidatorDeclaration(ValidatorDeclaration),
    ProtocolUpgrade(ProtocolUpgrade),
}

impl SectionPayload {
    /// Return the tag associated with the payload
    pub fn tag(&self) -> SectionTag {
        match self {
            SectionPayload::SignatureScheme(_) => SectionTag::SignatureScheme,
            SectionPayload::PublicKey(_) => SectionTag::PublicKey,
            SectionPayload::Signature(_) => SectionTag::Signature,
            SectionPayload::TokenIssuance(_) => SectionTag::TokenIssuance,
            SectionPayload::AccountCreation(_) => SectionTag::AccountCreation,
            SectionPayload::Transfer(_) => SectionTag::Transfer,
            SectionPayload::Description(_) => SectionTag::Description,
            SectionPayload::Endpoint(_) => SectionTag::Endpoint,
            SectionPayload::ApplicationDeclaration(_) => SectionTag::ApplicationDeclaration,
            SectionPayload::ActorDeclaration(_) => SectionTag::ActorDeclaration,
            SectionPayload::ChannelDeclaration(_) => SectionTag::ChannelDeclaration,
            SectionPayload::ChannelSubscription(_) => SectionTag::ChannelSubscription,
            SectionPayload::LedgerDeclaration(_) => SectionTag::LedgerDeclaration,
            SectionPayload::LedgerRecord(_) => SectionTag::LedgerRecord,
            SectionPayload::ValidatorDeclaration(_) => SectionTag::ValidatorDeclaration,
            SectionPayload::ProtocolUpgrade(_) => SectionTag::ProtocolUpgrade,
        }
    }

    /// Canonical serialization of the payload, the byte image hashed
    /// into the section hash
    pub fn serialize_in(&self, buf: &mut WriteBuf) {
        match self {
            SectionPayload::SignatureScheme(s) => buf.put_u8(s.scheme as u8),
            // raw key material: the section framing already carries the length
            SectionPayload::PublicKey(k) => buf.put_bytes(&k.key),
            SectionPayload::Signature(s) => buf.put_bytes(&s.signature),
            SectionPayload::TokenIssuance(t) => buf.put_u64(t.amount),
            SectionPayload::AccountCreation(AccountCreation) => {}
            SectionPayload::Transfer(t) => {
                t.payee.serialize_in(buf);
                buf.put_u64(t.amount);
            }
            SectionPayload::Description(d) => write_string(buf, &d.name),
            SectionPayload::Endpoint(e) => write_string(buf, &e.url),
            SectionPayload::ApplicationDeclaration(d) => d.organization.serialize_in(buf),
            SectionPayload::ActorDeclaration(a) => write_string(buf, &a.name),
            SectionPayload::ChannelDeclaration(c) => write_string(buf, &c.name),
            SectionPayload::ChannelSubscription(s) => {
                write_string(buf, &s.actor);
                write_string(buf, &s.channel);
            }
            SectionPayload::LedgerDeclaration(d) => d.application.serialize_in(buf),
            SectionPayload::LedgerRecord(r) => {
                write_string(buf, &r.channel);
                write_string(buf, &r.actor);
                buf.put_varint(r.payload.len() as u64);
                buf.put_bytes(&r.payload);
            }
            SectionPayload::ValidatorDeclaration(d) => d.organization.serialize_in(buf),
            SectionPayload::ProtocolUpgrade(u) => buf.put_u32(u.version),
        }
    }

    /// Deserialize the payload tagged `tag` from its canonical bytes.
    /// The whole buffer must be consumed.
    pub fn read(tag: SectionTag, buf: &mut ReadBuf) -> Result<Self, ReadError> {
        use vb_core::mempack::Readable;

        let payload = match tag {
            SectionTag::SignatureScheme => {
                let raw = buf.get_u8()?;
                let scheme = SchemeId::from_u8(raw).ok_or(ReadError::UnknownTag(raw as u32))?;
                SectionPayload::SignatureScheme(SignatureScheme { scheme })
            }
            SectionTag::PublicKey => {
                let key = read_tail(buf, "public-key.key")?;
                SectionPayload::PublicKey(PublicKeyDeclaration { key })
            }
            SectionTag::Signature => {
                let signature = read_tail(buf, "signature.signature")?;
                SectionPayload::Signature(SignatureSeal { signature })
            }
            SectionTag::TokenIssuance => {
                SectionPayload::TokenIssuance(TokenIssuance {
                    amount: buf.get_u64()?,
                })
            }
            SectionTag::AccountCreation => SectionPayload::AccountCreation(AccountCreation),
            SectionTag::Transfer => SectionPayload::Transfer(Transfer {
                payee: Hash::read(buf)?,
                amount: buf.get_u64()?,
            }),
            SectionTag::Description => SectionPayload::Description(Description {
                name: read_string(buf, "description.name")?,
            }),
            SectionTag::Endpoint => SectionPayload::Endpoint(Endpoint {
                url: read_string(buf, "endpoint.url")?,
            }),
            SectionTag::ApplicationDeclaration => {
                SectionPayload::ApplicationDeclaration(ApplicationDeclaration {
                    organization: Hash::read(buf)?,
                })
            }
            SectionTag::ActorDeclaration => SectionPayload::ActorDeclaration(ActorDeclaration {
                name: read_string(buf, "actor-declaration.name")?,
            }),
            SectionTag::ChannelDeclaration => {
                SectionPayload::ChannelDeclaration(ChannelDeclaration {
                    name: read_string(buf, "channel-declaration.name")?,
                })
            }
            SectionTag::ChannelSubscription => {
                SectionPayload::ChannelSubscription(ChannelSubscription {
                    actor: read_string(buf, "channel-subscription.actor")?,
                    channel: read_string(buf, "channel-subscription.channel")?,
                })
            }
            SectionTag::LedgerDeclaration => {
                SectionPayload::LedgerDeclaration(LedgerDeclaration {
                    application: Hash::read(buf)?,
                })
            }
            SectionTag::LedgerRecord => {
                let channel = read_string(buf, "ledger-record.channel")?;
                let actor = read_string(buf, "ledger-record.actor")?;
                let len = buf.get_varint()? as usize;
                let payload = buf.get_slice(len)?.to_vec();
                SectionPayload::LedgerRecord(LedgerRecord {
                    channel,
                    actor,
                    payload,
                })
            }
            SectionTag::ValidatorDeclaration => {
                SectionPayload::ValidatorDeclaration(ValidatorDeclaration {
                    organization: Hash::read(buf)?,
                })
            }
            SectionTag::ProtocolUpgrade => SectionPayload::ProtocolUpgrade(ProtocolUpgrade {
                version: buf.get_u32()?,
            }),
        };
        buf.expect_end()?;
        Ok(payload)
    }
}

pub(crate) fn write_string(buf: &mut WriteBuf, s: &str) {
    buf.put_varint(s.len() as u64);
    buf.put_bytes(s.as_bytes());
}

pub(crate) fn read_string(buf: &mut ReadBuf, field: &str) -> Result<String, ReadError> {
    let len = buf.get_varint()? as usize;
    let bytes = buf.get_slice(len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ReadError::StructureInvalid(format!("{} is not valid utf8", field)))
}

fn read_tail(buf: &mut ReadBuf, field: &str) -> Result<Vec<u8>, ReadError> {
    let bytes = buf.get_slice(buf.remaining())?.to_vec();
    if bytes.is_empty() {
        return Err(ReadError::StructureInvalid(format!("{} is empty", field)));
    }
    Ok(bytes)
}
