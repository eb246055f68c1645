//! Closed dispatch over the six virtual blockchain kinds.
//!
//! Every kind owns a state struct that is a pure fold over the chain's
//! sections: nothing enters it except through `apply_section`, and the
//! canonical serialization below is what provider snapshots persist.

use crate::key::{AccountId, Hash, VbId};
use crate::microblock::Microblock;
use crate::provider::{Provider, ProviderError};
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::StructureError;
use crate::vb::{
    AccountState, ApplicationLedgerState, ApplicationState, OrganizationState, ProtocolState,
    ValidatorNodeState,
};
use crate::vbtype::VbType;
use vb_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use vb_crypto::{SchemeError, SchemeId, Verification};

use thiserror::Error;

/// Domain invariant violations raised by section handlers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    #[error("signature scheme is already declared")]
    SchemeAlreadyDeclared,
    #[error("no signature scheme declared")]
    SchemeNotDeclared,
    #[error("no public key declared")]
    KeyNotDeclared,
    #[error("token issuance of {amount} does not match the initial offer of {expected}")]
    InvalidIssuanceAmount { amount: u64, expected: u64 },
    #[error("transfer of zero tokens")]
    ZeroTransferAmount,
    #[error("balance {balance} does not cover a transfer of {amount}")]
    InsufficientBalance { balance: u64, amount: u64 },
    #[error("payee account {0} not found")]
    PayeeNotFound(VbId),
    #[error("organization {0} not found")]
    OrganizationNotFound(VbId),
    #[error("application {0} not found")]
    ApplicationNotFound(VbId),
    #[error("no owning organization declared")]
    OrganizationNotDeclared,
    #[error("no owning application declared")]
    ApplicationNotDeclared,
    #[error("actor {0} is already declared")]
    DuplicateActor(String),
    #[error("channel {0} is already declared")]
    DuplicateChannel(String),
    #[error("actor {0} is not declared")]
    UnknownActor(String),
    #[error("channel {0} is not declared")]
    UnknownChannel(String),
    #[error("actor {actor} is not subscribed to channel {channel}")]
    ActorNotSubscribed { actor: String, channel: String },
    #[error("protocol version {proposed} does not supersede current version {current}")]
    StaleProtocolVersion { current: u32, proposed: u32 },
    #[error("signature does not verify against the declared key")]
    SignatureInvalid,
    #[error("section {0} is not valid on this virtual blockchain type")]
    UnexpectedSection(SectionTag),
    #[error("virtual blockchain {id} is a {got} chain, expected {expected}")]
    InconsistentType {
        id: VbId,
        expected: VbType,
        got: VbType,
    },
    #[error("stored state snapshot is malformed: {0}")]
    SnapshotInvalid(#[from] ReadError),
    #[error(transparent)]
    Scheme(#[from] SchemeError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Per-microblock context threaded through section handlers
pub struct ApplyContext<'a> {
    pub microblock: &'a Microblock,
    pub height: u64,
    pub is_first: bool,
    pub fees_payer: Option<AccountId>,
}

/// Type-specific state of one virtual blockchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VbState {
    Protocol(ProtocolState),
    Account(AccountState),
    ValidatorNode(ValidatorNodeState),
    Organization(OrganizationState),
    Application(ApplicationState),
    ApplicationLedger(ApplicationLedgerState),
}

impl VbState {
    pub fn new(vb_type: VbType) -> Self {
        match vb_type {
            VbType::Protocol => VbState::Protocol(ProtocolState::default()),
            VbType::Account => VbState::Account(AccountState::default()),
            VbType::ValidatorNode => VbState::ValidatorNode(ValidatorNodeState::default()),
            VbType::Organization => VbState::Organization(OrganizationState::default()),
            VbType::Application => VbState::Application(ApplicationState::default()),
            VbType::ApplicationLedger => {
                VbState::ApplicationLedger(ApplicationLedgerState::default())
            }
        }
    }

    pub fn vb_type(&self) -> VbType {
        match self {
            VbState::Protocol(_) => VbType::Protocol,
            VbState::Account(_) => VbType::Account,
            VbState::ValidatorNode(_) => VbType::ValidatorNode,
            VbState::Organization(_) => VbType::Organization,
            VbState::Application(_) => VbType::Application,
            VbState::ApplicationLedger(_) => VbType::ApplicationLedger,
        }
    }

    /// Validate a microblock's ordered section tag sequence against
    /// this kind's grammar
    pub fn check_structure(
        &self,
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        match self {
            VbState::Protocol(_) => ProtocolState::check_structure(is_first, tags),
            VbState::Account(_) => AccountState::check_structure(is_first, tags),
            VbState::ValidatorNode(_) => ValidatorNodeState::check_structure(is_first, tags),
            VbState::Organization(_) => OrganizationState::check_structure(is_first, tags),
            VbState::Application(_) => ApplicationState::check_structure(is_first, tags),
            VbState::ApplicationLedger(_) => {
                ApplicationLedgerState::check_structure(is_first, tags)
            }
        }
    }

    /// Fold one section into the state. Handlers may read other chains
    /// through the provider but never write them.
    pub async fn apply_section<P: Provider + ?Sized>(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        section: &Section,
        provider: &P,
    ) -> Result<(), SectionError> {
        match self {
            VbState::Protocol(st) => st.apply_section(ctx, section, provider).await,
            VbState::Account(st) => st.apply_section(ctx, section, provider).await,
            VbState::ValidatorNode(st) => st.apply_section(ctx, section, provider).await,
            VbState::Organization(st) => st.apply_section(ctx, section, provider).await,
            VbState::Application(st) => st.apply_section(ctx, section, provider).await,
            VbState::ApplicationLedger(st) => st.apply_section(ctx, section, provider).await,
        }
    }

    pub fn serialize_in(&self, buf: &mut WriteBuf) {
        match self {
            VbState::Protocol(st) => st.serialize_in(buf),
            VbState::Account(st) => st.serialize_in(buf),
            VbState::ValidatorNode(st) => st.serialize_in(buf),
            VbState::Organization(st) => st.serialize_in(buf),
            VbState::Application(st) => st.serialize_in(buf),
            VbState::ApplicationLedger(st) => st.serialize_in(buf),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = WriteBuf::new();
        self.serialize_in(&mut buf);
        buf.into_inner()
    }

    pub fn read(vb_type: VbType, buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(match vb_type {
            VbType::Protocol => VbState::Protocol(ProtocolState::read(buf)?),
            VbType::Account => VbState::Account(AccountState::read(buf)?),
            VbType::ValidatorNode => VbState::ValidatorNode(ValidatorNodeState::read(buf)?),
            VbType::Organization => VbState::Organization(OrganizationState::read(buf)?),
            VbType::Application => VbState::Application(ApplicationState::read(buf)?),
            VbType::ApplicationLedger => {
                VbState::ApplicationLedger(ApplicationLedgerState::read(buf)?)
            }
        })
    }

    pub fn from_bytes(vb_type: VbType, bytes: &[u8]) -> Result<Self, ReadError> {
        let mut buf = ReadBuf::from(bytes);
        let state = Self::read(vb_type, &mut buf)?;
        buf.expect_end()?;
        Ok(state)
    }
}

/// Fetch and decode a sibling chain's state, checking its kind
pub(crate) async fn fetch_state<P: Provider + ?Sized>(
    provider: &P,
    id: &VbId,
    expected: VbType,
) -> Result<VbState, SectionError> {
    let content = provider.get_virtual_blockchain_content(id).await?;
    if content.vb_type != expected {
        return Err(SectionError::InconsistentType {
            id: *id,
            expected,
            got: content.vb_type,
        });
    }
    Ok(VbState::from_bytes(content.vb_type, &content.state)?)
}

pub(crate) async fn fetch_organization<P: Provider + ?Sized>(
    provider: &P,
    id: &VbId,
) -> Result<OrganizationState, SectionError> {
    match fetch_state(provider, id, VbType::Organization).await {
        Ok(VbState::Organization(org)) => Ok(org),
        Ok(other) => Err(SectionError::InconsistentType {
            id: *id,
            expected: VbType::Organization,
            got: other.vb_type(),
        }),
        Err(SectionError::Provider(ProviderError::VirtualBlockchainNotFound(id))) => {
            Err(SectionError::OrganizationNotFound(id))
        }
        Err(e) => Err(e),
    }
}

pub(crate) async fn fetch_application<P: Provider + ?Sized>(
    provider: &P,
    id: &VbId,
) -> Result<ApplicationState, SectionError> {
    match fetch_state(provider, id, VbType::Application).await {
        Ok(VbState::Application(app)) => Ok(app),
        Ok(other) => Err(SectionError::InconsistentType {
            id: *id,
            expected: VbType::Application,
            got: other.vb_type(),
        }),
        Err(SectionError::Provider(ProviderError::VirtualBlockchainNotFound(id))) => {
            Err(SectionError::ApplicationNotFound(id))
        }
        Err(e) => Err(e),
    }
}

/// Shared tail of every signature handler: check the seal against the
/// resolved signer key, then resolve who pays the gas.
///
/// `self_funded` is set only at an account genesis, where the paying
/// account is the very chain being created and no fee payer is
/// recorded.
pub(crate) async fn verify_seal<P: Provider + ?Sized>(
    ctx: &mut ApplyContext<'_>,
    section: &Section,
    scheme: SchemeId,
    public_key: &[u8],
    self_funded: bool,
    provider: &P,
) -> Result<(), SectionError> {
    let signature = match section.payload() {
        SectionPayload::Signature(seal) => &seal.signature,
        other => return Err(SectionError::UnexpectedSection(other.tag())),
    };
    let verification = ctx.microblock.verify_signature(
        scheme,
        public_key,
        signature,
        true,
        section.index() as usize,
    )?;
    if verification == Verification::Failed {
        return Err(SectionError::SignatureInvalid);
    }
    if !self_funded {
        ctx.fees_payer = Some(provider.get_account_by_public_key(public_key).await?);
    }
    Ok(())
}

/// Read a varint element count, bounded by what the buffer can still
/// hold given the minimum serialized size of one element
pub(crate) fn read_count(buf: &mut ReadBuf, min_item_size: usize) -> Result<usize, ReadError> {
    let count = buf.get_varint()? as usize;
    let most = buf.remaining() / min_item_size;
    if count > most {
        return Err(ReadError::SizeTooBig(count, most));
    }
    Ok(count)
}

pub(crate) fn put_opt_hash(buf: &mut WriteBuf, v: &Option<Hash>) {
    match v {
        None => buf.put_u8(0),
        Some(hash) => {
            buf.put_u8(1);
            hash.serialize_in(buf);
        }
    }
}

pub(crate) fn read_opt_hash(buf: &mut ReadBuf) -> Result<Option<Hash>, ReadError> {
    match buf.get_u8()? {
        0 => Ok(None),
        1 => Ok(Some(Hash::read(buf)?)),
        other => Err(ReadError::UnknownTag(other as u32)),
    }
}

pub(crate) fn put_opt_string(buf: &mut WriteBuf, v: &Option<String>) {
    match v {
        None => buf.put_u8(0),
        Some(s) => {
            buf.put_u8(1);
            crate::section::write_string(buf, s);
        }
    }
}

pub(crate) fn read_opt_string(buf: &mut ReadBuf, field: &str) -> Result<Option<String>, ReadError> {
    match buf.get_u8()? {
        0 => Ok(None),
        1 => Ok(Some(crate::section::read_string(buf, field)?)),
        other => Err(ReadError::UnknownTag(other as u32)),
    }
}
