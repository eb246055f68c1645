//! The generic virtual blockchain engine and the six chain kinds.
//!
//! One [`VirtualBlockchain`] owns a single entity's chain: its height,
//! identifier, type-specific state and, at most, one in-progress
//! microblock. The writer path builds that microblock section by
//! section; the importer path replays one received from a peer. Both
//! paths go through the same structural grammar and the same section
//! handlers, so a chain accepted locally is bit-for-bit the chain every
//! other node accepts.

mod account;
mod app_ledger;
mod application;
mod identity;
mod organization;
mod protocol;
pub(crate) mod state;
mod validator;

pub use account::AccountState;
pub use app_ledger::ApplicationLedgerState;
pub use application::ApplicationState;
pub use identity::{DeclaredKey, KeyedIdentity};
pub use organization::OrganizationState;
pub use protocol::ProtocolState;
pub use state::{ApplyContext, SectionError, VbState};
pub use validator::ValidatorNodeState;

use crate::key::{AccountId, MicroblockId, VbId};
use crate::microblock::{Microblock, MicroblockError};
use crate::provider::{Provider, ProviderError, StateSnapshot};
use crate::section::{SectionPayload, SectionTag, SignatureSeal};
use crate::structure::StructureError;
use crate::vbtype::VbType;
use vb_core::mempack::ReadError;
use vb_crypto::{SchemeError, SchemeId};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VbError {
    #[error("no microblock in progress")]
    NoPendingMicroblock,
    #[error("pending microblock structure has not been checked")]
    StructureNotChecked,
    #[error("pending microblock is not sealed by a signature section")]
    NotSigned,
    #[error("expected microblock at height {expected}, got height {got}")]
    UnexpectedHeight { expected: u64, got: u64 },
    #[error("virtual blockchain {id} is a {got} chain, expected {expected}")]
    InconsistentType {
        id: VbId,
        expected: VbType,
        got: VbType,
    },
    #[error("stored state snapshot is malformed: {0}")]
    Snapshot(ReadError),
    #[error(transparent)]
    Microblock(#[from] MicroblockError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Scheme(#[from] SchemeError),
}

/// Result of committing one microblock to a chain, on either path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMicroblock {
    pub hash: MicroblockId,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
    pub fees_payer: Option<AccountId>,
    pub gas: u64,
}

#[derive(Debug, Clone)]
struct Pending {
    microblock: Microblock,
    /// Working copy of the chain state, committed at publish time
    state: VbState,
    structure_checked: bool,
}

/// One entity's append-only chain of microblocks
#[derive(Debug, Clone)]
pub struct VirtualBlockchain {
    vb_type: VbType,
    identifier: Option<VbId>,
    height: u64,
    microblock_hashes: Vec<MicroblockId>,
    expiration_day: u32,
    state: VbState,
    pending: Option<Pending>,
}

impl VirtualBlockchain {
    /// A fresh chain at height 0, no microblock published yet
    pub fn new(vb_type: VbType, expiration_day: u32) -> Self {
        VirtualBlockchain {
            vb_type,
            identifier: None,
            height: 0,
            microblock_hashes: Vec::new(),
            expiration_day,
            state: VbState::new(vb_type),
            pending: None,
        }
    }

    /// Rebuild a chain from its persisted snapshot
    pub async fn load<P: Provider + ?Sized>(
        provider: &P,
        id: &VbId,
        expected: VbType,
    ) -> Result<Self, VbError> {
        let content = provider.get_virtual_blockchain_content(id).await?;
        if content.vb_type != expected {
            return Err(VbError::InconsistentType {
                id: *id,
                expected,
                got: content.vb_type,
            });
        }
        if content.height != content.microblock_hashes.len() as u64 {
            return Err(VbError::Snapshot(ReadError::StructureInvalid(format!(
                "height {} does not match the {} recorded microblock hashes",
                content.height,
                content.microblock_hashes.len()
            ))));
        }
        let state =
            VbState::from_bytes(content.vb_type, &content.state).map_err(VbError::Snapshot)?;
        Ok(VirtualBlockchain {
            vb_type: content.vb_type,
            identifier: Some(*id),
            height: content.height,
            microblock_hashes: content.microblock_hashes,
            expiration_day: content.expiration_day,
            state,
            pending: None,
        })
    }

    pub fn vb_type(&self) -> VbType {
        self.vb_type
    }

    /// Unset until the first microblock is committed, then the hash of
    /// the microblock at height 1
    pub fn identifier(&self) -> Option<&VbId> {
        self.identifier.as_ref()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn expiration_day(&self) -> u32 {
        self.expiration_day
    }

    pub fn microblock_hashes(&self) -> &[MicroblockId] {
        &self.microblock_hashes
    }

    pub fn last_hash(&self) -> Option<&MicroblockId> {
        self.microblock_hashes.last()
    }

    pub fn state(&self) -> &VbState {
        &self.state
    }

    pub fn pending_microblock(&self) -> Option<&Microblock> {
        self.pending.as_ref().map(|p| &p.microblock)
    }

    /// Throw away the in-progress microblock and its working state
    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    fn open_pending(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let microblock = match self.last_hash() {
            None => Microblock::genesis(self.vb_type, self.expiration_day),
            Some(previous) => Microblock::continuation(self.height + 1, *previous),
        };
        self.pending = Some(Pending {
            microblock,
            state: self.state.clone(),
            structure_checked: false,
        });
    }

    /// Append one section to the in-progress microblock, lazily opening
    /// a genesis or continuation, and fold it into the working state
    /// right away. A rejected section is rolled back; the sections
    /// appended before it stay in place.
    pub async fn add_section<P: Provider + ?Sized>(
        &mut self,
        payload: SectionPayload,
        provider: &P,
    ) -> Result<(), VbError> {
        self.open_pending();
        let height = self.height + 1;
        let is_first = self.height == 0;
        let pending = match self.pending.as_mut() {
            Some(p) => p,
            None => return Err(VbError::NoPendingMicroblock),
        };
        pending.structure_checked = false;
        pending.microblock.push_section(payload);
        let index = pending.microblock.sections().len() - 1;
        let microblock = &pending.microblock;
        let section = &microblock.sections()[index];
        let mut ctx = ApplyContext {
            microblock,
            height,
            is_first,
            fees_payer: microblock.fees_payer(),
        };
        match pending.state.apply_section(&mut ctx, section, provider).await {
            Ok(()) => {
                let payer = ctx.fees_payer;
                pending.microblock.set_fees_payer(payer);
                Ok(())
            }
            Err(e) => {
                pending.microblock.pop_section();
                Err(e.into())
            }
        }
    }

    /// Validate the in-progress microblock's section ordering against
    /// this chain kind's grammar. Must pass, after the signature is
    /// appended, before `publish` accepts the microblock.
    pub fn check_pending_structure(&mut self) -> Result<(), VbError> {
        let is_first = self.height == 0;
        let pending = match self.pending.as_mut() {
            Some(p) => p,
            None => return Err(VbError::NoPendingMicroblock),
        };
        let tags = pending.microblock.section_tags();
        pending.state.check_structure(is_first, &tags)?;
        pending.structure_checked = true;
        Ok(())
    }

    /// Sign the in-progress microblock and append the signature section
    /// in one step
    pub async fn append_signature<P: Provider + ?Sized>(
        &mut self,
        scheme: SchemeId,
        secret: &[u8],
        provider: &P,
    ) -> Result<(), VbError> {
        let signature = match self.pending.as_ref() {
            Some(p) => p.microblock.sign(scheme, secret)?,
            None => return Err(VbError::NoPendingMicroblock),
        };
        self.add_section(SectionPayload::Signature(SignatureSeal { signature }), provider)
            .await
    }

    /// Seal the checked, signed in-progress microblock and commit the
    /// working state. At height 1 this fixes the chain identifier.
    pub fn publish(&mut self) -> Result<AppliedMicroblock, VbError> {
        {
            let pending = match self.pending.as_ref() {
                Some(p) => p,
                None => return Err(VbError::NoPendingMicroblock),
            };
            if !pending.structure_checked {
                return Err(VbError::StructureNotChecked);
            }
            if pending.microblock.section_tags().last() != Some(&SectionTag::Signature) {
                return Err(VbError::NotSigned);
            }
        }
        let mut pending = match self.pending.take() {
            Some(p) => p,
            None => return Err(VbError::NoPendingMicroblock),
        };
        let sealed = pending.microblock.seal();
        self.state = pending.state;
        self.height += 1;
        self.microblock_hashes.push(sealed.hash);
        if self.height == 1 {
            self.identifier = Some(sealed.hash);
        }
        debug!(
            height = self.height,
            hash = %sealed.hash,
            "microblock published"
        );
        Ok(AppliedMicroblock {
            hash: sealed.hash,
            header: sealed.header,
            body: sealed.body,
            fees_payer: pending.microblock.fees_payer(),
            gas: pending.microblock.header().gas,
        })
    }

    /// Replay one received microblock into the chain: structural
    /// validation strictly before any handler runs, handlers folded
    /// into a working copy, the chain state committed only when every
    /// section is accepted. A rejected microblock leaves the state
    /// observably untouched.
    pub async fn import_microblock<P: Provider + ?Sized>(
        &mut self,
        header_bytes: &[u8],
        body_bytes: &[u8],
        provider: &P,
    ) -> Result<AppliedMicroblock, VbError> {
        let microblock = Microblock::load(header_bytes, body_bytes)?;
        let header = microblock.header().clone();
        if header.height != self.height + 1 {
            return Err(VbError::UnexpectedHeight {
                expected: self.height + 1,
                got: header.height,
            });
        }
        let is_first = header.is_genesis();
        self.state
            .check_structure(is_first, &microblock.section_tags())?;

        let mut state = self.state.clone();
        let mut fees_payer = None;
        for section in microblock.sections() {
            let mut ctx = ApplyContext {
                microblock: &microblock,
                height: header.height,
                is_first,
                fees_payer,
            };
            state.apply_section(&mut ctx, section, provider).await?;
            fees_payer = ctx.fees_payer;
        }

        let hash = header.id();
        self.state = state;
        self.height = header.height;
        self.microblock_hashes.push(hash);
        if is_first {
            self.identifier = Some(hash);
        }
        debug!(
            vb_type = %self.vb_type,
            height = self.height,
            hash = %hash,
            "microblock imported"
        );
        Ok(AppliedMicroblock {
            hash,
            header: header_bytes.to_vec(),
            body: body_bytes.to_vec(),
            fees_payer,
            gas: microblock.compute_gas(0),
        })
    }

    /// Persistable snapshot of the chain, available once at least one
    /// microblock is committed
    pub fn snapshot(&self) -> Option<StateSnapshot> {
        let vb_id = self.identifier?;
        let last_hash = *self.microblock_hashes.last()?;
        Some(StateSnapshot {
            vb_id,
            vb_type: self.vb_type,
            expiration_day: self.expiration_day,
            height: self.height,
            last_hash,
            state: self.state.to_bytes(),
        })
    }
}
