//! Storage and lookup collaborator of the engine.
//!
//! Everything durable lives behind this trait: persisted microblocks,
//! virtual blockchain state snapshots and the public-key to account
//! index. The engine only ever awaits one call at a time, so
//! implementations need no internal ordering guarantees beyond their
//! own consistency.

use crate::key::{AccountId, MicroblockId, VbId};
use crate::microblock::MicroblockHeader;
use crate::vbtype::VbType;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("virtual blockchain {0} not found")]
    VirtualBlockchainNotFound(VbId),
    #[error("microblock {0} not found")]
    MicroblockNotFound(MicroblockId),
    #[error("no account declared for public key {0}")]
    AccountNotFound(String),
    #[error("provider backend failure: {0}")]
    Backend(String),
}

/// Persisted view of one virtual blockchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualBlockchainContent {
    pub vb_type: VbType,
    pub expiration_day: u32,
    pub height: u64,
    pub microblock_hashes: Vec<MicroblockId>,
    /// Canonical serialization of the type-specific state
    pub state: Vec<u8>,
}

/// Chain-linkage view of one persisted microblock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroblockInformation {
    pub header: MicroblockHeader,
    pub vb_type: VbType,
    pub vb_id: VbId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroblockBody {
    pub hash: MicroblockId,
    pub body: Vec<u8>,
}

/// Everything needed to persist one accepted microblock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroblockRecord {
    pub hash: MicroblockId,
    pub vb_id: VbId,
    pub vb_type: VbType,
    pub height: u64,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

/// Updated snapshot of a virtual blockchain after an accepted microblock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub vb_id: VbId,
    pub vb_type: VbType,
    pub expiration_day: u32,
    pub height: u64,
    pub last_hash: MicroblockId,
    pub state: Vec<u8>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn get_virtual_blockchain_content(
        &self,
        id: &VbId,
    ) -> Result<VirtualBlockchainContent, ProviderError>;

    async fn get_microblock_information(
        &self,
        hash: &MicroblockId,
    ) -> Result<MicroblockInformation, ProviderError>;

    async fn get_microblock_bodies(
        &self,
        hashes: &[MicroblockId],
    ) -> Result<Vec<MicroblockBody>, ProviderError>;

    async fn store_microblock(&self, record: MicroblockRecord) -> Result<(), ProviderError>;

    async fn update_virtual_blockchain_state(
        &self,
        snapshot: StateSnapshot,
    ) -> Result<(), ProviderError>;

    /// Account fee-payer resolution, used by signature handlers
    async fn get_account_by_public_key(
        &self,
        public_key: &[u8],
    ) -> Result<AccountId, ProviderError>;
}
