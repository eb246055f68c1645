//! Test support: an in-memory provider and key helpers used by unit
//! and scenario tests.

use crate::key::{AccountId, MicroblockId, VbId};
use crate::microblock::MicroblockHeader;
use crate::provider::{
    MicroblockBody, MicroblockInformation, MicroblockRecord, Provider, ProviderError,
    StateSnapshot, VirtualBlockchainContent,
};
use vb_core::mempack::read_from_raw;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use vb_crypto::{Ed25519, KeyPair};

/// Deterministic signing keypair for tests, as raw byte material
pub fn ed25519_keypair(seed: u64) -> (Vec<u8>, Vec<u8>) {
    let pair = KeyPair::<Ed25519>::generate(StdRng::seed_from_u64(seed));
    (
        pair.private_key().leak_secret().to_vec(),
        pair.public_key().as_ref().to_vec(),
    )
}

struct StoredMicroblock {
    info: MicroblockInformation,
    body: Vec<u8>,
}

#[derive(Default)]
struct Store {
    chains: HashMap<VbId, VirtualBlockchainContent>,
    microblocks: HashMap<MicroblockId, StoredMicroblock>,
    accounts: HashMap<Vec<u8>, AccountId>,
}

/// HashMap-backed provider holding everything in process memory
#[derive(Default)]
pub struct MemoryProvider {
    inner: Mutex<Store>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed the public-key to account index, the way the surrounding
    /// system would after an account chain is created
    pub fn register_account(&self, public_key: Vec<u8>, account: AccountId) {
        self.store().accounts.insert(public_key, account);
    }

    pub fn microblock_count(&self) -> usize {
        self.store().microblocks.len()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn get_virtual_blockchain_content(
        &self,
        id: &VbId,
    ) -> Result<VirtualBlockchainContent, ProviderError> {
        self.store()
            .chains
            .get(id)
            .cloned()
            .ok_or(ProviderError::VirtualBlockchainNotFound(*id))
    }

    async fn get_microblock_information(
        &self,
        hash: &MicroblockId,
    ) -> Result<MicroblockInformation, ProviderError> {
        self.store()
            .microblocks
            .get(hash)
            .map(|m| m.info.clone())
            .ok_or(ProviderError::MicroblockNotFound(*hash))
    }

    async fn get_microblock_bodies(
        &self,
        hashes: &[MicroblockId],
    ) -> Result<Vec<MicroblockBody>, ProviderError> {
        let store = self.store();
        hashes
            .iter()
            .map(|hash| {
                store
                    .microblocks
                    .get(hash)
                    .map(|m| MicroblockBody {
                        hash: *hash,
                        body: m.body.clone(),
                    })
                    .ok_or(ProviderError::MicroblockNotFound(*hash))
            })
            .collect()
    }

    async fn store_microblock(&self, record: MicroblockRecord) -> Result<(), ProviderError> {
        let header = read_from_raw::<MicroblockHeader>(&record.header)
            .map_err(|e| ProviderError::Backend(e.to_string()))?;
        self.store().microblocks.insert(
            record.hash,
            StoredMicroblock {
                info: MicroblockInformation {
                    header,
                    vb_type: record.vb_type,
                    vb_id: record.vb_id,
                },
                body: record.body,
            },
        );
        Ok(())
    }

    async fn update_virtual_blockchain_state(
        &self,
        snapshot: StateSnapshot,
    ) -> Result<(), ProviderError> {
        let mut store = self.store();
        let content = store
            .chains
            .entry(snapshot.vb_id)
            .or_insert_with(|| VirtualBlockchainContent {
                vb_type: snapshot.vb_type,
                expiration_day: snapshot.expiration_day,
                height: 0,
                microblock_hashes: Vec::new(),
                state: Vec::new(),
            });
        content.vb_type = snapshot.vb_type;
        content.expiration_day = snapshot.expiration_day;
        content.height = snapshot.height;
        content.state = snapshot.state;
        if content.microblock_hashes.last() != Some(&snapshot.last_hash) {
            content.microblock_hashes.push(snapshot.last_hash);
        }
        Ok(())
    }

    async fn get_account_by_public_key(
        &self,
        public_key: &[u8],
    ) -> Result<AccountId, ProviderError> {
        self.store()
            .accounts
            .get(public_key)
            .copied()
            .ok_or_else(|| ProviderError::AccountNotFound(hex::encode(public_key)))
    }
}
