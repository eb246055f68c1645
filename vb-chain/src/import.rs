//! Multi-stage validation of raw microblock bytes received from a peer.
//!
//! The stages run strictly in order and each one short-circuits:
//! header sanity, timestamp window, body hash, chain resolution,
//! structure and handlers, gas. Failures split into three families the caller reacts
//! to differently: unrecoverable (discard the bytes), timestamp
//! (retry later or fix the clock) and previous-hash (retry once the
//! missing microblock arrives).

use crate::config::{
    MAX_FUTURE_DELAY_SECS, MAX_PAST_DELAY_SECS, MICROBLOCK_MAGIC, PROTOCOL_VERSION,
};
use crate::key::{Hash, MicroblockId};
use crate::microblock::{
    self, GenesisMarker, GenesisMarkerError, MicroblockError, MicroblockHeader,
};
use crate::provider::{MicroblockRecord, Provider, ProviderError};
use crate::vb::{VbError, VirtualBlockchain};
use vb_core::mempack::{read_from_raw, ReadError};

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that make the microblock permanently invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnrecoverableError {
    #[error("header bytes malformed: {0}")]
    Header(ReadError),
    #[error("bad magic {0:?}")]
    BadMagic([u8; 4]),
    #[error("unsupported protocol version {0}")]
    BadProtocolVersion(u32),
    #[error("malformed genesis marker: {0}")]
    GenesisMarker(#[from] GenesisMarkerError),
    #[error("height {got} does not continue previous height {previous}")]
    HeightDiscontinuity { previous: u64, got: u64 },
    #[error("declared gas {declared} does not match computed gas {computed}")]
    GasMismatch { declared: u64, computed: u64 },
    #[error("chain has no committed microblock to persist")]
    NothingToPersist,
    #[error(transparent)]
    Chain(#[from] VbError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error(transparent)]
    Unrecoverable(#[from] UnrecoverableError),
    #[error("timestamp {timestamp} outside the acceptance window around {now}")]
    Timestamp { timestamp: u64, now: u64 },
    #[error("previous microblock {0} not found")]
    PreviousHash(MicroblockId),
}

/// Caller-facing classification of an import failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    UnrecoverableError,
    TimestampError,
    PreviousHashError,
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImportStatus::UnrecoverableError => write!(f, "UNRECOVERABLE_ERROR"),
            ImportStatus::TimestampError => write!(f, "TIMESTAMP_ERROR"),
            ImportStatus::PreviousHashError => write!(f, "PREVIOUS_HASH_ERROR"),
        }
    }
}

impl ImportError {
    pub fn status(&self) -> ImportStatus {
        match self {
            ImportError::Unrecoverable(_) => ImportStatus::UnrecoverableError,
            ImportError::Timestamp { .. } => ImportStatus::TimestampError,
            ImportError::PreviousHash(_) => ImportStatus::PreviousHashError,
        }
    }

    /// A retryable microblock may become valid later: once the clock
    /// catches up, or once the missing previous microblock arrives
    pub fn is_retryable(&self) -> bool {
        match self.status() {
            ImportStatus::UnrecoverableError => false,
            ImportStatus::TimestampError | ImportStatus::PreviousHashError => true,
        }
    }
}

/// A fully validated microblock and the chain it advances, ready to be
/// persisted with [`MicroblockImporter::store`]
#[derive(Debug, Clone)]
pub struct ImportedMicroblock {
    pub vb: VirtualBlockchain,
    pub hash: MicroblockId,
    pub fees_payer: Option<crate::key::AccountId>,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

pub struct MicroblockImporter<'a, P: ?Sized> {
    provider: &'a P,
    reference_time: Option<u64>,
}

impl<'a, P: Provider + ?Sized> MicroblockImporter<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        MicroblockImporter {
            provider,
            reference_time: None,
        }
    }

    /// Pin the clock the timestamp window is checked against
    pub fn with_reference_time(mut self, now: u64) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> u64 {
        self.reference_time.unwrap_or_else(microblock::unix_now)
    }

    /// Run the whole validation pipeline over raw header and body bytes
    pub async fn import(
        &self,
        header_bytes: &[u8],
        body_bytes: &[u8],
    ) -> Result<ImportedMicroblock, ImportError> {
        let header = self.check_header(header_bytes)?;
        self.check_timestamp(&header)?;
        self.check_body_hash(&header, body_bytes)?;
        let mut vb = self.resolve_chain(&header).await?;
        let applied = vb
            .import_microblock(header_bytes, body_bytes, self.provider)
            .await
            .map_err(|e| {
                warn!(height = header.height, error = %e, "microblock rejected");
                ImportError::Unrecoverable(UnrecoverableError::Chain(e))
            })?;
        if header.gas != applied.gas {
            return Err(UnrecoverableError::GasMismatch {
                declared: header.gas,
                computed: applied.gas,
            }
            .into());
        }
        debug!(
            hash = %applied.hash,
            height = header.height,
            gas = applied.gas,
            "microblock validated"
        );
        Ok(ImportedMicroblock {
            vb,
            hash: applied.hash,
            fees_payer: applied.fees_payer,
            header: header_bytes.to_vec(),
            body: body_bytes.to_vec(),
        })
    }

    fn check_header(&self, header_bytes: &[u8]) -> Result<MicroblockHeader, ImportError> {
        let header = read_from_raw::<MicroblockHeader>(header_bytes)
            .map_err(UnrecoverableError::Header)?;
        if header.magic != MICROBLOCK_MAGIC {
            return Err(UnrecoverableError::BadMagic(header.magic).into());
        }
        if header.protocol_version != PROTOCOL_VERSION {
            return Err(UnrecoverableError::BadProtocolVersion(header.protocol_version).into());
        }
        Ok(header)
    }

    fn check_timestamp(&self, header: &MicroblockHeader) -> Result<(), ImportError> {
        let now = self.now();
        let lower = now.saturating_sub(MAX_PAST_DELAY_SECS);
        let upper = now.saturating_add(MAX_FUTURE_DELAY_SECS);
        if header.timestamp < lower || header.timestamp > upper {
            return Err(ImportError::Timestamp {
                timestamp: header.timestamp,
                now,
            });
        }
        Ok(())
    }

    /// A body not matching the declared hash can never become valid,
    /// so this runs before any previous-microblock lookup
    fn check_body_hash(
        &self,
        header: &MicroblockHeader,
        body_bytes: &[u8],
    ) -> Result<(), ImportError> {
        let actual = Hash::hash_bytes(body_bytes);
        if actual != header.body_hash {
            let e = MicroblockError::BodyHashMismatch {
                declared: header.body_hash,
                actual,
            };
            return Err(UnrecoverableError::Chain(e.into()).into());
        }
        Ok(())
    }

    /// Resolve which chain the microblock extends: the genesis marker
    /// for height 1, the previous microblock's record otherwise
    async fn resolve_chain(
        &self,
        header: &MicroblockHeader,
    ) -> Result<VirtualBlockchain, ImportError> {
        if header.is_genesis() {
            let marker = GenesisMarker::decode(&header.previous_hash)
                .map_err(UnrecoverableError::GenesisMarker)?;
            return Ok(VirtualBlockchain::new(marker.vb_type, marker.expiration_day));
        }
        let info = self
            .provider
            .get_microblock_information(&header.previous_hash)
            .await
            .map_err(|e| match e {
                ProviderError::MicroblockNotFound(hash) => ImportError::PreviousHash(hash),
                other => ImportError::Unrecoverable(UnrecoverableError::Provider(other)),
            })?;
        if header.height != info.header.height + 1 {
            return Err(UnrecoverableError::HeightDiscontinuity {
                previous: info.header.height,
                got: header.height,
            }
            .into());
        }
        VirtualBlockchain::load(self.provider, &info.vb_id, info.vb_type)
            .await
            .map_err(|e| ImportError::Unrecoverable(UnrecoverableError::Chain(e)))
    }

    /// Persist a validated microblock and the advanced chain snapshot
    pub async fn store(&self, imported: &ImportedMicroblock) -> Result<(), ImportError> {
        let snapshot = match imported.vb.snapshot() {
            Some(s) => s,
            None => return Err(UnrecoverableError::NothingToPersist.into()),
        };
        self.provider
            .store_microblock(MicroblockRecord {
                hash: imported.hash,
                vb_id: snapshot.vb_id,
                vb_type: snapshot.vb_type,
                height: snapshot.height,
                header: imported.header.clone(),
                body: imported.body.clone(),
            })
            .await
            .map_err(UnrecoverableError::Provider)?;
        self.provider
            .update_virtual_blockchain_state(snapshot)
            .await
            .map_err(UnrecoverableError::Provider)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Hash;
    use crate::testing::MemoryProvider;

    fn header(timestamp: u64) -> MicroblockHeader {
        MicroblockHeader {
            magic: MICROBLOCK_MAGIC,
            protocol_version: PROTOCOL_VERSION,
            height: 1,
            previous_hash: Hash::zero(),
            timestamp,
            gas: 0,
            gas_price: 0,
            body_hash: Hash::zero(),
        }
    }

    #[test]
    fn status_classification() {
        let unrecoverable = ImportError::Unrecoverable(UnrecoverableError::BadMagic(*b"XXXX"));
        assert_eq!(unrecoverable.status(), ImportStatus::UnrecoverableError);
        assert!(!unrecoverable.is_retryable());

        let timestamp = ImportError::Timestamp {
            timestamp: 0,
            now: 1_000,
        };
        assert_eq!(timestamp.status(), ImportStatus::TimestampError);
        assert!(timestamp.is_retryable());

        let linkage = ImportError::PreviousHash(Hash::zero());
        assert_eq!(linkage.status(), ImportStatus::PreviousHashError);
        assert!(linkage.is_retryable());
        assert_eq!(linkage.status().to_string(), "PREVIOUS_HASH_ERROR");
    }

    #[test]
    fn bad_magic_rejected() {
        let provider = MemoryProvider::new();
        let importer = MicroblockImporter::new(&provider);
        let mut h = header(0);
        h.magic = *b"XXXX";
        assert_eq!(
            importer.check_header(&h.to_bytes()),
            Err(ImportError::Unrecoverable(UnrecoverableError::BadMagic(
                *b"XXXX"
            )))
        );
    }

    #[test]
    fn bad_protocol_version_rejected() {
        let provider = MemoryProvider::new();
        let importer = MicroblockImporter::new(&provider);
        let mut h = header(0);
        h.protocol_version = 99;
        assert_eq!(
            importer.check_header(&h.to_bytes()),
            Err(ImportError::Unrecoverable(
                UnrecoverableError::BadProtocolVersion(99)
            ))
        );
    }

    #[tokio::test]
    async fn corrupt_body_rejected_before_previous_lookup() {
        let provider = MemoryProvider::new();
        let importer = MicroblockImporter::new(&provider).with_reference_time(10_000);
        let mut h = header(10_000);
        h.height = 2;
        h.previous_hash = Hash::hash_bytes(b"unknown parent");
        h.body_hash = Hash::hash_bytes(b"the body that was sealed");
        // the parent is unknown too, but a corrupt body is permanent
        // and must win over the retryable previous-hash classification
        let err = importer
            .import(&h.to_bytes(), b"a different body")
            .await
            .unwrap_err();
        assert_eq!(err.status(), ImportStatus::UnrecoverableError);
    }

    #[test]
    fn timestamp_window_bounds() {
        let provider = MemoryProvider::new();
        let importer = MicroblockImporter::new(&provider).with_reference_time(10_000);
        assert!(importer.check_timestamp(&header(10_000)).is_ok());
        assert!(importer
            .check_timestamp(&header(10_000 - MAX_PAST_DELAY_SECS))
            .is_ok());
        assert!(importer
            .check_timestamp(&header(10_000 + MAX_FUTURE_DELAY_SECS))
            .is_ok());
        assert!(importer
            .check_timestamp(&header(10_000 - MAX_PAST_DELAY_SECS - 1))
            .is_err());
        assert!(importer
            .check_timestamp(&header(10_000 + MAX_FUTURE_DELAY_SECS + 1))
            .is_err());
    }
}
