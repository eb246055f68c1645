mod header;

pub use header::{
    GenesisMarker, GenesisMarkerError, MicroblockHeader, HEADER_AUTH_SIZE, HEADER_SIZE,
};

use crate::config::{DEFAULT_GAS_PRICE, MICROBLOCK_MAGIC, PROTOCOL_VERSION};
use crate::gas::{GasAlgorithm, LinearGas};
use crate::key::{AccountId, Hash, MicroblockId};
use crate::section::{self, Section, SectionPayload, SectionTag};
use crate::vbtype::VbType;
use vb_core::mempack::{read_from_raw, ReadError};
use vb_crypto::{scheme, SchemeError, SchemeId, Verification};

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicroblockError {
    #[error("header bytes malformed: {0}")]
    HeaderInvalid(ReadError),
    #[error("body bytes malformed: {0}")]
    BodyInvalid(ReadError),
    #[error("body hash mismatch: header declares {declared} but body hashes to {actual}")]
    BodyHashMismatch { declared: Hash, actual: Hash },
}

/// The serialized form of a finalized microblock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMicroblock {
    pub hash: MicroblockId,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

/// One record of a virtual blockchain: a header plus an ordered list
/// of sections. Built up section by section on the writer path, or
/// reconstructed from wire bytes on the importer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microblock {
    header: MicroblockHeader,
    sections: Vec<Section>,
    fees_payer: Option<AccountId>,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Microblock {
    fn empty(header: MicroblockHeader) -> Self {
        Microblock {
            header,
            sections: Vec::new(),
            fees_payer: None,
        }
    }

    /// First microblock of a new chain: `previous_hash` carries the
    /// genesis marker instead of a hash
    pub fn genesis(vb_type: VbType, expiration_day: u32) -> Self {
        let marker = GenesisMarker::generate(vb_type, expiration_day, rand::rngs::OsRng);
        Self::genesis_with_marker(marker, unix_now())
    }

    pub fn genesis_with_marker(marker: GenesisMarker, timestamp: u64) -> Self {
        Self::empty(MicroblockHeader {
            magic: MICROBLOCK_MAGIC,
            protocol_version: PROTOCOL_VERSION,
            height: 1,
            previous_hash: marker.encode(),
            timestamp,
            gas: 0,
            gas_price: DEFAULT_GAS_PRICE,
            body_hash: Hash::zero(),
        })
    }

    /// Microblock extending an existing chain at `height > 1`
    pub fn continuation(height: u64, previous_hash: MicroblockId) -> Self {
        Self::empty(MicroblockHeader {
            magic: MICROBLOCK_MAGIC,
            protocol_version: PROTOCOL_VERSION,
            height,
            previous_hash,
            timestamp: unix_now(),
            gas: 0,
            gas_price: DEFAULT_GAS_PRICE,
            body_hash: Hash::zero(),
        })
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    pub fn header(&self) -> &MicroblockHeader {
        &self.header
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_tags(&self) -> Vec<SectionTag> {
        self.sections.iter().map(|s| s.tag()).collect()
    }

    pub fn fees_payer(&self) -> Option<AccountId> {
        self.fees_payer
    }

    pub(crate) fn set_fees_payer(&mut self, payer: Option<AccountId>) {
        self.fees_payer = payer;
    }

    /// Append a section, in order; returns it for handler dispatch
    pub fn push_section(&mut self, payload: SectionPayload) -> &Section {
        let index = self.sections.len() as u32;
        self.sections.push(Section::create(payload, index));
        &self.sections[index as usize]
    }

    /// Drop the most recently appended section, used to roll back an
    /// append whose handler rejected it
    pub(crate) fn pop_section(&mut self) {
        self.sections.pop();
    }

    /// Total serialized payload length of every section
    pub fn body_size(&self) -> u64 {
        self.sections.iter().map(|s| s.data().len() as u64).sum()
    }

    /// Deterministic gas of this microblock, assuming `extra_bytes`
    /// more payload bytes will still be appended
    pub fn compute_gas(&self, extra_bytes: u64) -> u64 {
        LinearGas::chain_default().gas_for(self.body_size().saturating_add(extra_bytes))
    }

    /// The exact byte sequence a signature over this microblock covers:
    /// the header prefix before `body_hash` (with the gas fields either
    /// computed or zeroed) followed by the hash of the first
    /// `section_count` sections.
    ///
    /// `extra_bytes` reserves gas for a signature section that is not
    /// appended yet, so that the gas signed over equals the gas of the
    /// sealed microblock.
    pub fn signing_scope(
        &self,
        include_gas: bool,
        section_count: usize,
        extra_bytes: u64,
    ) -> Vec<u8> {
        let mut header = self.header.clone();
        if include_gas {
            header.gas = self.compute_gas(extra_bytes);
        } else {
            header.gas = 0;
            header.gas_price = 0;
        }
        let header_bytes = header.to_bytes();
        let mut scope = header_bytes[..HEADER_AUTH_SIZE].to_vec();
        for section in self.sections.iter().take(section_count) {
            scope.extend_from_slice(section.hash().as_bytes());
        }
        scope
    }

    /// Sign the current state of the microblock, reserving gas space
    /// for the signature section about to be appended
    pub fn sign(&self, scheme: SchemeId, secret: &[u8]) -> Result<Vec<u8>, SchemeError> {
        let reserve = scheme::signature_size(scheme)? as u64;
        let scope = self.signing_scope(true, self.sections.len(), reserve);
        scheme::sign_with(scheme, secret, &scope)
    }

    /// Recompute the signing scope as it was at signing time and verify
    pub fn verify_signature(
        &self,
        scheme: SchemeId,
        public: &[u8],
        signature: &[u8],
        include_gas: bool,
        section_count: usize,
    ) -> Result<Verification, SchemeError> {
        let scope = self.signing_scope(include_gas, section_count, 0);
        scheme::verify_with(scheme, public, &scope, signature)
    }

    /// Finalize: write the body hash and the definitive gas into the
    /// header and produce the wire bytes plus the microblock hash
    pub fn seal(&mut self) -> SealedMicroblock {
        let body = section::serialize_body(&self.sections);
        self.header.body_hash = Hash::hash_bytes(&body);
        self.header.gas = self.compute_gas(0);
        let header = self.header.to_bytes();
        SealedMicroblock {
            hash: Hash::hash_bytes(&header),
            header,
            body,
        }
    }

    /// Inverse of `seal`: rebuild a microblock from wire bytes. The
    /// body must hash to the declared body hash before any section is
    /// deserialized.
    pub fn load(header_bytes: &[u8], body_bytes: &[u8]) -> Result<Self, MicroblockError> {
        let header = read_from_raw::<MicroblockHeader>(header_bytes)
            .map_err(MicroblockError::HeaderInvalid)?;
        let actual = Hash::hash_bytes(body_bytes);
        if actual != header.body_hash {
            return Err(MicroblockError::BodyHashMismatch {
                declared: header.body_hash,
                actual,
            });
        }
        let sections = section::read_body(body_bytes).map_err(MicroblockError::BodyInvalid)?;
        Ok(Microblock {
            header,
            sections,
            fees_payer: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{PublicKeyDeclaration, SignatureScheme, SignatureSeal, TokenIssuance};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use vb_crypto::{Ed25519, KeyPair};

    fn keypair(seed: u64) -> (Vec<u8>, Vec<u8>) {
        let pair = KeyPair::<Ed25519>::generate(StdRng::seed_from_u64(seed));
        (
            pair.private_key().leak_secret().to_vec(),
            pair.public_key().as_ref().to_vec(),
        )
    }

    fn signed_genesis(seed: u64) -> (Microblock, Vec<u8>) {
        let (sk, pk) = keypair(seed);
        let mut mb = Microblock::genesis(VbType::Account, 20_000);
        mb.push_section(SectionPayload::SignatureScheme(SignatureScheme {
            scheme: SchemeId::Ed25519,
        }));
        mb.push_section(SectionPayload::PublicKey(PublicKeyDeclaration {
            key: pk.clone(),
        }));
        mb.push_section(SectionPayload::TokenIssuance(TokenIssuance {
            amount: crate::config::TOKEN_INITIAL_OFFER,
        }));
        let signature = mb.sign(SchemeId::Ed25519, &sk).unwrap();
        mb.push_section(SectionPayload::Signature(SignatureSeal {
            signature: signature.clone(),
        }));
        (mb, pk)
    }

    #[test]
    fn serialization_roundtrip() {
        let (mut mb, _) = signed_genesis(1);
        let sealed = mb.seal();
        let got = Microblock::load(&sealed.header, &sealed.body).unwrap();
        assert_eq!(got.header(), mb.header());
        assert_eq!(got.sections(), mb.sections());
    }

    #[test]
    fn load_rejects_tampered_body() {
        let (mut mb, _) = signed_genesis(2);
        let sealed = mb.seal();
        let mut body = sealed.body.clone();
        let last = body.len() - 1;
        body[last] ^= 0x01;
        match Microblock::load(&sealed.header, &body) {
            Err(MicroblockError::BodyHashMismatch { .. }) => {}
            other => panic!("expected body hash mismatch, got {:?}", other),
        }
    }

    #[test]
    fn sealed_gas_matches_recomputation() {
        let (mut mb, _) = signed_genesis(3);
        let sealed = mb.seal();
        let loaded = Microblock::load(&sealed.header, &sealed.body).unwrap();
        assert_eq!(loaded.header().gas, loaded.compute_gas(0));
    }

    #[test]
    fn two_step_gas_contract() {
        // gas computed while reserving space for the signature must
        // equal the gas of the sealed microblock with the signature
        // actually in place
        let (sk, pk) = keypair(4);
        let mut mb = Microblock::genesis(VbType::Account, 20_000);
        mb.push_section(SectionPayload::SignatureScheme(SignatureScheme {
            scheme: SchemeId::Ed25519,
        }));
        mb.push_section(SectionPayload::PublicKey(PublicKeyDeclaration { key: pk }));
        let reserve = vb_crypto::scheme::signature_size(SchemeId::Ed25519).unwrap() as u64;
        let reserved_gas = mb.compute_gas(reserve);
        let signature = mb.sign(SchemeId::Ed25519, &sk).unwrap();
        mb.push_section(SectionPayload::Signature(SignatureSeal { signature }));
        assert_eq!(mb.compute_gas(0), reserved_gas);
        assert_eq!(mb.seal().hash, mb.header().id());
    }

    #[test]
    fn signature_covers_every_section_bit() {
        let (mut mb, pk) = signed_genesis(5);
        let signature = match mb.sections().last().map(|s| s.payload().clone()) {
            Some(SectionPayload::Signature(SignatureSeal { signature })) => signature,
            other => panic!("expected a signature section, got {:?}", other),
        };
        let count = mb.sections().len() - 1;
        assert_eq!(
            mb.verify_signature(SchemeId::Ed25519, &pk, &signature, true, count)
                .unwrap(),
            Verification::Success
        );

        // flipping one bit of one covered section must break it
        let sealed = mb.seal();
        let mut body = sealed.body.clone();
        // locate the token issuance amount inside the body and flip it
        let pos = body.len() - signature.len() - 4;
        body[pos] ^= 0x80;
        let tampered = match Microblock::load(&sealed.header, &body) {
            // the body hash no longer matches, which is already a reject;
            // rebuild the tampered sections directly to test the scope
            Err(_) => {
                let mut mb2 = mb.clone();
                mb2.sections = section::read_body(&body)
                    .unwrap_or_else(|_| mb.sections.clone());
                mb2
            }
            Ok(loaded) => loaded,
        };
        if tampered.sections() != mb.sections() {
            assert_eq!(
                tampered
                    .verify_signature(SchemeId::Ed25519, &pk, &signature, true, count)
                    .unwrap(),
                Verification::Failed
            );
        }
    }

    #[test]
    fn signing_scope_is_deterministic() {
        let (mb, _) = signed_genesis(6);
        assert_eq!(
            mb.signing_scope(true, mb.sections().len(), 0),
            mb.signing_scope(true, mb.sections().len(), 0)
        );
        assert_ne!(
            mb.signing_scope(true, mb.sections().len(), 0),
            mb.signing_scope(false, mb.sections().len(), 0)
        );
    }
}
