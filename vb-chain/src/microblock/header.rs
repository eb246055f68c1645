use crate::key::{Hash, MicroblockId};
use crate::vbtype::VbType;
use vb_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use vb_core::property;
use vb_crypto::DIGEST_SIZE;

use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Serialized size of a header
pub const HEADER_SIZE: usize = 104;

/// Size of the header prefix covered by the signing scope: everything
/// before `body_hash`, which is not yet known when signing
pub const HEADER_AUTH_SIZE: usize = 72;

const SEED_SIZE: usize = 24;

/// Chain-linkage and accounting fields of one microblock.
///
/// The serialized layout is fixed: magic, protocol version, height,
/// previous hash, timestamp, gas, gas price, body hash. The microblock
/// identifier is the hash of these serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroblockHeader {
    pub magic: [u8; 4],
    pub protocol_version: u32,
    pub height: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub gas: u64,
    pub gas_price: u64,
    pub body_hash: Hash,
}

impl MicroblockHeader {
    pub fn serialize_in(&self, buf: &mut WriteBuf) {
        buf.put_bytes(&self.magic);
        buf.put_u32(self.protocol_version);
        buf.put_u64(self.height);
        self.previous_hash.serialize_in(buf);
        buf.put_u64(self.timestamp);
        buf.put_u64(self.gas);
        buf.put_u64(self.gas_price);
        self.body_hash.serialize_in(buf);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = WriteBuf::new();
        self.serialize_in(&mut buf);
        buf.into_inner()
    }

    /// Identifier of the microblock: the hash of the serialized header
    pub fn id(&self) -> MicroblockId {
        Hash::hash_bytes(&self.to_bytes())
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 1
    }
}

impl Readable for MicroblockHeader {
    fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(MicroblockHeader {
            magic: <[u8; 4]>::read(buf)?,
            protocol_version: buf.get_u32()?,
            height: buf.get_u64()?,
            previous_hash: Hash::read(buf)?,
            timestamp: buf.get_u64()?,
            gas: buf.get_u64()?,
            gas_price: buf.get_u64()?,
            body_hash: Hash::read(buf)?,
        })
    }
}

impl property::Serialize for MicroblockHeader {
    type Error = std::io::Error;

    fn serialize<W: std::io::Write>(&self, mut writer: W) -> Result<(), Self::Error> {
        writer.write_all(&self.to_bytes())
    }
}

impl property::Deserialize for MicroblockHeader {
    type Error = std::io::Error;

    fn deserialize<R: std::io::BufRead>(mut reader: R) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        vb_core::mempack::read_from_raw(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenesisMarkerError {
    #[error("unknown virtual blockchain type tag {0} in genesis marker")]
    UnknownVbType(u8),
    #[error("genesis marker padding bytes are not zero")]
    NonZeroPadding,
}

/// Genesis-marker convention: the `previous_hash` of a height-1 header
/// is not a hash but this triple packed into the same 32 bytes.
///
/// Layout: byte 0 = vb type tag, bytes 1..5 = expiration day
/// (big-endian), bytes 5..8 = zero, bytes 8..32 = random seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisMarker {
    pub vb_type: VbType,
    pub expiration_day: u32,
    pub seed: [u8; SEED_SIZE],
}

impl GenesisMarker {
    pub fn generate<R: RngCore + CryptoRng>(
        vb_type: VbType,
        expiration_day: u32,
        mut rng: R,
    ) -> Self {
        let mut seed = [0u8; SEED_SIZE];
        rng.fill_bytes(&mut seed);
        GenesisMarker {
            vb_type,
            expiration_day,
            seed,
        }
    }

    pub fn encode(&self) -> Hash {
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes[0] = self.vb_type as u8;
        bytes[1..5].copy_from_slice(&self.expiration_day.to_be_bytes());
        bytes[8..32].copy_from_slice(&self.seed);
        Hash::from_bytes(bytes)
    }

    pub fn decode(hash: &Hash) -> Result<Self, GenesisMarkerError> {
        let bytes = hash.as_bytes();
        let vb_type =
            VbType::from_u8(bytes[0]).ok_or(GenesisMarkerError::UnknownVbType(bytes[0]))?;
        if bytes[5..8] != [0u8; 3] {
            return Err(GenesisMarkerError::NonZeroPadding);
        }
        let mut day = [0u8; 4];
        day.copy_from_slice(&bytes[1..5]);
        let mut seed = [0u8; SEED_SIZE];
        seed.copy_from_slice(&bytes[8..32]);
        Ok(GenesisMarker {
            vb_type,
            expiration_day: u32::from_be_bytes(day),
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    impl Arbitrary for MicroblockHeader {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            MicroblockHeader {
                magic: [
                    u8::arbitrary(g),
                    u8::arbitrary(g),
                    u8::arbitrary(g),
                    u8::arbitrary(g),
                ],
                protocol_version: u32::arbitrary(g),
                height: u64::arbitrary(g),
                previous_hash: Hash::hash_bytes(&Vec::<u8>::arbitrary(g)),
                timestamp: u64::arbitrary(g),
                gas: u64::arbitrary(g),
                gas_price: u64::arbitrary(g),
                body_hash: Hash::hash_bytes(&Vec::<u8>::arbitrary(g)),
            }
        }
    }

    quickcheck! {
        fn header_serialization_bijection(header: MicroblockHeader) -> bool {
            vb_core::property::testing::serialization_bijection(header)
        }
    }

    #[test]
    fn header_layout_sizes() {
        let header = MicroblockHeader {
            magic: crate::config::MICROBLOCK_MAGIC,
            protocol_version: 1,
            height: 1,
            previous_hash: Hash::zero(),
            timestamp: 0,
            gas: 0,
            gas_price: 0,
            body_hash: Hash::zero(),
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        // body_hash is exactly the trailing 32 bytes
        assert_eq!(&bytes[..HEADER_AUTH_SIZE].len(), &(HEADER_SIZE - 32));
    }

    #[test]
    fn header_roundtrip() {
        let header = MicroblockHeader {
            magic: crate::config::MICROBLOCK_MAGIC,
            protocol_version: 1,
            height: 42,
            previous_hash: Hash::hash_bytes(b"previous"),
            timestamp: 1_700_000_000,
            gas: 12_345,
            gas_price: 1,
            body_hash: Hash::hash_bytes(b"body"),
        };
        let got = vb_core::mempack::read_from_raw::<MicroblockHeader>(&header.to_bytes()).unwrap();
        assert_eq!(got, header);
    }

    #[test]
    fn genesis_marker_roundtrip() {
        let marker =
            GenesisMarker::generate(VbType::Account, 18_500, StdRng::seed_from_u64(7));
        let decoded = GenesisMarker::decode(&marker.encode()).unwrap();
        assert_eq!(decoded, marker);
    }

    #[test]
    fn genesis_marker_rejects_unknown_type() {
        let mut bytes = [0u8; 32];
        bytes[0] = 99;
        assert_eq!(
            GenesisMarker::decode(&Hash::from_bytes(bytes)),
            Err(GenesisMarkerError::UnknownVbType(99))
        );
    }

    #[test]
    fn genesis_marker_rejects_dirty_padding() {
        let marker = GenesisMarker::generate(VbType::Account, 1, StdRng::seed_from_u64(7));
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(marker.encode().as_bytes());
        bytes[6] = 1;
        assert_eq!(
            GenesisMarker::decode(&Hash::from_bytes(bytes)),
            Err(GenesisMarkerError::NonZeroPadding)
        );
    }
}
