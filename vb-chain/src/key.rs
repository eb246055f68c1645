use std::fmt;

use vb_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use vb_crypto::{Digest256, DIGEST_SIZE};

/// SHA-256 hash, the chain-wide identifier of microblocks and
/// virtual blockchains
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(Digest256);

/// Identifier of a virtual blockchain: the hash of its genesis microblock
pub type VbId = Hash;
/// Identifier of a microblock: the hash of its serialized header
pub type MicroblockId = Hash;
/// Identifier of an account chain, used for fees payment
pub type AccountId = Hash;

impl Hash {
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        Hash(Digest256::digest(bytes))
    }

    pub fn zero() -> Self {
        Hash(Digest256::zero())
    }

    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Hash(Digest256::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub(crate) fn serialize_in(&self, buf: &mut WriteBuf) {
        buf.put_bytes(self.0.as_ref())
    }
}

impl Readable for Hash {
    fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        let bytes = <[u8; DIGEST_SIZE]>::read(buf)?;
        Ok(Hash::from_bytes(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash(0x{})", hex::encode(self.0.as_ref()))
    }
}
