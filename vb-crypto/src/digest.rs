use std::convert::TryFrom;
use std::hash::{Hash, Hasher};
use std::{error, fmt};

use cryptoxide::digest::Digest as _;
use cryptoxide::sha2::Sha256;

pub const DIGEST_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestError {
    InvalidDigestSize(usize),
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DigestError::InvalidDigestSize(sz) => write!(
                f,
                "invalid digest size, expected {} bytes but received {} bytes",
                DIGEST_SIZE, sz
            ),
        }
    }
}

impl error::Error for DigestError {}

/// A SHA-256 digest of some bytes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Digest256([u8; DIGEST_SIZE]);

impl Digest256 {
    /// Hash the given bytes
    pub fn digest(bytes: &[u8]) -> Self {
        let mut sh = Sha256::new();
        let mut out = [0u8; DIGEST_SIZE];
        sh.input(bytes);
        sh.result(&mut out);
        Digest256(out)
    }

    pub fn zero() -> Self {
        Digest256([0; DIGEST_SIZE])
    }

    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Digest256(bytes)
    }
}

impl AsRef<[u8]> for Digest256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Digest256> for [u8; DIGEST_SIZE] {
    fn from(digest: Digest256) -> Self {
        digest.0
    }
}

impl<'a> TryFrom<&'a [u8]> for Digest256 {
    type Error = DigestError;
    fn try_from(slice: &'a [u8]) -> Result<Self, Self::Error> {
        if slice.len() != DIGEST_SIZE {
            return Err(DigestError::InvalidDigestSize(slice.len()));
        }
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(slice);
        Ok(Digest256(out))
    }
}

impl Hash for Digest256 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Display for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Digest256(0x{})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-256 of the empty string
        let expected = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(Digest256::digest(b"").to_string(), expected);
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(Digest256::digest(b"abc"), Digest256::digest(b"abd"));
    }

    #[test]
    fn try_from_checks_size() {
        assert_eq!(
            Digest256::try_from(&[0u8; 16][..]),
            Err(DigestError::InvalidDigestSize(16))
        );
        assert!(Digest256::try_from(&[0u8; 32][..]).is_ok());
    }
}
