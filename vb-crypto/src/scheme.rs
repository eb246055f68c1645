//! Byte-level runtime dispatch over the signature schemes the chain
//! may declare. A virtual blockchain records its scheme as a small
//! integer in its genesis microblock; key, signature and message
//! material reach the engine as plain bytes, so the registry exposes
//! byte-in/byte-out entry points on top of the typed algorithms.

use crate::algorithms::Ed25519;
use crate::key::{PublicKey, SecretKey};
use crate::sign::{Signature, Verification, VerificationAlgorithm};
use std::fmt;

/// On-chain identifier of a signature scheme.
///
/// `MlDsa65` is a reserved identifier: the engine accepts chains that
/// declare it but the workspace does not ship the primitive, the
/// implementation is expected from an external provider crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeId {
    Ed25519 = 1,
    MlDsa65 = 2,
}

impl SchemeId {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(SchemeId::Ed25519),
            2 => Some(SchemeId::MlDsa65),
            _ => None,
        }
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemeId::Ed25519 => write!(f, "ed25519"),
            SchemeId::MlDsa65 => write!(f, "ml-dsa-65"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    UnknownScheme(u8),
    UnsupportedScheme(SchemeId),
    InvalidSecretKey(SchemeId),
    InvalidPublicKey(SchemeId),
    InvalidSignature(SchemeId),
}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemeError::UnknownScheme(tag) => write!(f, "unknown signature scheme tag {}", tag),
            SchemeError::UnsupportedScheme(id) => {
                write!(f, "signature scheme {} is not available", id)
            }
            SchemeError::InvalidSecretKey(id) => write!(f, "invalid {} secret key", id),
            SchemeError::InvalidPublicKey(id) => write!(f, "invalid {} public key", id),
            SchemeError::InvalidSignature(id) => write!(f, "invalid {} signature", id),
        }
    }
}

impl std::error::Error for SchemeError {}

/// Byte length of a signature under the given scheme
pub fn signature_size(scheme: SchemeId) -> Result<usize, SchemeError> {
    match scheme {
        SchemeId::Ed25519 => Ok(Ed25519::SIGNATURE_SIZE),
        SchemeId::MlDsa65 => Err(SchemeError::UnsupportedScheme(scheme)),
    }
}

/// Sign a message with a raw secret key under the given scheme
pub fn sign_with(scheme: SchemeId, secret: &[u8], msg: &[u8]) -> Result<Vec<u8>, SchemeError> {
    match scheme {
        SchemeId::Ed25519 => {
            let key = SecretKey::<Ed25519>::from_binary(secret)
                .map_err(|_| SchemeError::InvalidSecretKey(scheme))?;
            Ok(Signature::generate(&key, msg).as_ref().to_vec())
        }
        SchemeId::MlDsa65 => Err(SchemeError::UnsupportedScheme(scheme)),
    }
}

/// Verify a raw signature against a raw public key under the given scheme
pub fn verify_with(
    scheme: SchemeId,
    public: &[u8],
    msg: &[u8],
    signature: &[u8],
) -> Result<Verification, SchemeError> {
    match scheme {
        SchemeId::Ed25519 => {
            let key = PublicKey::<Ed25519>::from_binary(public)
                .map_err(|_| SchemeError::InvalidPublicKey(scheme))?;
            let signature = Signature::<Ed25519>::from_binary(signature)
                .map_err(|_| SchemeError::InvalidSignature(scheme))?;
            Ok(signature.verify(&key, msg))
        }
        SchemeId::MlDsa65 => Err(SchemeError::UnsupportedScheme(scheme)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keypair() -> (Vec<u8>, Vec<u8>) {
        let pair = KeyPair::<Ed25519>::generate(StdRng::seed_from_u64(42));
        (
            pair.private_key().leak_secret().to_vec(),
            pair.public_key().as_ref().to_vec(),
        )
    }

    #[test]
    fn byte_level_roundtrip() {
        let (sk, pk) = keypair();
        let msg = b"some signed payload";
        let sig = sign_with(SchemeId::Ed25519, &sk, msg).unwrap();
        assert_eq!(sig.len(), signature_size(SchemeId::Ed25519).unwrap());
        assert_eq!(
            verify_with(SchemeId::Ed25519, &pk, msg, &sig).unwrap(),
            Verification::Success
        );
        assert_eq!(
            verify_with(SchemeId::Ed25519, &pk, b"other payload", &sig).unwrap(),
            Verification::Failed
        );
    }

    #[test]
    fn reserved_scheme_is_unsupported() {
        let (sk, _) = keypair();
        assert_eq!(
            sign_with(SchemeId::MlDsa65, &sk, b"m"),
            Err(SchemeError::UnsupportedScheme(SchemeId::MlDsa65))
        );
        assert_eq!(
            signature_size(SchemeId::MlDsa65),
            Err(SchemeError::UnsupportedScheme(SchemeId::MlDsa65))
        );
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(SchemeId::from_u8(0), None);
        assert_eq!(SchemeId::from_u8(9), None);
    }
}
