//! Cryptographic interface of the virtual blockchain engine.
//!
//! The chain engine never names a concrete primitive: everything goes
//! through `AsymmetricKey`/`SigningAlgorithm`/`VerificationAlgorithm`
//! for typed use, or through the byte-level `scheme` registry when the
//! algorithm is only known at runtime (it is recorded on-chain in a
//! signature-scheme section).

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod algorithms;
mod digest;
mod key;
pub mod scheme;
mod sign;

pub use algorithms::Ed25519;
pub use digest::{Digest256, DigestError, DIGEST_SIZE};
pub use key::{AsymmetricKey, KeyPair, PublicKey, PublicKeyError, SecretKey, SecretKeyError};
pub use scheme::{SchemeError, SchemeId};
pub use sign::{Signature, SignatureError, SigningAlgorithm, Verification, VerificationAlgorithm};
