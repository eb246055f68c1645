use crate::key::{AsymmetricKey, PublicKey, SecretKey};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignatureError {
    SizeInvalid,
    StructureInvalid,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignatureError::SizeInvalid => write!(f, "Invalid Signature size"),
            SignatureError::StructureInvalid => write!(f, "Invalid Signature structure"),
        }
    }
}
impl std::error::Error for SignatureError {}

/// Verification output: deliberately not a bool so that callers have
/// to match on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "verification must be inspected"]
pub enum Verification {
    Failed,
    Success,
}

impl From<bool> for Verification {
    fn from(b: bool) -> Self {
        if b {
            Verification::Success
        } else {
            Verification::Failed
        }
    }
}

pub trait VerificationAlgorithm: AsymmetricKey {
    type Signature: AsRef<[u8]> + Clone;

    const SIGNATURE_SIZE: usize;

    fn signature_from_bytes(data: &[u8]) -> Result<Self::Signature, SignatureError>;

    fn verify_bytes(pubkey: &Self::Public, signature: &Self::Signature, msg: &[u8])
        -> Verification;
}

pub trait SigningAlgorithm: VerificationAlgorithm {
    fn sign(key: &Self::Secret, msg: &[u8]) -> Self::Signature;
}

pub struct Signature<A: VerificationAlgorithm>(A::Signature);

impl<A: VerificationAlgorithm> Signature<A> {
    pub fn from_binary(data: &[u8]) -> Result<Self, SignatureError> {
        Ok(Signature(A::signature_from_bytes(data)?))
    }

    pub fn verify(&self, pubkey: &PublicKey<A>, msg: &[u8]) -> Verification {
        A::verify_bytes(&pubkey.0, &self.0, msg)
    }
}

impl<A: SigningAlgorithm> Signature<A> {
    pub fn generate(key: &SecretKey<A>, msg: &[u8]) -> Self {
        Signature(A::sign(&key.0, msg))
    }
}

impl<A: VerificationAlgorithm> AsRef<[u8]> for Signature<A> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<A: VerificationAlgorithm> Clone for Signature<A> {
    fn clone(&self) -> Self {
        Signature(self.0.clone())
    }
}

impl<A: VerificationAlgorithm> fmt::Debug for Signature<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0.as_ref()))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::key::KeyPair;

    pub(crate) fn keypair_signing_ok<A: SigningAlgorithm>(input: (KeyPair<A>, Vec<u8>)) -> bool {
        let (sk, pk) = (input.0.private_key(), input.0.public_key());
        let data = input.1;

        let signature = Signature::generate(sk, &data);
        signature.verify(pk, &data) == Verification::Success
    }

    pub(crate) fn keypair_signing_ko<A: SigningAlgorithm>(
        input: (KeyPair<A>, PublicKey<A>, Vec<u8>),
    ) -> bool {
        let (sk, pk) = (input.0.private_key(), input.0.public_key());
        let foreign_pk = &input.1;
        if pk == foreign_pk {
            // this may happen with a very small probability
            return true;
        }
        let data = input.2;

        let signature = Signature::generate(sk, &data);
        signature.verify(foreign_pk, &data) == Verification::Failed
    }
}
