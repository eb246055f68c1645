use crate::vb::state::SectionError;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};
use vb_crypto::SchemeId;

/// Signing identity of a self-keyed chain: the declared scheme and the
/// currently active public key with the height it was declared at.
///
/// Account, organization, validator node and protocol chains all carry
/// one; application and application-ledger chains borrow the identity
/// of their owning organization instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedIdentity {
    scheme: Option<SchemeId>,
    key: Option<DeclaredKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredKey {
    pub bytes: Vec<u8>,
    pub declared_at: u64,
}

impl KeyedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scheme is declared once at genesis and never changes
    pub fn declare_scheme(&mut self, scheme: SchemeId) -> Result<(), SectionError> {
        if self.scheme.is_some() {
            return Err(SectionError::SchemeAlreadyDeclared);
        }
        self.scheme = Some(scheme);
        Ok(())
    }

    /// Declaring a key again rotates it; the previous key stops
    /// authenticating from this height on
    pub fn declare_key(&mut self, bytes: Vec<u8>, declared_at: u64) {
        self.key = Some(DeclaredKey { bytes, declared_at });
    }

    pub fn scheme(&self) -> Result<SchemeId, SectionError> {
        self.scheme.ok_or(SectionError::SchemeNotDeclared)
    }

    pub fn key(&self) -> Result<&DeclaredKey, SectionError> {
        self.key.as_ref().ok_or(SectionError::KeyNotDeclared)
    }

    pub fn serialize_in(&self, buf: &mut WriteBuf) {
        match self.scheme {
            None => buf.put_u8(0),
            Some(scheme) => buf.put_u8(scheme as u8),
        }
        match &self.key {
            None => buf.put_u8(0),
            Some(key) => {
                buf.put_u8(1);
                buf.put_varint(key.bytes.len() as u64);
                buf.put_bytes(&key.bytes);
                buf.put_u64(key.declared_at);
            }
        }
    }

    pub fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        let scheme = match buf.get_u8()? {
            0 => None,
            raw => Some(SchemeId::from_u8(raw).ok_or(ReadError::UnknownTag(raw as u32))?),
        };
        let key = match buf.get_u8()? {
            0 => None,
            1 => {
                let len = buf.get_varint()? as usize;
                let bytes = buf.get_slice(len)?.to_vec();
                let declared_at = buf.get_u64()?;
                Some(DeclaredKey { bytes, declared_at })
            }
            other => return Err(ReadError::UnknownTag(other as u32)),
        };
        Ok(KeyedIdentity { scheme, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::mempack::read_from_raw;

    struct Wrapper(KeyedIdentity);
    impl vb_core::mempack::Readable for Wrapper {
        fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
            KeyedIdentity::read(buf).map(Wrapper)
        }
    }

    #[test]
    fn scheme_declared_once() {
        let mut id = KeyedIdentity::new();
        id.declare_scheme(SchemeId::Ed25519).unwrap();
        assert_eq!(
            id.declare_scheme(SchemeId::Ed25519),
            Err(SectionError::SchemeAlreadyDeclared)
        );
    }

    #[test]
    fn key_rotation_keeps_latest() {
        let mut id = KeyedIdentity::new();
        id.declare_key(vec![1; 32], 1);
        id.declare_key(vec![2; 32], 5);
        let key = id.key().unwrap();
        assert_eq!(key.bytes, vec![2; 32]);
        assert_eq!(key.declared_at, 5);
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut id = KeyedIdentity::new();
        id.declare_scheme(SchemeId::Ed25519).unwrap();
        id.declare_key(vec![7; 32], 3);
        let mut buf = WriteBuf::new();
        id.serialize_in(&mut buf);
        let got = read_from_raw::<Wrapper>(buf.as_ref()).unwrap();
        assert_eq!(got.0, id);
    }

    #[test]
    fn empty_identity_roundtrip() {
        let id = KeyedIdentity::new();
        let mut buf = WriteBuf::new();
        id.serialize_in(&mut buf);
        let got = read_from_raw::<Wrapper>(buf.as_ref()).unwrap();
        assert_eq!(got.0, id);
        assert_eq!(got.0.scheme(), Err(SectionError::SchemeNotDeclared));
    }
}
