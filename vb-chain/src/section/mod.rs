mod payload;

pub use payload::{
    AccountCreation, ActorDeclaration, ApplicationDeclaration, ChannelDeclaration,
    ChannelSubscription, Description, Endpoint, LedgerDeclaration, LedgerRecord,
    ProtocolUpgrade, PublicKeyDeclaration, SectionPayload, SectionTag, SignatureScheme,
    SignatureSeal, TokenIssuance, Transfer, ValidatorDeclaration,
};
pub(crate) use payload::{read_string, write_string};

use crate::key::Hash;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// One typed payload unit of a microblock body.
///
/// `data` is the canonical serialization of `payload`, `hash` its
/// SHA-256 and `index` the zero-based position inside the owning
/// microblock. All three are derived at construction and never
/// settable from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    payload: SectionPayload,
    data: Vec<u8>,
    hash: Hash,
    index: u32,
}

impl Section {
    pub(crate) fn create(payload: SectionPayload, index: u32) -> Self {
        let mut buf = WriteBuf::new();
        payload.serialize_in(&mut buf);
        let data = buf.into_inner();
        let hash = Hash::hash_bytes(&data);
        Section {
            payload,
            data,
            hash,
            index,
        }
    }

    pub fn tag(&self) -> SectionTag {
        self.payload.tag()
    }

    pub fn payload(&self) -> &SectionPayload {
        &self.payload
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Serialize an ordered section list into the body wire format:
/// `varint(count) || (tag, varint(len), data)*`
pub fn serialize_body(sections: &[Section]) -> Vec<u8> {
    let mut buf = WriteBuf::new();
    buf.put_varint(sections.len() as u64);
    for section in sections {
        buf.put_u8(section.tag() as u8);
        buf.put_varint(section.data.len() as u64);
        buf.put_bytes(&section.data);
    }
    buf.into_inner()
}

/// Inverse of `serialize_body`: rebuild the ordered section list,
/// recomputing every section hash and index
pub fn read_body(bytes: &[u8]) -> Result<Vec<Section>, ReadError> {
    let mut buf = ReadBuf::from(bytes);
    let count = buf.get_varint()? as usize;
    // a section costs at least a tag byte and a length byte, so the
    // declared count can never exceed half the remaining bytes
    let most = buf.remaining() / 2;
    if count > most {
        return Err(ReadError::SizeTooBig(count, most));
    }
    let mut sections = Vec::with_capacity(count);
    for index in 0..count {
        let raw_tag = buf.get_u8()?;
        let tag = SectionTag::from_u8(raw_tag).ok_or(ReadError::UnknownTag(raw_tag as u32))?;
        let len = buf.get_varint()? as usize;
        let data = buf.get_slice(len)?;
        let mut payload_buf = ReadBuf::from(data);
        let payload = SectionPayload::read(tag, &mut payload_buf)?;
        sections.push(Section::create(payload, index as u32));
    }
    buf.expect_end()?;
    Ok(sections)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for SectionPayload {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            let payee = Hash::hash_bytes(&Vec::<u8>::arbitrary(g));
            match g.next_u32() % 10 {
                0 => SectionPayload::SignatureScheme(SignatureScheme {
                    scheme: vb_crypto::SchemeId::Ed25519,
                }),
                1 => SectionPayload::PublicKey(PublicKeyDeclaration {
                    key: nonempty_bytes(g),
                }),
                2 => SectionPayload::Signature(SignatureSeal {
                    signature: nonempty_bytes(g),
                }),
                3 => SectionPayload::TokenIssuance(TokenIssuance {
                    amount: u64::arbitrary(g),
                }),
                4 => SectionPayload::AccountCreation(AccountCreation),
                5 => SectionPayload::Transfer(Transfer {
                    payee,
                    amount: u64::arbitrary(g),
                }),
                6 => SectionPayload::Description(Description {
                    name: String::arbitrary(g),
                }),
                7 => SectionPayload::ChannelSubscription(ChannelSubscription {
                    actor: String::arbitrary(g),
                    channel: String::arbitrary(g),
                }),
                8 => SectionPayload::LedgerRecord(LedgerRecord {
                    channel: String::arbitrary(g),
                    actor: String::arbitrary(g),
                    payload: Vec::arbitrary(g),
                }),
                _ => SectionPayload::ProtocolUpgrade(ProtocolUpgrade {
                    version: u32::arbitrary(g),
                }),
            }
        }
    }

    fn nonempty_bytes<G: Gen>(g: &mut G) -> Vec<u8> {
        let mut v = Vec::<u8>::arbitrary(g);
        v.push(u8::arbitrary(g));
        v
    }

    quickcheck! {
        fn body_serialization_bijection(payloads: Vec<SectionPayload>) -> bool {
            let sections: Vec<Section> = payloads
                .into_iter()
                .enumerate()
                .map(|(i, p)| Section::create(p, i as u32))
                .collect();
            match read_body(&serialize_body(&sections)) {
                Err(_) => false,
                Ok(got) => got == sections,
            }
        }
    }

    #[test]
    fn section_hash_and_index_are_derived() {
        let a = Section::create(
            SectionPayload::TokenIssuance(TokenIssuance { amount: 7 }),
            0,
        );
        let b = Section::create(
            SectionPayload::TokenIssuance(TokenIssuance { amount: 7 }),
            3,
        );
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), Hash::hash_bytes(a.data()));
        assert_eq!(b.index(), 3);
    }

    #[test]
    fn unknown_section_tag_rejected() {
        // count = 1, tag = 200, len = 0
        let bytes = [1u8, 200, 0];
        assert_eq!(read_body(&bytes), Err(ReadError::UnknownTag(200)));
    }

    #[test]
    fn oversized_section_count_rejected() {
        let mut buf = WriteBuf::new();
        buf.put_varint(1 << 60);
        assert_eq!(
            read_body(buf.as_ref()),
            Err(ReadError::SizeTooBig(1 << 60, 0))
        );
    }

    #[test]
    fn trailing_garbage_rejected() {
        let sections = vec![Section::create(
            SectionPayload::AccountCreation(AccountCreation),
            0,
        )];
        let mut bytes = serialize_body(&sections);
        bytes.push(0xff);
        assert_eq!(read_body(&bytes), Err(ReadError::UnconsumedData(1)));
    }
}
