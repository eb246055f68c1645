use crate::provider::Provider;
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{verify_seal, ApplyContext, SectionError};
use crate::vb::KeyedIdentity;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of the protocol chain: the upgrade-signing identity and the
/// currently active protocol version. Versions only move forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolState {
    identity: KeyedIdentity,
    version: u32,
}

impl ProtocolState {
    pub fn identity(&self) -> &KeyedIdentity {
        &self.identity
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::SignatureScheme)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::PublicKey)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::ProtocolUpgrade)?;
        } else {
            checker.expects(Occurrence::AtLeastOne, SectionTag::ProtocolUpgrade)?;
        }
        checker.expects(Occurrence::Exactly(1), SectionTag::Signature)?;
        checker.ends_here()
    }

    pub(crate) async fn apply_section<P: Provider + ?Sized>(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        section: &Section,
        provider: &P,
    ) -> Result<(), SectionError> {
        match section.payload() {
            SectionPayload::SignatureScheme(s) => self.identity.declare_scheme(s.scheme),
            SectionPayload::PublicKey(k) => {
                self.identity.declare_key(k.key.clone(), ctx.height);
                Ok(())
            }
            SectionPayload::ProtocolUpgrade(u) => {
                if u.version <= self.version {
                    return Err(SectionError::StaleProtocolVersion {
                        current: self.version,
                        proposed: u.version,
                    });
                }
                self.version = u.version;
                Ok(())
            }
            SectionPayload::Signature(_) => {
                let scheme = self.identity.scheme()?;
                let key = self.identity.key()?.bytes.clone();
                verify_seal(ctx, section, scheme, &key, false, provider).await
            }
            other => Err(SectionError::UnexpectedSection(other.tag())),
        }
    }

    pub(crate) fn serialize_in(&self, buf: &mut WriteBuf) {
        self.identity.serialize_in(buf);
        buf.put_u32(self.version);
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(ProtocolState {
            identity: KeyedIdentity::read(buf)?,
            version: buf.get_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionTag::*;

    #[test]
    fn genesis_grammar() {
        let tags = [SignatureScheme, PublicKey, ProtocolUpgrade, Signature];
        ProtocolState::check_structure(true, &tags).unwrap();
        let missing = [SignatureScheme, PublicKey, Signature];
        assert!(ProtocolState::check_structure(true, &missing).is_err());
    }

    #[test]
    fn continuation_grammar() {
        let tags = [ProtocolUpgrade, ProtocolUpgrade, Signature];
        ProtocolState::check_structure(false, &tags).unwrap();
        assert!(ProtocolState::check_structure(false, &[Signature]).is_err());
    }
}
