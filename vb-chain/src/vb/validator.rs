use crate::key::VbId;
use crate::provider::Provider;
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{
    fetch_organization, put_opt_hash, read_opt_hash, verify_seal, ApplyContext, SectionError,
};
use crate::vb::KeyedIdentity;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of a validator node chain: its own signing identity and the
/// organization operating the node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorNodeState {
    identity: KeyedIdentity,
    organization: Option<VbId>,
}

impl ValidatorNodeState {
    pub fn identity(&self) -> &KeyedIdentity {
        &self.identity
    }

    pub fn organization(&self) -> Option<&VbId> {
        self.organization.as_ref()
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::SignatureScheme)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::PublicKey)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::ValidatorDeclaration)?;
        } else {
            checker.group(
                Occurrence::AtLeastOne,
                &[
                    (Occurrence::AtMostOne, SectionTag::PublicKey),
                    (Occurrence::AtMostOne, SectionTag::ValidatorDeclaration),
                ],
            )?;
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
            SectionPayload::ValidatorDeclaration(d) => {
                fetch_organization(provider, &d.organization).await?;
                self.organization = Some(d.organization);
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
        put_opt_hash(buf, &self.organization);
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(ValidatorNodeState {
            identity: KeyedIdentity::read(buf)?,
            organization: read_opt_hash(buf)?,
        })
    }
}
