use crate::provider::Provider;
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{
    put_opt_string, read_opt_string, verify_seal, ApplyContext, SectionError,
};
use crate::vb::KeyedIdentity;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of an organization chain. The identity declared here also
/// authenticates the organization's application and application-ledger
/// chains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationState {
    identity: KeyedIdentity,
    name: Option<String>,
    endpoint: Option<String>,
}

impl OrganizationState {
    pub fn identity(&self) -> &KeyedIdentity {
        &self.identity
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::SignatureScheme)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::PublicKey)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::Description)?;
            checker.expects(Occurrence::AtMostOne, SectionTag::Endpoint)?;
        } else {
            checker.group(
                Occurrence::AtLeastOne,
                &[
                    (Occurrence::AtMostOne, SectionTag::PublicKey),
                    (Occurrence::AtMostOne, SectionTag::Description),
                    (Occurrence::AtMostOne, SectionTag::Endpoint),
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
            SectionPayload::Description(d) => {
                self.name = Some(d.name.clone());
                Ok(())
            }
            SectionPayload::Endpoint(e) => {
                self.endpoint = Some(e.url.clone());
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
        put_opt_string(buf, &self.name);
        put_opt_string(buf, &self.endpoint);
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(OrganizationState {
            identity: KeyedIdentity::read(buf)?,
            name: read_opt_string(buf, "organization.name")?,
            endpoint: read_opt_string(buf, "organization.endpoint")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionTag::*;

    #[test]
    fn genesis_grammar() {
        let with_endpoint = [SignatureScheme, PublicKey, Description, Endpoint, Signature];
        OrganizationState::check_structure(true, &with_endpoint).unwrap();
        let without = [SignatureScheme, PublicKey, Description, Signature];
        OrganizationState::check_structure(true, &without).unwrap();
        let nameless = [SignatureScheme, PublicKey, Signature];
        assert!(OrganizationState::check_structure(true, &nameless).is_err());
    }

    #[test]
    fn continuation_needs_at_least_one_update() {
        assert!(OrganizationState::check_structure(false, &[Signature]).is_err());
        OrganizationState::check_structure(false, &[Endpoint, Signature]).unwrap();
        OrganizationState::check_structure(false, &[Description, PublicKey, Signature]).unwrap();
    }
}
