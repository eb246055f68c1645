use crate::key::VbId;
use crate::provider::Provider;
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{
    fetch_application, fetch_organization, put_opt_hash, read_opt_hash, verify_seal,
    ApplyContext, SectionError,
};
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of an application-ledger chain: the owning application and a
/// count of accepted records. Record payloads are opaque here; they
/// live in the microblock bodies.
///
/// Ledger chains are sealed with the key of the organization owning the
/// application, resolved application first, organization second.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationLedgerState {
    application: Option<VbId>,
    records: u64,
}

impl ApplicationLedgerState {
    pub fn application(&self) -> Option<&VbId> {
        self.application.as_ref()
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::LedgerDeclaration)?;
            checker.expects(Occurrence::Any, SectionTag::LedgerRecord)?;
        } else {
            checker.expects(Occurrence::AtLeastOne, SectionTag::LedgerRecord)?;
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
            SectionPayload::LedgerDeclaration(d) => {
                fetch_application(provider, &d.application).await?;
                self.application = Some(d.application);
                Ok(())
            }
            SectionPayload::LedgerRecord(r) => {
                let app_id = self
                    .application
                    .ok_or(SectionError::ApplicationNotDeclared)?;
                let app = fetch_application(provider, &app_id).await?;
                if !app.has_channel(&r.channel) {
                    return Err(SectionError::UnknownChannel(r.channel.clone()));
                }
                if !app.is_subscribed(&r.actor, &r.channel) {
                    return Err(SectionError::ActorNotSubscribed {
                        actor: r.actor.clone(),
                        channel: r.channel.clone(),
                    });
                }
                self.records += 1;
                Ok(())
            }
            SectionPayload::Signature(_) => {
                let app_id = self
                    .application
                    .ok_or(SectionError::ApplicationNotDeclared)?;
                let app = fetch_application(provider, &app_id).await?;
                let org_id = app
                    .organization()
                    .copied()
                    .ok_or(SectionError::OrganizationNotDeclared)?;
                let org = fetch_organization(provider, &org_id).await?;
                let scheme = org.identity().scheme()?;
                let key = org.identity().key()?.bytes.clone();
                verify_seal(ctx, section, scheme, &key, false, provider).await
            }
            other => Err(SectionError::UnexpectedSection(other.tag())),
        }
    }

    pub(crate) fn serialize_in(&self, buf: &mut WriteBuf) {
        put_opt_hash(buf, &self.application);
        buf.put_u64(self.records);
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(ApplicationLedgerState {
            application: read_opt_hash(buf)?,
            records: buf.get_u64()?,
        })
    }
}
