use crate::key::VbId;
use crate::provider::Provider;
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{
    fetch_organization, put_opt_hash, put_opt_string, read_count, read_opt_hash,
    read_opt_string, verify_seal, ApplyContext, SectionError,
};
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of an application chain: the owning organization, the declared
/// actors and channels, and which actor is subscribed to which channel.
///
/// Application chains have no key of their own; microblocks are sealed
/// with the owning organization's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationState {
    organization: Option<VbId>,
    name: Option<String>,
    actors: Vec<String>,
    channels: Vec<String>,
    subscriptions: Vec<(String, String)>,
}

impl ApplicationState {
    pub fn organization(&self) -> Option<&VbId> {
        self.organization.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_actor(&self, name: &str) -> bool {
        self.actors.iter().any(|a| a == name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c == name)
    }

    pub fn is_subscribed(&self, actor: &str, channel: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|(a, c)| a == actor && c == channel)
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::ApplicationDeclaration)?;
            checker.expects(Occurrence::AtMostOne, SectionTag::Description)?;
            checker.group(
                Occurrence::Any,
                &[
                    (Occurrence::Any, SectionTag::ActorDeclaration),
                    (Occurrence::Any, SectionTag::ChannelDeclaration),
                    (Occurrence::Any, SectionTag::ChannelSubscription),
                ],
            )?;
        } else {
            checker.group(
                Occurrence::AtLeastOne,
                &[
                    (Occurrence::AtMostOne, SectionTag::Description),
                    (Occurrence::Any, SectionTag::ActorDeclaration),
                    (Occurrence::Any, SectionTag::ChannelDeclaration),
                    (Occurrence::Any, SectionTag::ChannelSubscription),
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
            SectionPayload::ApplicationDeclaration(d) => {
                // existence check only; the organization's state is
                // re-fetched at signature time
                fetch_organization(provider, &d.organization).await?;
                self.organization = Some(d.organization);
                Ok(())
            }
            SectionPayload::Description(d) => {
                self.name = Some(d.name.clone());
                Ok(())
            }
            SectionPayload::ActorDeclaration(a) => {
                if self.has_actor(&a.name) {
                    return Err(SectionError::DuplicateActor(a.name.clone()));
                }
                self.actors.push(a.name.clone());
                Ok(())
            }
            SectionPayload::ChannelDeclaration(c) => {
                if self.has_channel(&c.name) {
                    return Err(SectionError::DuplicateChannel(c.name.clone()));
                }
                self.channels.push(c.name.clone());
                Ok(())
            }
            SectionPayload::ChannelSubscription(s) => {
                if !self.has_actor(&s.actor) {
                    return Err(SectionError::UnknownActor(s.actor.clone()));
                }
                if !self.has_channel(&s.channel) {
                    return Err(SectionError::UnknownChannel(s.channel.clone()));
                }
                self.subscriptions.push((s.actor.clone(), s.channel.clone()));
                Ok(())
            }
            SectionPayload::Signature(_) => {
                let org_id = self
                    .organization
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
        put_opt_hash(buf, &self.organization);
        put_opt_string(buf, &self.name);
        buf.put_varint(self.actors.len() as u64);
        for actor in &self.actors {
            crate::section::write_string(buf, actor);
        }
        buf.put_varint(self.channels.len() as u64);
        for channel in &self.channels {
            crate::section::write_string(buf, channel);
        }
        buf.put_varint(self.subscriptions.len() as u64);
        for (actor, channel) in &self.subscriptions {
            crate::section::write_string(buf, actor);
            crate::section::write_string(buf, channel);
        }
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        let organization = read_opt_hash(buf)?;
        let name = read_opt_string(buf, "application.name")?;
        let actor_count = read_count(buf, 1)?;
        let mut actors = Vec::with_capacity(actor_count);
        for _ in 0..actor_count {
            actors.push(crate::section::read_string(buf, "application.actor")?);
        }
        let channel_count = read_count(buf, 1)?;
        let mut channels = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            channels.push(crate::section::read_string(buf, "application.channel")?);
        }
        let subscription_count = read_count(buf, 2)?;
        let mut subscriptions = Vec::with_capacity(subscription_count);
        for _ in 0..subscription_count {
            let actor = crate::section::read_string(buf, "application.subscription.actor")?;
            let channel = crate::section::read_string(buf, "application.subscription.channel")?;
            subscriptions.push((actor, channel));
        }
        Ok(ApplicationState {
            organization,
            name,
            actors,
            channels,
            subscriptions,
        })
    }
}
