use crate::config::TOKEN_INITIAL_OFFER;
use crate::provider::{Provider, ProviderError};
use crate::section::{Section, SectionPayload, SectionTag};
use crate::structure::{Occurrence, StructureChecker, StructureError};
use crate::vb::state::{verify_seal, ApplyContext, SectionError};
use crate::vb::KeyedIdentity;
use crate::vbtype::VbType;
use vb_core::mempack::{ReadBuf, ReadError, WriteBuf};

/// State of an account chain: a signing identity and a token balance.
///
/// The balance is credited once at genesis (full initial offer or
/// nothing) and only ever debited afterwards; credits from other
/// accounts' transfers are materialized by the consensus layer, not by
/// this fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    identity: KeyedIdentity,
    balance: u64,
}

impl AccountState {
    pub fn identity(&self) -> &KeyedIdentity {
        &self.identity
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub(crate) fn check_structure(
        is_first: bool,
        tags: &[SectionTag],
    ) -> Result<(), StructureError> {
        let mut checker = StructureChecker::new(tags);
        if is_first {
            checker.expects(Occurrence::Exactly(1), SectionTag::SignatureScheme)?;
            checker.expects(Occurrence::Exactly(1), SectionTag::PublicKey)?;
            checker.group(
                Occurrence::Exactly(1),
                &[
                    (Occurrence::AtMostOne, SectionTag::TokenIssuance),
                    (Occurrence::AtMostOne, SectionTag::AccountCreation),
                ],
            )?;
        } else {
            checker.expects(Occurrence::AtMostOne, SectionTag::PublicKey)?;
            checker.expects(Occurrence::AtLeastOne, SectionTag::Transfer)?;
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
            SectionPayload::TokenIssuance(t) => {
                if t.amount != TOKEN_INITIAL_OFFER {
                    return Err(SectionError::InvalidIssuanceAmount {
                        amount: t.amount,
                        expected: TOKEN_INITIAL_OFFER,
                    });
                }
                self.balance = t.amount;
                Ok(())
            }
            SectionPayload::AccountCreation(_) => Ok(()),
            SectionPayload::Transfer(t) => {
                if t.amount == 0 {
                    return Err(SectionError::ZeroTransferAmount);
                }
                let payee = provider
                    .get_virtual_blockchain_content(&t.payee)
                    .await
                    .map_err(|e| match e {
                        ProviderError::VirtualBlockchainNotFound(id) => {
                            SectionError::PayeeNotFound(id)
                        }
                        other => SectionError::Provider(other),
                    })?;
                if payee.vb_type != VbType::Account {
                    return Err(SectionError::InconsistentType {
                        id: t.payee,
                        expected: VbType::Account,
                        got: payee.vb_type,
                    });
                }
                if self.balance < t.amount {
                    return Err(SectionError::InsufficientBalance {
                        balance: self.balance,
                        amount: t.amount,
                    });
                }
                self.balance -= t.amount;
                Ok(())
            }
            SectionPayload::Signature(_) => {
                let scheme = self.identity.scheme()?;
                let key = self.identity.key()?.bytes.clone();
                let self_funded = ctx.is_first;
                verify_seal(ctx, section, scheme, &key, self_funded, provider).await
            }
            other => Err(SectionError::UnexpectedSection(other.tag())),
        }
    }

    pub(crate) fn serialize_in(&self, buf: &mut WriteBuf) {
        self.identity.serialize_in(buf);
        buf.put_u64(self.balance);
    }

    pub(crate) fn read(buf: &mut ReadBuf) -> Result<Self, ReadError> {
        Ok(AccountState {
            identity: KeyedIdentity::read(buf)?,
            balance: buf.get_u64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionTag::*;

    #[test]
    fn genesis_grammar() {
        let issuance = [SignatureScheme, PublicKey, TokenIssuance, Signature];
        AccountState::check_structure(true, &issuance).unwrap();
        let creation = [SignatureScheme, PublicKey, AccountCreation, Signature];
        AccountState::check_structure(true, &creation).unwrap();
    }

    #[test]
    fn genesis_requires_one_opening_section() {
        let none = [SignatureScheme, PublicKey, Signature];
        assert!(AccountState::check_structure(true, &none).is_err());
        let both = [
            SignatureScheme,
            PublicKey,
            TokenIssuance,
            AccountCreation,
            Signature,
        ];
        assert!(AccountState::check_structure(true, &both).is_err());
    }

    #[test]
    fn continuation_grammar() {
        AccountState::check_structure(false, &[Transfer, Transfer, Signature]).unwrap();
        AccountState::check_structure(false, &[PublicKey, Transfer, Signature]).unwrap();
        assert!(AccountState::check_structure(false, &[Signature]).is_err());
    }
}
