//! Declarative checking of a microblock's section ordering.
//!
//! Each virtual blockchain type states its body grammar as a sequence
//! of `expects` and `group` calls over a [`StructureChecker`], closed
//! by `ends_here`. The checker walks the ordered tag list with a
//! cursor and consumes maximal runs.

use crate::section::SectionTag;

use std::fmt;
use thiserror::Error;

/// How many sections of a kind a rule tolerates at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Exactly(u32),
    AtLeastOne,
    AtMostOne,
    Any,
}

impl Occurrence {
    fn accepts(self, count: u32) -> bool {
        match self {
            Occurrence::Exactly(n) => count == n,
            Occurrence::AtLeastOne => count >= 1,
            Occurrence::AtMostOne => count <= 1,
            Occurrence::Any => true,
        }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Occurrence::Exactly(n) => write!(f, "exactly {}", n),
            Occurrence::AtLeastOne => write!(f, "at least one"),
            Occurrence::AtMostOne => write!(f, "at most one"),
            Occurrence::Any => write!(f, "any number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("expected {expected} {tag} section(s), got {got}")]
    ConstraintViolation {
        tag: SectionTag,
        expected: Occurrence,
        got: u32,
    },
    #[error("expected {expected} section(s) in group, got {got}")]
    GroupViolation { expected: Occurrence, got: u32 },
    #[error("unexpected {tag} section at index {index}")]
    UnexpectedSection { tag: SectionTag, index: u32 },
}

/// Cursor over one microblock's ordered section tags
pub struct StructureChecker<'a> {
    tags: &'a [SectionTag],
    cursor: usize,
}

impl<'a> StructureChecker<'a> {
    pub fn new(tags: &'a [SectionTag]) -> Self {
        StructureChecker { tags, cursor: 0 }
    }

    fn run_of(&self, tag: SectionTag) -> u32 {
        self.tags[self.cursor..]
            .iter()
            .take_while(|t| **t == tag)
            .count() as u32
    }

    /// Consume the maximal run of `tag` at the cursor and check its
    /// length against `expected`
    pub fn expects(&mut self, expected: Occurrence, tag: SectionTag) -> Result<(), StructureError> {
        let got = self.run_of(tag);
        if !expected.accepts(got) {
            return Err(StructureError::ConstraintViolation { tag, expected, got });
        }
        self.cursor += got as usize;
        Ok(())
    }

    /// Consume the maximal run drawn from any of the member tags, mixed
    /// interleaving allowed, then check the aggregate length against
    /// `expected` and every member's count against its own occurrence
    pub fn group(
        &mut self,
        expected: Occurrence,
        members: &[(Occurrence, SectionTag)],
    ) -> Result<(), StructureError> {
        let mut counts = vec![0u32; members.len()];
        let mut total = 0u32;
        while let Some(tag) = self.tags.get(self.cursor + total as usize) {
            match members.iter().position(|(_, m)| m == tag) {
                None => break,
                Some(i) => {
                    counts[i] += 1;
                    total += 1;
                }
            }
        }
        if !expected.accepts(total) {
            return Err(StructureError::GroupViolation {
                expected,
                got: total,
            });
        }
        for ((occurrence, tag), got) in members.iter().zip(counts) {
            if !occurrence.accepts(got) {
                return Err(StructureError::ConstraintViolation {
                    tag: *tag,
                    expected: *occurrence,
                    got,
                });
            }
        }
        self.cursor += total as usize;
        Ok(())
    }

    /// Every section must be consumed once the grammar is exhausted
    pub fn ends_here(&self) -> Result<(), StructureError> {
        match self.tags.get(self.cursor) {
            None => Ok(()),
            Some(tag) => Err(StructureError::UnexpectedSection {
                tag: *tag,
                index: self.cursor as u32,
            }),
        }
    }
}
