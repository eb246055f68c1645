//! Client-side engine for a ledger of per-entity virtual blockchains.
//!
//! Every entity of the ledger (account, organization, application,
//! application ledger, validator node, protocol) owns an independent
//! append-only chain of signed, schema-constrained records called
//! microblocks. This crate implements the generic chain/record model:
//! the microblock binary container (hashing, signing scope, gas), the
//! virtual-blockchain append/load state machine with per-type section
//! dispatch, the declarative structural constraint checker, and the
//! staged import pipeline turning raw peer bytes into a verified state
//! transition.
//!
//! Storage, networking and concrete cryptographic primitives live
//! behind the [`provider::Provider`] and `vb_crypto` seams.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod config;
pub mod gas;
pub mod import;
pub mod key;
pub mod microblock;
pub mod provider;
pub mod section;
pub mod structure;
pub mod testing;
pub mod vb;
pub mod vbtype;

pub use import::{ImportError, ImportStatus, MicroblockImporter};
pub use key::{AccountId, Hash, MicroblockId, VbId};
pub use vb::{VbState, VirtualBlockchain};
pub use vbtype::VbType;
