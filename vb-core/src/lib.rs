//! Core primitives shared by every crate of the virtual blockchain
//! engine: a canonical binary codec and the property traits a chain
//! object is expected to implement.

pub mod mempack;
pub mod property;
