//! Chain-wide constants. Every node must agree on these for its
//! accept/reject decisions to match the rest of the network.

/// Leading bytes of every serialized microblock header
pub const MICROBLOCK_MAGIC: [u8; 4] = *b"VBMB";

/// Version of the wire protocol this engine speaks
pub const PROTOCOL_VERSION: u32 = 1;

/// Flat part of the gas formula, charged once per microblock
pub const FIXED_GAS_FEE: u64 = 1_000;

/// Proportional part of the gas formula, charged per section body byte
pub const GAS_PER_BYTE: u64 = 10;

/// Declared gas price of locally built microblocks
pub const DEFAULT_GAS_PRICE: u64 = 1;

/// The one amount a genesis token issuance is allowed to mint
pub const TOKEN_INITIAL_OFFER: u64 = 1_000_000_000;

/// How far in the past a microblock timestamp may lie (seconds)
pub const MAX_PAST_DELAY_SECS: u64 = 300;

/// How far in the future a microblock timestamp may lie (seconds)
pub const MAX_FUTURE_DELAY_SECS: u64 = 60;
