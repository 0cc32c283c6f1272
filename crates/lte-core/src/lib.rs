//! Core utilities for the LTE UE MAC random access stack
//!
//! This crate provides fundamental types and utilities used across the stack:
//! - BitBuffer for bit-level MAC PDU parsing and construction
//! - Tti for subframe-indexed timing
//! - RNTI types
//! - Common macros and debug utilities

pub mod bitbuffer;
pub mod debug;
pub mod pdu_parse_error;
pub mod rnti;
pub mod tti;

// Re-export commonly used items
pub use bitbuffer::BitBuffer;
pub use pdu_parse_error::PduParseErr;
pub use rnti::{Rnti, RntiType};
pub use tti::Tti;

/// 48-bit UE contention resolution identity, carried in the low bits
pub type ContentionId = u64;

/// Mask for the 48 significant bits of a ContentionId
pub const CONTENTION_ID_MASK: u64 = 0xFFFF_FFFF_FFFF;
