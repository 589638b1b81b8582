//! Definitions for encoding/decoding NFSv3 calls and replies (RFC 1813).
mod consts;
pub mod procs;
mod types;

pub use consts::*;
pub use types::*;
