//! Common types for the ethtx transaction decoder.
//!
//! This crate holds the plain data shared by the decoder library and its
//! command-line front end: fixed-size byte aliases, the transaction type
//! discriminator, raw signature values and the error taxonomy.
//!
//! Nothing here validates anything. Checks happen in `ethtx` when a
//! transaction is decoded or its sender recovered.

pub mod error;
pub mod types;

pub use error::{EncodingError, SignatureError, TxError};
pub use types::*;

/// Maximum accepted raw transaction size (2 MiB).
pub const MAX_TX_SIZE: usize = 2 * 1024 * 1024;
