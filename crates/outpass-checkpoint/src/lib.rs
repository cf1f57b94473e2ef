//! # outpass-checkpoint: Checkpoint Token Codec
//!
//! Pure encoding and decoding of the payload an approved outpass carries to
//! the gate. See [`codec`] for the wire format.

pub mod codec;

pub use codec::{decode, decode_manual, encode, CheckpointToken, TokenError, MAX_TOKEN_BYTES};
