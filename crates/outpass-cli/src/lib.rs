//! # outpass-cli: CLI Tool for the Outpass Stack
//!
//! Provides the `outpass` command-line interface.
//!
//! ## Subcommands
//!
//! - `outpass token encode`: build a checkpoint payload from its fields.
//! - `outpass token decode`: decode a payload (argument, `--file`, or stdin).
//! - `outpass token check-late`: would a return at `--at` be late?
//!
//! ```bash
//! outpass token decode --file code.json
//! echo "$PAYLOAD" | outpass token check-late --at 2024-01-01T19:00:00Z
//! ```

pub mod token;
