//! # Token Subcommand
//!
//! Offline operations on checkpoint token payloads. Useful at a gate whose
//! scanner has lost connectivity, and for checking what a printed code
//! actually carries.
//!
//! Nothing here touches a store: `decode` proves a payload is well formed,
//! not that it names an approved request.
//!
//! Exit status: 0 on success (and "on time" for `check-late`), 1 when
//! `check-late` finds the return late, 2 on any error.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use outpass_checkpoint::{decode, decode_manual, CheckpointToken};
use outpass_core::{PrincipalId, RequestId, Timestamp};

/// `check-late` found the return on time, or the command succeeded.
pub const EXIT_OK: u8 = 0;
/// `check-late` found the return late.
pub const EXIT_LATE: u8 = 1;
/// The command failed: bad input, unreadable file, malformed payload.
pub const EXIT_ERROR: u8 = 2;

/// Arguments for the `outpass token` subcommand.
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Build a payload from its fields.
    Encode {
        /// Outpass request id.
        #[arg(long)]
        outpass_id: RequestId,
        /// Resident the request belongs to.
        #[arg(long)]
        student_id: PrincipalId,
        /// Approved destination.
        #[arg(long)]
        destination: String,
        /// Window start (RFC 3339).
        #[arg(long)]
        from: String,
        /// Window end (RFC 3339).
        #[arg(long)]
        to: String,
    },

    /// Decode a payload and print it as pretty JSON.
    Decode {
        #[command(flatten)]
        input: PayloadInput,
    },

    /// Report whether a return at `--at` would be late for a payload.
    CheckLate {
        #[command(flatten)]
        input: PayloadInput,
        /// Instant of the return (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}

/// Where a payload comes from: an argument, a file, or stdin.
#[derive(Args, Debug, Default)]
pub struct PayloadInput {
    /// The payload text. Read from stdin when neither this nor `--file` is given.
    #[arg(value_name = "PAYLOAD", conflicts_with = "file")]
    pub payload: Option<String>,
    /// Read the payload from a file.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl PayloadInput {
    /// Resolve and decode the payload. Surrounding whitespace is tolerated,
    /// as for manual entry at the gate.
    fn token(&self) -> Result<CheckpointToken> {
        let raw = self.read()?;
        decode_manual(&raw).context("payload is not a valid checkpoint token")
    }

    fn read(&self) -> Result<String> {
        match (&self.payload, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read payload file: {}", path.display())),
            (None, None) => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read payload from stdin")?;
                Ok(buf)
            }
        }
    }
}

/// Execute the token subcommand.
pub fn run_token(args: &TokenArgs) -> Result<u8> {
    match &args.command {
        TokenCommand::Encode {
            outpass_id,
            student_id,
            destination,
            from,
            to,
        } => {
            let payload = encode_fields(*outpass_id, *student_id, destination, from, to)?;
            println!("{payload}");
            Ok(EXIT_OK)
        }

        TokenCommand::Decode { input } => {
            let token = input.token()?;
            println!("{}", pretty(&token)?);
            Ok(EXIT_OK)
        }

        TokenCommand::CheckLate { input, at } => {
            let token = input.token()?;
            let at = match at {
                Some(raw) => parse_instant(raw)?,
                None => Timestamp::now(),
            };
            let (code, line) = lateness_report(&token, at);
            println!("{line}");
            Ok(code)
        }
    }
}

/// Build and validate a payload from its fields.
///
/// The result is run back through the decoder so the CLI cannot emit a
/// payload the checkpoint would refuse.
pub fn encode_fields(
    outpass_id: RequestId,
    student_id: PrincipalId,
    destination: &str,
    from: &str,
    to: &str,
) -> Result<String> {
    let token = CheckpointToken {
        request_id: outpass_id,
        requester_id: student_id,
        destination: destination.trim().to_string(),
        window_start: parse_instant(from)?,
        window_end: parse_instant(to)?,
    };
    let payload = token.to_payload();
    decode(&payload).context("fields do not form a valid checkpoint token")?;
    Ok(payload)
}

/// Pretty JSON rendering of a decoded token.
pub fn pretty(token: &CheckpointToken) -> Result<String> {
    serde_json::to_string_pretty(token).context("failed to render token")
}

/// Exit code and report line for a return at `at`: `0` on time, `1` late.
pub fn lateness_report(token: &CheckpointToken, at: Timestamp) -> (u8, String) {
    if token.is_late_return_at(at) {
        (
            EXIT_LATE,
            format!(
                "LATE: return at {at} is after window end {} for {}",
                token.window_end, token.request_id
            ),
        )
    } else {
        (
            EXIT_OK,
            format!(
                "ON TIME: return at {at} is within window end {} for {}",
                token.window_end, token.request_id
            ),
        )
    }
}

fn parse_instant(raw: &str) -> Result<Timestamp> {
    match Timestamp::parse_lenient(raw) {
        Ok(ts) => Ok(ts),
        Err(e) => bail!("{e}"),
    }
}
