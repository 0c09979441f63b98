// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations for the `tether` binary.

pub mod listen;
pub mod send;

use std::io::Write;

use tether_core::Envelope;

use crate::error::Result;

/// Write one envelope as a JSON line to stdout.
fn print_envelope(envelope: &Envelope) -> Result<()> {
    print_line(&envelope.to_json()?)
}

fn print_line(line: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
