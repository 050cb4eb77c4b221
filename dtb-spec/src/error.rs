// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary error type for spec generation.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("argument parsing error: {0:?}")]
    Clap(#[from] clap::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("unknown architecture: {0} (expected one of armv6, armv7, aarch64, riscv64)")]
    UnknownArchitecture(String),

    #[error("unable to open template {0}: {1:?}")]
    TemplateOpen(String, std::io::Error),

    #[error("I/O error reading template {0}: {1:?}")]
    TemplateRead(String, std::io::Error),

    #[error("unable to open output file {0}: {1:?}")]
    OutputOpen(String, std::io::Error),

    #[error("I/O error writing {0}: {1:?}")]
    OutputWrite(String, std::io::Error),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, SpecError>;
