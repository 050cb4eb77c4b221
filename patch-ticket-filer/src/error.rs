// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary error type for ticket filing.
#[derive(Debug, Error)]
pub enum FilerError {
    #[error("argument parsing error: {0:?}")]
    Clap(#[from] clap::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("header parse error in {0}: {1}")]
    HeaderParse(String, mailparse::MailParseError),

    #[error("patch {0} has no Subject header")]
    MissingSubject(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("{program} {subcommand} failed ({status}): {stderr}")]
    TrackerCommand {
        program: String,
        subcommand: &'static str,
        status: String,
        stderr: String,
    },

    #[error("product {0} has no maintenance or unspecified version")]
    NoMaintenanceVersion(String),

    #[error("ticket creation returned a non-numeric ID: {0:?}")]
    NonNumericTicketId(String),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, FilerError>;
