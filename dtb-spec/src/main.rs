// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod cli;
pub mod descriptor;
pub mod error;
pub mod subpackage;
pub mod template;

fn main() {
    std::process::exit(match cli::run_cli() {
        Ok(()) => 0,
        Err(error::SpecError::Clap(err)) => err.exit(),
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    });
}
