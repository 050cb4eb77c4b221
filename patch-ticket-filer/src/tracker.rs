// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interaction with the issue tracker.

The [Tracker] trait abstracts the three operations ticket filing needs.
[BugzillaCli] implements it by running the `bugzilla` command line client,
which is expected to be configured with credentials already.
*/

use {
    crate::error::{FilerError, Result},
    duct::cmd,
    log::debug,
    std::path::Path,
};

/// Fields of a ticket to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TicketRequest {
    pub product: String,
    pub component: String,
    pub version: String,
    pub summary: String,
    pub comment: String,
    pub assignee: String,
    pub qa_contact: Option<String>,
    pub status: String,
    pub arch: String,
    pub keywords: String,
}

/// An issue tracker that tickets can be filed in.
pub trait Tracker {
    /// Obtain the active versions of a product, in tracker order.
    fn versions(&self, product: &str) -> Result<Vec<String>>;

    /// Create a ticket.
    ///
    /// Returns the raw response of the tracker, which should be the new ticket's ID.
    fn create(&self, request: &TicketRequest) -> Result<String>;

    /// Attach a file to a ticket.
    fn attach(&self, ticket: u64, path: &Path, description: &str, comment: &str) -> Result<()>;
}

/// Choose the version new tickets of a product are filed against.
///
/// This is the last version mentioning "maintenance", falling back to `unspecified`.
pub fn select_version(versions: &[String]) -> Option<&str> {
    versions
        .iter()
        .rev()
        .find(|v| v.to_ascii_lowercase().contains("maintenance"))
        .or_else(|| {
            versions
                .iter()
                .find(|v| v.eq_ignore_ascii_case("unspecified"))
        })
        .map(|v| v.as_str())
}

/// Parse the response of a ticket creation into a ticket ID.
pub fn parse_ticket_id(response: &str) -> Result<u64> {
    match response.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(FilerError::NonNumericTicketId(response.trim().to_string())),
    }
}

/// A [Tracker] backed by the `bugzilla` command line client.
#[derive(Clone, Debug)]
pub struct BugzillaCli {
    program: String,
    /// Arguments placed before every subcommand (e.g. `--bugzilla <url>`).
    base_args: Vec<String>,
}

impl BugzillaCli {
    pub fn new(program: impl ToString) -> Self {
        Self::with_base_args(program, vec![])
    }

    pub fn with_base_args(program: impl ToString, base_args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            base_args,
        }
    }

    /// Arguments to list the versions of a product.
    pub fn versions_args(product: &str) -> Vec<String> {
        vec!["info".into(), "--versions".into(), product.into()]
    }

    /// Arguments to create a ticket, printing only its ID.
    pub fn create_args(request: &TicketRequest) -> Vec<String> {
        let mut args = vec![
            "new".to_string(),
            format!("--product={}", request.product),
            format!("--component={}", request.component),
            format!("--version={}", request.version),
            format!("--summary={}", request.summary),
            format!("--comment={}", request.comment),
            format!("--assigned_to={}", request.assignee),
            format!("--status={}", request.status),
            format!("--arch={}", request.arch),
            format!("--keywords={}", request.keywords),
        ];

        if let Some(qa_contact) = &request.qa_contact {
            args.push(format!("--qa_contact={}", qa_contact));
        }

        args.push("--outputformat=%{bug_id}".to_string());

        args
    }

    /// Arguments to attach a file to a ticket.
    pub fn attach_args(ticket: u64, path: &Path, description: &str, comment: &str) -> Vec<String> {
        vec![
            "attach".to_string(),
            format!("--file={}", path.display()),
            "--type=text/plain".to_string(),
            format!("--description={}", description),
            format!("--comment={}", comment),
            ticket.to_string(),
        ]
    }

    fn run(&self, subcommand: &'static str, args: Vec<String>) -> Result<String> {
        let args = self
            .base_args
            .iter()
            .cloned()
            .chain(args)
            .collect::<Vec<_>>();
        debug!("running {} {:?}", self.program, args);

        let output = cmd(self.program.as_str(), &args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| FilerError::IoPath(self.program.clone(), e))?;

        if !output.status.success() {
            return Err(FilerError::TrackerCommand {
                program: self.program.clone(),
                subcommand,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Tracker for BugzillaCli {
    fn versions(&self, product: &str) -> Result<Vec<String>> {
        let stdout = self.run("info", Self::versions_args(product))?;

        Ok(stdout
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect::<Vec<_>>())
    }

    fn create(&self, request: &TicketRequest) -> Result<String> {
        self.run("new", Self::create_args(request))
    }

    fn attach(&self, ticket: u64, path: &Path, description: &str, comment: &str) -> Result<()> {
        self.run(
            "attach",
            Self::attach_args(ticket, path, description, comment),
        )?;

        Ok(())
    }
}
