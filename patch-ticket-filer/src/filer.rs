// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Filing tickets for patches.

Each patch goes through the same steps: parse, resolve the product version,
create the ticket, record the ticket in the patch's `References:` header and
attach the patch to the ticket. The first failure aborts the whole batch;
tickets already created are left alone.
*/

use {
    crate::{
        error::{FilerError, Result},
        patch::{rewrite_references, tagged_subject, ticket_reference, PatchRecord},
        tracker::{parse_ticket_id, select_version, TicketRequest, Tracker},
    },
    log::{info, warn},
    std::path::{Path, PathBuf},
    tempfile::TempDir,
};

/// Component tickets are filed against.
pub const COMPONENT: &str = "Kernel";

/// Status of newly created tickets.
pub const INITIAL_STATUS: &str = "NEW";

/// Keyword set on every ticket.
pub const KEYWORD: &str = "Patch";

/// First comment of every ticket.
pub const TICKET_COMMENT: &str = "\
This ticket tracks the inclusion of the attached kernel patch.

The patch references this ticket in its References: header.";

/// Settings shared by every ticket of a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilerConfig {
    /// Product tickets are filed against.
    pub product: String,

    /// Address tickets are assigned to.
    pub assignee: String,

    /// Hardware architecture of the tickets.
    pub arch: String,

    /// Make the assignee the QA contact, keeping the default QA contact out of the loop.
    pub debug: bool,

    /// Extra tokens appended to `References:` after the ticket reference.
    pub extra_references: Vec<String>,
}

/// Files tickets for patches in a [Tracker].
pub struct TicketFiler<'a, T: Tracker> {
    tracker: &'a T,
    config: FilerConfig,
    scratch: TempDir,
}

impl<'a, T: Tracker> TicketFiler<'a, T> {
    /// Construct an instance, creating its scratch directory.
    ///
    /// The scratch directory is removed when the instance is dropped.
    pub fn new(tracker: &'a T, config: FilerConfig) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("bugzilla-create-")
            .tempdir()?;

        Ok(Self {
            tracker,
            config,
            scratch,
        })
    }

    /// Path of the scratch directory.
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Build the ticket for a patch.
    pub fn ticket_request(&self, patch: &PatchRecord, version: &str) -> TicketRequest {
        TicketRequest {
            product: self.config.product.clone(),
            component: COMPONENT.to_string(),
            version: version.to_string(),
            summary: patch.subject().to_string(),
            comment: TICKET_COMMENT.to_string(),
            assignee: self.config.assignee.clone(),
            qa_contact: if self.config.debug {
                Some(self.config.assignee.clone())
            } else {
                None
            },
            status: INITIAL_STATUS.to_string(),
            arch: self.config.arch.clone(),
            keywords: KEYWORD.to_string(),
        }
    }

    /// File a ticket for a single patch, returning the ticket ID.
    pub fn file_patch(&self, path: &Path) -> Result<u64> {
        let patch = PatchRecord::from_path(path)?;

        let versions = self.tracker.versions(&self.config.product)?;
        let version = select_version(&versions)
            .ok_or_else(|| FilerError::NoMaintenanceVersion(self.config.product.clone()))?;

        let response = self
            .tracker
            .create(&self.ticket_request(&patch, version))?;
        let ticket = parse_ticket_id(&response)?;
        info!("{}: created {}", path.display(), ticket_reference(ticket));

        self.update_references(&patch, ticket);

        let description = tagged_subject(patch.subject());
        self.tracker
            .attach(ticket, patch.path(), &description, patch.body())?;
        info!(
            "{}: attached to {}",
            path.display(),
            ticket_reference(ticket)
        );

        Ok(ticket)
    }

    /// File tickets for patches in order, stopping at the first failure.
    pub fn file_patches(&self, paths: &[PathBuf]) -> Result<Vec<(PathBuf, u64)>> {
        let mut filed = vec![];

        for path in paths {
            let ticket = self.file_patch(path)?;
            filed.push((path.clone(), ticket));
        }

        Ok(filed)
    }

    /// Add the ticket to the patch's `References:` header.
    ///
    /// This is best effort: if the rewritten patch can't be written back, the
    /// patch is left untouched and filing continues.
    fn update_references(&self, patch: &PatchRecord, ticket: u64) {
        let mut additions = vec![ticket_reference(ticket)];
        additions.extend(self.config.extra_references.iter().cloned());

        let text = rewrite_references(patch.text(), &additions);

        if let Err(e) = self.replace_patch(patch.path(), ticket, &text) {
            warn!(
                "{}: unable to update References ({}); file left untouched",
                patch.path().display(),
                e
            );
        }
    }

    /// Stage new patch content in the scratch directory, then replace the patch with it.
    fn replace_patch(&self, path: &Path, ticket: u64, text: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "patch".to_string());
        let staged = self.scratch.path().join(format!("{}-{}", ticket, file_name));

        std::fs::write(&staged, text)
            .map_err(|e| FilerError::IoPath(staged.display().to_string(), e))?;
        std::fs::copy(&staged, path)
            .map_err(|e| FilerError::IoPath(path.display().to_string(), e))?;

        Ok(())
    }
}
