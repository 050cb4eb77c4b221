// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Email formatted patch files.

Patches look like `git format-patch` output or quilt patches: an optional
mbox `From <sha> <date>` separator line, RFC 822 headers, a blank line, the
commit message, a `---` line and finally the diff.
*/

use {
    crate::error::{FilerError, Result},
    mailparse::parse_headers,
    once_cell::sync::Lazy,
    regex::Regex,
    std::path::{Path, PathBuf},
};

/// Prefix of ticket references placed in `References:` headers.
pub const REFERENCE_PREFIX: &str = "bsc#";

/// Tag attachment summaries should start with.
pub const SUBJECT_TAG: &str = "[PATCH]";

static RE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*:").unwrap());

fn is_mbox_separator(line: &str) -> bool {
    line.starts_with("From ")
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn header_name(line: &str) -> Option<&str> {
    RE_HEADER.find(line).map(|m| &line[m.start()..m.end() - 1])
}

/// Locate the header block in a list of lines.
///
/// Returns the index of the first header line and the index of the first
/// line after the block. `None` if the patch doesn't start with a header.
fn header_span<S: AsRef<str>>(lines: &[S]) -> Option<(usize, usize)> {
    let start = match lines.first() {
        Some(line) if is_mbox_separator(line.as_ref()) => 1,
        _ => 0,
    };

    header_name(lines.get(start)?.as_ref())?;

    let end = lines[start..]
        .iter()
        .position(|line| {
            let line = line.as_ref().trim_end_matches(&['\r', '\n'][..]);
            line.is_empty() || !(is_continuation(line) || header_name(line).is_some())
        })
        .map(|i| start + i)
        .unwrap_or(lines.len());

    Some((start, end))
}

/// Split a `References:` value into its tokens.
pub fn reference_tokens(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
}

/// The reference token of a ticket.
pub fn ticket_reference(ticket: u64) -> String {
    format!("{}{}", REFERENCE_PREFIX, ticket)
}

/// Prepend [SUBJECT_TAG] to a subject unless it already carries a `[PATCH` tag.
pub fn tagged_subject(subject: &str) -> String {
    if subject.starts_with("[PATCH") {
        subject.to_string()
    } else {
        format!("{} {}", SUBJECT_TAG, subject)
    }
}

/// Push `token` unless it is already present.
fn push_unique(tokens: &mut Vec<String>, token: &str) {
    if !tokens.iter().any(|t| t == token) {
        tokens.push(token.to_string());
    }
}

/// Line terminator of a line, `\n` if it has none.
fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Rewrite the `References:` header of a patch.
///
/// Tokens of all existing `References:` headers are kept first, followed by
/// `additions`, in order and without duplicates. They are written as a single
/// header in place of the first existing one; the other existing headers
/// (including continuation lines) are removed. Without an existing header,
/// the new one is appended to the end of the header block. A patch without a
/// header block gets a header block of its own at the top. Everything else
/// is preserved byte for byte, and the new line uses the line ending of the
/// lines around it.
pub fn rewrite_references(text: &str, additions: &[String]) -> String {
    let lines = text.split_inclusive('\n').collect::<Vec<_>>();

    let mut tokens = vec![];
    let mut removed = vec![false; lines.len()];
    let mut first_existing = None;

    let (insert_at, has_headers) = match header_span(&lines) {
        Some((start, end)) => {
            let mut i = start;
            while i < end {
                let is_references = header_name(lines[i])
                    .map_or(false, |name| name.eq_ignore_ascii_case("References"));
                if !is_references {
                    i += 1;
                    continue;
                }

                let span_end = lines[i + 1..end]
                    .iter()
                    .position(|line| !is_continuation(line))
                    .map(|n| i + 1 + n)
                    .unwrap_or(end);

                let value = lines[i..span_end]
                    .iter()
                    .map(|line| line.trim())
                    .collect::<Vec<_>>()
                    .join(" ");
                let value = &value[value.find(':').map_or(0, |p| p + 1)..];
                for token in reference_tokens(value) {
                    push_unique(&mut tokens, token);
                }

                first_existing.get_or_insert(i);
                for flag in &mut removed[i..span_end] {
                    *flag = true;
                }
                i = span_end;
            }

            (first_existing.unwrap_or(end), true)
        }
        None => match lines.first() {
            Some(line) if is_mbox_separator(line) => (1, false),
            _ => (0, false),
        },
    };

    for token in additions {
        push_unique(&mut tokens, token);
    }

    let eol = first_existing
        .or_else(|| insert_at.checked_sub(1))
        .and_then(|i| lines.get(i))
        .or_else(|| lines.first())
        .map_or("\n", |line| line_ending(line));

    let mut header = format!("References: {}{}", tokens.join(" "), eol);
    if !has_headers {
        header.push_str(eol);
    }

    let mut out = String::with_capacity(text.len() + header.len() + 2);
    for i in 0..=lines.len() {
        if i == insert_at {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push_str(eol);
            }
            out.push_str(&header);
        }

        if let Some(line) = lines.get(i) {
            if !removed[i] {
                out.push_str(line);
            }
        }
    }

    out
}

/// A patch file and the fields derived from it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchRecord {
    path: PathBuf,
    text: String,
    subject: String,
    body: String,
    references: Vec<String>,
}

impl PatchRecord {
    /// Read and parse a patch file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let text = std::fs::read_to_string(path)
            .map_err(|e| FilerError::IoPath(path.display().to_string(), e))?;

        Self::parse(path.to_path_buf(), text)
    }

    /// Parse patch content that came from `path`.
    pub fn parse(path: PathBuf, text: String) -> Result<Self> {
        let lines = text.lines().collect::<Vec<_>>();

        let mut subject = None;
        let mut references = vec![];
        let mut subject_lines = None;

        if let Some((start, end)) = header_span(&lines) {
            let mut block = lines[start..end].join("\n");
            block.push_str("\n\n");

            let (headers, _) = parse_headers(block.as_bytes())
                .map_err(|e| FilerError::HeaderParse(path.display().to_string(), e))?;

            for header in &headers {
                let key = header.get_key();

                if key.eq_ignore_ascii_case("Subject") && subject.is_none() {
                    subject = Some(header.get_value().trim().to_string());
                } else if key.eq_ignore_ascii_case("References") {
                    for token in reference_tokens(&header.get_value()) {
                        push_unique(&mut references, token);
                    }
                }
            }

            if let Some(i) = (start..end).find(|i| {
                header_name(lines[*i]).map_or(false, |name| name.eq_ignore_ascii_case("Subject"))
            }) {
                let n = lines[i + 1..end]
                    .iter()
                    .take_while(|line| is_continuation(line))
                    .count();
                subject_lines = Some(i..i + 1 + n);
            }
        }

        let subject = subject
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FilerError::MissingSubject(path.display().to_string()))?;

        let body_start = match lines.first() {
            Some(line) if is_mbox_separator(line) => 1,
            _ => 0,
        };

        let body = lines
            .iter()
            .enumerate()
            .skip(body_start)
            .take_while(|(_, line)| !line.starts_with("---"))
            .filter(|(i, _)| !subject_lines.as_ref().map_or(false, |r| r.contains(i)))
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n")
            .trim_start_matches('\n')
            .trim_end()
            .to_string();

        Ok(Self {
            path,
            text,
            subject,
            body,
            references,
        })
    }

    /// Filesystem path of the patch.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full content of the patch.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Decoded value of the `Subject:` header.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Commit message: everything before the first `---` line, minus the subject.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Tokens of any existing `References:` headers.
    pub fn references(&self) -> &[String] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    const FORMAT_PATCH: &str = indoc! {"
        From 3f2a9c1d5e0b7a8c6d4e2f1a0b9c8d7e6f5a4b3c Mon Sep 17 00:00:00 2001
        From: Jane Developer <jane@example.com>
        Date: Tue, 4 Jun 2024 10:12:00 +0200
        Subject: [PATCH] arm64: dts: fix the foo
         regulator

        The foo regulator was wired to the wrong supply.

        Signed-off-by: Jane Developer <jane@example.com>
        ---
         arch/arm64/boot/dts/vendor/foo.dts | 2 +-
         1 file changed, 1 insertion(+), 1 deletion(-)

        diff --git a/arch/arm64/boot/dts/vendor/foo.dts b/arch/arm64/boot/dts/vendor/foo.dts
    "};

    const QUILT_PATCH: &str = indoc! {"
        From: Jane Developer <jane@example.com>
        Date: Tue, 4 Jun 2024 10:12:00 +0200
        Subject: scsi: fix a leak
        Patch-mainline: v6.10-rc3
        Git-commit: 0123456789abcdef0123456789abcdef01234567
        References: bsc#1,
         jsc#PED-7

        Free the buffer on the error path.
        ---
        diff --git a/drivers/scsi/x.c b/drivers/scsi/x.c
    "};

    fn parse(text: &str) -> Result<PatchRecord> {
        PatchRecord::parse(PathBuf::from("test.patch"), text.to_string())
    }

    #[test]
    fn parse_format_patch() -> Result<()> {
        let patch = parse(FORMAT_PATCH)?;

        assert_eq!(patch.subject(), "[PATCH] arm64: dts: fix the foo regulator");
        assert_eq!(
            patch.body(),
            indoc! {"
                From: Jane Developer <jane@example.com>
                Date: Tue, 4 Jun 2024 10:12:00 +0200

                The foo regulator was wired to the wrong supply.

                Signed-off-by: Jane Developer <jane@example.com>"}
        );
        assert!(patch.references().is_empty());

        Ok(())
    }

    #[test]
    fn parse_quilt_patch() -> Result<()> {
        let patch = parse(QUILT_PATCH)?;

        assert_eq!(patch.subject(), "scsi: fix a leak");
        assert_eq!(patch.references(), &["bsc#1", "jsc#PED-7"]);
        assert!(!patch.body().contains("Subject:"));
        assert!(patch.body().ends_with("Free the buffer on the error path."));
        assert!(!patch.body().contains("diff --git"));

        Ok(())
    }

    #[test]
    fn missing_subject() {
        assert!(matches!(
            parse("From: a@example.com\n\nbody\n"),
            Err(FilerError::MissingSubject(_))
        ));
        assert!(matches!(
            parse("diff --git a/x b/x\n"),
            Err(FilerError::MissingSubject(_))
        ));
    }

    #[test]
    fn subject_tag() {
        assert_eq!(tagged_subject("fix it"), "[PATCH] fix it");
        assert_eq!(tagged_subject("[PATCH] fix it"), "[PATCH] fix it");
        assert_eq!(tagged_subject("[PATCH v2 3/4] fix it"), "[PATCH v2 3/4] fix it");
    }

    #[test]
    fn references_added() {
        let text = "Subject: x\n\nbody\n";
        let out = rewrite_references(text, &[ticket_reference(123456)]);

        assert_eq!(out, "Subject: x\nReferences: bsc#123456\n\nbody\n");
        assert_eq!(
            out.lines().filter(|l| l.starts_with("References:")).collect::<Vec<_>>(),
            vec!["References: bsc#123456"]
        );
    }

    #[test]
    fn references_appended() {
        let text = "From: a@example.com\nReferences: bsc#1\nSubject: x\n\nbody\n";
        let out = rewrite_references(text, &[ticket_reference(123456)]);

        assert_eq!(
            out,
            "From: a@example.com\nReferences: bsc#1 bsc#123456\nSubject: x\n\nbody\n"
        );
    }

    #[test]
    fn references_order_and_duplicates() {
        let out = rewrite_references(
            QUILT_PATCH,
            &[
                ticket_reference(42),
                "CVE-2024-1".to_string(),
                "bsc#1".to_string(),
            ],
        );

        assert!(out.contains("\nReferences: bsc#1 jsc#PED-7 bsc#42 CVE-2024-1\n\nFree the buffer"));
        assert!(!out.contains(" jsc#PED-7\n"));
        assert_eq!(out.matches("References:").count(), 1);
    }

    #[test]
    fn references_preserve_rest() {
        let out = rewrite_references(FORMAT_PATCH, &[ticket_reference(7)]);

        assert_eq!(
            out.replace("References: bsc#7\n", ""),
            FORMAT_PATCH,
        );
        assert!(out.contains(" regulator\nReferences: bsc#7\n\nThe foo"));
    }

    #[test]
    fn references_case_insensitive_header() {
        let out = rewrite_references("references: bsc#2\n\nx\n", &[ticket_reference(3)]);
        assert_eq!(out, "References: bsc#2 bsc#3\n\nx\n");
    }

    #[test]
    fn references_headers_only() {
        let out = rewrite_references("Subject: x", &[ticket_reference(3)]);
        assert_eq!(out, "Subject: x\nReferences: bsc#3\n");
    }

    #[test]
    fn references_without_headers() {
        assert_eq!(
            rewrite_references("diff --git a/x b/x\n", &[ticket_reference(3)]),
            "References: bsc#3\n\ndiff --git a/x b/x\n"
        );
        assert_eq!(
            rewrite_references("From 0123abcd Mon Sep 17 00:00:00 2001\n---\n", &[ticket_reference(3)]),
            "From 0123abcd Mon Sep 17 00:00:00 2001\nReferences: bsc#3\n\n---\n"
        );
        assert_eq!(rewrite_references("", &[ticket_reference(3)]), "References: bsc#3\n\n");
    }

    #[test]
    fn references_merged_from_all_headers() {
        let text = "Subject: x\nReferences: bsc#1\nFrom: a@example.com\nreferences: jsc#2,\n bsc#1\n\nb\n";
        let out = rewrite_references(text, &[ticket_reference(3)]);

        assert_eq!(
            out,
            "Subject: x\nReferences: bsc#1 jsc#2 bsc#3\nFrom: a@example.com\n\nb\n"
        );
    }

    #[test]
    fn references_existing_duplicates_dropped() {
        let out = rewrite_references("References: bsc#1 bsc#1\n\nb\n", &[ticket_reference(2)]);
        assert_eq!(out, "References: bsc#1 bsc#2\n\nb\n");

        let patch = parse("Subject: x\nReferences: bsc#1 bsc#1\nReferences: bsc#1\n\nb\n")
            .unwrap();
        assert_eq!(patch.references(), &["bsc#1"]);
    }

    #[test]
    fn references_keep_crlf_line_endings() {
        let out = rewrite_references("Subject: x\r\n\r\nbody\r\n", &[ticket_reference(3)]);
        assert_eq!(out, "Subject: x\r\nReferences: bsc#3\r\n\r\nbody\r\n");

        let out = rewrite_references(
            "Subject: x\r\nReferences: bsc#1,\r\n bsc#2\r\n\r\nbody\r\n",
            &[ticket_reference(3)],
        );
        assert_eq!(
            out,
            "Subject: x\r\nReferences: bsc#1 bsc#2 bsc#3\r\n\r\nbody\r\n"
        );
        assert!(!out.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn read_from_path() -> Result<()> {
        let td = tempfile::TempDir::new()?;
        let path = td.path().join("0001-fix.patch");
        std::fs::write(&path, QUILT_PATCH)?;

        let patch = PatchRecord::from_path(&path)?;
        assert_eq!(patch.path(), path);
        assert_eq!(patch.text(), QUILT_PATCH);

        assert!(matches!(
            PatchRecord::from_path(td.path().join("missing.patch")),
            Err(FilerError::IoPath(_, _))
        ));

        Ok(())
    }
}
