// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Synthesis of RPM directives for `dtb-*` sub-packages. */

use {
    crate::descriptor::{legacy_provides, ArchFamily, PackageDescriptor},
    once_cell::sync::Lazy,
    regex::Regex,
    std::{collections::HashSet, fmt::Write},
};

/// Matches a `.dts` file extension but not `.dtsi`.
static RE_DTS_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.dts\b").unwrap());

/// Scriptlet run after a sub-package is installed.
///
/// Older packages shipped `/boot/dtb` as a symlink. On first install it is
/// replaced by a real directory so the blobs of multiple kernels can live in it.
const POST_INSTALL: &str = r#"cd /boot
if [ "$1" = 1 ] && [ -L dtb ]; then
    rm -f dtb
    mkdir dtb
fi
"#;

/// Derive the compiled blob pattern from a `.dts` source pattern.
pub fn binary_pattern(source_pattern: &str) -> String {
    RE_DTS_EXTENSION
        .replace_all(source_pattern, ".dtb")
        .into_owned()
}

/// Directories a set of source globs places files in, root to leaf.
///
/// `a/b/c.dts` yields `a` and `a/b`. Directories shared by multiple globs
/// are emitted once. Empty and `.` path segments are not directories.
pub fn owned_directories<'a>(globs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dirs = vec![];

    for glob in globs {
        let segments = glob.split('/').collect::<Vec<_>>();

        let mut prefix = String::new();
        for segment in &segments[..segments.len() - 1] {
            if segment.is_empty() || *segment == "." {
                continue;
            }

            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            if seen.insert(prefix.clone()) {
                dirs.push(prefix.clone());
            }
        }
    }

    dirs
}

/// Render the `%package`, `%description`, `%post` and `%files` sections of a sub-package.
pub fn subpackage_block(family: ArchFamily, descriptor: &PackageDescriptor) -> String {
    let name = descriptor.name;
    let mut s = String::new();

    // Writing to a String cannot fail.
    writeln!(s, "%package -n {}", name).unwrap();
    writeln!(s, "Summary: {}", descriptor.description).unwrap();
    writeln!(s, "Group: System/Boot").unwrap();
    writeln!(s, "Provides: multiversion(dtb)").unwrap();
    writeln!(s, "Requires(post): coreutils").unwrap();
    for alias in legacy_provides(family, name) {
        writeln!(s, "Provides: {} = %version-%release", alias).unwrap();
    }
    writeln!(s).unwrap();

    writeln!(s, "%description -n {}", name).unwrap();
    writeln!(s, "Device Tree files for {}.", descriptor.description).unwrap();
    writeln!(s).unwrap();

    writeln!(s, "%post -n {}", name).unwrap();
    s.push_str(POST_INSTALL);
    writeln!(s).unwrap();

    writeln!(s, "%files -n {}", name).unwrap();
    writeln!(s, "%defattr(-,root,root)").unwrap();
    writeln!(s, "%ghost /boot/dtb").unwrap();
    writeln!(s, "%dir %{{dtbdir}}").unwrap();
    for dir in owned_directories(descriptor.source_globs()) {
        writeln!(s, "%dir %{{dtbdir}}/{}", dir).unwrap();
    }
    for glob in descriptor.source_globs().map(binary_pattern) {
        writeln!(s, "%{{dtbdir}}/{}", glob).unwrap();
    }
    writeln!(s).unwrap();

    s
}

/// Text accumulated over all sub-packages of a family.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubpackageSet {
    /// Concatenated sub-package blocks, in table order.
    pub description: String,

    /// Space delimited source patterns, in table order.
    pub all_supported_dtb: String,
}

impl SubpackageSet {
    /// Aggregate the blocks of every descriptor.
    pub fn new(family: ArchFamily, descriptors: &[PackageDescriptor]) -> Self {
        let mut description = String::new();
        let mut patterns = vec![];

        for descriptor in descriptors {
            description.push_str(&subpackage_block(family, descriptor));
            patterns.push(descriptor.source_pattern);
        }

        Self {
            description,
            all_supported_dtb: patterns.join(" "),
        }
    }
}
