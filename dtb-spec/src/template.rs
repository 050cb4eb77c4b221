// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Placeholder substitution into spec file templates.

Templates are plain RPM spec files containing `@PLACEHOLDER@` tokens. Only
the tokens listed in [PLACEHOLDERS] are replaced; anything else, including
other `@WORD@` tokens used by later build stages, passes through verbatim.
*/

use {
    crate::{
        descriptor::{ArchFamily, PackageDescriptor},
        error::{Result, SpecError},
        subpackage::SubpackageSet,
    },
    log::info,
    once_cell::sync::Lazy,
    regex::{Captures, Regex},
    std::{
        borrow::Cow,
        io::{BufRead, BufReader, Write},
        path::{Path, PathBuf},
    },
};

/// Placeholder names recognized in templates, without the surrounding `@`.
pub const PLACEHOLDERS: [&str; 6] = [
    "NAME",
    "ARCH",
    "EXCLUSIVE_ARCH",
    "DTS_ARCH",
    "ALL_SUPPORTED_DTB",
    "SUBPKG_DESC",
];

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("@({})@", PLACEHOLDERS.join("|"))).unwrap());

/// Values substituted into a template for one architecture family.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateValues {
    pub name: String,
    pub arch: String,
    pub exclusive_arch: String,
    pub dts_arch: String,
    pub all_supported_dtb: String,
    pub subpkg_desc: String,
}

impl TemplateValues {
    /// Compute values for a family from an explicit descriptor list.
    pub fn new(family: ArchFamily, descriptors: &[PackageDescriptor]) -> Self {
        let subpackages = SubpackageSet::new(family, descriptors);

        Self {
            name: family.package_name().to_string(),
            arch: family.selector().to_string(),
            exclusive_arch: family.exclusive_arch().to_string(),
            dts_arch: family.dts_arch().to_string(),
            all_supported_dtb: subpackages.all_supported_dtb,
            subpkg_desc: subpackages.description,
        }
    }

    /// Compute values for a family from its built-in descriptor table.
    pub fn for_family(family: ArchFamily) -> Self {
        Self::new(family, family.descriptors())
    }

    /// Resolve the value of a placeholder name.
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "NAME" => Some(&self.name),
            "ARCH" => Some(&self.arch),
            "EXCLUSIVE_ARCH" => Some(&self.exclusive_arch),
            "DTS_ARCH" => Some(&self.dts_arch),
            "ALL_SUPPORTED_DTB" => Some(&self.all_supported_dtb),
            "SUBPKG_DESC" => Some(&self.subpkg_desc),
            _ => None,
        }
    }
}

/// Substitute placeholders in a single template line.
///
/// Substituted values are not scanned again.
pub fn substitute_line<'a>(line: &'a str, values: &TemplateValues) -> Cow<'a, str> {
    RE_PLACEHOLDER.replace_all(line, |caps: &Captures| {
        values.get(&caps[1]).unwrap_or(&caps[0]).to_string()
    })
}

/// Render a template from a reader to a writer.
pub fn render(
    reader: impl BufRead,
    writer: &mut impl Write,
    values: &TemplateValues,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        writeln!(writer, "{}", substitute_line(&line, values))?;
    }

    Ok(())
}

/// Write the spec file of a family into `output_dir`.
///
/// Returns the path of the written file.
pub fn write_spec_file(
    template_path: &Path,
    output_dir: &Path,
    family: ArchFamily,
) -> Result<PathBuf> {
    let values = TemplateValues::for_family(family);

    let template = std::fs::File::open(template_path)
        .map_err(|e| SpecError::TemplateOpen(template_path.display().to_string(), e))?;

    // Render fully before creating the output so a bad template leaves
    // nothing behind.
    let mut content = vec![];
    render(BufReader::new(template), &mut content, &values)
        .map_err(|e| SpecError::TemplateRead(template_path.display().to_string(), e))?;

    let output_path = output_dir.join(format!("{}.spec", family.package_name()));
    let mut output = std::fs::File::create(&output_path)
        .map_err(|e| SpecError::OutputOpen(output_path.display().to_string(), e))?;

    output
        .write_all(&content)
        .map_err(|e| SpecError::OutputWrite(output_path.display().to_string(), e))?;

    info!(
        "wrote {} ({} sub-packages)",
        output_path.display(),
        family.descriptors().len()
    );

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    const TEMPLATE: &str = include_str!("../dtb.spec.in.in");

    fn foo_values() -> TemplateValues {
        TemplateValues::new(
            ArchFamily::Aarch64,
            &[PackageDescriptor::new(
                "dtb-foo",
                "vendor/foo-*.dts",
                "Foo systems",
            )],
        )
    }

    fn render_string(template: &str, values: &TemplateValues) -> String {
        let mut out = vec![];
        render(std::io::Cursor::new(template), &mut out, values).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn every_placeholder_resolves() {
        let values = foo_values();
        for name in PLACEHOLDERS {
            assert!(values.get(name).is_some(), "{}", name);
        }
        assert!(values.get("VERSION").is_none());
    }

    #[test]
    fn absent_placeholder_is_noop() {
        let values = foo_values();
        let template = "Name: kernel\n%define x @VERSION@\n";
        assert_eq!(render_string(template, &values), template);
    }

    #[test]
    fn single_placeholder_replaced_once() {
        let values = foo_values();

        assert_eq!(
            substitute_line("Name: @NAME@", &values),
            "Name: dtb-aarch64"
        );
        assert_eq!(
            substitute_line("@ARCH@ and @ARCH@", &values),
            "aarch64 and aarch64"
        );
        assert_eq!(
            substitute_line("@UNKNOWN@ARCH@", &values),
            "@UNKNOWNaarch64"
        );
    }

    #[test]
    fn values_not_rescanned() {
        let mut values = foo_values();
        values.arch = "@NAME@".to_string();

        assert_eq!(substitute_line("@ARCH@", &values), "@NAME@");
    }

    #[test]
    fn render_foo() {
        let values = foo_values();
        let template = indoc! {"
            Name: @NAME@
            ExclusiveArch: @EXCLUSIVE_ARCH@
            %build
            cd arch/@DTS_ARCH@/boot/dts
            for dts in @ALL_SUPPORTED_DTB@; do
                echo $dts
            done

            @SUBPKG_DESC@
            %changelog
        "};

        let out = render_string(template, &values);

        assert!(out.starts_with("Name: dtb-aarch64\nExclusiveArch: aarch64\n"));
        assert!(out.contains("cd arch/arm64/boot/dts\n"));
        assert!(out.contains("for dts in vendor/foo-*.dts; do\n"));
        assert!(out.contains("%package -n dtb-foo\n"));
        assert!(out.contains("Summary: Foo systems\n"));
        assert!(out.contains("%files -n dtb-foo\n"));
        assert!(out.contains("%{dtbdir}/vendor/foo-*.dtb\n"));
        assert!(out.ends_with("%changelog\n"));
        assert!(!out.contains('@'));
    }

    #[test]
    fn bundled_template() {
        for name in PLACEHOLDERS {
            assert_eq!(
                TEMPLATE.matches(&format!("@{}@", name)).count(),
                1,
                "{} appears once",
                name
            );
        }

        let out = render_string(TEMPLATE, &TemplateValues::for_family(ArchFamily::Riscv64));
        assert!(out.contains("Name:           dtb-riscv64\n"));
        assert!(out.contains("ExclusiveArch:  riscv64\n"));
        assert!(out.contains("%package -n dtb-sifive\n"));
        for name in PLACEHOLDERS {
            assert!(!out.contains(&format!("@{}@", name)));
        }
    }

    #[test]
    fn write_files() -> Result<()> {
        let td = tempfile::TempDir::new()?;
        let template_path = td.path().join("dtb.spec.in.in");
        std::fs::write(&template_path, TEMPLATE)?;

        let path = write_spec_file(&template_path, td.path(), ArchFamily::Armv7)?;
        assert_eq!(path, td.path().join("dtb-armv7l.spec"));

        let spec = std::fs::read_to_string(&path)?;
        assert!(spec.contains("ExclusiveArch:  armv7l armv7hl\n"));
        assert!(spec.contains("Provides: dtb-imx6q = %version-%release\n"));

        Ok(())
    }

    #[test]
    fn missing_template() {
        let td = tempfile::TempDir::new().unwrap();

        let res = write_spec_file(&td.path().join("missing"), td.path(), ArchFamily::Aarch64);
        assert!(matches!(res, Err(SpecError::TemplateOpen(_, _))));
        assert!(!td.path().join("dtb-aarch64.spec").exists());
    }

    #[test]
    fn missing_output_dir() {
        let td = tempfile::TempDir::new().unwrap();
        let template_path = td.path().join("dtb.spec.in.in");
        std::fs::write(&template_path, TEMPLATE).unwrap();

        let res = write_spec_file(&template_path, &td.path().join("nope"), ArchFamily::Aarch64);
        assert!(matches!(res, Err(SpecError::OutputOpen(_, _))));
    }

    #[test]
    fn unreadable_template_leaves_no_output() {
        let td = tempfile::TempDir::new().unwrap();
        let template_path = td.path().join("dtb.spec.in.in");
        std::fs::write(&template_path, b"Name: @NAME@\n\xff\xfe\n").unwrap();

        let res = write_spec_file(&template_path, td.path(), ArchFamily::Aarch64);
        assert!(matches!(
            res,
            Err(SpecError::TemplateRead(path, _)) if path == template_path.display().to_string()
        ));
        assert!(!td.path().join("dtb-aarch64.spec").exists());
    }
}
