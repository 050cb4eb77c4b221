// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        descriptor::{legacy_provides, ArchFamily},
        error::Result,
        template::write_spec_file,
    },
    clap::{Arg, ArgMatches, Command},
    log::LevelFilter,
    std::path::Path,
    strum::IntoEnumIterator,
};

const ABOUT: &str = "\
Generate RPM spec files for device tree blob packages.

For every selected architecture family, each entry of the family's built-in
sub-package table is expanded into `%package`, `%description`, `%post` and
`%files` sections. The result is substituted into a template, producing
`dtb-<arch>.spec` in the output directory.

The following placeholders are replaced in the template:

@NAME@
   Name of the generated package (e.g. `dtb-aarch64`).
@ARCH@
   The architecture family selector (e.g. `aarch64`).
@EXCLUSIVE_ARCH@
   Value for the `ExclusiveArch` tag.
@DTS_ARCH@
   Kernel source architecture containing the `.dts` files.
@ALL_SUPPORTED_DTB@
   Space delimited list of all `.dts` source patterns.
@SUBPKG_DESC@
   All sub-package sections.

Other `@WORD@` tokens are copied verbatim.

Architecture families: armv6, armv7, aarch64, riscv64. If none is given, all
families are generated.
";

fn init_logging(matches: &ArgMatches) {
    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

pub fn run_cli() -> Result<()> {
    let app = Command::new("mkspec-dtb")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate spec files for device tree blob packages")
        .long_about(ABOUT);

    let app = app.arg(
        Arg::new("verbose")
            .long("verbose")
            .short('v')
            .multiple_occurrences(true)
            .help("Increase logging verbosity. Can be specified multiple times."),
    );

    let app = app.arg(
        Arg::new("template")
            .long("template")
            .takes_value(true)
            .default_value("dtb.spec.in.in")
            .allow_invalid_utf8(true)
            .help("Path to the spec file template"),
    );

    let app = app.arg(
        Arg::new("output_dir")
            .long("output-dir")
            .takes_value(true)
            .default_value(".")
            .allow_invalid_utf8(true)
            .help("Directory to write spec files to"),
    );

    let app = app.arg(
        Arg::new("list")
            .long("list")
            .help("Print the sub-package tables instead of writing spec files"),
    );

    let app = app.arg(
        Arg::new("arch")
            .multiple_values(true)
            .possible_values(["armv6", "armv7", "aarch64", "riscv64"])
            .help("Architecture families to generate"),
    );

    let matches = app.try_get_matches()?;

    init_logging(&matches);

    let families = match matches.values_of("arch") {
        Some(values) => values
            .map(|v| v.parse::<ArchFamily>())
            .collect::<Result<Vec<_>>>()?,
        None => ArchFamily::iter().collect::<Vec<_>>(),
    };

    if matches.is_present("list") {
        print_tables(&families);
        return Ok(());
    }

    let template = Path::new(
        matches
            .value_of_os("template")
            .expect("template has default value"),
    );
    let output_dir = Path::new(
        matches
            .value_of_os("output_dir")
            .expect("output_dir has default value"),
    );

    for family in families {
        write_spec_file(template, output_dir, family)?;
    }

    Ok(())
}

fn print_tables(families: &[ArchFamily]) {
    for family in families {
        println!("{} ({}):", family, family.package_name());

        for d in family.descriptors() {
            println!("  {}: {} ({})", d.name, d.source_pattern, d.description);

            let aliases = legacy_provides(*family, d.name);
            if !aliases.is_empty() {
                println!("    provides: {}", aliases.join(", "));
            }
        }
    }
}
