// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        error::{FilerError, Result},
        filer::{FilerConfig, TicketFiler},
        patch::ticket_reference,
        tracker::BugzillaCli,
    },
    clap::{Arg, ArgMatches, Command},
    duct::cmd,
    log::{debug, LevelFilter},
    std::path::PathBuf,
};

const ABOUT: &str = "\
File tracker tickets for kernel patches.

For every patch file given, in order:

1. The Subject: header and the commit message (everything before the first
   `---` line) are extracted.
2. The versions of the product are queried and the latest maintenance
   version (or `unspecified`) is chosen.
3. A ticket is created, assigned to the given address.
4. The ticket (`bsc#<id>`) and any --reference values are appended to the
   patch's References: header. The patch file is rewritten in place.
5. The patch is attached to the ticket.

Processing stops at the first failure. Tickets created up to that point are
kept.

The `bugzilla` command line client performs all tracker interaction and must
already be configured with credentials.
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

/// Resolve the email address configured for Git commits.
fn git_user_email() -> Option<String> {
    let output = cmd!("git", "config", "--get", "user.email")
        .stdout_capture()
        .stderr_null()
        .unchecked()
        .run()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let email = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

/// Pick the assignee: an explicit value, else the result of `fallback`.
fn resolve_assignee(
    explicit: Option<&str>,
    fallback: impl FnOnce() -> Option<String>,
) -> Result<String> {
    match explicit {
        Some(email) => Ok(email.to_string()),
        None => {
            debug!("no assignee given; falling back to git user.email");
            fallback().ok_or(FilerError::MissingConfig(
                "assignee email (--email, BUGZILLA_ASSIGNEE or git user.email)",
            ))
        }
    }
}

/// Build the filer configuration from parsed arguments.
fn filer_config(
    matches: &ArgMatches,
    email_fallback: impl FnOnce() -> Option<String>,
) -> Result<FilerConfig> {
    let assignee = resolve_assignee(matches.value_of("email"), email_fallback)?;

    let product = matches
        .value_of("product")
        .ok_or(FilerError::MissingConfig("product (--product or BUGZILLA_PRODUCT)"))?
        .to_string();

    Ok(FilerConfig {
        product,
        assignee,
        arch: matches
            .value_of("arch")
            .expect("arch has default value")
            .to_string(),
        debug: matches.is_present("debug"),
        extra_references: matches
            .values_of("reference")
            .map(|values| values.map(|v| v.to_string()).collect::<Vec<_>>())
            .unwrap_or_default(),
    })
}

fn command() -> Command<'static> {
    let app = Command::new("bugzilla-create")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Create tracker tickets for patches and attach the patches to them")
        .long_about(ABOUT)
        .arg_required_else_help(true);

    let app = app.arg(
        Arg::new("verbose")
            .long("verbose")
            .short('v')
            .multiple_occurrences(true)
            .help("Increase logging verbosity. Can be specified multiple times."),
    );

    let app = app.arg(
        Arg::new("email")
            .long("email")
            .short('e')
            .takes_value(true)
            .env("BUGZILLA_ASSIGNEE")
            .help("Address to assign tickets to (defaults to git's user.email)"),
    );

    let app = app.arg(
        Arg::new("product")
            .long("product")
            .short('p')
            .takes_value(true)
            .env("BUGZILLA_PRODUCT")
            .help("Product to file tickets against"),
    );

    let app = app.arg(
        Arg::new("arch")
            .long("arch")
            .short('a')
            .takes_value(true)
            .default_value("All")
            .help("Hardware architecture of the tickets"),
    );

    let app = app.arg(
        Arg::new("debug")
            .long("debug")
            .short('d')
            .help("Set yourself as QA contact so nobody else is notified"),
    );

    let app = app.arg(
        Arg::new("reference")
            .long("reference")
            .short('r')
            .takes_value(true)
            .multiple_occurrences(true)
            .help("Additional References: token to add after the ticket"),
    );

    let app = app.arg(
        Arg::new("tracker_cli")
            .long("tracker-cli")
            .takes_value(true)
            .env("BUGZILLA_CLI")
            .default_value("bugzilla")
            .help("Tracker command line client to run"),
    );

    let app = app.arg(
        Arg::new("tracker_arg")
            .long("tracker-arg")
            .takes_value(true)
            .multiple_occurrences(true)
            .allow_hyphen_values(true)
            .help("Argument passed to the tracker client before each subcommand"),
    );

    app.arg(
        Arg::new("patches")
            .required(true)
            .multiple_values(true)
            .allow_invalid_utf8(true)
            .help("Patch files to file tickets for"),
    )
}

pub fn run_cli() -> Result<()> {
    let matches = command().try_get_matches()?;

    init_logging(&matches);

    let config = filer_config(&matches, git_user_email)?;

    let patches = matches
        .values_of_os("patches")
        .expect("patches argument is required")
        .map(PathBuf::from)
        .collect::<Vec<_>>();

    let tracker = BugzillaCli::with_base_args(
        matches
            .value_of("tracker_cli")
            .expect("tracker_cli has default value"),
        matches
            .values_of("tracker_arg")
            .map(|values| values.map(|v| v.to_string()).collect::<Vec<_>>())
            .unwrap_or_default(),
    );

    let filer = TicketFiler::new(&tracker, config)?;
    debug!("using scratch directory {}", filer.scratch_path().display());

    for (path, ticket) in filer.file_patches(&patches)? {
        println!("{}: {}", path.display(), ticket_reference(ticket));
    }

    Ok(())
}
