use clap::{Parser, Subcommand, crate_version};
use convenient_reload::ReloadConfig;
use std::path::PathBuf;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Options for the application.
#[derive(Parser)]
#[clap(version = crate_version!(), about = "Dependency-ordered module reload tracking")]
struct Opts {
    /// Source roots to track (repeatable, or comma separated in the env var)
    #[clap(short, long = "root", env = "RELOAD_ROOTS", value_delimiter = ',')]
    roots: Vec<PathBuf>,

    /// JSON configuration file; command line options are applied on top
    #[clap(short, long, env = "RELOAD_CONFIG")]
    config: Option<PathBuf>,

    /// Tracked source file extension (repeatable, replaces the defaults)
    #[clap(short, long = "ext")]
    extensions: Vec<String>,

    /// Ignore module references starting with this prefix (repeatable)
    #[clap(short = 'x', long = "external-prefix")]
    external_prefixes: Vec<String>,

    /// Library directory outside the roots (repeatable)
    #[clap(short = 'l', long = "library-path")]
    library_paths: Vec<PathBuf>,

    /// Reader-conditional platform key, e.g. clj or cljs (repeatable,
    /// replaces the defaults)
    #[clap(short, long = "feature")]
    features: Vec<String>,

    /// Log level: error, warn, info or debug
    #[clap(long, default_value = "warn", env = "RELOAD_LOG")]
    log_level: String,

    /// Print debug information
    #[clap(short)]
    debug: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check once and print the modules to reload, one per line
    Check {
        /// Snapshot file to compare against and update afterwards
        #[clap(short, long, env = "RELOAD_SNAPSHOT")]
        snapshot: Option<PathBuf>,
    },
    /// Poll for changes and print each reload order
    Watch {
        /// Milliseconds between checks
        #[clap(short, long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Print every module in dependency order
    Graph {
        /// Dump the dependency edges as JSON instead
        #[clap(long)]
        json: bool,
    },
}

/// Gets the log level enum variant from a level string.
///
/// Unknown strings fall back to `INFO`.
pub fn get_log_level(level: &str) -> Level {
    match level.to_uppercase().as_ref() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" | "FATAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the tracker configuration from the config file and options.
fn load_config(opts: &Opts) -> Result<ReloadConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &opts.config {
        Some(path) => ReloadConfig::from_json_file(path)?,
        None => ReloadConfig::default(),
    };

    config.roots.extend(opts.roots.iter().cloned());
    if !opts.extensions.is_empty() {
        config = config.with_extensions(&opts.extensions);
    }
    if !opts.features.is_empty() {
        config = config.with_features(&opts.features);
    }
    for prefix in &opts.external_prefixes {
        config = config.with_external_prefix(prefix);
    }
    for path in &opts.library_paths {
        config = config.with_library_path(path);
    }

    if config.roots.is_empty() {
        return Err("no source roots given (use --root or RELOAD_ROOTS)".into());
    }
    Ok(config)
}

fn run(opts: &Opts) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config(opts)?;
    match &opts.command {
        Command::Check { snapshot } => commands::check::check(config, snapshot.as_deref()),
        Command::Watch { interval_ms } => commands::watch::watch(config, *interval_ms),
        Command::Graph { json } => commands::graph::graph(config, *json),
    }
}

fn main() {
    // Get the command line arguments
    let opts: Opts = Opts::parse();

    let log_level = if opts.debug {
        "debug"
    } else {
        opts.log_level.as_str()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(get_log_level(log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    if let Err(e) = run(&opts) {
        error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
