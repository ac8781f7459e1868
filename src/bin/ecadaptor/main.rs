//! Command-line driver replaying recorded changesets through the adaptor.
#![forbid(unsafe_code)]

mod config;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ecadaptor::{
    AdaptorError, CatalogStore, ChangeOp, ChangesetAdaptor, FilterConfig, MapCache,
    RecordedChangeset,
};
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{CliConfig, ConfigError};

#[derive(Parser, Debug)]
#[command(
    name = "ecadaptor",
    version,
    about = "Adapts row-level changesets into class-aware instances",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "ECADAPTOR_CONFIG",
        value_name = "FILE",
        help = "Config file with filters and profiles"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Profile to apply from the config file")]
    profile: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Json,
        help = "Output format for instances"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one instance per accepted change.
    Dump(DumpCmd),
    /// List the class ids derived from a class name.
    Derived {
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(value_name = "SCHEMA.CLASS")]
        class: String,
    },
}

#[derive(Args, Debug)]
struct DumpCmd {
    #[arg(value_name = "CATALOG", help = "Catalog database")]
    catalog: PathBuf,

    #[arg(value_name = "CHANGES", help = "Recorded changes as JSON lines")]
    changes: PathBuf,

    #[arg(long = "table", value_name = "TABLE", help = "Accept only this table (repeatable)")]
    tables: Vec<String>,

    #[arg(long = "op", value_enum, help = "Accept only this operation (repeatable)")]
    ops: Vec<OpArg>,

    #[arg(
        long = "class",
        value_name = "SCHEMA.CLASS",
        help = "Accept only this class and its subclasses (repeatable)"
    )]
    classes: Vec<String>,

    #[arg(long, help = "Fail on array properties instead of skipping them")]
    strict_arrays: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OpArg {
    Inserted,
    Updated,
    Deleted,
}

impl From<OpArg> for ChangeOp {
    fn from(value: OpArg) -> Self {
        match value {
            OpArg::Inserted => ChangeOp::Inserted,
            OpArg::Updated => ChangeOp::Updated,
            OpArg::Deleted => ChangeOp::Deleted,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Adaptor(#[from] AdaptorError),
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to open catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecadaptor=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone())?;
    if let Some(path) = config.path() {
        tracing::debug!(path = %path.display(), "config path");
    }

    match cli.command {
        Command::Dump(cmd) => {
            let mut profile = config.resolve(cli.profile.as_deref())?;
            profile.filters.merge(&FilterConfig {
                tables: cmd.tables.clone(),
                ops: cmd.ops.iter().copied().map(ChangeOp::from).collect(),
                classes: cmd.classes.clone(),
            });
            if cmd.strict_arrays {
                profile.options.fail_on_array_properties = true;
            }
            run_dump(&cmd, profile, cli.format)
        }
        Command::Derived { catalog, class } => {
            let cache = MapCache::new(open_catalog(&catalog)?);
            let mut ids = cache.derived_classes(&class)?;
            ids.sort();
            let mut out = io::stdout().lock();
            for id in ids {
                writeln!(out, "{id}")?;
            }
            Ok(())
        }
    }
}

fn run_dump(cmd: &DumpCmd, profile: config::Profile, format: OutputFormat) -> Result<(), CliError> {
    let store = open_catalog(&cmd.catalog)?;
    let file = File::open(&cmd.changes).map_err(|source| CliError::Open {
        path: cmd.changes.clone(),
        source,
    })?;
    let reader = RecordedChangeset::from_json_lines(BufReader::new(file))?
        .with_store(store)
        .disable_schema_check();

    let mut adaptor = ChangesetAdaptor::with_options(reader, profile.options)?;
    adaptor.apply_filters(&profile.filters);

    let mut out = io::stdout().lock();
    let mut produced = 0u64;
    while adaptor.step()? {
        if let Some(instance) = adaptor.instance() {
            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(instance)?)?,
                OutputFormat::Pretty => {
                    writeln!(out, "{}", serde_json::to_string_pretty(instance)?)?
                }
            }
            produced += 1;
        }
    }
    let stats = adaptor.map_cache().stats();
    info!(
        instances = produced,
        table_hits = stats.table_hits,
        table_misses = stats.table_misses,
        class_hits = stats.class_hits,
        class_misses = stats.class_misses,
        "changeset adapted"
    );
    adaptor.close();
    Ok(())
}

fn open_catalog(path: &Path) -> Result<Rc<dyn CatalogStore>, CliError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |source| CliError::Catalog {
            path: path.to_path_buf(),
            source,
        },
    )?;
    Ok(Rc::new(conn))
}
