use anyhow::{bail, Context, Result};
use azdisk::azure::http::format_api_error;
use azdisk::config::{Config, Overrides};
use azdisk::resource::{plan, DiskConfig, DiskError, DiskResourceHandler, DiskSpec, DiskState};
use azdisk::VERSION;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage Azure managed disks declaratively
#[derive(Parser, Debug)]
#[command(name = "azdisk", version = VERSION, about, long_about = None)]
struct Args {
    /// Azure subscription to use
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// Resource Manager endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the disk described by a YAML or JSON file
    Apply {
        config: PathBuf,
        /// State file holding the attributes of the managed disk
        #[arg(long)]
        state: Option<PathBuf>,
        /// Allow destroying and recreating the disk
        #[arg(long)]
        replace: bool,
    },
    /// Print the current attributes of a disk
    Read { id: String },
    /// Adopt an existing disk into a state file
    Import {
        id: String,
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Delete a disk
    Delete { id: String },
    /// Print the resource schema
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azdisk {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azdisk").join("azdisk.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azdisk").join("azdisk.log");
    }
    PathBuf::from("azdisk.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let result = run(args).await;
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
        if let Some(api) = err.downcast_ref::<DiskError>().and_then(DiskError::api_error) {
            eprintln!("hint: {}", format_api_error(api));
        }
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let overrides = Overrides {
        subscription_id: args.subscription.clone(),
        endpoint: args.endpoint.clone(),
    };

    if let Command::Schema = args.command {
        print_schema();
        return Ok(());
    }

    let handler = config.build_handler(&overrides)?;

    match args.command {
        Command::Apply {
            config,
            state,
            replace,
        } => apply(&handler, &config, state.as_deref(), replace).await,
        Command::Read { id } => {
            match handler.read(&id).await? {
                Some(disk) => print_state(&disk)?,
                None => eprintln!("Managed Disk {} does not exist", id),
            }
            Ok(())
        },
        Command::Import { id, state } => {
            let disk = handler.import(&id).await?;
            if let Some(path) = state {
                write_state(&path, &disk)?;
            }
            print_state(&disk)
        },
        Command::Delete { id } => {
            handler.delete(&id).await?;
            eprintln!("Managed Disk {} deleted", id);
            Ok(())
        },
        Command::Schema => Ok(()),
    }
}

async fn apply(
    handler: &DiskResourceHandler,
    config_path: &Path,
    state_path: Option<&Path>,
    allow_replace: bool,
) -> Result<()> {
    let desired = read_disk_config(config_path)?;
    let spec = DiskSpec::try_from(&desired)?;

    let prior = match state_path.filter(|p| p.exists()) {
        Some(path) => Some(read_disk_config(path)?),
        None => None,
    };

    // Refresh tracked state; a disk deleted out of band is created again
    let current = match prior.as_ref().and_then(|p| p.id.as_deref()) {
        Some(id) => handler.read(id).await?,
        None => None,
    };

    let disk = match current {
        None => handler.create_or_update(&spec, true).await?,
        Some(current) => {
            let changes = plan(handler.schema(), &DiskConfig::from(&current), &desired);

            if changes.is_noop() {
                eprintln!("Managed Disk {} is up to date", current.id);
                current
            } else if changes.requires_replacement() {
                if !allow_replace {
                    bail!(
                        "changing {} requires replacing Managed Disk {}; rerun with --replace",
                        changes.replace.join(", "),
                        current.id
                    );
                }
                eprintln!("Replacing Managed Disk {} ({})", current.id, changes.replace.join(", "));
                handler.delete(&current.id).await?;
                handler.create_or_update(&spec, true).await?
            } else {
                eprintln!("Updating Managed Disk {} ({})", current.id, changes.changed.join(", "));
                handler.create_or_update(&spec, false).await?
            }
        },
    };

    if let Some(path) = state_path {
        write_state(path, &disk)?;
    }
    print_state(&disk)
}

fn read_disk_config(path: &Path) -> Result<DiskConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn write_state(path: &Path, disk: &DiskState) -> Result<()> {
    let content = serde_json::to_string_pretty(&DiskConfig::from(disk))?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Wrote state for {} to {:?}", disk.id, path);
    Ok(())
}

fn print_state(disk: &DiskState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&DiskConfig::from(disk))?);
    Ok(())
}

fn print_schema() {
    let schema = azdisk::resource::managed_disk_schema();
    println!(
        "{} ({}/{}, api-version {})",
        schema.display_name, schema.namespace, schema.resource_type, schema.api_version
    );

    for (name, def) in &schema.attributes {
        let mut flags = Vec::new();
        if def.required {
            flags.push("required");
        }
        if def.computed {
            flags.push("computed");
        }
        if def.force_new {
            flags.push("force-new");
        }
        if def.case_insensitive {
            flags.push("case-insensitive");
        }
        println!("  {:<24} {:<8} {}", name, format!("{:?}", def.kind).to_lowercase(), flags.join(", "));
    }

    let timeouts = schema.default_timeouts();
    println!(
        "timeouts: create {}m, read {}m, update {}m, delete {}m",
        timeouts.create.as_secs() / 60,
        timeouts.read.as_secs() / 60,
        timeouts.update.as_secs() / 60,
        timeouts.delete.as_secs() / 60
    );
}
