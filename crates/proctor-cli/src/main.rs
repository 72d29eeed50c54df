mod monitor;
mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use proctor_core::{
    Clock, FaceLandmarks, MonitorConfig, SessionReport, SessionRepository, SessionService,
    SystemClock, time::unix_millis_to_iso8601,
};
use proctor_store::Store;
use uuid::Uuid;

use crate::monitor::{Sources, spawn_monitor};
use crate::replay::{JsonlReplay, SharedReplay};

#[derive(Parser)]
#[command(name = "proctor", about = "Interview integrity monitoring and scoring")]
struct Cli {
    /// Data directory (default: $PROCTOR_DATA_DIR, then ~/.proctor)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Monitor configuration file (default: <data-dir>/proctor.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and print its id
    Start {
        /// Candidate name
        name: String,
    },

    /// Append an event to a session's log
    Log {
        session: Uuid,
        /// Event type label, e.g. PHONE_DETECTED or "LOOKING_AWAY (5s)"
        event_type: String,
        /// Event time as Unix milliseconds (default: now)
        #[arg(long)]
        at: Option<u64>,
    },

    /// End a session and attach its recording reference
    Finalize { session: Uuid, recording: String },

    /// Show a session with its computed integrity score
    Show {
        session: Uuid,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List sessions, newest first
    List,

    /// Delete a session and all of its events
    Delete { session: Uuid },

    /// Write a session's report to a JSON file
    Export { session: Uuid, path: PathBuf },

    /// Run a live monitor session over replayed classifier feeds
    Monitor {
        /// Candidate name
        name: String,
        /// Face-mesh feed (JSONL, one array of faces per line)
        #[arg(long)]
        faces: Option<PathBuf>,
        /// Object-detection feed (JSONL, one array of detections per line)
        #[arg(long)]
        objects: Option<PathBuf>,
        /// Audio-level feed (JSONL, one number per line)
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Stop after this many seconds even if feeds remain
        #[arg(long)]
        duration: Option<f64>,
        /// Recording reference stored on finalize
        #[arg(long, default_value = "")]
        recording: String,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| std::env::var("PROCTOR_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(proctor_store::default_base_dir)
}

fn open_store(cli: &Cli) -> Result<Arc<Store>> {
    let dir = data_dir(cli);
    let store = proctor_store::open_in(&dir)
        .with_context(|| format!("failed to open session store in {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn open_service(cli: &Cli) -> Result<SessionService> {
    let repo: Arc<dyn SessionRepository> = open_store(cli)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(SessionService::new(repo, clock))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Start { name } => cmd_start(&cli, name),
        Commands::Log {
            session,
            event_type,
            at,
        } => cmd_log(&cli, *session, event_type, *at),
        Commands::Finalize { session, recording } => cmd_finalize(&cli, *session, recording),
        Commands::Show { session, json } => cmd_show(&cli, *session, *json),
        Commands::List => cmd_list(&cli),
        Commands::Delete { session } => cmd_delete(&cli, *session),
        Commands::Export { session, path } => cmd_export(&cli, *session, path),
        Commands::Monitor {
            name,
            faces,
            objects,
            audio,
            duration,
            recording,
            json,
        } => {
            let feeds = Feeds {
                faces: faces.as_deref(),
                objects: objects.as_deref(),
                audio: audio.as_deref(),
            };
            cmd_monitor(&cli, name, feeds, *duration, recording, *json).await
        }
    }
}

fn cmd_start(cli: &Cli, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("candidate name must not be empty");
    }
    let service = open_service(cli)?;
    let session = service.start(name).context("failed to start session")?;
    println!("{}", session.id);
    Ok(())
}

fn cmd_log(cli: &Cli, session: Uuid, event_type: &str, at: Option<u64>) -> Result<()> {
    if event_type.trim().is_empty() {
        bail!("event type must not be empty");
    }
    let service = open_service(cli)?;
    let event = service
        .append_event(session, event_type, at)
        .with_context(|| format!("failed to log event to {session}"))?;
    println!("{}", event.id);
    Ok(())
}

fn cmd_finalize(cli: &Cli, session: Uuid, recording: &str) -> Result<()> {
    let service = open_service(cli)?;
    let done = service
        .finalize(session, recording)
        .with_context(|| format!("failed to finalize {session}"))?;
    println!("finalized {}", done.id);
    Ok(())
}

fn print_report(report: &SessionReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        println!("{out}");
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn cmd_show(cli: &Cli, session: Uuid, json: bool) -> Result<()> {
    let service = open_service(cli)?;
    let report = service
        .detail(session)
        .with_context(|| format!("failed to load {session}"))?;
    print_report(&report, json)
}

fn cmd_list(cli: &Cli) -> Result<()> {
    let service = open_service(cli)?;
    let sessions = service.list().context("failed to list sessions")?;
    if sessions.is_empty() {
        println!("(no sessions)");
        return Ok(());
    }
    for s in sessions {
        let status = if s.end_time.is_some() { "done" } else { "live" };
        println!(
            "{}  {}  {:<4}  events={:<4} {}",
            s.id,
            unix_millis_to_iso8601(s.start_time),
            status,
            s.event_count,
            s.candidate_name
        );
    }
    Ok(())
}

fn cmd_delete(cli: &Cli, session: Uuid) -> Result<()> {
    let service = open_service(cli)?;
    service
        .delete(session)
        .with_context(|| format!("failed to delete {session}"))?;
    println!("deleted {session}");
    Ok(())
}

fn cmd_export(cli: &Cli, session: Uuid, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let report = proctor_store::export_report_json(&store, session, path)
        .with_context(|| format!("failed to export {session}"))?;
    println!(
        "exported {} (score {}) to {}",
        report.id,
        report.integrity_score,
        path.display()
    );
    Ok(())
}

struct Feeds<'a> {
    faces: Option<&'a Path>,
    objects: Option<&'a Path>,
    audio: Option<&'a Path>,
}

fn open_sources(feeds: &Feeds<'_>) -> Result<Sources> {
    let mut sources = Sources::default();
    if let Some(path) = feeds.faces {
        sources.faces = Some(Box::new(JsonlReplay::<Vec<FaceLandmarks>>::open(path)?));
    }
    if let Some(path) = feeds.objects {
        sources.objects = Some(Arc::new(SharedReplay::new(JsonlReplay::open(path)?)));
    }
    if let Some(path) = feeds.audio {
        sources.audio = Some(Box::new(JsonlReplay::<f64>::open(path)?));
    }
    Ok(sources)
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    proctor_store::load_config(&data_dir(cli), cli.config.as_deref())
        .context("failed to load monitor configuration")
}

async fn cmd_monitor(
    cli: &Cli,
    name: &str,
    feeds: Feeds<'_>,
    duration: Option<f64>,
    recording: &str,
    json: bool,
) -> Result<()> {
    let config = load_config(cli)?;
    let sources = open_sources(&feeds)?;
    if sources.is_empty() {
        bail!("at least one of --faces, --objects or --audio is required");
    }
    let limit = match duration {
        Some(secs) => match Duration::try_from_secs_f64(secs) {
            Ok(d) => Some(d),
            Err(e) => bail!("invalid --duration {secs}: {e}"),
        },
        None => None,
    };

    let service = open_service(cli)?;
    let session = service.start(name).context("failed to start session")?;
    tracing::info!(session = %session.id, "monitoring");
    let handle = spawn_monitor(&config, service.emitter(session.handle()), sources);

    let timeout = async {
        match limit {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = handle.finished() => tracing::info!("all feeds exhausted"),
        _ = timeout => tracing::info!("monitor duration elapsed"),
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    handle.stop().await;

    service
        .finalize(session.id, recording)
        .context("failed to finalize session")?;
    let report = service
        .detail(session.id)
        .context("failed to load session report")?;
    print_report(&report, json)
}
