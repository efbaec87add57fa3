mod cmd_complete;
mod cmd_init;
mod cmd_list;
mod cmd_record;
mod cmd_show;
mod cmd_start;
mod cmd_status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use traj_store::{FileStorage, StoreConfig};
use traj_trace::{GitCli, TraceConfig, TraceGenerator};

/// Log filter override, e.g. `TRAJ_LOG=traj_store=debug`.
const LOG_ENV: &str = "TRAJ_LOG";

#[derive(Parser)]
#[command(name = "traj", version, about = "Record and query agent work trajectories")]
struct Cli {
    /// Store root (default: $TRAJECTORIES_DATA_DIR, then ./.trajectories)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// More log output on stderr (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the store layout and index
    Init,
    /// Start a new trajectory
    Start {
        /// Task title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Agent starting the work
        #[arg(long)]
        agent: Option<String>,
        /// External tracker system (e.g. github, linear)
        #[arg(long, requires = "source_id")]
        source_system: Option<String>,
        /// Id within the external tracker
        #[arg(long, requires = "source_system")]
        source_id: Option<String>,
        #[arg(long, requires = "source_id")]
        source_url: Option<String>,
        #[arg(long)]
        project: Option<String>,
        /// Tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Open a new chapter on the active trajectory
    Chapter {
        title: String,
        #[arg(long, default_value = "default")]
        agent: String,
    },
    /// Record an event on the active trajectory
    Event {
        content: String,
        /// prompt, thinking, tool_call, tool_result, message_sent,
        /// message_received, decision, finding, note, error
        #[arg(long = "type", default_value = "note")]
        event_type: String,
        /// low, medium, high, critical
        #[arg(long)]
        significance: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Record a decision on the active trajectory
    Decide {
        question: String,
        chosen: String,
        #[arg(long)]
        reasoning: String,
        /// Rejected alternative, as `option` or `option:reason` (repeatable)
        #[arg(long = "alt")]
        alternatives: Vec<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Complete the active trajectory with a retrospective
    Complete {
        #[arg(long)]
        summary: String,
        #[arg(long)]
        approach: String,
        /// 0.0 to 1.0
        #[arg(long)]
        confidence: f64,
        #[arg(long = "challenge")]
        challenges: Vec<String>,
        #[arg(long = "learning")]
        learnings: Vec<String>,
        #[arg(long = "suggestion")]
        suggestions: Vec<String>,
        #[arg(long)]
        time_spent: Option<String>,
    },
    /// Abandon the active trajectory
    Abandon {
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show the active trajectory
    Status,
    /// List trajectories from the index
    List {
        /// active, completed, abandoned
        #[arg(long)]
        status: Option<String>,
        /// Started at or after (RFC 3339)
        #[arg(long)]
        since: Option<String>,
        /// Started before (RFC 3339)
        #[arg(long)]
        until: Option<String>,
        /// startedAt, completedAt, title
        #[arg(long, default_value = "startedAt")]
        sort: String,
        /// Ascending order (default: descending)
        #[arg(long)]
        asc: bool,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one trajectory
    Show {
        id: String,
        /// json, markdown, timeline
        #[arg(long, default_value = "markdown")]
        format: String,
        /// Print the trace record instead of the trajectory
        #[arg(long)]
        trace: bool,
    },
    /// Search titles, retrospectives, and decisions
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete a trajectory and its sidecar files
    Delete { id: String },
    /// Rebuild index.json from the files on disk
    Reindex,
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// The active trajectory, or an error telling the user to start one.
pub(crate) fn require_active(store: &FileStorage) -> anyhow::Result<traj_core::Trajectory> {
    store
        .get_active()?
        .ok_or_else(|| anyhow::anyhow!("no active trajectory (run `traj start <title>`)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = StoreConfig::from_env(cli.data_dir.as_deref(), &cwd);
    tracing::debug!(root = %config.root.display(), "store resolved");
    let store = FileStorage::new(&config);
    let tracer = TraceGenerator::new(GitCli::new(&cwd), TraceConfig::from_env());

    match cli.cmd {
        Command::Init => cmd_init::execute(&store),
        Command::Start {
            title,
            description,
            agent,
            source_system,
            source_id,
            source_url,
            project,
            tags,
        } => cmd_start::execute(
            &store,
            &tracer,
            cmd_start::StartParams {
                title,
                description,
                agent,
                source_system,
                source_id,
                source_url,
                project,
                tags,
            },
        ),
        Command::Chapter { title, agent } => cmd_record::chapter(&store, &title, &agent),
        Command::Event {
            content,
            event_type,
            significance,
            tags,
        } => cmd_record::event(
            &store,
            &content,
            &event_type,
            significance.as_deref(),
            tags,
        ),
        Command::Decide {
            question,
            chosen,
            reasoning,
            alternatives,
            confidence,
        } => cmd_record::decide(
            &store,
            cmd_record::DecideParams {
                question,
                chosen,
                reasoning,
                alternatives,
                confidence,
            },
        ),
        Command::Complete {
            summary,
            approach,
            confidence,
            challenges,
            learnings,
            suggestions,
            time_spent,
        } => {
            let mut input = traj_core::trajectory::CompleteInput::new(summary, approach, confidence);
            input.challenges = challenges;
            input.learnings = learnings;
            input.suggestions = suggestions;
            input.time_spent = time_spent;
            cmd_complete::complete(&store, &tracer, input)
        }
        Command::Abandon { reason } => cmd_complete::abandon(&store, reason.as_deref()),
        Command::Status => cmd_status::execute(&store),
        Command::List {
            status,
            since,
            until,
            sort,
            asc,
            offset,
            limit,
            json,
        } => cmd_list::list(
            &store,
            &cmd_list::ListParams {
                status: status.as_deref(),
                since,
                until,
                sort: &sort,
                asc,
                offset,
                limit,
                json,
            },
        ),
        Command::Show { id, format, trace } => cmd_show::show(&store, &id, &format, trace),
        Command::Search { query, limit, json } => cmd_list::search(&store, &query, limit, json),
        Command::Delete { id } => cmd_show::delete(&store, &id),
        Command::Reindex => cmd_init::reindex(&store),
    }
}
