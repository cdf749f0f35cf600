use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use dotenvy::dotenv;

use tutorgrid::allocations::AllocationTab;
use tutorgrid::audit::NotificationLevel;
use tutorgrid::hierarchy::Hierarchy;
use tutorgrid::scope::{self, Route};
use tutorgrid::{AuthContext, Console, HttpRemote, RemoteApi};
use tutorgrid_cli::identity::AdminArgs;
use tutorgrid_cli::offline;
use tutorgrid_config::{ApiConfig, ConsoleConfig};
use tutorgrid_models::{
    AllocationId, CourseId, RequestedBy, RescheduleDecision, RescheduleRequestDto,
    RescheduleRequestId, SessionId, StudentId, TrainerId, VerificationChannel,
    VerificationOutcome,
};
use tutorgrid_observability::{init_metrics, init_tracing};

#[derive(Parser)]
#[command(name = "tutorgrid")]
#[command(about = "TutorGrid console - allocation and session administration", long_about = None)]
struct Cli {
    /// Run against a seeded in-memory authority instead of the remote API
    #[arg(long, global = true)]
    offline: bool,

    /// Print the collected metrics when the command finishes
    #[arg(long, global = true)]
    show_metrics: bool,

    #[command(flatten)]
    admin: AdminArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the admin's place in the region hierarchy
    Scope,
    /// List the console routes the admin can open
    Routes,
    /// Allocation lifecycle
    #[command(subcommand)]
    Allocations(AllocationCommands),
    /// Sessions, reschedules and the calendar
    #[command(subcommand)]
    Sessions(SessionCommands),
}

#[derive(Subcommand)]
enum AllocationCommands {
    /// List in-scope allocations
    List {
        /// Only one tab
        #[arg(long, value_enum)]
        tab: Option<Tab>,
    },
    /// Approve a pending allocation
    Approve {
        id: String,
        /// Trainer to assign; required when none is assigned yet
        #[arg(long)]
        trainer: Option<String>,
    },
    /// Reject a pending allocation
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Replace the trainer
    Reallocate {
        id: String,
        #[arg(long)]
        trainer: String,
        #[arg(long)]
        reason: String,
    },
    /// Cancel an allocation and its open sessions
    Cancel {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Mark an allocation completed
    Complete {
        id: String,
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Run auto-assignment again for a student and course
    RetryAuto {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List an allocation's sessions and reschedule requests
    List { allocation: String },
    /// Record a GPS or face verification outcome
    Verify {
        session: String,
        #[arg(long, value_enum)]
        channel: Channel,
        #[arg(long, value_enum)]
        outcome: Outcome,
    },
    /// File a reschedule request
    Reschedule {
        session: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long)]
        reason: String,
        #[arg(long, value_enum, default_value = "student")]
        by: Requester,
    },
    /// Approve or reject a reschedule request
    Resolve {
        request: String,
        #[arg(long, value_enum)]
        decision: Decision,
    },
    /// Place a session on the calendar
    Place {
        session: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        /// Apply even if the slot is already taken, without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Report double-booked trainer slots
    Conflicts,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tab {
    PendingManual,
    PendingAuto,
    Active,
    Closed,
}

impl From<Tab> for AllocationTab {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::PendingManual => AllocationTab::PendingManual,
            Tab::PendingAuto => AllocationTab::PendingAuto,
            Tab::Active => AllocationTab::Active,
            Tab::Closed => AllocationTab::Closed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Channel {
    Gps,
    Face,
}

#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    Passed,
    Failed,
}

#[derive(Clone, Copy, ValueEnum)]
enum Requester {
    Student,
    Trainer,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approved,
    Rejected,
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    // Held until main returns so the file writer flushes.
    let _log_guard = init_tracing();
    let metrics = init_metrics();

    let cli = Cli::parse();
    let show_metrics = cli.show_metrics;

    if let Err(e) = run(cli).await {
        if !e.is::<Reported>() {
            eprintln!("\n❌ {:#}", e);
        }
        return ExitCode::FAILURE;
    }

    if show_metrics {
        if let Some(handle) = metrics {
            println!("\n{}", handle.render());
        }
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let admin = cli.admin.into_admin();
    let config = ConsoleConfig::from_env();

    let file_roots = match &config.hierarchy_path {
        Some(path) => Some(load_hierarchy(path)?.roots().to_vec()),
        None => None,
    };

    let (remote, roots): (Arc<dyn RemoteApi>, Option<Vec<_>>) = if cli.offline {
        let roots = file_roots.unwrap_or_else(offline::demo_hierarchy);
        let remote: Arc<dyn RemoteApi> = Arc::new(offline::seed(roots.clone()).await);
        (remote, Some(roots))
    } else {
        let remote = HttpRemote::new(ApiConfig::from_env()).context("Failed to build API client")?;
        let remote: Arc<dyn RemoteApi> = Arc::new(remote);
        (remote, file_roots)
    };

    let mut console = match roots {
        Some(roots) => {
            let hierarchy = Hierarchy::from_roots(roots).context("Invalid region hierarchy")?;
            Console::new(AuthContext::new(admin, Arc::new(hierarchy)), remote, config)
        }
        None => Console::connect(admin, remote, config)
            .await
            .context("Failed to load the region hierarchy")?,
    };

    let outcome = match cli.command {
        Commands::Scope => {
            show_scope(&console);
            Ok(())
        }
        Commands::Routes => {
            show_routes(&console);
            Ok(())
        }
        Commands::Allocations(command) => {
            console.refresh().await.context("Failed to load allocations")?;
            handle_allocations(&mut console, command).await
        }
        Commands::Sessions(command) => {
            console.refresh().await.context("Failed to load allocations")?;
            handle_sessions(&mut console, command).await
        }
    };

    let errors = print_notifications(&mut console);
    match outcome {
        // The failure was already printed from the notification queue.
        Err(_) if errors > 0 => Err(Reported.into()),
        other => other,
    }
}

/// Marker for failures already shown to the operator.
#[derive(Debug)]
struct Reported;

impl std::fmt::Display for Reported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("reported")
    }
}

impl std::error::Error for Reported {}

fn load_hierarchy(path: &std::path::Path) -> Result<Hierarchy> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hierarchy file {}", path.display()))?;
    Ok(Hierarchy::from_json(&json)?)
}

fn show_scope(console: &Console) {
    let ctx = console.context();
    let admin = &ctx.admin;
    println!("Admin:  {} ({})", admin.name, admin.id);
    println!("Region: {}", admin.region_id);
    match scope::admin_level_index(&ctx.hierarchy, admin) {
        Some(-1) => println!("Level:  all regions"),
        Some(level) => println!("Level:  {}", level),
        None => println!("Level:  unresolved (region not in hierarchy)"),
    }

    let filters: Vec<String> = scope::filter_levels(&ctx.hierarchy, admin)
        .into_iter()
        .map(|t| t.to_string())
        .collect();
    println!("Filter levels: {}", display_list(&filters));
    println!("Leaf admin: {}", scope::is_leaf_node_admin(&ctx.hierarchy, admin));

    match scope::accessible_region_ids(&ctx.hierarchy, admin) {
        scope::AccessibleRegions::Unrestricted => println!("Accessible regions: all"),
        scope::AccessibleRegions::Only(ids) => {
            let mut ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
            ids.sort();
            println!("Accessible regions ({}): {}", ids.len(), display_list(&ids));
        }
    }
}

fn show_routes(console: &Console) {
    let admin = &console.context().admin;
    for route in Route::ALL {
        let mark = if scope::can_access_route(admin, route) { "✅" } else { "  " };
        println!("{} {}", mark, route.path());
    }
}

fn confirm(prompt: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

async fn handle_allocations(console: &mut Console, command: AllocationCommands) -> Result<()> {
    match command {
        AllocationCommands::List { tab } => {
            let allocations = console.allocations(tab.map(AllocationTab::from));
            if allocations.is_empty() {
                println!("No allocations in scope.");
            }
            for a in allocations {
                println!(
                    "{:<10} {:<14} {:<9} {:<7} {:<14} {:<16} {}",
                    a.id,
                    AllocationTab::of(a).as_str(),
                    a.status,
                    if a.is_auto() { "auto" } else { "manual" },
                    a.student_id,
                    a.trainer_id().map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                    a.region_id
                );
            }
        }
        AllocationCommands::Approve { id, trainer } => {
            console
                .approve(&AllocationId::new(id), trainer.map(TrainerId::new))
                .await?;
        }
        AllocationCommands::Reject { id, reason } => {
            console.reject(&AllocationId::new(id), &reason).await?;
        }
        AllocationCommands::Reallocate { id, trainer, reason } => {
            console
                .reallocate(&AllocationId::new(id), TrainerId::new(trainer), &reason)
                .await?;
        }
        AllocationCommands::Cancel { id, yes } => {
            if confirm(&format!("Cancel allocation {} and its open sessions?", id), yes)? {
                let id = AllocationId::new(id);
                console.load_sessions(&id).await?;
                console.cancel(&id).await?;
            }
        }
        AllocationCommands::Complete { id, yes } => {
            if confirm(&format!("Mark allocation {} completed?", id), yes)? {
                console.complete(&AllocationId::new(id)).await?;
            }
        }
        AllocationCommands::RetryAuto { student, course } => {
            let outcome = console
                .retry_auto_assign(&StudentId::new(student), &CourseId::new(course))
                .await?;
            println!(
                "Attempt {}: {:?} after {} retries",
                outcome.attempt.id, outcome.attempt.status, outcome.attempt.retry_count
            );
            if let Some(reason) = &outcome.attempt.failure_reason {
                println!("Reason: {}", reason);
            }
        }
    }
    Ok(())
}

/// Sessions are only reachable through their allocation, so load them for
/// everything in scope first.
async fn load_all_sessions(console: &mut Console) -> Result<()> {
    let ids: Vec<AllocationId> = console.allocations(None).into_iter().map(|a| a.id.clone()).collect();
    for id in ids {
        console
            .load_sessions(&id)
            .await
            .with_context(|| format!("Failed to load sessions of {}", id))?;
    }
    Ok(())
}

async fn handle_sessions(console: &mut Console, command: SessionCommands) -> Result<()> {
    if let SessionCommands::List { allocation } = &command {
        let record = console.load_sessions(&AllocationId::new(allocation.as_str())).await?;
        for s in &record.sessions {
            println!(
                "{:<10} {} {} {:>3}min {:<9} gps={:?} face={:?}",
                s.id, s.scheduled_date, s.scheduled_time, s.duration, s.status, s.gps_status, s.face_status
            );
            for r in record.requests_for(&s.id) {
                println!(
                    "    ↳ {} {:?} → {} {} ({}) [{}]",
                    r.id, r.requested_by, r.new_date, r.new_time, r.reason, r.status
                );
            }
        }
        return Ok(());
    }

    load_all_sessions(console).await?;

    match command {
        SessionCommands::List { .. } => {}
        SessionCommands::Verify { session, channel, outcome } => {
            let channel = match channel {
                Channel::Gps => VerificationChannel::Gps,
                Channel::Face => VerificationChannel::Face,
            };
            let outcome = match outcome {
                Outcome::Passed => VerificationOutcome::Passed,
                Outcome::Failed => VerificationOutcome::Failed,
            };
            console.verify_session(&SessionId::new(session), channel, outcome).await?;
        }
        SessionCommands::Reschedule { session, date, time, reason, by } => {
            let dto = RescheduleRequestDto {
                requested_by: match by {
                    Requester::Student => RequestedBy::Student,
                    Requester::Trainer => RequestedBy::Trainer,
                },
                new_date: date,
                new_time: time,
                reason,
            };
            let request = console.request_reschedule(&SessionId::new(session), dto).await?;
            println!("Request id: {}", request.id);
        }
        SessionCommands::Resolve { request, decision } => {
            let decision = match decision {
                Decision::Approved => RescheduleDecision::Approved,
                Decision::Rejected => RescheduleDecision::Rejected,
            };
            console
                .resolve_reschedule(&RescheduleRequestId::new(request), decision)
                .await?;
        }
        SessionCommands::Place { session, date, time, yes } => {
            let plan = console.plan_placement(&SessionId::new(session), date, time)?;
            for c in &plan.conflicts {
                println!(
                    "⚠️  {} already teaches at {} {}: {}",
                    c.trainer_id,
                    c.date,
                    c.time,
                    display_list(&c.session_ids.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                );
            }
            if plan.has_conflicts() && !confirm("Place the session anyway?", yes)? {
                bail!("placement abandoned");
            }
            let placed = console.confirm_placement(&plan).await?;
            println!("{} now at {} {}", placed.id, placed.scheduled_date, placed.scheduled_time);
        }
        SessionCommands::Conflicts => {
            let conflicts = console.detect_conflicts();
            if conflicts.is_empty() {
                println!("No soft conflicts.");
            }
            for c in conflicts {
                let ids: Vec<String> = c.session_ids.iter().map(|s| s.to_string()).collect();
                println!("{} {} {}: {}", c.trainer_id, c.date, c.time, display_list(&ids));
            }
        }
    }
    Ok(())
}

/// Print and clear queued notifications. Returns how many were errors.
fn print_notifications(console: &mut Console) -> usize {
    let mut errors = 0;
    for note in console.drain_notifications() {
        match note.level {
            NotificationLevel::Success => println!("✅ {}", note.message),
            NotificationLevel::Info => println!("ℹ️  {}", note.message),
            NotificationLevel::Error => {
                errors += 1;
                if note.retryable {
                    eprintln!("❌ {} (retry later)", note.message);
                } else {
                    eprintln!("❌ {}", note.message);
                }
            }
        }
    }
    errors
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
