use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use queue_client::{CounterSummary, HttpQueueService};
use queue_core::reorder::{move_entry, prioritised};
use queue_core::{CounterId, EntryId, Priority, QueueEntry, QueueSession};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "queue")]
#[command(about = "Clinic queue operator CLI")]
struct Cli {
    /// Queue server base URL
    #[arg(long, env = "QUEUE_SERVER_URL", default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    High,
    Normal,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::High => Priority::High,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::Low => Priority::Low,
        }
    }
}

/// Counters are given by number (`2`) or id; entries by ticket number or id.
#[derive(Subcommand)]
enum Commands {
    /// Check the server is up
    Health,
    /// List counters
    Counters,
    /// Open a new counter
    AddCounter {
        /// Counter title, e.g. "Vitals"
        title: String,
        /// Counter number (defaults to the next free number)
        #[arg(long)]
        number: Option<u32>,
    },
    /// Activate a counter
    Activate { counter: String },
    /// Deactivate a counter
    Deactivate { counter: String },
    /// Check a patient in
    CheckIn {
        /// Patient display name
        name: String,
        /// Initials shown on the board (derived from the name when omitted)
        #[arg(long)]
        initials: Option<String>,
        #[arg(long, value_enum, default_value = "normal")]
        priority: PriorityArg,
        /// Counter to queue at (unassigned when omitted)
        #[arg(long)]
        counter: Option<String>,
    },
    /// Show a counter's waiting sequence
    Waiting { counter: String },
    /// Call the next patient
    ServeNext { counter: String },
    /// Send the current patient to the back of the queue
    Skip { counter: String },
    /// Call a waiting or skipped patient out of order
    Recall { counter: String, entry: String },
    /// Finish with the current patient
    Complete { counter: String },
    /// Set the full waiting order
    Reorder {
        counter: String,
        /// Every waiting entry, head first
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Move one waiting entry, positions counted from 1
    Move {
        counter: String,
        from: usize,
        to: usize,
    },
    /// Reorder the waiting sequence high priority first
    Prioritise { counter: String },
    /// List entries not yet assigned to a counter
    Unassigned,
    /// Assign an entry to a counter
    Assign { entry: String, counter: String },
    /// Remove an entry from the queue
    Remove { entry: String },
    /// Drop completed entries
    Purge,
    /// Show the now-serving board
    Display,
}

fn print_counter(summary: &CounterSummary) {
    let counter = &summary.counter;
    let serving = counter
        .current_number()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "Counter {}: {} [{}] serving {}, {} waiting, ID: {}",
        counter.counter_number(),
        counter.title(),
        if counter.is_active() { "open" } else { "closed" },
        serving,
        summary.waiting_count,
        counter.id()
    );
}

fn print_entry(entry: &QueueEntry) {
    println!(
        "#{:<4} {} ({}) {} {}, checked in {}, ID: {}",
        entry.queue_number.to_string(),
        entry.patient.display_name(),
        entry.patient.initials(),
        entry.status,
        entry.priority.as_str(),
        entry.checked_in_at.format("%H:%M"),
        entry.id
    );
}

/// A counter number or a counter id.
fn resolve_counter(counters: &[CounterSummary], arg: &str) -> anyhow::Result<CounterId> {
    if let Ok(number) = arg.parse::<u32>() {
        return counters
            .iter()
            .find(|c| c.counter.counter_number() == number)
            .map(|c| c.counter.id())
            .ok_or_else(|| anyhow!("no counter numbered {number}"));
    }
    CounterId::parse(arg).map_err(|e| anyhow!("invalid counter '{arg}': {e}"))
}

/// A ticket number among `entries`, or an entry id.
fn resolve_entry(entries: &[QueueEntry], arg: &str) -> anyhow::Result<EntryId> {
    if let Ok(number) = arg.parse::<u32>() {
        return entries
            .iter()
            .find(|e| e.queue_number.get() == number)
            .map(|e| e.id)
            .ok_or_else(|| anyhow!("ticket {number} is not waiting here"));
    }
    EntryId::parse(arg).map_err(|e| anyhow!("invalid entry '{arg}': {e}"))
}

async fn counter_id(client: &HttpQueueService, arg: &str) -> anyhow::Result<CounterId> {
    let counters = client.list_counters().await?;
    resolve_counter(&counters, arg)
}

/// A session mirroring one counter.
async fn session_for(
    client: &Arc<HttpQueueService>,
    counter: &str,
) -> anyhow::Result<(QueueSession<HttpQueueService>, CounterId)> {
    let id = counter_id(client, counter).await?;
    let session = client.session().await?;
    session.refresh(id).await?;
    Ok((session, id))
}

async fn waiting_entries(
    session: &QueueSession<HttpQueueService>,
    counter_id: CounterId,
) -> anyhow::Result<Vec<QueueEntry>> {
    let waiting = session
        .view(|c| {
            c.waiting(counter_id)
                .map(|w| w.into_iter().cloned().collect::<Vec<_>>())
        })
        .await?;
    Ok(waiting)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = Arc::new(
        HttpQueueService::new(&cli.server)
            .with_context(|| format!("cannot use server URL {}", cli.server))?,
    );

    let Some(command) = cli.command else {
        println!("Use 'queue --help' for commands");
        return Ok(());
    };

    match command {
        Commands::Health => {
            let res = client.health().await?;
            println!("{}", res.message);
        }
        Commands::Counters => {
            let counters = client.list_counters().await?;
            if counters.is_empty() {
                println!("No counters found.");
            }
            for summary in &counters {
                print_counter(summary);
            }
        }
        Commands::AddCounter { title, number } => {
            let summary = client.create_counter(&title, number).await?;
            print_counter(&summary);
        }
        Commands::Activate { counter } => {
            let id = counter_id(&client, &counter).await?;
            print_counter(&client.activate(id).await?);
        }
        Commands::Deactivate { counter } => {
            let id = counter_id(&client, &counter).await?;
            print_counter(&client.deactivate(id).await?);
        }
        Commands::CheckIn {
            name,
            initials,
            priority,
            counter,
        } => {
            let counter_id = match counter {
                Some(c) => Some(counter_id(&client, &c).await?),
                None => None,
            };
            let entry = client
                .check_in(&name, initials, priority.into(), counter_id)
                .await?;
            println!("Checked in with ticket #{}", entry.queue_number);
            print_entry(&entry);
        }
        Commands::Waiting { counter } => {
            let (session, id) = session_for(&client, &counter).await?;
            let waiting = waiting_entries(&session, id).await?;
            if waiting.is_empty() {
                println!("Nobody waiting.");
            }
            for entry in &waiting {
                print_entry(entry);
            }
        }
        Commands::ServeNext { counter } => {
            let (session, id) = session_for(&client, &counter).await?;
            let entry = session.serve_next(id).await?;
            println!("Now serving #{}", entry.queue_number);
            print_entry(&entry);
        }
        Commands::Skip { counter } => {
            let (session, id) = session_for(&client, &counter).await?;
            let entry = session.skip_patient(id).await?;
            println!("Skipped #{}", entry.queue_number);
        }
        Commands::Recall { counter, entry } => {
            let (session, id) = session_for(&client, &counter).await?;
            let waiting = waiting_entries(&session, id).await?;
            let entry_id = resolve_entry(&waiting, &entry)?;
            let entry = session.recall_patient(id, entry_id).await?;
            println!("Now serving #{}", entry.queue_number);
        }
        Commands::Complete { counter } => {
            let (session, id) = session_for(&client, &counter).await?;
            let entry = session.complete_current(id).await?;
            println!("Completed #{}", entry.queue_number);
        }
        Commands::Reorder { counter, entries } => {
            let (session, id) = session_for(&client, &counter).await?;
            let waiting = waiting_entries(&session, id).await?;
            let order = entries
                .iter()
                .map(|e| resolve_entry(&waiting, e))
                .collect::<anyhow::Result<Vec<_>>>()?;
            session.reorder(id, order).await?;
            println!("Reordered {} entries.", entries.len());
        }
        Commands::Move { counter, from, to } => {
            if from == 0 || to == 0 {
                bail!("positions are counted from 1");
            }
            let (session, id) = session_for(&client, &counter).await?;
            let waiting = waiting_entries(&session, id).await?;
            let order: Vec<EntryId> = waiting.iter().map(|e| e.id).collect();
            let moved = move_entry(&order, from - 1, to - 1)?;
            session.reorder(id, moved).await?;
            println!("Moved position {from} to {to}.");
        }
        Commands::Prioritise { counter } => {
            let (session, id) = session_for(&client, &counter).await?;
            let waiting = waiting_entries(&session, id).await?;
            let refs: Vec<&QueueEntry> = waiting.iter().collect();
            session.reorder(id, prioritised(&refs)).await?;
            println!("Waiting sequence sorted by priority.");
        }
        Commands::Unassigned => {
            let entries = client.list_unassigned().await?;
            if entries.is_empty() {
                println!("No unassigned entries.");
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
        Commands::Assign { entry, counter } => {
            let counter_id = counter_id(&client, &counter).await?;
            let pool = client.list_unassigned().await?;
            let entry_id = resolve_entry(&pool, &entry)?;
            let entry = client.assign(entry_id, counter_id).await?;
            println!("Assigned #{} to counter {counter}", entry.queue_number);
        }
        Commands::Remove { entry } => {
            let entry_id =
                EntryId::parse(&entry).map_err(|e| anyhow!("invalid entry '{entry}': {e}"))?;
            client.remove_entry(entry_id).await?;
            println!("Removed {entry_id}");
        }
        Commands::Purge => {
            let purged = client.purge_completed().await?;
            println!("Purged {purged} completed entries.");
        }
        Commands::Display => {
            print!("{}", client.display().await?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
