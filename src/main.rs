//! taskmate - local-first task manager
//!
//! Command-line front end: reads derived views from the task store and turns
//! each command into one store mutation followed by a save.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use taskmate::config::{CONFIG_ENV, Config, DisplayConfig, LOCAL_CONFIG};
use taskmate::{
    CreateTaskInput, DateRange, Priority, SqliteStorage, Task, TaskFilter, TaskManager,
    TaskService, TaskStatus, UpdateTaskInput, labels, sort_tasks,
};

#[derive(Parser)]
#[command(name = "taskmate")]
#[command(about = "Local-first task manager with priorities, due dates and tags")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a task
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// low, medium, high or urgent
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks matching the filters, oldest first
    List {
        /// Only these statuses (repeatable)
        #[arg(short, long)]
        status: Vec<TaskStatus>,

        /// Only these priorities (repeatable)
        #[arg(short, long)]
        priority: Vec<Priority>,

        /// Tasks carrying any of these tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Case-insensitive text in title or description
        #[arg(long)]
        search: Option<String>,

        /// Earliest due date; undated tasks always match
        #[arg(long)]
        due_from: Option<String>,

        /// Latest due date; undated tasks always match
        #[arg(long)]
        due_to: Option<String>,

        /// Include completed tasks even if the config hides them
        #[arg(short, long)]
        all: bool,

        /// Most important first: in progress, then pending, then completed
        #[arg(long)]
        sorted: bool,
    },

    /// Show every field of a task
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(short, long)]
        status: Option<TaskStatus>,

        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        #[arg(long)]
        clear_due: bool,

        /// Replace tags (repeatable)
        #[arg(short, long = "tag", conflicts_with = "clear_tags")]
        tags: Vec<String>,

        #[arg(long)]
        clear_tags: bool,
    },

    /// Move a task to its next status (pending, in progress, completed)
    Advance { id: String },

    /// Mark a task completed
    Done { id: String },

    /// Mark every open task completed
    DoneAll,

    /// Delete a task
    Rm { id: String },

    /// Delete every completed task
    PurgeCompleted,

    /// Show task counts and completion rate
    Stats,

    /// Print all tasks as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all tasks with a JSON export
    Import { file: PathBuf },

    /// Delete all stored tasks
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show storage location and size
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskmate=warn")),
        )
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Init { output } => return init(output, cli.db),
        command => command,
    };

    let mut cfg = if let Some(path) = &cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    if let Some(db) = cli.db {
        cfg.storage.path = db;
    }

    let storage = SqliteStorage::open(&cfg.storage.path).with_context(|| {
        format!("Failed to open database at {}", cfg.storage.path.display())
    })?;
    let mut manager = TaskManager::new(TaskService::new(storage));
    manager.load().await.context("Failed to load tasks")?;

    run(command, &mut manager, &cfg).await
}

fn init(output: Option<PathBuf>, db: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG));
    let mut cfg = Config::default();
    if let Some(db) = db {
        cfg.storage.path = db;
    }
    cfg.save_to(&path)?;

    println!("Created config file: {}", path.display());
    println!("Database: {}", cfg.storage.path.display());
    println!();
    println!("Use it with: {CONFIG_ENV}={} taskmate list", path.display());
    Ok(())
}

async fn run(
    command: Commands,
    manager: &mut TaskManager<SqliteStorage>,
    cfg: &Config,
) -> Result<()> {
    let display = &cfg.display;

    match command {
        Commands::Init { .. } => bail!("init does not take an open database"),

        Commands::Add {
            title,
            description,
            priority,
            due,
            tags,
        } => {
            let mut input = CreateTaskInput::new(title, priority).with_tags(tags);
            input.description = description;
            input.due_date = due.as_deref().map(|d| parse_date(d, true)).transpose()?;

            let task = manager.create_task(input).await?;
            println!("Created {}", render_task(&task, display));
        }

        Commands::List {
            status,
            priority,
            tags,
            search,
            due_from,
            due_to,
            all,
            sorted,
        } => {
            let mut filter = TaskFilter::default();
            if !status.is_empty() {
                filter.status = Some(status);
            } else if !(display.show_completed || all) {
                filter.status = Some(vec![TaskStatus::Pending, TaskStatus::InProgress]);
            }
            if !priority.is_empty() {
                filter.priority = Some(priority);
            }
            if !tags.is_empty() {
                filter.tags = Some(tags);
            }
            filter.search_query = search;
            if due_from.is_some() || due_to.is_some() {
                let start = match due_from {
                    Some(d) => parse_date(&d, false)?,
                    None => DateTime::<Utc>::MIN_UTC,
                };
                let end = match due_to {
                    Some(d) => parse_date(&d, true)?,
                    None => DateTime::<Utc>::MAX_UTC,
                };
                filter.date_range = Some(DateRange::new(start, end));
            }
            manager.set_filter(filter);

            let mut tasks = manager.filtered();
            if sorted {
                tasks = sort_tasks(&tasks);
            }
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                println!("{}", render_task(task, display));
            }
        }

        Commands::Show { id } => {
            let id = resolve_id(manager, &id)?;
            if let Some(task) = manager.get(&id) {
                print_details(task, display);
            }
        }

        Commands::Edit {
            id,
            title,
            description,
            clear_description,
            priority,
            status,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let id = resolve_id(manager, &id)?;
            let due = due.as_deref().map(|d| parse_date(d, true)).transpose()?;
            let input = UpdateTaskInput {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                priority,
                status,
                due_date: if clear_due { Some(None) } else { due.map(Some) },
                tags: if clear_tags {
                    Some(Vec::new())
                } else {
                    (!tags.is_empty()).then_some(tags)
                },
                ..UpdateTaskInput::new(id.clone())
            };

            if !input.has_changes() {
                bail!("Nothing to change; pass at least one field option");
            }
            manager.update_task(input).await?;
            if let Some(task) = manager.get(&id) {
                println!("Updated {}", render_task(task, display));
            }
        }

        Commands::Advance { id } => {
            let id = resolve_id(manager, &id)?;
            if let Some(status) = manager.advance_status(&id).await? {
                println!("{} is now {}", short_id(&id), labels::status_label(status));
            }
        }

        Commands::Done { id } => {
            let id = resolve_id(manager, &id)?;
            manager.complete_task(&id).await?;
            println!("Completed {}", short_id(&id));
        }

        Commands::DoneAll => {
            let changed = manager.complete_all().await?;
            println!("Completed {changed} task(s).");
        }

        Commands::Rm { id } => {
            let id = resolve_id(manager, &id)?;
            manager.delete_task(&id).await?;
            println!("Deleted {}", short_id(&id));
        }

        Commands::PurgeCompleted => {
            let removed = manager.delete_completed().await?;
            println!("Deleted {removed} completed task(s).");
        }

        Commands::Stats => {
            let stats = manager.stats();
            println!("Total:       {}", stats.total);
            println!("Pending:     {}", stats.pending);
            println!("In progress: {}", stats.in_progress);
            println!("Completed:   {} ({}%)", stats.completed, stats.completion_rate);
            println!();
            for priority in Priority::ALL.into_iter().rev() {
                let label = format!("{:<8}", labels::priority_label(priority));
                let count = stats.by_priority[priority];
                println!("{} {count}", paint_priority(&label, priority, display));
            }
        }

        Commands::Export { output } => {
            let json = manager.export().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let tasks = manager.import(&json).await?;
            println!("Imported {} task(s).", tasks.len());
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete all tasks without --yes");
            }
            manager.clear().await?;
            println!("All tasks deleted.");
        }

        Commands::Info => {
            let stats = manager.storage_stats().await;
            println!("Database:      {}", cfg.storage.path.display());
            println!("Tasks stored:  {}", stats.task_count);
            println!("Size:          {} bytes", stats.storage_size);
            match stats.last_modified {
                Some(at) => println!("Last modified: {}", at.to_rfc3339()),
                None => println!("Last modified: -"),
            }
        }
    }

    Ok(())
}

/// Accept `YYYY-MM-DD` (start or end of that day, UTC) or a full RFC 3339 timestamp.
fn parse_date(input: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{input}', expected YYYY-MM-DD or RFC 3339"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).context("Invalid end-of-day time")?
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time).and_utc())
}

/// Full id for an exact match or a unique prefix.
fn resolve_id(manager: &TaskManager<SqliteStorage>, prefix: &str) -> Result<String> {
    let tasks = manager.store().tasks();
    if tasks.iter().any(|task| task.id == prefix) {
        return Ok(prefix.to_string());
    }

    let matches: Vec<&Task> = tasks.iter().filter(|task| task.id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => bail!("No task matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} tasks; use a longer prefix", matches.len()),
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn format_date(at: DateTime<Utc>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(format)).is_err() {
        return at.to_rfc3339();
    }
    out
}

fn paint_priority(text: &str, priority: Priority, display: &DisplayConfig) -> String {
    if display.color {
        labels::paint(text, labels::priority_color(priority))
    } else {
        text.to_string()
    }
}

fn render_task(task: &Task, display: &DisplayConfig) -> String {
    let mut line = format!(
        "{} {} {}  {}",
        labels::status_symbol(task.status),
        paint_priority(labels::priority_marker(task.priority), task.priority, display),
        short_id(&task.id),
        task.title,
    );
    if let Some(due) = task.due_date {
        let _ = write!(line, "  due {}", format_date(due, &display.date_format));
    }
    if !task.tags.is_empty() {
        let _ = write!(line, "  #{}", task.tags.join(" #"));
    }
    line
}

fn print_details(task: &Task, display: &DisplayConfig) {
    let optional_date = |at: Option<DateTime<Utc>>| {
        at.map_or_else(|| "-".to_string(), |at| format_date(at, &display.date_format))
    };

    println!("{}", task.title);
    println!("  id:          {}", task.id);
    println!("  status:      {}", labels::status_label(task.status));
    println!(
        "  priority:    {}",
        paint_priority(labels::priority_label(task.priority), task.priority, display)
    );
    println!("  due:         {}", optional_date(task.due_date));
    let tags = if task.tags.is_empty() {
        "-".to_string()
    } else {
        task.tags.join(", ")
    };
    println!("  tags:        {tags}");
    println!("  created:     {}", task.created_at.to_rfc3339());
    println!("  updated:     {}", task.updated_at.to_rfc3339());
    println!("  completed:   {}", optional_date(task.completed_at));
    if let Some(description) = &task.description {
        println!();
        println!("{description}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_cover_the_whole_day() {
        let start = parse_date("2024-05-01", false).unwrap();
        let end = parse_date("2024-05-01", true).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-05-01T23:59:59+00:00");
    }

    #[test]
    fn rfc3339_dates_are_converted_to_utc() {
        let at = parse_date("2024-05-01T10:00:00+02:00", true).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-05-01T08:00:00+00:00");
        assert!(parse_date("next week", false).is_err());
    }

    #[test]
    fn short_id_handles_short_and_long_ids() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }

    #[test]
    fn bad_date_format_falls_back_to_rfc3339() {
        let at = parse_date("2024-05-01", false).unwrap();
        assert_eq!(format_date(at, "%d/%m/%Y"), "01/05/2024");
        assert_eq!(format_date(at, "%Q"), "2024-05-01T00:00:00+00:00");
    }

    #[test]
    fn cli_parses_list_filters() {
        let cli = Cli::try_parse_from([
            "taskmate", "list", "--status", "in_progress", "--priority", "urgent", "--tag", "work",
        ])
        .unwrap();
        match cli.command {
            Commands::List {
                status,
                priority,
                tags,
                ..
            } => {
                assert_eq!(status, [TaskStatus::InProgress]);
                assert_eq!(priority, [Priority::Urgent]);
                assert_eq!(tags, ["work"]);
            }
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn list_keeps_creation_order_unless_sorted() {
        let plain = Cli::try_parse_from(["taskmate", "list"]).unwrap();
        let sorted = Cli::try_parse_from(["taskmate", "list", "--sorted"]).unwrap();
        assert!(matches!(plain.command, Commands::List { sorted: false, .. }));
        assert!(matches!(sorted.command, Commands::List { sorted: true, .. }));
    }
}
