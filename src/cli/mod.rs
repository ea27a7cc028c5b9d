#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand, ValueEnum};
use time::Date;

use crate::config::{self, Config};
use crate::error::{TaskdeckError, ValidationError};
use crate::logging;
use crate::output::table::Table;
use crate::output::tasks::{self as fmt_tasks, RowStyle};
use crate::task::clock::SystemClock;
use crate::task::model::{self, Priority, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::task::policy::{self, Views};
use crate::task::storage::FileSlot;
use crate::task::store::TaskStore;
use crate::tui;

/// Exit status for rejected input (validation errors).
const EXIT_INVALID: u8 = 2;

type Store = TaskStore<FileSlot, SystemClock>;

#[derive(Debug, Parser)]
#[command(
    name = "taskdeck",
    version,
    about = "Task list with deadline- and priority-driven urgency"
)]
pub struct Cli {
    /// Task file to use instead of the configured one
    #[arg(long = "file", global = true)]
    pub file: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Add(AddArgs),
    Edit(EditArgs),
    Status(StatusArgs),
    #[command(alias = "delete")]
    Rm(RmArgs),
    #[command(alias = "ls")]
    List(ListArgs),
    Show(ShowArgs),
    Board,
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task title
    pub title: Option<String>,
    #[arg(short = 'd', long = "description", default_value = "")]
    pub description: String,
    /// Deadline (YYYY-MM-DD)
    #[arg(long = "deadline", value_parser = parse_date_arg)]
    pub deadline: Option<Date>,
    /// 1 (low), 2 (medium) or 3 (high); defaults to tasks.default_priority
    #[arg(short = 'p', long = "priority", value_parser = parse_priority_arg)]
    pub priority: Option<Priority>,
    /// todo, doing or done; defaults to tasks.default_status
    #[arg(short = 's', long = "status", value_parser = parse_status_arg)]
    pub status: Option<TaskStatus>,
    /// Create every task listed in a YAML file
    #[arg(short = 'f', long = "from-file", conflicts_with = "title")]
    pub from_file: Option<String>,
}

#[derive(Debug, Parser)]
pub struct EditArgs {
    pub id: i64,
    #[arg(long = "title")]
    pub title: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// New deadline (YYYY-MM-DD)
    #[arg(long = "deadline", value_parser = parse_date_arg, conflicts_with = "no_deadline")]
    pub deadline: Option<Date>,
    /// Remove the deadline
    #[arg(long = "no-deadline")]
    pub no_deadline: bool,
    #[arg(short = 'p', long = "priority", value_parser = parse_priority_arg)]
    pub priority: Option<Priority>,
    #[arg(short = 's', long = "status", value_parser = parse_status_arg)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    pub id: i64,
    #[arg(value_parser = parse_status_arg)]
    pub status: TaskStatus,
}

#[derive(Debug, Parser)]
pub struct RmArgs {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    #[default]
    All,
    Urgent,
    Active,
    Done,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Parser)]
pub struct ListArgs {
    #[arg(long = "view", value_enum, default_value_t = ViewArg::All)]
    pub view: ViewArg,
    /// Show score and description
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Show created/updated timestamps
    #[arg(long = "dates")]
    pub dates: bool,
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    pub id: i64,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

fn parse_date_arg(s: &str) -> Result<Date, String> {
    model::parse_date(s).map_err(|e| e.to_string())
}

fn parse_priority_arg(s: &str) -> Result<Priority, String> {
    let v: u8 = s
        .trim()
        .parse()
        .map_err(|_| format!("expected 1, 2 or 3, got '{s}'"))?;
    Priority::try_from(v).map_err(|e| e.to_string())
}

fn parse_status_arg(s: &str) -> Result<TaskStatus, String> {
    s.parse().map_err(|e: TaskdeckError| e.to_string())
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if let Some(TaskdeckError::Validation(v)) = err.downcast_ref::<TaskdeckError>() {
                for msg in v.messages() {
                    eprintln!("error: {msg}");
                }
                return ExitCode::from(EXIT_INVALID);
            }
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let wants_board = match cli.cmd {
        Some(Commands::Board) => true,
        None => tui::is_tty(),
        _ => false,
    };

    match cli.cmd {
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "taskdeck", &mut std::io::stdout());
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Version) => return Ok(cmd_version()),
        Some(Commands::Config(args)) => return cmd_config(args),
        _ => {}
    }

    let (cfg, _paths) = config::load()?;
    // The board owns the terminal; log lines would corrupt it.
    if !wants_board {
        logging::init(&cfg.log.level);
    }

    let mut store = open_store(&cfg, cli.file.as_deref())?;

    match cli.cmd {
        None if wants_board => cmd_board(&cfg, &mut store),
        None => cmd_list(
            &cfg,
            &store,
            &ListArgs {
                view: ViewArg::All,
                verbose: false,
                dates: cfg.ui.show_dates,
                json: false,
                csv: false,
            },
        ),
        Some(Commands::Board) => cmd_board(&cfg, &mut store),
        Some(Commands::Add(args)) => cmd_add(&cfg, &mut store, args),
        Some(Commands::Edit(args)) => cmd_edit(&mut store, args),
        Some(Commands::Status(args)) => cmd_status(&mut store, &args),
        Some(Commands::Rm(args)) => cmd_rm(&mut store, &args),
        Some(Commands::List(args)) => cmd_list(&cfg, &store, &args),
        Some(Commands::Show(args)) => cmd_show(&store, &args),
        Some(Commands::Config(_) | Commands::Completion(_) | Commands::Version) => {
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_store(cfg: &Config, file_override: Option<&str>) -> anyhow::Result<Store> {
    let path: PathBuf = match file_override {
        Some(f) => config::expand_path(f)?,
        None => cfg.tasks_file()?,
    };
    tracing::debug!(path = %path.display(), "opening task file");
    let store = TaskStore::open(FileSlot::new(path), SystemClock, cfg.tasks.store_options())?;
    Ok(store)
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        ConfigCmd::List => {
            print!("{}", config::list_resolved_toml()?);
        }
        ConfigCmd::Set(set) => {
            config::set_value_string(&set.key, &set.value)?;
            println!("Set {} = {}", set.key, set.value);
        }
        ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
            Some(v) => println!("{v}"),
            None => anyhow::bail!(
                "configuration key '{}' not found - use 'taskdeck config list' to see available keys",
                get.key
            ),
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_board(cfg: &Config, store: &mut Store) -> anyhow::Result<ExitCode> {
    let refresh = Duration::from_millis(cfg.ui.refresh_interval_ms);
    tui::board::run(store, refresh)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_add(cfg: &Config, store: &mut Store, args: AddArgs) -> anyhow::Result<ExitCode> {
    if let Some(file) = args.from_file.as_deref() {
        let created = add_from_file(cfg, store, file)?;
        for id in &created {
            if let Some(task) = store.get(*id) {
                print_added(store, task);
            }
        }
        println!("Added {} tasks from {}", created.len(), file);
        return Ok(ExitCode::SUCCESS);
    }

    let draft = TaskDraft {
        title: args.title.unwrap_or_default(),
        description: args.description,
        deadline: args.deadline,
        priority: match args.priority {
            Some(p) => p,
            None => cfg.tasks.priority()?,
        },
        status: match args.status {
            Some(s) => s,
            None => cfg.tasks.status()?,
        },
    };
    let id = store.create(draft)?.id;
    if let Some(task) = store.get(id) {
        print_added(store, task);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_added(store: &Store, task: &Task) {
    let now = store.now();
    println!("Task '{}' added (ID: {})", task.title, task.id);
    println!(
        "  Priority: {}, Status: {}, Deadline: {}",
        task.priority,
        task.status,
        fmt_tasks::deadline_label(task, now)
    );
    if policy::is_urgent(task, now) {
        println!("  Urgent!");
    }
}

#[derive(Debug, serde::Deserialize)]
struct TaskFile {
    version: String,
    tasks: Vec<TaskFileEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct TaskFileEntry {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    priority: Option<u8>,
    #[serde(default)]
    status: Option<String>,
}

fn add_from_file(cfg: &Config, store: &mut Store, file: &str) -> anyhow::Result<Vec<i64>> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read task file: {file}"))?;
    let def: TaskFile =
        serde_yaml::from_str(&data).with_context(|| format!("failed to parse YAML: {file}"))?;

    if def.version.trim() != "1.0" {
        anyhow::bail!(
            "unsupported task file version: {} (expected 1.0)",
            def.version
        );
    }

    // Parse and check every entry before creating any, so a bad entry
    // adds nothing.
    let mut drafts = Vec::with_capacity(def.tasks.len());
    for (i, entry) in def.tasks.into_iter().enumerate() {
        let n = i + 1;
        let deadline = match entry.deadline.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(d) => Some(model::parse_date(d).with_context(|| format!("task #{n}"))?),
        };
        let priority = match entry.priority {
            Some(p) => Priority::try_from(p).with_context(|| format!("task #{n}"))?,
            None => cfg.tasks.priority()?,
        };
        let status = match entry.status.as_deref() {
            Some(s) => s
                .parse::<TaskStatus>()
                .with_context(|| format!("task #{n}"))?,
            None => cfg.tasks.status()?,
        };
        drafts.push(TaskDraft {
            title: entry.title,
            description: entry.description,
            deadline,
            priority,
            status,
        });
    }

    let mut invalid = ValidationError::new();
    for (i, draft) in drafts.iter().enumerate() {
        for msg in store.check(draft).messages() {
            invalid.push(format!("task #{}: {msg}", i + 1));
        }
    }
    invalid.into_result().map_err(TaskdeckError::from)?;

    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        created.push(store.create(draft)?.id);
    }
    Ok(created)
}

fn cmd_edit(store: &mut Store, args: EditArgs) -> anyhow::Result<ExitCode> {
    let patch = TaskPatch {
        title: args.title.map(|s| s.trim().to_owned()),
        description: args.description.map(|s| s.trim().to_owned()),
        deadline: if args.no_deadline {
            Some(None)
        } else {
            args.deadline.map(Some)
        },
        priority: args.priority,
        status: args.status,
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change - pass at least one field to edit");
    }

    if store.update(args.id, &patch)? {
        println!("Task {} updated", args.id);
    } else {
        eprintln!("{}", TaskdeckError::TaskNotFound(args.id));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(store: &mut Store, args: &StatusArgs) -> anyhow::Result<ExitCode> {
    if store.set_status(args.id, args.status)? {
        println!("Task {} -> {}", args.id, args.status);
    } else {
        eprintln!("{}", TaskdeckError::TaskNotFound(args.id));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_rm(store: &mut Store, args: &RmArgs) -> anyhow::Result<ExitCode> {
    if store.delete(args.id)? {
        println!("Task {} deleted", args.id);
    } else {
        eprintln!("{}", TaskdeckError::TaskNotFound(args.id));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(store: &Store, args: &ShowArgs) -> anyhow::Result<ExitCode> {
    let task = store
        .get(args.id)
        .ok_or(TaskdeckError::TaskNotFound(args.id))?;
    if args.json {
        let mut s = serde_json::to_string_pretty(task)?;
        s.push('\n');
        print!("{s}");
    } else {
        print!("{}", fmt_tasks::task_details(task, store.now()));
    }
    Ok(ExitCode::SUCCESS)
}

fn selected_views<'a>(views: Views<'a>, view: ViewArg) -> Vec<(&'static str, Vec<&'a Task>)> {
    match view {
        ViewArg::All => vec![
            ("urgent", views.urgent),
            ("active", views.active),
            ("done", views.done),
        ],
        ViewArg::Urgent => vec![("urgent", views.urgent)],
        ViewArg::Active => vec![("active", views.active)],
        ViewArg::Done => vec![("done", views.done)],
    }
}

fn cmd_list(cfg: &Config, store: &Store, args: &ListArgs) -> anyhow::Result<ExitCode> {
    let now = store.now();
    let sections = selected_views(store.views(), args.view);

    if args.json {
        let value = if let [(_, tasks)] = sections.as_slice() {
            serde_json::to_value(tasks)?
        } else {
            let mut map = serde_json::Map::new();
            for (name, tasks) in &sections {
                map.insert((*name).to_owned(), serde_json::to_value(tasks)?);
            }
            serde_json::Value::Object(map)
        };
        let mut s = serde_json::to_string_pretty(&value)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    if args.csv {
        let mut t = Table::new([
            "view", "id", "title", "status", "priority", "deadline", "score", "urgent",
        ]);
        for (name, tasks) in &sections {
            for task in tasks {
                t.row([
                    (*name).to_owned(),
                    task.id.to_string(),
                    task.title.clone(),
                    task.status.to_string(),
                    task.priority.to_string(),
                    task.deadline.map(model::format_date).unwrap_or_default(),
                    policy::score(task, now).to_string(),
                    policy::is_urgent(task, now).to_string(),
                ]);
            }
        }
        t.write_csv()?;
        return Ok(ExitCode::SUCCESS);
    }

    let style = RowStyle {
        icons: cfg.ui.icons,
        verbose: args.verbose,
        show_dates: args.dates || cfg.ui.show_dates,
    };
    let many = sections.len() > 1;
    for (i, (name, tasks)) in sections.iter().enumerate() {
        if many {
            if i > 0 {
                println!();
            }
            println!("{} ({})", section_title(name), tasks.len());
        }
        if tasks.is_empty() {
            println!("None");
            continue;
        }
        fmt_tasks::task_table(tasks, now, style).print()?;
    }

    if many {
        println!();
        println!("{}", summary_line(store));
    }
    Ok(ExitCode::SUCCESS)
}

/// Counts footer naming the file the store was opened from.
fn summary_line(store: &Store) -> String {
    let c = store.counts();
    format!(
        "{} tasks: {} todo, {} doing, {} done, {} urgent - {}",
        c.total,
        c.todo,
        c.doing,
        c.done,
        c.urgent,
        config::tilde_path(&store.slot().path().to_string_lossy()),
    )
}

fn section_title(name: &str) -> &'static str {
    match name {
        "urgent" => "Urgent",
        "active" => "Active",
        _ => "Done",
    }
}

fn cmd_version() -> ExitCode {
    println!("taskdeck version {}", env!("CARGO_PKG_VERSION"));
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}
