use clap::{CommandFactory, Parser};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use todo_timer_cli::cli::{Cli, Command, collect_config_overrides};
use todo_timer_core::alert::{Alert, alert_from_config};
use todo_timer_core::config::{
    Config, ConfigOverrides, load_config_with_fallback, merge_overrides, validate_durations,
};
use todo_timer_core::duration::format_stored;
use todo_timer_core::error::AppError;
use todo_timer_core::model::{TaskView, TimerState};
use todo_timer_core::registry::{ClearOutcome, TaskRegistry};
use todo_timer_core::storage::{SqliteTaskStore, store_path};
use todo_timer_core::timer::{DisplayEvent, TimerEngine};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

const ALERT_GRACE: Duration = Duration::from_secs(5);

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "task")]
    description: String,
    #[tabled(rename = "planned")]
    planned: String,
    #[tabled(rename = "remaining")]
    remaining: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "done")]
    done: String,
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_tasks_plain(tasks: &[TaskView]) {
    if tasks.is_empty() {
        println!("No tasks available");
        return;
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|task| TaskRow {
            id: short_id(&task.id).to_string(),
            description: task.description.clone(),
            planned: task.planned_display(),
            remaining: task.remaining_display(),
            state: task.state.label().to_string(),
            done: if task.completed { "x" } else { "" }.to_string(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::psql()));
}

fn task_json(task: &TaskView) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "description": task.description,
        "planned_duration": format_stored(task.planned_duration),
        "remaining": task.remaining_display(),
        "remaining_seconds": task.remaining.as_secs(),
        "state": task.state.label(),
        "completed": task.completed,
        "created_at": task.created_at,
    })
}

fn print_tasks_json(tasks: &[TaskView]) {
    let payload: Vec<serde_json::Value> = tasks.iter().map(task_json).collect();
    println!("{}", serde_json::Value::Array(payload));
}

fn print_task(json: bool, verb: &str, task: &TaskView) {
    if json {
        println!("{}", task_json(task));
    } else {
        println!(
            "{} task: {} ({}) {}",
            verb,
            task.description,
            short_id(&task.id),
            task.remaining_display()
        );
    }
}

fn print_clear_outcome(json: bool, outcome: &ClearOutcome) {
    if json {
        print_tasks_json(&outcome.removed);
    } else {
        for task in &outcome.removed {
            println!("Removed task: {} ({})", task.description, short_id(&task.id));
        }
        if outcome.removed.is_empty() && outcome.failures.is_empty() {
            println!("No completed tasks");
        }
    }

    for failure in &outcome.failures {
        warn!(task_id = %failure.task_id, error = %failure.error, "clear failed");
        eprintln!(
            "ERROR: could not remove task {}: {}",
            short_id(&failure.task_id),
            failure.error.user_message()
        );
    }
}

fn report_error(err: &AppError) {
    debug!(error = %err, "command failed");
    eprintln!("ERROR: {} - {}", err.code(), err.user_message());
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

struct App {
    config: Config,
    registry: TaskRegistry,
    events: UnboundedReceiver<DisplayEvent>,
}

/// Loads config, opens the store and reloads the task list. A store that
/// cannot be opened is fatal.
fn open_app(overrides: &ConfigOverrides) -> Result<App, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        warn!(error = %err, "config unreadable, using defaults");
        eprintln!("WARNING: {err}");
    }
    let config = merge_overrides(&loaded.config, overrides);
    validate_durations(&config.durations)?;

    let path = store_path(config.store_path.as_deref())?;
    let store = SqliteTaskStore::open(&path)?;
    let alert: Arc<dyn Alert> = Arc::from(alert_from_config(&config));

    let (tx, events) = mpsc::unbounded_channel();
    let engine = TimerEngine::new(Arc::new(store), alert).with_events(tx);
    let mut registry = TaskRegistry::new(engine);
    registry.load_from_store()?;

    Ok(App {
        config,
        registry,
        events,
    })
}

/// Runs every command that does not need to wait on a timer.
fn run_command(
    registry: &mut TaskRegistry,
    config: &Config,
    command: Command,
    json: bool,
) -> Result<(), AppError> {
    match command {
        Command::Add {
            description,
            duration,
        } => {
            let task = registry.add_task(&description, &duration)?;
            print_task(json, "Added", &task);
        }
        Command::List => {
            let tasks = registry.list();
            if json {
                print_tasks_json(&tasks);
            } else {
                print_tasks_plain(&tasks);
            }
        }
        Command::Start { id } => {
            let before = registry.get(&id)?;
            let task = registry.start(&id)?;
            if before.state == TimerState::Running {
                print_task(json, "Already running", &task);
            } else {
                print_task(json, "Started", &task);
            }
        }
        Command::Stop { id } => {
            let before = registry.get(&id)?;
            let task = registry.stop(&id)?;
            if before.state == TimerState::Running {
                print_task(json, "Stopped", &task);
            } else {
                print_task(json, "Not running", &task);
            }
        }
        Command::Reset { id } => {
            let task = registry.reset(&id)?;
            print_task(json, "Reset", &task);
        }
        Command::Done { id } => {
            let task = registry.toggle_completed(&id)?;
            let verb = if task.completed { "Completed" } else { "Reopened" };
            print_task(json, verb, &task);
        }
        Command::Clear => {
            let outcome = registry.clear_completed();
            print_clear_outcome(json, &outcome);
            if let Some(failure) = outcome.failures.into_iter().next() {
                return Err(failure.error);
            }
        }
        Command::Durations => {
            if json {
                println!("{}", serde_json::json!(config.durations));
            } else {
                for duration in &config.durations {
                    println!("{duration}");
                }
            }
        }
    }

    Ok(())
}

/// Counts down one task in the foreground until it expires or Ctrl-C stops it.
async fn run_foreground(app: &mut App, id: &str, json: bool) -> Result<(), AppError> {
    let task = app.registry.start(id)?;
    print_task(json, "Started", &task);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = app.events.recv() => {
                let Some(event) = event else { break };
                if event.task_id() != Some(task.id.as_str()) {
                    continue;
                }
                match event {
                    DisplayEvent::Tick { .. } if !json => {
                        if let Some(clock) = event.clock() {
                            print!("\r{} {}", task.description, clock);
                            io::stdout().flush().map_err(|err| AppError::io(err.to_string()))?;
                        }
                    }
                    DisplayEvent::Expired { .. } => {
                        if !json {
                            println!();
                        }
                        let finished = app.registry.get(&task.id)?;
                        print_task(json, "Finished", &finished);
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut ctrl_c => {
                if !json {
                    println!();
                }
                let stopped = app.registry.stop(&task.id)?;
                print_task(json, "Stopped", &stopped);
                break;
            }
        }
    }

    Ok(())
}

fn render_event(registry: &TaskRegistry, event: &DisplayEvent) {
    if let DisplayEvent::Expired { task_id } = event {
        match registry.get(task_id) {
            Ok(task) => println!(
                "Timer finished: {} ({}) {}",
                task.description,
                short_id(&task.id),
                task.remaining_display()
            ),
            Err(err) => debug!(task_id = %task_id, error = %err, "expired task no longer listed"),
        }
    }
}

enum LineOutcome {
    Continue,
    Quit,
}

fn handle_line(registry: &mut TaskRegistry, config: &Config, line: &str) -> LineOutcome {
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return LineOutcome::Quit;
    }

    if line == "help" || line == "?" {
        print_help();
        return LineOutcome::Continue;
    }

    let args = match split_command_line(line) {
        Ok(args) => args,
        Err(err) => {
            report_error(&err);
            return LineOutcome::Continue;
        }
    };

    if args.is_empty() {
        return LineOutcome::Continue;
    }

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("todo_timer".to_string());
    argv.extend(args);

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => {
            report_error(&normalize_parse_error(err));
            return LineOutcome::Continue;
        }
    };

    if let Err(err) = run_command(registry, config, cli.command, cli.json) {
        report_error(&err);
    }

    LineOutcome::Continue
}

/// Reads commands on a helper thread so the control loop can keep rendering
/// timer events while waiting for input. Running timers are abandoned on exit.
async fn run_interactive(app: App) -> Result<(), AppError> {
    let App {
        config,
        mut registry,
        mut events,
    } = app;

    let (line_tx, mut lines) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        let mut input = String::new();
        loop {
            input.clear();
            match stdin_lock.read_line(&mut input) {
                Ok(0) => break,
                Ok(_) => {
                    if line_tx.send(input.trim().to_string()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to read stdin");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                if let LineOutcome::Quit = handle_line(&mut registry, &config, &line) {
                    break;
                }
            }
            Some(event) = events.recv() => render_event(&registry, &event),
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

async fn run() -> i32 {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let result = match open_app(&ConfigOverrides::default()) {
            Ok(app) => run_interactive(app).await,
            Err(err) => Err(err),
        };
        return match result {
            Ok(()) => 0,
            Err(err) => {
                report_error(&err);
                1
            }
        };
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            let _ = err.print();
            return 0;
        }
        Err(err) => {
            report_error(&normalize_parse_error(err));
            return 1;
        }
    };

    let overrides = match collect_config_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(message) => {
            report_error(&AppError::invalid_input(message));
            return 1;
        }
    };

    let mut app = match open_app(&overrides) {
        Ok(app) => app,
        Err(err) => {
            report_error(&err);
            return 1;
        }
    };

    let result = match cli.command {
        Command::Start { id } => run_foreground(&mut app, &id, cli.json).await,
        // Running state lives in the process that started the timer.
        Command::Stop { .. } => Err(AppError::invalid_input(
            "stop only works inside the interactive prompt; press Ctrl-C to stop a foreground start",
        )),
        command => run_command(&mut app.registry, &app.config, command, cli.json),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    }
}

fn main() {
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            report_error(&AppError::io(err.to_string()));
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run());
    // Tick loops are dropped; an alert already playing gets a short grace period.
    runtime.shutdown_timeout(ALERT_GRACE);
    std::process::exit(code);
}
