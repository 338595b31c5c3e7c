mod alarm;
mod console;
mod error;
mod ports;
mod runtime;
mod time_provider;
mod timer;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::alarm::engine::{TriggerEngine, due_alarms};
use crate::alarm::model::{
    Recurrence, RecurrenceKind, format_time, parse_time_field, validate_time,
};
use crate::alarm::registry::{AddOutcome, AlarmRegistry};
use crate::alarm::store::JsonFileStore;
use crate::console::{ConsoleNotifier, TerminalBell};
use crate::runtime::{AlarmClock, Command};
use crate::time_provider::SystemTimeProvider;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRecurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl From<CliRecurrence> for RecurrenceKind {
    fn from(value: CliRecurrence) -> Self {
        match value {
            CliRecurrence::None => RecurrenceKind::Once,
            CliRecurrence::Daily => RecurrenceKind::Daily,
            CliRecurrence::Weekly => RecurrenceKind::Weekly,
            CliRecurrence::Monthly => RecurrenceKind::Monthly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "snoozeclock",
    version,
    about = "Alarm clock with recurring alarms and snooze"
)]
struct Cli {
    #[arg(long, global = true, default_value = "alarms.json")]
    alarms: PathBuf,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Watch the clock and ring matching alarms (s = stop, z = snooze, q = quit)
    Run,
    /// Add an alarm; empty or non-numeric fields count as 0
    Add {
        #[arg(allow_negative_numbers = true)]
        hour: String,
        #[arg(allow_negative_numbers = true)]
        minute: Option<String>,
        #[arg(allow_negative_numbers = true)]
        second: Option<String>,
        #[arg(long, value_enum, default_value_t = CliRecurrence::None)]
        recurrence: CliRecurrence,
        /// Day of week (0 = Sunday) for weekly, day of month for monthly
        #[arg(long, allow_negative_numbers = true)]
        day: Option<String>,
    },
    List,
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
    Clear,
    /// Print the alarms that would fire at a local time, without firing them
    Check {
        #[arg(long)]
        at: String,
    },
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.alarms);
    let mut registry = AlarmRegistry::load(store)
        .with_context(|| format!("failed to load {}", cli.alarms.display()))?;

    match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => run_clock(registry),
        CliCommand::Add {
            hour,
            minute,
            second,
            recurrence,
            day,
        } => {
            let time = validate_time(
                parse_time_field(&hour),
                parse_time_field(minute.as_deref().unwrap_or("")),
                parse_time_field(second.as_deref().unwrap_or("")),
            )?;
            let recurrence = Recurrence::from_kind(
                recurrence.into(),
                day.as_deref().map(parse_time_field),
            )?;
            let created = Local::now().timestamp_millis();
            match registry.add(time, recurrence, created)? {
                AddOutcome::Added(id) => println!("{id}"),
                AddOutcome::Duplicate => println!("duplicate alarm ignored"),
            }
            Ok(())
        }
        CliCommand::List => {
            if registry.is_empty() {
                println!("no alarms");
            }
            for alarm in registry.alarms() {
                println!(
                    "{}  {}  {}  {}",
                    alarm.id,
                    format_time(alarm.time),
                    alarm.recurrence,
                    if alarm.is_active { "on" } else { "off" }
                );
            }
            Ok(())
        }
        CliCommand::Toggle { id } => match registry.toggle(&id)? {
            Some(active) => {
                println!("{id} {}", if active { "on" } else { "off" });
                Ok(())
            }
            None => bail!("no alarm with id '{id}'"),
        },
        CliCommand::Delete { id } => {
            if !registry.delete(&id)? {
                bail!("no alarm with id '{id}'");
            }
            println!("deleted {id}");
            Ok(())
        }
        CliCommand::Clear => {
            let removed = registry.clear()?;
            println!("cleared {removed} alarm(s)");
            Ok(())
        }
        CliCommand::Check { at } => {
            let now = parse_check_time(&at)?;
            let due: Vec<&str> = due_alarms(registry.alarms(), &now)
                .map(|alarm| alarm.id.as_str())
                .collect();
            if due.is_empty() {
                println!("no alarms due");
            }
            for id in due {
                println!("{id}");
            }
            Ok(())
        }
    }
}

fn run_clock(registry: AlarmRegistry<JsonFileStore>) -> Result<()> {
    let notifier = ConsoleNotifier::stdout(registry.store().settings().notifications_enabled);
    let engine = TriggerEngine::new(TerminalBell::stderr(), notifier);
    let mut clock = AlarmClock::new(registry, engine, SystemTimeProvider);
    clock.run(spawn_command_reader());
    Ok(())
}

fn spawn_command_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = Command::parse(&line) else {
                warn!(input = %line.trim(), "unknown command, use s (stop), z (snooze) or q (quit)");
                continue;
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_check_time(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| format!("invalid --at '{input}', expected YYYY-MM-DDTHH:MM:SS"))
}
