use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod fsio;
mod insert;
mod matcher;
mod resolve;
mod router;
mod schedule;

use config::{config_path, load_config, Config, ExitBehavior};
use schedule::{Scheduler, SchedulerState};

#[derive(Parser, Debug)]
#[command(
    name = "jot",
    version,
    about = "Prompted note logger that routes entries into Markdown files"
)]
struct Cli {
    /// Config file (default: the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Route one note through the configured rules
    Add(AddArgs),
    /// Prompt for a note on the aligned interval until EOF or :quit
    Watch,
    /// Show when the next prompt would fire
    Next,
    /// List loaded rules and any dropped at load time
    Rules,
    /// Write a starter config
    Init(InitArgs),
}

#[derive(Parser, Debug)]
struct AddArgs {
    /// Note text; multiple words are joined with spaces
    #[arg(required = true, value_name = "TEXT")]
    text: Vec<String>,
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Overwrite an existing config
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_file = config_path(cli.config.as_deref());
    match cli.command {
        Commands::Add(args) => cmd_add(&config_file, &args),
        Commands::Watch => cmd_watch(&config_file),
        Commands::Next => cmd_next(&config_file),
        Commands::Rules => cmd_rules(&config_file),
        Commands::Init(args) => cmd_init(&config_file, &args),
    }
}

fn wall_clock_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn cmd_add(config_file: &Path, args: &AddArgs) -> Result<()> {
    let config = load_config(config_file)?;
    let text = args.text.join(" ");
    router::route(&text, &config, wall_clock_now())?;
    Ok(())
}

fn cmd_watch(config_file: &Path) -> Result<()> {
    let config = load_config(config_file)?;
    let mut scheduler = Scheduler::new(config.interval_minutes);
    scheduler.start(wall_clock_now());

    loop {
        if scheduler.state() == SchedulerState::Paused {
            let Some(line) = read_line("paused (:resume to continue): ")? else {
                break;
            };
            if line.trim() == ":resume" {
                scheduler.resume(wall_clock_now());
            }
            continue;
        }

        if let Some(remaining) = scheduler.remaining(wall_clock_now()) {
            std::thread::sleep(remaining.to_std().unwrap_or(Duration::ZERO));
        }
        if !scheduler.poll(wall_clock_now()) {
            continue;
        }

        let Some(line) = read_line("What are you doing? ")? else {
            break;
        };
        match line.trim() {
            ":quit" => {
                scheduler.stop();
                break;
            }
            ":pause" => scheduler.pause(),
            answer => {
                // Keep prompting even when a write fails outright.
                if let Err(err) = router::route(answer, &config, wall_clock_now()) {
                    let reason = format!("{err:#}");
                    tracing::error!(%reason, "entry not written");
                }
            }
        }
    }
    Ok(())
}

fn cmd_next(config_file: &Path) -> Result<()> {
    let config = load_config(config_file)?;
    let mut scheduler = Scheduler::new(config.interval_minutes);
    let now = wall_clock_now();
    scheduler.start(now);
    let due = scheduler
        .next_fire()
        .ok_or_else(|| anyhow!("scheduler failed to arm"))?;
    let remaining = scheduler
        .remaining(now)
        .unwrap_or_else(chrono::Duration::zero);
    println!(
        "next prompt at {} (in {}m {}s, every {}m)",
        due.format("%H:%M"),
        remaining.num_minutes(),
        remaining.num_seconds() % 60,
        scheduler.interval_minutes()
    );
    Ok(())
}

fn cmd_rules(config_file: &Path) -> Result<()> {
    let config: Config = load_config(config_file)?;
    println!("interval: every {} minutes", config.interval_minutes);
    println!(
        "default: {} ({})",
        config.default.file.display(),
        config.default.insert.name()
    );
    for rule in &config.rules {
        let exit = match rule.exit {
            ExitBehavior::Finish => "finish",
            ExitBehavior::Continue => "continue",
        };
        println!(
            "{:>4}  {:?} -> {} [{}, {}]",
            rule.key,
            rule.matcher.pattern(),
            rule.destination.describe(),
            rule.insert.name(),
            exit
        );
    }
    for dropped in &config.dropped {
        println!("{:>4}  dropped: {}", dropped.key, dropped.reason);
    }
    Ok(())
}

fn cmd_init(config_file: &Path, args: &InitArgs) -> Result<()> {
    if config_file.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            config_file.display()
        ));
    }
    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(config_file, config::config_stub())?;
    println!("wrote {}", config_file.display());
    Ok(())
}

/// Prompt on stdout and read one line; `None` on EOF.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
