//! Quick command launcher.
//!
//! Starts shell commands from a catalog (`config.txt`) or the command line,
//! captures their combined output in `command_exec_log.txt`, and tracks the
//! children so they can be killed together.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quickcmd::exit_codes;
use quickcmd::interactive::{run_shell, write_catalog};
use quickcmd::io::config::{CONFIG_FILE_NAME, SessionConfig, load_config};
use quickcmd::io::workspace::{
    QuickPaths, default_root, init_workspace, load_catalog, prepare_dir,
};
use quickcmd::logging;
use quickcmd::session::Session;

#[derive(Parser)]
#[command(
    name = "quickcmd",
    version,
    about = "Run quick shell commands and capture their output in a log"
)]
struct Cli {
    /// Working directory holding the catalog, settings and command log
    /// (defaults to ~/Quick_Command).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the working directory, catalog template and settings if missing.
    Init,
    /// Print the catalog entries.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Start catalog entries by title and wait until their output is captured.
    Run {
        #[arg(required = true)]
        titles: Vec<String>,
    },
    /// Start raw shell commands and wait until their output is captured.
    Exec {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Read commands and directives from stdin (`:help` lists directives).
    Shell,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.dir.unwrap_or_else(default_root);
    match cli.command {
        Command::Init => cmd_init(&root),
        Command::List { json } => cmd_list(&root, json),
        Command::Run { titles } => cmd_run(&root, &titles),
        Command::Exec { commands } => cmd_exec(&root, &commands),
        Command::Shell => cmd_shell(&root),
    }
}

fn load_settings(root: &Path) -> Result<(SessionConfig, QuickPaths)> {
    let config = load_config(&root.join(CONFIG_FILE_NAME))?;
    let paths = QuickPaths::new(root, &config);
    Ok((config, paths))
}

fn cmd_init(root: &Path) -> Result<i32> {
    let (config, _) = load_settings(root)?;
    let paths = init_workspace(root, &config)?;
    println!("{}", paths.root.display());
    Ok(exit_codes::OK)
}

fn cmd_list(root: &Path, json: bool) -> Result<i32> {
    let (_, paths) = load_settings(root)?;
    let catalog = load_catalog(&paths.catalog_path)?;
    let mut stdout = io::stdout().lock();
    if json {
        let mut payload =
            serde_json::to_string_pretty(catalog.entries()).context("serialize catalog")?;
        payload.push('\n');
        stdout.write_all(payload.as_bytes())?;
    } else {
        write_catalog(&mut stdout, &catalog)?;
    }
    Ok(exit_codes::OK)
}

fn cmd_run(root: &Path, titles: &[String]) -> Result<i32> {
    let (_, paths) = load_settings(root)?;
    let catalog = load_catalog(&paths.catalog_path)?;

    let mut commands = Vec::with_capacity(titles.len());
    for title in titles {
        match catalog.find(title) {
            Some(entry) => commands.push(entry.command.clone()),
            None => {
                eprintln!("no catalog entry titled {title:?}");
                return Ok(exit_codes::UNKNOWN_ENTRY);
            }
        }
    }
    cmd_exec(root, &commands)
}

fn cmd_exec(root: &Path, commands: &[String]) -> Result<i32> {
    let (config, _) = load_settings(root)?;
    prepare_dir(root)?;
    let mut session = Session::init(root, &config);

    let mut failed = 0usize;
    for command in commands {
        match session.execute(command) {
            Ok(pid) => println!("[{pid}] {command}"),
            Err(_) => failed += 1,
        }
    }

    session.wait_idle();
    session.teardown();
    Ok(if failed > 0 {
        exit_codes::SPAWN_FAILED
    } else {
        exit_codes::OK
    })
}

fn cmd_shell(root: &Path) -> Result<i32> {
    let (config, paths) = load_settings(root)?;
    prepare_dir(root)?;
    let session = Session::init(root, &config);
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    run_shell(session, &paths.catalog_path, stdin, &mut stdout)?;
    Ok(exit_codes::OK)
}
