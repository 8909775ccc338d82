use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::config::InterpreterConfig;
use rox::error::RunError;
use rox::interpreter::ExecMode;
use rox::session::Session;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,

    /// JSON file with interpreter settings
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a Lox script
    Run { filename: PathBuf },

    /// Starts an interactive prompt (the default)
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

fn report(error: &RunError) {
    match error {
        RunError::Static(errors) => {
            for e in errors {
                eprintln!("{}", e);
            }
        }
        RunError::Runtime(e) => eprintln!("{}", e),
    }
}

fn run_file(filename: &Path, config: InterpreterConfig) -> Result<()> {
    info!("Running Run subcommand");

    let source = match read_file(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(74);
        }
    };

    let mut session = Session::new(config);

    if let Err(e) = session.run(&source, ExecMode::SCRIPT) {
        debug!("Run failed: {}", e);
        report(&e);
        process::exit(e.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

fn run_prompt(config: InterpreterConfig) -> Result<()> {
    info!("Running Repl subcommand");

    let mut session = Session::new(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        if let Err(e) = session.run(&line, ExecMode::REPL) {
            debug!("Entry failed: {}", e);
            report(&e);
        }
    }

    info!("Repl session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let config = match &args.config {
        Some(path) => InterpreterConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => InterpreterConfig::default(),
    };

    match args.command {
        Some(Commands::Run { filename }) => run_file(&filename, config),
        Some(Commands::Repl) | None => run_prompt(config),
    }
}
