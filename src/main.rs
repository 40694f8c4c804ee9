//! keymacro -- record keyboard input and replay it on demand.
//!
//! Entry point: loads the config, builds the platform hook and injector, and
//! runs a line-oriented command loop on the main thread.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use keymacro::command::{self, Command, HELP};
use keymacro::{platform, Config, MacroRecorder};

#[derive(Debug, Parser)]
#[command(version, about = "Record keyboard input and replay it on demand")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/keymacro/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the config file.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("keymacro: {e}");
            return ExitCode::FAILURE;
        }
    };

    let default_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::info!("keymacro v{}", env!("CARGO_PKG_VERSION"));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let hook = platform::create_input_hook(config)?;
    let injector = platform::create_input_injector(config)?;
    let mut recorder = MacroRecorder::new(hook, injector);

    println!("{HELP}");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match command::execute(&mut recorder, command, &line) {
            Ok(output) => println!("{output}"),
            Err(e) => println!("error: {e}"),
        }
    }

    if recorder.can_stop_recording() {
        recorder.stop_recording()?;
    }
    Ok(())
}
