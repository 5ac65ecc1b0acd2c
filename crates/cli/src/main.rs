//! docmeta CLI: read, write and filter document extended attributes.
//!
//! `docmeta [--config FILE] [--seed FILE] [--keyspace KS] [--json] COMMAND`
//!
//! The CLI starts an in-process store node at the first host of the
//! configured connection string, loads the seed file into it, connects with
//! the configured credentials and runs one command.

mod commands;
mod format;
mod parse;
mod state;
mod value;

use std::path::{Path, PathBuf};
use std::process;

use docmeta_core::{Error, Keyspace, Result};
use docmeta_engine::{ClientConfig, CONFIG_FILE_NAME};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_output, OutputMode};
use parse::matches_to_action;
use state::{Seed, SessionState, DEFAULT_BUCKET};

fn main() {
    let matches = build_cli().get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(msg) => {
            eprintln!("{}", format_error(&Error::invalid_argument(msg), mode));
            process::exit(2);
        }
    };

    let state = match open_state(&matches) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    };

    match state.execute(action) {
        Ok(output) => {
            println!("{}", format_output(&output, mode));
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    }
}

fn open_state(matches: &clap::ArgMatches) -> Result<SessionState> {
    let config = load_config(matches.get_one::<String>("config").map(PathBuf::from))?;
    let seed = match matches.get_one::<String>("seed") {
        Some(path) => Seed::from_file(Path::new(path))?,
        None => Seed::default(),
    };
    let keyspace: Keyspace = matches
        .get_one::<String>("keyspace")
        .map(String::as_str)
        .unwrap_or(DEFAULT_BUCKET)
        .parse()?;
    SessionState::open(&config, &seed, &keyspace)
}

/// `--config` if given, else `docmeta.toml` in the working directory if
/// present, else defaults.
fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::from_file(&path),
        None => {
            let default = Path::new(CONFIG_FILE_NAME);
            if default.exists() {
                ClientConfig::from_file(default)
            } else {
                Ok(ClientConfig::default())
            }
        }
    }
}
