//! ArgMatches → CliAction conversion.

use clap::ArgMatches;
use docmeta_core::{DocValue, PathNamespace, WriteMode};
use docmeta_engine::{FilterOptions, Listing, Predicate};

use crate::value::{parse_predicate, parse_value};

/// The result of parsing the command line.
pub enum CliAction {
    /// Read the whole body of a document.
    Get { id: String },
    /// Read the value at a path.
    Read {
        id: String,
        path: String,
        namespace: PathNamespace,
    },
    /// Report whether a path holds a value.
    Exists {
        id: String,
        path: String,
        namespace: PathNamespace,
    },
    /// Write a value at a path.
    Set {
        id: String,
        path: String,
        value: DocValue,
        namespace: PathNamespace,
        mode: WriteMode,
        create_parents: bool,
    },
    /// Remove the value at a path.
    Remove {
        id: String,
        path: String,
        namespace: PathNamespace,
    },
    /// Run a filter workflow.
    Filter {
        listing: Listing,
        path: String,
        predicate: Predicate,
        workers: Option<usize>,
        limit: Option<usize>,
    },
}

/// Filter options for a run, starting from the connection's defaults.
pub fn filter_options(
    workers: Option<usize>,
    limit: Option<usize>,
    defaults: &FilterOptions,
) -> FilterOptions {
    let mut options = defaults.clone();
    if let Some(w) = workers {
        options.workers = w;
    }
    options.max_results = limit.or(options.max_results);
    options
}

fn required(m: &ArgMatches, name: &str) -> Result<String, String> {
    m.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("missing argument <{}>", name))
}

fn namespace(m: &ArgMatches) -> PathNamespace {
    if m.get_flag("body") {
        PathNamespace::Body
    } else {
        PathNamespace::Metadata
    }
}

/// Convert parsed matches into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("get", m)) => {
            let id = required(m, "id")?;
            match m.get_one::<String>("path") {
                None => Ok(CliAction::Get { id }),
                Some(path) if m.get_flag("exists") => Ok(CliAction::Exists {
                    id,
                    path: path.clone(),
                    namespace: namespace(m),
                }),
                Some(path) => Ok(CliAction::Read {
                    id,
                    path: path.clone(),
                    namespace: namespace(m),
                }),
            }
        }
        Some(("set", m)) => {
            let mode = match m.get_one::<String>("mode").map(String::as_str) {
                Some("insert") => WriteMode::InsertOnly,
                Some("replace") => WriteMode::Replace,
                _ => WriteMode::Upsert,
            };
            Ok(CliAction::Set {
                id: required(m, "id")?,
                path: required(m, "path")?,
                value: parse_value(&required(m, "value")?),
                namespace: namespace(m),
                mode,
                create_parents: !m.get_flag("no-parents"),
            })
        }
        Some(("remove", m)) => Ok(CliAction::Remove {
            id: required(m, "id")?,
            path: required(m, "path")?,
            namespace: namespace(m),
        }),
        Some(("filter", m)) => {
            let listing = match m.get_many::<String>("ids") {
                Some(ids) => Listing::ids(ids.cloned()),
                None => Listing::scan(m.get_one::<String>("prefix").cloned().unwrap_or_default()),
            };
            Ok(CliAction::Filter {
                listing,
                path: required(m, "path")?,
                predicate: parse_predicate(&required(m, "predicate")?)?,
                workers: m.get_one::<usize>("workers").copied(),
                limit: m.get_one::<usize>("limit").copied(),
            })
        }
        Some((other, _)) => Err(format!("unknown command '{}'", other)),
        None => Err("no command given".to_string()),
    }
}
