//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("docmeta")
        .about("Read, write and filter document extended attributes")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Client config file (default: docmeta.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("JSON file with users and documents to load into the in-process node")
                .global(true),
        )
        .arg(
            Arg::new("keyspace")
                .long("keyspace")
                .help("bucket or bucket.scope.collection (default: travel-sample)")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_get())
        .subcommand(build_set())
        .subcommand(build_remove())
        .subcommand(build_filter())
}

fn id_arg() -> Arg {
    Arg::new("id").required(true).help("Document id")
}

fn body_flag() -> Arg {
    Arg::new("body")
        .long("body")
        .help("Address the document body instead of extended attributes")
        .action(ArgAction::SetTrue)
}

fn build_get() -> Command {
    Command::new("get")
        .about("Read a whole document, or the value at a path")
        .arg(id_arg())
        .arg(Arg::new("path").help("Path (default: whole body)"))
        .arg(body_flag())
        .arg(
            Arg::new("exists")
                .long("exists")
                .help("Only report whether the path holds a value")
                .action(ArgAction::SetTrue)
                .requires("path"),
        )
}

fn build_set() -> Command {
    Command::new("set")
        .about("Write a value at a path")
        .arg(id_arg())
        .arg(Arg::new("path").required(true).help("Path"))
        .arg(
            Arg::new("value")
                .required(true)
                .help("Value (JSON, number, bool, null or bare string)"),
        )
        .arg(body_flag())
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_parser(["upsert", "insert", "replace"])
                .default_value("upsert")
                .help("Write mode"),
        )
        .arg(
            Arg::new("no-parents")
                .long("no-parents")
                .help("Fail instead of creating missing intermediate objects")
                .action(ArgAction::SetTrue),
        )
}

fn build_remove() -> Command {
    Command::new("remove")
        .about("Remove the value at a path")
        .arg(id_arg())
        .arg(Arg::new("path").required(true).help("Path"))
        .arg(body_flag())
}

fn build_filter() -> Command {
    Command::new("filter")
        .about("List documents whose extended attribute at PATH satisfies PREDICATE")
        .arg(Arg::new("path").required(true).help("Extended-attribute path to probe"))
        .arg(
            Arg::new("predicate")
                .required(true)
                .help("'any' or an operator and value, e.g. '> 15', '== gold'"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .default_value("")
                .conflicts_with("ids")
                .help("Probe every document whose id starts with this prefix"),
        )
        .arg(
            Arg::new("ids")
                .long("ids")
                .value_delimiter(',')
                .num_args(1..)
                .help("Probe only these ids (comma-separated)"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_parser(clap::value_parser!(usize))
                .help("Probe workers (default: from config)"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(clap::value_parser!(usize))
                .help("Stop after this many matches"),
        )
}
