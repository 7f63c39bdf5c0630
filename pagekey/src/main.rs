use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use pagekey::handlers::*;
use std::path::PathBuf;
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    init_logging(&matches);

    let db = resolve_db_path(matches.get_one::<PathBuf>("db").map(PathBuf::as_path));

    let result = match matches.subcommand() {
        Some(("init", args)) => handle_init(args),
        Some(("identify", args)) => handle_identify(args),
        Some(("fill", args)) => handle_fill(args, &db).await,
        Some(("save", args)) => handle_save(args, &db).await,
        Some(("site", args)) => match args.subcommand() {
            Some(("list", _)) => handle_site_list(&db),
            Some(("rename", sub)) => handle_site_rename(sub, &db),
            Some(("delete", sub)) => handle_site_delete(sub, &db),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("credential", args)) => match args.subcommand() {
            Some(("list", _)) => handle_credential_list(&db),
            Some(("delete", sub)) => handle_credential_delete(sub, &db),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(matches: &ArgMatches) {
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else if matches.get_flag("quiet") {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
