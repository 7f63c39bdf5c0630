use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn snapshot_arg() -> clap::Arg {
    arg!(<SNAPSHOT>)
        .help("Path to a view snapshot (JSON)")
        .value_parser(clap::value_parser!(PathBuf))
}

fn policy_arg() -> clap::Arg {
    arg!(--"on-similar" <POLICY>)
        .required(false)
        .help(
            "What to do when the page only resembles known sites: reuse the most recent one, \
            confirm it as the same site, or register a new site",
        )
        .value_parser(["use", "confirm", "new"])
        .default_value("use")
}

fn json_arg() -> clap::Arg {
    arg!(--"json" "Print the result as JSON")
        .required(false)
        .action(clap::ArgAction::SetTrue)
}

fn id_arg(what: &'static str) -> clap::Arg {
    arg!(--"id" <ID>)
        .required(true)
        .help(what)
        .value_parser(clap::value_parser!(i64))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagekey")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagekey")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Only log warnings and errors")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log every heuristic decision")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .help("Database to use (default: ~/.config/pagekey/pagekey.db)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(true)
        .subcommand(
            command!("init")
                .about("Initializes the pagekey database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the pagekey database")
                        .default_value("~/.config/pagekey/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Deletes and recreates any existing database at the location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("identify")
                .about("Identify the page in a snapshot and classify its fields")
                .arg(snapshot_arg())
                .arg(json_arg()),
        )
        .subcommand(
            command!("fill")
                .about("Build fill suggestions for a snapshot from stored credentials")
                .arg(snapshot_arg())
                .arg(policy_arg())
                .arg(json_arg()),
        )
        .subcommand(
            command!("save")
                .about("Store the credentials typed into a snapshot")
                .arg(snapshot_arg())
                .arg(policy_arg()),
        )
        .subcommand(
            command!("site")
                .about("Manage known sites")
                .subcommand_required(true)
                .subcommand(command!("list").about("List sites, most recently used first"))
                .subcommand(
                    command!("rename")
                        .about("Renames a site")
                        .arg(id_arg("The id of the site"))
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The new name for the site"),
                        ),
                )
                .subcommand(
                    command!("delete")
                        .about("Deletes a site")
                        .arg(id_arg("The id of the site")),
                ),
        )
        .subcommand(
            command!("credential")
                .about("Manage stored credentials")
                .subcommand_required(true)
                .subcommand(command!("list").about("List stored credentials"))
                .subcommand(
                    command!("delete")
                        .about("Deletes a credential")
                        .arg(id_arg("The id of the credential")),
                ),
        )
}
