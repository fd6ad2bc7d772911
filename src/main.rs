use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};

use nvchart::commands;

fn build_cli() -> Command {
    Command::new("nvchart")
        .version(env!("CARGO_PKG_VERSION"))
        .about("NVIDIA GPU telemetry collector")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON file with collector options (legacy, nvMemFactor)")
                .global(true),
        )
        .arg(
            Arg::new("legacy")
                .long("legacy")
                .help("Backfill missing values from nvidia-settings")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("mem-factor")
                .long("mem-factor")
                .value_name("N")
                .help("Memory clock multiplier (2 for DDR effective clock)")
                .value_parser(value_parser!(u32))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("check")
                .about("Initialize and print the chart definitions")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the schema as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("snapshot").about("Print one snapshot as JSON"))
        .subcommand(
            Command::new("run")
                .about("Collect continuously in netdata plugin format")
                .arg(
                    Arg::new("update-every")
                        .short('u')
                        .long("update-every")
                        .value_name("SECS")
                        .help("Seconds between collections")
                        .value_parser(value_parser!(u64))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("Stop after N collections")
                        .value_parser(value_parser!(u64)),
                ),
        )
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    // Global flags are propagated into the subcommand matches
    let verbose = match matches.subcommand() {
        Some((_, sub_matches)) => sub_matches.get_flag("verbose"),
        None => matches.get_flag("verbose"),
    };
    nvchart::init_logging(verbose);

    match matches.subcommand() {
        Some(("check", sub_matches)) => commands::check(sub_matches),
        Some(("snapshot", sub_matches)) => commands::snapshot(sub_matches),
        Some(("run", sub_matches)) => commands::run(sub_matches),
        _ => {
            println!("Use 'nvchart --help' for more information.");
            Ok(())
        }
    }
}
