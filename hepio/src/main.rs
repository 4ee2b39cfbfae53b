use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;

mod commands;
mod error;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "l",
        visible_alias = "list",
        about = "List the tuples of an archive and their entry counts"
    )]
    List {
        #[structopt(long, help = "Print the catalog as JSON")]
        json: bool,

        #[structopt(
            name = "hepfile",
            parse(from_os_str),
            help = "Path to the .hep archive"
        )]
        path: PathBuf,
    },

    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Unpack the compressed tuple streams of an archive"
    )]
    Extract {
        #[structopt(
            short,
            long,
            parse(from_os_str),
            help = "Directory to unpack into [default: archive name without extension]"
        )]
        output: Option<PathBuf>,

        #[structopt(
            name = "hepfile",
            parse(from_os_str),
            help = "Path to the .hep archive"
        )]
        path: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "hepio",
    about = "Inspect and unpack hepio tuple containers.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "hepio (l|x) [FLAGS|OPTIONS] <hepfile>"
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());

    let level = if opts.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match opts.cmd {
        Commands::List { path, json } => commands::list(path, json),
        Commands::Extract { path, output } => commands::extract(path, output, opts.verbose),
    };

    if let Err(e) = result {
        eprintln!("{:?}", anyhow::Error::new(e));
        std::process::exit(1);
    }
}
