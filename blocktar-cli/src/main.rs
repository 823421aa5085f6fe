//! blocktar CLI - streaming USTAR archiver
//!
//! Lists, extracts, creates and appends to plain (uncompressed) USTAR archives.

mod commands;
mod utils;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blocktar")]
#[command(author, version, about = "Streaming USTAR archive tool")]
#[command(long_about = "
blocktar reads and writes plain USTAR archives in fixed-size chunks, so
archives of any size are processed in constant memory.

Examples:
  blocktar list backup.tar
  blocktar list backup.tar --json -I '*.rs'
  blocktar extract backup.tar -o restored
  blocktar create backup.tar src docs README.md
  blocktar append backup.tar notes.txt
")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    #[command(visible_aliases = ["l", "t"])]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,
    },

    /// Extract entries from an archive
    #[command(visible_alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Include only entries matching pattern (glob syntax: *.txt, src/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Don't restore modification times
        #[arg(long)]
        touch: bool,

        /// Don't restore permission bits
        #[arg(long)]
        no_same_permissions: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Create a new archive
    #[command(visible_alias = "c")]
    Create {
        /// Output archive file (.tar)
        archive: PathBuf,

        /// Files and directories to add
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Show progress instead of per-entry lines
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Append files to an existing archive
    #[command(visible_aliases = ["a", "r"])]
    Append {
        /// Archive file to extend (.tar)
        archive: PathBuf,

        /// Files and directories to add
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Show progress instead of per-entry lines
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::List {
            archive,
            json,
            include,
            exclude,
        } => commands::cmd_list(&archive, json, &include, &exclude),
        Commands::Extract {
            archive,
            output,
            include,
            exclude,
            touch,
            no_same_permissions,
            progress,
        } => commands::cmd_extract(
            &archive,
            &output,
            &commands::ExtractFlags {
                include: &include,
                exclude: &exclude,
                touch,
                no_same_permissions,
                progress,
            },
        ),
        Commands::Create {
            archive,
            sources,
            progress,
        } => commands::cmd_create(&archive, &sources, progress),
        Commands::Append {
            archive,
            sources,
            progress,
        } => commands::cmd_append(&archive, &sources, progress),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases() {
        for alias in ["list", "l", "t"] {
            let cli = Cli::try_parse_from(["blocktar", alias, "a.tar"]).unwrap();
            assert!(matches!(cli.command, Commands::List { .. }));
        }
        for alias in ["append", "a", "r"] {
            let cli = Cli::try_parse_from(["blocktar", alias, "a.tar", "src"]).unwrap();
            assert!(matches!(cli.command, Commands::Append { .. }));
        }
        let cli = Cli::try_parse_from(["blocktar", "x", "a.tar", "-o", "out"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract { .. }));
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["blocktar", "-vv", "list", "a.tar"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["blocktar", "list", "a.tar", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_create_requires_sources() {
        assert!(Cli::try_parse_from(["blocktar", "create", "a.tar"]).is_err());
    }
}
