/*!
Main binary for jmesquery.
*/

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::generate;
use serde_json::Value;
use std::io::stdout;
use std::io::{self};
use std::{
    fs::{self},
    io::{IsTerminal, Read},
    path::PathBuf,
};

use jmesquery::query::Expression;
use jmesquery::utils;

/// Evaluate a JMESPath expression against an input JSON document.
#[derive(Parser)]
#[command(name = "jp", version, about, arg_required_else_help = true, long_about = None, disable_help_subcommand = true)]
struct Args {
    /// Optional subcommands
    #[command(subcommand)]
    command: Option<Commands>,
    /// JMESPath expression (e.g., "locations[?state == 'WA'].name")
    expression: Option<String>,
    #[arg(value_name = "FILE")]
    /// Optional path to JSON file. If omitted, reads from STDIN
    input: Option<PathBuf>,
    /// Do not pretty-print the JSON output, instead use compact
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,
    /// Print the compiled form of the expression and exit
    #[arg(long, action = ArgAction::SetTrue)]
    ast: bool,
}

/// Available subcommands for `jp`
#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    /// Generate additional documentation and/or completions
    Generate(GenerateCommand),
}

/// Generate shell completions and man pages
#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate shell completions for the given shell to stdout.
    Shell { shell: clap_complete::Shell },
    /// Generate man pages for jp to the output directory if specified,
    /// else the current directory.
    Man {
        /// The output directory to write the man pages.
        #[clap(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Entry point for main binary.
///
/// This parses the command line arguments, compiles the expression, and
/// evaluates it against the input document. If the input is piped in, it
/// reads from STDIN. The output is printed to STDOUT, with formatting
/// determined by the command line arguments.
fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Generate(cmd)) => match cmd {
            GenerateCommand::Shell { shell } => {
                let mut cmd = Args::command();
                generate(shell, &mut cmd, "jp", &mut stdout().lock());
            }
            GenerateCommand::Man { output_dir } => {
                generate_man_pages(Args::command(), output_dir)?;
            }
        },
        None => {
            // Compile the expression
            let expression = args.expression.ok_or_else(|| {
                anyhow::anyhow!("Expression required unless using subcommand")
            })?;
            let compiled: Expression = expression
                .parse()
                .with_context(|| "Failed to parse expression")?;

            if args.ast {
                println!("{:#?}", compiled.selector());
                return Ok(());
            }

            // Parse input content
            let input_content = if let Some(path) = args.input {
                fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read file {:?}", path)
                })?
            } else {
                if io::stdin().is_terminal() {
                    // No piped input and no file specified
                    let mut cmd = Args::command();
                    return Ok(cmd.print_help()?);
                }
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            };
            let json: Value = serde_json::from_str(&input_content)
                .with_context(|| "Failed to parse JSON")?;

            // Evaluate and display
            let result = compiled.search(&json)?;
            if args.compact {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                utils::write_colored_result(&mut stdout().lock(), &result, true)?;
            }
        }
    }

    Ok(())
}

/// Write a man page for the main command and each subcommand, with the
/// subcommand pages prefixed by the binary name so `man jp-generate`
/// resolves.
fn generate_man_pages(
    cmd: clap::Command,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let output_dir: PathBuf = output_dir.unwrap_or(
        std::env::current_dir().context("Opening current directory")?,
    );
    fs::create_dir_all(&output_dir)
        .context("create output Man directories")?;

    let name = cmd.get_name().to_string();
    let mut pages = vec![(name.clone(), cmd.clone())];
    for subcmd in cmd.get_subcommands() {
        let prefixed = format!("{name}-{}", subcmd.get_name());
        pages.push((prefixed, subcmd.clone().disable_help_subcommand(true)));
    }

    for (page_name, command) in pages {
        let man = clap_mangen::Man::new(command.name(page_name.clone()));
        let path = output_dir.join(format!("{page_name}.1"));
        let mut file = fs::File::create(&path).with_context(|| {
            format!("failed to create {}", path.display())
        })?;
        man.render(&mut file)?;
        println!("Generated: {}", path.display());
    }

    Ok(())
}
