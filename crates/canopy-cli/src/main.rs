#![forbid(unsafe_code)]

mod cmd;
mod output;

use canopy_core::ErrorCode;
use canopy_core::config::resolve_config;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "canopy: closure-table forests in SQLite",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Database file to use instead of the configured one.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a canopy store",
        long_about = "Create .canopy/ with a config template and an empty, migrated store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    canopy init\n\n    # Use a custom database file\n    canopy --db /tmp/forest.db init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Add a node",
        long_about = "Add a new root, or a new child under an existing node.",
        after_help = "EXAMPLES:\n    # Start a new tree\n    canopy add\n\n    # Add a child of node 1\n    canopy add --parent 1 --json"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Delete a node and its subtree",
        after_help = "EXAMPLES:\n    # Delete node 3 and everything below it\n    canopy delete 3"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move a subtree",
        long_about = "Re-hang a subtree under another node, or detach it as its own tree. \
                      A node cannot be moved under itself or one of its descendants.",
        after_help = "EXAMPLES:\n    # Move node 3 under node 1\n    canopy move 3 --parent 1\n\n    # Detach node 3 into a new tree\n    canopy move 3 --root"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Copy a subtree",
        long_about = "Duplicate a subtree with fresh ids, under another node or as a new tree.",
        after_help = "EXAMPLES:\n    # Copy node 3 under node 1\n    canopy copy 3 --parent 1\n\n    # Copy node 3 into a new tree\n    canopy copy 3 --root --json"
    )]
    Copy(cmd::copy::CopyArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a subtree",
        after_help = "EXAMPLES:\n    # Show the tree under node 1\n    canopy tree 1\n\n    # Two levels only, as closure triples\n    canopy tree 1 --depth 2 --json"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Read",
        about = "List a node's ancestors, nearest first"
    )]
    Ancestors(cmd::ancestors::AncestorsArgs),

    #[command(next_help_heading = "Read", about = "List the root of every tree")]
    Roots,

    #[command(
        next_help_heading = "Maintenance",
        about = "Check closure invariants",
        long_about = "Check self closures, depth consistency, parent uniqueness, and dangling rows.",
        after_help = "EXAMPLES:\n    # Verify the whole store\n    canopy verify\n\n    # Emit machine-readable output\n    canopy verify --json"
    )]
    Verify,

    #[command(
        next_help_heading = "Maintenance",
        about = "Delete every node",
        after_help = "EXAMPLES:\n    # Reset the store\n    canopy clear --yes"
    )]
    Clear(cmd::clear::ClearArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    canopy completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CANOPY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "canopy=debug,info"
        } else {
            "canopy=info,warn"
        })
    });

    let format = env::var("CANOPY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let config = match resolve_config(&project_root, cli.json, cli.db.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            let mode = if cli.json { OutputMode::Json } else { OutputMode::Text };
            render_error(mode, &CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")))?;
            return Err(err);
        }
    };
    let ctx = cmd::Context {
        output: OutputMode::from_resolved(&config.resolved_output),
        project_root,
        config,
    };
    debug!(db = %ctx.config.db_path.display(), output = ?ctx.output, "resolved configuration");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &ctx),
        Commands::Add(args) => cmd::add::run_add(args, &ctx),
        Commands::Delete(args) => cmd::delete::run_delete(args, &ctx),
        Commands::Move(args) => cmd::move_cmd::run_move(args, &ctx),
        Commands::Copy(args) => cmd::copy::run_copy(args, &ctx),
        Commands::Tree(args) => cmd::tree::run_tree(args, &ctx),
        Commands::Ancestors(args) => cmd::ancestors::run_ancestors(args, &ctx),
        Commands::Roots => cmd::roots::run_roots(&ctx),
        Commands::Verify => cmd::verify::run_verify(&ctx),
        Commands::Clear(args) => cmd::clear::run_clear(args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}
