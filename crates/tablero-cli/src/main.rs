#![forbid(unsafe_code)]

mod cmd;
mod output;
mod remote;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use tablero_core::model::card::BoardId;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tb: Kanban boards from the terminal",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for tablero.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Board to operate on (overrides TABLERO_BOARD and the config file).
    #[arg(long, global = true)]
    board: Option<u64>,

    /// Shorthand for --format json.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show the board",
        long_about = "Load the board and show its cards grouped by list, optionally filtered.",
        after_help = "EXAMPLES:\n    # Whole board\n    tb board --board 1\n\n    # Cards mentioning login, labelled bug, nobody assigned\n    tb board -s login -l bug -a unassigned\n\n    # Emit machine-readable output\n    tb board --json"
    )]
    Board(cmd::board::BoardArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one card",
        long_about = "Show a card with its labels, assignee, checklist progress and due date.",
        after_help = "EXAMPLES:\n    # Show card 12\n    tb show 12\n\n    # Emit machine-readable output\n    tb show '#12' --json"
    )]
    Show(cmd::board::ShowArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Create a card",
        long_about = "Create a card on the remote board. Labels and assignee are stored locally once the card exists.",
        after_help = "EXAMPLES:\n    # Create a task\n    tb create --title \"Revisar login\"\n\n    # Straight into a list, with overlay\n    tb create -t \"Corregir CSS\" --list \"En curso\" -l bug --assign user2 --due 2026-11-02"
    )]
    Create(cmd::card::CreateArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Edit a card",
        long_about = "Change title, description, due date or list. The change is applied locally first and undone if the server rejects it.",
        after_help = "EXAMPLES:\n    # Rename\n    tb edit 12 --title \"Revisar login (OAuth)\"\n\n    # Drop the due date\n    tb edit 12 --clear-due"
    )]
    Edit(cmd::card::EditArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Move a card",
        long_about = "Move a card to the end of a list, or into the slot of another card.",
        after_help = "EXAMPLES:\n    # Append to Hecho\n    tb move 12 --to-list hecho\n\n    # Take card 7's place\n    tb move 12 --onto 7"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Cards",
        about = "Delete a card",
        long_about = "Delete a card remotely, then discard its local labels, assignee and checklist."
    )]
    Delete(cmd::card::DeleteArgs),

    #[command(
        next_help_heading = "Overlay",
        about = "Add or remove labels",
        after_help = cmd::extras::catalogue_help()
    )]
    Label(cmd::extras::LabelArgs),

    #[command(
        next_help_heading = "Overlay",
        about = "Assign a card to a team member",
        after_help = cmd::extras::catalogue_help()
    )]
    Assign(cmd::extras::AssignArgs),

    #[command(
        next_help_heading = "Overlay",
        about = "Edit a card's checklist",
        after_help = "EXAMPLES:\n    tb checklist add 12 \"Escribir pruebas\"\n    tb checklist toggle 12 item-1"
    )]
    Checklist(cmd::extras::ChecklistArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TABLERO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tablero=debug,info"
        } else {
            "tablero=info,warn"
        })
    });
    let format = env::var("TABLERO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn run(cli: &Cli, ctx: &cmd::Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Board(args) => cmd::board::run_board(args, ctx),
        Commands::Show(args) => cmd::board::run_show(args, ctx),
        Commands::Create(args) => cmd::card::run_create(args, ctx),
        Commands::Edit(args) => cmd::card::run_edit(args, ctx),
        Commands::Move(args) => cmd::move_cmd::run_move(args, ctx),
        Commands::Delete(args) => cmd::card::run_delete(args, ctx),
        Commands::Label(args) => cmd::extras::run_label(args, ctx),
        Commands::Assign(args) => cmd::extras::run_assign(args, ctx),
        Commands::Checklist(args) => cmd::extras::run_checklist(args, ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match tablero_core::config::resolve_config() {
        Ok(config) => config,
        Err(err) => {
            let mode = resolve_output_mode(cli.format, cli.json, None);
            let error = CliError::with_details(
                format!("{err:#}"),
                "Fix the config file or the TABLERO_* variables",
                tablero_core::ErrorCode::ConfigParseError.code(),
            );
            let _ = render_error(mode, &error);
            std::process::exit(2);
        }
    };

    let output = resolve_output_mode(cli.format, cli.json, config.output.as_deref());
    let ctx = cmd::Context {
        config,
        output,
        board: cli.board.map(BoardId),
        today: chrono::Local::now().date_naive(),
    };
    debug!(?ctx.board, base_url = %ctx.config.api.base_url, "starting");

    if let Err(err) = run(&cli, &ctx) {
        let _ = render_error(output, &CliError::from(&err));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tablero_core::model::card::{CardId, ListId};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from(["tb", "board", "--board", "3", "--json", "-s", "login"]);
        assert_eq!(cli.board, Some(3));
        assert!(cli.json);
        match cli.command {
            Commands::Board(args) => assert_eq!(args.search.as_deref(), Some("login")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_parses_list_name_and_repeated_labels() {
        let cli = Cli::parse_from([
            "tb", "create", "--title", "Nueva", "--list", "En curso", "-l", "bug", "-l", "urgent",
            "--due", "2026-11-02",
        ]);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.list, ListId(2));
                assert_eq!(args.labels, vec!["bug", "urgent"]);
                assert!(args.due.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_defaults_to_first_list() {
        let cli = Cli::parse_from(["tb", "create", "-t", "x"]);
        match cli.command {
            Commands::Create(args) => assert_eq!(args.list, ListId(1)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn move_requires_a_target() {
        assert!(Cli::try_parse_from(["tb", "move", "12"]).is_err());
        let both = ["tb", "move", "12", "--to-list", "3", "--onto", "4"];
        assert!(Cli::try_parse_from(both).is_err());
        let cli = Cli::parse_from(["tb", "move", "#12", "--onto", "#4"]);
        match cli.command {
            Commands::Move(args) => {
                assert_eq!(args.id, CardId(12));
                assert_eq!(args.onto, Some(CardId(4)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_list_is_a_parse_error() {
        let parsed = Cli::try_parse_from(["tb", "move", "1", "--to-list", "Backlog"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn bad_due_date_is_a_parse_error() {
        let parsed = Cli::try_parse_from(["tb", "create", "-t", "x", "--due", "mañana"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn checklist_subcommands_parse() {
        let cli = Cli::parse_from(["tb", "checklist", "toggle", "5", "item-2"]);
        match cli.command {
            Commands::Checklist(cmd::extras::ChecklistArgs {
                command: cmd::extras::ChecklistCommand::Toggle { id, item },
            }) => {
                assert_eq!(id, CardId(5));
                assert_eq!(item, "item-2");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn format_flag_accepts_value_enum() {
        let cli = Cli::parse_from(["tb", "board", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }
}
