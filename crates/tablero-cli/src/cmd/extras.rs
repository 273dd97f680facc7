//! Overlay commands: `tb label`, `tb assign`, `tb checklist`.
//!
//! These only touch the local extras database. The board is still loaded
//! first so edits can only target cards that exist.

use anyhow::Result;
use clap::{Args, Subcommand};
use tablero_core::model::card::CardId;
use tablero_core::model::extras::{PRESET_LABELS, TEAM_MEMBERS};

use super::board::render_summary;
use super::{Context, parse_card_id};

#[derive(Args, Debug)]
pub struct LabelArgs {
    #[command(subcommand)]
    pub command: LabelCommand,
}

#[derive(Subcommand, Debug)]
pub enum LabelCommand {
    /// Attach a catalogue label.
    Add(LabelTarget),
    /// Detach a label.
    Remove(LabelTarget),
}

#[derive(Args, Debug)]
pub struct LabelTarget {
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,

    /// Label id, e.g. `bug` or `urgent`.
    pub label: String,
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,

    /// Member id, or `none` to unassign.
    pub member: String,
}

impl AssignArgs {
    fn member(&self) -> Option<&str> {
        let member = self.member.trim();
        if member.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(member)
        }
    }
}

#[derive(Args, Debug)]
pub struct ChecklistArgs {
    #[command(subcommand)]
    pub command: ChecklistCommand,
}

#[derive(Subcommand, Debug)]
pub enum ChecklistCommand {
    /// Append an item.
    Add {
        #[arg(value_parser = parse_card_id)]
        id: CardId,
        text: String,
    },
    /// Flip an item between done and open.
    Toggle {
        #[arg(value_parser = parse_card_id)]
        id: CardId,
        /// Item id, e.g. `item-2`.
        item: String,
    },
    Rename {
        #[arg(value_parser = parse_card_id)]
        id: CardId,
        item: String,
        text: String,
    },
    Remove {
        #[arg(value_parser = parse_card_id)]
        id: CardId,
        item: String,
    },
}

pub fn run_label(args: &LabelArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.loaded_session()?;
    let id = match &args.command {
        LabelCommand::Add(args) => {
            if !session.add_label(args.id, &args.label)? {
                tracing::info!(card = %args.id, label = %args.label, "label already attached");
            }
            args.id
        }
        LabelCommand::Remove(args) => {
            if !session.remove_label(args.id, &args.label)? {
                tracing::info!(card = %args.id, label = %args.label, "label was not attached");
            }
            args.id
        }
    };
    render_summary(ctx, &session.summary(id, ctx.today)?)
}

pub fn run_assign(args: &AssignArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.loaded_session()?;
    session.assign(args.id, args.member())?;
    render_summary(ctx, &session.summary(args.id, ctx.today)?)
}

pub fn run_checklist(args: &ChecklistArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.loaded_session()?;
    let id = match &args.command {
        ChecklistCommand::Add { id, text } => {
            let item = session.add_checklist_item(*id, text)?;
            tracing::debug!(card = %id, %item, "checklist item added");
            *id
        }
        ChecklistCommand::Toggle { id, item } => {
            session.toggle_checklist_item(*id, item)?;
            *id
        }
        ChecklistCommand::Rename { id, item, text } => {
            session.rename_checklist_item(*id, item, text)?;
            *id
        }
        ChecklistCommand::Remove { id, item } => {
            session.remove_checklist_item(*id, item)?;
            *id
        }
    };
    render_summary(ctx, &session.summary(id, ctx.today)?)
}

/// Catalogue listing for `--help` footers.
pub fn catalogue_help() -> String {
    let labels: Vec<&str> = PRESET_LABELS.iter().map(|l| l.id).collect();
    let members: Vec<String> = TEAM_MEMBERS
        .iter()
        .map(|m| format!("{} ({})", m.id, m.name))
        .collect();
    format!(
        "LABELS:\n    {}\n\nMEMBERS:\n    {}",
        labels.join(", "),
        members.join(", ")
    )
}
