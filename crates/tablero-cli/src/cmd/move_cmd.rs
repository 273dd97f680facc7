//! `tb move`: drag a card onto a list or onto another card.

use anyhow::Result;
use clap::Args;
use tablero_core::model::card::{CardId, ListId};
use tablero_core::moves::DropTarget;

use super::board::render_summary;
use super::{Context, parse_card_id, parse_list_arg};
use crate::output::render_success;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Card to move (`12` or `#12`).
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,

    /// Append to the end of this list (id or name).
    #[arg(long, value_parser = parse_list_arg, required_unless_present = "onto")]
    pub to_list: Option<ListId>,

    /// Take the list and position of this card instead.
    #[arg(long, value_parser = parse_card_id, conflicts_with = "to_list")]
    pub onto: Option<CardId>,
}

impl MoveArgs {
    const fn target(&self) -> Option<DropTarget> {
        match (self.onto, self.to_list) {
            (Some(card), _) => Some(DropTarget::Card(card)),
            (None, Some(list)) => Some(DropTarget::List(list)),
            (None, None) => None,
        }
    }
}

pub fn run_move(args: &MoveArgs, ctx: &Context) -> Result<()> {
    let Some(target) = args.target() else {
        anyhow::bail!("pass --to-list <list> or --onto <card>");
    };

    let mut session = ctx.loaded_session()?;
    match session.move_card(args.id, target)? {
        Some(card) => render_summary(ctx, &session.summary(card.id, ctx.today)?),
        None => render_success(ctx.output, &format!("{} is already there", args.id)),
    }
}
