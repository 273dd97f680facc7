//! `tb create`, `tb edit` and `tb delete`.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use tablero_core::SyncError;
use tablero_core::model::card::{CardDraft, CardId, CardPatch, ListId};
use tablero_core::model::extras::ExtrasRecord;
use tracing::info;

use super::board::render_summary;
use super::{Context, parse_card_id, parse_list_arg};
use crate::output::render_success;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Card title (trimmed, at most 200 characters).
    #[arg(long, short)]
    pub title: String,

    #[arg(long, short)]
    pub description: Option<String>,

    /// Due date as YYYY-MM-DD.
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Target list id or name.
    #[arg(long, default_value = "1", value_parser = parse_list_arg)]
    pub list: ListId,

    /// Label to attach (repeatable).
    #[arg(long = "label", short = 'l')]
    pub labels: Vec<String>,

    /// Team member to assign.
    #[arg(long)]
    pub assign: Option<String>,
}

impl CreateArgs {
    /// Overlay for the new card. Checked before anything is sent.
    fn extras(&self) -> Result<ExtrasRecord, SyncError> {
        let mut record = ExtrasRecord::default();
        for label in &self.labels {
            record.add_label(label)?;
        }
        record.assign(self.assign.as_deref())?;
        Ok(record)
    }
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Card id (`12` or `#12`).
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,

    #[arg(long, short)]
    pub title: Option<String>,

    #[arg(long, short, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    /// Due date as YYYY-MM-DD.
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub clear_due: bool,

    /// Move to another list, keeping the position.
    #[arg(long, value_parser = parse_list_arg)]
    pub list: Option<ListId>,
}

impl EditArgs {
    fn patch(&self) -> CardPatch {
        let description = if self.clear_description {
            Some(None)
        } else {
            self.description.clone().map(Some)
        };
        let due_date = if self.clear_due {
            Some(None)
        } else {
            self.due.map(Some)
        };
        CardPatch {
            title: self.title.clone(),
            description,
            due_date,
            list_id: self.list,
            position: None,
        }
    }
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Card id (`12` or `#12`).
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,
}

pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let extras = args.extras()?;
    let board_id = ctx.board_id()?;

    let mut draft = CardDraft::new(board_id, args.list, args.title.as_str());
    if let Some(description) = &args.description {
        draft = draft.with_description(description.as_str());
    }
    if let Some(due) = args.due {
        draft = draft.with_due_date(due);
    }
    // Reject locally before touching the overlay file or the network.
    let draft = draft.validate().map_err(SyncError::from)?;

    let mut session = ctx.open_session()?;
    let card = session.create_card(draft, Some(extras))?;
    info!(card = %card.id, "created");
    render_summary(ctx, &session.summary(card.id, ctx.today)?)
}

pub fn run_edit(args: &EditArgs, ctx: &Context) -> Result<()> {
    let patch = args.patch();
    if patch.is_empty() {
        bail!("nothing to change: pass at least one of --title, --description, --due, --list");
    }
    let patch = patch.validate().map_err(SyncError::from)?;

    let mut session = ctx.loaded_session()?;
    let card = session.edit_card(args.id, patch)?;
    render_summary(ctx, &session.summary(card.id, ctx.today)?)
}

pub fn run_delete(args: &DeleteArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.loaded_session()?;
    let card = session.delete_card(args.id)?;
    render_success(ctx.output, &format!("deleted {} {}", card.id, card.title))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(id: u64) -> EditArgs {
        EditArgs {
            id: CardId(id),
            title: None,
            description: None,
            clear_description: false,
            due: None,
            clear_due: false,
            list: None,
        }
    }

    #[test]
    fn bare_edit_is_empty() {
        assert!(edit(1).patch().is_empty());
    }

    #[test]
    fn clear_flags_become_explicit_nulls() {
        let args = EditArgs {
            clear_description: true,
            clear_due: true,
            ..edit(1)
        };
        let patch = args.patch();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.due_date, Some(None));
    }

    #[test]
    fn unknown_label_fails_before_any_call() {
        let args = CreateArgs {
            title: "Nueva".into(),
            description: None,
            due: None,
            list: ListId(1),
            labels: vec!["bug".into(), "wontfix".into()],
            assign: None,
        };
        assert!(matches!(
            args.extras(),
            Err(SyncError::Validation(tablero_core::ValidationError::UnknownLabel(_)))
        ));
    }

    #[test]
    fn create_overlay_collects_labels_and_member() {
        let args = CreateArgs {
            title: "Nueva".into(),
            description: None,
            due: None,
            list: ListId(1),
            labels: vec!["bug".into(), "bug".into()],
            assign: Some("user2".into()),
        };
        let record = args.extras().expect("valid");
        assert_eq!(record.labels.len(), 1);
        assert_eq!(record.assignee.as_deref(), Some("user2"));
    }
}
