//! `tb board` and `tb show`.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tablero_core::SyncError;
use tablero_core::model::card::{BoardId, CardId, ListId};
use tablero_core::model::filter::{AssigneeFilter, FilterState, LabelFilter};
use tablero_core::model::list::DEFAULT_LISTS;
use tablero_core::view::CardSummary;

use super::{Context, parse_card_id};
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct BoardArgs {
    /// Only cards whose title or description contains this text.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Only cards carrying this label id (`all` for no filter).
    #[arg(long, short)]
    pub label: Option<String>,

    /// Only cards assigned to this member id, or `unassigned`.
    #[arg(long, short)]
    pub assignee: Option<String>,
}

impl BoardArgs {
    fn filters(&self) -> Result<FilterState, SyncError> {
        let mut filters = FilterState::default();
        if let Some(text) = &self.search {
            filters = filters.search(text.as_str());
        }
        if let Some(label) = &self.label {
            filters = filters.label(LabelFilter::parse(label)?);
        }
        if let Some(member) = &self.assignee {
            filters = filters.assignee(AssigneeFilter::parse(member)?);
        }
        Ok(filters)
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Card id (`12` or `#12`).
    #[arg(value_parser = parse_card_id)]
    pub id: CardId,
}

#[derive(Debug, Serialize)]
struct BoardOutput {
    board_id: BoardId,
    shown: usize,
    total: usize,
    filtered: bool,
    columns: Vec<ColumnOutput>,
}

#[derive(Debug, Serialize)]
struct ColumnOutput {
    list_id: ListId,
    name: &'static str,
    cards: Vec<CardSummary>,
}

pub fn run_board(args: &BoardArgs, ctx: &Context) -> Result<()> {
    let filters = args.filters()?;
    let session = ctx.loaded_session()?;
    let derived = session.view(&filters);

    let columns = derived
        .columns(&DEFAULT_LISTS)
        .into_iter()
        .map(|column| ColumnOutput {
            list_id: column.list.id,
            name: column.list.name,
            cards: column
                .cards
                .iter()
                .map(|card| CardSummary::new(card, session.extras().get(card.id), ctx.today))
                .collect(),
        })
        .collect();

    let output = BoardOutput {
        board_id: derived.board_id,
        shown: derived.shown,
        total: derived.total,
        filtered: filters.is_active(),
        columns,
    };

    render_mode(
        ctx.output,
        &output,
        |board, w| {
            for column in &board.columns {
                for card in &column.cards {
                    write_card_row(card, w)?;
                }
            }
            Ok(())
        },
        |board, w| {
            for column in &board.columns {
                pretty_section(w, &format!("{} ({})", column.name, column.cards.len()))?;
                if column.cards.is_empty() {
                    writeln!(w, "  (vacía)")?;
                }
                for card in &column.cards {
                    write_card_line(card, w)?;
                }
                writeln!(w)?;
            }
            if board.filtered {
                writeln!(w, "{} de {} resultados", board.shown, board.total)?;
            }
            Ok(())
        },
    )
}

pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let session = ctx.loaded_session()?;
    let summary = session.summary(args.id, ctx.today)?;
    render_summary(ctx, &summary)
}

/// Render one card with its overlay in the active mode.
pub fn render_summary(ctx: &Context, summary: &CardSummary) -> Result<()> {
    render_mode(ctx.output, summary, write_card_row, write_card_detail)
}

fn labels_text(card: &CardSummary) -> String {
    card.labels
        .iter()
        .map(|l| l.id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// `id  list  title  labels  assignee  done/total  due`, tab separated.
fn write_card_row(card: &CardSummary, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}/{}\t{}",
        card.card.id.0,
        card.card.list_id,
        card.card.title,
        labels_text(card),
        card.assignee.as_deref().unwrap_or("-"),
        card.checklist.done,
        card.checklist.total,
        card.card
            .due_date
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
    )
}

fn write_card_line(card: &CardSummary, w: &mut dyn Write) -> io::Result<()> {
    let mut line = format!("  {:<6} {}", card.card.id.to_string(), card.card.title);
    if !card.labels.is_empty() {
        let names: Vec<&str> = card.labels.iter().map(|l| l.name.as_str()).collect();
        line.push_str(&format!("  [{}]", names.join(", ")));
    }
    if let Some(name) = card.assignee_name.or(card.assignee.as_deref()) {
        line.push_str(&format!("  @{name}"));
    }
    if card.checklist.total > 0 {
        line.push_str(&format!(
            "  {}/{} ({}%)",
            card.checklist.done, card.checklist.total, card.checklist.percent
        ));
    }
    if let Some(due) = card.due {
        line.push_str(&format!("  {due}"));
    }
    writeln!(w, "{line}")
}

fn write_card_detail(card: &CardSummary, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} {}", card.card.id, card.card.title))?;
    let list = DEFAULT_LISTS
        .iter()
        .find(|l| l.id == card.card.list_id)
        .map_or_else(|| card.card.list_id.to_string(), |l| l.name.to_string());
    pretty_kv(w, "Lista", list)?;
    if let Some(description) = &card.card.description {
        pretty_kv(w, "Descripción", description)?;
    }
    if let (Some(date), Some(due)) = (card.card.due_date, card.due) {
        pretty_kv(w, "Vence", format!("{date} ({due})"))?;
    }
    if !card.labels.is_empty() {
        pretty_kv(w, "Etiquetas", labels_text(card))?;
    }
    pretty_kv(
        w,
        "Asignado",
        card.assignee_name.or(card.assignee.as_deref()).unwrap_or("Sin asignar"),
    )?;
    if card.checklist.total > 0 {
        pretty_kv(
            w,
            "Checklist",
            format!(
                "{}/{} ({}%)",
                card.checklist.done, card.checklist.total, card.checklist.percent
            ),
        )?;
    }
    pretty_rule(w)
}
