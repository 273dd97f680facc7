pub mod board;
pub mod card;
pub mod extras;
pub mod move_cmd;

use anyhow::{Context as _, Result, anyhow};
use chrono::NaiveDate;
use tablero_core::BoardSession;
use tablero_core::config::ClientConfig;
use tablero_core::extras::sqlite::SqliteBackend;
use tablero_core::model::card::{BoardId, CardId, ListId};
use tablero_core::model::list;

use crate::output::OutputMode;
use crate::remote::HttpGateway;

pub type Session = BoardSession<HttpGateway, SqliteBackend>;

const NO_BOARD: &str =
    "no board selected: pass --board <id>, set TABLERO_BOARD or [board] default_board";

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub config: ClientConfig,
    pub output: OutputMode,
    pub board: Option<BoardId>,
    pub today: NaiveDate,
}

impl Context {
    /// `--board`, else the configured default.
    pub fn board_id(&self) -> Result<BoardId> {
        self.board
            .or_else(|| self.config.default_board())
            .ok_or_else(|| anyhow!(NO_BOARD))
    }

    /// Session on the selected board. Cards are not fetched yet.
    pub fn open_session(&self) -> Result<Session> {
        let board_id = self.board_id()?;
        let path = self.config.extras_path();
        let backend = SqliteBackend::open(&path)
            .with_context(|| format!("failed to open extras database {}", path.display()))?;
        let gateway = HttpGateway::new(&self.config.api);
        Ok(BoardSession::open(gateway, backend, board_id)?)
    }

    /// Session with the board's cards loaded.
    pub fn loaded_session(&self) -> Result<Session> {
        let mut session = self.open_session()?;
        session.load()?;
        Ok(session)
    }
}

/// Accept `12` or `#12`.
pub fn parse_card_id(raw: &str) -> Result<CardId, String> {
    let digits = raw.trim().trim_start_matches('#');
    match digits.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("'{raw}' is not a card id")),
        Ok(n) => Ok(CardId(n)),
    }
}

/// A list id or column name ("Hecho", "en curso").
pub fn parse_list_arg(raw: &str) -> Result<ListId, String> {
    list::parse_list(raw).map_err(|_| {
        let names: Vec<String> = list::DEFAULT_LISTS
            .iter()
            .map(|l| format!("{} ({})", l.id, l.name))
            .collect();
        format!("unknown list '{raw}'; expected one of {}", names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_ids_accept_hash_prefix() {
        assert_eq!(parse_card_id("#12"), Ok(CardId(12)));
        assert_eq!(parse_card_id(" 7 "), Ok(CardId(7)));
        assert!(parse_card_id("0").is_err());
        assert!(parse_card_id("abc").is_err());
    }

    #[test]
    fn lists_by_name_or_number() {
        assert_eq!(parse_list_arg("en curso"), Ok(ListId(2)));
        assert_eq!(parse_list_arg("3"), Ok(ListId(3)));
        let err = parse_list_arg("Backlog").expect_err("unknown");
        assert!(err.contains("1 (Por hacer)"));
    }

    #[test]
    fn flag_board_wins_over_config() {
        let mut config = ClientConfig::default();
        config.board.default_board = Some(4);
        let ctx = Context {
            config,
            output: OutputMode::Text,
            board: Some(BoardId(9)),
            today: NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"),
        };
        assert_eq!(ctx.board_id().expect("board"), BoardId(9));
    }

    #[test]
    fn missing_board_is_an_error() {
        let ctx = Context {
            config: ClientConfig::default(),
            output: OutputMode::Text,
            board: None,
            today: NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"),
        };
        assert!(ctx.board_id().is_err());
    }
}
