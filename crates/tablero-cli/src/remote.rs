//! Blocking HTTP implementation of [`CardGateway`].

use std::time::Duration;

use serde_json::Value;
use tablero_core::config::ApiConfig;
use tablero_core::gateway::{CardGateway, GatewayError, MoveTarget};
use tablero_core::model::card::{BoardId, Card, CardDraft, CardId, CardPatch};
use tablero_core::wire;
use tracing::debug;

pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(api: &ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("tablero/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "request");
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn card_path(id: CardId) -> String {
        format!("/cards/{}", id.0)
    }

    fn patch(&self, id: CardId, body: &Value) -> Result<Card, GatewayError> {
        let response = self
            .request("PATCH", &Self::card_path(id))
            .send_json(body)
            .map_err(map_error)?;
        Ok(wire::parse_card(&read_body(response)?)?)
    }
}

impl CardGateway for HttpGateway {
    fn fetch_cards(&mut self, board_id: BoardId) -> Result<Vec<Card>, GatewayError> {
        let response = self
            .request("GET", "/cards/")
            .query("board_id", &board_id.0.to_string())
            .call()
            .map_err(map_error)?;
        Ok(wire::parse_card_list(&read_body(response)?)?)
    }

    fn create_card(&mut self, draft: &CardDraft) -> Result<Card, GatewayError> {
        let response = self
            .request("POST", "/cards/")
            .send_json(wire::encode_draft(draft))
            .map_err(map_error)?;
        Ok(wire::parse_card(&read_body(response)?)?)
    }

    fn update_card(&mut self, id: CardId, patch: &CardPatch) -> Result<Card, GatewayError> {
        self.patch(id, &wire::encode_patch(patch))
    }

    fn move_card(&mut self, id: CardId, target: MoveTarget) -> Result<Card, GatewayError> {
        let body = wire::encode_patch(&CardPatch::relocate(target.list_id, target.position));
        self.patch(id, &body)
    }

    fn delete_card(&mut self, id: CardId) -> Result<(), GatewayError> {
        self.request("DELETE", &Self::card_path(id))
            .call()
            .map_err(map_error)?;
        Ok(())
    }
}

fn read_body(response: ureq::Response) -> Result<String, GatewayError> {
    response
        .into_string()
        .map_err(|err| GatewayError::Transport(format!("failed to read response body: {err}")))
}

fn map_error(err: ureq::Error) -> GatewayError {
    match err {
        ureq::Error::Status(status, response) => {
            let reason = response.status_text().to_string();
            let body = response.into_string().unwrap_or_default();
            GatewayError::Status {
                status,
                message: error_message(&body).unwrap_or(reason),
            }
        }
        ureq::Error::Transport(transport) => GatewayError::Transport(transport.to_string()),
    }
}

/// Pull a readable message out of an error body: `{"detail": ...}` or
/// `{"error": ...}`. A `detail` list keeps the first entry's `msg`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = value.get("detail").or_else(|| value.get("error"))?;
    match field {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
