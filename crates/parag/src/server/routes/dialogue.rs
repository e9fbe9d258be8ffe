//! Dialogue log endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::dialogue::DialogueEntry;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct DialogueResponse {
    pub total: usize,
    pub entries: Vec<DialogueEntry>,
}

/// GET /dialogue/ - Answered queries in call order
pub async fn list_dialogue(State(state): State<AppState>) -> Json<DialogueResponse> {
    let entries = state.dialogue().list();
    Json(DialogueResponse {
        total: entries.len(),
        entries,
    })
}
