//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket

use crate::dtos::MessageDTO;
use serde::{Deserialize, Serialize};

/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "NewMessage", "data": { ... } }
/// oppure
/// { "type": "Lagged", "data": { "skipped": 3 } }
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WsEventDTO {
    NewMessage(MessageDTO),
    Lagged { skipped: u64 },
}
