//! Equipment entity - Entità attrezzatura noleggiabile

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub is_available: bool,
}
