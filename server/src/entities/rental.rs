//! Rental entity - Entità noleggio

use super::enums::RentalStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Rental {
    pub id: Uuid,
    pub equipment_id: Uuid,
    // riferisce la riga providers, non l'utente: il proprietario si ricava da Provider::user_id
    pub provider_id: Uuid,
    pub status: RentalStatus,
}
