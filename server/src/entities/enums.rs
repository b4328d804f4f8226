//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ********************* ENUMERAZIONI UTILI **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "rental_status", rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub const ALL: [RentalStatus; 4] = [
        RentalStatus::Pending,
        RentalStatus::Active,
        RentalStatus::Completed,
        RentalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Active => "active",
            RentalStatus::Completed => "completed",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    /// Disponibilità dell'attrezzatura derivata dallo stato del noleggio.
    /// Solo un noleggio attivo blocca l'attrezzatura; `pending` la lascia disponibile.
    pub fn equipment_availability(&self) -> bool {
        !matches!(self, RentalStatus::Active)
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errore di parsing per uno stato fuori dall'enumerazione
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rental status `{0}`")]
pub struct UnknownRentalStatus(pub String);

impl FromStr for RentalStatus {
    type Err = UnknownRentalStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RentalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownRentalStatus(s.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sender_type", rename_all = "lowercase")]
pub enum SenderType {
    Customer,
    Provider,
}
