//! Rental DTOs - Corpo di richiesta e risposta della funzione di aggiornamento stato

use serde::{Deserialize, Serialize};

/// I campi sono opzionali: l'assenza va segnalata come 400 e non come errore di deserializzazione
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRentalStatusRequest {
    #[serde(default)]
    pub rental_id: Option<String>,
    #[serde(default)]
    pub new_status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRentalStatusResponse {
    pub success: bool,
    pub equipment_availability: bool,
}
