//! Rental services - Sincronizzazione tra stato del noleggio e disponibilità dell'attrezzatura

use crate::core::config::SyncRetryPolicy;
use crate::core::{AppError, AppState, Session};
use crate::dtos::{UpdateRentalStatusRequest, UpdateRentalStatusResponse};
use crate::entities::RentalStatus;
use crate::repositories::{RentalStore, StoreError};
use axum::extract::rejection::JsonRejection;
use axum::{
    Extension,
    extract::{Json, State},
};
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[instrument(skip(state, session, body), fields(user_id = %session.user_id))]
pub async fn update_rental_status(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>, // ottenuto dall'autenticazione tramite token jwt
    body: Result<Json<UpdateRentalStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateRentalStatusResponse>, AppError> {
    let Json(request) = body?;
    let response = apply_rental_status(
        state.rentals.as_ref(),
        state.equipment_sync,
        &session,
        &request,
    )
    .await?;
    Ok(Json(response))
}

/// Aggiorna lo stato di un noleggio e allinea la disponibilità dell'attrezzatura
/// Operazioni:
/// 1. Validare rentalId e newStatus (400 se assenti o fuori enumerazione)
/// 2. Recuperare il noleggio (404 se assente)
/// 3. Verificare che il fornitore del noleggio appartenga al chiamante (403 altrimenti)
/// 4. Aggiornare lo stato del noleggio (500 se fallisce, nessun'altra scrittura)
/// 5. Calcolare la disponibilità: false solo per `active`
/// 6. Aggiornare la disponibilità con retry; se fallisce comunque, la divergenza
///    viene loggata e la chiamata riporta successo
///
/// Nessuna scrittura avviene prima che i passi 1-3 siano superati.
#[instrument(skip(rentals, policy, session, request), fields(user_id = %session.user_id))]
pub async fn apply_rental_status(
    rentals: &dyn RentalStore,
    policy: SyncRetryPolicy,
    session: &Session,
    request: &UpdateRentalStatusRequest,
) -> Result<UpdateRentalStatusResponse, AppError> {
    debug!("Updating rental status");
    let (rental_id, new_status) = validate_request(request)?;

    let rental = rentals.find_rental(&rental_id).await?.ok_or_else(|| {
        warn!("Rental {} not found", rental_id);
        AppError::not_found("Rental not found")
    })?;

    let owner = rentals.find_provider(&rental.provider_id).await?;
    if owner.map(|p| p.user_id) != Some(session.user_id) {
        warn!(
            "User {} does not own provider {} of rental {}",
            session.user_id, rental.provider_id, rental.id
        );
        return Err(AppError::forbidden("You do not own this rental"));
    }

    rentals
        .update_rental_status(&rental.id, new_status)
        .await
        .map_err(|e| {
            error!("Failed to update status of rental {}: {}", rental.id, e);
            AppError::dependency_failure("Failed to update rental status").with_details(e.to_string())
        })?;
    info!("Rental {} moved from {} to {}", rental.id, rental.status, new_status);

    let available = new_status.equipment_availability();
    if new_status == RentalStatus::Pending {
        debug!("Pending rental leaves equipment {} available", rental.equipment_id);
    }
    sync_equipment_availability(rentals, policy, &rental.equipment_id, available).await;

    Ok(UpdateRentalStatusResponse {
        success: true,
        equipment_availability: available,
    })
}

fn validate_request(request: &UpdateRentalStatusRequest) -> Result<(Uuid, RentalStatus), AppError> {
    let present = |field: &Option<String>| {
        field
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let (Some(rental_id), Some(new_status)) = (present(&request.rental_id), present(&request.new_status))
    else {
        warn!("Missing rentalId or newStatus");
        return Err(AppError::bad_request("rentalId and newStatus are required"));
    };

    let new_status = new_status.parse::<RentalStatus>().map_err(|e| {
        warn!("Rejected status: {}", e);
        AppError::bad_request("Invalid status")
            .with_details("newStatus must be one of: pending, active, completed, cancelled")
    })?;

    let rental_id = rental_id.parse::<Uuid>().map_err(|_| {
        warn!("Rejected malformed rental id");
        AppError::bad_request("Invalid rentalId")
    })?;

    Ok((rental_id, new_status))
}

/// Scrittura secondaria: idempotente, quindi ritentata con backoff esponenziale.
/// Se fallisce anche l'ultimo tentativo la divergenza viene solo loggata.
async fn sync_equipment_availability(
    rentals: &dyn RentalStore,
    policy: SyncRetryPolicy,
    equipment_id: &Uuid,
    available: bool,
) {
    let retry_policy = ExponentialBuilder::default()
        .with_min_delay(policy.min_backoff)
        .with_max_delay(policy.min_backoff * 8)
        .with_max_times(policy.attempts);

    let result = (move || async move {
        rentals
            .set_equipment_availability(equipment_id, available)
            .await
    })
    .retry(retry_policy)
    .notify(|err: &StoreError, dur: Duration| {
        warn!(
            "Equipment {} availability write failed ({}), retrying in {:?}",
            equipment_id, err, dur
        );
    })
    .await;

    match result {
        Ok(()) => {
            info!("Equipment {} availability set to {}", equipment_id, available);
        }
        Err(e) => {
            error!(
                "Equipment {} availability diverges from rental status (expected {}): {}",
                equipment_id, available, e
            );
        }
    }
}
