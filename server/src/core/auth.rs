use crate::core::{AppError, AppState};
use crate::entities::Conversation;
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// struct che codifica il contenuto del token jwt emesso dall'identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub sub: Uuid,  // id dell'utente
}

/// Identità del chiamante, ricavata dal token e passata esplicitamente agli handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
}

#[instrument(skip(secret), fields(user_id = %user_id))]
pub fn encode_jwt(user_id: Uuid, secret: &str) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(24);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        sub: user_id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.sub);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

/// Estrae il token da un header `Authorization: Bearer <token>`
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid authorization header")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::unauthorized("Missing authorization header"));
        }
    };

    let token = bearer_token(auth_header).ok_or_else(|| {
        warn!("Authorization header is not a bearer credential");
        AppError::unauthorized("Invalid authorization header")
    })?;

    let token_data = decode_jwt(token, &state.jwt_secret)
        .map_err(|_| AppError::unauthorized("Unable to decode token"))?;

    let session = Session {
        user_id: token_data.claims.sub,
    };
    info!("User authenticated: {}", session.user_id);
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente partecipi alla conversazione specificata
/// Estrae conversation_id dal path, verifica la partecipazione e inserisce la Conversation nell'Extension
#[instrument(skip(state, req, next))]
pub async fn conversation_participant_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running conversation participant middleware");
    // 1. Ottenere la sessione dall'Extension (inserita dall'authentication_middleware)
    let session = *req.extensions().get::<Session>().ok_or_else(|| {
        warn!("Session not found in request extensions");
        AppError::unauthorized("User not authenticated")
    })?;

    // 2. Estrarre conversation_id dal path
    let conversation_id: Uuid = req
        .uri()
        .path()
        .split('/')
        .find_map(|segment| segment.parse::<Uuid>().ok())
        .ok_or_else(|| {
            warn!("Conversation ID not found in path: {}", req.uri().path());
            AppError::bad_request("Conversation ID not found in path")
        })?;

    // 3. Verificare che la conversazione esista e che l'utente ne faccia parte
    let conversation: Conversation = state
        .chats
        .find_conversation(&conversation_id)
        .await?
        .ok_or_else(|| {
            warn!("Conversation {} not found", conversation_id);
            AppError::not_found("Conversation not found")
        })?;

    if !conversation.has_participant(&session.user_id) {
        warn!(
            "User {} is not a participant of conversation {}",
            session.user_id, conversation_id
        );
        return Err(AppError::forbidden("You are not a participant of this conversation"));
    }

    // 4. Inserire la conversazione nell'Extension per uso successivo negli handler
    req.extensions_mut().insert(conversation);

    Ok(next.run(req).await)
}
