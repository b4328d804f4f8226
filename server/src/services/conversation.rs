//! Conversation services - Gestione conversazioni e messaggi via HTTP

use crate::core::{AppError, AppState, Session};
use crate::dtos::{ConversationDTO, MessageDTO, ReadReceiptDTO, SendMessageDTO, StartConversationDTO};
use crate::entities::Conversation;
use crate::relay::ops;
use axum::extract::rejection::JsonRejection;
use axum::{
    Extension,
    extract::{Json, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ConversationDTO>>, AppError> {
    debug!("Listing conversations for user");
    let conversations = ops::list_conversations(state.chats.as_ref(), &session.user_id).await?;

    info!("Successfully retrieved {} conversations", conversations.len());
    Ok(Json(conversations.into_iter().map(ConversationDTO::from).collect()))
}

#[instrument(skip(state, session, body), fields(user_id = %session.user_id))]
pub async fn start_conversation(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    body: Result<Json<StartConversationDTO>, JsonRejection>,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. L'utente autenticato è sempre il cliente
    // 2. Riusare la conversazione esistente con il fornitore, oppure crearla
    // 3. Inviare il primo messaggio come cliente
    let Json(body) = body?;
    debug!("Starting conversation with provider {}", body.provider_id);

    let (conversation, _) = ops::start_conversation(
        state.chats.as_ref(),
        &state.feed,
        &session.user_id,
        &body.customer_name,
        &body.provider_id,
        &body.provider_name,
        &body.message,
    )
    .await?;

    Ok(Json(ConversationDTO::from(conversation)))
}

#[instrument(skip(state, conversation), fields(conversation_id = %conversation.id))]
pub async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    Extension(conversation): Extension<Conversation>, // ottenuto dal conversation_participant_middleware
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    debug!("Fetching conversation messages");
    let messages = ops::list_messages(state.chats.as_ref(), &conversation.id).await?;

    info!("Retrieved {} messages for conversation", messages.len());
    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}

#[instrument(skip(state, session, conversation, body), fields(user_id = %session.user_id, conversation_id = %conversation.id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Extension(conversation): Extension<Conversation>,
    body: Result<Json<SendMessageDTO>, JsonRejection>,
) -> Result<Json<MessageDTO>, AppError> {
    let Json(body) = body?;

    // il middleware garantisce la partecipazione, quindi il lato esiste sempre
    let sender_type = ops::sender_type_for(&conversation, &session.user_id).ok_or_else(|| {
        warn!("Sender is not a participant");
        AppError::forbidden("You are not a participant of this conversation")
    })?;

    let message = ops::send_message(
        state.chats.as_ref(),
        &state.feed,
        &conversation,
        &session.user_id,
        sender_type,
        &body.message,
    )
    .await?;

    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, session, conversation), fields(user_id = %session.user_id, conversation_id = %conversation.id))]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Extension(conversation): Extension<Conversation>,
) -> Result<Json<ReadReceiptDTO>, AppError> {
    let updated = ops::mark_read(state.chats.as_ref(), &conversation.id, &session.user_id).await?;
    Ok(Json(ReadReceiptDTO { updated }))
}
