//! Operazioni su conversazioni e messaggi
//!
//! Ogni invio segue lo stesso ordine: inserimento del messaggio, aggiornamento
//! dell'ultimo messaggio della conversazione, pubblicazione sul feed.

use crate::core::AppError;
use crate::dtos::{CreateConversationDTO, CreateMessageDTO};
use crate::entities::{Conversation, Message, SenderType};
use crate::repositories::ChatStore;
use crate::ws::{MessageEvent, MessageFeed};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Testo del messaggio senza spazi ai bordi, rifiutato se vuoto o troppo lungo
pub fn normalize_message_text(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    let length = text.chars().count();
    if length == 0 || length > MAX_MESSAGE_LENGTH {
        warn!("Rejected message text of {} chars", length);
        return Err(AppError::bad_request(
            "Message content must be between 1 and 5000 characters",
        ));
    }
    Ok(text)
}

/// Istante corrente alla precisione delle colonne DATETIME(6), in microsecondi
pub fn store_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Lato della conversazione occupato da un utente, se ne fa parte
pub fn sender_type_for(conversation: &Conversation, user_id: &Uuid) -> Option<SenderType> {
    if conversation.customer_id == *user_id {
        Some(SenderType::Customer)
    } else if conversation.provider_id == *user_id {
        Some(SenderType::Provider)
    } else {
        None
    }
}

/// Conversazioni dell'utente, attività più recente in testa
#[instrument(skip(chats), fields(user_id = %user_id))]
pub async fn list_conversations(
    chats: &dyn ChatStore,
    user_id: &Uuid,
) -> Result<Vec<Conversation>, AppError> {
    let conversations = chats.list_conversations_for_user(user_id).await?;
    debug!("Listed {} conversations", conversations.len());
    Ok(conversations)
}

/// Messaggi della conversazione, dal più vecchio
#[instrument(skip(chats), fields(conversation_id = %conversation_id))]
pub async fn list_messages(
    chats: &dyn ChatStore,
    conversation_id: &Uuid,
) -> Result<Vec<Message>, AppError> {
    let messages = chats.list_messages(conversation_id).await?;
    debug!("Listed {} messages", messages.len());
    Ok(messages)
}

/// Invia un messaggio in una conversazione esistente
/// Operazioni:
/// 1. Validare il testo
/// 2. Salvare il messaggio
/// 3. Aggiornare last_message/last_message_at della conversazione
/// 4. Pubblicare l'inserimento sul feed
#[instrument(skip(chats, feed, conversation, text), fields(conversation_id = %conversation.id, sender_id = %sender_id))]
pub async fn send_message(
    chats: &dyn ChatStore,
    feed: &MessageFeed,
    conversation: &Conversation,
    sender_id: &Uuid,
    sender_type: SenderType,
    text: &str,
) -> Result<Message, AppError> {
    let text = normalize_message_text(text)?;

    let draft = CreateMessageDTO {
        conversation_id: conversation.id,
        sender_id: *sender_id,
        sender_type,
        message: text.to_string(),
        created_at: store_timestamp(),
    };
    draft.validate()?;

    let message = chats.insert_message(&draft).await?;
    chats
        .update_last_message(&conversation.id, &message.message, message.created_at)
        .await?;

    feed.publish(MessageEvent::new(message.clone(), conversation));

    info!("Message {} sent", message.id);
    Ok(message)
}

/// Avvia (o riprende) la conversazione tra cliente e fornitore inviando il primo messaggio
/// come cliente. Ritorna la conversazione già aggiornata con l'ultimo messaggio.
#[instrument(skip(chats, feed, customer_name, provider_name, initial_message), fields(customer_id = %customer_id, provider_id = %provider_id))]
pub async fn start_conversation(
    chats: &dyn ChatStore,
    feed: &MessageFeed,
    customer_id: &Uuid,
    customer_name: &str,
    provider_id: &Uuid,
    provider_name: &str,
    initial_message: &str,
) -> Result<(Conversation, Message), AppError> {
    if customer_id == provider_id {
        warn!("Attempt to start a conversation with oneself");
        return Err(AppError::bad_request("Cannot start a conversation with yourself"));
    }
    // validazione prima di qualunque scrittura: niente conversazioni orfane
    normalize_message_text(initial_message)?;

    let mut conversation = match chats.find_conversation_between(customer_id, provider_id).await? {
        Some(existing) => {
            info!("Reusing conversation {}", existing.id);
            existing
        }
        None => {
            let draft = CreateConversationDTO {
                customer_id: *customer_id,
                customer_name: customer_name.trim().to_string(),
                provider_id: *provider_id,
                provider_name: provider_name.trim().to_string(),
                created_at: store_timestamp(),
            };
            draft.validate()?;
            chats.create_conversation(&draft).await?
        }
    };

    let message = send_message(
        chats,
        feed,
        &conversation,
        customer_id,
        SenderType::Customer,
        initial_message,
    )
    .await?;

    conversation.last_message = Some(message.message.clone());
    conversation.last_message_at = Some(message.created_at);
    Ok((conversation, message))
}

/// Segna come letti i messaggi ricevuti dal lettore
#[instrument(skip(chats), fields(conversation_id = %conversation_id, reader_id = %reader_id))]
pub async fn mark_read(
    chats: &dyn ChatStore,
    conversation_id: &Uuid,
    reader_id: &Uuid,
) -> Result<u64, AppError> {
    let updated = chats.mark_read(conversation_id, reader_id).await?;
    info!("{} messages marked as read", updated);
    Ok(updated)
}
