//! Integration tests per conversazioni e messaggi

mod common;

#[cfg(test)]
mod conversation_tests {
    use super::common::*;
    use axum::http::HeaderName;
    use axum_test::TestServer;
    use marketplace_server::dtos::{ConversationDTO, MessageDTO, ReadReceiptDTO};
    use marketplace_server::entities::SenderType;
    use marketplace_server::repositories::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn authorization() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    async fn start(server: &TestServer, customer: Uuid, provider: Uuid, text: &str) -> ConversationDTO {
        let response = server
            .post("/conversations")
            .add_header(authorization(), bearer(customer))
            .json(&json!({
                "customer_name": "Carla",
                "provider_id": provider,
                "provider_name": "Noleggi Pietro",
                "message": text,
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    async fn send(server: &TestServer, sender: Uuid, conversation_id: Uuid, text: &str) -> MessageDTO {
        let response = server
            .post(&format!("/conversations/{}/messages", conversation_id))
            .add_header(authorization(), bearer(sender))
            .json(&json!({ "message": text }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    async fn listed(server: &TestServer, user: Uuid) -> Vec<Uuid> {
        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(user))
            .await;
        let conversations: Vec<ConversationDTO> = response.json();
        conversations.into_iter().map(|c| c.id).collect()
    }

    // ============================================================
    // POST /conversations
    // ============================================================

    #[tokio::test]
    async fn test_start_conversation_sends_first_message_as_customer() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());

        let conversation = start(&server, customer, provider, "Hi").await;
        assert_eq!(conversation.customer_id, customer);
        assert_eq!(conversation.provider_id, provider);
        assert_eq!(conversation.last_message.as_deref(), Some("Hi"));

        let response = server
            .get(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(provider))
            .await;
        response.assert_status_ok();
        let messages: Vec<MessageDTO> = response.json();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, customer);
        assert_eq!(messages[0].sender_type, SenderType::Customer);
        assert!(!messages[0].read);
    }

    #[tokio::test]
    async fn test_start_conversation_reuses_existing_pair() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());

        let first = start(&server, customer, provider, "Hi").await;
        let second = start(&server, customer, provider, "Are you there?").await;
        assert_eq!(first.id, second.id);
        assert_eq!(second.last_message.as_deref(), Some("Are you there?"));

        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(customer))
            .await;
        let conversations: Vec<ConversationDTO> = response.json();
        assert_eq!(conversations.len(), 1);
    }

    #[tokio::test]
    async fn test_start_conversation_rejects_invalid_input() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let customer = Uuid::new_v4();

        for body in [
            json!({ "customer_name": "Carla", "provider_id": Uuid::new_v4(), "provider_name": "Pietro", "message": "   " }),
            json!({ "customer_name": "", "provider_id": Uuid::new_v4(), "provider_name": "Pietro", "message": "Hi" }),
            json!({ "customer_name": "Carla", "provider_id": customer, "provider_name": "Pietro", "message": "Hi" }),
            json!({ "customer_name": "Carla", "provider_id": "nope", "provider_name": "Pietro", "message": "Hi" }),
        ] {
            server
                .post("/conversations")
                .add_header(authorization(), bearer(customer))
                .json(&body)
                .await
                .assert_status_bad_request();
        }

        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(customer))
            .await;
        let conversations: Vec<ConversationDTO> = response.json();
        assert!(conversations.is_empty());
    }

    // ============================================================
    // GET /conversations
    // ============================================================

    #[tokio::test]
    async fn test_list_conversations_newest_activity_first() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let user = Uuid::new_v4();

        let first = start(&server, user, Uuid::new_v4(), "first").await;
        let second = start(&server, user, Uuid::new_v4(), "second").await;
        // l'utente partecipa anche come fornitore
        let third = start(&server, Uuid::new_v4(), user, "third").await;
        // conversazione di altri, non deve comparire
        start(&server, Uuid::new_v4(), Uuid::new_v4(), "other").await;

        assert_eq!(listed(&server, user).await, vec![third.id, second.id, first.id]);

        send(&server, user, first.id, "ping").await;
        assert_eq!(listed(&server, user).await, vec![first.id, third.id, second.id]);
    }

    #[tokio::test]
    async fn test_list_conversations_requires_authentication() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store));

        server.get("/conversations").await.assert_status_unauthorized();
    }

    // ============================================================
    // Messaggi
    // ============================================================

    #[tokio::test]
    async fn test_send_message_updates_last_message() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());

        let conversation = start(&server, customer, provider, "Hi").await;
        let message = send(&server, customer, conversation.id, "Hello").await;
        assert_eq!(message.message, "Hello");
        assert_eq!(message.sender_type, SenderType::Customer);

        let stored = store.conversation(&conversation.id).unwrap();
        assert_eq!(stored.last_message.as_deref(), Some("Hello"));
        assert_eq!(stored.last_message_at, Some(message.created_at));
    }

    #[tokio::test]
    async fn test_provider_side_sends_as_provider_in_order() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());

        let conversation = start(&server, customer, provider, "Is the drill free tomorrow?").await;
        let reply = send(&server, provider, conversation.id, "Yes, from 9am").await;
        assert_eq!(reply.sender_type, SenderType::Provider);

        let response = server
            .get(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(customer))
            .await;
        let messages: Vec<MessageDTO> = response.json();
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["Is the drill free tomorrow?", "Yes, from 9am"]);
    }

    #[tokio::test]
    async fn test_message_text_is_trimmed_and_bounded() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());
        let conversation = start(&server, customer, provider, "Hi").await;

        let message = send(&server, customer, conversation.id, "  spaced  ").await;
        assert_eq!(message.message, "spaced");

        let too_long = "a".repeat(5001);
        server
            .post(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(customer))
            .json(&json!({ "message": too_long }))
            .await
            .assert_status_bad_request();

        assert_eq!(
            store.conversation(&conversation.id).unwrap().last_message.as_deref(),
            Some("spaced")
        );
    }

    #[tokio::test]
    async fn test_non_participant_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let conversation = start(&server, Uuid::new_v4(), Uuid::new_v4(), "Hi").await;
        let intruder = Uuid::new_v4();

        server
            .get(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(intruder))
            .await
            .assert_status_forbidden();

        server
            .post(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(intruder))
            .json(&json!({ "message": "let me in" }))
            .await
            .assert_status_forbidden();

        assert_eq!(
            store.conversation(&conversation.id).unwrap().last_message.as_deref(),
            Some("Hi")
        );
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store));

        server
            .get(&format!("/conversations/{}/messages", Uuid::new_v4()))
            .add_header(authorization(), bearer(Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_malformed_conversation_id_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store));

        server
            .get("/conversations/not-a-uuid/messages")
            .add_header(authorization(), bearer(Uuid::new_v4()))
            .await
            .assert_status_bad_request();
    }

    // ============================================================
    // Ricevute di lettura
    // ============================================================

    #[tokio::test]
    async fn test_mark_read_only_touches_messages_from_the_other_side() {
        let store = Arc::new(MemoryStore::new());
        let server = create_test_server(create_test_state(store.clone()));
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());

        let conversation = start(&server, customer, provider, "Hi").await;
        send(&server, provider, conversation.id, "Hello").await;
        send(&server, provider, conversation.id, "How can I help?").await;

        let response = server
            .post(&format!("/conversations/{}/read", conversation.id))
            .add_header(authorization(), bearer(customer))
            .await;
        response.assert_status_ok();
        let receipt: ReadReceiptDTO = response.json();
        assert_eq!(receipt.updated, 2);

        let response = server
            .get(&format!("/conversations/{}/messages", conversation.id))
            .add_header(authorization(), bearer(customer))
            .await;
        let messages: Vec<MessageDTO> = response.json();
        assert!(!messages[0].read);
        assert!(messages[1].read);
        assert!(messages[2].read);
    }
}
