//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod conversation;
pub mod message;
pub mod rental;
pub mod ws_event;

pub use conversation::{ConversationDTO, CreateConversationDTO, StartConversationDTO};
pub use message::{CreateMessageDTO, MessageDTO, ReadReceiptDTO, SendMessageDTO};
pub use rental::{UpdateRentalStatusRequest, UpdateRentalStatusResponse};
pub use ws_event::WsEventDTO;
