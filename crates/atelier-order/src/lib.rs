//! Smart-order client: in-memory cart state plus the recommendation
//! call that turns a chat turn into either a structured order proposal
//! or a plain reply.

pub mod api;
pub mod cart;
pub mod types;

pub use api::{extract_assistant_content, parse_ai_response, ChatMessage, RecommendClient};
pub use cart::{format_currency, Cart};
pub use types::{
    AiReply, AiResponse, ChatReply, ItemAttributes, MenuItem, Order, OrderItem, SpicyLevel,
};
