pub mod client;
pub mod common;

pub use client::models::board_state::BoardState;
pub use client::services::board_service::BoardSession;
pub use common::error::BoardError;
