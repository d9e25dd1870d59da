pub mod board_state;
pub mod entity_store;
pub mod messages;
pub mod ui_state;
