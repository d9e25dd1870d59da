pub mod board_service;
pub mod presence;
pub mod reducer;
pub mod standup;
pub mod timer;
pub mod websocket_client;
