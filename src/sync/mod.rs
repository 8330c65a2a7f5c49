pub mod events;
mod gateway;
pub mod handlers;
pub mod rooms;

pub use gateway::sync_handler;
pub use rooms::{ConnectionId, RoomRegistry};
