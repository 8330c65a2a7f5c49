mod admin;
pub mod dto;
mod files;
mod health;
pub mod response;
mod router;

pub use router::{AppState, create_router};
