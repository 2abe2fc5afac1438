//! Realtime coordination server for Hand & Brain chess: lobbies, role
//! seats and two-phase turns, fanned out to every connection in a room.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod websocket;

pub use error::{HandBrainError, Result};
pub use state::AppState;
