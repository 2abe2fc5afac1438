pub mod dispatch;
pub mod handler;
pub mod rooms;
pub mod sessions;

pub use dispatch::{decode, disconnect, dispatch};
pub use handler::{ws_index, PlayerSocket};
pub use rooms::{ConnId, RoomBroadcaster};
pub use sessions::{Session, SessionRegistry};
