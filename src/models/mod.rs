pub mod game_state;
pub mod lobby;
pub mod messages;
pub mod roles;

// Re-export important types
pub use game_state::*;
pub use lobby::*;
pub use messages::*;
pub use roles::*;
