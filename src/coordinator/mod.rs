pub mod game;
pub mod lobby;
pub mod locks;

pub use game::GameCoordinator;
pub use lobby::LobbyCoordinator;
pub use locks::KeyLocks;
