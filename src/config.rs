//! Server configuration: command-line flags, each with an environment
//! variable fallback and a default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Timing rules the lobby coordinator enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyRules {
    /// Lifetime of a lobby from creation; also the store TTL.
    pub lobby_ttl: Duration,
    /// Role-holders silent for longer than this lose their slot.
    pub stale_after: Duration,
    /// Minimum gap between two successful role changes by one player.
    pub role_cooldown: Duration,
}

impl Default for LobbyRules {
    fn default() -> Self {
        Self {
            lobby_ttl: Duration::from_secs(60 * 60),
            stale_after: Duration::from_secs(15),
            role_cooldown: Duration::from_millis(3000),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "hand-brain-server")]
#[command(about = "Realtime Hand & Brain chess lobby and game server")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "HAND_BRAIN_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Lobby lifetime in seconds
    #[arg(long, env = "HAND_BRAIN_LOBBY_TTL_SECS", default_value_t = 3600)]
    pub lobby_ttl_secs: u64,

    /// Seconds of silence after which a role-holder loses the seat
    #[arg(long, env = "HAND_BRAIN_STALE_SECS", default_value_t = 15)]
    pub stale_secs: u64,

    /// Minimum milliseconds between two role changes by one player
    #[arg(long, env = "HAND_BRAIN_COOLDOWN_MS", default_value_t = 3000)]
    pub cooldown_ms: u64,

    /// Directory of static client files served at `/`
    #[arg(long, env = "HAND_BRAIN_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub rules: LobbyRules,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            rules: LobbyRules::default(),
            static_dir: None,
        }
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            bind: args.bind,
            rules: LobbyRules {
                lobby_ttl: Duration::from_secs(args.lobby_ttl_secs),
                stale_after: Duration::from_secs(args.stale_secs),
                role_cooldown: Duration::from_millis(args.cooldown_ms),
            },
            static_dir: args.static_dir.filter(|dir| !dir.as_os_str().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ServerConfig, clap::Error> {
        let argv = std::iter::once("hand-brain-server").chain(args.iter().copied());
        ServerArgs::try_parse_from(argv).map(ServerConfig::from)
    }

    #[test]
    fn defaults_match_the_lobby_rules() {
        let config = parse(&[]).unwrap();
        let expected = ServerConfig::default();
        assert_eq!(config.bind, expected.bind);
        assert_eq!(config.rules, LobbyRules::default());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--bind",
            "0.0.0.0:9000",
            "--lobby-ttl-secs",
            "120",
            "--stale-secs",
            "30",
            "--cooldown-ms",
            "500",
            "--static-dir",
            "./public",
        ])
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.rules.lobby_ttl, Duration::from_secs(120));
        assert_eq!(config.rules.stale_after, Duration::from_secs(30));
        assert_eq!(config.rules.role_cooldown, Duration::from_millis(500));
        assert_eq!(config.static_dir, Some(PathBuf::from("./public")));
    }

    #[test]
    fn malformed_value_is_rejected() {
        let err = parse(&["--cooldown-ms", "soon"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(parse(&["--bind", "not-an-address"]).is_err());
    }

    #[test]
    fn arguments_are_well_formed() {
        use clap::CommandFactory;
        ServerArgs::command().debug_assert();
    }
}
