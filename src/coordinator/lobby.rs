use log::{debug, info, warn};
use uuid::Uuid;

use super::game::new_game;
use crate::error::{HandBrainError, Result};
use crate::models::{sweep_stale_roles, GameState, Lobby, PlayerInfo, RoleSelection, ServerMessage, Slot};
use crate::state::AppState;
use crate::store::{game_key, lobby_key};
use crate::websocket::ConnId;

/// Lobby lifecycle: creation, joins, presence, role seats and game start.
pub struct LobbyCoordinator<'a> {
    app: &'a AppState,
}

impl<'a> LobbyCoordinator<'a> {
    pub fn new(app: &'a AppState) -> Self {
        Self { app }
    }

    pub async fn create(
        &self,
        creator: PlayerInfo,
        base_time_seconds: u32,
        increment_seconds: u32,
    ) -> Result<Lobby> {
        validate_player(&creator)?;
        if base_time_seconds == 0 {
            return Err(HandBrainError::InvalidInput(
                "baseTimeSeconds must be positive".into(),
            ));
        }

        let now = self.app.now_ms();
        let ttl = self.app.rules.lobby_ttl;
        let lobby = Lobby::new(
            Uuid::new_v4().to_string(),
            &creator,
            now,
            ttl.as_millis() as i64,
            base_time_seconds,
            increment_seconds,
        );
        self.app.store.put_lobby(&lobby, Some(ttl)).await?;
        info!("Lobby {} created by {}", lobby.id, creator.id);
        Ok(lobby)
    }

    /// Reads a lobby for display, applying the staleness sweep.
    pub async fn get(&self, lobby_id: &str) -> Result<Lobby> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let (lobby, swept) = self.load(lobby_id).await?;
        if swept {
            self.publish(&lobby);
        }
        Ok(lobby)
    }

    /// Adds the player (as observer) if new and stamps presence. With a
    /// connection, also subscribes it to the lobby room.
    pub async fn join(&self, lobby_id: &str, player: PlayerInfo, conn: Option<ConnId>) -> Result<Lobby> {
        validate_player(&player)?;
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let (mut lobby, _) = self.load(lobby_id).await?;

        if lobby.admit(&player, self.app.now_ms()) {
            info!("Player {} joined lobby {}", player.id, lobby_id);
        }
        self.save(&lobby).await?;

        if let Some(conn) = conn {
            self.app.rooms.join(lobby_id, conn);
            self.app.sessions.bind_lobby(conn, lobby_id, &player.id);
        }
        self.publish(&lobby);
        Ok(lobby)
    }

    /// Stamps presence. Never sweeps and never broadcasts.
    pub async fn heartbeat(&self, lobby_id: &str, player_id: &str) -> Result<()> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let now = self.app.now_ms();
        let mut lobby = self.fetch(lobby_id, now).await?;

        if !lobby.has_player(player_id) {
            debug!("Ignoring heartbeat from non-member {} in lobby {}", player_id, lobby_id);
            return Ok(());
        }
        lobby.last_seen.insert(player_id.to_string(), now);
        self.save(&lobby).await?;
        debug!("Heartbeat from {} in lobby {}", player_id, lobby_id);
        Ok(())
    }

    /// Takes a seat, or vacates the current one when `selection` is `None`.
    pub async fn select_role(
        &self,
        lobby_id: &str,
        player_id: &str,
        selection: Option<RoleSelection>,
    ) -> Result<Lobby> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let (mut lobby, _) = self.load(lobby_id).await?;
        require_member(&lobby, player_id)?;

        let now = self.app.now_ms();
        let cooldown = self.app.rules.role_cooldown.as_millis() as i64;
        if let Some(last) = lobby.last_role_change_at.get(player_id) {
            let elapsed = now - last;
            if elapsed < cooldown {
                return Err(HandBrainError::Cooldown {
                    retry_after_ms: cooldown - elapsed,
                });
            }
        }

        lobby.roles.vacate(player_id);
        match selection {
            None => info!("Player {} is now spectating lobby {}", player_id, lobby_id),
            Some(selection) => {
                let slot = Slot::from(selection);
                if let Some(holder) = lobby.roles.get(slot) {
                    if holder != player_id {
                        return Err(HandBrainError::Conflict(format!("{slot} is taken")));
                    }
                }
                lobby.roles.assign(slot, player_id);
                lobby.last_role_change_at.insert(player_id.to_string(), now);
                lobby.last_seen.insert(player_id.to_string(), now);
                info!("Player {} took {} in lobby {}", player_id, slot, lobby_id);
            }
        }
        lobby.refresh_observer_flags();

        self.save(&lobby).await?;
        self.publish(&lobby);
        Ok(lobby)
    }

    /// Flips the player's entry in the legacy ready set.
    pub async fn toggle_ready(&self, lobby_id: &str, player_id: &str) -> Result<Lobby> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let (mut lobby, _) = self.load(lobby_id).await?;
        require_member(&lobby, player_id)?;

        if !lobby.ready_player_ids.remove(player_id) {
            lobby.ready_player_ids.insert(player_id.to_string());
        }
        self.save(&lobby).await?;
        self.publish(&lobby);
        Ok(lobby)
    }

    /// Host-only. Requires all four seats filled; persists a fresh game under
    /// the lobby id and announces it to the room.
    pub async fn start_game(&self, lobby_id: &str, requester: &str) -> Result<GameState> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let (lobby, swept) = self.load(lobby_id).await?;
        if swept {
            self.publish(&lobby);
        }

        if lobby.host() != Some(requester) {
            return Err(HandBrainError::Forbidden(
                "only the host can start the game".into(),
            ));
        }
        let empty = lobby.roles.empty_slots();
        if !empty.is_empty() {
            let names: Vec<String> = empty.iter().map(Slot::to_string).collect();
            return Err(HandBrainError::Precondition(format!(
                "unfilled roles: {}",
                names.join(", ")
            )));
        }

        let _game_guard = self.app.locks.lock(&game_key(lobby_id)).await;
        if let Some(existing) = self.app.store.get_game(lobby_id).await? {
            if !existing.status.is_terminal() {
                return Err(HandBrainError::Conflict("a game is already in progress".into()));
            }
        }

        let game = new_game(&lobby, self.app.now_ms());
        self.app.store.put_game(&game).await?;
        info!("Game {} started by host {}", game.id, requester);

        self.app.rooms.broadcast(
            lobby_id,
            &ServerMessage::Start {
                game_id: game.id.clone(),
            },
        );
        self.app
            .rooms
            .broadcast(lobby_id, &ServerMessage::Game { game: game.clone() });
        Ok(game)
    }

    /// Disconnect cleanup: the player leaves the roster and any seat.
    /// A lobby that is gone or expired needs no cleanup.
    pub async fn remove_player(&self, lobby_id: &str, player_id: &str) -> Result<()> {
        let _guard = self.app.locks.lock(&lobby_key(lobby_id)).await;
        let mut lobby = match self.app.store.get_lobby(lobby_id).await? {
            Some(lobby) if !lobby.is_expired(self.app.now_ms()) => lobby,
            _ => return Ok(()),
        };

        if lobby.remove_player(player_id) {
            lobby.refresh_observer_flags();
            self.save(&lobby).await?;
            info!("Player {} removed from lobby {}", player_id, lobby_id);
            self.publish(&lobby);
        }
        Ok(())
    }

    /// Fetches the lobby, rejecting missing and expired ones, then vacates
    /// stale seats. Persists if the sweep changed anything. Callers must hold
    /// the lobby lock.
    async fn load(&self, lobby_id: &str) -> Result<(Lobby, bool)> {
        let now = self.app.now_ms();
        let mut lobby = self.fetch(lobby_id, now).await?;

        let stale_after = self.app.rules.stale_after.as_millis() as i64;
        let swept = sweep_stale_roles(&mut lobby, now, stale_after);
        if !swept.is_empty() {
            info!("Lobby {} vacated stale seats {:?}", lobby_id, swept);
            self.save(&lobby).await?;
        }
        Ok((lobby, !swept.is_empty()))
    }

    /// Missing and expired lobbies are distinct failures.
    async fn fetch(&self, lobby_id: &str, now: i64) -> Result<Lobby> {
        let lobby = self
            .app
            .store
            .get_lobby(lobby_id)
            .await?
            .ok_or_else(|| HandBrainError::NotFound(format!("lobby {lobby_id}")))?;

        if lobby.is_expired(now) {
            warn!("Lobby {} requested after expiry", lobby_id);
            return Err(HandBrainError::Expired(lobby_id.to_string()));
        }
        Ok(lobby)
    }

    async fn save(&self, lobby: &Lobby) -> Result<()> {
        self.app.store.put_lobby(lobby, None).await
    }

    fn publish(&self, lobby: &Lobby) {
        self.app
            .rooms
            .broadcast(&lobby.id, &ServerMessage::Lobby { lobby: lobby.clone() });
    }
}

fn validate_player(player: &PlayerInfo) -> Result<()> {
    if player.id.trim().is_empty() {
        return Err(HandBrainError::InvalidInput("player id is required".into()));
    }
    Ok(())
}

fn require_member(lobby: &Lobby, player_id: &str) -> Result<()> {
    if lobby.has_player(player_id) {
        Ok(())
    } else {
        Err(HandBrainError::Forbidden(format!(
            "player {player_id} is not in lobby {}",
            lobby.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::config::LobbyRules;
    use crate::models::{GameStatus, Role, Team};
    use crate::store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn app() -> (AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let app = AppState::new(Arc::new(MemoryStore::new()), clock.clone(), LobbyRules::default());
        (app, clock)
    }

    fn player(id: &str) -> PlayerInfo {
        PlayerInfo {
            id: id.into(),
            name: id.to_uppercase(),
        }
    }

    fn seat(team: Team, role: Role) -> Option<RoleSelection> {
        Some(RoleSelection { team, role })
    }

    async fn lobby_with(app: &AppState, ids: &[&str]) -> Lobby {
        let lobby = app.lobbies().create(player(ids[0]), 300, 5).await.unwrap();
        for id in &ids[1..] {
            app.lobbies().join(&lobby.id, player(id), None).await.unwrap();
        }
        lobby
    }

    #[actix_rt::test]
    async fn create_validates_time_control() {
        let (app, _) = app();
        let err = app.lobbies().create(player("a"), 0, 0).await.unwrap_err();
        assert!(matches!(err, HandBrainError::InvalidInput(_)));

        let lobby = app.lobbies().create(player("a"), 60, 0).await.unwrap();
        assert_eq!(lobby.host_id.as_deref(), Some("a"));
        assert_eq!(lobby.expires_at, T0 + 3_600_000);
    }

    #[actix_rt::test]
    async fn missing_and_expired_are_distinct() {
        let (app, clock) = app();
        let err = app.lobbies().join("nope", player("a"), None).await.unwrap_err();
        assert!(matches!(err, HandBrainError::NotFound(_)));

        // Keep the record alive in the store but past its logical expiry.
        let mut lobby = lobby_with(&app, &["a"]).await;
        lobby.expires_at = T0 + 10;
        app.store.put_lobby(&lobby, None).await.unwrap();
        clock.advance(11);
        let err = app.lobbies().join(&lobby.id, player("b"), None).await.unwrap_err();
        assert!(matches!(err, HandBrainError::Expired(_)));
    }

    #[actix_rt::test]
    async fn repeated_join_does_not_duplicate() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a", "b"]).await;
        clock.advance(500);
        let again = app.lobbies().join(&lobby.id, player("b"), None).await.unwrap();
        assert_eq!(again.players.len(), 2);
        assert_eq!(again.last_seen.get("b"), Some(&(T0 + 500)));
    }

    #[actix_rt::test]
    async fn cooldown_boundary() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a"]).await;
        let lobbies = app.lobbies();

        lobbies
            .select_role(&lobby.id, "a", seat(Team::White, Role::Hand))
            .await
            .unwrap();

        clock.advance(2_999);
        let err = lobbies
            .select_role(&lobby.id, "a", seat(Team::Black, Role::Hand))
            .await
            .unwrap_err();
        assert!(matches!(err, HandBrainError::Cooldown { retry_after_ms: 1 }));

        clock.advance(1);
        let updated = lobbies
            .select_role(&lobby.id, "a", seat(Team::Black, Role::Hand))
            .await
            .unwrap();
        assert_eq!(updated.roles.slot_of("a"), Some(Slot::new(Team::Black, Role::Hand)));
        assert!(updated.roles.get(Slot::new(Team::White, Role::Hand)).is_none());
    }

    #[actix_rt::test]
    async fn taken_seat_conflicts_and_own_seat_is_idempotent() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a", "b"]).await;
        let lobbies = app.lobbies();

        lobbies
            .select_role(&lobby.id, "a", seat(Team::White, Role::Hand))
            .await
            .unwrap();
        let err = lobbies
            .select_role(&lobby.id, "b", seat(Team::White, Role::Hand))
            .await
            .unwrap_err();
        assert!(matches!(err, HandBrainError::Conflict(_)));

        clock.advance(3_000);
        let same = lobbies
            .select_role(&lobby.id, "a", seat(Team::White, Role::Hand))
            .await
            .unwrap();
        assert_eq!(same.roles.slot_of("a"), Some(Slot::new(Team::White, Role::Hand)));
        assert!(!same.player("a").unwrap().is_observer);
    }

    #[actix_rt::test]
    async fn spectating_vacates_the_seat() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a"]).await;
        let lobbies = app.lobbies();
        lobbies
            .select_role(&lobby.id, "a", seat(Team::Black, Role::Brain))
            .await
            .unwrap();
        let err = lobbies.select_role(&lobby.id, "a", None).await.unwrap_err();
        assert!(matches!(err, HandBrainError::Cooldown { .. }));

        clock.advance(3_000);
        let spectating = lobbies.select_role(&lobby.id, "a", None).await.unwrap();
        assert!(!spectating.roles.holds_any("a"));
        assert!(spectating.player("a").unwrap().is_observer);
    }

    #[actix_rt::test]
    async fn outsiders_cannot_take_seats() {
        let (app, _) = app();
        let lobby = lobby_with(&app, &["a"]).await;
        let err = app
            .lobbies()
            .select_role(&lobby.id, "zed", seat(Team::White, Role::Hand))
            .await
            .unwrap_err();
        assert!(matches!(err, HandBrainError::Forbidden(_)));
    }

    #[actix_rt::test]
    async fn stale_holders_lose_their_seat_on_read() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a", "b"]).await;
        let lobbies = app.lobbies();
        lobbies
            .select_role(&lobby.id, "a", seat(Team::White, Role::Hand))
            .await
            .unwrap();
        lobbies
            .select_role(&lobby.id, "b", seat(Team::White, Role::Brain))
            .await
            .unwrap();

        clock.advance(10_000);
        lobbies.heartbeat(&lobby.id, "b").await.unwrap();
        clock.advance(6_000);

        let seen = lobbies.get(&lobby.id).await.unwrap();
        assert!(!seen.roles.holds_any("a"));
        assert!(seen.roles.holds_any("b"));
        assert!(seen.has_player("a"));

        // The vacancy was persisted, not just computed.
        let stored = app.store.get_lobby(&lobby.id).await.unwrap().unwrap();
        assert!(!stored.roles.holds_any("a"));
    }

    #[actix_rt::test]
    async fn late_heartbeat_keeps_the_senders_seat() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a", "b"]).await;
        let lobbies = app.lobbies();
        lobbies
            .select_role(&lobby.id, "a", seat(Team::White, Role::Hand))
            .await
            .unwrap();

        clock.advance(15_001);
        lobbies.heartbeat(&lobby.id, "a").await.unwrap();

        let stored = app.store.get_lobby(&lobby.id).await.unwrap().unwrap();
        assert_eq!(stored.last_seen.get("a"), Some(&(T0 + 15_001)));
        assert!(stored.roles.holds_any("a"));
        let seen = lobbies.get(&lobby.id).await.unwrap();
        assert_eq!(seen.roles.slot_of("a"), Some(Slot::new(Team::White, Role::Hand)));
    }

    #[actix_rt::test]
    async fn heartbeat_on_expired_lobby_is_rejected() {
        let (app, clock) = app();
        let lobby = lobby_with(&app, &["a"]).await;
        clock.advance(3_600_001);
        // The store's own TTL is wall-clock based and has not fired yet.
        let err = app.lobbies().heartbeat(&lobby.id, "a").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Expired(_)));
    }

    #[actix_rt::test]
    async fn toggle_ready_flips_membership() {
        let (app, _) = app();
        let lobby = lobby_with(&app, &["a"]).await;
        let on = app.lobbies().toggle_ready(&lobby.id, "a").await.unwrap();
        assert!(on.ready_player_ids.contains("a"));
        let off = app.lobbies().toggle_ready(&lobby.id, "a").await.unwrap();
        assert!(off.ready_player_ids.is_empty());
    }

    #[actix_rt::test]
    async fn start_requires_host_and_full_table() {
        let (app, _) = app();
        let lobby = lobby_with(&app, &["a", "b", "c", "d", "e"]).await;
        let lobbies = app.lobbies();

        let err = lobbies.start_game(&lobby.id, "b").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Forbidden(_)));
        let err = lobbies.start_game(&lobby.id, "a").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Precondition(_)));

        for (id, team, role) in [
            ("a", Team::White, Role::Hand),
            ("b", Team::White, Role::Brain),
            ("c", Team::Black, Role::Hand),
            ("d", Team::Black, Role::Brain),
        ] {
            lobbies.select_role(&lobby.id, id, seat(team, role)).await.unwrap();
        }

        let game = lobbies.start_game(&lobby.id, "a").await.unwrap();
        assert_eq!(game.id, lobby.id);
        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.players.observers, vec!["e".to_string()]);
        assert_eq!(game.player_names.get("c").map(String::as_str), Some("C"));
        assert!(app.store.get_game(&lobby.id).await.unwrap().is_some());

        let err = lobbies.start_game(&lobby.id, "a").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Conflict(_)));
    }

    #[actix_rt::test]
    async fn legacy_lobby_host_is_first_player() {
        let (app, _) = app();
        let mut lobby = lobby_with(&app, &["a", "b"]).await;
        lobby.host_id = None;
        app.store.put_lobby(&lobby, None).await.unwrap();
        let err = app.lobbies().start_game(&lobby.id, "b").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Forbidden(_)));
        let err = app.lobbies().start_game(&lobby.id, "a").await.unwrap_err();
        assert!(matches!(err, HandBrainError::Precondition(_)));
    }

    #[actix_rt::test]
    async fn remove_player_vacates_and_tolerates_missing_lobby() {
        let (app, _) = app();
        let lobby = lobby_with(&app, &["a", "b"]).await;
        app.lobbies()
            .select_role(&lobby.id, "b", seat(Team::Black, Role::Hand))
            .await
            .unwrap();
        app.lobbies().remove_player(&lobby.id, "b").await.unwrap();

        let stored = app.store.get_lobby(&lobby.id).await.unwrap().unwrap();
        assert!(!stored.has_player("b"));
        assert!(stored.roles.get(Slot::new(Team::Black, Role::Hand)).is_none());

        app.lobbies().remove_player("gone", "b").await.unwrap();
    }
}
