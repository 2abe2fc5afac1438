use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::roles::{RoleSlots, Slot};

/// A participant as identified by the client-supplied opaque id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_observer: bool,
}

/// The id and display name a client announces itself with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
}

/// Pre-game waiting room.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: String,
    pub created_at: i64,
    pub expires_at: i64,
    /// Absent on legacy records; the first player is host then.
    #[serde(default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub ready_player_ids: BTreeSet<String>,
    #[serde(default)]
    pub roles: RoleSlots,
    #[serde(default)]
    pub last_role_change_at: HashMap<String, i64>,
    #[serde(default)]
    pub last_seen: HashMap<String, i64>,
    pub base_time_seconds: u32,
    pub increment_seconds: u32,
}

impl Lobby {
    pub fn new(
        id: String,
        creator: &PlayerInfo,
        now_ms: i64,
        ttl_ms: i64,
        base_time_seconds: u32,
        increment_seconds: u32,
    ) -> Self {
        let mut lobby = Lobby {
            id,
            created_at: now_ms,
            expires_at: now_ms + ttl_ms,
            host_id: Some(creator.id.clone()),
            players: Vec::new(),
            ready_player_ids: BTreeSet::new(),
            roles: RoleSlots::default(),
            last_role_change_at: HashMap::new(),
            last_seen: HashMap::new(),
            base_time_seconds,
            increment_seconds,
        };
        lobby.admit(creator, now_ms);
        lobby
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }

    pub fn host(&self) -> Option<&str> {
        self.host_id
            .as_deref()
            .or_else(|| self.players.first().map(|p| p.id.as_str()))
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    /// Adds the player as an observer unless already present and stamps
    /// presence. Returns whether the roster grew.
    pub fn admit(&mut self, info: &PlayerInfo, now_ms: i64) -> bool {
        let added = if self.has_player(&info.id) {
            false
        } else {
            self.players.push(Player {
                id: info.id.clone(),
                name: info.name.clone(),
                is_observer: true,
            });
            true
        };
        self.last_seen.insert(info.id.clone(), now_ms);
        added
    }

    /// Drops the player from the roster, every role slot and presence map.
    pub fn remove_player(&mut self, player_id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        let vacated = self.roles.vacate(player_id);
        self.last_seen.remove(player_id);
        self.ready_player_ids.remove(player_id);
        before != self.players.len() || vacated
    }

    /// Keeps `is_observer` equal to "holds no slot".
    pub fn refresh_observer_flags(&mut self) {
        for player in self.players.iter_mut() {
            player.is_observer = !self.roles.holds_any(&player.id);
        }
    }

    pub fn display_names(&self) -> HashMap<String, String> {
        self.players
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect()
    }
}

/// Vacates every role whose holder has not been seen within `stale_after_ms`.
/// A holder with no presence entry at all counts as stale. Returns the slots
/// that were emptied.
pub fn sweep_stale_roles(lobby: &mut Lobby, now_ms: i64, stale_after_ms: i64) -> Vec<Slot> {
    let stale: Vec<Slot> = lobby
        .roles
        .occupants()
        .filter(|(_, id)| match lobby.last_seen.get(*id) {
            Some(seen) => now_ms - seen > stale_after_ms,
            None => true,
        })
        .map(|(slot, _)| slot)
        .collect();

    for slot in &stale {
        lobby.roles.clear(*slot);
    }
    if !stale.is_empty() {
        lobby.refresh_observer_flags();
    }
    stale
}
