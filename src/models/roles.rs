use std::fmt;

use serde::{Deserialize, Serialize};

/// A side of the board.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    White,
    Black,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::White => Team::Black,
            Team::Black => Team::White,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Team::White => "WHITE",
            Team::Black => "BLACK",
        }
    }
}

/// Hand picks the piece kind, Brain plays a move with it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Hand,
    Brain,
}

/// One of the four fixed (team, role) positions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub team: Team,
    pub role: Role,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::new(Team::White, Role::Hand),
        Slot::new(Team::White, Role::Brain),
        Slot::new(Team::Black, Role::Hand),
        Slot::new(Team::Black, Role::Brain),
    ];

    pub const fn new(team: Team, role: Role) -> Self {
        Slot { team, role }
    }

    fn index(self) -> usize {
        match (self.team, self.role) {
            (Team::White, Role::Hand) => 0,
            (Team::White, Role::Brain) => 1,
            (Team::Black, Role::Hand) => 2,
            (Team::Black, Role::Brain) => 3,
        }
    }
}

/// Renders as `WHITE_BRAIN` and friends.
impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            Role::Hand => "HAND",
            Role::Brain => "BRAIN",
        };
        write!(f, "{}_{}", self.team.label(), role)
    }
}

/// Occupancy of the four slots. Serialized with the canonical
/// `whiteHand`/`whiteBrain`/`blackHand`/`blackBrain` field names.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "SlotFields", into = "SlotFields")]
pub struct RoleSlots([Option<String>; 4]);

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SlotFields {
    #[serde(default)]
    white_hand: Option<String>,
    #[serde(default)]
    white_brain: Option<String>,
    #[serde(default)]
    black_hand: Option<String>,
    #[serde(default)]
    black_brain: Option<String>,
}

impl From<SlotFields> for RoleSlots {
    fn from(f: SlotFields) -> Self {
        RoleSlots([f.white_hand, f.white_brain, f.black_hand, f.black_brain])
    }
}

impl From<RoleSlots> for SlotFields {
    fn from(slots: RoleSlots) -> Self {
        let [white_hand, white_brain, black_hand, black_brain] = slots.0;
        SlotFields {
            white_hand,
            white_brain,
            black_hand,
            black_brain,
        }
    }
}

impl RoleSlots {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.0[slot.index()].as_deref()
    }

    pub fn assign(&mut self, slot: Slot, player_id: impl Into<String>) {
        self.0[slot.index()] = Some(player_id.into());
    }

    pub fn clear(&mut self, slot: Slot) {
        self.0[slot.index()] = None;
    }

    /// The slot held by `player_id`, if any.
    pub fn slot_of(&self, player_id: &str) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| self.get(*slot) == Some(player_id))
    }

    pub fn holds_any(&self, player_id: &str) -> bool {
        self.slot_of(player_id).is_some()
    }

    /// Empties every slot held by `player_id`. Returns whether anything changed.
    pub fn vacate(&mut self, player_id: &str) -> bool {
        let mut changed = false;
        for cell in self.0.iter_mut() {
            if cell.as_deref() == Some(player_id) {
                *cell = None;
                changed = true;
            }
        }
        changed
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn empty_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_none())
            .collect()
    }

    pub fn occupants(&self) -> impl Iterator<Item = (Slot, &str)> {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|id| (slot, id)))
    }
}
