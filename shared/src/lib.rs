use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Allowed lobby capacities. A lobby must hold an even number of players
/// so that every home zone faces an occupied target zone.
pub const ALLOWED_CAPACITIES: [usize; 3] = [2, 4, 6];

/// Board radius used for all matches (arm size of the star).
pub const DEFAULT_BOARD_RADIUS: i32 = 4;

/// The six player colors. Declaration order is the deterministic turn
/// order and the color-assignment order when a match starts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
}

impl Color {
    /// All colors in assignment/turn order. Consecutive pairs are
    /// opposites, so 2- and 4-player matches get facing home zones.
    pub const ALL: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Orange,
        Color::Purple,
    ];

    /// The color whose home zone this color must fill to win.
    pub fn target(self) -> Color {
        match self {
            Color::Red => Color::Green,
            Color::Green => Color::Red,
            Color::Blue => Color::Yellow,
            Color::Yellow => Color::Blue,
            Color::Orange => Color::Purple,
            Color::Purple => Color::Orange,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
            Color::Purple => "purple",
        };
        write!(f, "{}", name)
    }
}

/// Cube coordinate on the hex grid. Valid coordinates satisfy
/// x + y + z = 0; the wire carries all three integers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HexCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl HexCoordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Whether the cube invariant holds. Coordinates decoded from the
    /// wire must be checked before use; the sum is taken in i64 so
    /// extreme wire values cannot overflow.
    pub fn is_valid(&self) -> bool {
        self.x as i64 + self.y as i64 + self.z as i64 == 0
    }

    /// Cube (hex Manhattan) distance to another coordinate.
    pub fn distance(&self, other: HexCoordinate) -> i32 {
        let d = *self - other;
        (d.x.abs() + d.y.abs() + d.z.abs()) / 2
    }
}

impl Add for HexCoordinate {
    type Output = HexCoordinate;

    fn add(self, rhs: HexCoordinate) -> HexCoordinate {
        HexCoordinate::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for HexCoordinate {
    type Output = HexCoordinate;

    fn sub(self, rhs: HexCoordinate) -> HexCoordinate {
        HexCoordinate::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyVisibility {
    Public,
    Private,
}

/// Current ban state of a username, derived from accumulated reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BanStatus {
    #[default]
    None,
    Temporary { expires_at_ms: u64 },
    Permanent,
}

impl BanStatus {
    /// Whether the ban is in force at the given unix-millisecond time.
    /// An expired temporary ban reads as inactive.
    pub fn is_active(&self, now_ms: u64) -> bool {
        match self {
            BanStatus::None => false,
            BanStatus::Temporary { expires_at_ms } => *expires_at_ms > now_ms,
            BanStatus::Permanent => true,
        }
    }
}

// Request shapes for the inbound surface.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    pub visibility: LobbyVisibility,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLobbyRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub lobby_code: String,
    pub username: String,
    /// Origin first, destination last; intermediate entries are the
    /// landing cells of a jump chain.
    pub path: Vec<HexCoordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub reporter: String,
    pub target: String,
}

/// One lobby member as shown to clients. The host is listed first in
/// every snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyMemberInfo {
    pub username: String,
    pub avatar: Option<String>,
    pub is_host: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub code: String,
    pub visibility: LobbyVisibility,
    pub capacity: usize,
    pub started: bool,
    pub members: Vec<LobbyMemberInfo>,
}

/// Occupied cells of one color, part of a board snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceSet {
    pub color: Color,
    pub cells: Vec<HexCoordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub pieces: Vec<PieceSet>,
    pub current_turn: Option<Color>,
}

/// One-way push events delivered to each connected client. All are
/// best-effort; a delivery failure only evicts that client's binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    LobbyUpdated {
        lobby: LobbySnapshot,
    },
    LobbyClosed {
        code: String,
        reason: String,
    },
    GameStarting {
        code: String,
    },
    InvitationReceived {
        from: String,
        code: String,
    },
    Kicked {
        reason: String,
    },
    BanStatusChanged {
        status: BanStatus,
    },
    ChatMessage {
        from: String,
        text: String,
    },
    TurnChanged {
        previous: String,
        next: Option<String>,
        path: Vec<HexCoordinate>,
        board: BoardSnapshot,
    },
    MatchEnded {
        winner: String,
    },
    PlayerLeftMatch {
        username: String,
    },
    Error {
        code: String,
        message: String,
    },
}
