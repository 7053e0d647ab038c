//! Error taxonomy for the server runtime.
//!
//! Every variant is an expected, recoverable condition reported back to
//! the requesting client as a structured failure. Collaborator failures
//! are logged where they occur and surfaced through the `Internal`
//! variants without leaking implementation detail.

use shared::HexCoordinate;
use thiserror::Error;

/// Errors from board construction and cell lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Board radius must be at least 1.
    #[error("invalid board radius: {0}")]
    InvalidRadius(i32),

    /// The coordinate is not a cell of the star board.
    #[error("coordinate ({0:?}) is outside the board")]
    OutsideBoard(HexCoordinate),
}

/// Rule violations detected while validating a requested move. None of
/// these mutate the board, and the requester's turn is not consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("the game is already finished")]
    GameFinished,

    #[error("no player of the moving color is in this game")]
    UnknownPlayer,

    #[error("it is not this player's turn")]
    NotYourTurn,

    #[error("a move needs an origin and at least one destination")]
    PathTooShort,

    #[error("coordinate ({0:?}) is outside the board")]
    OutsideBoard(HexCoordinate),

    #[error("origin cell ({0:?}) holds no piece")]
    OriginEmpty(HexCoordinate),

    #[error("origin cell ({0:?}) holds another player's piece")]
    NotYourPiece(HexCoordinate),

    #[error("cell ({0:?}) is already occupied")]
    DestinationOccupied(HexCoordinate),

    #[error("path visits cell ({0:?}) twice")]
    PathRepeated(HexCoordinate),

    #[error("step from ({from:?}) to ({to:?}) is neither adjacent nor a jump")]
    InvalidStep {
        from: HexCoordinate,
        to: HexCoordinate,
    },

    #[error("jump over ({0:?}) has no piece to jump")]
    MissingJumpedPiece(HexCoordinate),

    #[error("an adjacent step must be the only step of a move")]
    AdjacentStepNotAlone,
}

impl From<BoardError> for MoveError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::OutsideBoard(coord) => MoveError::OutsideBoard(coord),
            // Radius problems cannot occur once a game exists; map them
            // to the closest path-level failure.
            BoardError::InvalidRadius(_) => MoveError::PathTooShort,
        }
    }
}

/// Failures of pre-game lobby operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("lobby capacity must be 2, 4 or 6, got {0}")]
    InvalidCapacity(usize),

    #[error("user is currently banned")]
    Banned,

    #[error("lobby {0} not found")]
    LobbyNotFound(String),

    #[error("lobby is full")]
    LobbyFull,

    #[error("the game has already started")]
    AlreadyStarted,

    #[error("only the lobby host may do this")]
    NotHost,

    #[error("cannot start with {0} players")]
    NotEnoughPlayers(usize),

    #[error("user is not in a lobby")]
    NotInLobby,

    #[error("user is already in a lobby")]
    AlreadyInLobby,

    #[error("operation requires two distinct users")]
    SelfTarget,

    #[error("target user {0} has no live connection")]
    TargetUnreachable(String),

    #[error("could not allocate a unique lobby code")]
    CodeGeneration,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures of running-match operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no running match for lobby {0}")]
    MatchNotFound(String),

    #[error("player {0} is not a participant of this match")]
    PlayerNotInMatch(String),

    #[error("move request carries an invalid coordinate")]
    InvalidCoordinate,

    #[error("cannot seat {0} players")]
    TooManyPlayers(usize),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Move(#[from] MoveError),
}

impl LobbyError {
    /// Stable failure code carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::InvalidCapacity(_) => "invalid_capacity",
            LobbyError::Banned => "banned",
            LobbyError::LobbyNotFound(_) => "lobby_not_found",
            LobbyError::LobbyFull => "lobby_full",
            LobbyError::AlreadyStarted => "already_started",
            LobbyError::NotHost => "not_host",
            LobbyError::NotEnoughPlayers(_) => "not_enough_players",
            LobbyError::NotInLobby => "not_in_lobby",
            LobbyError::AlreadyInLobby => "already_in_lobby",
            LobbyError::SelfTarget => "self_target",
            LobbyError::TargetUnreachable(_) => "target_unreachable",
            LobbyError::CodeGeneration => "code_generation",
            LobbyError::Internal(_) => "internal",
        }
    }
}

impl MatchError {
    /// Stable failure code carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::MatchNotFound(_) => "match_not_found",
            MatchError::PlayerNotInMatch(_) => "player_not_in_match",
            MatchError::InvalidCoordinate => "invalid_coordinate",
            MatchError::TooManyPlayers(_) => "too_many_players",
            MatchError::Board(_) => "invalid_board",
            MatchError::Move(_) => "illegal_move",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_error_maps_into_move_error() {
        let coord = HexCoordinate::new(9, -9, 0);
        let err: MoveError = BoardError::OutsideBoard(coord).into();
        assert_eq!(err, MoveError::OutsideBoard(coord));
    }

    #[test]
    fn test_move_error_nests_into_match_error() {
        let err: MatchError = MoveError::NotYourTurn.into();
        assert_eq!(err.code(), "illegal_move");
        assert!(err.to_string().contains("turn"));
    }

    #[test]
    fn test_lobby_error_codes_are_distinct() {
        let errors = [
            LobbyError::InvalidCapacity(3),
            LobbyError::Banned,
            LobbyError::LobbyNotFound("X".into()),
            LobbyError::LobbyFull,
            LobbyError::AlreadyStarted,
            LobbyError::NotHost,
            LobbyError::NotEnoughPlayers(1),
            LobbyError::NotInLobby,
            LobbyError::AlreadyInLobby,
            LobbyError::SelfTarget,
            LobbyError::TargetUnreachable("bob".into()),
            LobbyError::CodeGeneration,
            LobbyError::Internal("boom".into()),
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
