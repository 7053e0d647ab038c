//! Game engine: move validation, turn rotation and win detection
//!
//! A `Game` owns the board plus all per-match player state and is the
//! only place where rules are enforced. It is a plain mutable value;
//! the match orchestrator is responsible for guarding it against
//! concurrent access. Failed moves never mutate anything.

use crate::board::{Board, Piece};
use crate::error::{BoardError, MoveError};
use log::info;
use shared::{BoardSnapshot, Color, HexCoordinate, PieceSet};
use std::collections::HashMap;

/// A requested move: origin first, destination last, intermediate
/// entries are the landing cells of a jump chain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerMove {
    path: Vec<HexCoordinate>,
}

impl PlayerMove {
    pub fn new(path: Vec<HexCoordinate>) -> Result<Self, MoveError> {
        if path.len() < 2 {
            return Err(MoveError::PathTooShort);
        }
        Ok(Self { path })
    }

    pub fn origin(&self) -> HexCoordinate {
        self.path[0]
    }

    pub fn destination(&self) -> HexCoordinate {
        self.path[self.path.len() - 1]
    }

    pub fn path(&self) -> &[HexCoordinate] {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Finished,
}

/// The mutable per-match aggregate: board, participating players, fixed
/// turn order and the winner once decided.
#[derive(Debug)]
pub struct Game {
    board: Board,
    players: HashMap<Color, String>,
    turn_order: Vec<Color>,
    current: usize,
    winner: Option<Color>,
}

impl Game {
    /// Creates a fresh game: builds the board, fills every participating
    /// color's home zone with that color's pieces and fixes the turn
    /// order (colors sorted by their declaration order).
    pub fn new(radius: i32, players: HashMap<Color, String>) -> Result<Self, BoardError> {
        let mut board = Board::new(radius)?;

        let mut turn_order: Vec<Color> = players.keys().copied().collect();
        turn_order.sort();

        for &color in &turn_order {
            for coord in board.zone_cells(color) {
                board.cell_mut(coord)?.occupant = Some(Piece { color });
            }
        }

        Ok(Self {
            board,
            players,
            turn_order,
            current: 0,
            winner: None,
        })
    }

    pub fn status(&self) -> GameStatus {
        if self.winner.is_some() {
            GameStatus::Finished
        } else {
            GameStatus::InProgress
        }
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    /// The color whose turn it is, or `None` once the game is finished
    /// or no players remain.
    pub fn current_turn(&self) -> Option<Color> {
        if self.winner.is_some() || self.turn_order.is_empty() {
            None
        } else {
            Some(self.turn_order[self.current])
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player_name(&self, color: Color) -> Option<&str> {
        self.players.get(&color).map(String::as_str)
    }

    /// Validates and applies one move for `color`.
    ///
    /// On success the mover's piece relocates from origin to the final
    /// destination (jumped-over pieces stay where they are), the win
    /// condition is re-evaluated and either the winner is returned or
    /// the turn advances. On failure nothing changes, including the
    /// turn.
    pub fn try_apply_move(
        &mut self,
        color: Color,
        mv: &PlayerMove,
    ) -> Result<Option<Color>, MoveError> {
        if self.winner.is_some() {
            return Err(MoveError::GameFinished);
        }
        if !self.players.contains_key(&color) {
            return Err(MoveError::UnknownPlayer);
        }
        if self.current_turn() != Some(color) {
            return Err(MoveError::NotYourTurn);
        }

        self.validate_path(color, mv.path())?;

        let origin = mv.origin();
        let piece = self
            .board
            .cell_mut(origin)?
            .occupant
            .take()
            .ok_or(MoveError::OriginEmpty(origin))?;
        self.board.cell_mut(mv.destination())?.occupant = Some(piece);

        if self.target_zone_complete(color) {
            self.winner = Some(color);
            info!("Game won by {}", color);
            return Ok(Some(color));
        }

        self.advance_turn();
        Ok(None)
    }

    /// Path legality per the movement rules: the origin must hold the
    /// mover's piece; every later cell must be on the board, empty and
    /// new to this path; each step is either one adjacent hop (legal
    /// only as the sole step) or a jump over an occupied cell.
    fn validate_path(&self, color: Color, path: &[HexCoordinate]) -> Result<(), MoveError> {
        let origin = path[0];
        let origin_cell = self.board.cell(origin)?;
        let piece = origin_cell
            .occupant
            .ok_or(MoveError::OriginEmpty(origin))?;
        if piece.color != color {
            return Err(MoveError::NotYourPiece(origin));
        }

        let multi_step = path.len() > 2;
        let mut visited = vec![origin];

        for window in path.windows(2) {
            let (from, to) = (window[0], window[1]);

            let to_cell = self.board.cell(to)?;
            if to_cell.occupant.is_some() {
                return Err(MoveError::DestinationOccupied(to));
            }
            if visited.contains(&to) {
                return Err(MoveError::PathRepeated(to));
            }
            visited.push(to);

            if let Some(middle) = self.board.jump_middle(from, to) {
                if self.board.cell(middle)?.occupant.is_none() {
                    return Err(MoveError::MissingJumpedPiece(middle));
                }
            } else if self.board.is_adjacent_move(from, to) {
                if multi_step {
                    return Err(MoveError::AdjacentStepNotAlone);
                }
            } else {
                return Err(MoveError::InvalidStep { from, to });
            }
        }

        Ok(())
    }

    /// Win condition: every cell of the mover's target zone (the
    /// opposite color's home triangle) holds one of the mover's pieces.
    fn target_zone_complete(&self, color: Color) -> bool {
        self.board
            .zone_cells(color.target())
            .iter()
            .all(|&coord| {
                self.board
                    .try_cell(coord)
                    .and_then(|cell| cell.occupant)
                    .map(|piece| piece.color)
                    == Some(color)
            })
    }

    /// Ends the game in `color`'s favor without a board move (forfeit).
    /// A winner already decided on the board is never overridden.
    pub fn declare_winner(&mut self, color: Color) {
        if self.winner.is_none() {
            self.winner = Some(color);
            info!("Game conceded to {}", color);
        }
    }

    fn advance_turn(&mut self) {
        if !self.turn_order.is_empty() {
            self.current = (self.current + 1) % self.turn_order.len();
        }
    }

    /// Drops a color from the turn rotation (a departed player). Their
    /// pieces stay on the board as obstacles; if it was their turn, the
    /// turn passes to the next remaining color.
    pub fn remove_player(&mut self, color: Color) {
        let Some(pos) = self.turn_order.iter().position(|&c| c == color) else {
            return;
        };

        self.turn_order.remove(pos);
        self.players.remove(&color);

        if self.turn_order.is_empty() {
            self.current = 0;
        } else {
            if pos < self.current {
                self.current -= 1;
            }
            self.current %= self.turn_order.len();
        }

        info!("Removed {} from the turn rotation", color);
    }

    /// Read-only snapshot for broadcasts and reconnect resync.
    pub fn snapshot(&self) -> BoardSnapshot {
        let pieces = Color::ALL
            .iter()
            .filter_map(|&color| {
                let cells = self.board.occupied_cells(color);
                if cells.is_empty() {
                    None
                } else {
                    Some(PieceSet { color, cells })
                }
            })
            .collect();

        BoardSnapshot {
            pieces,
            current_turn: self.current_turn(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Zone;

    fn two_player_game(radius: i32) -> Game {
        let mut players = HashMap::new();
        players.insert(Color::Red, "alice".to_string());
        players.insert(Color::Green, "bob".to_string());
        Game::new(radius, players).unwrap()
    }

    fn coord(x: i32, y: i32, z: i32) -> HexCoordinate {
        HexCoordinate::new(x, y, z)
    }

    fn mv(path: &[HexCoordinate]) -> PlayerMove {
        PlayerMove::new(path.to_vec()).unwrap()
    }

    /// Puts a piece on a cell directly, bypassing the rules, to build
    /// test positions.
    fn plant(game: &mut Game, at: HexCoordinate, color: Color) {
        game.board.cell_mut(at).unwrap().occupant = Some(Piece { color });
    }

    #[test]
    fn test_new_game_setup() {
        let game = two_player_game(4);

        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.current_turn(), Some(Color::Red));
        assert_eq!(game.winner(), None);
        assert_eq!(game.player_name(Color::Red), Some("alice"));
        assert_eq!(game.player_name(Color::Blue), None);

        // Each participating home zone is filled with its own color.
        for color in [Color::Red, Color::Green] {
            for cell_coord in game.board().zone_cells(color) {
                let cell = game.board().cell(cell_coord).unwrap();
                assert_eq!(cell.occupant, Some(Piece { color }));
            }
        }
        // Non-participating zones stay empty.
        assert!(game.board().occupied_cells(Color::Blue).is_empty());
    }

    #[test]
    fn test_player_move_needs_two_coordinates() {
        assert!(matches!(
            PlayerMove::new(vec![coord(0, 0, 0)]),
            Err(MoveError::PathTooShort)
        ));
        assert!(PlayerMove::new(vec![coord(0, 0, 0), coord(1, -1, 0)]).is_ok());
    }

    #[test]
    fn test_adjacent_move_advances_turn() {
        let mut game = two_player_game(1);

        // Red's single piece sits on the +x arm tip.
        let result = game.try_apply_move(Color::Red, &mv(&[coord(2, -1, -1), coord(1, -1, 0)]));
        assert_eq!(result, Ok(None));
        assert_eq!(game.current_turn(), Some(Color::Green));

        let moved = game.board().cell(coord(1, -1, 0)).unwrap();
        assert_eq!(moved.occupant, Some(Piece { color: Color::Red }));
        assert!(game.board().cell(coord(2, -1, -1)).unwrap().occupant.is_none());
    }

    #[test]
    fn test_out_of_turn_move_rejected() {
        let mut game = two_player_game(1);

        let result =
            game.try_apply_move(Color::Green, &mv(&[coord(-2, 1, 1), coord(-1, 1, 0)]));
        assert_eq!(result, Err(MoveError::NotYourTurn));
        // Failed moves leave the turn untouched.
        assert_eq!(game.current_turn(), Some(Color::Red));
    }

    #[test]
    fn test_unknown_color_rejected() {
        let mut game = two_player_game(1);
        let result = game.try_apply_move(Color::Blue, &mv(&[coord(1, 1, -2), coord(1, 0, -1)]));
        assert_eq!(result, Err(MoveError::UnknownPlayer));
    }

    #[test]
    fn test_single_jump() {
        let mut game = two_player_game(1);
        plant(&mut game, coord(1, -1, 0), Color::Green);

        let result = game.try_apply_move(Color::Red, &mv(&[coord(2, -1, -1), coord(0, -1, 1)]));
        assert_eq!(result, Ok(None));

        // No capture: the jumped-over piece is untouched.
        let middle = game.board().cell(coord(1, -1, 0)).unwrap();
        assert_eq!(middle.occupant, Some(Piece { color: Color::Green }));
        let landed = game.board().cell(coord(0, -1, 1)).unwrap();
        assert_eq!(landed.occupant, Some(Piece { color: Color::Red }));
    }

    #[test]
    fn test_jump_chain() {
        let mut game = two_player_game(1);
        plant(&mut game, coord(1, -1, 0), Color::Green);
        plant(&mut game, coord(0, 0, 0), Color::Green);

        // Two consecutive jumps: over (1,-1,0), then over (0,0,0).
        let path = [coord(2, -1, -1), coord(0, -1, 1), coord(0, 1, -1)];
        assert_eq!(game.try_apply_move(Color::Red, &mv(&path)), Ok(None));

        let destination = game.board().cell(coord(0, 1, -1)).unwrap();
        assert_eq!(destination.occupant, Some(Piece { color: Color::Red }));
        // Intermediate landing cells are left empty.
        assert!(game.board().cell(coord(0, -1, 1)).unwrap().occupant.is_none());
    }

    #[test]
    fn test_jump_without_piece_rejected() {
        let mut game = two_player_game(1);

        let result = game.try_apply_move(Color::Red, &mv(&[coord(2, -1, -1), coord(0, -1, 1)]));
        assert_eq!(
            result,
            Err(MoveError::MissingJumpedPiece(coord(1, -1, 0)))
        );
    }

    #[test]
    fn test_adjacent_step_in_chain_rejected() {
        let mut game = two_player_game(1);
        plant(&mut game, coord(1, -1, 0), Color::Green);

        // Jump followed by an adjacent hop: forbidden.
        let path = [coord(2, -1, -1), coord(0, -1, 1), coord(0, 0, 0)];
        assert_eq!(
            game.try_apply_move(Color::Red, &mv(&path)),
            Err(MoveError::AdjacentStepNotAlone)
        );
    }

    #[test]
    fn test_multi_step_without_jumps_rejected() {
        let mut game = two_player_game(1);

        let path = [coord(2, -1, -1), coord(1, -1, 0), coord(0, -1, 1)];
        assert_eq!(
            game.try_apply_move(Color::Red, &mv(&path)),
            Err(MoveError::AdjacentStepNotAlone)
        );
    }

    #[test]
    fn test_repeated_cell_rejected() {
        let mut game = two_player_game(1);
        plant(&mut game, coord(1, -1, 0), Color::Green);
        plant(&mut game, coord(0, 0, 0), Color::Green);

        // Jump chain that bounces back over the same piece to a cell it
        // already landed on.
        let path = [
            coord(2, -1, -1),
            coord(0, -1, 1),
            coord(0, 1, -1),
            coord(0, -1, 1),
        ];
        let result = game.try_apply_move(Color::Red, &mv(&path));
        assert_eq!(result, Err(MoveError::PathRepeated(coord(0, -1, 1))));

        // Nothing moved and the turn was not consumed.
        let origin = game.board().cell(coord(2, -1, -1)).unwrap();
        assert_eq!(origin.occupant, Some(Piece { color: Color::Red }));
        assert_eq!(game.current_turn(), Some(Color::Red));
    }

    #[test]
    fn test_move_from_empty_or_foreign_origin_rejected() {
        let mut game = two_player_game(1);

        assert_eq!(
            game.try_apply_move(Color::Red, &mv(&[coord(0, 0, 0), coord(1, -1, 0)])),
            Err(MoveError::OriginEmpty(coord(0, 0, 0)))
        );
        assert_eq!(
            game.try_apply_move(Color::Red, &mv(&[coord(-2, 1, 1), coord(-1, 1, 0)])),
            Err(MoveError::NotYourPiece(coord(-2, 1, 1)))
        );
    }

    #[test]
    fn test_destination_outside_board_rejected() {
        let mut game = two_player_game(1);

        let result = game.try_apply_move(Color::Red, &mv(&[coord(2, -1, -1), coord(3, -2, -1)]));
        assert_eq!(result, Err(MoveError::OutsideBoard(coord(3, -2, -1))));
    }

    #[test]
    fn test_win_on_radius_one_board() {
        let mut game = two_player_game(1);

        // Scripted race: Red walks to Green's vacated home cell.
        let script: [(Color, [HexCoordinate; 2]); 7] = [
            (Color::Red, [coord(2, -1, -1), coord(1, -1, 0)]),
            (Color::Green, [coord(-2, 1, 1), coord(-1, 1, 0)]),
            (Color::Red, [coord(1, -1, 0), coord(0, 0, 0)]),
            (Color::Green, [coord(-1, 1, 0), coord(0, 1, -1)]),
            (Color::Red, [coord(0, 0, 0), coord(-1, 0, 1)]),
            (Color::Green, [coord(0, 1, -1), coord(1, 0, -1)]),
            (Color::Red, [coord(-1, 0, 1), coord(-2, 1, 1)]),
        ];

        for (i, (color, path)) in script.iter().enumerate() {
            let result = game.try_apply_move(*color, &mv(path)).unwrap();
            if i < script.len() - 1 {
                assert_eq!(result, None, "premature winner at step {}", i);
            } else {
                assert_eq!(result, Some(Color::Red));
            }
        }

        assert_eq!(game.status(), GameStatus::Finished);
        assert_eq!(game.winner(), Some(Color::Red));
        assert_eq!(game.current_turn(), None);

        // Terminal: any further move fails without mutating.
        let result = game.try_apply_move(Color::Green, &mv(&[coord(1, 0, -1), coord(1, -1, 0)]));
        assert_eq!(result, Err(MoveError::GameFinished));
    }

    #[test]
    fn test_remove_player_skips_their_turns() {
        let mut players = HashMap::new();
        players.insert(Color::Red, "alice".to_string());
        players.insert(Color::Green, "bob".to_string());
        players.insert(Color::Blue, "carol".to_string());
        players.insert(Color::Yellow, "dave".to_string());
        let mut game = Game::new(2, players).unwrap();

        assert_eq!(game.current_turn(), Some(Color::Red));

        // Removing the color whose turn it is hands the turn onward.
        game.remove_player(Color::Red);
        assert_eq!(game.current_turn(), Some(Color::Green));

        // Removing an earlier color keeps the current one in place.
        game.remove_player(Color::Green);
        assert_eq!(game.current_turn(), Some(Color::Blue));

        // Removed colors can no longer move.
        let result = game.try_apply_move(Color::Red, &mv(&[coord(4, -2, -2), coord(3, -2, -1)]));
        assert_eq!(result, Err(MoveError::UnknownPlayer));

        // Their pieces stay on the board as obstacles.
        assert!(!game.board().occupied_cells(Color::Red).is_empty());
    }

    #[test]
    fn test_declared_winner_is_terminal() {
        let mut game = two_player_game(1);

        game.declare_winner(Color::Green);
        assert_eq!(game.status(), GameStatus::Finished);
        assert_eq!(game.winner(), Some(Color::Green));
        assert_eq!(game.current_turn(), None);

        // Concession does not displace a decided winner.
        game.declare_winner(Color::Red);
        assert_eq!(game.winner(), Some(Color::Green));

        let result = game.try_apply_move(Color::Red, &mv(&[coord(2, -1, -1), coord(1, -1, 0)]));
        assert_eq!(result, Err(MoveError::GameFinished));
    }

    #[test]
    fn test_snapshot_contents() {
        let game = two_player_game(2);
        let snapshot = game.snapshot();

        assert_eq!(snapshot.current_turn, Some(Color::Red));
        assert_eq!(snapshot.pieces.len(), 2);
        for set in &snapshot.pieces {
            assert_eq!(set.cells.len(), 3, "home zone size for {}", set.color);
            assert!(matches!(set.color, Color::Red | Color::Green));
        }
    }

    #[test]
    fn test_zone_label_of_home_cells() {
        let game = two_player_game(1);
        let board = game.board();
        for color in [Color::Red, Color::Green] {
            for cell_coord in board.zone_cells(color) {
                assert_eq!(board.cell(cell_coord).unwrap().zone, Zone::Home(color));
            }
        }
    }
}
