//! Star-shaped hex board: cell generation and geometry queries
//!
//! The board is the fixed, closed set of cells for a given radius: a
//! central hexagon (every cube coordinate at most `radius` in absolute
//! value) plus six triangular arms, one per color. Cells are addressed
//! by cube coordinate and built once at game construction; the set is
//! never resized afterwards.

use crate::error::BoardError;
use shared::{Color, HexCoordinate};
use std::collections::HashMap;

/// Zone label of a board cell: the central hexagon or one color's home
/// triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Center,
    Home(Color),
}

/// A playing piece. Pieces are created once during board setup and only
/// ever move between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
}

/// One board position: its coordinate, its fixed zone label, and the
/// piece currently standing on it (at most one).
#[derive(Debug, Clone)]
pub struct HexCell {
    pub coord: HexCoordinate,
    pub zone: Zone,
    pub occupant: Option<Piece>,
}

/// The complete cell set for one match.
#[derive(Debug, Clone)]
pub struct Board {
    radius: i32,
    cells: HashMap<HexCoordinate, HexCell>,
}

impl Board {
    /// Builds the full star for the given radius.
    pub fn new(radius: i32) -> Result<Self, BoardError> {
        if radius < 1 {
            return Err(BoardError::InvalidRadius(radius));
        }

        let mut cells = HashMap::new();
        for x in -2 * radius..=2 * radius {
            for y in -2 * radius..=2 * radius {
                let coord = HexCoordinate::new(x, y, -x - y);
                if let Some(zone) = classify(radius, coord) {
                    cells.insert(
                        coord,
                        HexCell {
                            coord,
                            zone,
                            occupant: None,
                        },
                    );
                }
            }
        }

        Ok(Self { radius, cells })
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Exact cell lookup; fails for coordinates outside the star.
    pub fn cell(&self, coord: HexCoordinate) -> Result<&HexCell, BoardError> {
        self.cells
            .get(&coord)
            .ok_or(BoardError::OutsideBoard(coord))
    }

    pub fn try_cell(&self, coord: HexCoordinate) -> Option<&HexCell> {
        self.cells.get(&coord)
    }

    pub(crate) fn cell_mut(
        &mut self,
        coord: HexCoordinate,
    ) -> Result<&mut HexCell, BoardError> {
        self.cells
            .get_mut(&coord)
            .ok_or(BoardError::OutsideBoard(coord))
    }

    /// True iff the two coordinates are direct neighbors.
    pub fn is_adjacent_move(&self, from: HexCoordinate, to: HexCoordinate) -> bool {
        from.distance(to) == 1
    }

    /// If `from` → `to` has jump geometry (cube distance 2 with an even
    /// component-wise delta), returns the cell being jumped over.
    /// Whether that cell actually holds a piece is the caller's check.
    pub fn jump_middle(
        &self,
        from: HexCoordinate,
        to: HexCoordinate,
    ) -> Option<HexCoordinate> {
        if from.distance(to) != 2 {
            return None;
        }
        let delta = to - from;
        if delta.x % 2 != 0 || delta.y % 2 != 0 || delta.z % 2 != 0 {
            return None;
        }
        Some(from + HexCoordinate::new(delta.x / 2, delta.y / 2, delta.z / 2))
    }

    /// All cells of one color's home zone, sorted for deterministic
    /// iteration. Used for initial placement and win checks (a player's
    /// target zone is `color.target()`'s home).
    pub fn zone_cells(&self, color: Color) -> Vec<HexCoordinate> {
        let mut coords: Vec<_> = self
            .cells
            .values()
            .filter(|cell| cell.zone == Zone::Home(color))
            .map(|cell| cell.coord)
            .collect();
        coords.sort();
        coords
    }

    /// Occupied coordinates of one color, sorted, for board snapshots.
    pub fn occupied_cells(&self, color: Color) -> Vec<HexCoordinate> {
        let mut coords: Vec<_> = self
            .cells
            .values()
            .filter(|cell| cell.occupant.map(|p| p.color) == Some(color))
            .map(|cell| cell.coord)
            .collect();
        coords.sort();
        coords
    }
}

/// Classifies a coordinate: `None` if outside the star, otherwise its
/// zone. A cell is central when no cube component exceeds the radius;
/// it belongs to an arm when exactly one component does (bounded by
/// twice the radius), and the dominant axis plus its sign selects the
/// arm's color.
fn classify(radius: i32, coord: HexCoordinate) -> Option<Zone> {
    if !coord.is_valid() {
        return None;
    }

    let components = [coord.x, coord.y, coord.z];
    let over: Vec<usize> = (0..3)
        .filter(|&i| components[i].abs() > radius)
        .collect();

    match over.as_slice() {
        [] => Some(Zone::Center),
        [axis] => {
            let value = components[*axis];
            if value.abs() > 2 * radius {
                return None;
            }
            let color = match (*axis, value > 0) {
                (0, true) => Color::Red,
                (0, false) => Color::Green,
                (1, true) => Color::Blue,
                (1, false) => Color::Yellow,
                (2, true) => Color::Orange,
                (2, false) => Color::Purple,
                _ => unreachable!(),
            };
            Some(Zone::Home(color))
        }
        _ => None,
    }
}
