//! Target board storage, front-row truth and column collapse.

use std::collections::BTreeSet;

use slot_volley_core::{
    BoardGeometry, BoardSpec, CellCoord, ColorCode, ColorToken, ConfigurationError, FireError,
    FrontTarget, GridKind, TargetUid, WorldPoint,
};
use tracing::{debug, error};

use crate::reservations::ReservationSet;

/// Single destructible cell living on the board.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TargetCell {
    pub(crate) uid: TargetUid,
    pub(crate) color: ColorToken,
}

/// Outcome of a successful hit on a front cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ResolvedHit {
    /// Uid of the destroyed cell.
    pub(crate) uid: TargetUid,
    /// World position the cell occupied before collapse.
    pub(crate) position: WorldPoint,
    /// Whether the board holds no cells anymore.
    pub(crate) board_cleared: bool,
}

/// Grid of target cells stored column-major, row 0 nearest to the slots.
#[derive(Debug)]
pub(crate) struct TargetBoard {
    rows: u32,
    columns: Vec<Vec<Option<TargetCell>>>,
    geometry: BoardGeometry,
    reservations: ReservationSet,
    total: u32,
    remaining: u32,
    next_uid: u32,
}

impl TargetBoard {
    /// Creates an empty board whose uid counter starts at 1.
    pub(crate) fn new() -> Self {
        Self {
            rows: 0,
            columns: Vec::new(),
            geometry: BoardGeometry::default(),
            reservations: ReservationSet::new(),
            total: 0,
            remaining: 0,
            next_uid: 1,
        }
    }

    /// Replaces the board with a fresh one built from the spec.
    ///
    /// Validation runs before any mutation, so a rejected spec leaves the
    /// previous board untouched. Uids keep counting up across rebuilds.
    pub(crate) fn build_from_spec(&mut self, spec: &BoardSpec) -> Result<(), ConfigurationError> {
        validate(spec)?;

        let column_count = spec.columns as usize;
        let mut columns: Vec<Vec<Option<TargetCell>>> =
            vec![vec![None; spec.rows as usize]; column_count];
        let mut total = 0_u32;

        for (row, cells) in spec.cells.iter().enumerate() {
            for (column, color) in cells.iter().enumerate() {
                let Some(color) = color else {
                    continue;
                };
                let uid = TargetUid::new(self.next_uid);
                self.next_uid = self.next_uid.saturating_add(1);
                columns[column][row] = Some(TargetCell {
                    uid,
                    color: color.clone(),
                });
                total += 1;
            }
        }

        self.rows = spec.rows;
        self.columns = columns;
        self.geometry = spec.geometry;
        self.reservations.clear();
        self.total = total;
        self.remaining = total;
        debug!(
            columns = spec.columns,
            rows = spec.rows,
            targets = total,
            "target board built"
        );
        Ok(())
    }

    pub(crate) fn total(&self) -> u32 {
        self.total
    }

    pub(crate) fn remaining(&self) -> u32 {
        self.remaining
    }

    pub(crate) fn reservations(&self) -> &ReservationSet {
        &self.reservations
    }

    /// Nearest occupied row of the column together with its cell.
    fn front_cell(&self, column: u32) -> Option<(u32, &TargetCell)> {
        let cells = self.columns.get(column as usize)?;
        cells
            .iter()
            .enumerate()
            .find_map(|(row, cell)| cell.as_ref().map(|cell| (row as u32, cell)))
    }

    fn position(&self, column: u32, row: u32) -> WorldPoint {
        self.geometry
            .cell_to_world(CellCoord::new(column, row), self.rows)
    }

    /// Front occupant of every column, reserved or not, in column order.
    pub(crate) fn front_occupants(&self) -> impl Iterator<Item = FrontTarget> + '_ {
        (0..self.columns.len() as u32).filter_map(move |column| {
            self.front_cell(column).map(|(row, cell)| FrontTarget {
                uid: cell.uid,
                column,
                color: cell.color.clone(),
                position: self.position(column, row),
            })
        })
    }

    /// Front occupants whose uid is not claimed by a projectile.
    pub(crate) fn front_row(&self) -> Vec<FrontTarget> {
        self.front_occupants()
            .filter(|target| !self.reservations.contains(target.uid))
            .collect()
    }

    /// Reports whether any front occupant carries one of `colors`. Reserved cells count.
    pub(crate) fn has_any_front_for_colors(&self, colors: &BTreeSet<ColorCode>) -> bool {
        !colors.is_empty()
            && self
                .front_occupants()
                .any(|target| target.color.code().is_some_and(|code| colors.contains(&code)))
    }

    /// Reports whether `uid` is the front occupant of `column` and matches `color`.
    pub(crate) fn is_front_uid(&self, column: u32, uid: TargetUid, color: &ColorToken) -> bool {
        self.front_cell(column)
            .is_some_and(|(_, cell)| cell.uid == uid && color.matches(&cell.color))
    }

    /// Validates that a projectile of `color` may claim `uid` in `column`.
    pub(crate) fn check_drawable(
        &self,
        column: u32,
        uid: TargetUid,
        color: &ColorToken,
    ) -> Result<(), FireError> {
        if self.reservations.contains(uid) {
            return Err(FireError::AlreadyReserved);
        }
        if !self.is_front_uid(column, uid, color) {
            return Err(FireError::StaleTarget);
        }
        Ok(())
    }

    /// Claims the uid for an in-flight projectile.
    pub(crate) fn reserve_uid(&mut self, uid: TargetUid) -> bool {
        let reserved = self.reservations.reserve(uid);
        if !reserved {
            error!(uid = uid.get(), "target uid reserved twice");
            debug_assert!(reserved, "target uid {} reserved twice", uid.get());
        }
        reserved
    }

    /// Releases the uid. Idempotent.
    pub(crate) fn release_uid(&mut self, uid: TargetUid) {
        let _ = self.reservations.release(uid);
    }

    /// Destroys the front cell of `column` when it matches `color`, then
    /// collapses the column.
    pub(crate) fn resolve_hit(&mut self, column: u32, color: &ColorToken) -> Option<ResolvedHit> {
        let (row, uid) = {
            let (row, cell) = self.front_cell(column)?;
            if !color.matches(&cell.color) {
                return None;
            }
            (row, cell.uid)
        };
        let position = self.position(column, row);

        self.release_uid(uid);
        let cells = self.columns.get_mut(column as usize)?;
        cells[row as usize] = None;
        collapse(cells);
        self.remaining = self.remaining.saturating_sub(1);

        debug!(
            uid = uid.get(),
            column,
            remaining = self.remaining,
            "target resolved"
        );
        Some(ResolvedHit {
            uid,
            position,
            board_cleared: self.remaining == 0,
        })
    }
}

/// Packs surviving cells toward row 0 while keeping their relative order.
fn collapse(cells: &mut [Option<TargetCell>]) {
    let mut write = 0;
    for read in 0..cells.len() {
        if cells[read].is_some() {
            if read != write {
                cells[write] = cells[read].take();
            }
            write += 1;
        }
    }
}

fn validate(spec: &BoardSpec) -> Result<(), ConfigurationError> {
    if spec.columns == 0 || spec.rows == 0 {
        return Err(ConfigurationError::ZeroDimension {
            grid: GridKind::Targets,
            columns: spec.columns,
            rows: spec.rows,
        });
    }
    if spec.cells.len() != spec.rows as usize {
        return Err(ConfigurationError::RowCountMismatch {
            grid: GridKind::Targets,
            declared: spec.rows,
            actual: spec.cells.len(),
        });
    }
    if let Some((row, cells)) = spec
        .cells
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != spec.columns as usize)
    {
        return Err(ConfigurationError::ColumnCountMismatch {
            grid: GridKind::Targets,
            row,
            declared: spec.columns,
            actual: cells.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> ColorToken {
        ColorToken::from(ColorCode::Red)
    }

    fn green() -> ColorToken {
        ColorToken::from(ColorCode::Green)
    }

    fn spec(rows: Vec<Vec<Option<ColorToken>>>) -> BoardSpec {
        BoardSpec {
            columns: rows.first().map_or(0, |row| row.len() as u32),
            rows: rows.len() as u32,
            cells: rows,
            geometry: BoardGeometry::default(),
        }
    }

    #[test]
    fn uids_are_unique_and_survive_rebuilds() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![vec![Some(red()), Some(green())]]))
            .expect("valid board");
        let first: Vec<u32> = board.front_row().iter().map(|t| t.uid.get()).collect();
        assert_eq!(first, vec![1, 2]);

        board
            .build_from_spec(&spec(vec![vec![Some(red()), Some(green())]]))
            .expect("valid board");
        let second: Vec<u32> = board.front_row().iter().map(|t| t.uid.get()).collect();
        assert_eq!(second, vec![3, 4]);
    }

    #[test]
    fn rejected_spec_leaves_previous_board() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![vec![Some(red())]]))
            .expect("valid board");

        let mut broken = spec(vec![vec![Some(red()), None]]);
        broken.rows = 2;
        let error = board.build_from_spec(&broken).expect_err("row mismatch");
        assert_eq!(
            error,
            ConfigurationError::RowCountMismatch {
                grid: GridKind::Targets,
                declared: 2,
                actual: 1,
            }
        );
        assert_eq!(board.total(), 1);
        assert_eq!(board.remaining(), 1);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut board = TargetBoard::new();
        let error = board.build_from_spec(&spec(Vec::new())).expect_err("empty");
        assert!(matches!(error, ConfigurationError::ZeroDimension { .. }));
    }

    #[test]
    fn reserved_fronts_are_hidden_from_front_row_but_count_for_colors() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![vec![Some(red()), Some(green())]]))
            .expect("valid board");
        assert!(board.reserve_uid(TargetUid::new(1)));

        let front: Vec<u32> = board.front_row().iter().map(|t| t.column).collect();
        assert_eq!(front, vec![1]);
        assert!(board.has_any_front_for_colors(&BTreeSet::from([ColorCode::Red])));
        assert!(board.has_any_front_for_colors(&BTreeSet::from([
            ColorCode::Blue,
            ColorCode::Green
        ])));
        assert!(!board.has_any_front_for_colors(&BTreeSet::from([ColorCode::Blue])));
        assert!(!board.has_any_front_for_colors(&BTreeSet::new()));
        assert_eq!(
            board.check_drawable(0, TargetUid::new(1), &red()),
            Err(FireError::AlreadyReserved)
        );
    }

    #[test]
    fn hit_collapses_column_and_closes_gaps() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![
                vec![Some(red())],
                vec![None],
                vec![Some(green())],
            ]))
            .expect("valid board");

        let hit = board.resolve_hit(0, &red()).expect("front matches");
        assert_eq!(hit.uid, TargetUid::new(1));
        assert!(!hit.board_cleared);

        let front = board.front_row();
        assert_eq!(front.len(), 1);
        assert_eq!(front[0].uid, TargetUid::new(2));
        assert_eq!(front[0].position, WorldPoint::new(0.0, 0.0, 0.0));
        assert!(board.is_front_uid(0, TargetUid::new(2), &green()));
    }

    #[test]
    fn wrong_color_hit_is_refused() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![vec![Some(red())]]))
            .expect("valid board");
        assert!(board.resolve_hit(0, &green()).is_none());
        assert_eq!(board.remaining(), 1);

        let hit = board.resolve_hit(0, &red()).expect("front matches");
        assert!(hit.board_cleared);
        assert!(board.resolve_hit(0, &red()).is_none());
    }

    #[test]
    fn resolving_a_hit_releases_its_reservation() {
        let mut board = TargetBoard::new();
        board
            .build_from_spec(&spec(vec![vec![Some(red())], vec![Some(red())]]))
            .expect("valid board");
        assert!(board.reserve_uid(TargetUid::new(1)));
        let _ = board.resolve_hit(0, &red()).expect("front matches");
        assert_eq!(board.reservations().len(), 0);
    }
}
