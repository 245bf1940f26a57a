//! The player's grid of shooter blocks.

use slot_volley_core::{
    BoardGeometry, CellCoord, ConfigurationError, GridKind, SupplyBlock, SupplySpec, WorldPoint,
};

/// Supply blocks stored column-major; row 0 is the only selectable row.
#[derive(Debug, Default)]
pub(crate) struct SupplyGrid {
    rows: u32,
    columns: Vec<Vec<Option<SupplyBlock>>>,
    geometry: BoardGeometry,
}

impl SupplyGrid {
    /// Builds a supply grid, rejecting malformed specs without side effects.
    pub(crate) fn from_spec(spec: &SupplySpec) -> Result<Self, ConfigurationError> {
        if spec.columns == 0 || spec.rows == 0 {
            return Err(ConfigurationError::ZeroDimension {
                grid: GridKind::Supply,
                columns: spec.columns,
                rows: spec.rows,
            });
        }
        if spec.cells.len() != spec.rows as usize {
            return Err(ConfigurationError::RowCountMismatch {
                grid: GridKind::Supply,
                declared: spec.rows,
                actual: spec.cells.len(),
            });
        }

        let mut columns = vec![vec![None; spec.rows as usize]; spec.columns as usize];
        for (row, blocks) in spec.cells.iter().enumerate() {
            if blocks.len() != spec.columns as usize {
                return Err(ConfigurationError::ColumnCountMismatch {
                    grid: GridKind::Supply,
                    row,
                    declared: spec.columns,
                    actual: blocks.len(),
                });
            }
            for (column, block) in blocks.iter().enumerate() {
                columns[column][row] = block.clone();
            }
        }

        Ok(Self {
            rows: spec.rows,
            columns,
            geometry: spec.geometry,
        })
    }

    pub(crate) fn column_count(&self) -> u32 {
        self.columns.len() as u32
    }

    /// Selectable block of the column.
    pub(crate) fn front(&self, column: u32) -> Option<&SupplyBlock> {
        self.columns.get(column as usize)?.first()?.as_ref()
    }

    /// World position of the selectable cell of the column.
    pub(crate) fn front_position(&self, column: u32) -> WorldPoint {
        self.geometry
            .cell_to_world(CellCoord::new(column, 0), self.rows)
    }

    /// Removes the selectable block and moves every block of the column one row forward.
    pub(crate) fn detach_front(&mut self, column: u32) -> Option<SupplyBlock> {
        let cells = self.columns.get_mut(column as usize)?;
        let block = cells.first_mut()?.take()?;
        cells.rotate_left(1);
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::{ColorCode, ColorToken};

    fn block(color: ColorCode, ammo: u32) -> Option<SupplyBlock> {
        Some(SupplyBlock {
            color: ColorToken::from(color),
            ammo,
        })
    }

    #[test]
    fn detaching_shifts_the_column_forward() {
        let spec = SupplySpec {
            columns: 2,
            rows: 3,
            cells: vec![
                vec![block(ColorCode::Red, 3), block(ColorCode::Blue, 1)],
                vec![block(ColorCode::Green, 5), block(ColorCode::Blue, 2)],
                vec![None, None],
            ],
            geometry: BoardGeometry::default(),
        };
        let mut grid = SupplyGrid::from_spec(&spec).expect("valid supply");

        assert_eq!(grid.detach_front(0), block(ColorCode::Red, 3));
        assert_eq!(grid.front(0), block(ColorCode::Green, 5).as_ref());
        assert_eq!(grid.detach_front(0), block(ColorCode::Green, 5));
        assert_eq!(grid.detach_front(0), None);
        assert_eq!(grid.front(1).map(|b| b.ammo), Some(1));
        assert_eq!(grid.column_count(), 2);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let spec = SupplySpec {
            columns: 2,
            rows: 1,
            cells: vec![vec![block(ColorCode::Red, 1)]],
            geometry: BoardGeometry::default(),
        };
        let error = SupplyGrid::from_spec(&spec).expect_err("ragged");
        assert_eq!(
            error,
            ConfigurationError::ColumnCountMismatch {
                grid: GridKind::Supply,
                row: 0,
                declared: 2,
                actual: 1,
            }
        );
    }
}
