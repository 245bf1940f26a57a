//! TOML level files.
//!
//! A level file describes the target board and the supply grid as rows of
//! whitespace-separated color tokens, the way level designers type them:
//!
//! ```toml
//! name = "Warmup"
//!
//! [targets]
//! columns = 3
//! rows = 2
//! id_rows = ["R R R", "G . G"]
//!
//! [supply]
//! columns = 2
//! rows = 1
//! id_rows = ["R G"]
//! ammo_rows = ["3-2"]
//!
//! [slots]
//! count = 5
//! ```

use std::{fs, io, path::Path};

use serde::Deserialize;
use slot_volley_core::{
    BoardGeometry, BoardSpec, ColorToken, ConfigurationError, GridKind, LevelSpec, SupplyBlock,
    SupplySpec, WorldPoint,
};
use thiserror::Error;
use tracing::warn;

/// Characters folded into a plain space before target rows are split.
const EXOTIC_SPACES: [char; 17] = [
    '\u{00A0}', '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}',
    '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{202F}', '\u{205F}', '\u{3000}',
    '\u{200B}',
];

/// Token marking an empty cell.
const EMPTY_CELL: &str = ".";

/// Failure to turn a level file into a [`LevelSpec`].
#[derive(Debug, Error)]
pub enum LevelFileError {
    /// The file could not be read.
    #[error("failed to read level file")]
    Io(#[from] io::Error),
    /// The file is not valid level TOML.
    #[error("failed to parse level toml")]
    Toml(#[from] toml::de::Error),
    /// The file parsed but describes an impossible level.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Deserialized form of a level file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelFile {
    /// Display name; defaults to the file stem when loaded from disk.
    #[serde(default)]
    pub name: Option<String>,
    /// Target board section.
    pub targets: TargetSection,
    /// Supply grid section.
    pub supply: SupplySection,
    /// Slot row section.
    #[serde(default)]
    pub slots: SlotSection,
}

/// `[targets]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    /// Declared column count. Rows are padded or truncated to it.
    pub columns: u32,
    /// Declared row count; must equal the number of `id_rows`.
    pub rows: u32,
    /// Color tokens per row, front row first.
    pub id_rows: Vec<String>,
    /// World placement of the board.
    #[serde(default)]
    pub geometry: GeometrySection,
}

/// `[supply]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplySection {
    /// Declared column count; every row must provide exactly this many tokens.
    pub columns: u32,
    /// Declared row count.
    pub rows: u32,
    /// Color tokens per row, selectable row first.
    pub id_rows: Vec<String>,
    /// Ammo per row, one entry per id token.
    pub ammo_rows: Vec<String>,
    /// Separator tried when an id row contains no whitespace.
    #[serde(default = "default_id_separator")]
    pub id_separator: char,
    /// Separator between ammo values.
    #[serde(default = "default_ammo_separator")]
    pub ammo_separator: char,
    /// World placement of the supply grid.
    #[serde(default = "supply_geometry")]
    pub geometry: GeometrySection,
}

/// `[slots]` section. Explicit anchors win over the evenly spaced row.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlotSection {
    /// Number of evenly spaced slots.
    pub count: u32,
    /// Anchor of the leftmost slot.
    pub origin: [f32; 3],
    /// Offset between neighbouring slots.
    pub spacing: [f32; 3],
    /// Explicit anchors, left to right.
    pub anchors: Option<Vec<[f32; 3]>>,
}

impl Default for SlotSection {
    fn default() -> Self {
        Self {
            count: 5,
            origin: [0.0, 0.0, -3.0],
            spacing: [1.5, 0.0, 0.0],
            anchors: None,
        }
    }
}

impl SlotSection {
    fn anchors(&self) -> Vec<WorldPoint> {
        if let Some(anchors) = &self.anchors {
            return anchors.iter().copied().map(point).collect();
        }
        let origin = point(self.origin);
        let step = point(self.spacing);
        (0..self.count)
            .map(|index| {
                let index = index as f32;
                WorldPoint::new(
                    origin.x() + step.x() * index,
                    origin.y() + step.y() * index,
                    origin.z() + step.z() * index,
                )
            })
            .collect()
    }
}

/// Grid placement in world space.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometrySection {
    /// World position of column 0 at the front edge.
    pub origin: [f32; 3],
    /// Direction of growing column indices.
    pub column_axis: [f32; 3],
    /// Direction away from the front.
    pub depth_axis: [f32; 3],
    /// Column spacing.
    pub cell_width: f32,
    /// Row spacing.
    pub cell_depth: f32,
    /// Whether row 0 sits at the origin edge.
    pub row0_is_front: bool,
}

impl Default for GeometrySection {
    fn default() -> Self {
        let geometry = BoardGeometry::default();
        Self {
            origin: coords(geometry.origin),
            column_axis: coords(geometry.column_axis),
            depth_axis: coords(geometry.depth_axis),
            cell_width: geometry.cell_width,
            cell_depth: geometry.cell_depth,
            row0_is_front: geometry.row0_is_front,
        }
    }
}

impl From<&GeometrySection> for BoardGeometry {
    fn from(section: &GeometrySection) -> Self {
        Self {
            origin: point(section.origin),
            column_axis: point(section.column_axis),
            depth_axis: point(section.depth_axis),
            cell_width: section.cell_width,
            cell_depth: section.cell_depth,
            row0_is_front: section.row0_is_front,
        }
    }
}

fn default_id_separator() -> char {
    ' '
}

fn default_ammo_separator() -> char {
    '-'
}

fn supply_geometry() -> GeometrySection {
    GeometrySection {
        origin: [0.0, 0.0, -6.0],
        depth_axis: [0.0, 0.0, -1.0],
        ..GeometrySection::default()
    }
}

fn point([x, y, z]: [f32; 3]) -> WorldPoint {
    WorldPoint::new(x, y, z)
}

fn coords(point: WorldPoint) -> [f32; 3] {
    [point.x(), point.y(), point.z()]
}

impl LevelFile {
    /// Parses level TOML.
    pub fn from_toml(contents: &str) -> Result<Self, LevelFileError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a level file, naming it after the file stem when unnamed.
    pub fn read(path: &Path) -> Result<Self, LevelFileError> {
        let contents = fs::read_to_string(path)?;
        let mut file = Self::from_toml(&contents)?;
        if file.name.is_none() {
            file.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        Ok(file)
    }

    /// Tokenizes every row into a validated level description.
    pub fn to_spec(&self) -> Result<LevelSpec, LevelFileError> {
        let board = self.targets.to_spec()?;
        let supply = self.supply.to_spec()?;
        let slots = self.slots.anchors();
        if slots.is_empty() {
            return Err(ConfigurationError::NoSlots.into());
        }
        Ok(LevelSpec {
            board,
            supply,
            slots,
        })
    }
}

impl TargetSection {
    fn to_spec(&self) -> Result<BoardSpec, ConfigurationError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigurationError::ZeroDimension {
                grid: GridKind::Targets,
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.id_rows.len() != self.rows as usize {
            return Err(ConfigurationError::RowCountMismatch {
                grid: GridKind::Targets,
                declared: self.rows,
                actual: self.id_rows.len(),
            });
        }

        let width = self.columns as usize;
        let cells = self
            .id_rows
            .iter()
            .map(|row| {
                let mut tokens = target_tokens(row);
                tokens.resize(width, None);
                tokens
            })
            .collect();

        Ok(BoardSpec {
            columns: self.columns,
            rows: self.rows,
            cells,
            geometry: BoardGeometry::from(&self.geometry),
        })
    }
}

impl SupplySection {
    fn to_spec(&self) -> Result<SupplySpec, ConfigurationError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigurationError::ZeroDimension {
                grid: GridKind::Supply,
                columns: self.columns,
                rows: self.rows,
            });
        }
        for provided in [self.id_rows.len(), self.ammo_rows.len()] {
            if provided != self.rows as usize {
                return Err(ConfigurationError::RowCountMismatch {
                    grid: GridKind::Supply,
                    declared: self.rows,
                    actual: provided,
                });
            }
        }

        let mut cells = Vec::with_capacity(self.rows as usize);
        for (row, (ids, ammo)) in self.id_rows.iter().zip(&self.ammo_rows).enumerate() {
            let ids = split_ids(ids, self.id_separator);
            let ammo = split_ammo(ammo, self.ammo_separator);
            for actual in [ids.len(), ammo.len()] {
                if actual != self.columns as usize {
                    return Err(ConfigurationError::ColumnCountMismatch {
                        grid: GridKind::Supply,
                        row,
                        declared: self.columns,
                        actual,
                    });
                }
            }
            cells.push(
                ids.into_iter()
                    .zip(ammo)
                    .map(|(id, ammo)| {
                        cell_token(&id).map(|color| SupplyBlock { color, ammo })
                    })
                    .collect(),
            );
        }

        Ok(SupplySpec {
            columns: self.columns,
            rows: self.rows,
            cells,
            geometry: BoardGeometry::from(&self.geometry),
        })
    }
}

/// Splits a target row. Blank rows are entirely empty.
fn target_tokens(row: &str) -> Vec<Option<ColorToken>> {
    let normalized: String = row
        .chars()
        .map(|ch| {
            if EXOTIC_SPACES.contains(&ch) || matches!(ch, ',' | '|' | ';') {
                ' '
            } else {
                ch
            }
        })
        .collect();
    normalized.split_whitespace().map(cell_token).collect()
}

fn split_ids(row: &str, separator: char) -> Vec<String> {
    let tokens: Vec<String> = row.split_whitespace().map(str::to_owned).collect();
    if tokens.len() > 1 || separator.is_whitespace() {
        return tokens;
    }
    row.split(separator)
        .map(|token| token.trim().to_owned())
        .collect()
}

fn split_ammo(row: &str, separator: char) -> Vec<u32> {
    row.split(separator)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<i64>() {
            Ok(value) => value.clamp(0, i64::from(u32::MAX)) as u32,
            Err(_) => {
                warn!(token, "unreadable ammo value, using 0");
                0
            }
        })
        .collect()
}

fn cell_token(raw: &str) -> Option<ColorToken> {
    let trimmed = raw.trim();
    if trimmed == EMPTY_CELL {
        return None;
    }
    ColorToken::parse(trimmed)
}
