#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Slot Volley engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots such as [`ShooterView`] and [`FrontRowView`], and
//! respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod color;

pub use color::{ColorCode, ColorToken};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Seats the front supply block of a column into the leftmost empty slot.
    SelectSupply {
        /// Supply column whose front block was selected.
        column: u32,
    },
    /// Seats the front supply block of a column into the empty slot nearest to a point.
    DropSupply {
        /// Supply column whose front block was dragged.
        column: u32,
        /// World position where the block was released.
        position: WorldPoint,
    },
    /// Reports that a shooter finished its placement motion.
    MarkSeated {
        /// Shooter that reached its slot.
        shooter: ShooterId,
    },
    /// Dispatches a projectile from a slot toward a drawn target.
    FireProjectile {
        /// Slot whose shooter fires.
        slot: SlotIndex,
        /// Target the projectile is committed to.
        target: TargetUid,
        /// Column the target occupied when it was drawn.
        column: u32,
    },
    /// Resolves an in-flight projectile.
    ResolveProjectile {
        /// Projectile being resolved.
        projectile: ProjectileId,
        /// How the flight ended.
        arrival: ProjectileArrival,
    },
    /// Releases the slot held by a shooter.
    FreeSlot {
        /// Shooter leaving its slot.
        shooter: ShooterId,
    },
    /// Destroys a shooter after its exit motion completed.
    RetireShooter {
        /// Shooter being destroyed.
        shooter: ShooterId,
    },
    /// Locks three same-color shooters into a merge group.
    BeginMerge {
        /// Members of the merge group in ascending slot order.
        members: [ShooterId; 3],
    },
    /// Collapses the pending merge group into its keeper.
    ResolveMerge,
    /// Places the merge keeper into the slot reserved for it.
    ReseatKeeper,
    /// Declares that the level was lost.
    DeclareFailure,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A level finished loading and every component was reset.
    LevelReset {
        /// Number of targets on the freshly built board.
        total_targets: u32,
        /// Number of slots available to the player.
        slots: u32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Target counters changed.
    TargetsUpdated {
        /// Targets still on the board.
        remaining: u32,
        /// Targets the board was built with.
        total: u32,
    },
    /// A shooter started travelling into a slot.
    ShooterPlaced {
        /// Shooter being placed.
        shooter: ShooterId,
        /// Slot the shooter now occupies.
        slot: SlotIndex,
        /// Color carried by the shooter.
        color: ColorToken,
        /// Ammo carried by the shooter.
        ammo: u32,
        /// Reason the placement happened.
        origin: PlacementOrigin,
        /// Position the motion starts from.
        from: WorldPoint,
        /// Anchor of the destination slot.
        to: WorldPoint,
    },
    /// A placement request could not be honored.
    PlacementRejected {
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// A shooter completed its placement motion and may fire.
    ShooterSeated {
        /// Shooter that became seated.
        shooter: ShooterId,
        /// Slot the shooter sits in.
        slot: SlotIndex,
    },
    /// A projectile left a slot; its target uid is now reserved.
    ProjectileDispatched {
        /// Identifier allocated to the projectile.
        projectile: ProjectileId,
        /// Shooter that fired.
        shooter: ShooterId,
        /// Slot the shooter fired from.
        slot: SlotIndex,
        /// Target the projectile is committed to.
        target: TargetUid,
        /// Column of the target at dispatch.
        column: u32,
        /// Spawn position of the projectile.
        from: WorldPoint,
        /// Position of the target at dispatch.
        to: WorldPoint,
    },
    /// A fire command failed validation and nothing was dispatched.
    FireRejected {
        /// Slot named by the command.
        slot: SlotIndex,
        /// Target named by the command.
        target: TargetUid,
        /// Specific reason the shot was refused.
        reason: FireError,
    },
    /// A shooter spent its last round.
    ShooterDepleted {
        /// Shooter that ran dry.
        shooter: ShooterId,
        /// Slot the shooter still occupies.
        slot: SlotIndex,
    },
    /// A projectile struck the authoritative front cell of its column.
    TargetResolved {
        /// Target that was destroyed.
        target: TargetUid,
        /// Column that collapsed.
        column: u32,
        /// Impact position.
        position: WorldPoint,
        /// Whether a slotted shooter with ammo still has a front target of its color.
        reachable: bool,
    },
    /// A projectile arrived after its target stopped being the front occupant.
    ProjectileStale {
        /// Projectile that missed.
        projectile: ProjectileId,
        /// Target whose reservation was released.
        target: TargetUid,
        /// Whether a slotted shooter with ammo still has a front target of its color.
        reachable: bool,
    },
    /// A projectile exceeded its lifetime before arriving.
    ProjectileExpired {
        /// Projectile that expired.
        projectile: ProjectileId,
        /// Target whose reservation was released.
        target: TargetUid,
        /// Whether a slotted shooter with ammo still has a front target of its color.
        reachable: bool,
    },
    /// A shooter left its slot.
    SlotFreed {
        /// Shooter that left.
        shooter: ShooterId,
        /// Slot that became empty.
        slot: SlotIndex,
    },
    /// A shooter was destroyed.
    ShooterRetired {
        /// Shooter that no longer exists.
        shooter: ShooterId,
    },
    /// Three shooters were locked into a merge group.
    MergeStarted {
        /// Members in ascending original slot order.
        members: [ShooterId; 3],
        /// Shared color of the group.
        color: ColorCode,
        /// Slot held for the keeper.
        reserved_slot: SlotIndex,
    },
    /// The merge group collapsed into its keeper.
    MergeResolved {
        /// Surviving shooter.
        keeper: ShooterId,
        /// Shooters destroyed by the merge.
        absorbed: [ShooterId; 2],
        /// Summed ammo now held by the keeper.
        ammo: u32,
        /// Slot reserved for the keeper.
        slot: SlotIndex,
    },
    /// The merge group lost a member and was dissolved without a keeper.
    MergeAborted {
        /// Slot whose reservation was released.
        reserved_slot: SlotIndex,
        /// Surviving members that were discarded.
        discarded: Vec<ShooterId>,
    },
    /// The board ran out of targets.
    LevelWon,
    /// The level was declared lost.
    LevelFailed,
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// Every slot is occupied or reserved.
    NoEmptySlot,
    /// The supply column has no front block.
    EmptySupplyColumn,
    /// The level already reached a terminal outcome.
    LevelOver,
}

/// Reasons a fire command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireError {
    /// No shooter occupies the slot.
    EmptySlot,
    /// The shooter has not finished its placement motion.
    NotSeated,
    /// The shooter is locked into a merge group.
    MergeLocked,
    /// The shooter has no ammo left.
    OutOfAmmo,
    /// The target is not the front occupant of the column in the shooter's color.
    StaleTarget,
    /// Another projectile already holds the target.
    AlreadyReserved,
}

/// Describes why a shooter entered a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementOrigin {
    /// The player moved a supply block into the slot.
    Supply,
    /// A merge keeper returned to its reserved slot.
    MergeKeeper,
}

/// How a projectile flight ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileArrival {
    /// The projectile reached its destination.
    Arrived,
    /// The projectile outlived its lifetime.
    Expired,
}

/// Terminal outcome of a level instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelOutcome {
    /// The board was cleared.
    Won,
    /// The player ran out of reachable targets with every slot full.
    Failed,
}

/// Unique, never reused identifier of a target cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetUid(u32);

impl TargetUid {
    /// Creates a target identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier assigned to a shooter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShooterId(u32);

impl ShooterId {
    /// Creates a shooter identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier assigned to an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Position of a slot within the ordered slot row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotIndex(u32);

impl SlotIndex {
    /// Creates a slot index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric slot index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Slot index usable for indexing dense slot storage.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell. Row 0 is the front row.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Opaque world-space position handed to and from presentation collaborators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
    z: f32,
}

impl WorldPoint {
    /// Creates a point from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal component.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Depth component.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.z
    }

    /// Squared euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: WorldPoint) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Returns the point offset by `axis` scaled by `amount`.
    #[must_use]
    pub fn offset(self, axis: WorldPoint, amount: f32) -> Self {
        Self::new(
            self.x + axis.x * amount,
            self.y + axis.y * amount,
            self.z + axis.z * amount,
        )
    }

    /// Returns the point scaled to unit length, or the zero point when degenerate.
    #[must_use]
    pub fn normalized(self) -> Self {
        let length = self.distance(WorldPoint::default());
        if length <= f32::EPSILON {
            return WorldPoint::default();
        }
        Self::new(self.x / length, self.y / length, self.z / length)
    }
}

/// Maps grid cells onto world positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// World position of cell (column 0, depth 0).
    pub origin: WorldPoint,
    /// Direction in which column indices grow.
    pub column_axis: WorldPoint,
    /// Direction in which depth grows away from the front.
    pub depth_axis: WorldPoint,
    /// Spacing between adjacent columns.
    pub cell_width: f32,
    /// Spacing between adjacent rows.
    pub cell_depth: f32,
    /// When false, row 0 is laid out at the far edge instead of the origin edge.
    pub row0_is_front: bool,
}

impl BoardGeometry {
    /// Resolves the world position of a cell in a grid with `rows` rows.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord, rows: u32) -> WorldPoint {
        let depth = if self.row0_is_front {
            cell.row()
        } else {
            rows.saturating_sub(1).saturating_sub(cell.row())
        };
        self.origin
            .offset(
                self.column_axis.normalized(),
                cell.column() as f32 * self.cell_width,
            )
            .offset(self.depth_axis.normalized(), depth as f32 * self.cell_depth)
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            origin: WorldPoint::default(),
            column_axis: WorldPoint::new(1.0, 0.0, 0.0),
            depth_axis: WorldPoint::new(0.0, 0.0, 1.0),
            cell_width: 1.5,
            cell_depth: 1.5,
            row0_is_front: true,
        }
    }
}

/// Block waiting in the player's supply grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyBlock {
    /// Color the resulting shooter will carry.
    pub color: ColorToken,
    /// Ammo the resulting shooter will carry.
    pub ammo: u32,
}

/// Declarative description of the target board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    /// Declared number of columns.
    pub columns: u32,
    /// Declared number of rows.
    pub rows: u32,
    /// Cells indexed by row then column; row 0 is the front row.
    pub cells: Vec<Vec<Option<ColorToken>>>,
    /// Placement of the board in world space.
    pub geometry: BoardGeometry,
}

/// Declarative description of the player's supply grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplySpec {
    /// Declared number of columns.
    pub columns: u32,
    /// Declared number of rows.
    pub rows: u32,
    /// Blocks indexed by row then column; row 0 is the selectable row.
    pub cells: Vec<Vec<Option<SupplyBlock>>>,
    /// Placement of the supply grid in world space.
    pub geometry: BoardGeometry,
}

/// Everything required to build one level instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Target board description.
    pub board: BoardSpec,
    /// Supply grid description.
    pub supply: SupplySpec,
    /// Slot anchors ordered left to right.
    pub slots: Vec<WorldPoint>,
}

/// Grid named by a configuration error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridKind {
    /// The target board.
    Targets,
    /// The player's supply grid.
    Supply,
}

impl std::fmt::Display for GridKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Targets => write!(f, "target grid"),
            Self::Supply => write!(f, "supply grid"),
        }
    }
}

/// Malformed level data. Fatal to the load that produced it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A grid declared zero rows or zero columns.
    #[error("{grid} must have at least one row and one column (got {columns}x{rows})")]
    ZeroDimension {
        /// Grid that was malformed.
        grid: GridKind,
        /// Declared columns.
        columns: u32,
        /// Declared rows.
        rows: u32,
    },
    /// The number of row entries differs from the declared row count.
    #[error("{grid} declares {declared} rows but provides {actual}")]
    RowCountMismatch {
        /// Grid that was malformed.
        grid: GridKind,
        /// Declared rows.
        declared: u32,
        /// Rows actually provided.
        actual: usize,
    },
    /// A row holds a different number of cells than the declared column count.
    #[error("{grid} row {row} holds {actual} cells but {declared} columns are declared")]
    ColumnCountMismatch {
        /// Grid that was malformed.
        grid: GridKind,
        /// Offending row.
        row: usize,
        /// Declared columns.
        declared: u32,
        /// Cells actually provided.
        actual: usize,
    },
    /// The level provides no slots.
    #[error("level must provide at least one slot")]
    NoSlots,
}

/// Immutable representation of a shooter used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShooterSnapshot {
    /// Identifier of the shooter.
    pub id: ShooterId,
    /// Color carried by the shooter.
    pub color: ColorToken,
    /// Remaining ammo.
    pub ammo: u32,
    /// Slot the shooter occupies, if any.
    pub slot: Option<SlotIndex>,
    /// Whether the placement motion completed.
    pub seated: bool,
    /// Whether the shooter belongs to a pending merge group.
    pub merge_locked: bool,
}

impl ShooterSnapshot {
    /// Reports whether the shooter may draw targets right now.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.slot.is_some() && self.seated && !self.merge_locked && self.ammo > 0
    }
}

/// Read-only snapshot describing every live shooter.
#[derive(Clone, Debug, Default)]
pub struct ShooterView {
    snapshots: Vec<ShooterSnapshot>,
}

impl ShooterView {
    /// Creates a view ordered by slot index, unslotted shooters last, ties by id.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ShooterSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| (snapshot.slot.is_none(), snapshot.slot, snapshot.id));
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ShooterSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a shooter by identifier.
    #[must_use]
    pub fn get(&self, id: ShooterId) -> Option<&ShooterSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Looks up the shooter occupying a slot.
    #[must_use]
    pub fn in_slot(&self, slot: SlotIndex) -> Option<&ShooterSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.slot == Some(slot))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ShooterSnapshot> {
        self.snapshots
    }
}

/// Front-row cell eligible for targeting.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontTarget {
    /// Identifier of the cell.
    pub uid: TargetUid,
    /// Column the cell fronts.
    pub column: u32,
    /// Color of the cell.
    pub color: ColorToken,
    /// World position of the cell.
    pub position: WorldPoint,
}

/// Read-only snapshot of the unreserved front row.
#[derive(Clone, Debug, Default)]
pub struct FrontRowView {
    targets: Vec<FrontTarget>,
}

impl FrontRowView {
    /// Creates a view ordered by ascending column.
    #[must_use]
    pub fn from_targets(mut targets: Vec<FrontTarget>) -> Self {
        targets.sort_by_key(|target| target.column);
        Self { targets }
    }

    /// Iterator over the front targets in column order.
    pub fn iter(&self) -> impl Iterator<Item = &FrontTarget> {
        self.targets.iter()
    }

    /// Number of eligible front targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Reports whether no front target is eligible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Occupancy state of a single slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Nothing occupies the slot.
    Empty,
    /// A shooter occupies the slot.
    Occupied(ShooterId),
    /// The slot is held for a pending merge keeper.
    ReservedForMerge,
}

/// Immutable representation of a slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotSnapshot {
    /// Position of the slot in the row.
    pub index: SlotIndex,
    /// World anchor of the slot.
    pub anchor: WorldPoint,
    /// Current occupancy.
    pub state: SlotState,
}

/// Read-only snapshot of every slot in index order.
#[derive(Clone, Debug, Default)]
pub struct SlotView {
    snapshots: Vec<SlotSnapshot>,
}

impl SlotView {
    /// Creates a view ordered by slot index.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<SlotSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.index);
        Self { snapshots }
    }

    /// Iterator over the slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &SlotSnapshot> {
        self.snapshots.iter()
    }

    /// Reports whether no slot is empty. Merge reservations count as full.
    #[must_use]
    pub fn all_full(&self) -> bool {
        !self.snapshots.is_empty()
            && self
                .snapshots
                .iter()
                .all(|snapshot| snapshot.state != SlotState::Empty)
    }
}
