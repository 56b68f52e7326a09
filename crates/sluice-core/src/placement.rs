use serde::{Deserialize, Serialize};

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The position `distance` blocks away in `facing`.
    pub fn relative(self, facing: Facing, distance: i32) -> Self {
        let (dx, dz) = facing.step();
        Self {
            x: self.x + dx * distance,
            y: self.y,
            z: self.z + dz * distance,
        }
    }

    pub fn above(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub fn below(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }
}

/// Horizontal direction a station's outlet points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    North,
    South,
    East,
    West,
}

impl Facing {
    /// Unit step on the (x, z) plane. North is -z.
    fn step(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::South => (0, 1),
            Facing::East => (1, 0),
            Facing::West => (-1, 0),
        }
    }
}

/// Where a station sits and which way it drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub pos: BlockPos,
    pub facing: Facing,
}

impl Placement {
    pub fn new(pos: BlockPos, facing: Facing) -> Self {
        Self { pos, facing }
    }

    /// Block where dropped items appear.
    pub fn outlet(&self) -> BlockPos {
        self.pos.relative(self.facing, 1)
    }

    /// Block probed for an output container.
    pub fn output_container(&self) -> BlockPos {
        self.pos.relative(self.facing, 2)
    }
}
