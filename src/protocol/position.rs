use serde::{Deserialize, Serialize};
use strum::FromRepr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn chunk(self) -> ChunkPosition {
        ChunkPosition {
            x: self.x.div_euclid(16),
            z: self.z.div_euclid(16),
        }
    }

    /// Packs into one long: 26 bits of x, 26 bits of z, 12 bits of y.
    pub fn pack(self) -> i64 {
        (i64::from(self.x) & 0x3FF_FFFF) << 38
            | (i64::from(self.z) & 0x3FF_FFFF) << 12
            | (i64::from(self.y) & 0xFFF)
    }

    pub fn unpack(value: i64) -> Self {
        Self {
            x: (value >> 38) as i32,
            y: (value << 52 >> 52) as i32,
            z: (value << 26 >> 38) as i32,
        }
    }

    pub fn offset(self, face: BlockFace) -> Self {
        let (dx, dy, dz) = face.normal();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// One of the six faces of a block, in wire ordinal order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr)]
#[repr(u8)]
pub enum BlockFace {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl BlockFace {
    pub fn normal(self) -> (i32, i32, i32) {
        match self {
            BlockFace::Down => (0, -1, 0),
            BlockFace::Up => (0, 1, 0),
            BlockFace::North => (0, 0, -1),
            BlockFace::South => (0, 0, 1),
            BlockFace::West => (-1, 0, 0),
            BlockFace::East => (1, 0, 0),
        }
    }
}

/// Result of a ray cast against a block: the block hit, the face it
/// entered through and the exact hit location in world space.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRayHit {
    pub position: BlockPosition,
    pub face: BlockFace,
    pub location: [f64; 3],
    pub inside: bool,
}

impl BlockRayHit {
    /// The hit location relative to the block's minimum corner, as
    /// carried on the wire.
    pub fn cursor(&self) -> [f32; 3] {
        let BlockPosition { x, y, z } = self.position;
        [
            (self.location[0] - f64::from(x)) as f32,
            (self.location[1] - f64::from(y)) as f32,
            (self.location[2] - f64::from(z)) as f32,
        ]
    }

    pub fn from_cursor(position: BlockPosition, face: BlockFace, cursor: [f32; 3], inside: bool) -> Self {
        Self {
            position,
            face,
            location: [
                f64::from(position.x) + f64::from(cursor[0]),
                f64::from(position.y) + f64::from(cursor[1]),
                f64::from(position.z) + f64::from(cursor[2]),
            ],
            inside,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_keeps_signs() {
        for pos in [
            BlockPosition::new(0, 0, 0),
            BlockPosition::new(-1, -1, -1),
            BlockPosition::new(33_554_431, 2047, -33_554_432),
            BlockPosition::new(-30_000_000, -64, 29_999_999),
        ] {
            assert_eq!(BlockPosition::unpack(pos.pack()), pos);
        }
    }

    #[test]
    fn chunk_rounds_down() {
        assert_eq!(
            BlockPosition::new(-1, 70, 17).chunk(),
            ChunkPosition { x: -1, z: 1 }
        );
    }
}
