//! # Block Registry
//!
//! The immutable catalog of block kinds. Every attribute the generator, the
//! mesh builder and the world consult lives in one [`BlockKind`] record, and
//! the records are stored in a static table indexed by [`BlockType`].
//!
//! ## Texture Atlas Coordinates
//!
//! Atlas coordinates are tile indices into a square-tiled atlas, read left to
//! right and top to bottom. Animated kinds list frame offsets that are added to
//! the per-face base tile.

use super::block_side::BlockSide;
use super::block_type::BlockType;
use super::light::EmittedLight;
use super::BlockTypeSize;

/// Index of a tile in the texture atlas.
pub type AtlasCoord = u16;

/// How a block kind is turned into geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeshStyle {
    /// A unit cube, one quad per visible face.
    Default,
    /// Two crossed quads, for plants.
    Sprite,
    /// A thin post standing in the middle of the cell.
    Torch,
}

/// Immutable description of one block kind.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockKind {
    pub id: BlockType,
    pub name: &'static str,
    pub transparent: bool,
    pub animated: bool,
    pub liquid: bool,
    pub emits_light: bool,
    /// Base atlas tile per face, indexed by `BlockSide as usize`.
    pub textures: [AtlasCoord; 6],
    /// Frame offsets added to the base tile, in playback order.
    pub animation_frames: &'static [AtlasCoord],
    pub mesh_style: MeshStyle,
    pub emitted_light: EmittedLight,
}

impl BlockKind {
    const fn cube(id: BlockType, name: &'static str, tile: AtlasCoord) -> Self {
        BlockKind {
            id,
            name,
            transparent: false,
            animated: false,
            liquid: false,
            emits_light: false,
            textures: [tile; 6],
            animation_frames: &[],
            mesh_style: MeshStyle::Default,
            emitted_light: EmittedLight::NONE,
        }
    }

    const fn faces(mut self, textures: [AtlasCoord; 6]) -> Self {
        self.textures = textures;
        self
    }

    const fn see_through(mut self) -> Self {
        self.transparent = true;
        self
    }

    const fn fluid(mut self) -> Self {
        self.transparent = true;
        self.liquid = true;
        self
    }

    const fn frames(mut self, frames: &'static [AtlasCoord]) -> Self {
        self.animated = true;
        self.animation_frames = frames;
        self
    }

    const fn glowing(mut self, light: EmittedLight) -> Self {
        self.emits_light = true;
        self.emitted_light = light;
        self
    }

    const fn styled(mut self, style: MeshStyle) -> Self {
        self.transparent = true;
        self.mesh_style = style;
        self
    }

    /// The base atlas tile of one face.
    pub fn texture(&self, side: BlockSide) -> AtlasCoord {
        self.textures[side as usize]
    }

    /// The atlas tile to draw for `side` at animation tick `tick`.
    ///
    /// Static kinds always return their base tile.
    pub fn frame_coord(&self, side: BlockSide, tick: u64) -> AtlasCoord {
        let base = self.texture(side);
        if self.animation_frames.is_empty() {
            return base;
        }
        let frame = (animation_phase(tick) % self.animation_frames.len() as u64) as usize;
        base + self.animation_frames[frame]
    }

    pub fn is_air(&self) -> bool {
        self.id == BlockType::Air
    }

    /// Opaque for culling and heightmap purposes.
    pub fn is_opaque(&self) -> bool {
        !self.transparent
    }
}

const FLUID_FRAMES: &[AtlasCoord] = &[0, 1, 2, 3];

/// Ticks each animation frame stays on screen.
pub const ANIMATION_FRAME_TICKS: u64 = 8;

/// The world-wide animation phase at `tick`. Every animated face built in
/// the same phase shows the same frame.
pub fn animation_phase(tick: u64) -> u64 {
    tick / ANIMATION_FRAME_TICKS
}

// [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
static BLOCK_KINDS: [BlockKind; BlockType::COUNT] = [
    BlockKind::cube(BlockType::Air, "air", 0).see_through(),
    BlockKind::cube(BlockType::Stone, "stone", 0),
    BlockKind::cube(BlockType::Dirt, "dirt", 1),
    BlockKind::cube(BlockType::Grass, "grass", 2).faces([2, 2, 1, 3, 2, 2]),
    BlockKind::cube(BlockType::Sand, "sand", 4),
    BlockKind::cube(BlockType::Water, "water", 16)
        .fluid()
        .frames(FLUID_FRAMES),
    BlockKind::cube(BlockType::Glass, "glass", 6).see_through(),
    BlockKind::cube(BlockType::Leaves, "leaves", 7).see_through(),
    BlockKind::cube(BlockType::Log, "log", 8).faces([8, 8, 9, 9, 8, 8]),
    BlockKind::cube(BlockType::Planks, "planks", 10),
    BlockKind::cube(BlockType::CoalOre, "coal_ore", 11),
    BlockKind::cube(BlockType::CopperOre, "copper_ore", 12),
    BlockKind::cube(BlockType::Lava, "lava", 32)
        .fluid()
        .frames(FLUID_FRAMES)
        .glowing(EmittedLight::new(15, 0, 6, 15)),
    BlockKind::cube(BlockType::RedFlower, "red_flower", 13).styled(MeshStyle::Sprite),
    BlockKind::cube(BlockType::YellowFlower, "yellow_flower", 14).styled(MeshStyle::Sprite),
    BlockKind::cube(BlockType::TallGrass, "tall_grass", 15).styled(MeshStyle::Sprite),
    BlockKind::cube(BlockType::Torch, "torch", 20)
        .styled(MeshStyle::Torch)
        .glowing(EmittedLight::new(14, 2, 10, 15)),
    BlockKind::cube(BlockType::Bedrock, "bedrock", 21),
];

/// Looks up the kind record for an identifier.
pub fn get(id: BlockType) -> &'static BlockKind {
    &BLOCK_KINDS[id as usize]
}

/// Looks up the kind record for a stored integer id.
///
/// # Panics
/// Panics if `raw` is not a known block id.
pub fn get_raw(raw: BlockTypeSize) -> &'static BlockKind {
    match BLOCK_KINDS.get(raw as usize) {
        Some(kind) => kind,
        None => panic!("block id {raw} is not registered"),
    }
}

/// Every registered kind, in id order.
pub fn all() -> impl Iterator<Item = &'static BlockKind> {
    BLOCK_KINDS.iter()
}

impl BlockType {
    /// Shorthand for [`get`].
    pub fn kind(self) -> &'static BlockKind {
        get(self)
    }
}
