//! # World Module
//!
//! This module provides the `World` struct which owns the loaded chunks and
//! routes every block access by world position to the right one.
//!
//! ## Architecture
//!
//! Only chunks inside the active region are kept in memory (see
//! [`super::streaming`]). Block writes to chunks that are not loaded, or are
//! still generating on a worker, are stored as deferred edits and replayed
//! when the chunk is generated. Deferred edits are kept until their chunk
//! loads, however far away the region moves.
//!
//! Decoration writes that a chunk spills into a neighbor are kept as well,
//! keyed by both chunks, so a neighbor that is unloaded and generated again
//! receives the same spill.
//!
//! ## Heightmaps and Sunlight
//!
//! One heightmap per chunk column tracks the highest opaque block of every
//! block column. Cells above it receive full sunlight; edits that move the
//! surface relight the column in every loaded chunk.
//!
//! ## Performance Considerations
//!
//! - Chunk lookup is O(1) using a hash map keyed by chunk offset
//! - Edits touch at most the edited chunk, its face neighbors and one column

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use cgmath::{InnerSpace, Point2, Point3, Vector3};

use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::light::{EmittedLight, PackedLight, MAX_LIGHT_LEVEL};
use super::block::BlockCell;
use super::chunk::{Chunk, ChunkDimensions};
use super::generation::{PendingWrite, WorldGenerator, WriteMode};
use super::heightmap::Heightmap;
use super::streaming::{ActiveRegion, FrameStats, WorkBudget};
use crate::engine_state::buffer_state::BufferHandle;
use crate::engine_state::config::EngineConfig;
use crate::engine_state::rendering::meshing::CellSource;
use crate::engine_state::task_management::TaskManager;

/// Represents the voxel world: the loaded chunks around the viewer plus
/// everything needed to stream them.
pub struct World {
    pub(super) generator: Arc<WorldGenerator>,
    pub(super) dimensions: ChunkDimensions,
    /// Loaded chunks by chunk offset.
    pub(super) chunks: HashMap<Point3<i32>, Chunk>,
    /// Heightmaps by chunk column `(x, z)`.
    pub(super) heightmaps: HashMap<Point2<i32>, Heightmap>,
    /// Writes waiting for their chunk to be generated, in arrival order.
    pub(super) deferred_edits: HashMap<Point3<i32>, Vec<PendingWrite>>,
    /// Spilled decoration writes by target chunk, then by source chunk
    /// `(x, y, z)`.
    pub(super) spilled_writes: HashMap<Point3<i32>, BTreeMap<(i32, i32, i32), Vec<PendingWrite>>>,
    pub(super) region: ActiveRegion,
    pub(super) center: Option<Point3<i32>>,
    pub(super) load_queue: VecDeque<Point3<i32>>,
    /// Offsets whose chunk is on a worker.
    pub(super) generating: HashSet<Point3<i32>>,
    pub(super) load_budget: WorkBudget,
    pub(super) mesh_budget: WorkBudget,
    pub(super) tasks: Option<TaskManager>,
    /// Uploads of unloaded chunks, freed on the next meshing pass.
    pub(super) pending_releases: Vec<BufferHandle>,
    pub(super) persist_face_lists: bool,
    pub(super) resort_distance: f32,
    pub(super) stats: FrameStats,
}

/// The block a ray hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    pub position: Point3<i32>,
    /// Normal of the face the ray entered through; zero if the ray started
    /// inside the block.
    pub normal: Vector3<i32>,
    pub block_type: BlockType,
    pub distance: f32,
}

impl World {
    /// Creates an empty world. Nothing is loaded until a center is set.
    pub fn new(config: &EngineConfig) -> Self {
        let dimensions = config.chunk_size;
        let magnitude = config.region_magnitude.as_vector();
        let tasks = (config.worker_threads > 0).then(|| TaskManager::new(config.worker_threads));
        World {
            generator: Arc::new(WorldGenerator::new(
                config.seed,
                config.water_level,
                dimensions,
            )),
            dimensions,
            chunks: HashMap::new(),
            heightmaps: HashMap::new(),
            deferred_edits: HashMap::new(),
            spilled_writes: HashMap::new(),
            region: ActiveRegion::centered_on(Point3::new(0, 0, 0), magnitude),
            center: None,
            load_queue: VecDeque::new(),
            generating: HashSet::new(),
            load_budget: WorkBudget::new(config.load_budget),
            mesh_budget: WorkBudget::new(config.mesh_budget),
            tasks,
            pending_releases: Vec::new(),
            persist_face_lists: config.persist_face_lists,
            resort_distance: config.resort_distance,
            stats: FrameStats::default(),
        }
    }

    pub fn generator(&self) -> &WorldGenerator {
        &self.generator
    }

    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    pub fn chunk(&self, offset: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&offset)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn heightmap(&self, column: Point2<i32>) -> Option<&Heightmap> {
        self.heightmaps.get(&column)
    }

    /// The recorded surface height of a world block column, if its chunk
    /// column has a heightmap.
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        let (column, local) = self.split_column(x, z);
        self.heightmaps
            .get(&column)
            .and_then(|heightmap| heightmap.known(local.x, local.y))
    }

    /// Writes queued for a chunk that is not loaded.
    pub fn deferred_edits(&self, offset: Point3<i32>) -> &[PendingWrite] {
        self.deferred_edits
            .get(&offset)
            .map_or(&[], |edits| edits.as_slice())
    }

    pub fn deferred_edit_count(&self) -> usize {
        self.deferred_edits.values().map(Vec::len).sum()
    }

    /// Decoration writes other chunks spilled into `offset`, in replay order.
    pub fn spilled_writes(&self, offset: Point3<i32>) -> impl Iterator<Item = &PendingWrite> {
        self.spilled_writes
            .get(&offset)
            .into_iter()
            .flat_map(|sources| sources.values().flatten())
    }

    fn split_column(&self, x: i32, z: i32) -> (Point2<i32>, Point2<usize>) {
        let (offset, local) = self.dimensions.split_world_position(Point3::new(x, 0, z));
        (
            Point2::new(offset.x, offset.z),
            Point2::new(local.x, local.z),
        )
    }

    /// The cell at a world position, or `None` if its chunk is not loaded.
    pub fn cell(&self, world: Point3<i32>) -> Option<BlockCell> {
        let (offset, local) = self.dimensions.split_world_position(world);
        self.chunks
            .get(&offset)
            .map(|chunk| chunk.cell(local.x, local.y, local.z))
    }

    /// The block at a world position.
    ///
    /// An unloaded position reads as the last unconditional edit deferred
    /// for it, or air. Conditional writes are not reported since the terrain
    /// they depend on does not exist yet.
    pub fn block_id(&self, world: Point3<i32>) -> BlockType {
        if let Some(cell) = self.cell(world) {
            return cell.block_type;
        }
        let (offset, _) = self.dimensions.split_world_position(world);
        self.deferred_edits(offset)
            .iter()
            .rev()
            .find(|edit| edit.position == world && edit.mode == WriteMode::Always)
            .map_or(BlockType::Air, |edit| edit.block_type)
    }

    /// Places a block at a world position.
    ///
    /// On a loaded chunk the cell is replaced, the chunk and any loaded
    /// neighbor sharing the touched boundary are marked dirty, and the column
    /// heightmap and sunlight are updated. Otherwise the write is deferred
    /// until the chunk is generated.
    pub fn set_block_id(&mut self, world: Point3<i32>, block_type: BlockType) {
        let (offset, local) = self.dimensions.split_world_position(world);
        let Some(chunk) = self.chunks.get_mut(&offset) else {
            log::trace!("Deferring {block_type:?} at {world:?} until chunk {offset:?} loads");
            self.deferred_edits.entry(offset).or_default().push(PendingWrite::new(
                world,
                block_type,
                WriteMode::Always,
            ));
            return;
        };

        let previous = chunk.cell(local.x, local.y, local.z);
        let kind = block_type.kind();
        let light = if kind.emits_light {
            previous.light.with_emitted(kind.emitted_light)
        } else if previous.kind().emits_light {
            previous.light.with_emitted(EmittedLight::NONE)
        } else {
            previous.light
        };
        chunk.set_cell(local.x, local.y, local.z, BlockCell { block_type, light });
        let sides = chunk.boundary_sides(local);
        self.mark_neighbors_dirty(offset, &sides);

        if previous.block_type != block_type {
            self.update_surface(world, previous.kind().is_opaque(), kind.is_opaque());
        }
    }

    /// The light at a world position; zero if its chunk is not loaded.
    pub fn light(&self, world: Point3<i32>) -> PackedLight {
        self.cell(world).map_or(PackedLight::ZERO, |cell| cell.light)
    }

    /// Stores a light value computed by the lighting oracle.
    ///
    /// # Returns
    /// `true` if a loaded cell changed. Neighbors whose faces sample this cell
    /// are marked dirty.
    pub fn set_light(&mut self, world: Point3<i32>, light: PackedLight) -> bool {
        let (offset, local) = self.dimensions.split_world_position(world);
        let Some(chunk) = self.chunks.get_mut(&offset) else {
            return false;
        };
        if !chunk.set_light(local.x, local.y, local.z, light) {
            return false;
        }
        let sides = chunk.boundary_sides(local);
        self.mark_neighbors_dirty(offset, &sides);
        true
    }

    /// Records the writes `source` spilled into other chunks and applies
    /// them to targets that are loaded. Unloaded targets pick them up when
    /// they are generated.
    pub(super) fn route_spill(&mut self, source: Point3<i32>, spill: Vec<PendingWrite>) {
        let mut by_target: BTreeMap<(i32, i32, i32), Vec<PendingWrite>> = BTreeMap::new();
        for write in spill {
            let (target, _) = self.dimensions.split_world_position(write.position);
            by_target
                .entry((target.x, target.y, target.z))
                .or_default()
                .push(write);
        }

        let key = (source.x, source.y, source.z);
        for ((x, y, z), writes) in by_target {
            let target = Point3::new(x, y, z);
            if self.chunks.contains_key(&target) {
                for write in &writes {
                    if let Some(cell) = self.cell(write.position) {
                        if write.applies_to(cell.block_type) {
                            self.set_block_id(write.position, write.block_type);
                        }
                    }
                }
            }
            self.spilled_writes
                .entry(target)
                .or_default()
                .insert(key, writes);
        }
    }

    pub(super) fn mark_neighbors_dirty(&mut self, offset: Point3<i32>, sides: &[BlockSide]) {
        for side in sides {
            if let Some(neighbor) = self.chunks.get_mut(&(offset + side.normal())) {
                neighbor.mark_dirty();
            }
        }
    }

    /// Keeps the heightmap of the edited column in step with an opacity
    /// change at `world`.
    fn update_surface(&mut self, world: Point3<i32>, was_opaque: bool, is_opaque: bool) {
        let (column, local) = self.split_column(world.x, world.z);
        let Some(current) = self
            .heightmaps
            .get(&column)
            .map(|heightmap| heightmap.known(local.x, local.y))
        else {
            return;
        };

        let new_height = match current {
            None if is_opaque => world.y,
            Some(height) if is_opaque && world.y > height => world.y,
            Some(height) if was_opaque && !is_opaque && world.y == height => {
                self.scan_surface(world.x, world.y, world.z)
            }
            _ => return,
        };
        if let Some(heightmap) = self.heightmaps.get_mut(&column) {
            heightmap.set(local.x, local.y, new_height);
        }
        self.relight_column(world.x, world.z, None);
    }

    /// Finds the highest opaque block at or below `from_y`. A missing chunk
    /// in the region bounds the search at its top cell.
    fn scan_surface(&self, x: i32, from_y: i32, z: i32) -> i32 {
        let (start, local) = self
            .dimensions
            .split_world_position(Point3::new(x, from_y, z));
        let bottom = self.region.origin().y;
        for layer in (bottom..=start.y).rev() {
            let offset = Point3::new(start.x, layer, start.z);
            let origin_y = self.dimensions.origin_of(offset).y;
            match self.chunks.get(&offset) {
                Some(chunk) => {
                    if let Some(y) = chunk.highest_opaque(local.x, local.z) {
                        return origin_y + y as i32;
                    }
                }
                None => return origin_y + self.dimensions.y as i32 - 1,
            }
        }
        self.dimensions
            .origin_of(Point3::new(start.x, bottom, start.z))
            .y
            - 1
    }

    /// Rewrites the sunlight of one block column in every loaded chunk of its
    /// chunk column, except `skip`.
    pub(super) fn relight_column(&mut self, x: i32, z: i32, skip: Option<Point3<i32>>) {
        let (column, local) = self.split_column(x, z);
        let Some(heightmap) = self.heightmaps.get(&column) else {
            return;
        };
        let mut touched = Vec::new();
        for layer in self.region.layers() {
            let offset = Point3::new(column.x, layer, column.y);
            if Some(offset) == skip {
                continue;
            }
            let Some(chunk) = self.chunks.get_mut(&offset) else {
                continue;
            };
            let origin_y = chunk.origin().y;
            let mut sides: Vec<BlockSide> = Vec::new();
            for y in 0..self.dimensions.y {
                let sun = if heightmap.is_exposed(local.x, local.y, origin_y + y as i32) {
                    MAX_LIGHT_LEVEL
                } else {
                    0
                };
                let light = chunk.light(local.x, y, local.y).with_sunlight(sun);
                if chunk.set_light(local.x, y, local.y, light) {
                    for side in chunk.boundary_sides(Point3::new(local.x, y, local.y)) {
                        if !sides.contains(&side) {
                            sides.push(side);
                        }
                    }
                }
            }
            touched.push((offset, sides));
        }
        for (offset, sides) in touched {
            self.mark_neighbors_dirty(offset, &sides);
        }
    }

    /// Walks the voxels along a ray and returns the first non-air block.
    ///
    /// # Arguments
    /// * `origin` - World-space start of the ray
    /// * `direction` - Ray direction, need not be normalized
    /// * `max_distance` - Length of the ray in blocks
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        if direction.magnitude2() == 0.0 {
            return None;
        }
        let direction = direction.normalize();
        let origin: [f32; 3] = origin.into();
        let dir: [f32; 3] = direction.into();

        let mut voxel = [
            origin[0].floor() as i32,
            origin[1].floor() as i32,
            origin[2].floor() as i32,
        ];
        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            if dir[axis] > 0.0 {
                step[axis] = 1;
                t_max[axis] = (voxel[axis] as f32 + 1.0 - origin[axis]) / dir[axis];
                t_delta[axis] = 1.0 / dir[axis];
            } else if dir[axis] < 0.0 {
                step[axis] = -1;
                t_max[axis] = (origin[axis] - voxel[axis] as f32) / -dir[axis];
                t_delta[axis] = -1.0 / dir[axis];
            }
        }

        let mut normal = Vector3::new(0, 0, 0);
        let mut distance = 0.0;
        loop {
            let position = Point3::from(voxel);
            let block_type = self
                .cell(position)
                .map_or(BlockType::Air, |cell| cell.block_type);
            if block_type != BlockType::Air {
                return Some(RaycastHit {
                    position,
                    normal,
                    block_type,
                    distance,
                });
            }

            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            if t_max[axis] > max_distance {
                return None;
            }
            distance = t_max[axis];
            voxel[axis] += step[axis];
            t_max[axis] += t_delta[axis];
            normal = Vector3::new(0, 0, 0);
            normal[axis] = -step[axis];
        }
    }
}

impl CellSource for World {
    fn cell_at(&self, world: Point3<i32>) -> Option<BlockCell> {
        self.cell(world)
    }
}

/// Seeds a freshly generated chunk: full sunlight above the column surface
/// and the emitted light of glowing blocks.
pub(super) fn seed_light(chunk: &mut Chunk, heightmap: &Heightmap) {
    let dims = chunk.dimensions();
    let origin_y = chunk.origin().y;
    for y in 0..dims.y {
        for z in 0..dims.z {
            for x in 0..dims.x {
                let cell = chunk.cell(x, y, z);
                let mut light = cell.light;
                if heightmap.is_exposed(x, z, origin_y + y as i32) {
                    light = light.with_sunlight(MAX_LIGHT_LEVEL);
                }
                let kind = cell.kind();
                if kind.emits_light {
                    light = light.with_emitted(kind.emitted_light);
                }
                chunk.set_light(x, y, z, light);
            }
        }
    }
}
