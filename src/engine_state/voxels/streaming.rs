//! # World Streaming
//!
//! Keeps a box of loaded chunks around a moving center and spreads the work
//! of filling and meshing it over frames.
//!
//! ## Active Region
//!
//! The region spans `magnitude` chunks on each axis starting at
//! `center - magnitude / 2`. Moving the center into another chunk unloads
//! everything outside the new box, drops heightmaps whose column left its XZ
//! projection and queues the empty slots nearest first.
//!
//! ## Budgets
//!
//! Two [`WorkBudget`]s are reset once per frame: the load budget counts chunk
//! generations (or dispatches to workers), the mesh budget counts chunk
//! rebuilds, transparent re-sorts and animation refreshes. Work over budget
//! waits for a later frame.
//!
//! ## Animation
//!
//! Animated textures are baked into meshes. Whenever the world-wide
//! animation phase advances, clean chunks with animated faces are rebuilt
//! nearest first with whatever mesh budget is left.
//!
//! ## Chunk States
//!
//! `NotLoaded -> Generating -> Dirty <-> Clean -> NotLoaded`. A chunk is
//! created dirty and only becomes clean after a rebuild that fit in the mesh
//! budget.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use cgmath::{MetricSpace, Point2, Point3, Vector3};
use web_time::Instant;

use super::block::block_side::BlockSide;
use super::block::registry::animation_phase;
use super::chunk::Chunk;
use super::generation::PendingWrite;
use super::heightmap::Heightmap;
use super::tasks::chunk_generation_task::ChunkGenerationTask;
use super::world::{seed_light, World};
use crate::engine_state::buffer_state::GpuBuffers;
use crate::engine_state::rendering::meshing::{ChunkMeshBuilder, RenderList, ResortOutcome};
use crate::engine_state::rendering::texture::TextureAtlas;

/// The box of chunk offsets that should be loaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActiveRegion {
    origin: Point3<i32>,
    magnitude: Vector3<i32>,
}

impl ActiveRegion {
    /// The region of `magnitude` chunks whose origin is
    /// `center - magnitude / 2` on each axis.
    pub fn centered_on(center: Point3<i32>, magnitude: Vector3<i32>) -> Self {
        ActiveRegion {
            origin: center - magnitude / 2,
            magnitude,
        }
    }

    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    pub fn magnitude(&self) -> Vector3<i32> {
        self.magnitude
    }

    /// `true` iff `offset` lies in `[origin, origin + magnitude)` on every axis.
    pub fn contains(&self, offset: Point3<i32>) -> bool {
        let relative = offset - self.origin;
        (0..self.magnitude.x).contains(&relative.x)
            && (0..self.magnitude.y).contains(&relative.y)
            && (0..self.magnitude.z).contains(&relative.z)
    }

    /// Whether the XZ projection of the region contains a chunk column.
    pub fn contains_column(&self, column: Point2<i32>) -> bool {
        (self.origin.x..self.origin.x + self.magnitude.x).contains(&column.x)
            && (self.origin.z..self.origin.z + self.magnitude.z).contains(&column.y)
    }

    /// The region grown by `margin` chunks on every side.
    pub fn expanded(&self, margin: i32) -> Self {
        ActiveRegion {
            origin: self.origin - Vector3::new(margin, margin, margin),
            magnitude: self.magnitude + Vector3::new(2 * margin, 2 * margin, 2 * margin),
        }
    }

    /// The chunk y-offsets the region spans.
    pub fn layers(&self) -> std::ops::Range<i32> {
        self.origin.y..self.origin.y + self.magnitude.y
    }

    /// Every offset of the region, x fastest.
    pub fn offsets(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        let origin = self.origin;
        let magnitude = self.magnitude;
        (0..magnitude.y).flat_map(move |y| {
            (0..magnitude.z).flat_map(move |z| {
                (0..magnitude.x).map(move |x| origin + Vector3::new(x, y, z))
            })
        })
    }
}

/// Sorts offsets by squared distance to `center`, ties broken by
/// `(x, y, z)` so the order is deterministic.
pub fn sort_nearest_first(offsets: &mut [Point3<i32>], center: Point3<i32>) {
    let key = |offset: &Point3<i32>| {
        let d = *offset - center;
        let distance = (d.x as i64).pow(2) + (d.y as i64).pow(2) + (d.z as i64).pow(2);
        (distance, offset.x, offset.y, offset.z)
    };
    offsets.sort_by_key(key);
}

/// A per-frame allowance of work units.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkBudget {
    limit: usize,
    used: usize,
}

impl WorkBudget {
    pub fn new(limit: usize) -> Self {
        WorkBudget { limit, used: 0 }
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Takes one unit if any is left.
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.limit {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Where a chunk offset is in its life cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkState {
    NotLoaded,
    Generating,
    /// Loaded with an up-to-date mesh.
    Clean,
    /// Loaded, waiting for a rebuild.
    Dirty,
}

/// Work done during the current frame plus world totals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub loaded: usize,
    pub unloaded: usize,
    /// Generated chunks discarded because they left the region in flight.
    pub dropped: usize,
    pub meshed: usize,
    pub resorted: usize,
    pub loaded_chunks: usize,
    pub pending_loads: usize,
    pub generating: usize,
}

/// Applies writes that land in `chunk`, honoring their modes.
fn replay_writes(chunk: &mut Chunk, writes: &[PendingWrite]) {
    for write in writes {
        if let Some(local) = chunk.world_to_local(write.position) {
            let existing = chunk.block_type(local.x, local.y, local.z);
            if write.applies_to(existing) {
                chunk.set_block_type(local.x, local.y, local.z, write.block_type);
            }
        }
    }
}

impl World {
    /// Moves the active region to the chunk containing `position`.
    ///
    /// Unloads chunks outside the new region, queueing their buffers for
    /// release, and queues the empty slots nearest first. Loading happens in
    /// [`World::load_pending`].
    ///
    /// # Returns
    /// `false` if the containing chunk did not change.
    pub fn set_center(&mut self, position: Point3<f32>) -> bool {
        let center = self.dimensions.offset_containing(position);
        if self.center == Some(center) {
            return false;
        }
        self.center = Some(center);
        let region = ActiveRegion::centered_on(center, self.region.magnitude());
        self.region = region;

        let mut released = Vec::new();
        let mut removed = Vec::new();
        self.chunks.retain(|offset, chunk| {
            if region.contains(*offset) {
                true
            } else {
                released.extend(chunk.mesh.take_handles());
                removed.push(*offset);
                false
            }
        });
        self.pending_releases.extend(released);
        self.stats.unloaded += removed.len();

        // Faces toward an unloaded chunk are drawn again.
        for offset in &removed {
            for side in BlockSide::all() {
                if let Some(neighbor) = self.chunks.get_mut(&(*offset + side.normal())) {
                    neighbor.mark_dirty();
                }
            }
        }

        self.heightmaps
            .retain(|column, _| region.contains_column(*column));

        let mut empty: Vec<Point3<i32>> = region
            .offsets()
            .filter(|offset| {
                !self.chunks.contains_key(offset) && !self.generating.contains(offset)
            })
            .collect();
        sort_nearest_first(&mut empty, center);
        self.load_queue = VecDeque::from(empty);

        log::info!(
            "Recentered on chunk {:?}: unloaded {}, {} slots queued",
            center,
            removed.len(),
            self.load_queue.len()
        );
        true
    }

    /// Starts loading queued offsets until the load budget runs out.
    ///
    /// Without workers each chunk is generated and integrated immediately;
    /// with workers it is dispatched and stays `Generating` until
    /// [`World::collect_generated`] picks it up.
    ///
    /// # Returns
    /// The number of chunks started this call.
    pub fn load_pending(&mut self) -> usize {
        let mut started = 0;
        while self.load_budget.remaining() > 0 {
            let Some(offset) = self.load_queue.pop_front() else {
                break;
            };
            if self.chunks.contains_key(&offset)
                || self.generating.contains(&offset)
                || !self.region.contains(offset)
            {
                continue;
            }
            self.load_budget.try_consume();
            started += 1;
            if self.tasks.is_some() {
                self.dispatch_generation(offset);
            } else {
                self.generate_inline(offset);
            }
        }
        started
    }

    fn dispatch_generation(&mut self, offset: Point3<i32>) {
        self.generating.insert(offset);
        let task = Box::new(ChunkGenerationTask::new(Arc::clone(&self.generator), offset));
        if let Some(tasks) = self.tasks.as_mut() {
            tasks.publish_task(task);
        }
    }

    fn generate_inline(&mut self, offset: Point3<i32>) {
        let mut chunk = Chunk::new(offset, self.dimensions);
        chunk.set_generating(true);
        let overflow = self.generator.generate(&mut chunk);
        self.finish_generation(chunk, overflow);
    }

    /// Integrates every chunk the workers have finished.
    ///
    /// If a worker died with chunks in flight, every offset still generating
    /// is queued again.
    pub fn collect_generated(&mut self) -> usize {
        let Some(tasks) = self.tasks.as_mut() else {
            return 0;
        };
        let results = tasks.drain_completed();
        let lost = tasks.take_lost_tasks();
        let live_workers = tasks.live_workers();

        let count = results.len();
        for result in results {
            result.handle_result(self);
        }
        if lost > 0 {
            self.recover_lost_generation(live_workers);
        }
        count
    }

    /// Moves offsets marked generating back to the front of the load queue,
    /// nearest first. Results that still arrive for them from live workers
    /// are integrated or dropped as duplicates. Without live workers loading
    /// falls back to the calling thread.
    pub(super) fn recover_lost_generation(&mut self, live_workers: usize) {
        if live_workers == 0 {
            log::error!("No task workers left; generating chunks on the calling thread");
            self.tasks = None;
        }
        let region = self.region;
        let mut lost: Vec<Point3<i32>> = self
            .generating
            .drain()
            .filter(|offset| region.contains(*offset))
            .collect();
        sort_nearest_first(&mut lost, self.center.unwrap_or(region.origin()));
        log::warn!("Re-queueing {} chunks after a task worker failed", lost.len());
        for offset in lost.into_iter().rev() {
            self.load_queue.push_front(offset);
        }
    }

    /// Inserts a generated chunk into the world.
    ///
    /// Decoration writes spilled into the offset by other chunks are
    /// replayed, then deferred edits, so edits win. The column heightmap is
    /// raised, sunlight and emitted light are seeded, loaded face neighbors
    /// are marked dirty and the decoration writes that fell outside the chunk
    /// are routed to their targets. A chunk whose offset left the region is
    /// dropped.
    pub fn finish_generation(&mut self, mut chunk: Chunk, overflow: Vec<PendingWrite>) {
        let offset = chunk.offset;
        self.generating.remove(&offset);
        chunk.set_generating(false);
        if !self.region.contains(offset) || self.chunks.contains_key(&offset) {
            log::debug!("Dropping generated chunk {offset:?}: no longer wanted");
            self.stats.dropped += 1;
            return;
        }

        let spilled: Vec<PendingWrite> = self.spilled_writes(offset).copied().collect();
        replay_writes(&mut chunk, &spilled);
        if let Some(edits) = self.deferred_edits.remove(&offset) {
            log::debug!(
                "Replaying {} deferred edits into chunk {offset:?}",
                edits.len()
            );
            replay_writes(&mut chunk, &edits);
        }

        let dims = self.dimensions;
        let origin = chunk.origin();
        let heightmap = self
            .heightmaps
            .entry(Point2::new(offset.x, offset.z))
            .or_insert_with(|| Heightmap::new(dims.x, dims.z));
        let mut raised = Vec::new();
        for z in 0..dims.z {
            for x in 0..dims.x {
                if let Some(y) = chunk.highest_opaque(x, z) {
                    if heightmap.raise(x, z, origin.y + y as i32).is_some() {
                        raised.push((x, z));
                    }
                }
            }
        }
        seed_light(&mut chunk, heightmap);

        self.chunks.insert(offset, chunk);
        self.mark_neighbors_dirty(offset, &BlockSide::all());
        if self.region.magnitude().y > 1 {
            for (x, z) in raised {
                self.relight_column(origin.x + x as i32, origin.z + z as i32, Some(offset));
            }
        }
        self.route_spill(offset, overflow);
        self.stats.loaded += 1;
    }

    /// Rebuilds dirty chunks nearest first, then re-sorts stale transparent
    /// batches, then rebuilds chunks whose animated faces show an old phase,
    /// all within the mesh budget.
    ///
    /// Dirty chunks without any blocks are released and marked clean without
    /// using budget.
    ///
    /// # Arguments
    /// * `buffers` - The GPU buffer backend receiving uploads
    /// * `atlas` - Texture atlas for face UVs
    /// * `viewer` - World position used for ordering and transparency sorting
    /// * `tick` - Frame tick; its animation phase is baked into animated
    ///   textures
    ///
    /// # Returns
    /// The number of budget units used.
    pub fn mesh_dirty(
        &mut self,
        buffers: &mut dyn GpuBuffers,
        atlas: &dyn TextureAtlas,
        viewer: Point3<f32>,
        tick: u64,
    ) -> usize {
        let start = Instant::now();
        let used_before = self.mesh_budget.used();

        let dirty = self.nearest_chunks(viewer, |chunk| chunk.is_dirty());
        for offset in dirty {
            let is_empty = self.chunks.get(&offset).is_some_and(Chunk::is_empty);
            if is_empty {
                if let Some(chunk) = self.chunks.get_mut(&offset) {
                    chunk.mesh.release(buffers);
                    chunk.mark_clean();
                }
                continue;
            }
            if !self.mesh_budget.try_consume() {
                break;
            }
            self.rebuild_chunk(offset, buffers, atlas, viewer, tick);
            self.stats.meshed += 1;
        }

        let resort_distance = self.resort_distance;
        let stale = self.nearest_chunks(viewer, |chunk| {
            !chunk.is_dirty() && chunk.mesh.needs_resort(viewer, resort_distance)
        });
        for offset in stale {
            if !self.mesh_budget.try_consume() {
                break;
            }
            let outcome = match self.chunks.get_mut(&offset) {
                Some(chunk) => chunk.mesh.resort(viewer, buffers),
                None => ResortOutcome::NothingToSort,
            };
            match outcome {
                ResortOutcome::Resorted => self.stats.resorted += 1,
                ResortOutcome::NeedsRebuild => {
                    self.rebuild_chunk(offset, buffers, atlas, viewer, tick);
                    self.stats.meshed += 1;
                }
                ResortOutcome::NothingToSort => {}
            }
        }

        let phase = animation_phase(tick);
        let animated = self.nearest_chunks(viewer, |chunk| {
            !chunk.is_dirty() && chunk.mesh.is_animation_stale(phase)
        });
        for offset in animated {
            if !self.mesh_budget.try_consume() {
                break;
            }
            self.rebuild_chunk(offset, buffers, atlas, viewer, tick);
            self.stats.meshed += 1;
        }

        let used = self.mesh_budget.used() - used_before;
        if used > 0 {
            log::debug!("Mesh pass used {used} units in {:?}", start.elapsed());
        }
        used
    }

    /// Offsets of loaded chunks matching `filter`, nearest chunk center first.
    fn nearest_chunks(
        &self,
        viewer: Point3<f32>,
        predicate: impl Fn(&Chunk) -> bool,
    ) -> Vec<Point3<i32>> {
        let size = self.dimensions.as_vector();
        let half = Vector3::new(size.x as f32, size.y as f32, size.z as f32) / 2.0;
        let mut candidates: Vec<(f32, Point3<i32>)> = self
            .chunks
            .values()
            .filter(|chunk| predicate(chunk))
            .map(|chunk| {
                let origin = chunk.origin();
                let center = Point3::new(origin.x as f32, origin.y as f32, origin.z as f32) + half;
                (center.distance2(viewer), chunk.offset)
            })
            .collect();
        candidates.sort_by(|(da, a), (db, b)| match da.total_cmp(db) {
            Ordering::Equal => (a.x, a.y, a.z).cmp(&(b.x, b.y, b.z)),
            ordering => ordering,
        });
        candidates.into_iter().map(|(_, offset)| offset).collect()
    }

    /// Meshes a loaded chunk, uploads it and frees its previous upload.
    fn rebuild_chunk(
        &mut self,
        offset: Point3<i32>,
        buffers: &mut dyn GpuBuffers,
        atlas: &dyn TextureAtlas,
        viewer: Point3<f32>,
        tick: u64,
    ) {
        let Some(chunk) = self.chunks.get(&offset) else {
            return;
        };
        let mut mesh = ChunkMeshBuilder::new(&*self, atlas)
            .with_animation_tick(tick)
            .build(chunk);
        mesh.sort_transparent(viewer);
        let label = format!("chunk {} {} {}", offset.x, offset.y, offset.z);
        mesh.upload(buffers, &label, self.persist_face_lists);

        if let Some(chunk) = self.chunks.get_mut(&offset) {
            let mut previous = std::mem::replace(&mut chunk.mesh, mesh);
            previous.release(buffers);
            chunk.mark_clean();
        }
    }

    /// Frees the buffers of chunks unloaded since the last call.
    pub fn flush_releases(&mut self, buffers: &mut dyn GpuBuffers) -> usize {
        let count = self.pending_releases.len();
        for handle in self.pending_releases.drain(..) {
            buffers.release(handle);
        }
        count
    }

    /// The draws for the current state of every loaded chunk.
    pub fn render_list(&self, viewer: Point3<f32>, wireframe: bool) -> RenderList {
        RenderList::collect(self.chunks.values(), viewer, wireframe)
    }

    /// Starts a new frame's loading: resets the load budget and the load
    /// counters of [`FrameStats`].
    pub fn reset_load_budget(&mut self) {
        self.load_budget.reset();
        self.stats.loaded = 0;
        self.stats.unloaded = 0;
        self.stats.dropped = 0;
    }

    /// Starts a new frame's meshing: resets the mesh budget and the meshing
    /// counters of [`FrameStats`].
    pub fn reset_mesh_budget(&mut self) {
        self.mesh_budget.reset();
        self.stats.meshed = 0;
        self.stats.resorted = 0;
    }

    pub fn load_budget(&self) -> WorkBudget {
        self.load_budget
    }

    pub fn mesh_budget(&self) -> WorkBudget {
        self.mesh_budget
    }

    pub fn chunk_state(&self, offset: Point3<i32>) -> ChunkState {
        if self.generating.contains(&offset) {
            return ChunkState::Generating;
        }
        match self.chunks.get(&offset) {
            Some(chunk) if chunk.is_dirty() => ChunkState::Dirty,
            Some(_) => ChunkState::Clean,
            None => ChunkState::NotLoaded,
        }
    }

    pub fn region(&self) -> ActiveRegion {
        self.region
    }

    /// The chunk the region is centered on, once a center was set.
    pub fn center(&self) -> Option<Point3<i32>> {
        self.center
    }

    pub fn pending_loads(&self) -> usize {
        self.load_queue.len()
    }

    /// Queued offsets in load order.
    pub fn pending_offsets(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        self.load_queue.iter().copied()
    }

    /// Chunks handed to workers and not yet integrated.
    pub fn generating_count(&self) -> usize {
        self.generating.len()
    }

    /// `true` once nothing is queued or generating.
    pub fn is_settled(&self) -> bool {
        self.load_queue.is_empty() && self.generating.is_empty()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            loaded_chunks: self.chunks.len(),
            pending_loads: self.load_queue.len(),
            generating: self.generating.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::{EngineConfig, RegionMagnitude};
    use crate::engine_state::voxels::chunk::ChunkDimensions;

    #[test]
    fn test_region_bounds() {
        let region = ActiveRegion::centered_on(Point3::new(5, 0, 0), Vector3::new(10, 1, 10));
        assert_eq!(region.origin(), Point3::new(0, 0, -5));
        assert!(region.contains(Point3::new(0, 0, -5)));
        assert!(region.contains(Point3::new(9, 0, 4)));
        assert!(!region.contains(Point3::new(10, 0, 0)));
        assert!(!region.contains(Point3::new(-1, 0, 0)));
        assert!(!region.contains(Point3::new(0, 1, 0)));
        assert!(region.contains_column(Point2::new(9, -5)));
        assert!(!region.contains_column(Point2::new(9, 5)));
        assert_eq!(region.offsets().count(), 100);
        assert!(region.offsets().all(|offset| region.contains(offset)));
    }

    #[test]
    fn test_expanded_region() {
        let region = ActiveRegion::centered_on(Point3::new(0, 0, 0), Vector3::new(2, 1, 2));
        let grown = region.expanded(1);
        assert!(grown.contains(Point3::new(-2, -1, -2)));
        assert!(grown.contains(Point3::new(1, 1, 1)));
        assert!(!grown.contains(Point3::new(2, 0, 0)));
    }

    #[test]
    fn test_sort_nearest_first_is_deterministic() {
        let mut offsets = vec![
            Point3::new(1, 0, 0),
            Point3::new(0, 0, 0),
            Point3::new(-1, 0, 0),
            Point3::new(0, 0, 1),
            Point3::new(2, 0, 2),
        ];
        sort_nearest_first(&mut offsets, Point3::new(0, 0, 0));
        assert_eq!(
            offsets,
            vec![
                Point3::new(0, 0, 0),
                Point3::new(-1, 0, 0),
                Point3::new(0, 0, 1),
                Point3::new(1, 0, 0),
                Point3::new(2, 0, 2),
            ]
        );
    }

    #[test]
    fn test_lost_generation_falls_back_to_inline_loading() {
        let config = EngineConfig {
            chunk_size: ChunkDimensions::new(8, 128, 8),
            region_magnitude: RegionMagnitude::new(2, 1, 2),
            worker_threads: 1,
            ..EngineConfig::default()
        };
        let mut world = World::new(&config);
        world.set_center(Point3::new(0.5, 4.0, 0.5));
        world.load_queue.clear();
        world.generating.insert(Point3::new(0, 0, 0));
        world.generating.insert(Point3::new(-1, 0, 0));
        world.generating.insert(Point3::new(9, 0, 9));

        world.recover_lost_generation(0);
        assert!(world.tasks.is_none());
        assert_eq!(world.generating_count(), 0);
        assert_eq!(
            world.pending_offsets().collect::<Vec<_>>(),
            vec![Point3::new(0, 0, 0), Point3::new(-1, 0, 0)]
        );

        world.reset_load_budget();
        assert_eq!(world.load_pending(), 2);
        assert_eq!(world.chunk_state(Point3::new(-1, 0, 0)), ChunkState::Dirty);
        assert_eq!(world.collect_generated(), 0);
    }

    #[test]
    fn test_work_budget() {
        let mut budget = WorkBudget::new(2);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.remaining(), 0);
        budget.reset();
        assert_eq!(budget.remaining(), 2);
        assert_eq!(budget.used(), 0);
    }
}
