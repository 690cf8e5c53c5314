//! # Chunk Iteration Module
//!
//! This module provides an iterator over all non-air cells in a chunk.
//!
//! ## Memory-Aware Iteration
//!
//! The `ChunkBlockIterator` walks the set bits of the chunk's occupancy bit
//! vector, so runs of air (most of a tall chunk) are skipped a word at a time
//! instead of one cell at a time.

use bitvec::slice::IterOnes;
use bitvec::order::Lsb0;
use cgmath::Point3;

use crate::engine_state::voxels::block::BlockCell;

use super::Chunk;

/// An iterator over all non-air cells in a chunk, in storage order.
///
/// Yields the local coordinate together with a copy of the cell.
pub struct ChunkBlockIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a Chunk,
    /// Indices of occupied cells still to visit
    occupied: IterOnes<'a, usize, Lsb0>,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` for the given chunk.
    ///
    /// # Arguments
    /// * `chunk_ref` - A reference to the chunk to iterate over
    ///
    /// # Returns
    /// A new `ChunkBlockIterator` positioned before the first non-air cell
    pub fn new(chunk_ref: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref,
            occupied: chunk_ref.occupied_array.iter_ones(),
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = (Point3<usize>, BlockCell);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.occupied.next()?;
        let position = self.chunk_ref.dimensions.position(index);
        Some((position, self.chunk_ref.cells[index]))
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::{Chunk, ChunkDimensions};

    #[test]
    fn test_yields_only_non_air_in_storage_order() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0), ChunkDimensions::new(4, 4, 4));
        chunk.set_block_type(3, 2, 0, BlockType::Glass);
        chunk.set_block_type(1, 0, 2, BlockType::Stone);
        chunk.set_block_type(0, 3, 3, BlockType::Water);

        let visited: Vec<_> = chunk
            .iter_blocks()
            .map(|(position, cell)| (position, cell.block_type))
            .collect();
        assert_eq!(
            visited,
            vec![
                (Point3::new(1, 0, 2), BlockType::Stone),
                (Point3::new(3, 2, 0), BlockType::Glass),
                (Point3::new(0, 3, 3), BlockType::Water),
            ]
        );
    }

    #[test]
    fn test_empty_chunk_yields_nothing() {
        let chunk = Chunk::new(Point3::new(0, 0, 0), ChunkDimensions::new(4, 4, 4));
        assert_eq!(chunk.iter_blocks().count(), 0);
    }
}
