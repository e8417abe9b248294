//! Spatial Hit Grid - sparse, bounded-memory accumulation of probe hits.
//!
//! Each column (quantized world (x, z)) holds at most `max_layers` retained
//! layers, deduplicated vertically: two samples closer than half the grid
//! spacing are the same surface re-observed by another probe pass. A second
//! map records the minimum Y ever inserted per column, independent of the
//! cap and dedup rules and untouched by chunk eviction - the heightmap is
//! always derivable from it, even after all cells are gone.

use std::collections::HashMap;

use glam::Vec3;
use smallvec::SmallVec;

use crate::profile::ResolutionProfile;
use crate::region::ChunkRect;
use crate::types::{ColumnExtent, MaterialId};

/// One retained surface sample within a column.
///
/// Position in the layer list doubles as a rough floor/ceiling
/// correspondence key across neighboring columns for wall generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layer {
  pub position: Vec3,
  pub normal: Vec3,
  pub material: MaterialId,
}

/// Result of one insert call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
  /// A new layer was appended.
  Retained,

  /// A layer within the dedup epsilon already exists; sample skipped.
  Duplicate,

  /// The column is at its layer cap; sample dropped.
  CapacityDropped,
}

#[derive(Default)]
struct CellColumn {
  layers: SmallVec<[Layer; 4]>,
}

/// Point-in-time grid aggregate for scheduling and progress reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridStats {
  /// Layers currently held in cells (excludes evicted).
  pub active_layers: usize,

  /// Cumulative layers ever retained.
  pub total_retained: u64,

  /// Samples dropped at the layer cap.
  pub total_dropped: u64,

  /// Samples skipped as duplicate surfaces.
  pub total_deduped: u64,

  /// Layers freed by chunk eviction.
  pub total_evicted: u64,

  /// Columns that received their first hit.
  pub cells_created: u64,

  /// Columns that ever held two or more layers.
  pub multi_layer_cells: u64,

  /// Largest layer count any column ever reached.
  pub peak_layers: usize,

  /// Approximate retained-cell memory.
  pub estimated_bytes: u64,

  /// Bounding extent of every column ever inserted into.
  pub extent: ColumnExtent,
}

/// Sparse map from quantized columns to bounded layer lists.
pub struct SpatialHitGrid {
  spacing: f32,
  dedup_epsilon: f32,
  max_layers: usize,

  cells: HashMap<(i32, i32), CellColumn>,

  /// Loss-free minimum-height index; survives cap, dedup and eviction.
  height_index: HashMap<(i32, i32), f32>,

  active_layers: usize,
  total_retained: u64,
  total_dropped: u64,
  total_deduped: u64,
  total_evicted: u64,
  multi_layer_cells: u64,
  peak_layers: usize,
  extent: ColumnExtent,
}

impl SpatialHitGrid {
  pub fn new(spacing: f32, max_layers: usize) -> Self {
    Self {
      spacing,
      dedup_epsilon: ResolutionProfile::dedup_epsilon(spacing),
      max_layers,
      cells: HashMap::new(),
      height_index: HashMap::new(),
      active_layers: 0,
      total_retained: 0,
      total_dropped: 0,
      total_deduped: 0,
      total_evicted: 0,
      multi_layer_cells: 0,
      peak_layers: 0,
      extent: ColumnExtent::empty(),
    }
  }

  pub fn spacing(&self) -> f32 {
    self.spacing
  }

  /// Column address for a world-space position.
  #[inline]
  pub fn column_of(&self, x: f32, z: f32) -> (i32, i32) {
    (
      (x / self.spacing).round() as i32,
      (z / self.spacing).round() as i32,
    )
  }

  /// Insert one probe hit.
  ///
  /// The height index is updated on every call, including cap drops and
  /// dedup skips - the height signal is preserved even when the fine mesh
  /// silently loses detail.
  pub fn insert(&mut self, position: Vec3, normal: Vec3, material: MaterialId) -> InsertOutcome {
    let col = self.column_of(position.x, position.z);

    self
      .height_index
      .entry(col)
      .and_modify(|min_y| *min_y = min_y.min(position.y))
      .or_insert(position.y);
    self.extent.encapsulate(col.0, col.1);

    let cell = self.cells.entry(col).or_default();

    if cell.layers.len() >= self.max_layers {
      self.total_dropped += 1;
      return InsertOutcome::CapacityDropped;
    }

    if cell
      .layers
      .iter()
      .any(|l| (l.position.y - position.y).abs() < self.dedup_epsilon)
    {
      self.total_deduped += 1;
      return InsertOutcome::Duplicate;
    }

    cell.layers.push(Layer {
      position,
      normal,
      material,
    });

    let count = cell.layers.len();
    self.active_layers += 1;
    self.total_retained += 1;
    if count == 2 {
      self.multi_layer_cells += 1;
    }
    self.peak_layers = self.peak_layers.max(count);

    InsertOutcome::Retained
  }

  /// Retained layer count for a column.
  pub fn layer_count(&self, col: (i32, i32)) -> usize {
    self.cells.get(&col).map_or(0, |c| c.layers.len())
  }

  /// Retained layers for a column, in insertion order.
  pub fn layers(&self, col: (i32, i32)) -> Option<&[Layer]> {
    self.cells.get(&col).map(|c| c.layers.as_slice())
  }

  /// Minimum Y ever inserted at a column, regardless of retention.
  pub fn min_height(&self, col: (i32, i32)) -> Option<f32> {
    self.height_index.get(&col).copied()
  }

  /// Bounding extent of every column ever observed.
  pub fn extent(&self) -> ColumnExtent {
    self.extent
  }

  /// Remove retained cells within a chunk. Returns the layer count freed.
  /// The height index is untouched.
  pub fn evict_chunk(&mut self, rect: &ChunkRect) -> usize {
    let mut freed = 0;
    self.cells.retain(|&(gx, gz), cell| {
      if rect.contains(gx, gz) {
        freed += cell.layers.len();
        false
      } else {
        true
      }
    });
    self.active_layers -= freed;
    self.total_evicted += freed as u64;
    freed
  }

  /// Discard all retained cells and height data.
  pub fn clear(&mut self) {
    self.cells.clear();
    self.height_index.clear();
    self.active_layers = 0;
    self.extent = ColumnExtent::empty();
  }

  pub fn stats(&self) -> GridStats {
    let cell_overhead = std::mem::size_of::<(i32, i32)>() + std::mem::size_of::<CellColumn>();
    let estimated_bytes = (self.active_layers * std::mem::size_of::<Layer>()
      + self.cells.len() * cell_overhead
      + self.height_index.len() * (std::mem::size_of::<(i32, i32)>() + 4)) as u64;

    GridStats {
      active_layers: self.active_layers,
      total_retained: self.total_retained,
      total_dropped: self.total_dropped,
      total_deduped: self.total_deduped,
      total_evicted: self.total_evicted,
      cells_created: self.height_index.len() as u64,
      multi_layer_cells: self.multi_layer_cells,
      peak_layers: self.peak_layers,
      estimated_bytes,
      extent: self.extent,
    }
  }

  /// Iterate the height index (column, min Y). Order is unspecified.
  pub fn heights(&self) -> impl Iterator<Item = ((i32, i32), f32)> + '_ {
    self.height_index.iter().map(|(&col, &y)| (col, y))
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
