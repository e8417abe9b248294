//! Chunk Mesher - triangulates retained layers into vertex/index buffers.
//!
//! Two index passes over a rectangular column range:
//!
//! 1. **Floor pass**: each 2x2 block of adjacent columns contributes a quad
//!    from the columns' first layers. When only three corners exist, the
//!    single triangle of the present corners is emitted instead - coverage
//!    at region edges and around sparse samples wins over watertightness.
//! 2. **Wall pass**: for each +X column pair, every consecutive layer-index
//!    pair present in both columns contributes a quad, reconstructing
//!    vertical surfaces between discrete floor/ceiling samples.
//!
//! Quads never reach across the chunk border; T-junctions between chunks
//! are accepted.

use std::collections::HashMap;

use crate::export::{HeightmapArtifact, HEIGHT_SENTINEL};
use crate::grid::SpatialHitGrid;
use crate::region::ChunkRect;
use crate::types::{ChunkMesh, ScanVertex};

/// Base vertex index and layer count for one column in the output buffer.
type ColumnSlot = (u32, u32);

/// Build the mesh for one chunk of columns.
pub fn build_chunk(grid: &SpatialHitGrid, rect: &ChunkRect) -> ChunkMesh {
  let mut mesh = ChunkMesh::new();
  let mut slots: HashMap<(i32, i32), ColumnSlot> = HashMap::new();

  // Vertex pass: one vertex per retained layer, columns in row-major order
  // so output is deterministic.
  for gz in rect.min_gz..=rect.max_gz {
    for gx in rect.min_gx..=rect.max_gx {
      let Some(layers) = grid.layers((gx, gz)) else {
        continue;
      };
      if layers.is_empty() {
        continue;
      }
      let base = mesh.vertices.len() as u32;
      for layer in layers {
        mesh.vertices.push(ScanVertex {
          position: layer.position.to_array(),
          normal: layer.normal.to_array(),
          material: layer.material,
        });
      }
      slots.insert((gx, gz), (base, layers.len() as u32));
    }
  }

  if mesh.vertices.is_empty() {
    return mesh;
  }

  // Index of a column's layer `li`, if that layer exists.
  let layer_index = |gx: i32, gz: i32, li: u32| -> Option<u32> {
    slots
      .get(&(gx, gz))
      .filter(|(_, count)| li < *count)
      .map(|(base, _)| base + li)
  };

  // Floor pass.
  for gz in rect.min_gz..rect.max_gz {
    for gx in rect.min_gx..rect.max_gx {
      let corners = [
        layer_index(gx, gz, 0),
        layer_index(gx + 1, gz, 0),
        layer_index(gx + 1, gz + 1, 0),
        layer_index(gx, gz + 1, 0),
      ];
      let present: Vec<u32> = corners.iter().flatten().copied().collect();
      match present.len() {
        4 => {
          mesh
            .indices
            .extend_from_slice(&[present[0], present[1], present[2]]);
          mesh
            .indices
            .extend_from_slice(&[present[0], present[2], present[3]]);
        }
        3 => {
          // Edge/sparse fallback: keep coverage with the one triangle the
          // present corners allow.
          mesh
            .indices
            .extend_from_slice(&[present[0], present[1], present[2]]);
        }
        _ => {}
      }
    }
  }

  // Wall pass: +X neighbor only, consecutive layer pairs in both columns.
  for gz in rect.min_gz..=rect.max_gz {
    for gx in rect.min_gx..rect.max_gx {
      let pairs = slots
        .get(&(gx, gz))
        .map(|(_, c)| *c)
        .unwrap_or(0)
        .min(slots.get(&(gx + 1, gz)).map(|(_, c)| *c).unwrap_or(0));
      if pairs < 2 {
        continue;
      }
      for li in 0..pairs - 1 {
        // All four are present by construction.
        let c_lo = layer_index(gx, gz, li).unwrap();
        let c_hi = layer_index(gx, gz, li + 1).unwrap();
        let n_lo = layer_index(gx + 1, gz, li).unwrap();
        let n_hi = layer_index(gx + 1, gz, li + 1).unwrap();
        mesh.indices.extend_from_slice(&[c_lo, n_lo, n_hi]);
        mesh.indices.extend_from_slice(&[c_lo, n_hi, c_hi]);
      }
    }
  }

  mesh
}

/// Build the dense heightmap artifact over the grid's observed extent.
///
/// Reads only the height index, never the cells - valid at any time,
/// including after every chunk has been evicted, and idempotent between
/// inserts.
pub fn build_heightmap(grid: &SpatialHitGrid, region_id: &str) -> HeightmapArtifact {
  let extent = grid.extent();
  if !extent.is_valid() {
    return HeightmapArtifact {
      region_id: region_id.to_string(),
      spacing: grid.spacing(),
      origin_x: 0.0,
      origin_z: 0.0,
      width: 0,
      height: 0,
      heights: Vec::new(),
      sentinel: HEIGHT_SENTINEL,
    };
  }
  let width = extent.width();
  let depth = extent.depth();

  let mut heights = vec![HEIGHT_SENTINEL; (width as usize) * (depth as usize)];
  for ((gx, gz), min_y) in grid.heights() {
    let col = (gx - extent.min_gx) as usize;
    let row = (gz - extent.min_gz) as usize;
    heights[row * width as usize + col] = min_y;
  }

  HeightmapArtifact {
    region_id: region_id.to_string(),
    spacing: grid.spacing(),
    origin_x: extent.min_gx as f32 * grid.spacing(),
    origin_z: extent.min_gz as f32 * grid.spacing(),
    width,
    height: depth,
    heights,
    sentinel: HEIGHT_SENTINEL,
  }
}

#[cfg(test)]
#[path = "mesher_test.rs"]
mod mesher_test;
