use glam::Vec3;

use super::*;
use crate::grid::SpatialHitGrid;

const UP: Vec3 = Vec3::Y;

fn full_rect() -> ChunkRect {
  ChunkRect {
    index: 0,
    min_gx: 0,
    max_gx: 9,
    min_gz: 0,
    max_gz: 9,
  }
}

/// 10x10 columns, spacing 1, one ground layer per column at y = 0.
fn flat_grid() -> SpatialHitGrid {
  let mut g = SpatialHitGrid::new(1.0, 20);
  for gx in 0..10 {
    for gz in 0..10 {
      g.insert(Vec3::new(gx as f32, 0.0, gz as f32), UP, 1);
    }
  }
  g
}

#[test]
fn flat_terrain_produces_81_quads_and_no_walls() {
  let g = flat_grid();
  let mesh = build_chunk(&g, &full_rect());

  assert_eq!(mesh.vertices.len(), 100);
  // 9x9 blocks of 2 triangles each, no wall faces anywhere.
  assert_eq!(mesh.triangle_count(), 162);
}

#[test]
fn single_building_adds_roof_and_wall_faces() {
  let mut g = flat_grid();
  for (gx, gz) in [(4, 4), (4, 5), (5, 4), (5, 5)] {
    g.insert(Vec3::new(gx as f32, 5.0, gz as f32), UP, 2);
  }

  let mesh = build_chunk(&g, &full_rect());
  assert_eq!(mesh.vertices.len(), 104);

  // Floor pass is unchanged (first layers only); wall pass adds one quad
  // per +X pair with two layers on both sides: (4,4)-(5,4) and (4,5)-(5,5).
  assert_eq!(mesh.triangle_count(), 162 + 4);
}

#[test]
fn three_corner_fallback_keeps_edge_coverage() {
  let mut g = SpatialHitGrid::new(1.0, 20);
  // One 2x2 block with a missing corner.
  g.insert(Vec3::new(0.0, 0.0, 0.0), UP, 1);
  g.insert(Vec3::new(1.0, 0.0, 0.0), UP, 1);
  g.insert(Vec3::new(0.0, 0.0, 1.0), UP, 1);

  let rect = ChunkRect {
    index: 0,
    min_gx: 0,
    max_gx: 1,
    min_gz: 0,
    max_gz: 1,
  };
  let mesh = build_chunk(&g, &rect);

  assert_eq!(mesh.vertices.len(), 3);
  assert_eq!(mesh.triangle_count(), 1);
}

#[test]
fn two_present_corners_emit_nothing() {
  let mut g = SpatialHitGrid::new(1.0, 20);
  g.insert(Vec3::new(0.0, 0.0, 0.0), UP, 1);
  g.insert(Vec3::new(1.0, 0.0, 1.0), UP, 1);

  let rect = ChunkRect {
    index: 0,
    min_gx: 0,
    max_gx: 1,
    min_gz: 0,
    max_gz: 1,
  };
  let mesh = build_chunk(&g, &rect);
  assert_eq!(mesh.triangle_count(), 0);
}

#[test]
fn indices_always_reference_valid_vertices() {
  let mut g = flat_grid();
  // Sprinkle extra layers to exercise the wall pass.
  for gx in 2..7 {
    g.insert(Vec3::new(gx as f32, 6.0, 3.0), UP, 3);
    g.insert(Vec3::new(gx as f32, 12.0, 3.0), UP, 3);
  }

  let mesh = build_chunk(&g, &full_rect());
  let count = mesh.vertices.len() as u32;
  assert!(count > 0);
  for &idx in &mesh.indices {
    assert!(idx < count, "index {idx} out of range {count}");
  }
  assert_eq!(mesh.indices.len() % 3, 0);
}

#[test]
fn heightmap_is_idempotent() {
  let g = flat_grid();
  let a = build_heightmap(&g, "r1");
  let b = build_heightmap(&g, "r1");

  assert_eq!(a.width, 10);
  assert_eq!(a.height, 10);
  assert_eq!(a.heights, b.heights);
  assert_eq!(a.origin_x, b.origin_x);
}

#[test]
fn heightmap_uses_sentinel_for_unvisited_columns() {
  let mut g = SpatialHitGrid::new(1.0, 20);
  g.insert(Vec3::new(0.0, 3.0, 0.0), UP, 1);
  g.insert(Vec3::new(2.0, 1.0, 2.0), UP, 1);

  let map = build_heightmap(&g, "r1");
  assert_eq!(map.width, 3);
  assert_eq!(map.height, 3);
  assert_eq!(map.heights[0], 3.0);
  assert_eq!(map.heights[4], map.sentinel);
  assert_eq!(map.heights[8], 1.0);
}

#[test]
fn heightmap_survives_chunk_eviction() {
  let mut g = flat_grid();
  let before = build_heightmap(&g, "r1");

  let freed = g.evict_chunk(&full_rect());
  assert_eq!(freed, 100);
  assert_eq!(g.stats().active_layers, 0);

  let after = build_heightmap(&g, "r1");
  assert_eq!(before.heights, after.heights);
  assert_eq!(before.width, after.width);
}

#[test]
fn empty_grid_builds_empty_heightmap() {
  let g = SpatialHitGrid::new(1.0, 20);
  let map = build_heightmap(&g, "r1");
  assert_eq!(map.width, 0);
  assert!(map.heights.is_empty());
}
