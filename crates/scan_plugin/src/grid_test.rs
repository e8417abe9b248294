use glam::Vec3;

use super::*;

const UP: Vec3 = Vec3::Y;

fn grid() -> SpatialHitGrid {
  SpatialHitGrid::new(1.0, 20)
}

fn insert_at(g: &mut SpatialHitGrid, x: f32, y: f32, z: f32) -> InsertOutcome {
  g.insert(Vec3::new(x, y, z), UP, 1)
}

#[test]
fn layer_cap_is_never_exceeded() {
  let mut g = grid();

  // 25 well-separated samples into one column, cap 20.
  for i in 0..25 {
    insert_at(&mut g, 0.0, i as f32 * 5.0, 0.0);
  }

  let stats = g.stats();
  assert_eq!(g.layer_count((0, 0)), 20);
  assert_eq!(stats.total_retained, 20);
  assert_eq!(stats.total_dropped, 5);
  assert_eq!(stats.peak_layers, 20);
}

#[test]
fn height_index_tracks_minimum_through_drops_and_dedup() {
  let mut g = SpatialHitGrid::new(1.0, 3);

  let ys = [10.0, 4.0, 4.1, 7.0, 30.0, -5.0];
  for y in ys {
    insert_at(&mut g, 0.0, y, 0.0);
  }

  // 4.1 deduped against 4.0; 30.0 and -5.0 dropped at the cap of 3.
  assert_eq!(g.layer_count((0, 0)), 3);
  assert_eq!(g.min_height((0, 0)), Some(-5.0));
}

#[test]
fn close_samples_deduplicate_to_one_layer() {
  let mut g = grid();

  assert_eq!(insert_at(&mut g, 0.0, 1.0, 0.0), InsertOutcome::Retained);
  // |dy| = 0.4 < spacing/2 = 0.5
  assert_eq!(insert_at(&mut g, 0.0, 1.4, 0.0), InsertOutcome::Duplicate);
  // |dy| = 0.5 is not within the open epsilon, so it is a new surface.
  assert_eq!(insert_at(&mut g, 0.0, 0.5, 0.0), InsertOutcome::Retained);

  assert_eq!(g.layer_count((0, 0)), 2);
  assert_eq!(g.stats().total_deduped, 1);
}

#[test]
fn quantization_routes_hits_to_nearest_column() {
  let mut g = SpatialHitGrid::new(2.0, 20);

  insert_at(&mut g, 0.9, 0.0, 0.0);
  insert_at(&mut g, 1.1, 5.0, 0.0);

  assert_eq!(g.layer_count((0, 0)), 1);
  assert_eq!(g.layer_count((1, 0)), 1);
}

#[test]
fn multi_layer_cells_counted_once() {
  let mut g = grid();

  for y in [0.0, 5.0, 10.0] {
    insert_at(&mut g, 0.0, y, 0.0);
  }
  insert_at(&mut g, 3.0, 0.0, 0.0);

  let stats = g.stats();
  assert_eq!(stats.cells_created, 2);
  assert_eq!(stats.multi_layer_cells, 1);
  assert_eq!(stats.peak_layers, 3);
}

#[test]
fn eviction_frees_layers_but_not_heights() {
  let mut g = grid();

  for gx in 0..4 {
    for gz in 0..4 {
      insert_at(&mut g, gx as f32, 0.0, gz as f32);
      insert_at(&mut g, gx as f32, 5.0, gz as f32);
    }
  }
  let before = g.stats();
  assert_eq!(before.active_layers, 32);

  let rect = ChunkRect {
    index: 0,
    min_gx: 0,
    max_gx: 1,
    min_gz: 0,
    max_gz: 3,
  };
  let freed = g.evict_chunk(&rect);

  assert_eq!(freed, 16);
  let after = g.stats();
  assert_eq!(after.active_layers, before.active_layers - freed);
  assert_eq!(after.total_evicted, 16);

  // Height index is untouched by eviction.
  assert_eq!(g.min_height((0, 0)), Some(0.0));
  assert_eq!(g.layer_count((0, 0)), 0);
}

#[test]
fn extent_covers_every_observed_column() {
  let mut g = grid();

  insert_at(&mut g, -3.0, 0.0, 2.0);
  insert_at(&mut g, 7.0, 0.0, -1.0);

  let extent = g.extent();
  assert_eq!(extent.min_gx, -3);
  assert_eq!(extent.max_gx, 7);
  assert_eq!(extent.min_gz, -1);
  assert_eq!(extent.max_gz, 2);
}

#[test]
fn clear_discards_everything() {
  let mut g = grid();
  insert_at(&mut g, 0.0, 1.0, 0.0);

  g.clear();

  assert_eq!(g.stats().active_layers, 0);
  assert_eq!(g.min_height((0, 0)), None);
  assert!(!g.extent().is_valid());
}
