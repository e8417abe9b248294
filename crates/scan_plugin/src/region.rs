//! ScanRegion - the bounded rectangle one scan session sweeps.
//!
//! Columns are quantized world coordinates (`round(coord / spacing)`), so a
//! column address is stable across probes regardless of where inside the
//! cell a hit lands. Chunks tile the column range exactly, with no gaps or
//! overlaps; the last row/column of chunks may be smaller than the default
//! chunk size.

use crate::profile::ResolutionProfile;

/// Default chunk edge length in columns.
pub const DEFAULT_CHUNK_SIZE: i32 = 64;

/// Raw region geometry as supplied by the control surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionBounds {
  pub min_x: f32,
  pub max_x: f32,
  pub min_z: f32,
  pub max_z: f32,
  pub scan_top: f32,
  pub scan_bottom: f32,
}

/// Immutable per-session scan geometry with resolved grid spacing.
#[derive(Clone, Debug)]
pub struct ScanRegion {
  pub min_x: f32,
  pub max_x: f32,
  pub min_z: f32,
  pub max_z: f32,
  pub scan_top: f32,
  pub scan_bottom: f32,

  /// Meters per grid column, resolved from the profile and region width.
  pub spacing: f32,
}

impl ScanRegion {
  /// Derive a region from raw bounds and the active profile.
  pub fn from_bounds(bounds: RegionBounds, profile: &ResolutionProfile) -> Self {
    let width = bounds.max_x - bounds.min_x;
    Self {
      min_x: bounds.min_x,
      max_x: bounds.max_x,
      min_z: bounds.min_z,
      max_z: bounds.max_z,
      scan_top: bounds.scan_top,
      scan_bottom: bounds.scan_bottom,
      spacing: profile.resolved_spacing(width),
    }
  }

  pub fn width(&self) -> f32 {
    self.max_x - self.min_x
  }

  pub fn depth(&self) -> f32 {
    self.max_z - self.min_z
  }

  /// Quantize a world coordinate to a column ordinate.
  #[inline]
  pub fn quantize(&self, coord: f32) -> i32 {
    (coord / self.spacing).round() as i32
  }

  /// Inclusive column bounds (min_gx, max_gx, min_gz, max_gz).
  pub fn column_bounds(&self) -> (i32, i32, i32, i32) {
    (
      self.quantize(self.min_x),
      self.quantize(self.max_x),
      self.quantize(self.min_z),
      self.quantize(self.max_z),
    )
  }

  /// Total columns in the region.
  pub fn column_count(&self) -> u64 {
    let (min_gx, max_gx, min_gz, max_gz) = self.column_bounds();
    (max_gx - min_gx + 1) as u64 * (max_gz - min_gz + 1) as u64
  }

  /// Column at a flat cursor index, X varying fastest. `None` past the end.
  pub fn column_at(&self, index: u64) -> Option<(i32, i32)> {
    let (min_gx, max_gx, min_gz, max_gz) = self.column_bounds();
    let width = (max_gx - min_gx + 1) as u64;
    let depth = (max_gz - min_gz + 1) as u64;
    if index >= width * depth {
      return None;
    }
    let gx = min_gx + (index % width) as i32;
    let gz = min_gz + (index / width) as i32;
    Some((gx, gz))
  }

  /// World-space center of a column.
  #[inline]
  pub fn column_center(&self, gx: i32, gz: i32) -> (f32, f32) {
    (gx as f32 * self.spacing, gz as f32 * self.spacing)
  }

  /// Tile the full column range into chunks of at most `chunk_size` columns
  /// per edge. Chunks are indexed row-major (X fastest).
  pub fn chunks(&self, chunk_size: i32) -> Vec<ChunkRect> {
    let (min_gx, max_gx, min_gz, max_gz) = self.column_bounds();
    let mut out = Vec::new();
    let mut index = 0;
    let mut gz = min_gz;
    while gz <= max_gz {
      let top = (gz + chunk_size - 1).min(max_gz);
      let mut gx = min_gx;
      while gx <= max_gx {
        let right = (gx + chunk_size - 1).min(max_gx);
        out.push(ChunkRect {
          index,
          min_gx: gx,
          max_gx: right,
          min_gz: gz,
          max_gz: top,
        });
        index += 1;
        gx = right + 1;
      }
      gz = top + 1;
    }
    out
  }
}

/// One rectangular tile of columns, processed and exported as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRect {
  /// Stable chunk index within the session, used in artifact keys.
  pub index: usize,

  pub min_gx: i32,
  pub max_gx: i32,
  pub min_gz: i32,
  pub max_gz: i32,
}

impl ChunkRect {
  #[inline]
  pub fn contains(&self, gx: i32, gz: i32) -> bool {
    gx >= self.min_gx && gx <= self.max_gx && gz >= self.min_gz && gz <= self.max_gz
  }

  /// Columns in this chunk.
  pub fn column_count(&self) -> u64 {
    (self.max_gx - self.min_gx + 1) as u64 * (self.max_gz - self.min_gz + 1) as u64
  }

  /// Column at a flat cursor index local to this chunk, X varying fastest.
  pub fn column_at(&self, index: u64) -> Option<(i32, i32)> {
    let width = (self.max_gx - self.min_gx + 1) as u64;
    if index >= self.column_count() {
      return None;
    }
    let gx = self.min_gx + (index % width) as i32;
    let gz = self.min_gz + (index / width) as i32;
    Some((gx, gz))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region(span: f32, spacing_base: f32) -> ScanRegion {
    let profile = ResolutionProfile {
      grid_spacing_base: spacing_base,
      scale_with_region: false,
      ..ResolutionProfile::STANDARD
    };
    ScanRegion::from_bounds(
      RegionBounds {
        min_x: 0.0,
        max_x: span,
        min_z: 0.0,
        max_z: span,
        scan_top: 100.0,
        scan_bottom: -10.0,
      },
      &profile,
    )
  }

  #[test]
  fn quantization_rounds_to_nearest_column() {
    let r = region(10.0, 2.0);
    assert_eq!(r.quantize(0.0), 0);
    assert_eq!(r.quantize(0.9), 0);
    assert_eq!(r.quantize(1.1), 1);
    assert_eq!(r.quantize(-1.1), -1);
  }

  #[test]
  fn column_cursor_covers_all_columns_once() {
    let r = region(9.0, 1.0);
    let total = r.column_count();
    assert_eq!(total, 100);

    let mut seen = std::collections::HashSet::new();
    for i in 0..total {
      assert!(seen.insert(r.column_at(i).unwrap()));
    }
    assert_eq!(r.column_at(total), None);
  }

  #[test]
  fn chunks_tile_exactly_without_overlap() {
    // 100x100 columns with chunk size 64 exercises the short last row/column.
    let r = region(99.0, 1.0);
    let chunks = r.chunks(DEFAULT_CHUNK_SIZE);
    assert_eq!(chunks.len(), 4);

    let (min_gx, max_gx, min_gz, max_gz) = r.column_bounds();
    for gx in min_gx..=max_gx {
      for gz in min_gz..=max_gz {
        let owners = chunks.iter().filter(|c| c.contains(gx, gz)).count();
        assert_eq!(owners, 1, "column ({gx},{gz}) owned by {owners} chunks");
      }
    }

    let covered: u64 = chunks.iter().map(|c| c.column_count()).sum();
    assert_eq!(covered, r.column_count());
  }

  #[test]
  fn chunk_indices_are_stable_and_dense() {
    let r = region(99.0, 1.0);
    let chunks = r.chunks(32);
    for (i, chunk) in chunks.iter().enumerate() {
      assert_eq!(chunk.index, i);
    }
  }

  #[test]
  fn chunk_local_cursor() {
    let r = region(9.0, 1.0);
    let chunks = r.chunks(4);
    let first = &chunks[0];
    assert_eq!(first.column_at(0), Some((first.min_gx, first.min_gz)));
    assert_eq!(first.column_at(first.column_count()), None);
  }
}
