//! Core data types shared by the scan grid, mesher and scheduler.

use glam::Vec3;

/// Material tag attached to a surface sample.
pub type MaterialId = u8;

/// Number of floats per vertex in exported chunk buffers:
/// x, y, z, nx, ny, nz, material.
pub const VERTEX_STRIDE: usize = 7;

/// One surface intersection returned by a probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
  /// World-space hit position.
  pub position: Vec3,

  /// Surface normal at the hit (unit vector).
  pub normal: Vec3,

  /// Material tag reported by the geometry backend.
  pub material: MaterialId,
}

impl SurfaceHit {
  pub fn new(position: Vec3, normal: Vec3, material: MaterialId) -> Self {
    Self {
      position,
      normal,
      material,
    }
  }
}

/// Output vertex with all mesh attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanVertex {
  /// World-space position.
  pub position: [f32; 3],

  /// Surface normal (unit vector).
  pub normal: [f32; 3],

  /// Material tag carried through to the flat buffer.
  pub material: MaterialId,
}

impl ScanVertex {
  /// Append this vertex to a flat float buffer (stride [`VERTEX_STRIDE`]).
  pub fn write_flat(&self, out: &mut Vec<f32>) {
    out.extend_from_slice(&self.position);
    out.extend_from_slice(&self.normal);
    out.push(self.material as f32);
  }
}

/// Mesh build result for one chunk.
#[derive(Default)]
pub struct ChunkMesh {
  /// Output vertices, one per retained layer in range.
  pub vertices: Vec<ScanVertex>,

  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,
}

impl ChunkMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Axis-aligned bounding rectangle over grid columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnExtent {
  pub min_gx: i32,
  pub max_gx: i32,
  pub min_gz: i32,
  pub max_gz: i32,
}

impl ColumnExtent {
  /// Create an extent with inverted bounds (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min_gx: i32::MAX,
      max_gx: i32::MIN,
      min_gz: i32::MAX,
      max_gz: i32::MIN,
    }
  }

  /// Expand the extent to include a column.
  #[inline]
  pub fn encapsulate(&mut self, gx: i32, gz: i32) {
    self.min_gx = self.min_gx.min(gx);
    self.max_gx = self.max_gx.max(gx);
    self.min_gz = self.min_gz.min(gz);
    self.max_gz = self.max_gz.max(gz);
  }

  /// Check if any column was ever encapsulated.
  pub fn is_valid(&self) -> bool {
    self.min_gx <= self.max_gx && self.min_gz <= self.max_gz
  }

  /// Column count along X (0 for an empty extent).
  pub fn width(&self) -> u32 {
    if self.is_valid() {
      (self.max_gx - self.min_gx + 1) as u32
    } else {
      0
    }
  }

  /// Column count along Z (0 for an empty extent).
  pub fn depth(&self) -> u32 {
    if self.is_valid() {
      (self.max_gz - self.min_gz + 1) as u32
    } else {
      0
    }
  }
}

impl Default for ColumnExtent {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
