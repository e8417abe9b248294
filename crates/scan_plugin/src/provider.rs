//! SurfaceQueryProvider - the external geometry intersection capability.
//!
//! The scheduler never sees the geometry backend directly; everything it
//! knows about the world arrives through `probe`. Tests substitute a
//! deterministic fixture provider.

use glam::Vec3;

use crate::types::SurfaceHit;

/// Collision channel mask passed through to the backend unfiltered.
pub const DEFAULT_CHANNEL_MASK: u32 = u32::MAX;

/// Line-segment intersection query against the external geometry world.
pub trait SurfaceQueryProvider {
  /// Intersect the segment `origin -> target`.
  ///
  /// Returns up to `max_hits` intersections ordered nearest-first from
  /// `origin`, or an empty list when nothing is hit. An empty result is
  /// not an error - it simply contributes no samples.
  fn probe(&self, origin: Vec3, target: Vec3, max_hits: u32, channel_mask: u32) -> Vec<SurfaceHit>;
}

/// Blanket impl for boxed trait objects.
impl SurfaceQueryProvider for Box<dyn SurfaceQueryProvider> {
  fn probe(&self, origin: Vec3, target: Vec3, max_hits: u32, channel_mask: u32) -> Vec<SurfaceHit> {
    (**self).probe(origin, target, max_hits, channel_mask)
  }
}
