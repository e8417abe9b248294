//! ScanSession - mutable run state for one scan.
//!
//! The session is explicitly owned by the controller and handed to the
//! scheduler each tick; there is no ambient global. Every cursor field is
//! fully persisted before a tick returns, so the next tick resumes exactly
//! where the previous one left off.

use web_time::Instant;

use crate::profile::ResolutionProfile;
use crate::region::{ChunkRect, ScanRegion};

/// Scheduler phase. `Idle` is both initial and terminal-between-runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPhase {
  Idle,
  VerticalSweep,
  HorizontalSweep,
  Exporting,
  Complete,
}

/// Column found to have multiple vertical surfaces during the vertical
/// sweep; drives the horizontal pass over its observed Y range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteriorCandidate {
  pub gx: i32,
  pub gz: i32,
  /// World-space column center.
  pub x: f32,
  pub z: f32,
  /// Y range of the column's accepted layers.
  pub min_y: f32,
  pub max_y: f32,
}

/// Accumulated per-session counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionCounters {
  pub rays_cast: u64,
  pub hits_retained: u64,
  pub hits_dropped: u64,
  pub hits_evicted: u64,
  /// Columns whose vertical probe has completed. Monotone, never exceeds
  /// `cells_expected`.
  pub cells_completed: u64,
  pub cells_expected: u64,
}

/// Run state for one scan: phase, resumable cursor, counters.
pub struct ScanSession {
  pub region: ScanRegion,
  pub profile: ResolutionProfile,
  pub region_id: String,

  /// Object-key prefix, snapshotted from the controller config at start.
  pub export_prefix: String,

  pub phase: ScanPhase,
  pub paused: bool,

  /// Chunk tiling, fixed at session start.
  pub chunks: Vec<ChunkRect>,

  // Resumable cursor. The tick boundary is the only suspension point.
  pub column_cursor: u64,
  pub height_cursor: u32,
  pub candidate_cursor: usize,
  pub chunk_cursor: usize,
  pub heightmap_submitted: bool,
  pub manifest_submitted: bool,
  pub upload_wait_ticks: u32,

  /// Candidates for the horizontal sweep. In streaming mode this holds
  /// only the current chunk's candidates and is cleared at chunk export.
  pub candidates: Vec<InteriorCandidate>,

  /// Chunks actually submitted (empty chunks are skipped).
  pub chunks_exported: usize,

  pub counters: SessionCounters,
  pub started_at: Instant,
}

impl ScanSession {
  pub fn new(
    region: ScanRegion,
    profile: ResolutionProfile,
    region_id: String,
    export_prefix: String,
    chunk_size: i32,
  ) -> Self {
    let chunks = region.chunks(chunk_size);
    let cells_expected = region.column_count();
    Self {
      region,
      profile,
      region_id,
      export_prefix,
      phase: ScanPhase::Idle,
      paused: false,
      chunks,
      column_cursor: 0,
      height_cursor: 0,
      candidate_cursor: 0,
      chunk_cursor: 0,
      heightmap_submitted: false,
      manifest_submitted: false,
      upload_wait_ticks: 0,
      candidates: Vec::new(),
      chunks_exported: 0,
      counters: SessionCounters {
        cells_expected,
        ..SessionCounters::default()
      },
      started_at: Instant::now(),
    }
  }

  /// Completed-cell ratio in [0, 1].
  pub fn progress(&self) -> f32 {
    if self.counters.cells_expected == 0 {
      return 0.0;
    }
    self.counters.cells_completed as f32 / self.counters.cells_expected as f32
  }

  pub fn elapsed_seconds(&self) -> f64 {
    self.started_at.elapsed().as_secs_f64()
  }

  /// Number of horizontal-sweep probe heights over the region's Y range.
  pub fn height_steps(&self) -> u32 {
    let span = self.region.scan_top - self.region.scan_bottom;
    if span <= 0.0 {
      return 1;
    }
    (span / self.profile.interior_step_y).floor() as u32 + 1
  }

  /// Probe height for a height cursor value.
  pub fn height_at(&self, step: u32) -> f32 {
    self.region.scan_bottom + step as f32 * self.profile.interior_step_y
  }

  pub fn is_running(&self) -> bool {
    !matches!(self.phase, ScanPhase::Idle | ScanPhase::Complete)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::RegionBounds;

  fn session() -> ScanSession {
    let profile = ResolutionProfile {
      scale_with_region: false,
      grid_spacing_base: 1.0,
      interior_step_y: 4.0,
      ..ResolutionProfile::STANDARD
    };
    let region = ScanRegion::from_bounds(
      RegionBounds {
        min_x: 0.0,
        max_x: 9.0,
        min_z: 0.0,
        max_z: 9.0,
        scan_top: 20.0,
        scan_bottom: -4.0,
      },
      &profile,
    );
    ScanSession::new(region, profile, "r1".to_string(), "scans".to_string(), 64)
  }

  #[test]
  fn expected_cells_match_region() {
    let s = session();
    assert_eq!(s.counters.cells_expected, 100);
    assert_eq!(s.chunks.len(), 1);
    assert_eq!(s.progress(), 0.0);
  }

  #[test]
  fn height_steps_cover_the_vertical_range() {
    let s = session();
    // Span 24, step 4: heights -4, 0, 4, 8, 12, 16, 20.
    assert_eq!(s.height_steps(), 7);
    assert_eq!(s.height_at(0), -4.0);
    assert_eq!(s.height_at(6), 20.0);
  }
}
