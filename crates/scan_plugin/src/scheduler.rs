//! Scan Scheduler - the tick-budgeted, resumable sweep state machine.
//!
//! ```text
//!                 whole-region mode
//!   Idle ──► VerticalSweep ──► HorizontalSweep ──► Exporting ──► Complete
//!
//!                 streaming mode (per chunk)
//!   Idle ──► ┌► VerticalSweep ──► HorizontalSweep ──► Exporting(chunk) ─┐
//!            └────────────────── next chunk, after evict ◄──────────────┘
//!                                              └──► Exporting(final) ──► Complete
//! ```
//!
//! Each call to [`advance_tick`] consumes at most the profile's ray budget
//! and persists the session cursor before returning; the tick boundary is
//! the only suspension point. Pause is sampled at tick entry only - a tick
//! in flight always runs its budget to the end.

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::export::{object_key, ArtifactKind, ChunkArtifact, ExportSink, ExportStage, ManifestArtifact};
use crate::grid::{InsertOutcome, SpatialHitGrid};
use crate::mesher;
use crate::provider::{SurfaceQueryProvider, DEFAULT_CHANNEL_MASK};
use crate::session::{InteriorCandidate, ScanPhase, ScanSession};
use crate::types::SurfaceHit;

/// Ticks the scheduler waits for outstanding uploads at session end before
/// proceeding anyway.
pub const UPLOAD_WAIT_LIMIT_TICKS: u32 = 120;

/// Horizontal probe directions: 4 cardinal + 4 diagonal, unit length.
const HORIZONTAL_DIRECTIONS: [(f32, f32); 8] = {
  const D: f32 = std::f32::consts::FRAC_1_SQRT_2;
  [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (D, D),
    (D, -D),
    (-D, D),
    (-D, -D),
  ]
};

/// Horizontal probe length as a multiple of the grid spacing.
const HORIZONTAL_PROBE_SPACINGS: f32 = 3.0;

/// Interior-candidate window pad as a multiple of the grid spacing.
const CANDIDATE_PAD_SPACINGS: f32 = 2.0;

/// What one tick did.
#[derive(Clone, Copy, Debug)]
pub struct TickReport {
  /// Rays consumed this tick (never exceeds the budget).
  pub rays_cast: u32,

  /// Phase after the tick.
  pub phase: ScanPhase,

  /// True once the session reached `Complete`.
  pub finished: bool,
}

/// Run one scheduler tick.
///
/// Polls upload completions, then spends the ray budget on the current
/// phase. All cursor state lives in `session`; calling again resumes
/// exactly where this tick stopped.
pub fn advance_tick<P: SurfaceQueryProvider>(
  session: &mut ScanSession,
  grid: &mut SpatialHitGrid,
  provider: &P,
  stage: &mut ExportStage,
  sink: &mut dyn ExportSink,
) -> TickReport {
  // Uploads resolve out-of-band; drain whatever arrived since last tick.
  stage.poll();

  if session.paused || !session.is_running() {
    return TickReport {
      rays_cast: 0,
      phase: session.phase,
      finished: session.phase == ScanPhase::Complete,
    };
  }

  let budget = session.profile.max_rays_per_tick;
  let mut rays: u32 = 0;

  'tick: loop {
    match session.phase {
      ScanPhase::Idle | ScanPhase::Complete => break 'tick,

      ScanPhase::VerticalSweep => {
        if rays >= budget {
          break 'tick;
        }
        match scope_column(session) {
          Some((gx, gz)) => {
            probe_column(session, grid, provider, gx, gz);
            rays += 1;
            session.column_cursor += 1;
            session.counters.cells_completed += 1;
          }
          None => {
            let wants_interior =
              session.profile.interior_passes_enabled && !session.candidates.is_empty();
            session.height_cursor = 0;
            session.candidate_cursor = 0;
            session.phase = if wants_interior {
              ScanPhase::HorizontalSweep
            } else {
              ScanPhase::Exporting
            };
            debug!(
              phase = ?session.phase,
              candidates = session.candidates.len(),
              "vertical sweep done"
            );
          }
        }
      }

      ScanPhase::HorizontalSweep => {
        if session.height_cursor >= session.height_steps() {
          session.phase = ScanPhase::Exporting;
          debug!("horizontal sweep done");
          continue;
        }
        if session.candidate_cursor >= session.candidates.len() {
          session.candidate_cursor = 0;
          session.height_cursor += 1;
          continue;
        }

        let candidate = session.candidates[session.candidate_cursor];
        let y = session.height_at(session.height_cursor);
        let pad = CANDIDATE_PAD_SPACINGS * session.region.spacing;
        if y < candidate.min_y - pad || y > candidate.max_y + pad {
          // Out-of-window pairs are skipped without touching the budget.
          session.candidate_cursor += 1;
          continue;
        }

        // The 8-probe group is atomic against the budget.
        if rays + HORIZONTAL_DIRECTIONS.len() as u32 > budget {
          break 'tick;
        }
        probe_interior(session, grid, provider, &candidate, y);
        rays += HORIZONTAL_DIRECTIONS.len() as u32;
        session.candidate_cursor += 1;
      }

      ScanPhase::Exporting => {
        if session.chunk_cursor < session.chunks.len() {
          export_current_chunk(session, grid, stage, sink);
          // One chunk per tick bounds serialization cost.
          break 'tick;
        }

        if !session.heightmap_submitted {
          let artifact = mesher::build_heightmap(grid, &session.region_id);
          submit(session, stage, sink, ArtifactKind::Heightmap, &artifact);
          session.heightmap_submitted = true;
          break 'tick;
        }

        if !session.manifest_submitted {
          let artifact = build_manifest(session, grid);
          submit(session, stage, sink, ArtifactKind::Manifest, &artifact);
          session.manifest_submitted = true;
          break 'tick;
        }

        // Bounded wait for outstanding uploads, polled once per tick.
        if stage.is_idle() {
          finish(session);
        } else {
          session.upload_wait_ticks += 1;
          if session.upload_wait_ticks >= UPLOAD_WAIT_LIMIT_TICKS {
            warn!(
              pending = stage.pending(),
              "upload wait limit reached; completing with uploads outstanding"
            );
            finish(session);
          }
        }
        break 'tick;
      }
    }
  }

  session.counters.rays_cast += rays as u64;

  TickReport {
    rays_cast: rays,
    phase: session.phase,
    finished: session.phase == ScanPhase::Complete,
  }
}

/// Column under the cursor: the current chunk's in streaming mode, the
/// whole region's otherwise.
fn scope_column(session: &ScanSession) -> Option<(i32, i32)> {
  if session.profile.streaming_enabled {
    session
      .chunks
      .get(session.chunk_cursor)?
      .column_at(session.column_cursor)
  } else {
    session.region.column_at(session.column_cursor)
  }
}

/// One top-down probe through a column, plus interior-candidate detection.
fn probe_column<P: SurfaceQueryProvider>(
  session: &mut ScanSession,
  grid: &mut SpatialHitGrid,
  provider: &P,
  gx: i32,
  gz: i32,
) {
  let (x, z) = session.region.column_center(gx, gz);
  let margin = session.profile.vertical_step;
  let origin = Vec3::new(x, session.region.scan_top + margin, z);
  let target = Vec3::new(x, session.region.scan_bottom - margin, z);

  let hits = provider.probe(
    origin,
    target,
    session.profile.topdown_max_hits,
    DEFAULT_CHANNEL_MASK,
  );
  record_hits(session, grid, &hits);

  if !session.profile.interior_passes_enabled {
    return;
  }
  if grid.layer_count((gx, gz)) < 2 {
    // Open terrain never needs the horizontal pass.
    return;
  }

  let layers = grid.layers((gx, gz)).unwrap_or(&[]);
  let mut min_y = f32::INFINITY;
  let mut max_y = f32::NEG_INFINITY;
  for layer in layers {
    min_y = min_y.min(layer.position.y);
    max_y = max_y.max(layer.position.y);
  }
  session.candidates.push(InteriorCandidate {
    gx,
    gz,
    x,
    z,
    min_y,
    max_y,
  });
}

/// 8 fixed-length horizontal probes from a candidate's column center.
fn probe_interior<P: SurfaceQueryProvider>(
  session: &mut ScanSession,
  grid: &mut SpatialHitGrid,
  provider: &P,
  candidate: &InteriorCandidate,
  y: f32,
) {
  let length = HORIZONTAL_PROBE_SPACINGS * session.region.spacing;
  let origin = Vec3::new(candidate.x, y, candidate.z);
  for (dx, dz) in HORIZONTAL_DIRECTIONS {
    let target = origin + Vec3::new(dx * length, 0.0, dz * length);
    let hits = provider.probe(origin, target, session.profile.topdown_max_hits, DEFAULT_CHANNEL_MASK);
    record_hits(session, grid, &hits);
  }
}

fn record_hits(session: &mut ScanSession, grid: &mut SpatialHitGrid, hits: &[SurfaceHit]) {
  for hit in hits {
    match grid.insert(hit.position, hit.normal, hit.material) {
      InsertOutcome::Retained => session.counters.hits_retained += 1,
      InsertOutcome::CapacityDropped => session.counters.hits_dropped += 1,
      InsertOutcome::Duplicate => {}
    }
  }
}

/// Build, submit and (in streaming mode) evict the chunk under the cursor.
fn export_current_chunk(
  session: &mut ScanSession,
  grid: &mut SpatialHitGrid,
  stage: &mut ExportStage,
  sink: &mut dyn ExportSink,
) {
  let rect = session.chunks[session.chunk_cursor];
  let mesh = mesher::build_chunk(grid, &rect);

  if mesh.is_empty() {
    debug!(chunk = rect.index, "chunk has no geometry; skipping export");
  } else {
    let artifact =
      ChunkArtifact::from_mesh(&session.region_id, rect.index, session.region.spacing, &mesh);
    submit(session, stage, sink, ArtifactKind::Chunk(rect.index), &artifact);
    session.chunks_exported += 1;
  }

  if session.profile.streaming_enabled {
    let freed = grid.evict_chunk(&rect);
    session.counters.hits_evicted += freed as u64;
    session.candidates.clear();
    session.column_cursor = 0;
    session.height_cursor = 0;
    session.candidate_cursor = 0;
    debug!(chunk = rect.index, freed, "chunk evicted");
    session.chunk_cursor += 1;
    if session.chunk_cursor < session.chunks.len() {
      session.phase = ScanPhase::VerticalSweep;
    }
  } else {
    session.chunk_cursor += 1;
  }
}

fn submit<T: serde::Serialize>(
  session: &ScanSession,
  stage: &mut ExportStage,
  sink: &mut dyn ExportSink,
  kind: ArtifactKind,
  artifact: &T,
) {
  let key = object_key(
    &session.export_prefix,
    &session.region_id,
    session.profile.name,
    kind,
  );
  if let Err(err) = stage.submit(sink, key, artifact) {
    warn!(error = %err, "artifact submission failed");
  }
}

fn build_manifest(session: &ScanSession, grid: &SpatialHitGrid) -> ManifestArtifact {
  let stats = grid.stats();
  let timestamp_unix = web_time::SystemTime::now()
    .duration_since(web_time::UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);

  ManifestArtifact {
    region_id: session.region_id.clone(),
    profile: session.profile.name.to_string(),
    min_x: session.region.min_x,
    max_x: session.region.max_x,
    min_z: session.region.min_z,
    max_z: session.region.max_z,
    scan_top: session.region.scan_top,
    scan_bottom: session.region.scan_bottom,
    spacing: session.region.spacing,
    rays_cast: session.counters.rays_cast,
    hits_retained: session.counters.hits_retained,
    hits_dropped: session.counters.hits_dropped,
    hits_deduped: stats.total_deduped,
    hits_evicted: session.counters.hits_evicted,
    cells_observed: stats.cells_created,
    multi_layer_cells: stats.multi_layer_cells,
    peak_layers: stats.peak_layers,
    chunk_count: session.chunks_exported,
    elapsed_seconds: session.elapsed_seconds(),
    timestamp_unix,
  }
}

fn finish(session: &mut ScanSession) {
  session.phase = ScanPhase::Complete;
  info!(
    region = %session.region_id,
    rays = session.counters.rays_cast,
    retained = session.counters.hits_retained,
    chunks = session.chunks_exported,
    elapsed_s = session.elapsed_seconds(),
    "scan complete"
  );
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
