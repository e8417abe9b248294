//! Control surface - synchronous start/stop/pause/resume/configuration
//! commands around one explicitly owned session.
//!
//! Every command returns an explicit result; nothing no-ops silently. The
//! controller owns the session, grid, export stage and sink, and is the
//! only writer of any of them - the external driver just calls `tick`.

use thiserror::Error;
use tracing::{info, warn};

use crate::export::{ExportSink, ExportStage};
use crate::grid::{GridStats, SpatialHitGrid};
use crate::profile::ResolutionProfile;
use crate::provider::SurfaceQueryProvider;
use crate::region::{RegionBounds, ScanRegion, DEFAULT_CHUNK_SIZE};
use crate::scheduler::{advance_tick, TickReport};
use crate::session::{ScanPhase, ScanSession};

/// Command rejection reasons. All checked synchronously, before any state
/// mutation.
#[derive(Debug, Error)]
pub enum CommandError {
  #[error("unknown profile `{0}`")]
  UnknownProfile(String),

  #[error("a scan is already running")]
  AlreadyRunning,

  #[error("no scan is running")]
  NotRunning,

  #[error("scan is already paused")]
  AlreadyPaused,

  #[error("scan is not paused")]
  NotPaused,

  #[error("no scan region is configured")]
  NoRegion,

  #[error("cannot change profile while a scan is running")]
  ProfileLocked,

  #[error("unknown config key `{0}`")]
  UnknownConfigKey(String),

  #[error("invalid value for `{key}`: {reason}")]
  InvalidConfigValue { key: String, reason: String },
}

/// Controller configuration reachable through the config command.
#[derive(Clone, Debug)]
pub struct ControlConfig {
  /// Chunk edge length in columns.
  pub chunk_size: i32,

  /// Leading path segment of every object key.
  pub export_prefix: String,

  /// Region identifier used in object keys and artifacts.
  pub region_id: String,
}

impl Default for ControlConfig {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
      export_prefix: "scans".to_string(),
      region_id: "region".to_string(),
    }
  }
}

/// Point-in-time session/grid/export snapshot for progress reporting.
#[derive(Clone, Copy, Debug)]
pub struct StatusReport {
  pub phase: ScanPhase,
  pub paused: bool,
  pub progress: f32,
  pub rays_cast: u64,
  pub hits_retained: u64,
  pub hits_dropped: u64,
  pub hits_evicted: u64,
  pub grid: GridStats,
  pub exports_pending: usize,
  pub exports_submitted: u64,
  pub exports_failed: u64,
  pub elapsed_seconds: f64,
}

/// Single-instance owner of the active scan.
pub struct ScanController<S: ExportSink> {
  profile: &'static ResolutionProfile,
  config: ControlConfig,
  bounds: Option<RegionBounds>,
  session: Option<ScanSession>,
  grid: Option<SpatialHitGrid>,
  stage: ExportStage,
  sink: S,
}

impl<S: ExportSink> ScanController<S> {
  pub fn new(sink: S) -> Self {
    Self {
      profile: &ResolutionProfile::STANDARD,
      config: ControlConfig::default(),
      bounds: None,
      session: None,
      grid: None,
      stage: ExportStage::new(),
      sink,
    }
  }

  /// Configure the region the next scan will sweep.
  pub fn set_region(&mut self, bounds: RegionBounds) {
    self.bounds = Some(bounds);
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  pub fn sink_mut(&mut self) -> &mut S {
    &mut self.sink
  }

  fn is_running(&self) -> bool {
    self.session.as_ref().is_some_and(|s| s.is_running())
  }

  /// Start a scan, optionally overriding the configured profile for this
  /// run only.
  pub fn start(&mut self, profile_override: Option<&str>) -> Result<(), CommandError> {
    if self.is_running() {
      return Err(CommandError::AlreadyRunning);
    }
    let profile = match profile_override {
      Some(name) => ResolutionProfile::by_name(name)
        .ok_or_else(|| CommandError::UnknownProfile(name.to_string()))?,
      None => self.profile,
    };
    let bounds = self.bounds.ok_or(CommandError::NoRegion)?;

    let region = ScanRegion::from_bounds(bounds, profile);
    let grid = SpatialHitGrid::new(region.spacing, profile.max_layers_per_cell);
    let mut session = ScanSession::new(
      region,
      profile.clone(),
      self.config.region_id.clone(),
      self.config.export_prefix.clone(),
      self.config.chunk_size,
    );
    session.phase = ScanPhase::VerticalSweep;

    info!(
      region = %session.region_id,
      profile = profile.name,
      spacing = session.region.spacing,
      cells = session.counters.cells_expected,
      chunks = session.chunks.len(),
      streaming = profile.streaming_enabled,
      "scan started"
    );

    self.session = Some(session);
    self.grid = Some(grid);
    Ok(())
  }

  /// Stop the scan. Unexported in-memory grid state is discarded; a
  /// stopped scan cannot resume from a partial result.
  pub fn stop(&mut self) -> Result<(), CommandError> {
    if !self.is_running() {
      return Err(CommandError::NotRunning);
    }
    self.discard("stopped by command");
    Ok(())
  }

  pub fn pause(&mut self) -> Result<(), CommandError> {
    let session = self.session.as_mut().filter(|s| s.is_running());
    match session {
      None => Err(CommandError::NotRunning),
      Some(s) if s.paused => Err(CommandError::AlreadyPaused),
      Some(s) => {
        s.paused = true;
        info!("scan paused");
        Ok(())
      }
    }
  }

  pub fn resume(&mut self) -> Result<(), CommandError> {
    let session = self.session.as_mut().filter(|s| s.is_running());
    match session {
      None => Err(CommandError::NotRunning),
      Some(s) if !s.paused => Err(CommandError::NotPaused),
      Some(s) => {
        s.paused = false;
        info!("scan resumed");
        Ok(())
      }
    }
  }

  /// The scanned region's host context disappeared; force-stop and discard.
  pub fn environment_lost(&mut self) {
    if self.is_running() {
      warn!("scan environment lost; forcing stop");
      self.discard("environment lost");
    }
  }

  fn discard(&mut self, reason: &str) {
    if let Some(session) = self.session.take() {
      info!(
        region = %session.region_id,
        progress = session.progress(),
        reason,
        "scan discarded; unexported data is not salvaged"
      );
    }
    if let Some(grid) = self.grid.as_mut() {
      grid.clear();
    }
    self.grid = None;
  }

  /// Run one scheduler tick against the given provider.
  pub fn tick<P: SurfaceQueryProvider>(&mut self, provider: &P) -> Result<TickReport, CommandError> {
    let session = self.session.as_mut().ok_or(CommandError::NotRunning)?;
    let grid = self.grid.as_mut().ok_or(CommandError::NotRunning)?;
    Ok(advance_tick(
      session,
      grid,
      provider,
      &mut self.stage,
      &mut self.sink,
    ))
  }

  pub fn status(&self) -> StatusReport {
    let (phase, paused, progress, counters, elapsed) = match &self.session {
      Some(s) => (s.phase, s.paused, s.progress(), s.counters, s.elapsed_seconds()),
      None => (ScanPhase::Idle, false, 0.0, Default::default(), 0.0),
    };
    let grid = self
      .grid
      .as_ref()
      .map(|g| g.stats())
      .unwrap_or_default();

    StatusReport {
      phase,
      paused,
      progress,
      rays_cast: counters.rays_cast,
      hits_retained: counters.hits_retained,
      hits_dropped: counters.hits_dropped,
      hits_evicted: counters.hits_evicted,
      grid,
      exports_pending: self.stage.pending(),
      exports_submitted: self.stage.submitted(),
      exports_failed: self.stage.failed(),
      elapsed_seconds: elapsed,
    }
  }

  pub fn profile_name(&self) -> &'static str {
    self.profile.name
  }

  /// Select the default profile for future scans. Locked while running.
  pub fn set_profile(&mut self, name: &str) -> Result<(), CommandError> {
    if self.is_running() {
      return Err(CommandError::ProfileLocked);
    }
    self.profile = ResolutionProfile::by_name(name)
      .ok_or_else(|| CommandError::UnknownProfile(name.to_string()))?;
    Ok(())
  }

  pub fn config_get(&self, key: &str) -> Result<String, CommandError> {
    match key {
      "chunk_size" => Ok(self.config.chunk_size.to_string()),
      "export_prefix" => Ok(self.config.export_prefix.clone()),
      "region_id" => Ok(self.config.region_id.clone()),
      _ => Err(CommandError::UnknownConfigKey(key.to_string())),
    }
  }

  /// Set a config value. Takes effect at the next scan start; the running
  /// session keeps its snapshot.
  pub fn config_set(&mut self, key: &str, value: &str) -> Result<(), CommandError> {
    match key {
      "chunk_size" => {
        let parsed: i32 = value.parse().map_err(|_| CommandError::InvalidConfigValue {
          key: key.to_string(),
          reason: "expected an integer".to_string(),
        })?;
        if parsed <= 0 {
          return Err(CommandError::InvalidConfigValue {
            key: key.to_string(),
            reason: "must be positive".to_string(),
          });
        }
        self.config.chunk_size = parsed;
      }
      "export_prefix" => self.config.export_prefix = value.to_string(),
      "region_id" => self.config.region_id = value.to_string(),
      _ => return Err(CommandError::UnknownConfigKey(key.to_string())),
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "control_test.rs"]
mod control_test;
