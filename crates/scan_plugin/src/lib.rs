//! scan_plugin - engine-independent incremental world scanning
//!
//! This crate converts a sparse stream of ray-probe surface samples into a
//! bounded-memory triangle mesh and heightmap, under a strict per-tick
//! compute budget so the host process is never blocked for more than a
//! small time slice.
//!
//! # Features
//!
//! - **Spatial Hit Grid**: sparse column store with a per-column layer cap,
//!   vertical dedup, and a loss-free minimum-height index that survives
//!   chunk eviction
//! - **Chunk Mesher**: floor/wall triangulation of rectangular column
//!   ranges into flat vertex/index buffers
//! - **Scan Scheduler**: resumable, ray-budgeted vertical + horizontal
//!   sweep state machine, with a streaming variant that completes and
//!   evicts one chunk at a time
//! - **Export stage**: JSON heightmap/chunk/manifest artifacts pushed to an
//!   asynchronous object-store sink
//!
//! # Example
//!
//! ```ignore
//! use scan_plugin::{RegionBounds, ScanController};
//!
//! let mut controller = ScanController::new(sink);
//! controller.set_region(RegionBounds { /* ... */ });
//! controller.start(Some("standard"))?;
//!
//! // Host driver loop: one budgeted tick per frame.
//! loop {
//!     let report = controller.tick(&provider)?;
//!     if report.finished {
//!         break;
//!     }
//! }
//! ```

pub mod types;
pub use types::{ChunkMesh, ColumnExtent, MaterialId, ScanVertex, SurfaceHit, VERTEX_STRIDE};

pub mod profile;
pub use profile::ResolutionProfile;

pub mod region;
pub use region::{ChunkRect, RegionBounds, ScanRegion, DEFAULT_CHUNK_SIZE};

// Spatial accumulation
pub mod grid;
pub use grid::{GridStats, InsertOutcome, Layer, SpatialHitGrid};

// Streaming mesh builder
pub mod mesher;
pub use mesher::{build_chunk, build_heightmap};

// External geometry capability
pub mod provider;
pub use provider::{SurfaceQueryProvider, DEFAULT_CHANNEL_MASK};

// Session state + tick-budgeted scheduler
pub mod session;
pub use session::{InteriorCandidate, ScanPhase, ScanSession, SessionCounters};

pub mod scheduler;
pub use scheduler::{advance_tick, TickReport, UPLOAD_WAIT_LIMIT_TICKS};

// Artifact export
pub mod export;
pub use export::{
  object_key, ArtifactKind, ChunkArtifact, ExportCompletion, ExportError, ExportSink, ExportStage,
  HeightmapArtifact, ManifestArtifact, HEIGHT_SENTINEL,
};

// Command surface
pub mod control;
pub use control::{CommandError, ControlConfig, ScanController, StatusReport};

#[cfg(test)]
pub mod test_utils;
