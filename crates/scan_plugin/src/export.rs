//! Export artifacts, object keys and the asynchronous sink stage.
//!
//! Artifacts are JSON payloads pushed to an external object store through
//! the [`ExportSink`] capability. Uploads complete out-of-band: the sink
//! reports success/failure over a channel, and the scheduler polls the
//! stage once per tick.
//!
//! Object key scheme: `{prefix}/{region_id}/{profile}/{artifact}` with
//! artifact one of `heightmap.json`, `chunk_NNN.json`, `manifest.json`.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{ChunkMesh, VERTEX_STRIDE};

/// Height value written for columns never visited by any probe.
pub const HEIGHT_SENTINEL: f32 = -9999.0;

/// Dense minimum-height grid over the observed extent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightmapArtifact {
  pub region_id: String,
  pub spacing: f32,
  pub origin_x: f32,
  pub origin_z: f32,
  pub width: u32,
  pub height: u32,
  /// Row-major (Z rows), `height * width` floats.
  pub heights: Vec<f32>,
  pub sentinel: f32,
}

/// Flat vertex/index buffers for one exported chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkArtifact {
  pub region_id: String,
  pub chunk_index: usize,
  pub spacing: f32,
  /// Floats per vertex: x, y, z, nx, ny, nz, material.
  pub vertex_stride: usize,
  pub vertex_count: usize,
  pub index_count: usize,
  pub vertices: Vec<f32>,
  pub indices: Vec<u32>,
}

impl ChunkArtifact {
  pub fn from_mesh(region_id: &str, chunk_index: usize, spacing: f32, mesh: &ChunkMesh) -> Self {
    let mut vertices = Vec::with_capacity(mesh.vertices.len() * VERTEX_STRIDE);
    for v in &mesh.vertices {
      v.write_flat(&mut vertices);
    }
    Self {
      region_id: region_id.to_string(),
      chunk_index,
      spacing,
      vertex_stride: VERTEX_STRIDE,
      vertex_count: mesh.vertices.len(),
      index_count: mesh.indices.len(),
      vertices,
      indices: mesh.indices.clone(),
    }
  }
}

/// Scan metadata emitted once per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestArtifact {
  pub region_id: String,
  pub profile: String,
  pub min_x: f32,
  pub max_x: f32,
  pub min_z: f32,
  pub max_z: f32,
  pub scan_top: f32,
  pub scan_bottom: f32,
  pub spacing: f32,
  pub rays_cast: u64,
  pub hits_retained: u64,
  pub hits_dropped: u64,
  pub hits_deduped: u64,
  pub hits_evicted: u64,
  pub cells_observed: u64,
  pub multi_layer_cells: u64,
  pub peak_layers: usize,
  pub chunk_count: usize,
  pub elapsed_seconds: f64,
  pub timestamp_unix: u64,
}

/// The artifact slot within a session's key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
  Heightmap,
  Chunk(usize),
  Manifest,
}

impl ArtifactKind {
  pub fn file_name(&self) -> String {
    match self {
      ArtifactKind::Heightmap => "heightmap.json".to_string(),
      ArtifactKind::Chunk(index) => format!("chunk_{index:03}.json"),
      ArtifactKind::Manifest => "manifest.json".to_string(),
    }
  }
}

/// Object key for one artifact.
pub fn object_key(prefix: &str, region_id: &str, profile: &str, kind: ArtifactKind) -> String {
  format!("{prefix}/{region_id}/{profile}/{}", kind.file_name())
}

/// Export failure reported by the stage or the sink.
#[derive(Debug, Error)]
pub enum ExportError {
  #[error("sink rejected `{key}`: {reason}")]
  Rejected { key: String, reason: String },

  #[error("artifact serialization failed: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Out-of-band result of one `put_object` call.
#[derive(Debug)]
pub struct ExportCompletion {
  pub key: String,
  pub result: Result<(), ExportError>,
}

/// Asynchronous object-store capability.
///
/// Implementations take ownership of the payload and deliver exactly one
/// [`ExportCompletion`] on `done`, immediately or later from another thread.
pub trait ExportSink {
  fn put_object(&mut self, key: String, payload: Vec<u8>, done: Sender<ExportCompletion>);
}

/// Submission/completion bookkeeping around an [`ExportSink`].
///
/// Submit → poll → idle. The scheduler polls once per tick; failed uploads
/// are counted and logged but never retried - in streaming mode the source
/// samples are already evicted.
pub struct ExportStage {
  tx: Sender<ExportCompletion>,
  rx: Receiver<ExportCompletion>,
  pending: usize,
  submitted: u64,
  failed: u64,
}

impl Default for ExportStage {
  fn default() -> Self {
    Self::new()
  }
}

impl ExportStage {
  pub fn new() -> Self {
    let (tx, rx) = unbounded();
    Self {
      tx,
      rx,
      pending: 0,
      submitted: 0,
      failed: 0,
    }
  }

  /// Serialize and hand one artifact to the sink.
  pub fn submit<T: Serialize>(
    &mut self,
    sink: &mut dyn ExportSink,
    key: String,
    artifact: &T,
  ) -> Result<(), ExportError> {
    let payload = serde_json::to_vec(artifact)?;
    debug!(key = %key, bytes = payload.len(), "submitting artifact");
    sink.put_object(key, payload, self.tx.clone());
    self.pending += 1;
    self.submitted += 1;
    Ok(())
  }

  /// Drain completions delivered since the last poll. Returns how many
  /// resolved.
  pub fn poll(&mut self) -> usize {
    let mut resolved = 0;
    while let Ok(completion) = self.rx.try_recv() {
      resolved += 1;
      self.pending = self.pending.saturating_sub(1);
      match completion.result {
        Ok(()) => debug!(key = %completion.key, "upload complete"),
        Err(err) => {
          self.failed += 1;
          warn!(key = %completion.key, error = %err, "upload failed; artifact will not be rebuilt");
        }
      }
    }
    resolved
  }

  /// True when every submitted upload has resolved.
  pub fn is_idle(&self) -> bool {
    self.pending == 0
  }

  pub fn pending(&self) -> usize {
    self.pending
  }

  pub fn submitted(&self) -> u64 {
    self.submitted
  }

  pub fn failed(&self) -> u64 {
    self.failed
  }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;
