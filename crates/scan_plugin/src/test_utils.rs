//! Shared test fixtures: a deterministic geometry provider and an
//! in-memory export sink.

use std::cell::Cell;
use std::collections::HashMap;

use crossbeam_channel::Sender;
use glam::Vec3;

use crate::export::{ExportCompletion, ExportError, ExportSink};
use crate::provider::SurfaceQueryProvider;
use crate::types::SurfaceHit;

/// Deterministic surface-query fixture.
///
/// Columns are populated with explicit surface heights; vertical probes
/// return those heights top-down, horizontal probes return nothing (the
/// provider-empty case is legal and contributes zero samples).
pub struct FixtureProvider {
  spacing: f32,
  columns: HashMap<(i32, i32), Vec<f32>>,
  pub vertical_probes: Cell<u64>,
  pub horizontal_probes: Cell<u64>,
}

impl FixtureProvider {
  pub fn new(spacing: f32) -> Self {
    Self {
      spacing,
      columns: HashMap::new(),
      vertical_probes: Cell::new(0),
      horizontal_probes: Cell::new(0),
    }
  }

  /// Ground plane at `y` over an inclusive column range.
  pub fn with_flat_ground(mut self, gx: std::ops::RangeInclusive<i32>, gz: std::ops::RangeInclusive<i32>, y: f32) -> Self {
    for cx in gx {
      for cz in gz.clone() {
        self.add_surface(cx, cz, y);
      }
    }
    self
  }

  /// Add one surface height to a column.
  pub fn add_surface(&mut self, gx: i32, gz: i32, y: f32) {
    self.columns.entry((gx, gz)).or_default().push(y);
  }

  fn column_of(&self, x: f32, z: f32) -> (i32, i32) {
    (
      (x / self.spacing).round() as i32,
      (z / self.spacing).round() as i32,
    )
  }
}

impl SurfaceQueryProvider for FixtureProvider {
  fn probe(&self, origin: Vec3, target: Vec3, max_hits: u32, _channel_mask: u32) -> Vec<SurfaceHit> {
    let vertical = (origin.x - target.x).abs() < 1e-4 && (origin.z - target.z).abs() < 1e-4;
    if !vertical {
      self.horizontal_probes.set(self.horizontal_probes.get() + 1);
      return Vec::new();
    }

    self.vertical_probes.set(self.vertical_probes.get() + 1);
    let Some(heights) = self.columns.get(&self.column_of(origin.x, origin.z)) else {
      return Vec::new();
    };

    let mut in_range: Vec<f32> = heights
      .iter()
      .copied()
      .filter(|&h| h <= origin.y && h >= target.y)
      .collect();
    // Probe runs top-down, so nearest-first is descending Y.
    in_range.sort_by(|a, b| b.partial_cmp(a).unwrap());
    in_range.truncate(max_hits as usize);

    in_range
      .into_iter()
      .map(|h| SurfaceHit::new(Vec3::new(origin.x, h, origin.z), Vec3::Y, 1))
      .collect()
  }
}

/// In-memory export sink with injectable failures and deferred completion.
pub struct MemorySink {
  /// Every payload ever put, in submission order.
  pub objects: Vec<(String, Vec<u8>)>,

  /// Keys containing any of these substrings complete with a failure.
  pub fail_keys: Vec<String>,

  /// When true, completions are held until [`MemorySink::flush`].
  pub defer: bool,

  held: Vec<(Sender<ExportCompletion>, ExportCompletion)>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self {
      objects: Vec::new(),
      fail_keys: Vec::new(),
      defer: false,
      held: Vec::new(),
    }
  }

  /// Deliver all held completions.
  pub fn flush(&mut self) {
    for (done, completion) in self.held.drain(..) {
      let _ = done.send(completion);
    }
  }

  pub fn keys(&self) -> Vec<&str> {
    self.objects.iter().map(|(k, _)| k.as_str()).collect()
  }

  pub fn payload_for(&self, key_fragment: &str) -> Option<&[u8]> {
    self
      .objects
      .iter()
      .find(|(k, _)| k.contains(key_fragment))
      .map(|(_, p)| p.as_slice())
  }
}

impl ExportSink for MemorySink {
  fn put_object(&mut self, key: String, payload: Vec<u8>, done: Sender<ExportCompletion>) {
    let result = if self.fail_keys.iter().any(|f| key.contains(f.as_str())) {
      Err(ExportError::Rejected {
        key: key.clone(),
        reason: "injected failure".to_string(),
      })
    } else {
      Ok(())
    };

    self.objects.push((key.clone(), payload));
    let completion = ExportCompletion { key, result };
    if self.defer {
      self.held.push((done, completion));
    } else {
      let _ = done.send(completion);
    }
  }
}
