//! Resolution profiles - named bundles of spacing/step/budget parameters.
//!
//! A profile selects scan fidelity vs. speed. Grid spacing additionally
//! scales with region width (coarser grid for larger regions) unless the
//! profile disables scaling.

/// Named bundle of scan parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionProfile {
  /// Profile name used in artifact keys and command lookup.
  pub name: &'static str,

  /// Base grid spacing in meters per column, before region scaling.
  pub grid_spacing_base: f32,

  /// Vertical margin added above/below the region for top-down probes.
  pub vertical_step: f32,

  /// Ray budget consumed per scheduler tick.
  pub max_rays_per_tick: u32,

  /// Whether columns with multiple layers receive the horizontal pass.
  pub interior_passes_enabled: bool,

  /// Vertical spacing between horizontal-pass probe heights.
  pub interior_step_y: f32,

  /// Maximum intersections requested per top-down probe.
  pub topdown_max_hits: u32,

  /// Retention cap per grid column.
  pub max_layers_per_cell: usize,

  /// Complete and evict one chunk at a time, bounding peak memory.
  pub streaming_enabled: bool,

  /// When false, `grid_spacing_base` is used verbatim for any region size.
  pub scale_with_region: bool,
}

impl ResolutionProfile {
  /// Fast, coarse sweep for quick previews.
  pub const PREVIEW: Self = Self {
    name: "preview",
    grid_spacing_base: 4.0,
    vertical_step: 2.0,
    max_rays_per_tick: 400,
    interior_passes_enabled: false,
    interior_step_y: 8.0,
    topdown_max_hits: 4,
    max_layers_per_cell: 8,
    streaming_enabled: false,
    scale_with_region: true,
  };

  /// Balanced default.
  pub const STANDARD: Self = Self {
    name: "standard",
    grid_spacing_base: 2.0,
    vertical_step: 2.0,
    max_rays_per_tick: 200,
    interior_passes_enabled: true,
    interior_step_y: 4.0,
    topdown_max_hits: 8,
    max_layers_per_cell: 20,
    streaming_enabled: false,
    scale_with_region: true,
  };

  /// Dense sampling with no region scaling.
  pub const FINE: Self = Self {
    name: "fine",
    grid_spacing_base: 1.0,
    vertical_step: 2.0,
    max_rays_per_tick: 100,
    interior_passes_enabled: true,
    interior_step_y: 2.0,
    topdown_max_hits: 16,
    max_layers_per_cell: 20,
    streaming_enabled: false,
    scale_with_region: false,
  };

  /// Standard fidelity with per-chunk completion and eviction.
  pub const STREAMING: Self = Self {
    name: "streaming",
    grid_spacing_base: 2.0,
    vertical_step: 2.0,
    max_rays_per_tick: 200,
    interior_passes_enabled: true,
    interior_step_y: 4.0,
    topdown_max_hits: 8,
    max_layers_per_cell: 20,
    streaming_enabled: true,
    scale_with_region: true,
  };

  /// All built-in profiles.
  pub fn all() -> &'static [ResolutionProfile] {
    static ALL: [ResolutionProfile; 4] = [
      ResolutionProfile::PREVIEW,
      ResolutionProfile::STANDARD,
      ResolutionProfile::FINE,
      ResolutionProfile::STREAMING,
    ];
    &ALL
  }

  /// Look up a built-in profile by name.
  pub fn by_name(name: &str) -> Option<&'static ResolutionProfile> {
    Self::all().iter().find(|p| p.name == name)
  }

  /// Width-dependent spacing multiplier. Monotonically non-decreasing.
  fn width_scale(region_width: f32) -> f32 {
    if region_width <= 128.0 {
      1.0
    } else if region_width <= 256.0 {
      1.5
    } else if region_width <= 512.0 {
      2.0
    } else if region_width <= 1024.0 {
      3.0
    } else {
      4.0
    }
  }

  /// Grid spacing resolved for a region of the given width.
  pub fn resolved_spacing(&self, region_width: f32) -> f32 {
    if self.scale_with_region {
      self.grid_spacing_base * Self::width_scale(region_width)
    } else {
      self.grid_spacing_base
    }
  }

  /// Vertical dedup epsilon: samples closer than this within a column are
  /// treated as the same surface.
  pub fn dedup_epsilon(spacing: f32) -> f32 {
    spacing * 0.5
  }
}

impl Default for ResolutionProfile {
  fn default() -> Self {
    Self::STANDARD
  }
}
