//! Grid engine configuration.
//!
//! Every tunable of the generator, the subdivider and the crawl loop lives in
//! [`GridConfig`]. Values can be set in code through the `with_*` builders or
//! loaded from JSON (and TOML with the `toml` feature).
use serde::de::Error;

pub use gridcrawl_types::geo::DistanceMetric;

/// Grid engine configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Radius of the first, coarsest level (meters)
    #[serde(default = "GridConfig::default_max_radius")]
    pub max_radius: f64,

    /// Smallest radius the generator or the subdivider will place (meters)
    #[serde(default = "GridConfig::default_min_radius")]
    pub min_radius: f64,

    #[serde(default)]
    pub metric: DistanceMetric,

    /// Lower bound of the probe step (meters)
    #[serde(default = "GridConfig::default_probe_min_step")]
    pub probe_min_step: f64,

    /// The probe step is `(radius - min_radius) / probe_step_divisor`
    #[serde(default = "GridConfig::default_probe_step_divisor")]
    pub probe_step_divisor: f64,

    /// Radius multiplier used when probing finds no viable radius
    #[serde(default = "GridConfig::default_fallback_factor")]
    pub fallback_factor: f64,

    /// Extra gap (meters) required between a candidate and a stored cell
    #[serde(default = "GridConfig::default_overlap_clearance")]
    pub overlap_clearance: f64,

    /// Lattice candidates handed to the boundary provider per call
    #[serde(default = "GridConfig::default_validation_batch")]
    pub validation_batch: usize,

    /// Vertices of the polygon circumscribing a buffered candidate
    #[serde(default = "GridConfig::default_circle_segments")]
    pub circle_segments: usize,

    /// Subdivision obstacle neighbourhood is `radius * obstacle_search_factor`
    #[serde(default = "GridConfig::default_obstacle_search_factor")]
    pub obstacle_search_factor: f64,

    /// First pack radius is `parent_radius / pack_start_divisor`
    #[serde(default = "GridConfig::default_pack_start_divisor")]
    pub pack_start_divisor: f64,

    #[serde(default = "GridConfig::default_pack_shrink_factor")]
    pub pack_shrink_factor: f64,

    /// Result count at which a crawled cell is considered saturated
    #[serde(default = "GridConfig::default_result_cap")]
    pub result_cap: u64,
}

impl GridConfig {
    const fn default_max_radius() -> f64 {
        50_000.0
    }

    const fn default_min_radius() -> f64 {
        100.0
    }

    const fn default_probe_min_step() -> f64 {
        25.0
    }

    const fn default_probe_step_divisor() -> f64 {
        30.0
    }

    const fn default_fallback_factor() -> f64 {
        0.9
    }

    const fn default_overlap_clearance() -> f64 {
        1.0
    }

    const fn default_validation_batch() -> usize {
        1_000
    }

    const fn default_circle_segments() -> usize {
        32
    }

    const fn default_obstacle_search_factor() -> f64 {
        3.0
    }

    const fn default_pack_start_divisor() -> f64 {
        2.5
    }

    const fn default_pack_shrink_factor() -> f64 {
        0.85
    }

    const fn default_result_cap() -> u64 {
        60
    }

    /// Set both radius limits.
    pub fn with_radii(mut self, max_radius: f64, min_radius: f64) -> Self {
        assert!(min_radius > 0.0, "Minimum radius must be greater than zero");
        assert!(
            max_radius >= min_radius,
            "Maximum radius must not be below the minimum radius"
        );
        self.max_radius = max_radius;
        self.min_radius = min_radius;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_probe_step(mut self, min_step: f64, divisor: f64) -> Self {
        assert!(min_step >= 1.0, "Probe step must be at least one meter");
        assert!(divisor > 0.0, "Probe step divisor must be greater than zero");
        self.probe_min_step = min_step;
        self.probe_step_divisor = divisor;
        self
    }

    pub fn with_fallback_factor(mut self, factor: f64) -> Self {
        assert!(
            factor > 0.0 && factor < 1.0,
            "Fallback factor must be in (0, 1)"
        );
        self.fallback_factor = factor;
        self
    }

    pub fn with_overlap_clearance(mut self, clearance: f64) -> Self {
        assert!(clearance >= 0.0, "Overlap clearance must not be negative");
        self.overlap_clearance = clearance;
        self
    }

    pub fn with_validation_batch(mut self, batch: usize) -> Self {
        assert!(batch > 0, "Validation batch must hold at least one candidate");
        self.validation_batch = batch;
        self
    }

    pub fn with_circle_segments(mut self, segments: usize) -> Self {
        assert!(segments >= 8, "A buffered circle needs at least 8 segments");
        self.circle_segments = segments;
        self
    }

    pub fn with_result_cap(mut self, cap: u64) -> Self {
        assert!(cap > 0, "Result cap must be greater than zero");
        self.result_cap = cap;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_radius.is_finite() && self.min_radius > 0.0) {
            return Err(format!(
                "min_radius must be a positive number, got {}",
                self.min_radius
            ));
        }
        if !self.max_radius.is_finite() || self.max_radius < self.min_radius {
            return Err(format!(
                "max_radius ({}) must be >= min_radius ({})",
                self.max_radius, self.min_radius
            ));
        }
        if self.probe_min_step < 1.0 || self.probe_step_divisor <= 0.0 {
            return Err("Probe step must be >= 1 and its divisor positive".to_string());
        }
        if !(self.fallback_factor > 0.0 && self.fallback_factor < 1.0) {
            return Err(format!(
                "fallback_factor must be in (0, 1), got {}",
                self.fallback_factor
            ));
        }
        if self.overlap_clearance < 0.0 {
            return Err("overlap_clearance must not be negative".to_string());
        }
        if self.validation_batch == 0 {
            return Err("validation_batch must be greater than zero".to_string());
        }
        if self.circle_segments < 8 {
            return Err("circle_segments must be at least 8".to_string());
        }
        if self.obstacle_search_factor < 1.0 {
            return Err("obstacle_search_factor must be at least 1".to_string());
        }
        if self.pack_start_divisor <= 1.0 {
            return Err("pack_start_divisor must be greater than 1".to_string());
        }
        if !(self.pack_shrink_factor > 0.0 && self.pack_shrink_factor < 1.0) {
            return Err("pack_shrink_factor must be in (0, 1)".to_string());
        }
        if self.result_cap == 0 {
            return Err("result_cap must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: GridConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: GridConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_radius: Self::default_max_radius(),
            min_radius: Self::default_min_radius(),
            metric: DistanceMetric::default(),
            probe_min_step: Self::default_probe_min_step(),
            probe_step_divisor: Self::default_probe_step_divisor(),
            fallback_factor: Self::default_fallback_factor(),
            overlap_clearance: Self::default_overlap_clearance(),
            validation_batch: Self::default_validation_batch(),
            circle_segments: Self::default_circle_segments(),
            obstacle_search_factor: Self::default_obstacle_search_factor(),
            pack_start_divisor: Self::default_pack_start_divisor(),
            pack_shrink_factor: Self::default_pack_shrink_factor(),
            result_cap: Self::default_result_cap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GridConfig::default();
        assert_eq!(config.max_radius, 50_000.0);
        assert_eq!(config.min_radius, 100.0);
        assert_eq!(config.metric, DistanceMetric::Haversine);
        assert_eq!(config.probe_min_step, 25.0);
        assert_eq!(config.result_cap, 60);
        assert_eq!(config.validation_batch, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = GridConfig::default()
            .with_radii(4.0, 1.0)
            .with_metric(DistanceMetric::Euclidean)
            .with_probe_step(1.0, 30.0);

        let json = config.to_json().unwrap();
        let deserialized = GridConfig::from_json(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GridConfig::from_json(r#"{"max_radius": 20000.0}"#).unwrap();
        assert_eq!(config.max_radius, 20_000.0);
        assert_eq!(config.min_radius, 100.0);
        assert_eq!(config.pack_shrink_factor, 0.85);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(GridConfig::from_json(r#"{"max_radius": 50.0, "min_radius": 100.0}"#).is_err());
        assert!(GridConfig::from_json(r#"{"fallback_factor": 1.5}"#).is_err());
        assert!(GridConfig::from_json(r#"{"unknown_field": 1}"#).is_err());
        assert!(GridConfig::from_json(r#"{"validation_batch": 0}"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Minimum radius must be greater than zero")]
    fn test_zero_min_radius_panics() {
        let _ = GridConfig::default().with_radii(10.0, 0.0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml() {
        let config = GridConfig::from_toml("max_radius = 30000.0\nmetric = \"euclidean\"\n").unwrap();
        assert_eq!(config.max_radius, 30_000.0);
        assert_eq!(config.metric, DistanceMetric::Euclidean);
    }
}
