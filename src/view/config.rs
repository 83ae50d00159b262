//! Tunables for the interactive view.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on simulation steps in one stabilization pass.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Configuration could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The JSON could not be deserialized.
	#[error("invalid view configuration: {0}")]
	Parse(#[from] serde_json::Error),
}

/// View controller configuration. Every field has a default, so a partial
/// JSON object is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
	/// Lower zoom bound.
	pub min_scale: f64,
	/// Upper zoom bound.
	pub max_scale: f64,
	/// Factor used by `zoom_in`.
	pub zoom_step: f64,
	/// Factor used by `zoom_out`.
	pub zoom_out_step: f64,
	/// Screen-space margin kept around content by `fit_to_content`.
	pub fit_margin: f64,
	/// Seconds a node must stay hovered before its tooltip shows.
	pub tooltip_delay: f64,
	/// Pointer travel (px) under which a press/release counts as a click.
	pub click_tolerance: f64,
	/// World-space pick radius.
	pub hit_radius: f64,
	/// Force layout settings.
	pub stabilization: StabilizationConfig,
	/// Timeline layout settings.
	pub timeline: TimelineConfig,
	/// Keyboard navigation speeds.
	pub keyboard: KeyboardConfig,
}

/// Force simulation and stabilization budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
	/// Total simulation steps for one stabilization pass.
	pub iterations: u32,
	/// Steps performed per animation frame.
	pub update_interval: u32,
	/// Simulated seconds per step.
	pub step: f32,
	/// Repulsion between nodes.
	pub force_charge: f32,
	/// Edge spring stiffness.
	pub force_spring: f32,
	/// Cap on the force applied per step.
	pub force_max: f32,
	/// Velocity scale of the simulation.
	pub node_speed: f32,
	/// Velocity kept per step.
	pub damping_factor: f32,
}

/// Arrow-key and +/- navigation speeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
	/// Screen pixels panned per arrow key press.
	pub pan_step: f64,
	/// Relative scale change per zoom key press.
	pub zoom_speed: f64,
}

/// Plot margins of the timeline layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
	/// Space above the first lane.
	pub margin_top: f64,
	/// Space right of the plot.
	pub margin_right: f64,
	/// Space below the plot, holding the axis.
	pub margin_bottom: f64,
	/// Space left of the plot, holding lane names.
	pub margin_left: f64,
	/// Fraction of each era band left empty.
	pub band_padding: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.5,
			max_scale: 20.0,
			zoom_step: 1.2,
			zoom_out_step: 0.8,
			fit_margin: 40.0,
			tooltip_delay: 0.1,
			click_tolerance: 4.0,
			hit_radius: 12.0,
			stabilization: StabilizationConfig::default(),
			timeline: TimelineConfig::default(),
			keyboard: KeyboardConfig::default(),
		}
	}
}

impl Default for StabilizationConfig {
	fn default() -> Self {
		Self {
			iterations: 1000,
			update_interval: 25,
			step: 0.016,
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

impl Default for KeyboardConfig {
	fn default() -> Self {
		Self {
			pan_step: 10.0,
			zoom_speed: 0.02,
		}
	}
}

impl Default for TimelineConfig {
	fn default() -> Self {
		Self {
			margin_top: 80.0,
			margin_right: 40.0,
			margin_bottom: 80.0,
			margin_left: 80.0,
			band_padding: 0.3,
		}
	}
}

impl ViewConfig {
	/// Parses a (possibly partial) JSON config and sanitizes it.
	pub fn from_json(text: &str) -> Result<Self, ConfigError> {
		Ok(serde_json::from_str::<Self>(text)?.sanitized())
	}

	/// Replaces values that would let the view invert or vanish.
	pub fn sanitized(mut self) -> Self {
		let defaults = Self::default();
		let valid_range = self.min_scale.is_finite()
			&& self.max_scale.is_finite()
			&& self.min_scale > 0.0
			&& self.min_scale <= self.max_scale;
		if !valid_range {
			self.min_scale = defaults.min_scale;
			self.max_scale = defaults.max_scale;
		}
		if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
			self.zoom_step = defaults.zoom_step;
		}
		if !(self.zoom_out_step.is_finite() && self.zoom_out_step > 0.0 && self.zoom_out_step < 1.0) {
			self.zoom_out_step = defaults.zoom_out_step;
		}
		let non_negative = |v: f64| v.is_finite() && v >= 0.0;
		if !non_negative(self.fit_margin) {
			self.fit_margin = defaults.fit_margin;
		}
		if !non_negative(self.tooltip_delay) {
			self.tooltip_delay = defaults.tooltip_delay;
		}
		if !non_negative(self.click_tolerance) {
			self.click_tolerance = defaults.click_tolerance;
		}
		if !(self.hit_radius.is_finite() && self.hit_radius > 0.0) {
			self.hit_radius = defaults.hit_radius;
		}
		if !non_negative(self.keyboard.pan_step) {
			self.keyboard.pan_step = defaults.keyboard.pan_step;
		}
		if !(self.keyboard.zoom_speed.is_finite() && self.keyboard.zoom_speed > 0.0 && self.keyboard.zoom_speed < 1.0) {
			self.keyboard.zoom_speed = defaults.keyboard.zoom_speed;
		}
		self.stabilization.iterations = self.stabilization.iterations.min(MAX_ITERATIONS);
		if self.stabilization.update_interval == 0 {
			self.stabilization.update_interval = 1;
		}
		self.timeline.band_padding = self.timeline.band_padding.clamp(0.0, 0.9);
		self
	}

	/// Clamps a scale into `[min_scale, max_scale]`.
	pub fn clamp_scale(&self, k: f64) -> f64 {
		k.clamp(self.min_scale, self.max_scale)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_json_keeps_defaults() {
		let config = ViewConfig::from_json(r#"{"max_scale": 8.0, "stabilization": {"iterations": 200}}"#)
			.unwrap();
		assert_eq!(config.max_scale, 8.0);
		assert_eq!(config.min_scale, 0.5);
		assert_eq!(config.stabilization.iterations, 200);
		assert_eq!(config.stabilization.update_interval, 25);
	}

	#[test]
	fn test_out_of_range_tunables_fall_back() {
		let config = ViewConfig::from_json(
			r#"{"hit_radius": -3.0, "click_tolerance": -1.0, "tooltip_delay": -0.5,
			"zoom_out_step": 1.5, "keyboard": {"zoom_speed": 2.0},
			"stabilization": {"iterations": 4000000000}}"#,
		)
		.unwrap();
		let defaults = ViewConfig::default();
		assert_eq!(config.hit_radius, defaults.hit_radius);
		assert_eq!(config.click_tolerance, defaults.click_tolerance);
		assert_eq!(config.tooltip_delay, defaults.tooltip_delay);
		assert_eq!(config.zoom_out_step, 0.8);
		assert_eq!(config.keyboard.zoom_speed, 0.02);
		assert_eq!(config.stabilization.iterations, MAX_ITERATIONS);

		let mut nan = ViewConfig::default();
		nan.hit_radius = f64::NAN;
		assert_eq!(nan.sanitized().hit_radius, defaults.hit_radius);
	}

	#[test]
	fn test_inverted_range_is_replaced() {
		let config = ViewConfig::from_json(r#"{"min_scale": 4.0, "max_scale": 2.0}"#).unwrap();
		assert_eq!((config.min_scale, config.max_scale), (0.5, 20.0));
		assert_eq!(config.clamp_scale(100.0), 20.0);
		assert_eq!(config.clamp_scale(0.01), 0.5);
	}

	#[test]
	fn test_bad_json_is_an_error() {
		assert!(matches!(ViewConfig::from_json("{"), Err(ConfigError::Parse(_))));
	}
}
