//! Scales used by the timeline layout and axis.

/// Continuous linear mapping from a domain onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
	/// Input interval.
	pub domain: (f64, f64),
	/// Output interval in pixels.
	pub range: (f64, f64),
}

impl LinearScale {
	/// Creates a scale mapping `domain` onto `range`.
	pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
		Self { domain, range }
	}

	/// Maps a domain value to the range.
	pub fn scale(&self, v: f64) -> f64 {
		let (d0, d1) = self.domain;
		let (r0, r1) = self.range;
		if d1 == d0 {
			return (r0 + r1) / 2.0;
		}
		r0 + (v - d0) / (d1 - d0) * (r1 - r0)
	}

	/// Maps a range value back to the domain.
	pub fn invert(&self, px: f64) -> f64 {
		let (d0, d1) = self.domain;
		let (r0, r1) = self.range;
		if r1 == r0 {
			return (d0 + d1) / 2.0;
		}
		d0 + (px - r0) / (r1 - r0) * (d1 - d0)
	}

	/// Domain visible after a horizontal zoom of `k` and pan of `tx`.
	pub fn rescale(&self, k: f64, tx: f64) -> Self {
		let (r0, r1) = self.range;
		Self {
			domain: (self.invert((r0 - tx) / k), self.invert((r1 - tx) / k)),
			range: self.range,
		}
	}

	/// Round tick values covering the domain, roughly `count` of them.
	pub fn ticks(&self, count: usize) -> Vec<f64> {
		let (lo, hi) = if self.domain.0 <= self.domain.1 {
			self.domain
		} else {
			(self.domain.1, self.domain.0)
		};
		let span = hi - lo;
		if count == 0 || !span.is_finite() || span <= 0.0 {
			return if lo.is_finite() { vec![lo] } else { Vec::new() };
		}
		let step = tick_step(span / count as f64);
		let first = (lo / step).ceil() as i64;
		let last = (hi / step).floor() as i64;
		(first..=last).map(|i| i as f64 * step).collect()
	}
}

fn tick_step(raw: f64) -> f64 {
	let magnitude = 10f64.powf(raw.log10().floor());
	let error = raw / magnitude;
	let factor = if error >= 50f64.sqrt() {
		10.0
	} else if error >= 10f64.sqrt() {
		5.0
	} else if error >= 2f64.sqrt() {
		2.0
	} else {
		1.0
	};
	factor * magnitude
}

/// Ordinal scale dividing a range into equal bands, one per domain value.
#[derive(Clone, Debug, PartialEq)]
pub struct BandScale {
	domain: Vec<String>,
	range: (f64, f64),
	padding: f64,
}

impl BandScale {
	/// Splits `range` into equal bands, one per key.
	pub fn new(domain: Vec<String>, range: (f64, f64), padding: f64) -> Self {
		Self {
			domain,
			range,
			padding,
		}
	}

	/// Band keys in order.
	pub fn domain(&self) -> &[String] {
		&self.domain
	}

	fn step(&self) -> f64 {
		let n = self.domain.len() as f64;
		if n == 0.0 {
			return 0.0;
		}
		(self.range.1 - self.range.0) / (n + self.padding)
	}

	/// Height of one band without padding.
	pub fn bandwidth(&self) -> f64 {
		self.step() * (1.0 - self.padding)
	}

	/// Start of the band for `key`.
	pub fn band(&self, key: &str) -> Option<f64> {
		let i = self.domain.iter().position(|d| d == key)?;
		let step = self.step();
		Some(self.range.0 + step * self.padding + i as f64 * step)
	}

	/// Middle of the band for `key`.
	pub fn center(&self, key: &str) -> Option<f64> {
		self.band(key).map(|start| start + self.bandwidth() / 2.0)
	}
}
