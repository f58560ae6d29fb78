//! RGBA color quads and hex-with-alpha conversion.
//!
//! Node and edge colors travel through the pipeline as `#rrggbbaa` strings;
//! configuration may supply either strings or RGBA quads, so both directions
//! are supported.

use serde::Deserialize;

/// An RGBA color with 8-bit channels and a 0.0..=1.0 alpha.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Rgba {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	#[serde(default = "opaque")]
	pub a: f64,
}

fn opaque() -> f64 {
	1.0
}

/// Fallback node fill when a row's type resolves to nothing.
pub const DEFAULT_NODE_COLOR: Rgba = Rgba::rgb(100, 194, 245);
/// Fallback edge stroke when a row's edge type resolves to nothing.
pub const DEFAULT_EDGE_COLOR: Rgba = Rgba::rgb(0, 0, 0);

impl Rgba {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Formats as `#rrggbbaa` with the alpha rounded onto 8 bits.
	pub fn to_hexa(self) -> String {
		let a = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
		format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, a)
	}

	/// Parses `#rrggbb` or `#rrggbbaa`. Returns `None` for anything else.
	pub fn from_hexa(s: &str) -> Option<Self> {
		let hex = s.strip_prefix('#')?;
		if hex.len() != 6 && hex.len() != 8 {
			return None;
		}
		let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
		let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
		let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
		let a = if hex.len() == 8 {
			u8::from_str_radix(&hex[6..8], 16).ok()? as f64 / 255.0
		} else {
			1.0
		};
		Some(Self { r, g, b, a })
	}

	/// CSS form for canvas styles: `#rrggbb` when opaque, `rgba(...)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}
}

/// Resolves a color string for canvas use, falling back when it does not parse.
///
/// Accepts `#rrggbb`/`#rrggbbaa` (the pipeline's own format) and passes through
/// `rgb()`/`rgba()` functional notation untouched.
pub fn css_color(color: &str, fallback: Rgba) -> String {
	if let Some(rgba) = Rgba::from_hexa(color) {
		rgba.to_css()
	} else if color.starts_with("rgb") {
		color.to_owned()
	} else {
		fallback.to_css()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hexa_round_trip_defaults() {
		assert_eq!(DEFAULT_NODE_COLOR.to_hexa(), "#64c2f5ff");
		assert_eq!(DEFAULT_EDGE_COLOR.to_hexa(), "#000000ff");
		assert_eq!(
			Rgba::from_hexa(&DEFAULT_NODE_COLOR.to_hexa()),
			Some(DEFAULT_NODE_COLOR)
		);
	}

	#[test]
	fn hexa_encodes_alpha() {
		assert_eq!(Rgba::rgba(255, 0, 0, 0.5).to_hexa(), "#ff000080");
		let parsed = Rgba::from_hexa("#ff000080").unwrap();
		assert_eq!((parsed.r, parsed.g, parsed.b), (255, 0, 0));
		assert!((parsed.a - 0.5).abs() < 0.01);
	}

	#[test]
	fn hexa_rejects_malformed() {
		assert_eq!(Rgba::from_hexa("red"), None);
		assert_eq!(Rgba::from_hexa("#abc"), None);
		assert_eq!(Rgba::from_hexa("#zzzzzz"), None);
	}

	#[test]
	fn css_color_falls_back() {
		assert_eq!(css_color("#ff0000", DEFAULT_NODE_COLOR), "#ff0000");
		assert_eq!(
			css_color("not-a-color", DEFAULT_NODE_COLOR),
			DEFAULT_NODE_COLOR.to_css()
		);
		assert_eq!(
			css_color("rgba(1, 2, 3, 0.4)", DEFAULT_NODE_COLOR),
			"rgba(1, 2, 3, 0.4)"
		);
	}
}
