//! Linear RGBA colours and conversions from HSL and hex notation.

/// Errors produced when parsing a colour string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("invalid hex colour `{0}`: expected #rrggbb or #rrggbbaa")]
    InvalidHex(String),
}

/// An RGBA colour with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Converts HSL to RGBA.
    ///
    /// `hue` is in degrees, `saturation` and `lightness` are percentages
    /// (`0..=100`).
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue / 360.0;
        let s = saturation / 100.0;
        let l = lightness / 100.0;

        if s == 0.0 {
            return Self::rgba(l, l, l, alpha);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self::rgba(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
            alpha,
        )
    }

    /// Parses `#rrggbbaa` or `#rrggbb` (alpha defaults to opaque).
    ///
    /// ```
    /// use glint::Color;
    ///
    /// let c = Color::from_hex("#ff0000ff").unwrap();
    /// assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidHex(hex.to_string());

        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
            return Err(invalid());
        }

        let channel = |i: usize| -> Result<f32, ColorError> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| invalid())
        };

        let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

impl From<Color> for glam::Vec3 {
    fn from(c: Color) -> Self {
        glam::Vec3::new(c.r, c.g, c.b)
    }
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < 1e-5
            && (a.g - b.g).abs() < 1e-5
            && (a.b - b.b).abs() < 1e-5
            && (a.a - b.a).abs() < 1e-5
    }

    #[test]
    fn hsl_primaries() {
        assert!(close(Color::from_hsl(0.0, 100.0, 50.0, 1.0), Color::rgb(1.0, 0.0, 0.0)));
        assert!(close(Color::from_hsl(120.0, 100.0, 50.0, 1.0), Color::rgb(0.0, 1.0, 0.0)));
        assert!(close(Color::from_hsl(240.0, 100.0, 50.0, 0.5), Color::rgba(0.0, 0.0, 1.0, 0.5)));
    }

    #[test]
    fn hsl_without_saturation_is_grey() {
        let c = Color::from_hsl(200.0, 0.0, 25.0, 1.0);
        assert!(close(c, Color::rgb(0.25, 0.25, 0.25)));
    }

    #[test]
    fn hex_with_alpha() {
        let c = Color::from_hex("#00ff0080").unwrap();
        assert_eq!(c.r, 0.0);
        assert_eq!(c.g, 1.0);
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn hex_without_alpha_is_opaque() {
        assert_eq!(Color::from_hex("#000000").unwrap(), Color::BLACK);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(Color::from_hex("ff0000").is_err());
        assert!(Color::from_hex("#ff00").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        assert!(Color::from_hex("#ff0000ff00").is_err());
    }

    #[test]
    fn rgba8_quantises_and_clamps() {
        assert_eq!(Color::rgba(1.5, 0.5, -1.0, 1.0).to_rgba8(), [255, 128, 0, 255]);
    }
}
