//! Color parsing and the perceptual luminance used for contrast decisions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Luminance below which a page is treated as dark-themed
pub const DARK_PAGE_THRESHOLD: f32 = 0.3;

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `rgb()`, `rgba()`, `#rgb`, `#rrggbb` and a handful of keywords.
    ///
    /// Fully transparent colors return `None` so callers keep walking up the tree.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "transparent" | "" | "none" | "initial" | "inherit" => return None,
            "white" => return Some(Self::WHITE),
            "black" => return Some(Self::BLACK),
            "red" => return Some(Self::new(255, 0, 0)),
            "green" => return Some(Self::new(0, 128, 0)),
            "blue" => return Some(Self::new(0, 0, 255)),
            "navy" => return Some(Self::new(0, 0, 128)),
            "teal" => return Some(Self::new(0, 128, 128)),
            "silver" => return Some(Self::new(192, 192, 192)),
            "gray" | "grey" => return Some(Self::new(128, 128, 128)),
            _ => {}
        }

        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        let inner = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner
            .split(|c| c == ',' || c == '/' || c == ' ')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 3 {
            return None;
        }
        if let Some(alpha) = parts.get(3) {
            let alpha: f32 = alpha.trim_end_matches('%').parse().ok()?;
            if alpha <= 0.0 {
                return None;
            }
        }
        let channel = |s: &str| -> Option<u8> {
            let v: f32 = s.parse().ok()?;
            Some(v.clamp(0.0, 255.0).round() as u8)
        };
        Some(Self::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let expand = |c: char| c.to_digit(16).map(|d| (d * 17) as u8);
        match hex.len() {
            3 | 4 => {
                let mut chars = hex.chars();
                Some(Self::new(
                    expand(chars.next()?)?,
                    expand(chars.next()?)?,
                    expand(chars.next()?)?,
                ))
            }
            6 | 8 => Some(Self::new(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            _ => None,
        }
    }

    /// Perceptual luminance `0.299R + 0.587G + 0.114B`, normalized to 0..=1
    pub fn luminance(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }

    pub fn is_dark(&self) -> bool {
        self.luminance() < DARK_PAGE_THRESHOLD
    }

    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    pub fn to_rgba(&self, alpha: f32) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Rgb::parse("rgb(10, 20, 30)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(Rgb::parse("rgba(10, 20, 30, 0.5)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(Rgb::parse("rgba(0, 0, 0, 0)"), None);
        assert_eq!(Rgb::parse("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse("#FF00ff"), Some(Rgb::new(255, 0, 255)));
        assert_eq!(Rgb::parse("transparent"), None);
        assert_eq!(Rgb::parse("hsl(0, 0%, 0%)"), None);
    }

    #[test]
    fn test_non_ascii_hex_is_rejected() {
        assert_eq!(Rgb::parse("#aé123"), None);
        assert_eq!(Rgb::parse("#ééé"), None);
    }

    #[test]
    fn test_luminance_thresholds() {
        let dark = Rgb::new(10, 10, 10);
        assert!((dark.luminance() - 0.039).abs() < 0.001);
        assert!(dark.is_dark());

        let light = Rgb::new(250, 250, 250);
        assert!((light.luminance() - 0.98).abs() < 0.001);
        assert!(!light.is_dark());
    }
}
