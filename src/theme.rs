//! Colours: built-in palettes and btop-style `theme[key]="value"` files.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of sand colours a theme provides.
pub const SAND_COLOURS: usize = 7;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Sand colours by palette index.
    pub sand: [Color; SAND_COLOURS],
    pub bomb: Color,
    /// Playfield background.
    pub bg: Color,
    /// Background tint over the spawn rows.
    pub danger: Color,
    /// Borders.
    pub div_line: Color,
    /// Score and level text.
    pub main_fg: Color,
    pub title: Color,
    /// Hints and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_SAND: [Color; SAND_COLOURS] = [
    rgb(0x56B6C2), // cyan
    rgb(0xE5C07B), // yellow
    rgb(0xC678DD), // magenta
    rgb(0x98C379), // green
    rgb(0xE06C75), // red
    rgb(0xD19A66), // orange
    rgb(0x61AFEF), // blue
];

/// Arcade colours in the same order.
const CLASSIC_SAND: [Color; SAND_COLOURS] = [
    rgb(0x00FFFF),
    rgb(0xFFFF00),
    rgb(0x800080),
    rgb(0x00FF00),
    rgb(0xFF0000),
    rgb(0xFFA500),
    rgb(0x0000FF),
];

const HIGH_CONTRAST_SAND: [Color; SAND_COLOURS] = [
    rgb(0x00FFFF),
    rgb(0xFFFF00),
    rgb(0xFF00FF),
    rgb(0x00FF00),
    rgb(0xFF0000),
    rgb(0xFF8800),
    rgb(0x0088FF),
];

/// Okabe-Ito colours, no red/green pairs.
const COLORBLIND_SAND: [Color; SAND_COLOURS] = [
    rgb(0x56B4E9),
    rgb(0xF0E442),
    rgb(0xCC79A7),
    rgb(0x009E73),
    rgb(0xD55E00),
    rgb(0xE69F00),
    rgb(0x0072B2),
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            sand: ONEDARK_SAND,
            bomb: rgb(0xDCDFE4),
            bg: rgb(0x31353F),
            danger: rgb(0x4A3036),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load a btop-style theme file, then apply `palette` on top.
    /// No path (or a missing file) gives the One Dark defaults.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::Classic => self.sand = CLASSIC_SAND,
            Palette::HighContrast => self.sand = HIGH_CONTRAST_SAND,
            Palette::Colorblind => self.sand = COLORBLIND_SAND,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let base = Self::default();
        let get = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        let s = base.sand;
        Self {
            sand: [
                get(&["hi_fg", "proc_misc"], s[0]),
                get(&["title", "cpu_mid"], s[1]),
                get(&["net_box"], s[2]),
                get(&["mem_box", "cpu_start"], s[3]),
                get(&["cpu_end", "temp_end"], s[4]),
                get(&["temp_mid", "used_mid"], s[5]),
                get(&["cpu_box"], s[6]),
            ],
            bomb: get(&["selected_fg"], base.bomb),
            bg: get(&["meter_bg"], base.bg),
            danger: get(&["selected_bg"], base.danger),
            div_line: get(&["div_line"], base.div_line),
            main_fg: get(&["main_fg"], base.main_fg),
            title: get(&["title"], base.title),
            inactive_fg: get(&["inactive_fg"], base.inactive_fg),
        }
    }

    #[inline]
    pub fn sand_color(&self, index: u8) -> Color {
        self.sand[index as usize % SAND_COLOURS]
    }
}

/// `theme[key]="value"` lines into a map; comments and junk are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| {
            let rest = l.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let value = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
    match hex.len() {
        6 => Ok(rgb(value)),
        3 => {
            let nibble = |shift: u32| ((value >> shift) & 0xF) as u8 * 17;
            Ok(Color::Rgb(nibble(8), nibble(4), nibble(0)))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        assert_eq!(parse_hex("#98C379").unwrap(), Color::Rgb(0x98, 0xC3, 0x79));
    }

    #[test]
    fn test_parse_hex_3() {
        assert_eq!(parse_hex("#FFF").unwrap(), Color::Rgb(255, 255, 255));
        assert_eq!(parse_hex("#1a2").unwrap(), Color::Rgb(0x11, 0xAA, 0x22));
    }

    #[test]
    fn test_parse_hex_rejects_junk() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file("# comment\ntheme[meter_bg]=\"#31353F\"\ntheme[title]='#FFFFFF'\nnot a theme line");
        assert_eq!(map.get("meter_bg").map(String::as_str), Some("#31353F"));
        assert_eq!(map.get("title").map(String::as_str), Some("#FFFFFF"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_theme_file_overrides_defaults() {
        let map = parse_theme_file("theme[meter_bg]=\"#000000\"\ntheme[cpu_box]=\"#112233\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.bg, Color::Rgb(0, 0, 0));
        assert_eq!(theme.sand[6], Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.sand[0], ONEDARK_SAND[0]);
    }

    #[test]
    fn test_palette_wraps_index() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::Classic);
        assert_eq!(theme.sand_color(0), Color::Rgb(0, 255, 255));
        assert_eq!(theme.sand_color(7), theme.sand_color(0));
    }
}
