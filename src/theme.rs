//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Ocean palette and UI colours, optionally overridden from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours by `Piece::color_index`: six sea-life kinds then three pollution kinds.
    pub pieces: [Color; 9],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (moves, cleanliness).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Disabled controls and hints.
    pub inactive_fg: Color,
    /// Background of the selected piece.
    pub selected_bg: Color,
    /// Background under the keyboard cursor.
    pub cursor_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

/// One Dark hex values; also the fallbacks for keys a theme file leaves out.
const ONEDARK_PIECES: [&str; 9] = [
    "#E5C07B", // fish: yellow
    "#E06C75", // crab: red
    "#98C379", // turtle: green
    "#C678DD", // octopus: magenta
    "#D19A66", // starfish: orange
    "#61AFEF", // dolphin: blue
    "#ABB2BF", // bottle: grey
    "#BE5046", // can: rust
    "#56B6C2", // cup: cyan
];
const ONEDARK_BG: &str = "#1E2A3A";
const ONEDARK_DIV: &str = "#3F444F";
const ONEDARK_FG: &str = "#ABB2BF";
const ONEDARK_TITLE: &str = "#56B6C2";
const ONEDARK_INACTIVE: &str = "#5C6370";
const ONEDARK_SELECTED: &str = "#E5C07B";
const ONEDARK_CURSOR: &str = "#3E4452";

fn hex(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::Reset)
}

impl Theme {
    /// Hardcoded One Dark defaults on a deep-sea background.
    pub fn onedark_default() -> Self {
        Self {
            pieces: ONEDARK_PIECES.map(hex),
            bg: hex(ONEDARK_BG),
            div_line: hex(ONEDARK_DIV),
            main_fg: hex(ONEDARK_FG),
            title: hex(ONEDARK_TITLE),
            inactive_fg: hex(ONEDARK_INACTIVE),
            selected_bg: hex(ONEDARK_SELECTED),
            cursor_bg: hex(ONEDARK_CURSOR),
        }
    }

    /// Defaults with `palette` applied; also the fallback when a theme file cannot be read.
    pub fn with_palette(palette: Palette) -> Self {
        let mut theme = Self::onedark_default();
        theme.apply_palette(palette);
        theme
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the defaults if path is None or the file does not exist.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        match path {
            Some(p) if p.exists() => {
                let mut theme = Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?));
                theme.apply_palette(palette);
                Ok(theme)
            }
            _ => Ok(Self::with_palette(palette)),
        }
    }

    /// Override piece colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        let overrides: [&str; 9] = match palette {
            Palette::Normal => return,
            Palette::HighContrast => [
                "#FFFF00", "#FF0000", "#00FF00", "#FF00FF", "#FF8800", "#0088FF", "#FFFFFF",
                "#AA5500", "#00FFFF",
            ],
            // Okabe-Ito based; pollution kept in distinct neutral/dark tones.
            Palette::Colorblind => [
                "#F0E442", "#D55E00", "#009E73", "#CC79A7", "#E69F00", "#0072B2", "#BBBBBB",
                "#882255", "#56B4E9",
            ],
        };
        self.pieces = overrides.map(hex);
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str, fallback: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v).ok())
                .unwrap_or_else(|| hex(fallback))
        };
        let mut pieces = [Color::Reset; 9];
        for (i, slot) in pieces.iter_mut().enumerate() {
            *slot = get(&format!("piece{}", i), ONEDARK_PIECES[i]);
        }
        Self {
            pieces,
            bg: get("main_bg", ONEDARK_BG),
            div_line: get("div_line", ONEDARK_DIV),
            main_fg: get("main_fg", ONEDARK_FG),
            title: get("title", ONEDARK_TITLE),
            inactive_fg: get("inactive_fg", ONEDARK_INACTIVE),
            selected_bg: get("selected_bg", ONEDARK_SELECTED),
            cursor_bg: get("cursor_bg", ONEDARK_CURSOR),
        }
    }

    /// Colour for `Piece::color_index` (0..9).
    #[inline]
    pub fn piece_color(&self, index: u8) -> Color {
        self.pieces[(index as usize) % self.pieces.len()]
    }
}

/// Parse btop-style theme file into key -> value map. Comments and junk lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(digits.to_string());
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|d| u8::from_str_radix(d, 16).ok())
            .ok_or_else(invalid)
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_theme_lines() {
        let map = parse_theme_file(
            "# comment\ntheme[main_bg]=\"#102030\"\ntheme[piece6]='#FFFFFF'\nnot a theme line\n",
        );
        assert_eq!(map.get("main_bg"), Some(&"#102030".to_string()));
        assert_eq!(map.get("piece6"), Some(&"#FFFFFF".to_string()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_from_map_falls_back_per_key() {
        let map = parse_theme_file("theme[piece0]=\"#010203\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.piece_color(0), Color::Rgb(1, 2, 3));
        assert_eq!(theme.piece_color(1), Theme::default().piece_color(1));
    }

    #[test]
    fn test_palettes_change_pieces_only() {
        let mut theme = Theme::default();
        let bg = theme.bg;
        theme.apply_palette(Palette::HighContrast);
        assert_eq!(theme.piece_color(1), Color::Rgb(255, 0, 0));
        assert_eq!(theme.bg, bg);
    }

    #[test]
    fn test_unreadable_file_fallback_keeps_palette() {
        // A directory exists but cannot be read as a theme file.
        let dir = std::env::temp_dir();
        assert!(Theme::load(Some(&dir), Palette::Colorblind).is_err());

        let theme = Theme::with_palette(Palette::Colorblind);
        assert_eq!(theme.piece_color(2), Color::Rgb(0x00, 0x9E, 0x73));
        assert_eq!(theme.bg, Theme::default().bg);
    }
}
