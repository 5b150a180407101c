//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::ColorScheme;
use crate::game::Candy;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Candy colours in `Candy::index()` order, then UI colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// red, blue, green, yellow, purple, orange.
    pub candy: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Labels / titles.
    pub title: Color,
    /// Dimmed text and the board once the game is over.
    pub inactive_fg: Color,
    pub won: Color,
    pub lost: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Theme keys for each candy, with the btop key used when the candy key is absent.
const CANDY_KEYS: [(&str, &str); 6] = [
    ("candy_red", "cpu_end"),
    ("candy_blue", "cpu_box"),
    ("candy_green", "mem_box"),
    ("candy_yellow", "title"),
    ("candy_purple", "net_box"),
    ("candy_orange", "temp_mid"),
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark hex values.
    pub fn onedark_default() -> Self {
        Self {
            candy: [
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0xC6, 0x78, 0xDD), // purple
                Color::Rgb(0xD1, 0x9A, 0x66), // orange
            ],
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            won: Color::Rgb(0x98, 0xC3, 0x79),
            lost: Color::Rgb(0xE0, 0x6C, 0x75),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// No path, or a path that does not exist, gives the One Dark defaults.
    /// `scheme` then overrides candy colours for high contrast or colorblind play.
    pub fn load(path: Option<&Path>, scheme: ColorScheme) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                log::info!("Loaded theme {}", p.display());
                Self::from_map(&parse_theme_file(&s))
            }
            Some(p) => {
                log::warn!("Theme {} not found, using defaults", p.display());
                Self::onedark_default()
            }
            None => Self::onedark_default(),
        };
        theme.apply_scheme(scheme);
        Ok(theme)
    }

    pub fn apply_scheme(&mut self, scheme: ColorScheme) {
        match scheme {
            ColorScheme::Normal => {}
            ColorScheme::HighContrast => {
                self.candy = [
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x88, 0x00),
                ];
            }
            ColorScheme::Colorblind => {
                // Paul Tol "vibrant": separable without red/green cues.
                self.candy = [
                    Color::Rgb(0xCC, 0x33, 0x11),
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                    Color::Rgb(0xEE, 0x33, 0x77),
                    Color::Rgb(0xEE, 0x77, 0x33),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let mut theme = Self::onedark_default();
        for (slot, (key, fallback)) in theme.candy.iter_mut().zip(CANDY_KEYS) {
            if let Some(c) = get(key).or_else(|| get(fallback)) {
                *slot = c;
            }
        }
        let ui = [
            (&mut theme.bg, "main_bg"),
            (&mut theme.div_line, "div_line"),
            (&mut theme.main_fg, "main_fg"),
            (&mut theme.title, "title"),
            (&mut theme.inactive_fg, "inactive_fg"),
        ];
        for (slot, key) in ui {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        theme
    }

    #[inline]
    pub fn candy_color(&self, candy: Candy) -> Color {
        self.candy[candy.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
