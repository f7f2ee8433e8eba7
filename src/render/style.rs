//! Stylesheet parsing and the render palette.
//!
//! A stylesheet is a small CSS subset: rules whose last class selector
//! names a token class and whose body declares `color` (plus `background`
//! on the root `.highlight` rule). Every hex color that appears anywhere
//! in the file joins the palette of permitted output pixels.

use super::RenderError;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Palette and token colors used when no stylesheet file is supplied
pub const DEFAULT_CSS: &str = "\
.highlight { background-color: #ffffff; color: #000000; }
.highlight .k { color: #0000ff; }
.highlight .s { color: #a31515; }
.highlight .c { color: #008000; }
.highlight .m { color: #098658; }
.highlight .nd { color: #808000; }
.highlight .o { color: #444444; }
";

static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
static LAST_CLASS: OnceLock<Regex> = OnceLock::new();

fn hex_color() -> &'static Regex {
    HEX_COLOR.get_or_init(|| Regex::new("#[0-9a-fA-F]{6}").expect("literal pattern"))
}

fn last_class() -> &'static Regex {
    LAST_CLASS.get_or_init(|| Regex::new(r"\.([A-Za-z][A-Za-z0-9_-]*)").expect("literal pattern"))
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    let r = u8::from_str_radix(hex.get(1..3)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(3..5)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(5..7)?, 16).ok()?;
    Some([r, g, b, 0xff])
}

fn declared_color(body: &str, property: &str) -> Option<[u8; 4]> {
    for declaration in body.split(';') {
        let Some((key, value)) = declaration.split_once(':') else {
            continue;
        };
        if key.trim() == property {
            if let Some(m) = hex_color().find(value) {
                return parse_hex(m.as_str());
            }
        }
    }
    None
}

/// Token colors plus the closed set of permitted output pixels
#[derive(Debug, Clone)]
pub struct Stylesheet {
    class_colors: HashMap<String, [u8; 4]>,
    background: [u8; 4],
    foreground: [u8; 4],
    palette: Vec<[u8; 4]>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        static EMBEDDED: OnceLock<Stylesheet> = OnceLock::new();
        EMBEDDED
            .get_or_init(|| Stylesheet::from_css(DEFAULT_CSS).expect("embedded stylesheet parses"))
            .clone()
    }
}

impl Stylesheet {
    /// Parses CSS text. Fails when the text declares no hex colors at all.
    pub fn from_css(css: &str) -> Result<Self, RenderError> {
        if hex_color().find(css).is_none() {
            return Err(RenderError::EmptyPalette);
        }

        let mut class_colors = HashMap::new();
        let mut background = [0xff, 0xff, 0xff, 0xff];
        let mut foreground = [0x00, 0x00, 0x00, 0xff];

        for rule in css.split('}') {
            let Some((selector, body)) = rule.split_once('{') else {
                continue;
            };
            let class = last_class()
                .captures_iter(selector)
                .last()
                .map(|c| c[1].to_string());
            match class.as_deref() {
                Some("highlight") | None => {
                    if let Some(color) = declared_color(body, "color") {
                        foreground = color;
                    }
                    if let Some(color) = declared_color(body, "background-color")
                        .or_else(|| declared_color(body, "background"))
                    {
                        background = color;
                    }
                }
                Some(other) => {
                    if let Some(color) = declared_color(body, "color") {
                        class_colors.insert(other.to_string(), color);
                    }
                }
            }
        }

        // painted colors are always permitted, declared or not
        let mut palette: Vec<[u8; 4]> = hex_color()
            .find_iter(css)
            .filter_map(|m| parse_hex(m.as_str()))
            .collect();
        palette.push(background);
        palette.push(foreground);
        palette.sort_unstable();
        palette.dedup();

        Ok(Self {
            class_colors,
            background,
            foreground,
            palette,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let css = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_css(&css)
    }

    pub fn background(&self) -> [u8; 4] {
        self.background
    }

    /// Color for a token class, foreground for unstyled classes.
    pub fn color_for(&self, class: Option<&str>) -> [u8; 4] {
        match class {
            Some(name) => self.class_colors.get(name).copied().unwrap_or(self.foreground),
            None => self.foreground,
        }
    }

    /// Permitted output colors, sorted
    pub fn palette(&self) -> &[[u8; 4]] {
        &self.palette
    }

    pub fn contains(&self, color: [u8; 4]) -> bool {
        self.palette.binary_search(&color).is_ok()
    }

    /// Closest palette color by the sum of absolute per-channel differences.
    ///
    /// Ties resolve to the smallest color in palette order, so snapping is
    /// deterministic.
    pub fn nearest(&self, color: [u8; 4]) -> [u8; 4] {
        *self
            .palette
            .iter()
            .min_by_key(|candidate| {
                candidate
                    .iter()
                    .zip(color.iter())
                    .map(|(&a, &b)| u32::from(a.abs_diff(b)))
                    .sum::<u32>()
            })
            .expect("palette is never empty")
    }
}
