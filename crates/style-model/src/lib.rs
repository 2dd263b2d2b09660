use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, ensure};
use serde::Deserialize;
use serde::de::{self, Deserializer};

pub use placement::{Edge, Layer, Placement};

/// Font used when neither the config file nor the command line names one.
pub const DEFAULT_FONT: &str = "Sans 10";

/// An RGBA colour stored as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const fn from_rgba(value: u32) -> Self {
        Self(value)
    }

    pub const fn rgba(self) -> u32 {
        self.0
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn blue(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn alpha(self) -> u8 {
        self.0 as u8
    }

    /// Repacks the colour as `0xAARRGGBB`, the layout used by pixel buffers.
    pub const fn argb(self) -> u32 {
        self.0.rotate_right(8)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    /// Accepts `RRGGBB` or `RRGGBBAA`, optionally prefixed with `#`. Six digit
    /// colours are fully opaque.
    fn from_str(raw: &str) -> Result<Self> {
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        ensure!(
            (digits.len() == 6 || digits.len() == 8)
                && digits.chars().all(|c| c.is_ascii_hexdigit()),
            "invalid color '{raw}', expected RRGGBB[AA]"
        );
        let parsed = u32::from_str_radix(digits, 16)
            .map_err(|err| anyhow!("invalid color '{raw}': {err}"))?;
        Ok(if digits.len() == 6 {
            Self((parsed << 8) | 0xFF)
        } else {
            Self(parsed)
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Font family plus point size, written the way Pango descriptions are
/// (`"Sans 10"`, `"pango:DejaVu Sans Mono 11"`).
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    pub size_pt: f32,
}

impl FontDescriptor {
    const DEFAULT_SIZE_PT: f32 = 10.0;

    /// Pixel height of one em at 96 dpi.
    pub fn pixel_size(&self) -> f32 {
        self.size_pt * 96.0 / 72.0
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: "Sans".to_string(),
            size_pt: Self::DEFAULT_SIZE_PT,
        }
    }
}

impl FromStr for FontDescriptor {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("pango:").unwrap_or(trimmed).trim();
        ensure!(!trimmed.is_empty(), "font description must not be blank");

        let (family, size_pt) = match trimmed.rsplit_once(char::is_whitespace) {
            Some((family, size)) => match size.parse::<f32>() {
                Ok(size) => (family.trim(), size),
                Err(_) => (trimmed, Self::DEFAULT_SIZE_PT),
            },
            None => match trimmed.parse::<f32>() {
                Ok(size) => ("Sans", size),
                Err(_) => (trimmed, Self::DEFAULT_SIZE_PT),
            },
        };
        ensure!(
            size_pt.is_finite() && size_pt > 0.0,
            "font size in '{raw}' must be positive"
        );
        Ok(Self {
            family: family.trim_end_matches(',').to_string(),
            size_pt,
        })
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.size_pt)
    }
}

impl<'de> Deserialize<'de> for FontDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

mod placement {
    use super::*;

    /// Screen edge the bar is anchored to. The bar always spans the full
    /// width of the output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Edge {
        #[default]
        Top,
        Bottom,
    }

    /// Stacking layer requested from the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Layer {
        Background,
        Bottom,
        #[default]
        Top,
        Overlay,
    }

    /// Where the bar goes; resolved alongside the style.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct Placement {
        pub edge: Edge,
        pub layer: Layer,
        pub output: Option<String>,
    }

    impl Edge {
        const ALL: &'static [Self] = &[Self::Top, Self::Bottom];
        const NAMES: &'static [&'static str] = &["top", "bottom"];

        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Top => "top",
                Self::Bottom => "bottom",
            }
        }
    }

    impl Layer {
        const ALL: &'static [Self] = &[Self::Background, Self::Bottom, Self::Top, Self::Overlay];
        const NAMES: &'static [&'static str] = &["background", "bottom", "top", "overlay"];

        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Background => "background",
                Self::Bottom => "bottom",
                Self::Top => "top",
                Self::Overlay => "overlay",
            }
        }
    }

    impl FromStr for Edge {
        type Err = anyhow::Error;

        fn from_str(raw: &str) -> Result<Self> {
            Self::ALL
                .iter()
                .copied()
                .find(|edge| edge.as_str() == raw)
                .ok_or_else(|| anyhow!("invalid edge '{raw}', expected one of {:?}", Self::NAMES))
        }
    }

    impl FromStr for Layer {
        type Err = anyhow::Error;

        fn from_str(raw: &str) -> Result<Self> {
            Self::ALL
                .iter()
                .copied()
                .find(|layer| layer.as_str() == raw)
                .ok_or_else(|| {
                    anyhow!("invalid layer '{raw}', expected one of {:?}", Self::NAMES)
                })
        }
    }

    impl fmt::Display for Edge {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl<'de> Deserialize<'de> for Edge {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            Self::ALL
                .iter()
                .copied()
                .find(|edge| edge.as_str() == raw)
                .ok_or_else(|| de::Error::unknown_variant(&raw, Self::NAMES))
        }
    }

    impl<'de> Deserialize<'de> for Layer {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            Self::ALL
                .iter()
                .copied()
                .find(|layer| layer.as_str() == raw)
                .ok_or_else(|| de::Error::unknown_variant(&raw, Self::NAMES))
        }
    }
}

/// Fully resolved appearance of the bar. Built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub font: FontDescriptor,

    pub background: Color,
    pub text: Color,
    pub border: Color,
    pub border_bottom: Color,
    pub button_background: Color,
    pub button_text: Color,
    pub details_background: Color,

    pub bar_border_thickness: i32,
    pub message_padding: i32,
    pub details_border_thickness: i32,
    pub button_border_thickness: i32,
    pub button_gap: i32,
    pub button_gap_close: i32,
    pub button_margin_right: i32,
    pub button_padding: i32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let (style, _) = StyleOverrides::base()
            .resolve()
            .unwrap_or_else(|_| unreachable!("built-in defaults are complete"));
        style
    }
}

/// One layer of optional style settings. Layers are stacked with
/// [`StyleOverrides::merge`]; later layers win field by field.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StyleOverrides {
    pub font: Option<FontDescriptor>,
    pub output: Option<String>,
    pub edge: Option<Edge>,
    pub layer: Option<Layer>,

    pub background: Option<Color>,
    pub text: Option<Color>,
    pub border: Option<Color>,
    pub border_bottom: Option<Color>,
    pub button_background: Option<Color>,
    pub button_text: Option<Color>,
    pub details_background: Option<Color>,

    pub border_bottom_size: Option<i32>,
    pub message_padding: Option<i32>,
    pub details_border_size: Option<i32>,
    pub button_border_size: Option<i32>,
    pub button_gap: Option<i32>,
    pub button_dismiss_gap: Option<i32>,
    pub button_margin_right: Option<i32>,
    pub button_padding: Option<i32>,
}

macro_rules! merge_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                $dst.$field = Some(value.clone());
            }
        )+
    };
}

impl StyleOverrides {
    /// The neutral base every message type is layered on.
    pub fn base() -> Self {
        Self {
            font: Some(FontDescriptor::default()),
            output: None,
            edge: Some(Edge::Top),
            layer: Some(Layer::Top),
            background: Some(Color::from_rgba(0x323232FF)),
            text: Some(Color::from_rgba(0xFFFFFFFF)),
            border: Some(Color::from_rgba(0x222222FF)),
            border_bottom: Some(Color::from_rgba(0x444444FF)),
            button_background: Some(Color::from_rgba(0x333333FF)),
            button_text: Some(Color::from_rgba(0xFFFFFFFF)),
            details_background: Some(Color::from_rgba(0x333333FF)),
            border_bottom_size: Some(2),
            message_padding: Some(8),
            details_border_size: Some(3),
            button_border_size: Some(3),
            button_gap: Some(20),
            button_dismiss_gap: Some(15),
            button_margin_right: Some(2),
            button_padding: Some(3),
        }
    }

    /// Copies every field that is set in `other` over `self`.
    pub fn merge(&mut self, other: &StyleOverrides) {
        merge_fields!(
            self,
            other,
            font,
            output,
            edge,
            layer,
            background,
            text,
            border,
            border_bottom,
            button_background,
            button_text,
            details_background,
            border_bottom_size,
            message_padding,
            details_border_size,
            button_border_size,
            button_gap,
            button_dismiss_gap,
            button_margin_right,
            button_padding,
        );
    }

    /// Returns a copy of `self` with `other` layered on top.
    pub fn merged(&self, other: &StyleOverrides) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Fills unset fields from [`StyleOverrides::base`] and validates sizes.
    pub fn resolve(&self) -> Result<(StyleConfig, Placement)> {
        let full = Self::base().merged(self);
        for (name, value) in [
            ("border-bottom-size", full.border_bottom_size),
            ("message-padding", full.message_padding),
            ("details-border-size", full.details_border_size),
            ("button-border-size", full.button_border_size),
            ("button-gap", full.button_gap),
            ("button-dismiss-gap", full.button_dismiss_gap),
            ("button-margin-right", full.button_margin_right),
            ("button-padding", full.button_padding),
        ] {
            if let Some(value) = value {
                ensure!(value >= 0, "{name} must not be negative (got {value})");
            }
        }

        let missing = |name: &str| anyhow!("style field {name} has no value");
        let style = StyleConfig {
            font: full.font.clone().ok_or_else(|| missing("font"))?,
            background: full.background.ok_or_else(|| missing("background"))?,
            text: full.text.ok_or_else(|| missing("text"))?,
            border: full.border.ok_or_else(|| missing("border"))?,
            border_bottom: full.border_bottom.ok_or_else(|| missing("border-bottom"))?,
            button_background: full
                .button_background
                .ok_or_else(|| missing("button-background"))?,
            button_text: full.button_text.ok_or_else(|| missing("button-text"))?,
            details_background: full
                .details_background
                .ok_or_else(|| missing("details-background"))?,
            bar_border_thickness: full
                .border_bottom_size
                .ok_or_else(|| missing("border-bottom-size"))?,
            message_padding: full
                .message_padding
                .ok_or_else(|| missing("message-padding"))?,
            details_border_thickness: full
                .details_border_size
                .ok_or_else(|| missing("details-border-size"))?,
            button_border_thickness: full
                .button_border_size
                .ok_or_else(|| missing("button-border-size"))?,
            button_gap: full.button_gap.ok_or_else(|| missing("button-gap"))?,
            button_gap_close: full
                .button_dismiss_gap
                .ok_or_else(|| missing("button-dismiss-gap"))?,
            button_margin_right: full
                .button_margin_right
                .ok_or_else(|| missing("button-margin-right"))?,
            button_padding: full
                .button_padding
                .ok_or_else(|| missing("button-padding"))?,
        };
        let placement = Placement {
            edge: full.edge.unwrap_or_default(),
            layer: full.layer.unwrap_or_default(),
            output: full.output.clone(),
        };
        Ok((style, placement))
    }
}

/// Name of the message type used when none is requested.
pub const DEFAULT_TYPE: &str = "error";

/// Colour schemes shipped with the binary.
pub fn builtin_type(name: &str) -> Option<StyleOverrides> {
    let scheme = |button: u32, background: u32, text: u32, border: u32, bottom: u32| {
        StyleOverrides {
            button_background: Some(Color::from_rgba(button)),
            details_background: Some(Color::from_rgba(button)),
            background: Some(Color::from_rgba(background)),
            text: Some(Color::from_rgba(text)),
            button_text: Some(Color::from_rgba(text)),
            border: Some(Color::from_rgba(border)),
            border_bottom: Some(Color::from_rgba(bottom)),
            ..StyleOverrides::default()
        }
    };
    match name {
        "error" => Some(scheme(
            0x680A0AFF, 0x900000FF, 0xFFFFFFFF, 0xD92424FF, 0x470909FF,
        )),
        "warning" => Some(scheme(
            0xFFC100FF, 0xFFA800FF, 0x000000FF, 0xAB7100FF, 0xAB7100FF,
        )),
        _ => None,
    }
}
