// src/models/subtitle.rs
//! Subtitle presentation parameters and the editor that produces them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::ApiError;

pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 30..=120;
pub const FONT_WEIGHT_RANGE: RangeInclusive<u16> = 100..=900;

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color pattern");
}

/// Typefaces the subtitle renderer has available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Roboto,
    #[serde(rename = "Open Sans")]
    OpenSans,
    Inter,
    Poppins,
    Lato,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Roboto,
        FontFamily::OpenSans,
        FontFamily::Inter,
        FontFamily::Poppins,
        FontFamily::Lato,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Roboto => "Roboto",
            FontFamily::OpenSans => "Open Sans",
            FontFamily::Inter => "Inter",
            FontFamily::Poppins => "Poppins",
            FontFamily::Lato => "Lato",
        }
    }

    /// Stylesheet a preview surface loads before rendering this family.
    pub fn stylesheet_url(&self) -> String {
        format!(
            "https://fonts.googleapis.com/css2?family={}:wght@100;200;300;400;500;600;700;800;900&display=swap",
            self.as_str().replace(' ', "+")
        )
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontFamily {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FontFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::validation(format!("Unsupported font family: '{}'", wanted)))
    }
}

/// Label for the named weights a weight slider snaps to.
pub fn weight_label(weight: u16) -> &'static str {
    match weight {
        100 => "Thin",
        200 => "Extra Light",
        300 => "Light",
        400 => "Regular",
        500 => "Medium",
        600 => "Semi-Bold",
        700 => "Bold",
        800 => "Extra Bold",
        900 => "Black",
        _ => "Custom",
    }
}

/// Request payload for `apply-subtitles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    #[serde(rename = "font")]
    pub font_family: FontFamily,
    #[serde(rename = "fontsize")]
    pub font_size_px: u32,
    #[serde(rename = "bold")]
    pub font_weight: u16,
    #[serde(rename = "color")]
    pub color_hex: String,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: FontFamily::Roboto,
            font_size_px: 80,
            font_weight: 400,
            color_hex: "#FF0000".to_string(),
        }
    }
}

impl SubtitleStyle {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !FONT_SIZE_RANGE.contains(&self.font_size_px) {
            return Err(ApiError::validation(format!(
                "Font size {}px is outside {}-{}px",
                self.font_size_px,
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end()
            )));
        }
        if !FONT_WEIGHT_RANGE.contains(&self.font_weight) {
            return Err(ApiError::validation(format!(
                "Font weight {} is outside {}-{}",
                self.font_weight,
                FONT_WEIGHT_RANGE.start(),
                FONT_WEIGHT_RANGE.end()
            )));
        }
        if !is_hex_color(&self.color_hex) {
            return Err(ApiError::validation(format!(
                "Color '{}' is not a #RRGGBB value",
                self.color_hex
            )));
        }
        Ok(())
    }

    /// Copy with numeric fields pulled back into range.
    pub fn clamped(&self) -> Self {
        Self {
            font_size_px: clamp_to(self.font_size_px as i64, &FONT_SIZE_RANGE),
            font_weight: clamp_to(self.font_weight as i64, &FONT_WEIGHT_RANGE),
            ..self.clone()
        }
    }
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

fn clamp_to<T>(value: i64, range: &RangeInclusive<T>) -> T
where
    T: Copy + Into<i64> + TryFrom<i64>,
{
    let lo: i64 = (*range.start()).into();
    let hi: i64 = (*range.end()).into();
    T::try_from(value.clamp(lo, hi)).unwrap_or(*range.start())
}

/// Slider-style editor; numeric input is clamped, catalog and color input
/// is validated.
#[derive(Debug, Clone, Default)]
pub struct SubtitleStyleEditor {
    style: SubtitleStyle,
}

impl SubtitleStyleEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &SubtitleStyle {
        &self.style
    }

    pub fn set_font_family(&mut self, family: FontFamily) {
        self.style.font_family = family;
    }

    pub fn select_font_family(&mut self, name: &str) -> Result<FontFamily, ApiError> {
        let family = name.parse::<FontFamily>()?;
        self.style.font_family = family;
        Ok(family)
    }

    pub fn set_font_size(&mut self, px: i64) -> u32 {
        self.style.font_size_px = clamp_to(px, &FONT_SIZE_RANGE);
        self.style.font_size_px
    }

    pub fn set_font_weight(&mut self, weight: i64) -> u16 {
        self.style.font_weight = clamp_to(weight, &FONT_WEIGHT_RANGE);
        self.style.font_weight
    }

    /// Invalid input leaves the previous color in place.
    pub fn set_color(&mut self, hex: &str) -> Result<(), ApiError> {
        let hex = hex.trim();
        if !is_hex_color(hex) {
            return Err(ApiError::validation(format!(
                "Color '{}' is not a #RRGGBB value",
                hex
            )));
        }
        self.style.color_hex = hex.to_uppercase();
        Ok(())
    }

    /// Style ready to hand to the workflow controller.
    pub fn submit(&self) -> SubtitleStyle {
        self.style.clamped()
    }

    pub fn weight_label(&self) -> &'static str {
        weight_label(self.style.font_weight)
    }
}
