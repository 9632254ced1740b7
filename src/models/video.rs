// src/models/video.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::subtitle::SubtitleStyle;
use crate::error::ApiError;

/// Processing status reported for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    #[default]
    Ready,
    Failed,
}

/// One source video tracked through conversion and its refinements.
///
/// Field names follow the service's wire format (`youtube_url`,
/// `short_video_file`); the service's integer ids are kept as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoJob {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "youtube_url", alias = "source_url")]
    pub source_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(rename = "short_video_file", alias = "rendered_asset_uri", default)]
    pub rendered_asset_uri: Option<String>,
    /// Most recently applied filter; filters replace each other.
    #[serde(default)]
    pub applied_filter: Option<String>,
    #[serde(default)]
    pub subtitle_style: Option<SubtitleStyle>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VideoJob {
    /// Fill refinements the service did not report from what the client
    /// knows: `filter`/`style` just applied, otherwise the previous value.
    pub(crate) fn settle_refinements(
        mut self,
        previous: &VideoJob,
        filter: Option<FilterName>,
        style: Option<&SubtitleStyle>,
    ) -> Self {
        if self.applied_filter.is_none() {
            self.applied_filter = filter
                .map(|f| f.as_str().to_string())
                .or_else(|| previous.applied_filter.clone());
        }
        if self.subtitle_style.is_none() {
            self.subtitle_style = style.cloned().or_else(|| previous.subtitle_style.clone());
        }
        self
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Filters the service knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterName {
    Grayscale,
    Sepia,
    Vignette,
    Vintage,
    Sharpen,
    Warm,
    Grain,
    Technicolor,
}

impl FilterName {
    pub const ALL: [FilterName; 8] = [
        FilterName::Grayscale,
        FilterName::Sepia,
        FilterName::Vignette,
        FilterName::Vintage,
        FilterName::Sharpen,
        FilterName::Warm,
        FilterName::Grain,
        FilterName::Technicolor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterName::Grayscale => "grayscale",
            FilterName::Sepia => "sepia",
            FilterName::Vignette => "vignette",
            FilterName::Vintage => "vintage",
            FilterName::Sharpen => "sharpen",
            FilterName::Warm => "warm",
            FilterName::Grain => "grain",
            FilterName::Technicolor => "technicolor",
        }
    }

    /// Button label, e.g. "Sepia".
    pub fn label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FilterName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| ApiError::validation(format!("Unknown filter: '{}'", s.trim())))
    }
}
