use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::planning::weekly::{FrequencyEntry, WeeklyFrequency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloggerKind {
    Podcaster,
    Fashion,
}

impl BloggerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            BloggerKind::Podcaster => "podcaster",
            BloggerKind::Fashion => "fashion",
        }
    }
}

impl TryFrom<&str> for BloggerKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "podcaster" => Ok(BloggerKind::Podcaster),
            "fashion" => Ok(BloggerKind::Fashion),
            other => Err(format!("unknown blogger type '{other}'")),
        }
    }
}

/// Garment slots in reference-image priority order (declaration order is `Ord`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarmentSlot {
    Top,
    Bottom,
    Shoes,
    Accessories,
}

impl GarmentSlot {
    pub const fn as_str(self) -> &'static str {
        match self {
            GarmentSlot::Top => "top",
            GarmentSlot::Bottom => "bottom",
            GarmentSlot::Shoes => "shoes",
            GarmentSlot::Accessories => "accessories",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditingType {
    Overlay,
    Rotoscope,
    Static,
}

impl EditingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            EditingType::Overlay => "overlay",
            EditingType::Rotoscope => "rotoscope",
            EditingType::Static => "static",
        }
    }
}

impl TryFrom<&str> for EditingType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "overlay" => Ok(EditingType::Overlay),
            "rotoscope" => Ok(EditingType::Rotoscope),
            "static" => Ok(EditingType::Static),
            other => Err(format!("unknown editing type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outfit {
    pub name: String,
    pub image_url: String,
    #[serde(default)]
    pub parts: BTreeMap<GarmentSlot, String>,
}

/// A configured content persona and its content calendar settings.
#[derive(Debug, Clone, Serialize)]
pub struct Blogger {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BloggerKind,
    pub image: Option<String>,
    pub tone_of_voice: Option<String>,
    pub theme: Option<String>,
    pub voice_id: Option<String>,
    pub content_frequency: WeeklyFrequency,
    pub locations: Vec<Location>,
    pub outfits: Vec<Outfit>,
    pub editing_types_enabled: Vec<EditingType>,
    pub subtitles_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or fully replacing a blogger.
#[derive(Debug, Clone, Deserialize)]
pub struct BloggerDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BloggerKind,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tone_of_voice: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub content_frequency: WeeklyFrequency,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub outfits: Vec<Outfit>,
    #[serde(default)]
    pub editing_types_enabled: Vec<EditingType>,
    #[serde(default)]
    pub subtitles_enabled: bool,
}

impl Blogger {
    /// Builds a new blogger from a draft; persistence assigns nothing else.
    pub fn from_draft(draft: BloggerDraft) -> Self {
        let now = Utc::now();
        let mut blogger = Blogger {
            id: Uuid::new_v4(),
            name: String::new(),
            kind: draft.kind,
            image: None,
            tone_of_voice: None,
            theme: None,
            voice_id: None,
            content_frequency: WeeklyFrequency::default(),
            locations: Vec::new(),
            outfits: Vec::new(),
            editing_types_enabled: Vec::new(),
            subtitles_enabled: false,
            created_at: now,
            updated_at: now,
        };
        blogger.apply_draft(draft);
        blogger
    }

    /// Full replacement of every user-editable field.
    pub fn apply_draft(&mut self, draft: BloggerDraft) {
        self.name = draft.name;
        self.kind = draft.kind;
        self.image = draft.image;
        self.tone_of_voice = draft.tone_of_voice;
        self.theme = draft.theme;
        self.voice_id = draft.voice_id;
        self.content_frequency = draft.content_frequency;
        self.locations = draft.locations;
        self.outfits = draft.outfits;
        self.editing_types_enabled = draft.editing_types_enabled;
        self.subtitles_enabled = draft.subtitles_enabled;
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BloggerRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub image: Option<String>,
    pub tone_of_voice: Option<String>,
    pub theme: Option<String>,
    pub voice_id: Option<String>,
    pub content_frequency: Json<Vec<FrequencyEntry>>,
    pub locations: Json<Vec<Location>>,
    pub outfits: Json<Vec<Outfit>>,
    pub editing_types_enabled: Json<Vec<EditingType>>,
    pub subtitles_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BloggerRow> for Blogger {
    type Error = anyhow::Error;

    fn try_from(row: BloggerRow) -> Result<Self, Self::Error> {
        let kind = BloggerKind::try_from(row.kind.as_str()).map_err(anyhow::Error::msg)?;
        Ok(Blogger {
            id: row.id,
            name: row.name,
            kind,
            image: row.image,
            tone_of_voice: row.tone_of_voice,
            theme: row.theme,
            voice_id: row.voice_id,
            content_frequency: WeeklyFrequency::new(row.content_frequency.0),
            locations: row.locations.0,
            outfits: row.outfits.0,
            editing_types_enabled: row.editing_types_enabled.0,
            subtitles_enabled: row.subtitles_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
