use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::blogger::{EditingType, GarmentSlot};
use crate::tasks::status::TaskStatus;

/// Keys under which generated assets and their prompts are filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKey {
    Main,
    Angle1,
    Angle2,
    Angle3,
    /// Generic image/video/voice preview asset.
    Preview,
}

impl FrameKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            FrameKey::Main => "main",
            FrameKey::Angle1 => "angle1",
            FrameKey::Angle2 => "angle2",
            FrameKey::Angle3 => "angle3",
            FrameKey::Preview => "preview",
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only history of generated URLs per frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedImages(BTreeMap<FrameKey, Vec<String>>);

impl GeneratedImages {
    pub fn append(&mut self, frame: FrameKey, url: impl Into<String>) {
        self.0.entry(frame).or_default().push(url.into());
    }

    pub fn latest(&self, frame: FrameKey) -> Option<&str> {
        self.0.get(&frame).and_then(|h| h.last()).map(String::as_str)
    }

    pub fn history(&self, frame: FrameKey) -> &[String] {
        self.0.get(&frame).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Prompt used for each frame, plus the reserved `error` key holding the
/// last generation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(flatten)]
    frames: BTreeMap<FrameKey, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Prompts {
    pub fn record(&mut self, frame: FrameKey, prompt: impl Into<String>) {
        self.frames.insert(frame, prompt.into());
    }

    pub fn get(&self, frame: FrameKey) -> Option<&str> {
        self.frames.get(&frame).map(String::as_str)
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Url,
    Text,
}

/// One garment of a task outfit: either a reference image URL or a text description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitSlot {
    #[serde(rename = "type")]
    pub kind: SlotKind,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOutfit(BTreeMap<GarmentSlot, OutfitSlot>);

impl TaskOutfit {
    pub fn set(&mut self, slot: GarmentSlot, value: OutfitSlot) {
        self.0.insert(slot, value);
    }

    /// First URL-typed slot in top → bottom → shoes → accessories order.
    pub fn reference_image(&self) -> Option<&str> {
        self.0
            .values()
            .find(|s| s.kind == SlotKind::Url && !s.value.trim().is_empty())
            .map(|s| s.value.as_str())
    }

    /// Human-readable summary for prompts, e.g. `top: wool coat; shoes: (reference image)`.
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .filter(|(_, s)| !s.value.trim().is_empty())
            .map(|(slot, s)| match s.kind {
                SlotKind::Text => format!("{}: {}", slot.as_str(), s.value.trim()),
                SlotKind::Url => format!("{}: (reference image)", slot.as_str()),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a fashion shoot happens: one of the blogger's saved locations or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationChoice {
    Saved { index: usize },
    Custom { description: String },
}

/// One day's scheduled content item.
#[derive(Debug, Clone, Serialize)]
pub struct ContentTask {
    pub id: Uuid,
    pub blogger_id: Uuid,
    pub date: NaiveDate,
    pub content_type: String,
    pub idea: Option<String>,
    pub status: TaskStatus,
    pub script: Option<String>,
    pub preview_url: Option<String>,
    pub editing_type: Option<EditingType>,
    pub location: Option<LocationChoice>,
    pub outfit: Option<TaskOutfit>,
    pub main_image_url: Option<String>,
    pub prompts: Prompts,
    pub generated_images: GeneratedImages,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a task; everything else starts empty.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub blogger_id: Uuid,
    pub date: NaiveDate,
    pub content_type: String,
    #[serde(default)]
    pub idea: Option<String>,
    #[serde(default)]
    pub editing_type: Option<EditingType>,
    #[serde(default = "default_new_status")]
    pub status: TaskStatus,
}

fn default_new_status() -> TaskStatus {
    TaskStatus::Draft
}

impl ContentTask {
    pub fn from_new(new: &NewTask) -> Self {
        let now = Utc::now();
        ContentTask {
            id: Uuid::new_v4(),
            blogger_id: new.blogger_id,
            date: new.date,
            content_type: new.content_type.clone(),
            idea: new.idea.clone(),
            status: new.status,
            script: None,
            preview_url: None,
            editing_type: new.editing_type,
            location: None,
            outfit: None,
            main_image_url: None,
            prompts: Prompts::default(),
            generated_images: GeneratedImages::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Splits the location choice into its `(location_id, location_description)` columns.
    pub fn location_columns(&self) -> (Option<i32>, Option<&str>) {
        match &self.location {
            Some(LocationChoice::Saved { index }) => (i32::try_from(*index).ok(), None),
            Some(LocationChoice::Custom { description }) => (None, Some(description.as_str())),
            None => (None, None),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ContentTaskRow {
    pub id: Uuid,
    pub blogger_id: Uuid,
    pub date: NaiveDate,
    pub content_type: String,
    pub idea: Option<String>,
    pub status: String,
    pub script: Option<String>,
    pub preview_url: Option<String>,
    pub editing_type: Option<String>,
    pub location_id: Option<i32>,
    pub location_description: Option<String>,
    pub outfit: Option<Json<TaskOutfit>>,
    pub main_image_url: Option<String>,
    pub prompts: Json<Prompts>,
    pub generated_images: Json<GeneratedImages>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContentTaskRow> for ContentTask {
    type Error = anyhow::Error;

    fn try_from(row: ContentTaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::try_from(row.status.as_str())?;
        let editing_type = row
            .editing_type
            .as_deref()
            .map(EditingType::try_from)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let location = match (row.location_id, row.location_description) {
            (Some(index), _) => Some(LocationChoice::Saved {
                index: usize::try_from(index)
                    .map_err(|_| anyhow::anyhow!("negative location_id {index}"))?,
            }),
            (None, Some(description)) => Some(LocationChoice::Custom { description }),
            (None, None) => None,
        };

        Ok(ContentTask {
            id: row.id,
            blogger_id: row.blogger_id,
            date: row.date,
            content_type: row.content_type,
            idea: row.idea,
            status,
            script: row.script,
            preview_url: row.preview_url,
            editing_type,
            location,
            outfit: row.outfit.map(|o| o.0),
            main_image_url: row.main_image_url,
            prompts: row.prompts.0,
            generated_images: row.generated_images.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
