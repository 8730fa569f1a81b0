//! Fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::jobs::queue::RecordingQueue;
use crate::models::blogger::{Blogger, BloggerDraft, BloggerKind, Location};
use crate::models::task::{ContentTask, NewTask};
use crate::providers::fakes::{MemoryStorage, RecordingImages, ScriptedText, StaticMedia};
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::ContentStore;
use crate::tasks::TaskStatus;

/// State wired to in-memory fakes. The text provider is unavailable, so
/// anything written by AI is the placeholder.
pub fn test_state(store: Arc<MemoryStore>, jobs: Arc<RecordingQueue>) -> AppState {
    let storage = Arc::new(MemoryStorage::default());
    let media = Arc::new(StaticMedia::default());
    AppState {
        store,
        jobs,
        text: Arc::new(ScriptedText::unavailable()),
        images: Arc::new(RecordingImages::new()),
        videos: media.clone(),
        voices: media,
        storage: storage.clone(),
        mirror: storage,
    }
}

pub fn fashion_draft() -> BloggerDraft {
    BloggerDraft {
        name: "Mila".into(),
        kind: BloggerKind::Fashion,
        image: Some("https://cdn.test/mila.jpg".into()),
        tone_of_voice: Some("warm and witty".into()),
        theme: Some("slow fashion".into()),
        voice_id: None,
        content_frequency: [("reels", 3), ("post", 2)].into_iter().collect(),
        locations: vec![
            Location {
                title: "Old town".into(),
                description: Some("cobbled street with warm evening light".into()),
                thumbnail: None,
            },
            Location {
                title: "Studio".into(),
                description: None,
                thumbnail: None,
            },
        ],
        outfits: Vec::new(),
        editing_types_enabled: Vec::new(),
        subtitles_enabled: false,
    }
}

pub async fn seed_blogger(store: &MemoryStore) -> Blogger {
    let blogger = Blogger::from_draft(fashion_draft());
    store.insert_blogger(&blogger).await.unwrap();
    blogger
}

pub async fn seed_task(store: &MemoryStore, blogger_id: Uuid, status: TaskStatus) -> ContentTask {
    store
        .create_task(&NewTask {
            blogger_id,
            date: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            content_type: "reels".into(),
            idea: Some("Layering a wool coat three ways".into()),
            editing_type: None,
            status,
        })
        .await
        .unwrap()
}
