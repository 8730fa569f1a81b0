//! A blogger's saved locations and outfits, and AI images for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::{Blogger, GarmentSlot, Location, Outfit};
use crate::providers::{AspectRatio, AssetMirror, ImageGenerator, ImageRequest};
use crate::store::{self, ContentStore};

#[derive(Debug, Deserialize)]
pub struct OutfitGenerateRequest {
    pub name: String,
    pub parts: BTreeMap<GarmentSlot, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub image_url: String,
    pub prompt: String,
}

async fn update_blogger<F>(
    store: &dyn ContentStore,
    id: Uuid,
    change: F,
) -> Result<Blogger, AppError>
where
    F: FnOnce(&mut Blogger) -> Result<(), AppError> + Send,
{
    let mut blogger = store::require_blogger(store, id).await?;
    change(&mut blogger)?;
    store.save_blogger(&blogger).await?;
    Ok(blogger)
}

fn remove_at<T>(items: &mut Vec<T>, index: usize, what: &str) -> Result<(), AppError> {
    if index >= items.len() {
        return Err(AppError::NotFound(format!("{what} {index} not found")));
    }
    items.remove(index);
    Ok(())
}

pub async fn add_location(
    store: &dyn ContentStore,
    blogger_id: Uuid,
    location: Location,
) -> Result<Blogger, AppError> {
    if location.title.trim().is_empty() {
        return Err(AppError::Validation("Location title is required".to_string()));
    }
    update_blogger(store, blogger_id, |b| {
        b.locations.push(location);
        Ok(())
    })
    .await
}

/// Later locations shift down one index; tasks referencing them by index are not rewritten.
pub async fn remove_location(
    store: &dyn ContentStore,
    blogger_id: Uuid,
    index: usize,
) -> Result<Blogger, AppError> {
    update_blogger(store, blogger_id, |b| remove_at(&mut b.locations, index, "Location")).await
}

pub async fn add_outfit(
    store: &dyn ContentStore,
    blogger_id: Uuid,
    outfit: Outfit,
) -> Result<Blogger, AppError> {
    if outfit.name.trim().is_empty() {
        return Err(AppError::Validation("Outfit name is required".to_string()));
    }
    update_blogger(store, blogger_id, |b| {
        b.outfits.push(outfit);
        Ok(())
    })
    .await
}

pub async fn remove_outfit(
    store: &dyn ContentStore,
    blogger_id: Uuid,
    index: usize,
) -> Result<Blogger, AppError> {
    update_blogger(store, blogger_id, |b| remove_at(&mut b.outfits, index, "Outfit")).await
}

/// Landscape (16:9) location image from a free-text prompt. Nothing is saved
/// on the blogger; the caller adds the location with the returned URL.
pub async fn generate_location_image(
    store: &dyn ContentStore,
    images: &dyn ImageGenerator,
    mirror: &dyn AssetMirror,
    blogger_id: Uuid,
    prompt: &str,
) -> Result<GeneratedImage, AppError> {
    images.check_configured()?;
    if prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }
    store::require_blogger(store, blogger_id).await?;

    let url = images
        .generate_image(ImageRequest {
            prompt,
            aspect_ratio: AspectRatio::Landscape16x9,
            reference_image: None,
        })
        .await?;
    let key = format!("bloggers/{blogger_id}/locations/{}.jpg", Uuid::new_v4());
    let image_url = mirror.mirror(&url, &key).await;

    info!("Generated location image for blogger {blogger_id}");
    Ok(GeneratedImage {
        image_url,
        prompt: prompt.to_string(),
    })
}

/// Composite 3:4 outfit image. The first part with an http(s) URL, in slot
/// order, is the reference image for edit mode.
pub async fn generate_outfit_image(
    store: &dyn ContentStore,
    images: &dyn ImageGenerator,
    mirror: &dyn AssetMirror,
    blogger_id: Uuid,
    request: &OutfitGenerateRequest,
) -> Result<GeneratedImage, AppError> {
    images.check_configured()?;
    store::require_blogger(store, blogger_id).await?;

    let (prompt, reference) = outfit_prompt(request);
    let url = images
        .generate_image(ImageRequest {
            prompt: &prompt,
            aspect_ratio: AspectRatio::Portrait3x4,
            reference_image: reference,
        })
        .await?;
    let key = format!("bloggers/{blogger_id}/outfits/{}.jpg", Uuid::new_v4());
    let image_url = mirror.mirror(&url, &key).await;

    info!("Generated outfit image '{}' for blogger {blogger_id}", request.name);
    Ok(GeneratedImage { image_url, prompt })
}

fn outfit_prompt(request: &OutfitGenerateRequest) -> (String, Option<&str>) {
    let present: Vec<(&GarmentSlot, &str)> = request
        .parts
        .iter()
        .map(|(slot, url)| (slot, url.trim()))
        .filter(|(_, url)| !url.is_empty())
        .collect();
    let reference = present
        .iter()
        .map(|(_, url)| *url)
        .find(|url| url.starts_with("http"));
    let parts = present
        .iter()
        .map(|(slot, _)| format!("{} clothing", slot.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "Full body fashion photography of model wearing {} outfit: {parts}. \
         Studio lighting, white background, full height portrait, professional fashion shoot, high quality",
        request.name
    );
    (prompt, reference)
}
