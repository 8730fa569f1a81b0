/// Prompt templates for the fashion frame pipeline.
///
/// Each frame prompt is written by the text generator from a request below.
/// When the text generator is unavailable the `fallback_*` builders produce a
/// usable image prompt directly, so a placeholder never reaches the image model.
use crate::models::blogger::Blogger;
use crate::models::task::{FrameKey, TaskOutfit};

pub const PROMPT_MAX_TOKENS: u32 = 300;

pub const PROMPT_WRITER_SYSTEM: &str = "You write prompts for a photorealistic image model. \
Reply with the prompt text only.";

/// The three fixed angle variations, in generation order.
pub const ANGLES: [(FrameKey, &str); 3] = [
    (
        FrameKey::Angle1,
        "close-up shot focusing on upper body and face, same outfit and location",
    ),
    (
        FrameKey::Angle2,
        "medium shot from waist up, slightly angled to the side",
    ),
    (
        FrameKey::Angle3,
        "detail shot focusing on outfit accessories and styling details",
    ),
];

/// Inputs shared by the main-frame request and its fallback.
pub struct MainFrameBrief<'a> {
    pub blogger: &'a Blogger,
    pub location: Option<&'a str>,
    pub outfit: Option<&'a TaskOutfit>,
    pub custom_instructions: Option<&'a str>,
}

impl MainFrameBrief<'_> {
    fn outfit_description(&self) -> String {
        self.outfit
            .map(TaskOutfit::describe)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "blogger's choice".to_string())
    }
}

pub fn main_frame_request(brief: &MainFrameBrief<'_>) -> String {
    let blogger = brief.blogger;
    let mut prompt = format!(
        "Create a detailed prompt for a full-height fashion photo of a blogger.\n\n\
         Context:\n\
         - Blogger: {} ({})\n\
         - Location: {}\n\
         - Outfit: {}\n\
         - Style: full-height fashion photography, professional quality, 9:16 portrait\n",
        blogger.name,
        blogger.theme.as_deref().unwrap_or("fashion"),
        brief.location.unwrap_or("photographer's choice"),
        brief.outfit_description(),
    );
    if let Some(extra) = brief.custom_instructions {
        prompt.push_str(&format!("- Additional instructions: {extra}\n"));
    }
    prompt.push_str("\nInclude pose, angle, lighting and mood. Keep it under 200 tokens.");
    prompt
}

pub fn fallback_main_prompt(brief: &MainFrameBrief<'_>) -> String {
    let mut prompt = format!(
        "Full-height fashion photo of {}, wearing {}, at {}. \
         Professional fashion photography, natural pose, soft directional light",
        brief.blogger.name,
        brief.outfit_description(),
        brief.location.unwrap_or("a stylish urban setting"),
    );
    if let Some(extra) = brief.custom_instructions {
        prompt.push_str(". ");
        prompt.push_str(extra);
    }
    prompt
}

pub fn angle_request(index: usize, base_prompt: &str, angle: &str) -> String {
    format!(
        "Create a prompt variation for angle {index}.\n\n\
         Base prompt: {base_prompt}\n\
         Angle description: {angle}\n\n\
         Keep the same style, lighting and location. Only change: {angle}\n\
         Return the updated prompt only."
    )
}

pub fn fallback_angle_prompt(base_prompt: &str, angle: &str) -> String {
    format!("{base_prompt}. Same outfit, location and lighting; {angle}")
}
