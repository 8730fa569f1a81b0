//! Content Plan Generator: one PLANNED task per scheduled day of a month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::{Blogger, BloggerKind};
use crate::models::task::NewTask;
use crate::planning::weekly::{build_weekly_pattern, WeeklyFrequency, WeeklyPattern};
use crate::providers::{TextGenerator, TextOutcome, TextRequest};
use crate::store::{self, ContentStore};
use crate::tasks::TaskStatus;

const IDEA_MAX_TOKENS: u32 = 120;
const IDEA_SYSTEM_PROMPT: &str =
    "You are a content strategist. Reply with a single content idea of one or two sentences.";

/// Fixed Northern-hemisphere seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

/// Blogger details embedded in every idea prompt.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub name: String,
    pub kind: BloggerKind,
    pub theme: Option<String>,
    pub tone_of_voice: Option<String>,
}

impl PlanContext {
    pub fn from_blogger(blogger: &Blogger) -> Self {
        Self {
            name: blogger.name.clone(),
            kind: blogger.kind,
            theme: blogger.theme.clone(),
            tone_of_voice: blogger.tone_of_voice.clone(),
        }
    }

    fn theme_or_default(&self) -> &str {
        self.theme
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("lifestyle")
    }
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub blogger_id: Uuid,
    /// Ordered calendar days to plan.
    pub dates: Vec<NaiveDate>,
    pub frequency: WeeklyFrequency,
    pub context: PlanContext,
}

/// Every day of `month`, in order. Empty for an invalid year/month.
pub fn month_dates(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect()
}

/// How many of `dates` the pattern schedules content on.
pub fn count_scheduled(pattern: &WeeklyPattern, dates: &[NaiveDate]) -> usize {
    dates.iter().filter(|d| pattern.for_date(**d).is_some()).count()
}

/// Creates one PLANNED task per scheduled date and returns how many were created.
///
/// An idea that cannot be generated falls back to a templated one; it never
/// aborts the batch. Store errors do.
pub async fn generate_plan(
    store: &dyn ContentStore,
    text: &dyn TextGenerator,
    request: &PlanRequest,
) -> Result<usize, AppError> {
    let pattern = build_weekly_pattern(&request.frequency);
    let mut created = 0;

    for &date in &request.dates {
        let Some(content_type) = pattern.for_date(date) else {
            continue;
        };

        let idea = generate_idea(text, &request.context, content_type, date).await;
        store
            .create_task(&NewTask {
                blogger_id: request.blogger_id,
                date,
                content_type: content_type.to_string(),
                idea: Some(idea),
                editing_type: None,
                status: TaskStatus::Planned,
            })
            .await?;
        created += 1;
    }

    info!(
        "Planned {created} tasks for blogger {} over {} days",
        request.blogger_id,
        request.dates.len()
    );
    Ok(created)
}

/// Worker side of a `plan_month` job.
pub async fn run_month_plan(
    store: &dyn ContentStore,
    text: &dyn TextGenerator,
    blogger_id: Uuid,
    year: i32,
    month: u32,
) -> Result<usize, AppError> {
    let blogger = store::require_blogger(store, blogger_id).await?;
    let dates = month_dates(year, month);
    if dates.is_empty() {
        return Err(AppError::Validation(format!("{year}-{month} is not a valid month")));
    }

    let request = PlanRequest {
        blogger_id,
        dates,
        frequency: blogger.content_frequency.clone(),
        context: PlanContext::from_blogger(&blogger),
    };
    generate_plan(store, text, &request).await
}

async fn generate_idea(
    text: &dyn TextGenerator,
    context: &PlanContext,
    content_type: &str,
    date: NaiveDate,
) -> String {
    let prompt = idea_prompt(context, content_type, date);
    let outcome = text
        .generate_text(TextRequest {
            prompt: &prompt,
            max_tokens: IDEA_MAX_TOKENS,
            system: IDEA_SYSTEM_PROMPT,
        })
        .await;

    match outcome {
        TextOutcome::Generated(idea) => idea,
        TextOutcome::Fallback { reason, .. } => {
            warn!("Using templated idea for {date} ({content_type}): {reason}");
            format!(
                "idea for {content_type} about {}",
                context.theme_or_default()
            )
        }
    }
}

fn idea_prompt(context: &PlanContext, content_type: &str, date: NaiveDate) -> String {
    let mut prompt = format!(
        "Suggest a {content_type} idea for {}, a {} blogger, on {} ({}).",
        context.name,
        context.kind.as_str(),
        date.format("%B %-d, %Y"),
        Season::of(date).as_str(),
    );
    if let Some(theme) = context.theme.as_deref() {
        prompt.push_str(&format!("\nTheme: {theme}"));
    }
    if let Some(tone) = context.tone_of_voice.as_deref() {
        prompt.push_str(&format!("\nTone of voice: {tone}"));
    }
    prompt
}
