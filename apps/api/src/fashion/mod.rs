//! Fashion Frame Pipeline: main frame, approval, angle variations.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
