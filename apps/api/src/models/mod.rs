pub mod blogger;
pub mod history;
pub mod task;
