pub mod handlers;
pub mod meta;
