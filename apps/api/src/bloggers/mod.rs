pub mod handlers;
pub mod wardrobe;
