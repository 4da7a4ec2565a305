pub mod conversation;
pub mod health;
pub mod predict;
