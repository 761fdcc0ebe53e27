pub mod cache;
pub mod candidates;
pub mod conversations;
pub mod events;
