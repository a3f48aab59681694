pub mod auth;
pub mod events;
pub mod expenses;
pub mod groups;
pub mod health;
