mod handler;
pub mod model;

pub use handler::{get_profile, login, register, update_profile};
