mod handler;
pub mod model;

pub use handler::{create_event, delete_event, list_group_events, update_event};
