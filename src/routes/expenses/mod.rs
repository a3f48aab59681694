mod handler;
pub mod model;

pub use handler::{create_expense, delete_expense, group_balance, list_group_expenses};
