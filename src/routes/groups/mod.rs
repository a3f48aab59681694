mod handler;
pub mod model;

pub use handler::{
    accept_invitation, create_group, delete_group, get_rules, list_invitations, list_members,
    list_mine, send_invitation, update_rules,
};
