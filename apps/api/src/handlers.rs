pub mod decommission;
pub mod health;
