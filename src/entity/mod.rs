pub mod nodes;
pub mod readings;
pub mod users;
