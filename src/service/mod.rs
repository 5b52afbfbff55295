pub mod catalog;
pub mod password;
pub mod search;
