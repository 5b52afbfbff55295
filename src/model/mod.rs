pub mod apperror;
pub mod config;
pub mod entities;
pub mod models;
