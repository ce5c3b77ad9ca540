//! Request handlers

pub mod blob;
pub mod health;
pub mod metadata;
pub mod upload;
