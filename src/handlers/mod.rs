//! HTTP handlers

pub mod extract;
pub mod health;
pub mod info;
pub mod predict;
