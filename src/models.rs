// src/models.rs

pub mod auth;
pub mod profile;
pub mod role;
pub mod team;
