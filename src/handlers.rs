// src/handlers.rs

pub mod access;
pub mod auth;
pub mod profiles;
pub mod teams;
