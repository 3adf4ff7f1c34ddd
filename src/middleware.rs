// src/middleware.rs

pub mod access;
pub mod auth;
