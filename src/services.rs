// src/services.rs

pub mod access;
pub mod auth;
pub mod profile_service;
pub mod role_service;
pub mod session;
pub mod team_service;

#[cfg(test)]
pub(crate) mod testing;
