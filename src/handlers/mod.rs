// src/handlers/mod.rs

pub mod courses;
pub mod enrollment;
pub mod notifications;
pub mod quiz;
