// src/models/mod.rs

pub mod attempt;
pub mod course;
pub mod enrollment;
pub mod notification;
pub mod quiz;
