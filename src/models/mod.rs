// src/models/mod.rs

pub mod workspace;
pub mod membership;
pub mod task;
pub mod tag;
pub mod attachment;
