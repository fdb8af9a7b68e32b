// src/models/mod.rs

pub mod document;
pub mod principal;
pub mod question;
pub mod settings;
pub mod submission;
pub mod user;
