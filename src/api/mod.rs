//! API handlers for the scanner REST endpoints

pub mod camera;
pub mod health;
pub mod openapi;
pub mod scanner;
