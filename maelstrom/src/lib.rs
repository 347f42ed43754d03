pub mod config;
pub mod controller;

pub use controller::{Gateway, Maelstrom};
