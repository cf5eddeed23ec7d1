//! Player / shooter components

pub mod player;

pub use player::*;
