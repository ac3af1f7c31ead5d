//! Reusable rendering helpers shared across screens.

pub mod badge;
