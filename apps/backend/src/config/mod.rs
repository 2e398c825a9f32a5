//! Configuration tree, its two sources, and the token signing secret.

pub mod app;
pub mod loader;
pub mod secret;
