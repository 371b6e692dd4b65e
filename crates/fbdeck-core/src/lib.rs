//! Core of fbdeck: the SDK bootstrap, the session store and the Graph adapter.
//!
//! Frontends hold one [`session::SessionStore`] built from the SDK handle that
//! [`bootstrap::SdkBootstrap::initialize`] resolves.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod sdk;
pub mod session;
pub mod toast;

#[cfg(test)]
mod testing;
