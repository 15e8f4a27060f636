//! Shared picker logic: metadata resolution, stream selection, fragment state
//! and catalog filtering. The `media-picker` binary wires these into a session.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod fragment;
pub mod platform;
pub mod protocol;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod state;
pub mod transcode;

pub use error::{PickerError, Result};
