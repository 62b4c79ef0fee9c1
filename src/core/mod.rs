//! Rule-engine context and result views
//!
//! This module contains the engine-facing half of nftctx:
//!
//! - [`context`]: The stateful [`Context`](context::Context) owning one engine handle
//! - [`view`]: Text, line, handle-map and JSON views of a captured response
//! - [`flags`]: Output flag names and the per-library flag table
//! - [`engine`]: The `Engine`/`Backend` traits a library must implement
//! - [`native`]: The libnftables backend (feature `native`)
//! - [`error`]: Error types for context operations

pub mod context;
pub mod engine;
pub mod error;
pub mod flags;
#[cfg(feature = "native")]
pub mod native;
pub mod view;

#[cfg(test)]
pub mod test_helpers;
