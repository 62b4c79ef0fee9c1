//! nftctx - a stateful libnftables context
//!
//! Wraps one libnftables handle, keeps its output flags and dry-run mode
//! across re-creation, and turns the buffered output of the last command
//! into four views: raw text, cleaned lines, a handle map and parsed JSON.
//!
//! # Architecture
//!
//! - [`core`] - Context lifecycle, result views, flag table and the engine seam
//! - [`cli`] - Command-line front end, generic over the engine backend
//! - [`config`] - Configuration persistence
//! - [`audit`] - Audit log of submitted commands
//! - [`utils`] - Utility functions (XDG directories, command input)
//!
//! # Example
//!
//! ```ignore
//! use nftctx::core::context::Context;
//! use nftctx::core::flags::OutputFlag;
//! use nftctx::core::native::NativeBackend;
//!
//! let mut ctx = Context::new(NativeBackend)?;
//! let handle = ctx.flags().value(OutputFlag::Handle);
//! ctx.set_output_flags(&[handle])?;
//! for (handle, object) in ctx.run("list ruleset")?.handles() {
//!     println!("{handle}: {object}");
//! }
//! # Ok::<(), nftctx::Error>(())
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::context::Context;
pub use crate::core::engine::{Backend, Engine};
pub use crate::core::error::{Error, Result};
pub use crate::core::flags::{FlagTable, OutputFlag};
pub use crate::core::view::View;
