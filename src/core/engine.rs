//! Seam between the context and the rule-engine library
//!
//! [`Engine`] is one live engine handle; dropping it frees the handle.
//! [`Backend`] creates engines and reports the library's flag values.

use crate::core::flags::FlagTable;

/// A single live handle into the rule engine.
///
/// Implementations free the underlying handle in `Drop`.
pub trait Engine {
    /// Current output flag bitmask as held by the engine
    fn output_flags(&self) -> u32;

    fn set_output_flags(&mut self, flags: u32);

    fn dry_run(&self) -> bool;

    /// Requests dry-run mode. The engine may ignore the request.
    fn set_dry_run(&mut self, enabled: bool);

    /// Redirects normal output into an in-memory buffer.
    ///
    /// Returns `false` if buffering could not be enabled.
    fn buffer_output(&mut self) -> bool;

    /// Redirects error output into an in-memory buffer.
    ///
    /// Returns `false` if buffering could not be enabled.
    fn buffer_error(&mut self) -> bool;

    /// Runs one or more newline-separated commands.
    ///
    /// Returns the output buffer on success and the error buffer on failure.
    fn run_cmd(&mut self, cmd: &str) -> std::result::Result<String, String>;
}

/// Factory for engine handles of one library.
pub trait Backend {
    type Engine: Engine;

    /// Allocates a new handle, or `None` if the library returned null
    fn create(&self) -> Option<Self::Engine>;

    /// Flag values of this library, fixed for the life of the process
    fn flags(&self) -> &'static FlagTable;
}
