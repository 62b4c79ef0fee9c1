//! Stateful rule-engine context
//!
//! A [`Context`] owns at most one engine handle. It keeps the output flags
//! and dry-run mode across [`Context::refresh`], runs commands with both
//! output streams buffered, and remembers the output of the last successful
//! command so it can be viewed as text, lines, a handle map or JSON.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --new/refresh--> Ready --run/set_*--> Ready
//!       ^                          |
//!       +---- dispose / failed refresh
//! ```
//!
//! The handle is released when it is replaced, when [`Context::dispose`] is
//! called, or when the context is dropped, whichever comes first.
//!
//! # Concurrency
//!
//! Nothing here locks. One context must not be driven from two threads at
//! once; the native engine type is neither `Send` nor `Sync`.

use crate::core::engine::{Backend, Engine};
use crate::core::error::{Error, Result};
use crate::core::flags::{FlagTable, to_flag_bits};
use crate::core::view;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Stateful handle to the rule engine for one logical session
pub struct Context<B: Backend> {
    backend: B,
    engine: Option<B::Engine>,
    /// Flags to re-apply on the next recreate
    output_flags: u32,
    /// Dry-run mode to re-apply on the next recreate
    dry_run: bool,
    last_response: String,
}

impl<B: Backend> Context<B> {
    /// Creates a context with a fresh engine handle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resource` if the handle cannot be allocated or its
    /// output buffers cannot be enabled.
    pub fn new(backend: B) -> Result<Self> {
        let mut ctx = Self {
            backend,
            engine: None,
            output_flags: 0,
            dry_run: false,
            last_response: String::new(),
        };
        ctx.refresh()?;
        Ok(ctx)
    }

    /// Releases the current handle and creates a new one.
    ///
    /// Output flags and dry-run mode are carried over; the last response is
    /// kept. Useful when live counters on a long-lived handle go stale.
    ///
    /// On failure the context is left without a handle and every operation
    /// other than `refresh` and `dispose` returns `Error::Resource`.
    ///
    /// # Errors
    ///
    /// - `Error::Resource` if allocation or buffering fails
    /// - `Error::State` if the engine refuses to restore dry-run mode
    pub fn refresh(&mut self) -> Result<&mut Self> {
        if let Some(old) = self.engine.take() {
            self.output_flags = old.output_flags();
            self.dry_run = old.dry_run();
            // Release before allocating the replacement
            drop(old);
        }

        let mut engine = self
            .backend
            .create()
            .ok_or_else(|| Error::Resource("engine context could not be allocated".to_string()))?;

        if self.output_flags != 0 {
            engine.set_output_flags(self.output_flags);
        }

        if !engine.buffer_output() {
            error!("Failed to enable output buffering");
            return Err(Error::Resource(
                "output buffer could not be enabled".to_string(),
            ));
        }
        if !engine.buffer_error() {
            error!("Failed to enable error buffering");
            return Err(Error::Resource(
                "error buffer could not be enabled".to_string(),
            ));
        }

        if self.dry_run {
            engine.set_dry_run(true);
            if !engine.dry_run() {
                warn!("Engine refused to restore dry-run mode after refresh");
                return Err(Error::State(
                    "dry-run mode could not be restored on the new context".to_string(),
                ));
            }
        }

        info!(
            "Engine context ready (flags={:#x}, dry_run={})",
            self.output_flags, self.dry_run
        );
        self.engine = Some(engine);
        Ok(self)
    }

    /// Releases the engine handle. Calling it again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(engine) = self.engine.take() {
            drop(engine);
            info!("Engine context disposed");
        }
    }

    /// Returns `true` while the context holds a live handle
    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&B::Engine> {
        self.engine.as_ref().ok_or_else(Self::not_ready)
    }

    fn engine_mut(&mut self) -> Result<&mut B::Engine> {
        self.engine.as_mut().ok_or_else(Self::not_ready)
    }

    fn not_ready() -> Error {
        Error::Resource("context has no engine handle; call refresh()".to_string())
    }

    /// Runs one or more newline-separated commands.
    ///
    /// On success the engine output becomes the new last response. On
    /// failure the previous response is kept. Re-running an `add` may create
    /// duplicates; that is up to the engine.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the text contains a NUL byte
    /// - `Error::Command` with the engine's error buffer if it rejects the text
    /// - `Error::Resource` if the context has no handle
    pub fn run(&mut self, cmd: &str) -> Result<&mut Self> {
        if cmd.contains('\0') {
            return Err(Error::validation("command", "contains a NUL byte"));
        }

        let engine = self.engine_mut()?;
        debug!("Running command: {}", cmd.trim_end());

        match engine.run_cmd(cmd) {
            Ok(output) => {
                self.last_response = output;
                Ok(self)
            }
            Err(message) => {
                debug!("Command rejected: {}", message.trim_end());
                Err(Error::Command { message })
            }
        }
    }

    /// Replaces the output flags with the union of `flags`.
    ///
    /// Accepts any integer type; each value must be a non-negative 32-bit
    /// integer. Returns the flags the engine reports afterward.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if `flags` is empty or a value is out of range
    /// - `Error::Resource` if the context has no handle
    pub fn set_output_flags<T>(&mut self, flags: &[T]) -> Result<u32>
    where
        T: TryInto<u32> + Copy + fmt::Display,
    {
        if flags.is_empty() {
            return Err(Error::validation(
                "flags",
                "at least one output flag is required",
            ));
        }

        let bits = flags
            .iter()
            .try_fold(0u32, |acc, &f| Ok::<_, Error>(acc | to_flag_bits(f)?))?;

        let engine = self.engine_mut()?;
        engine.set_output_flags(bits);
        let actual = engine.output_flags();
        self.output_flags = bits;

        debug!("Output flags set to {:#x}", actual);
        Ok(actual)
    }

    /// Current output flags, read from the engine
    ///
    /// # Errors
    ///
    /// Returns `Error::Resource` if the context has no handle.
    pub fn output_flags(&self) -> Result<u32> {
        Ok(self.engine()?.output_flags())
    }

    /// Switches dry-run mode and confirms the engine accepted it.
    ///
    /// # Errors
    ///
    /// - `Error::State` if the engine reports a different mode afterward
    /// - `Error::Resource` if the context has no handle
    pub fn set_dry_run(&mut self, enabled: bool) -> Result<()> {
        let engine = self.engine_mut()?;
        engine.set_dry_run(enabled);
        let actual = engine.dry_run();

        if actual != enabled {
            warn!("Engine refused dry-run change (requested {enabled}, got {actual})");
            return Err(Error::State(format!(
                "dry-run mode change failed: requested {enabled}, engine reports {actual}"
            )));
        }

        self.dry_run = enabled;
        debug!("Dry-run mode {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    /// Shorthand for `set_dry_run(true)`
    ///
    /// # Errors
    ///
    /// See [`Context::set_dry_run`].
    pub fn enable_dry_run(&mut self) -> Result<()> {
        self.set_dry_run(true)
    }

    /// Current dry-run mode, read from the engine
    ///
    /// # Errors
    ///
    /// Returns `Error::Resource` if the context has no handle.
    pub fn dry_run(&self) -> Result<bool> {
        Ok(self.engine()?.dry_run())
    }

    /// Flag values of the backing library
    pub fn flags(&self) -> &'static FlagTable {
        self.backend.flags()
    }

    /// Output of the last successful command, verbatim
    pub fn text(&self) -> &str {
        view::text(&self.last_response)
    }

    /// Last response split into cleaned, non-empty lines
    pub fn lines(&self) -> Vec<String> {
        view::lines(&self.last_response)
    }

    /// Handle to description map of the last response
    pub fn handles(&self) -> BTreeMap<String, String> {
        view::handles(&self.last_response)
    }

    /// Last response parsed as JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::Format` if the last response is not JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        view::json(&self.last_response)
    }
}

impl<B: Backend> fmt::Debug for Context<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("ready", &self.is_ready())
            .field("output_flags", &self.output_flags)
            .field("dry_run", &self.dry_run)
            .field("last_response_len", &self.last_response.len())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Drop for Context<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
