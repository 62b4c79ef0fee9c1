//! libnftables backend
//!
//! Bindings are generated from the installed `nftables/libnftables.h` by the
//! build script, so the output flag values always match the linked library.

use crate::core::engine::{Backend, Engine};
use crate::core::flags::FlagTable;
use std::ffi::{CStr, CString, c_char};
use std::ptr::NonNull;
use std::sync::LazyLock;
use tracing::{debug, error};

#[allow(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    dead_code,
    clippy::pedantic
)]
mod sys {
    include!(concat!(env!("OUT_DIR"), "/libnftables.rs"));
}

static FLAGS: LazyLock<FlagTable> = LazyLock::new(|| FlagTable {
    reverse_dns: sys::NFT_CTX_OUTPUT_REVERSEDNS as u32,
    service: sys::NFT_CTX_OUTPUT_SERVICE as u32,
    stateless: sys::NFT_CTX_OUTPUT_STATELESS as u32,
    handle: sys::NFT_CTX_OUTPUT_HANDLE as u32,
    json: sys::NFT_CTX_OUTPUT_JSON as u32,
    echo: sys::NFT_CTX_OUTPUT_ECHO as u32,
    guid: sys::NFT_CTX_OUTPUT_GUID as u32,
    numeric_proto: sys::NFT_CTX_OUTPUT_NUMERIC_PROTO as u32,
    numeric_prio: sys::NFT_CTX_OUTPUT_NUMERIC_PRIO as u32,
    numeric_symbol: sys::NFT_CTX_OUTPUT_NUMERIC_SYMBOL as u32,
    numeric_time: sys::NFT_CTX_OUTPUT_NUMERIC_TIME as u32,
    numeric_all: sys::NFT_CTX_OUTPUT_NUMERIC_ALL as u32,
    terse: sys::NFT_CTX_OUTPUT_TERSE as u32,
});

/// The system libnftables
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    type Engine = NativeEngine;

    fn create(&self) -> Option<NativeEngine> {
        // SAFETY: nft_ctx_new has no preconditions; a null result is handled below
        let raw = unsafe { sys::nft_ctx_new(sys::NFT_CTX_DEFAULT as _) };
        let ctx = NonNull::new(raw)?;
        debug!("Allocated libnftables context {:p}", raw);
        Some(NativeEngine { ctx })
    }

    fn flags(&self) -> &'static FlagTable {
        &FLAGS
    }
}

/// An owned `struct nft_ctx *`.
///
/// Not `Send`/`Sync`: libnftables keeps per-context buffers that must not be
/// touched from two threads.
#[derive(Debug)]
pub struct NativeEngine {
    ctx: NonNull<sys::nft_ctx>,
}

impl NativeEngine {
    fn raw(&self) -> *mut sys::nft_ctx {
        self.ctx.as_ptr()
    }

    /// Copies a buffer owned by libnftables into a Rust string
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a NUL-terminated string that stays
    /// valid for the duration of this call.
    unsafe fn take_buffer(ptr: *const c_char) -> String {
        if ptr.is_null() {
            return String::new();
        }
        // SAFETY: guaranteed by the caller
        unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Engine for NativeEngine {
    fn output_flags(&self) -> u32 {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_output_get_flags(self.raw()) as u32 }
    }

    fn set_output_flags(&mut self, flags: u32) {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_output_set_flags(self.raw(), flags as _) }
    }

    fn dry_run(&self) -> bool {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_get_dry_run(self.raw()) }
    }

    fn set_dry_run(&mut self, enabled: bool) {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_set_dry_run(self.raw(), enabled) }
    }

    fn buffer_output(&mut self) -> bool {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_buffer_output(self.raw()) == 0 }
    }

    fn buffer_error(&mut self) -> bool {
        // SAFETY: self.ctx is a live context for the lifetime of self
        unsafe { sys::nft_ctx_buffer_error(self.raw()) == 0 }
    }

    fn run_cmd(&mut self, cmd: &str) -> std::result::Result<String, String> {
        // Older headers take a non-const buffer, so hand over an owned copy
        let mut buf = CString::new(cmd)
            .map_err(|e| format!("command contains a NUL byte: {e}"))?
            .into_bytes_with_nul();

        // SAFETY: buf is NUL-terminated and outlives the call
        let rc = unsafe { sys::nft_run_cmd_from_buffer(self.raw(), buf.as_mut_ptr().cast::<c_char>()) };

        if rc == 0 {
            // SAFETY: libnftables returns its own NUL-terminated buffer
            Ok(unsafe { Self::take_buffer(sys::nft_ctx_get_output_buffer(self.raw())) })
        } else {
            // SAFETY: libnftables returns its own NUL-terminated buffer
            let message = unsafe { Self::take_buffer(sys::nft_ctx_get_error_buffer(self.raw())) };
            if message.is_empty() {
                error!("libnftables returned {rc} without an error message");
            }
            Err(message)
        }
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        debug!("Freeing libnftables context {:p}", self.raw());
        // SAFETY: self.ctx came from nft_ctx_new and is freed exactly once here
        unsafe { sys::nft_ctx_free(self.raw()) }
    }
}
