//! WebAssembly bindings for the Zettelkasten decoder.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Decoding the custom block header of a raw block
//! - Mapping output scripts to addresses and addresses to scripts

use std::sync::Arc;

use wasm_bindgen::prelude::*;
use zettel_core::NetworkRegistry;

pub mod codec;
pub mod state;

// Re-export main types for JS access
pub use codec::{decode_header, AddressCodec};

thread_local! {
    static REGISTRY: Arc<NetworkRegistry> = Arc::new(NetworkRegistry::with_defaults());
}

/// Network registry shared by every codec in this module instance.
pub(crate) fn registry() -> Arc<NetworkRegistry> {
    REGISTRY.with(Arc::clone)
}

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
