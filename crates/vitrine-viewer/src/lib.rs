//! Vitrine Viewer - WebGPU-powered product gallery and 3D model viewer
//!
//! This crate provides the browser frontend using Bevy and egui.

mod app;
mod models;
mod network;
mod scene;
mod storage;
mod ui;

use wasm_bindgen::prelude::*;

pub use app::run;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build()
    );

    app::run();
}
