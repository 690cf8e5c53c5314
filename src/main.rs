//! # Voxel Sandbox Entry Point
//!
//! Runs the engine headless. It simply calls into the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- config.json
//! ```

fn main() {
    voxel_sandbox::run();
}
