//! This file is the root of the `accelflate` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`backend`,
//!     `codec`, `kernels`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the public surface a storage engine programs against.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod backend;
pub mod config;
pub mod kernels;

mod codec;
mod error;
mod traits;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use codec::{BlockCodec, CODEC_NAME};
pub use config::{AccelflateConfig, CompressionMode, ExecutionPath, DEFAULT_LEVEL};
pub use error::AccelflateError;
pub use traits::{AllocFailed, BlockAllocator, Compressor, DefaultAllocator};
