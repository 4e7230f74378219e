//! # nexgen Core Library
//!
//! Geometry and data-layout core for writing diffraction experiment metadata.
//! The library turns a declarative description of an instrument's axes, its
//! scan and its data files into the per-frame positions and frame mapping an
//! encoder writes out. The `nexgen` binary (`main.rs`) is a thin CLI on top.
//!
//! ## Crate Structure
//!
//! - **`geometry`**: the `Axis` model and `GeometryGraph`, the validated
//!   `depends_on` tree of a goniometer or detector chain. Also coordinate frame
//!   conversion to McStas and the detector module origin.
//! - **`scan`**: scan axis identification and per-frame scan point
//!   computation for rotation and grid (raster or snaked) scans.
//! - **`vds`**: the virtual array planner mapping a logical frame index space
//!   onto physical sources, with offset and clipping, plus data-file splitting.
//! - **`encoder`**: the `Encoder` trait and its JSON manifest and HDF5
//!   implementations.
//! - **`config`**: Figment-based configuration loading and validation.
//! - **`pipeline`**: drives configuration through every stage into an encoder.
//! - **`error`**: the `thiserror` error taxonomy.
//! - **`tracing_setup`**: `tracing-subscriber` initialisation.
//! - **`validation`**: small value validators shared by the modules above.

pub mod config;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod scan;
pub mod tracing_setup;
pub mod validation;
pub mod vds;

pub use error::{AppResult, NexgenError};
