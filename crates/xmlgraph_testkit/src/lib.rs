//! # xmlgraph testkit
//!
//! Test utilities for xmlgraph.
//!
//! This crate provides:
//! - Fixture types (points, shapes, layers, drawings, an adapter-covered
//!   colour) and a persister with all of them registered
//! - Property-based test generators using proptest
//! - Helpers that run a value through save, XML text and load
//! - Log capture for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xmlgraph_testkit::prelude::*;
//!
//! #[test]
//! fn drawing_survives_text() {
//!     let persister = fixture_persister();
//!     let drawing = sample_drawing();
//!     assert_eq!(round_trip(&persister, &drawing).unwrap(), drawing);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
