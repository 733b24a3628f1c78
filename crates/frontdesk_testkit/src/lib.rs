//! # Frontdesk Testkit
//!
//! Test utilities for Frontdesk.
//!
//! This crate provides:
//! - Record fixtures with stable timestamps
//! - Wire frame builders, including malformed and unknown frames
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frontdesk_testkit::prelude::*;
//!
//! let text = frames::new_request(&request(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod frames;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::frames;
    pub use crate::generators::*;
}
