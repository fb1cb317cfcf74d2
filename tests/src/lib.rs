//! # Schema RPC Client Test Suite
//!
//! Cross-crate scenarios. Unit tests live next to the code in each crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # client wired to in-memory transports
//!     ├── flows.rs        # dispatch → pending → push / poll completion
//!     └── validation.rs   # schema loading and validation properties
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rc-tests
//! cargo test -p rc-tests integration::flows::
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
