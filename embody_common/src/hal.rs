//! Board interfaces consumed by the control core.
//!
//! The register-level drivers live outside this workspace; the core only
//! sees the traits in [`driver`].

pub mod driver;
