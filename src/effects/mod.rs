//! # Theme Effects
//!
//! Optional, theme-specific gags that react to what the host page does rather than restyling it.

pub mod crash;

pub use crash::{CrashEffect, CrashExit, MODAL_SELECTORS};
