//! Host-side display content

pub mod mirror;

pub use mirror::{DisplayMirror, BLANK};
