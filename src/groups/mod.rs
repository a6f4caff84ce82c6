//! API groups shipped with this crate

pub mod image;
