#![allow(clippy::enum_variant_names)]
#![allow(async_fn_in_trait)]

//! Builds minimal filesystem patches from version-control change streams.

pub mod config;
pub mod ext;
pub mod filesystem;
pub mod patch;
