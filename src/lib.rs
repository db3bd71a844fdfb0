//! fwgen core library.
//!
//! fwgen locates an ARM cross toolchain somewhere on disk and generates a
//! build description for bare-metal firmware sources: either a Ninja
//! dependency graph or a flat Makefile flavour driven by a settings block.

pub mod builder;
pub mod cli;
pub mod fetch;
pub mod graph;
pub mod makefile;
pub mod ninja;
pub mod platform;
pub mod runner;
pub mod settings;
pub mod sources;
mod stamp;
pub mod toolchain;
