//! VCR command-line client library
//!
//! Hosts the self-update core behind `vcr update` together with the build
//! information and configuration it runs with.

pub mod config;
pub mod ui;
pub mod update;
