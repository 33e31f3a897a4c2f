//! Catalog generation and site publishing for the OSC catalog.
//!
//! Turns the CSV tables into a linked STAC tree, lays it out on disk, and
//! drives the client build and publish steps around it (`run_site`).

pub mod assembler;
pub mod builder;
pub mod pipeline;
pub mod publish;
pub mod runner;
pub mod site;
pub mod slug;
pub mod summary;
