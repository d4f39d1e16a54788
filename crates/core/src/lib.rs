//! Core domain logic of the trackreel render service.
//!
//! Everything here is free of HTTP and process management: the option
//! framework and its registry, the config-document assembler, the activity
//! data seam and the track builder.

pub mod activity;
pub mod assembler;
pub mod error;
pub mod options;
pub mod registry;
pub mod track;
pub mod types;
