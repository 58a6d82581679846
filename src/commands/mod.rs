//! Command implementations
//!
//! Each module backs one or more subcommands and stays thin: parse
//! host paths, build domain plans, hand realization to the services layer.

pub mod build;
pub mod export;
pub mod io;
pub mod mfe;
pub mod platform;
pub mod publish;
pub mod release;
pub mod render;
pub mod services;
pub mod stages;
