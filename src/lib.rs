//! Common functionality for the geolens analysis engine.
#![warn(missing_docs)]
pub mod analysis;
pub mod cli;
pub mod clustering;
pub mod config;
pub mod coverage;
pub mod customer;
pub mod forecast;
pub mod geometry;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod service_point;
pub mod settings;

#[cfg(test)]
mod fixture;
