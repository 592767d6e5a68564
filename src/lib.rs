//! Post cache and nested route lookup for the ClimateFair blog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
