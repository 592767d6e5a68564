//! Application services: post retrieval, caches, and rebuild orchestration.

pub mod error;
pub mod fetcher;
pub mod lookup;
pub mod posts;
pub mod refresh;
pub mod sitemap;
pub mod source;
pub mod store;
pub mod urls;
