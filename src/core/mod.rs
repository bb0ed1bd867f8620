//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod investment;
pub mod log;
pub mod price;
pub mod remote;
pub mod valuation;

// Re-export main types for cleaner imports
pub use investment::{Asset, AssetKind, Investment, PriceStatus, Tenor};
pub use price::PriceProvider;
pub use remote::RemoteStore;
