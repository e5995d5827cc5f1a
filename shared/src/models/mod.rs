//! Data models
//!
//! Directory and configuration records consulted by the fulfillment core.
//! Catalog and merchant maintenance happen elsewhere; these are the shapes
//! they persist.

pub mod merchant;
pub mod merchant_product;
pub mod product;
pub mod settings;

// Re-exports
pub use merchant::*;
pub use merchant_product::*;
pub use product::*;
pub use settings::*;
