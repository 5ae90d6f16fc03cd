//! Domain types for the catalog and order modules.
//!
//! These types represent validated domain objects separate from database row
//! types and from raw request payloads.

pub mod order;
pub mod product;

pub use order::{NewOrder, Order, OrderLine};
pub use product::{NewProduct, Product, ProductDraft, ProductPatch};
