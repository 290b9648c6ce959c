//! coffeeshop-domain: Core drink model and rules
//!
//! This crate contains the domain logic shared by the storage and API layers:
//! - Drink, recipe and ingredient types with their short and long views
//! - Validation of incoming drink payloads
//! - Permission names carried by bearer tokens
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              coffeeshop-domain              │
//! ├─────────────────────────────────────────────┤
//! │  model/       - Drink types & views         │
//! │  validation/  - Payload validation          │
//! │  permissions  - Token permission names      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod permissions;
pub mod validation;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use model::{Drink, Ingredient, LongDrink, NewDrink, Recipe, ShortDrink, ShortIngredient};
pub use permissions::Permission;
pub use validation::DrinkPayload;
