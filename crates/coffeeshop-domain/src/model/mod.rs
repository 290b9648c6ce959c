//! Drink model types.
//!
//! This module contains:
//! - Core type definitions (Drink, Recipe, Ingredient)
//! - The short and long serialized views of a drink

mod types;
#[cfg(test)]
mod types_proptest;

pub use types::*;
