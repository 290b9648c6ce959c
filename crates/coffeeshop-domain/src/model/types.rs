//! Core type definitions for drinks.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Maximum length of a drink title, matching the `VARCHAR(80)` column.
pub const MAX_TITLE_LEN: usize = 80;

/// One ingredient of a recipe (e.g., two parts of blue "water").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    /// Display color of the ingredient.
    pub color: String,
    /// Ingredient name.
    pub name: String,
    /// Quantity in parts relative to the other ingredients.
    pub parts: u32,
}

impl Ingredient {
    /// Creates a new Ingredient.
    pub fn new(name: impl Into<String>, color: impl Into<String>, parts: u32) -> Self {
        Self {
            color: color.into(),
            name: name.into(),
            parts,
        }
    }
}

/// An ingredient without its quantity, as shown to unprivileged callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub name: String,
}

impl From<&Ingredient> for ShortIngredient {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            color: ingredient.color.clone(),
            name: ingredient.name.clone(),
        }
    }
}

/// An ordered, non-empty list of ingredients.
///
/// Serializes as a JSON array; this is also the format persisted in the
/// `recipe` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe(Vec<Ingredient>);

impl Recipe {
    /// Creates a recipe, rejecting an empty ingredient list.
    pub fn new(ingredients: Vec<Ingredient>) -> DomainResult<Self> {
        if ingredients.is_empty() {
            return Err(DomainError::InvalidRecipe {
                message: "recipe must contain at least one ingredient".to_string(),
            });
        }
        Ok(Self(ingredients))
    }

    /// Returns the ingredients in recipe order.
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }

    /// Consumes the recipe, returning its ingredients.
    pub fn into_ingredients(self) -> Vec<Ingredient> {
        self.0
    }

    /// Encodes the recipe as the JSON text stored in the database.
    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Decodes recipe text read back from the database.
    pub fn from_stored(drink_id: i64, text: &str) -> DomainResult<Self> {
        let ingredients: Vec<Ingredient> =
            serde_json::from_str(text).map_err(|e| DomainError::CorruptRecipe {
                drink_id,
                message: e.to_string(),
            })?;
        Self::new(ingredients).map_err(|e| DomainError::CorruptRecipe {
            drink_id,
            message: e.to_string(),
        })
    }
}

/// A validated drink that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Recipe,
}

impl NewDrink {
    /// The drink inserted when the table is reset.
    pub fn seed() -> Self {
        Self {
            title: "water".to_string(),
            recipe: Recipe(vec![Ingredient::new("water", "blue", 1)]),
        }
    }
}

/// A persisted drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    /// Store-assigned identifier.
    pub id: i64,
    /// Unique title.
    pub title: String,
    /// Ingredients in order.
    pub recipe: Recipe,
}

impl Drink {
    /// Builds a persisted drink from its id and validated fields.
    pub fn from_new(id: i64, drink: NewDrink) -> Self {
        Self {
            id,
            title: drink.title,
            recipe: drink.recipe,
        }
    }

    /// Short view: ingredient quantities are omitted.
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(ShortIngredient::from)
                .collect(),
        }
    }

    /// Long view: the full recipe.
    pub fn long(&self) -> LongDrink {
        LongDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.ingredients().to_vec(),
        }
    }
}

/// Serialized short view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

/// Serialized long view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongDrink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}
