//! Drink payload validation.
//!
//! Request bodies are accepted loosely (any JSON value per field) so that a
//! well-formed JSON object with the wrong shape is reported as a validation
//! failure rather than a parse failure. Validation rules:
//! - `title` is a non-blank string of at most [`MAX_TITLE_LEN`] characters
//! - `recipe` is one ingredient object or a non-empty array of them
//! - each ingredient has non-blank `name` and `color` strings and a
//!   non-negative integer `parts`

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};
use crate::model::{Ingredient, NewDrink, Recipe, MAX_TITLE_LEN};

/// Body of a create or replace request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrinkPayload {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub recipe: Option<Value>,
}

impl DrinkPayload {
    /// Validates both fields, producing a drink ready to persist.
    pub fn validate(&self) -> DomainResult<NewDrink> {
        let title = validate_title(self.title.as_ref())?;
        let recipe = validate_recipe(self.recipe.as_ref())?;
        Ok(NewDrink { title, recipe })
    }
}

fn invalid_title(message: impl Into<String>) -> DomainError {
    DomainError::InvalidTitle {
        message: message.into(),
    }
}

fn invalid_recipe(message: impl Into<String>) -> DomainError {
    DomainError::InvalidRecipe {
        message: message.into(),
    }
}

/// Validates a drink title, returning it trimmed.
pub fn validate_title(value: Option<&Value>) -> DomainResult<String> {
    let raw = match value {
        None | Some(Value::Null) => return Err(invalid_title("title is required")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(invalid_title("title must be a string")),
    };

    let title = raw.trim();
    if title.is_empty() {
        return Err(invalid_title("title cannot be blank"));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(invalid_title(format!(
            "title exceeds {MAX_TITLE_LEN} characters (actual: {len})"
        )));
    }
    Ok(title.to_string())
}

/// Validates a recipe given as a single ingredient or a list of them.
pub fn validate_recipe(value: Option<&Value>) -> DomainResult<Recipe> {
    let ingredients = match value {
        None | Some(Value::Null) => return Err(invalid_recipe("recipe is required")),
        Some(Value::Object(fields)) => vec![parse_ingredient(0, fields)?],
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => parse_ingredient(index, fields),
                _ => Err(invalid_recipe(format!(
                    "ingredient {index} must be an object"
                ))),
            })
            .collect::<DomainResult<Vec<_>>>()?,
        Some(_) => {
            return Err(invalid_recipe(
                "recipe must be an ingredient object or a list of ingredients",
            ))
        }
    };
    Recipe::new(ingredients)
}

fn parse_ingredient(index: usize, fields: &Map<String, Value>) -> DomainResult<Ingredient> {
    let text_field = |key: &str| -> DomainResult<String> {
        match fields.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => Err(invalid_recipe(format!(
                "ingredient {index}: {key} cannot be blank"
            ))),
            Some(_) => Err(invalid_recipe(format!(
                "ingredient {index}: {key} must be a string"
            ))),
            None => Err(invalid_recipe(format!(
                "ingredient {index}: {key} is required"
            ))),
        }
    };

    let name = text_field("name")?;
    let color = text_field("color")?;
    let parts = match fields.get("parts") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| {
                invalid_recipe(format!(
                    "ingredient {index}: parts must be a non-negative integer"
                ))
            })?,
        Some(_) => {
            return Err(invalid_recipe(format!(
                "ingredient {index}: parts must be an integer"
            )))
        }
        None => {
            return Err(invalid_recipe(format!(
                "ingredient {index}: parts is required"
            )))
        }
    };

    Ok(Ingredient { color, name, parts })
}
