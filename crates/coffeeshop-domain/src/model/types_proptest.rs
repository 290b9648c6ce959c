//! Property-based tests for drink views.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{Drink, Ingredient, Recipe};

    /// Strategy to generate a single ingredient with printable fields.
    fn ingredient_strategy() -> impl Strategy<Value = Ingredient> {
        ("[a-z]{1,12}", "[a-z]{1,8}", 0u32..100)
            .prop_map(|(name, color, parts)| Ingredient::new(name, color, parts))
    }

    /// Strategy to generate a drink with one to six ingredients.
    fn drink_strategy() -> impl Strategy<Value = Drink> {
        (
            1i64..10_000,
            "[A-Za-z ]{1,40}",
            prop::collection::vec(ingredient_strategy(), 1..6),
        )
            .prop_map(|(id, title, ingredients)| Drink {
                id,
                title,
                recipe: Recipe::new(ingredients).unwrap(),
            })
    }

    proptest! {
        #[test]
        fn test_short_view_never_contains_parts(drink in drink_strategy()) {
            let json = serde_json::to_value(drink.short()).unwrap();
            let recipe = json["recipe"].as_array().unwrap();
            prop_assert_eq!(recipe.len(), drink.recipe.ingredients().len());
            for ingredient in recipe {
                prop_assert!(ingredient.get("parts").is_none());
            }
        }

        #[test]
        fn test_long_view_always_contains_parts(drink in drink_strategy()) {
            let json = serde_json::to_value(drink.long()).unwrap();
            let recipe = json["recipe"].as_array().unwrap();
            for (rendered, original) in recipe.iter().zip(drink.recipe.ingredients()) {
                prop_assert_eq!(rendered["parts"].as_u64(), Some(u64::from(original.parts)));
                prop_assert_eq!(rendered["name"].as_str(), Some(original.name.as_str()));
            }
        }

        #[test]
        fn test_views_agree_on_identity(drink in drink_strategy()) {
            let short = drink.short();
            let long = drink.long();
            prop_assert_eq!(short.id, long.id);
            prop_assert_eq!(short.title, long.title);
        }
    }
}
