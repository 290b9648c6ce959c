//! Permission names granted to callers through the token `permissions` claim.

use std::fmt;

/// A permission required by a protected drinks route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read drinks including ingredient quantities.
    GetDrinksDetail,
    /// Create drinks.
    PostDrinks,
    /// Replace an existing drink.
    PatchDrinks,
    /// Delete a drink.
    DeleteDrinks,
}

impl Permission {
    /// All permissions understood by the service.
    pub const ALL: [Permission; 4] = [
        Permission::GetDrinksDetail,
        Permission::PostDrinks,
        Permission::PatchDrinks,
        Permission::DeleteDrinks,
    ];

    /// Returns the permission string as it appears in the token claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::GetDrinksDetail => "get:drinks-detail",
            Permission::PostDrinks => "post:drinks",
            Permission::PatchDrinks => "patch:drinks",
            Permission::DeleteDrinks => "delete:drinks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_strings_are_distinct() {
        let mut names: Vec<&str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Permission::ALL.len());
    }

    #[test]
    fn test_display_matches_claim_format() {
        assert_eq!(Permission::DeleteDrinks.to_string(), "delete:drinks");
        assert_eq!(Permission::GetDrinksDetail.to_string(), "get:drinks-detail");
    }
}
