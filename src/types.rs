// ABOUTME: Typed API request/response structs with explicit mapping functions
// ABOUTME: Payload validation lives next to the types it checks

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::{recipe, user};
use crate::error::{AppError, Result};
use crate::storage::{RecipeInput, RecipeLineInput};

pub const QUANTITY_MIN: i32 = 1;
pub const QUANTITY_MAX: i32 = 32000;

// Auth

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

// Users

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn from_model(user: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

// Ingredients

#[derive(Debug, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub unit: String,
}

impl CreateIngredientRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AppError::BadRequest("Ingredient name is required".into()));
        }
        if self.unit.is_empty() {
            return Err(AppError::BadRequest("Measurement unit is required".into()));
        }
        Ok(())
    }
}

// Recipes

#[derive(Debug, Deserialize)]
pub struct RecipeLineRequest {
    pub ingredient_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    pub name: String,
    pub description: String,
    pub cooking_time: i32,
    pub ingredients: Vec<RecipeLineRequest>,
}

impl RecipeRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AppError::BadRequest("Recipe name is required".into()));
        }
        if self.cooking_time < 1 {
            return Err(AppError::BadRequest(
                "Cooking time must be at least 1 minute".into(),
            ));
        }
        if self.ingredients.is_empty() {
            return Err(AppError::BadRequest(
                "Ingredient list cannot be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for line in &self.ingredients {
            if !seen.insert(line.ingredient_id) {
                return Err(AppError::BadRequest(
                    "Ingredients must not repeat within a recipe".into(),
                ));
            }
            if line.quantity < QUANTITY_MIN || line.quantity > QUANTITY_MAX {
                return Err(AppError::BadRequest(format!(
                    "Quantity must be between {} and {}",
                    QUANTITY_MIN, QUANTITY_MAX
                )));
            }
        }
        Ok(())
    }

    pub fn to_input(&self) -> RecipeInput {
        RecipeInput {
            name: self.name.clone(),
            description: self.description.clone(),
            cooking_time: self.cooking_time,
            lines: self
                .ingredients
                .iter()
                .map(|line| RecipeLineInput {
                    ingredient_id: line.ingredient_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeLineResponse {
    pub ingredient_id: Uuid,
    pub name: String,
    pub unit: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub author: UserResponse,
    pub name: String,
    pub description: String,
    pub cooking_time: i32,
    pub ingredients: Vec<RecipeLineResponse>,
    pub is_favorited: bool,
    pub is_in_cart: bool,
    pub created_at: i64,
}

impl RecipeResponse {
    pub fn assemble(
        recipe: recipe::Model,
        author: UserResponse,
        ingredients: Vec<RecipeLineResponse>,
        is_favorited: bool,
        is_in_cart: bool,
    ) -> Self {
        Self {
            id: recipe.id,
            author,
            name: recipe.name,
            description: recipe.description,
            cooking_time: recipe.cooking_time,
            ingredients,
            is_favorited,
            is_in_cart,
            created_at: recipe.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(lines: Vec<RecipeLineRequest>) -> RecipeRequest {
        RecipeRequest {
            name: "Pancakes".to_string(),
            description: "Mix and fry".to_string(),
            cooking_time: 20,
            ingredients: lines,
        }
    }

    #[test]
    fn rejects_empty_ingredient_list() {
        let request = request_with(Vec::new());
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_repeated_ingredient() {
        let id = Uuid::new_v4();
        let request = request_with(vec![
            RecipeLineRequest {
                ingredient_id: id,
                quantity: 2,
            },
            RecipeLineRequest {
                ingredient_id: id,
                quantity: 3,
            },
        ]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_quantity_out_of_bounds() {
        for quantity in [0, -5, 32001] {
            let request = request_with(vec![RecipeLineRequest {
                ingredient_id: Uuid::new_v4(),
                quantity,
            }]);
            assert!(request.validate().is_err(), "quantity {}", quantity);
        }
    }

    #[test]
    fn accepts_boundary_quantities() {
        for quantity in [QUANTITY_MIN, QUANTITY_MAX] {
            let request = request_with(vec![RecipeLineRequest {
                ingredient_id: Uuid::new_v4(),
                quantity,
            }]);
            assert!(request.validate().is_ok(), "quantity {}", quantity);
        }
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut request = request_with(vec![RecipeLineRequest {
            ingredient_id: Uuid::new_v4(),
            quantity: 1,
        }]);
        request.cooking_time = 0;
        assert!(request.validate().is_err());
    }
}
