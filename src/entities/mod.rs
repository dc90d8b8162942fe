// ABOUTME: SeaORM entities module for database models and relationships
// ABOUTME: Exports entity definitions for users, recipes, ingredients, and saved lists

pub mod user;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod favorite;
pub mod cart_entry;
pub mod follow;

pub use user::Entity as User;
pub use ingredient::Entity as Ingredient;
pub use recipe::Entity as Recipe;
pub use recipe_ingredient::Entity as RecipeIngredient;
pub use favorite::Entity as Favorite;
pub use cart_entry::Entity as CartEntry;
pub use follow::Entity as Follow;
