// ABOUTME: SeaORM storage layer for users, ingredients, recipes, and saved lists
// ABOUTME: Owns the membership toggle generic and the cart line projection

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, Database,
    DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{cart_entry, favorite, follow, ingredient, recipe, recipe_ingredient, user};
use crate::migration::Migrator;
use sea_orm_migration::MigratorTrait;
use crate::shopping_list::IngredientLine;

pub struct Storage {
    pub db: DatabaseConnection,
}

/// Outcome of adding a (user, recipe) membership row. A duplicate is a
/// distinct outcome, not an error: the unique index decides races between
/// concurrent adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    AlreadyExists,
}

/// Outcome of removing a (user, recipe) membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Membership link between a user and a recipe. Favorites and cart entries
/// share toggle semantics, so the storage operations are written once
/// against this trait.
pub trait UserRecipeLink: EntityTrait {
    type Link: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;

    fn new_link(user_id: Uuid, recipe_id: Uuid) -> Self::Link;
    fn pair_condition(user_id: Uuid, recipe_id: Uuid) -> Condition;
    fn user_condition(user_id: Uuid) -> Condition;
    fn recipe_id(model: &Self::Model) -> Uuid;
}

impl UserRecipeLink for favorite::Entity {
    type Link = favorite::ActiveModel;

    fn new_link(user_id: Uuid, recipe_id: Uuid) -> favorite::ActiveModel {
        favorite::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
        }
    }

    fn pair_condition(user_id: Uuid, recipe_id: Uuid) -> Condition {
        Condition::all()
            .add(favorite::Column::UserId.eq(user_id))
            .add(favorite::Column::RecipeId.eq(recipe_id))
    }

    fn user_condition(user_id: Uuid) -> Condition {
        Condition::all().add(favorite::Column::UserId.eq(user_id))
    }

    fn recipe_id(model: &favorite::Model) -> Uuid {
        model.recipe_id
    }
}

impl UserRecipeLink for cart_entry::Entity {
    type Link = cart_entry::ActiveModel;

    fn new_link(user_id: Uuid, recipe_id: Uuid) -> cart_entry::ActiveModel {
        cart_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
        }
    }

    fn pair_condition(user_id: Uuid, recipe_id: Uuid) -> Condition {
        Condition::all()
            .add(cart_entry::Column::UserId.eq(user_id))
            .add(cart_entry::Column::RecipeId.eq(recipe_id))
    }

    fn user_condition(user_id: Uuid) -> Condition {
        Condition::all().add(cart_entry::Column::UserId.eq(user_id))
    }

    fn recipe_id(model: &cart_entry::Model) -> Uuid {
        model.recipe_id
    }
}

pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

pub struct RecipeLineInput {
    pub ingredient_id: Uuid,
    pub quantity: i32,
}

pub struct RecipeInput {
    pub name: String,
    pub description: String,
    pub cooking_time: i32,
    pub lines: Vec<RecipeLineInput>,
}

impl Storage {
    pub async fn new() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:ladle.db?mode=rwc".to_string());
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let db = Database::connect(url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    // --- users ---

    pub async fn create_user(&self, new: NewUser) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new.email),
            username: Set(new.username),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            password_hash: Set(new.password_hash),
            created_at: Set(chrono::Utc::now().timestamp()),
        }
        .insert(&self.db)
        .await
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(id).one(&self.db).await
    }

    pub async fn user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
    }

    pub async fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<user::Model>, DbErr> {
        let mut query = user::Entity::find().order_by_asc(user::Column::Username);
        if let Some(term) = search {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Username.contains(term))
                    .add(user::Column::Email.contains(term)),
            );
        }
        query.all(&self.db).await
    }

    pub async fn users_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<user::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await
    }

    pub async fn update_password(
        &self,
        user: user::Model,
        password_hash: String,
    ) -> Result<user::Model, DbErr> {
        let mut active = user.into_active_model();
        active.password_hash = Set(password_hash);
        active.update(&self.db).await
    }

    // --- ingredients ---

    pub async fn create_ingredient(
        &self,
        name: String,
        unit: String,
    ) -> Result<ingredient::Model, DbErr> {
        ingredient::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            unit: Set(unit),
        }
        .insert(&self.db)
        .await
    }

    pub async fn ingredient_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ingredient::Model>, DbErr> {
        ingredient::Entity::find_by_id(id).one(&self.db).await
    }

    pub async fn list_ingredients(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<ingredient::Model>, DbErr> {
        let mut query = ingredient::Entity::find().order_by_asc(ingredient::Column::Name);
        if let Some(term) = search {
            query = query.filter(ingredient::Column::Name.contains(term));
        }
        query.all(&self.db).await
    }

    pub async fn ingredients_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<ingredient::Model>, DbErr> {
        ingredient::Entity::find()
            .filter(ingredient::Column::Id.is_in(ids))
            .all(&self.db)
            .await
    }

    // --- recipes ---

    pub async fn create_recipe(
        &self,
        author_id: Uuid,
        input: RecipeInput,
    ) -> Result<recipe::Model, DbErr> {
        let txn = self.db.begin().await?;

        let created = recipe::ActiveModel {
            id: Set(Uuid::new_v4()),
            author_id: Set(author_id),
            name: Set(input.name),
            description: Set(input.description),
            cooking_time: Set(input.cooking_time),
            created_at: Set(chrono::Utc::now().timestamp()),
        }
        .insert(&txn)
        .await?;

        insert_lines(&txn, created.id, &input.lines).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Ingredient lines are replaced wholesale, never merged in place.
    pub async fn update_recipe(
        &self,
        recipe: recipe::Model,
        input: RecipeInput,
    ) -> Result<recipe::Model, DbErr> {
        let txn = self.db.begin().await?;
        let recipe_id = recipe.id;

        let mut active = recipe.into_active_model();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.cooking_time = Set(input.cooking_time);
        let updated = active.update(&txn).await?;

        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, recipe_id, &input.lines).await?;

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_recipe(&self, recipe_id: Uuid) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;

        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        favorite::Entity::delete_many()
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        cart_entry::Entity::delete_many()
            .filter(cart_entry::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        recipe::Entity::delete_by_id(recipe_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn recipe_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<recipe::Model>, DbErr> {
        recipe::Entity::find_by_id(id).one(&self.db).await
    }

    pub async fn list_recipes(&self) -> Result<Vec<recipe::Model>, DbErr> {
        recipe::Entity::find()
            .order_by_desc(recipe::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn recipes_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<recipe::Model>, DbErr> {
        recipe::Entity::find()
            .filter(recipe::Column::Id.is_in(ids))
            .order_by_desc(recipe::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Ingredient lines with their ingredient rows for a set of recipes.
    pub async fn recipe_lines(
        &self,
        recipe_ids: Vec<Uuid>,
    ) -> Result<Vec<(recipe_ingredient::Model, Option<ingredient::Model>)>, DbErr>
    {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
            .find_also_related(ingredient::Entity)
            .all(&self.db)
            .await
    }

    // --- favorite / cart membership ---

    pub async fn add_link<E>(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<AddOutcome, DbErr>
    where
        E: UserRecipeLink,
        E::Model: IntoActiveModel<E::Link>,
    {
        match E::new_link(user_id, recipe_id).insert(&self.db).await {
            Ok(_) => Ok(AddOutcome::Created),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(AddOutcome::AlreadyExists),
                _ => Err(err),
            },
        }
    }

    pub async fn remove_link<E>(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<RemoveOutcome, DbErr>
    where
        E: UserRecipeLink,
    {
        let result = E::delete_many()
            .filter(E::pair_condition(user_id, recipe_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            Ok(RemoveOutcome::NotFound)
        } else {
            Ok(RemoveOutcome::Removed)
        }
    }

    pub async fn linked_recipe_ids<E>(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbErr>
    where
        E: UserRecipeLink,
    {
        let links = E::find()
            .filter(E::user_condition(user_id))
            .all(&self.db)
            .await?;
        Ok(links.iter().map(E::recipe_id).collect())
    }

    pub async fn linked_recipes<E>(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<recipe::Model>, DbErr>
    where
        E: UserRecipeLink,
    {
        let ids = self.linked_recipe_ids::<E>(user_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.recipes_by_ids(ids).await
    }

    // --- shopping-list projection ---

    /// Every (name, unit, quantity) row behind the recipes in the user's
    /// cart. Read-only; aggregation happens in `shopping_list`.
    pub async fn cart_ingredient_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<IngredientLine>, DbErr> {
        let recipe_ids = self.linked_recipe_ids::<cart_entry::Entity>(user_id).await?;
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
            .find_also_related(ingredient::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(row, ing)| {
                ing.map(|ing| IngredientLine {
                    name: ing.name,
                    unit: ing.unit,
                    quantity: row.quantity as i64,
                })
            })
            .collect())
    }

    // --- follows ---

    pub async fn add_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<AddOutcome, DbErr> {
        let link = follow::ActiveModel {
            id: Set(Uuid::new_v4()),
            follower_id: Set(follower_id),
            author_id: Set(author_id),
        };
        match link.insert(&self.db).await {
            Ok(_) => Ok(AddOutcome::Created),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(AddOutcome::AlreadyExists),
                _ => Err(err),
            },
        }
    }

    pub async fn remove_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<RemoveOutcome, DbErr> {
        let result = follow::Entity::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            Ok(RemoveOutcome::NotFound)
        } else {
            Ok(RemoveOutcome::Removed)
        }
    }

    pub async fn followed_author_ids(
        &self,
        follower_id: Uuid,
    ) -> Result<Vec<Uuid>, DbErr> {
        let follows = follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .all(&self.db)
            .await?;
        Ok(follows.iter().map(|f| f.author_id).collect())
    }

    pub async fn followed_authors(
        &self,
        follower_id: Uuid,
    ) -> Result<Vec<user::Model>, DbErr> {
        let ids = self.followed_author_ids(follower_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await
    }
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    recipe_id: Uuid,
    lines: &[RecipeLineInput],
) -> Result<(), DbErr> {
    for line in lines {
        recipe_ingredient::ActiveModel {
            id: Set(Uuid::new_v4()),
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.ingredient_id),
            quantity: Set(line.quantity),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
