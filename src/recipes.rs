// ABOUTME: Recipe and ingredient handlers, favorite/cart toggles, shopping-list download
// ABOUTME: Write access to a recipe is restricted to its author

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
};
use axum_extra::extract::cookie::CookieJar;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::{cart_entry, favorite, ingredient, recipe};
use crate::error::{AppError, Result};
use crate::storage::{AddOutcome, RemoveOutcome};
use crate::types::{
    CreateIngredientRequest, RecipeLineResponse, RecipeRequest, RecipeResponse, SearchQuery,
    StatusResponse, UserResponse,
};
use crate::{AppState, auth_helpers, shopping_list};

// --- ingredients ---

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ingredient::Model>>> {
    let ingredients = state
        .storage
        .list_ingredients(query.search.as_deref())
        .await?;
    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> Result<Json<ingredient::Model>> {
    let found = state
        .storage
        .ingredient_by_id(ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ingredient {}", ingredient_id)))?;
    Ok(Json(found))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<ingredient::Model>)> {
    auth_helpers::validate_session(&jar, &state)?;
    req.validate()?;

    let created = state.storage.create_ingredient(req.name, req.unit).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// --- recipes ---

pub async fn list_recipes(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<RecipeResponse>>> {
    let viewer = auth_helpers::optional_user_id(&jar, &state);
    let recipes = state.storage.list_recipes().await?;
    let responses = build_recipe_responses(&state, recipes, viewer).await?;
    Ok(Json(responses))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<RecipeResponse>> {
    let viewer = auth_helpers::optional_user_id(&jar, &state);
    let found = state
        .storage
        .recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))?;

    let mut responses = build_recipe_responses(&state, vec![found], viewer).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("Recipe response assembly failed".into()))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let author_id = auth_helpers::current_user_id(&jar, &state)?;
    req.validate()?;
    ensure_ingredients_exist(&state, &req).await?;

    let created = state.storage.create_recipe(author_id, req.to_input()).await?;
    let mut responses = build_recipe_responses(&state, vec![created], Some(author_id)).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Internal("Recipe response assembly failed".into()))?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
    Json(req): Json<RecipeRequest>,
) -> Result<Json<RecipeResponse>> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;
    let existing = state
        .storage
        .recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))?;
    if existing.author_id != user_id {
        return Err(AppError::Forbidden("Only the author may edit a recipe".into()));
    }

    req.validate()?;
    ensure_ingredients_exist(&state, &req).await?;

    let updated = state.storage.update_recipe(existing, req.to_input()).await?;
    let mut responses = build_recipe_responses(&state, vec![updated], Some(user_id)).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("Recipe response assembly failed".into()))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;
    let existing = state
        .storage
        .recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))?;
    if existing.author_id != user_id {
        return Err(AppError::Forbidden(
            "Only the author may delete a recipe".into(),
        ));
    }

    state.storage.delete_recipe(recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- favorites and cart membership ---

pub async fn add_favorite(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StatusResponse>)> {
    add_membership::<favorite::Entity>(&state, &jar, recipe_id, "favorites").await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<StatusResponse>> {
    remove_membership::<favorite::Entity>(&state, &jar, recipe_id, "favorites").await
}

pub async fn add_cart_entry(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StatusResponse>)> {
    add_membership::<cart_entry::Entity>(&state, &jar, recipe_id, "cart").await
}

pub async fn remove_cart_entry(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<StatusResponse>> {
    remove_membership::<cart_entry::Entity>(&state, &jar, recipe_id, "cart").await
}

pub async fn list_favorites(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<RecipeResponse>>> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;
    let recipes = state.storage.linked_recipes::<favorite::Entity>(user_id).await?;
    let responses = build_recipe_responses(&state, recipes, Some(user_id)).await?;
    Ok(Json(responses))
}

pub async fn list_cart(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<RecipeResponse>>> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;
    let recipes = state
        .storage
        .linked_recipes::<cart_entry::Entity>(user_id)
        .await?;
    let responses = build_recipe_responses(&state, recipes, Some(user_id)).await?;
    Ok(Json(responses))
}

/// Consolidated purchase list for the caller's cart, served as a
/// downloadable plain-text document. An empty cart yields an empty body
/// with the same headers.
pub async fn download_cart(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;

    let lines = state.storage.cart_ingredient_lines(user_id).await?;
    let items = shopping_list::aggregate(lines);
    let body = shopping_list::render(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        body,
    ))
}

// --- shared helpers ---

async fn add_membership<E>(
    state: &AppState,
    jar: &CookieJar,
    recipe_id: Uuid,
    list_name: &str,
) -> Result<(StatusCode, Json<StatusResponse>)>
where
    E: crate::storage::UserRecipeLink,
    E::Model: sea_orm::IntoActiveModel<E::Link>,
{
    let user_id = auth_helpers::current_user_id(jar, state)?;
    state
        .storage
        .recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))?;

    match state.storage.add_link::<E>(user_id, recipe_id).await? {
        AddOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(StatusResponse::new(&format!("added to {}", list_name))),
        )),
        AddOutcome::AlreadyExists => Err(AppError::Conflict(format!(
            "Recipe is already in {}",
            list_name
        ))),
    }
}

async fn remove_membership<E>(
    state: &AppState,
    jar: &CookieJar,
    recipe_id: Uuid,
    list_name: &str,
) -> Result<Json<StatusResponse>>
where
    E: crate::storage::UserRecipeLink,
{
    let user_id = auth_helpers::current_user_id(jar, state)?;

    match state.storage.remove_link::<E>(user_id, recipe_id).await? {
        RemoveOutcome::Removed => Ok(Json(StatusResponse::new(&format!(
            "removed from {}",
            list_name
        )))),
        RemoveOutcome::NotFound => Err(AppError::NotFound(format!(
            "Recipe is not in {}",
            list_name
        ))),
    }
}

async fn ensure_ingredients_exist(state: &AppState, req: &RecipeRequest) -> Result<()> {
    let ids: Vec<Uuid> = req.ingredients.iter().map(|l| l.ingredient_id).collect();
    let found = state.storage.ingredients_by_ids(ids.clone()).await?;
    if found.len() != ids.len() {
        let known: HashSet<Uuid> = found.iter().map(|i| i.id).collect();
        let missing = ids
            .iter()
            .find(|id| !known.contains(id))
            .copied()
            .unwrap_or_default();
        return Err(AppError::BadRequest(format!(
            "Ingredient {} does not exist",
            missing
        )));
    }
    Ok(())
}

/// Joins recipes with their authors, ingredient lines, and the viewer's
/// favorite/cart membership in a fixed number of queries.
async fn build_recipe_responses(
    state: &AppState,
    recipes: Vec<recipe::Model>,
    viewer: Option<Uuid>,
) -> Result<Vec<RecipeResponse>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut lines_by_recipe: HashMap<Uuid, Vec<RecipeLineResponse>> = HashMap::new();
    for (row, ing) in state.storage.recipe_lines(recipe_ids).await? {
        if let Some(ing) = ing {
            lines_by_recipe
                .entry(row.recipe_id)
                .or_default()
                .push(RecipeLineResponse {
                    ingredient_id: ing.id,
                    name: ing.name,
                    unit: ing.unit,
                    quantity: row.quantity,
                });
        }
    }

    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let authors: HashMap<Uuid, _> = state
        .storage
        .users_by_ids(author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let (favorited, in_cart, following) = match viewer {
        Some(user_id) => (
            state
                .storage
                .linked_recipe_ids::<favorite::Entity>(user_id)
                .await?
                .into_iter()
                .collect::<HashSet<_>>(),
            state
                .storage
                .linked_recipe_ids::<cart_entry::Entity>(user_id)
                .await?
                .into_iter()
                .collect::<HashSet<_>>(),
            state
                .storage
                .followed_author_ids(user_id)
                .await?
                .into_iter()
                .collect::<HashSet<_>>(),
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let mut responses = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = authors
            .get(&recipe.author_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Recipe author missing".into()))?;
        let author = UserResponse::from_model(author, following.contains(&recipe.author_id));
        let ingredients = lines_by_recipe.remove(&recipe.id).unwrap_or_default();
        let is_favorited = favorited.contains(&recipe.id);
        let is_in_cart = in_cart.contains(&recipe.id);
        responses.push(RecipeResponse::assemble(
            recipe,
            author,
            ingredients,
            is_favorited,
            is_in_cart,
        ));
    }

    Ok(responses)
}
