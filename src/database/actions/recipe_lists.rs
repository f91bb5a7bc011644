use std::collections::HashSet;

use crate::{
    error::{ApiError, QueryError},
    schema::{CartLine, Id, Recipe, RecipeList},
    shopping_list::aggregate,
};

use sqlx::{Pool, Postgres};

use super::get_recipe;

pub async fn add_to_list(
    list: RecipeList,
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        log::debug!("Recipe {recipe_id} already in {} of user {user_id}", list.label());
        return Err(ApiError::Conflict(format!(
            "Recipe is already in {}",
            list.label()
        )));
    }

    Ok(recipe)
}

pub async fn remove_from_list(
    list: RecipeList,
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(ApiError::not_found("Recipe"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(format!(
            "Recipe is not in {}",
            list.label()
        )));
    }

    Ok(())
}

pub async fn list_membership(
    user_id: Id,
    list: RecipeList,
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1",
        list.table()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

async fn cart_size(user_id: Id, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn fetch_cart_lines(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartLine>, ApiError> {
    let lines: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount::BIGINT AS amount
        FROM shopping_cart c
        JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(lines)
}

/// Aggregated totals for the user's cart. An empty cart is an error.
pub async fn shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartLine>, ApiError> {
    if cart_size(user_id, pool).await? == 0 {
        return Err(ApiError::EmptyCart);
    }

    let lines = fetch_cart_lines(user_id, pool).await?;

    Ok(aggregate(lines))
}
