use std::collections::{HashMap, HashSet};

use crate::{
    error::{ApiError, QueryError},
    projection::SubscriptionView,
    schema::{Id, Recipe, User},
};

use sqlx::{Pool, Postgres};

use super::get_user_by_id;

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<User, ApiError> {
    let author = get_user_by_id(author_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if author.id == user_id {
        return Err(ApiError::BadRequest("You cannot subscribe to yourself".into()));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "You are already subscribed to this user".into(),
        ));
    }

    log::debug!("User {user_id} subscribed to {author_id}");

    Ok(author)
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if get_user_by_id(author_id, pool).await?.is_none() {
        return Err(ApiError::not_found("User"));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "You are not subscribed to this user".into(),
        ));
    }

    Ok(())
}

pub async fn list_following(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<User>, ApiError> {
    let rows: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM subscriptions s
        JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn following_ids(user_id: Id, pool: &Pool<Postgres>) -> Result<HashSet<Id>, ApiError> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT author_id FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn recipes_by_authors(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, ApiError> {
    if author_ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = ANY($1) ORDER BY created_at DESC, id DESC",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn subscription_views(
    authors: &[User],
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    let author_ids: Vec<Id> = authors.iter().map(|a| a.id).collect();

    let mut by_author: HashMap<Id, Vec<Recipe>> = HashMap::new();
    for recipe in recipes_by_authors(&author_ids, pool).await? {
        by_author.entry(recipe.author_id).or_default().push(recipe);
    }

    Ok(authors
        .iter()
        .map(|author| {
            let recipes = by_author.get(&author.id).map(Vec::as_slice).unwrap_or(&[]);
            SubscriptionView::project(author, recipes, recipes_limit)
        })
        .collect())
}
