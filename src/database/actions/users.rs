use std::collections::HashSet;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::SessionKeys,
    },
    error::{ApiError, QueryError, QueryErrorKind, ValidationErrors},
    projection::UserView,
    schema::{Id, User},
    validator::Registration,
};

use sqlx::{Pool, Postgres};

use super::following_ids;

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_users_by_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<User>, ApiError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_users(pool: &Pool<Postgres>) -> Result<Vec<User>, ApiError> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

async fn taken_identity_fields(
    registration: &Registration,
    pool: &Pool<Postgres>,
) -> Result<ValidationErrors, ApiError> {
    let row: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1)),
            EXISTS (SELECT 1 FROM users WHERE username = $2)
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    let mut errors = ValidationErrors::new();
    if row.0 {
        errors.add("email", "A user with that email already exists.");
    }
    if row.1 {
        errors.add("username", "A user with that username already exists.");
    }

    Ok(errors)
}

/// Creates an account. A duplicate email or username is a validation error
/// on that field, including when a concurrent sign-up wins the race.
pub async fn register_user(registration: Registration, pool: &Pool<Postgres>) -> Result<User, ApiError> {
    let taken = taken_identity_fields(&registration, pool).await?;
    if !taken.is_empty() {
        log::debug!("Registration rejected: {taken}");
        return Err(taken.into());
    }

    let password = hash_password(&registration.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .bind(&registration.first_name)
    .bind(&registration.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| match QueryError::from(e) {
        e if e.kind() == QueryErrorKind::UniqueViolation => {
            ApiError::Validation(ValidationErrors::single(
                "email",
                "A user with that email or username already exists.",
            ))
        }
        e => e.into(),
    })?;

    log::info!("Registered user {} ({})", user.id, user.username);

    Ok(user)
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let Some(user) = get_user_by_email(email, pool).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password)? {
        return Err(ApiError::InvalidCredentials);
    }

    keys.generate_jwt_session(&user)
}

pub async fn set_avatar(user_id: Id, avatar: &str, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn clear_avatar(user_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn user_views(
    users: &[User],
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserView>, ApiError> {
    let following: HashSet<Id> = match viewer {
        Some(viewer) => following_ids(viewer, pool).await?,
        None => HashSet::new(),
    };

    Ok(users
        .iter()
        .map(|user| UserView::project(user, following.contains(&user.id)))
        .collect())
}
