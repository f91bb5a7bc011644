use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, Filter, Reply};

use crate::{constants::MAX_BODY_BYTES, error::ApiError, form::FormData, jwt::SessionKeys};

pub mod catalog;
pub mod recipes;
pub mod rejection;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub keys: SessionKeys,
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, keys: SessionKeys, base_url: &str) -> Self {
        Self {
            pool,
            keys,
            base_url: Arc::from(base_url),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn query_pairs() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>()
}

pub fn optional_count(pairs: &[(String, String)], key: &str) -> Result<Option<usize>, ApiError> {
    match pairs.iter().rev().find(|(k, _)| k == key) {
        None => Ok(None),
        Some((_, value)) => value.trim().parse().map(Some).map_err(|_| {
            ApiError::Validation(crate::error::ValidationErrors::single(
                key,
                "A valid non-negative integer is required.",
            ))
        }),
    }
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        recipes::routes(state.clone())
            .or(users::routes(state.clone()))
            .unify()
            .or(catalog::routes(state.clone()))
            .unify(),
    );

    api.or(recipes::short_link_route(state))
        .unify()
        .recover(rejection::handle_rejection)
        .with(warp::log("foodgram::api"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn optional_count_reads_the_last_value() {
        assert_eq!(optional_count(&pairs(&[]), "recipes_limit").unwrap(), None);
        assert_eq!(
            optional_count(&pairs(&[("recipes_limit", "1"), ("recipes_limit", "3")]), "recipes_limit")
                .unwrap(),
            Some(3)
        );
        assert!(optional_count(&pairs(&[("recipes_limit", "-1")]), "recipes_limit").is_err());
    }
}
