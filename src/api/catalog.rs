use serde::Deserialize;
use warp::{filters::BoxedFilter, reject::Rejection, reply::Response, Filter, Reply};

use crate::{actions, error::ApiError, schema::Id};

use super::{with_state, AppState};

#[derive(Debug, Default, Deserialize)]
struct IngredientQuery {
    name: Option<String>,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_tags);

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(retrieve_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(search_ingredients);

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(retrieve_ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

async fn list_tags(state: AppState) -> Result<Response, Rejection> {
    let tags = actions::list_tags(&state.pool).await?;

    Ok(warp::reply::json(&tags).into_response())
}

async fn retrieve_tag(id: Id, state: AppState) -> Result<Response, Rejection> {
    let tag = actions::get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;

    Ok(warp::reply::json(&tag).into_response())
}

async fn search_ingredients(query: IngredientQuery, state: AppState) -> Result<Response, Rejection> {
    let ingredients = actions::search_ingredients(query.name.as_deref(), &state.pool).await?;

    Ok(warp::reply::json(&ingredients).into_response())
}

async fn retrieve_ingredient(id: Id, state: AppState) -> Result<Response, Rejection> {
    let ingredient = actions::get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient"))?;

    Ok(warp::reply::json(&ingredient).into_response())
}
