use serde_json::json;
use warp::{
    filters::BoxedFilter,
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::Response,
    Filter, Reply,
};

use crate::{
    actions::{self, RecipeFilter},
    constants::SHOPPING_LIST_FILENAME,
    error::ApiError,
    form::{Form, FormData},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    projection::RecipeMinified,
    schema::{Id, RecipeList},
    shopping_list::render,
    short_link::{self, ShortLink},
    validator::validate_recipe,
};

use super::{json_body, query_pairs, with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    let get_link = warp::path!("recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_short_link);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(get_link)
        .unify()
        .or(list_routes(&state, "favorite", RecipeList::Favorites))
        .unify()
        .or(list_routes(&state, "shopping_cart", RecipeList::ShoppingCart))
        .unify()
        .boxed()
}

fn list_routes(state: &AppState, segment: &'static str, list: RecipeList) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id, session, state| add_to_list(list, id, session, state));

    let remove = path
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id, session, state| remove_from_list(list, id, session, state));

    add.or(remove).unify().boxed()
}

pub fn short_link_route(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(resolve_short_link)
        .boxed()
}

async fn list_recipes(
    session: Option<SessionData>,
    query: Vec<(String, String)>,
    state: AppState,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_pairs(query).map_err(ApiError::from)?;
    let viewer = session.map(|s| s.user_id);

    let recipes = actions::fetch_recipes(&filter, viewer, &state.pool).await?;
    let views = actions::recipe_views(recipes, viewer, &state.pool).await?;

    Ok(warp::reply::json(&views).into_response())
}

async fn create_recipe(session: SessionData, data: FormData, state: AppState) -> Result<Response, Rejection> {
    let form = Form::from_data(data);
    let context = actions::validation_context(&form, None, &state.pool).await?;
    let draft = validate_recipe(&form, &context, None).map_err(ApiError::from)?;

    let id = actions::create_recipe(session.user_id, &draft, &state.pool).await?;
    let view = actions::recipe_view(id, Some(session.user_id), &state.pool).await?;

    Ok(warp::reply::with_status(warp::reply::json(&view), StatusCode::CREATED).into_response())
}

async fn retrieve_recipe(id: Id, session: Option<SessionData>, state: AppState) -> Result<Response, Rejection> {
    let view = actions::recipe_view(id, session.map(|s| s.user_id), &state.pool).await?;

    Ok(warp::reply::json(&view).into_response())
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    data: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = actions::get_recipe_mut(id, &session, &state.pool).await?;

    let form = Form::from_data(data);
    let context = actions::validation_context(&form, Some(id), &state.pool).await?;
    let draft = validate_recipe(&form, &context, Some(&recipe)).map_err(ApiError::from)?;

    actions::update_recipe(id, &draft, &state.pool).await?;
    let view = actions::recipe_view(id, Some(session.user_id), &state.pool).await?;

    Ok(warp::reply::json(&view).into_response())
}

async fn delete_recipe(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    actions::get_recipe_mut(id, &session, &state.pool).await?;
    actions::delete_recipe(id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn add_to_list(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = actions::add_to_list(list, id, session.user_id, &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&RecipeMinified::from(&recipe)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn remove_from_list(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    actions::remove_from_list(list, id, session.user_id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn download_shopping_cart(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let lines = actions::shopping_list(session.user_id, &state.pool).await?;

    Ok(warp::reply::with_header(
        render(&lines),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}

async fn get_short_link(id: Id, state: AppState) -> Result<Response, Rejection> {
    if actions::get_recipe(id, &state.pool).await?.is_none() {
        return Err(ApiError::not_found("Recipe").into());
    }

    let url = ShortLink::encode(id)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .url(&state.base_url);

    Ok(warp::reply::json(&json!({ "short-link": url })).into_response())
}

async fn resolve_short_link(code: String, state: AppState) -> Result<Response, Rejection> {
    let id = short_link::decode(&code).map_err(|e| {
        log::debug!("Rejected short link {code:?}: {e}");
        ApiError::not_found("Short link")
    })?;

    if actions::get_recipe(id, &state.pool).await?.is_none() {
        return Err(ApiError::not_found("Recipe").into());
    }

    let location: Uri = format!("/recipes/{id}")
        .parse()
        .map_err(|e| ApiError::Internal(format!("Invalid redirect target: {e}")))?;

    Ok(warp::redirect::found(location).into_response())
}
