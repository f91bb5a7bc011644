use serde_json::json;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::Response,
    Filter, Reply,
};

use crate::{
    actions,
    error::ApiError,
    form::{Form, FormData},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    projection::{CreatedUser, SubscriptionView, UserView},
    schema::{Id, User},
    validator::{validate_avatar, validate_credentials, validate_registration},
};

use super::{json_body, optional_count, query_pairs, with_state, AppState};

const RECIPES_LIMIT: &str = "recipes_limit";

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(current_user);

    let set_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(set_avatar);

    let clear_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(clear_avatar);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let retrieve = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_state(state.clone()))
        .and_then(unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state))
        .and_then(login);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_avatar)
        .unify()
        .or(clear_avatar)
        .unify()
        .or(subscriptions)
        .unify()
        .or(retrieve)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .boxed()
}

async fn register(data: FormData, state: AppState) -> Result<Response, Rejection> {
    let registration = validate_registration(&Form::from_data(data)).map_err(ApiError::from)?;
    let user = actions::register_user(registration, &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&CreatedUser::from(&user)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn login(data: FormData, state: AppState) -> Result<Response, Rejection> {
    let credentials = validate_credentials(&Form::from_data(data)).map_err(ApiError::from)?;
    let token = actions::login_user(
        &credentials.email,
        &credentials.password,
        &state.keys,
        &state.pool,
    )
    .await?;

    Ok(warp::reply::json(&json!({ "auth_token": token })).into_response())
}

async fn list_users(session: Option<SessionData>, state: AppState) -> Result<Response, Rejection> {
    let users = actions::list_users(&state.pool).await?;
    let views = actions::user_views(&users, session.map(|s| s.user_id), &state.pool).await?;

    Ok(warp::reply::json(&views).into_response())
}

async fn existing_user(id: Id, state: &AppState) -> Result<User, ApiError> {
    actions::get_user_by_id(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

async fn current_user(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let user = existing_user(session.user_id, &state).await?;

    Ok(warp::reply::json(&UserView::project(&user, false)).into_response())
}

async fn retrieve_user(
    id: Id,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let user = existing_user(id, &state).await?;
    let views = actions::user_views(&[user], session.map(|s| s.user_id), &state.pool).await?;

    match views.first() {
        Some(view) => Ok(warp::reply::json(view).into_response()),
        None => Err(ApiError::not_found("User").into()),
    }
}

async fn set_avatar(session: SessionData, data: FormData, state: AppState) -> Result<Response, Rejection> {
    let avatar = validate_avatar(&Form::from_data(data)).map_err(ApiError::from)?;
    actions::set_avatar(session.user_id, &avatar, &state.pool).await?;

    Ok(warp::reply::json(&json!({ "avatar": avatar })).into_response())
}

async fn clear_avatar(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    actions::clear_avatar(session.user_id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_subscriptions(
    session: SessionData,
    query: Vec<(String, String)>,
    state: AppState,
) -> Result<Response, Rejection> {
    let limit = optional_count(&query, RECIPES_LIMIT)?;
    let authors = actions::list_following(session.user_id, &state.pool).await?;
    let views = actions::subscription_views(&authors, limit, &state.pool).await?;

    Ok(warp::reply::json(&views).into_response())
}

async fn subscribe(
    id: Id,
    session: SessionData,
    query: Vec<(String, String)>,
    state: AppState,
) -> Result<Response, Rejection> {
    let limit = optional_count(&query, RECIPES_LIMIT)?;
    let author = actions::subscribe(session.user_id, id, &state.pool).await?;
    let recipes = actions::recipes_by_authors(&[author.id], &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&SubscriptionView::project(&author, &recipes, limit)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn unsubscribe(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    actions::unsubscribe(session.user_id, id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
