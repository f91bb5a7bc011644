use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection,
        UnsupportedMediaType,
    },
    reply::Response,
    Reply,
};

use crate::error::ApiError;

fn reply(body: &serde_json::Value, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn detail(message: impl Into<String>, status: StatusCode) -> Response {
    reply(&json!({ "detail": message.into() }), status)
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        match e {
            ApiError::Internal(info) => log::error!("Request failed: {info}"),
            ApiError::Validation(errors) => log::debug!("Rejected payload: {errors}"),
            e => log::debug!("Rejected request: {e}"),
        }
        return Ok(reply(&e.body(), e.status()));
    }

    if let Some(e) = err.find::<BodyDeserializeError>() {
        return Ok(detail(format!("Malformed request body: {e}"), StatusCode::BAD_REQUEST));
    }
    if let Some(e) = err.find::<InvalidQuery>() {
        return Ok(detail(format!("Malformed query string: {e}"), StatusCode::BAD_REQUEST));
    }
    if let Some(e) = err.find::<InvalidHeader>() {
        return Ok(detail(format!("{e}"), StatusCode::BAD_REQUEST));
    }
    if err.find::<PayloadTooLarge>().is_some() {
        return Ok(detail("Request body is too large", StatusCode::PAYLOAD_TOO_LARGE));
    }
    if err.find::<LengthRequired>().is_some() {
        return Ok(detail("Content-Length header is required", StatusCode::LENGTH_REQUIRED));
    }
    if err.find::<UnsupportedMediaType>().is_some() {
        return Ok(detail(
            "Expected an application/json body",
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ));
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return Ok(detail("Method not allowed", StatusCode::METHOD_NOT_ALLOWED));
    }
    if err.is_not_found() {
        return Ok(detail("Not found", StatusCode::NOT_FOUND));
    }

    log::error!("Unhandled rejection: {err:?}");
    Ok(detail("Internal server error", StatusCode::INTERNAL_SERVER_ERROR))
}
