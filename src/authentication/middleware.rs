use warp::{reject::Rejection, Filter};

use crate::error::ApiError;

use super::jwt::{SessionData, SessionKeys};

pub fn token_from_header(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

fn authenticate(keys: &SessionKeys, header: Option<String>) -> Result<Option<SessionData>, ApiError> {
    match header {
        None => Ok(None),
        Some(header) => {
            let token = token_from_header(&header)
                .ok_or(ApiError::InvalidToken("malformed authorization header"))?;
            keys.verify_jwt_session(token).map(|data| Some(data.into()))
        }
    }
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match authenticate(&keys, header)? {
                Some(session) => Ok(session),
                None => Err(Rejection::from(ApiError::NotAuthenticated)),
            }
        }
    })
}

/// Anonymous requests pass through as `None`; a present but invalid token
/// is still rejected.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move { authenticate(&keys, header).map_err(Rejection::from) }
    })
}
