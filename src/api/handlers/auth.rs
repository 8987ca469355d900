use crate::{
    AppState,
    auth::jwt::ACCESS_TOKEN_TTL_MINUTES,
    auth::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    types::{AccessTokenResponse, AppError, Identity, Result, TokenPair},
    utils::toml_config::MAX_REFRESH_TOKEN_DAYS,
};
use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration as TimeDuration;

fn session_cookie(name: &'static str, value: String, max_age: TimeDuration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    session_cookie(name, String::new(), TimeDuration::ZERO, secure)
}

/// Sets both session cookies for a freshly issued pair.
pub fn session_cookies(jar: CookieJar, pair: &TokenPair, refresh_days: i64, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        TimeDuration::minutes(ACCESS_TOKEN_TTL_MINUTES),
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        TimeDuration::days(refresh_days.clamp(1, MAX_REFRESH_TOKEN_DAYS)),
        secure,
    ))
}

/// Issues tokens for a user who just completed the OAuth handshake and
/// attaches them as cookies. Called by the OAuth callback.
pub async fn start_session(state: &AppState, identity: &Identity, jar: CookieJar) -> Result<(CookieJar, TokenPair)> {
    let pair = state.tokens.issue(identity).await?;
    let jar = session_cookies(
        jar,
        &pair,
        state.config.auth.refresh_token_days,
        state.config.auth.secure_cookies,
    );
    Ok((jar, pair))
}

/// Exchange the refresh cookie for a new access token
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Json<AccessTokenResponse>)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingCredentials)?;

    let issued = state.tokens.refresh(&refresh_token).await?;

    let jar = jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        issued.token.clone(),
        TimeDuration::minutes(ACCESS_TOKEN_TTL_MINUTES),
        state.config.auth.secure_cookies,
    ));

    Ok((
        jar,
        Json(AccessTokenResponse {
            access_token: issued.token,
        }),
    ))
}

/// Revoke the session's tokens and clear the cookies.
///
/// Always succeeds; tokens that are missing or no longer valid are simply
/// not recorded.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let mut revoked = 0;
    for name in [REFRESH_TOKEN_COOKIE, ACCESS_TOKEN_COOKIE] {
        if let Some(cookie) = jar.get(name) {
            if state.tokens.invalidate_if_valid(cookie.value()) {
                revoked += 1;
            }
        }
    }
    tracing::info!(revoked, "logout");

    let secure = state.config.auth.secure_cookies;
    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, secure));

    (jar, Json(serde_json::json!({ "message": "logged out" })))
}
