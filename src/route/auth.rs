use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::Json;
use rocket::State;

use crate::config::Config;
use crate::data::store::SharedStore;
use crate::data::user::db::{UserLoginData, UserRegisterData};
use crate::data::user::{User, UserResponse};
use crate::resp::jwt::{UserRoleToken, AUTH_COOKIE_NAME};
use crate::resp::reply::{ApiError, ApiResult, Reply};
use crate::security::Security;
use crate::service::account;

/// Issues a token for `user`, sets the auth cookie and returns the encoded
/// token.
pub(crate) fn issue_token(
    user: &User,
    cookies: &CookieJar<'_>,
    security: &Security,
    config: &Config,
) -> Result<String, ApiError> {
    let token = UserRoleToken::new(user, config.token_lifetime_days);
    let encoded = token.encode_jwt(&security.jwt_keys.private)?;
    cookies.add(token.cookie(encoded.clone()));

    Ok(encoded)
}

/// Create an account
#[utoipa::path(
    request_body = UserRegisterData,
    responses(
        (status = 200, description = "Created user and their token, or `success: false` with the reason", body = UserResponse),
        (status = 422, description = "Malformed request body", body = Problem),
    )
)]
#[post("/auth/register", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(cookies, store, security))]
pub async fn register(
    data: Json<UserRegisterData>,
    cookies: &CookieJar<'_>,
    store: &State<SharedStore>,
    security: &State<Security>,
    config: &State<Config>,
) -> ApiResult {
    let user = account::register(store.inner().as_ref(), data.into_inner()).await?;
    let token = issue_token(&user, cookies, security, config)?;

    Ok(Reply::success()
        .with("user", UserResponse::from(user))
        .with("token", token))
}

/// Log in with email and password
#[utoipa::path(
    request_body = UserLoginData,
    responses(
        (status = 200, description = "Logged in user and their token, or `success: false`", body = UserResponse),
        (status = 422, description = "Malformed request body", body = Problem),
    )
)]
#[post("/auth/login", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(cookies, store, security))]
pub async fn login(
    data: Json<UserLoginData>,
    cookies: &CookieJar<'_>,
    store: &State<SharedStore>,
    security: &State<Security>,
    config: &State<Config>,
) -> ApiResult {
    let user = account::login(store.inner().as_ref(), data.into_inner()).await?;
    let token = issue_token(&user, cookies, security, config)?;

    Ok(Reply::success()
        .with("user", UserResponse::from(user))
        .with("token", token))
}

/// Drop the auth cookie
#[utoipa::path(responses((status = 200, description = "Cookie removed")))]
#[post("/auth/logout")]
#[tracing::instrument(skip(cookies))]
pub async fn logout(cookies: &CookieJar<'_>) -> Reply {
    cookies.remove(Cookie::from(AUTH_COOKIE_NAME));
    Reply::success().message("Logged out.")
}
