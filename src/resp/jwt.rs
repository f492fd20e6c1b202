use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, Status};
use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{self, FromRequest, Request};
use rocket::time::OffsetDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::util::date_time_as_unix_seconds;
use crate::data::user::User;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::security::Security;

pub static AUTH_COOKIE_NAME: &str = "jwt_auth";

/// Verified identity of the caller. Services look the user up by `email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub email: String,
    pub role: Role,
}

impl UserRoleToken {
    pub fn new(user: &User, lifetime_days: i64) -> UserRoleToken {
        let now = Utc::now();
        UserRoleToken {
            iat: now,
            exp: now + Duration::days(lifetime_days),
            user: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn encode_jwt(
        &self,
        private_key: impl AsRef<[u8]>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::PS256);
        let key = EncodingKey::from_rsa_pem(private_key.as_ref())?;

        encode(&header, &self, &key)
    }

    /// Cookie carrying an already encoded token, expiring with it.
    pub fn cookie(&self, encoded: String) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE_NAME, encoded))
            .secure(true)
            .expires(OffsetDateTime::from_unix_timestamp(self.exp.timestamp()).ok())
            .path("/")
            .http_only(true)
            .build()
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

/// Bearer token from the `Authorization` header, falling back to the auth
/// cookie.
fn raw_token(req: &Request<'_>) -> Option<String> {
    let bearer = req
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    bearer.or_else(|| {
        req.cookies()
            .get(AUTH_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
    })
}

pub fn decode_claims(
    token: &str,
    public_key: impl AsRef<[u8]>,
) -> Result<UserRoleToken, Problem> {
    let key = DecodingKey::from_rsa_pem(public_key.as_ref()).map_err(|e| {
        tracing::error!("user_auth public key isn't valid. Unable to decode JWT: {}", e);
        problems::internal_problem()
    })?;

    match decode::<UserRoleToken>(token, &key, &Validation::new(Algorithm::PS256)) {
        Ok(data) => {
            tracing::debug!("decoded user roles token for user: {}", data.claims.user);
            Ok(data.claims)
        }
        Err(e) => {
            tracing::debug!("rejected JWT: {}", e);
            Err(Problem::from(e))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserRoleToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security = match req.rocket().state::<Security>() {
            Some(it) => it,
            None => {
                tracing::error!("security material isn't managed by rocket");
                return Error((Status::InternalServerError, problems::internal_problem()));
            }
        };

        tracing::trace!("extracting user roles token from request");
        let token = match raw_token(req) {
            Some(it) => it,
            None => return Error((Status::Unauthorized, auth_problem("No JWT auth token."))),
        };

        match decode_claims(&token, &security.jwt_keys.public) {
            Ok(claims) => Success(claims),
            Err(problem) => Error((problem.status, problem)),
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl From<JWTAuth> for SecurityScheme {
        fn from(_: JWTAuth) -> Self {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let components = openapi.components.get_or_insert_with(Default::default);
            components.add_security_scheme("jwt", *self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user::PasswordHash;
    use chrono::SubsecRound;

    #[test]
    fn jwt_configured_properly() {
        let now = Utc::now().round_subsecs(0);
        let user = Uuid::new_v4();

        let urt = UserRoleToken {
            iat: now,
            exp: now + Duration::weeks(1),
            user,
            email: "grace@example.com".to_string(),
            role: Role::Educator,
        };

        let security = Security::test();

        let token = urt
            .encode_jwt(&security.jwt_keys.private)
            .expect("encoding should work for example");
        let decoded =
            decode_claims(&token, &security.jwt_keys.public).expect("token should decode");

        assert_eq!(now, decoded.iat);
        assert_eq!(now + Duration::weeks(1), decoded.exp);
        assert_eq!(user, decoded.user);
        assert_eq!(decoded.email, "grace@example.com");
        assert_eq!(decoded.role, Role::Educator);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let user = User::new("Ada", "ada@example.com", PasswordHash::unusable(), Role::Student);
        let security = Security::test();

        let token = UserRoleToken::new(&user, -2)
            .encode_jwt(&security.jwt_keys.private)
            .unwrap();
        let problem = decode_claims(&token, &security.jwt_keys.public).unwrap_err();

        assert_eq!(problem.status, Status::Unauthorized);
        assert_eq!(problem.title, "Expired JWT signature.");
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let user = User::new("Ada", "ada@example.com", PasswordHash::unusable(), Role::Student);
        let security = Security::test();

        let mut token = UserRoleToken::new(&user, 1)
            .encode_jwt(&security.jwt_keys.private)
            .unwrap();
        token.push('x');

        assert!(decode_claims(&token, &security.jwt_keys.public).is_err());
    }
}
