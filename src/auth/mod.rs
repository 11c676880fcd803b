// src/auth/mod.rs

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::info;
use serde::Deserialize;

use crate::config::{ConfigError, JwtKey};
use crate::error::ApiError;

pub mod gate;

pub use gate::{authorize, Access, Owner, Policy};

/// Identity of the authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies bearer tokens issued by the identity provider.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(key: &JwtKey, audience: Option<&str>) -> Result<Self, ConfigError> {
        let (key, algorithm) = match key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::RsaPublicPem(pem) => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| ConfigError::Invalid {
                    name: "AUTH_JWT_PUBLIC_KEY",
                    value: e.to_string(),
                })?;
                (key, Algorithm::RS256)
            }
        };
        let mut validation = Validation::new(algorithm);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Caller, ApiError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| {
                info!("Rejected bearer token: {}", e);
                ApiError::Unauthenticated
            })?
            .claims;
        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthenticated);
        }
        Ok(Caller { user_id: claims.sub })
    }
}

fn resolve_caller(req: &HttpRequest) -> Result<Caller, ApiError> {
    let verifier = req
        .app_data::<web::Data<TokenVerifier>>()
        .ok_or_else(|| ApiError::Internal("token verifier is not registered".to_string()))?;
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthenticated)?;
    verifier.verify(token)
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(resolve_caller(req))
    }
}
