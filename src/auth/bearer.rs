//! Bearer tokens (JWTs) for the JSON API.

use std::fmt::Debug;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The ID of the user the token was issued to.
    sub: String,
    /// The time the token was issued, in seconds since the Unix epoch.
    iat: i64,
    /// The expiry time of the token, in seconds since the Unix epoch.
    exp: i64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    duration: Duration,
}

impl Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create a token issuer that signs with `secret` using the algorithm named by `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [Error::UnsupportedAlgorithm] unless `algorithm` is one of
    /// HS256, HS384 or HS512, the algorithms that work with a shared secret.
    pub fn new(secret: &str, algorithm: &str, duration: Duration) -> Result<Self, Error> {
        let algorithm = match algorithm.parse::<Algorithm>() {
            Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => algorithm,
            _ => return Err(Error::UnsupportedAlgorithm(algorithm.to_owned())),
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            duration,
        })
    }

    /// Issue a token for `user_id` that expires after the configured duration.
    ///
    /// # Errors
    ///
    /// Returns [Error::TokenCreation] if the token could not be signed.
    pub fn issue(&self, user_id: UserID) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.duration).unix_timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|error| Error::TokenCreation(error.to_string()))
    }

    /// Check the signature and expiry of `token` and return the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidToken] if the token is malformed, was signed
    /// with a different key or algorithm, or has expired.
    pub fn verify(&self, token: &str) -> Result<UserID, Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| Error::InvalidToken)?;

        token_data
            .claims
            .sub
            .parse::<i64>()
            .map(UserID::new)
            .map_err(|_| Error::InvalidToken)
    }
}
