use crate::application_port::{AccessToken, SignedAccess, TokenCodec, TokenError};
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_key: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signing_key", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged by the lifecycle against its own clock.
        validation.validate_exp = false;
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
            cfg,
        }
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, TokenError> {
        sub.parse::<UserId>().map_err(|_| TokenError::Malformed)
    }

    #[inline]
    fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
        DateTime::from_timestamp(secs, 0).ok_or(TokenError::Malformed)
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign_access(
        &self,
        user: UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, TokenError> {
        let claims = AccessClaims {
            sub: user.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(e.to_string()))?;
        Ok(AccessToken(token))
    }

    fn decode_access(&self, token: &AccessToken) -> Result<SignedAccess, TokenError> {
        let data = decode::<AccessClaims>(&token.0, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                _ => TokenError::InvalidSignature,
            })?;
        let claims = data.claims;

        Ok(SignedAccess {
            user_id: Self::parse_user_id(&claims.sub)?,
            expires_at: Self::from_timestamp(claims.exp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};

    fn codec(key: &str) -> JwtHs256Codec {
        JwtHs256Codec::new(JwtConfig {
            issuer: "tollgate.test".into(),
            audience: "tests".into(),
            signing_key: key.as_bytes().to_vec(),
        })
    }

    #[test]
    fn sign_then_decode_recovers_claims() {
        let codec = codec("k1");
        let user = UserId::new_random();
        let iat = Utc::now().trunc_subsecs(0);
        let exp = iat + Duration::minutes(15);

        let token = codec.sign_access(user, iat, exp).unwrap();
        let signed = codec.decode_access(&token).unwrap();

        assert_eq!(signed.user_id, user);
        assert_eq!(signed.expires_at, exp);
    }

    #[test]
    fn expired_claims_still_decode() {
        let codec = codec("k1");
        let iat = Utc::now() - Duration::days(2);
        let token = codec
            .sign_access(UserId::new_random(), iat, iat + Duration::minutes(15))
            .unwrap();
        assert!(codec.decode_access(&token).is_ok());
    }

    #[test]
    fn foreign_key_is_rejected() {
        let now = Utc::now();
        let token = codec("k1")
            .sign_access(UserId::new_random(), now, now + Duration::minutes(15))
            .unwrap();
        assert!(matches!(
            codec("k2").decode_access(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn other_audience_is_rejected() {
        let now = Utc::now();
        let foreign = JwtHs256Codec::new(JwtConfig {
            issuer: "tollgate.test".into(),
            audience: "someone-else".into(),
            signing_key: b"k1".to_vec(),
        });
        let token = foreign
            .sign_access(UserId::new_random(), now, now + Duration::minutes(15))
            .unwrap();
        assert!(matches!(
            codec("k1").decode_access(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            codec("k1").decode_access(&AccessToken("not-a-jwt".into())),
            Err(TokenError::Malformed)
        ));
    }
}
