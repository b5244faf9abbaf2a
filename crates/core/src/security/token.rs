use crate::{HospitalError, HospitalResult, RecordId};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// HMAC algorithm used to sign access tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Hs384 => "HS384",
            SigningAlgorithm::Hs512 => "HS512",
        }
    }

    fn mac(self, key: &[u8], message: &[u8]) -> HospitalResult<Vec<u8>> {
        macro_rules! hmac_with {
            ($digest:ty) => {{
                let mut mac = Hmac::<$digest>::new_from_slice(key)
                    .map_err(|e| HospitalError::Token(e.to_string()))?;
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }};
        }

        Ok(match self {
            SigningAlgorithm::Hs256 => hmac_with!(Sha256),
            SigningAlgorithm::Hs384 => hmac_with!(Sha384),
            SigningAlgorithm::Hs512 => hmac_with!(Sha512),
        })
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = HospitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "HS384" => Ok(SigningAlgorithm::Hs384),
            "HS512" => Ok(SigningAlgorithm::Hs512),
            other => Err(HospitalError::InvalidInput(format!(
                "unsupported signing algorithm: '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token payload: the user id and the expiry as Unix seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Issues and checks compact HMAC-signed JWTs.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], algorithm: SigningAlgorithm, ttl: Duration) -> Self {
        Self {
            secret: secret.to_vec(),
            algorithm,
            ttl,
        }
    }

    pub fn sign(&self, subject: RecordId, now: DateTime<Utc>) -> HospitalResult<String> {
        let header = Header {
            alg: self.algorithm.as_str().into(),
            typ: "JWT".into(),
        };
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = self.algorithm.mac(&self.secret, signing_input.as_bytes())?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Check signature, algorithm and expiry.
    ///
    /// Every failure is [`HospitalError::Unauthenticated`]; the reason is only logged.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> HospitalResult<Claims> {
        self.decode(token, now).map_err(|reason| {
            tracing::debug!("rejected access token: {reason}");
            HospitalError::Unauthenticated
        })
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, String> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("token is not three dot-separated segments".into());
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != self.algorithm.as_str() {
            return Err(format!("unexpected algorithm {}", header.alg));
        }

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        let expected = self
            .algorithm
            .mac(&self.secret, signing_input.as_bytes())
            .map_err(|e| e.to_string())?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| format!("signature is not base64: {e}"))?;
        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            return Err("signature mismatch".into());
        }

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err("token expired".into());
        }
        Ok(claims)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| format!("segment is not base64: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("segment is not valid JSON: {e}"))
}
