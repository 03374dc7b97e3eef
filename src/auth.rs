use crate::error::{AppError, AppResult};
use crate::models::{Account, Role};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: Role,
    pub is_pro: bool,
    pub pro_until: Option<i64>, // Pro expiry as Unix timestamp
    pub exp: i64,               // Expiration time as Unix timestamp
    pub iat: i64,               // Issued at time as Unix timestamp
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthenticated("Token subject is not a user id".to_string()))
    }

    pub fn pro_until(&self) -> Option<DateTime<Utc>> {
        self.pro_until
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

/// Whether a Pro flag is in force at `now`.
///
/// A set flag without an expiry never lapses; an expiry at or before `now`
/// overrides the stored flag.
pub fn is_effectively_pro(
    flag: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    flag && expires_at.map_or(true, |until| until > now)
}

/// The authenticated caller of a gateway operation
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    /// Effective Pro status for this request
    pub pro: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Result of evaluating a token: the actor plus whether its stored Pro flag is stale
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub actor: Actor,
    pub pro_lapsed: bool,
}

/// Build the actor for a request from verified claims
pub fn evaluate_claims(claims: &Claims, now: DateTime<Utc>) -> AppResult<Evaluated> {
    let pro = is_effectively_pro(claims.is_pro, claims.pro_until(), now);

    Ok(Evaluated {
        actor: Actor {
            user_id: claims.user_id()?,
            role: claims.role,
            pro,
        },
        pro_lapsed: claims.is_pro && !pro,
    })
}

/// JWT authentication service
#[derive(Clone)]
pub struct AuthService {
    secret: String,
    expiration_hours: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(secret: String, expiration_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            secret,
            expiration_hours,
            bcrypt_cost,
        }
    }

    /// Generate a JWT token for an account
    pub fn generate_token(&self, account: &Account) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.expiration_hours);

        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role: account.role(),
            is_pro: account.is_pro,
            pro_until: account.pro_until.map(|t| t.timestamp()),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate a JWT token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthenticated(format!("Token validation failed: {}", e)))
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        bcrypt::verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}
