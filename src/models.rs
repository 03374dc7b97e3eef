use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A dynamic QR mapping from a public short code to a mutable destination
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkMapping {
    pub id: Uuid,
    pub short_code: String,
    pub owner_id: Uuid,
    pub target_url: String,
    pub display_name: String,
    pub click_count: i64,
    pub style_options: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Owner-editable fields of a mapping
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MappingPatch {
    #[validate(length(min = 1, max = 120, message = "Display name must be 1-120 characters"))]
    pub display_name: Option<String>,

    #[validate(length(min = 1, max = 2048, message = "Target URL must be 1-2048 characters"))]
    pub target_url: Option<String>,
}

impl MappingPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.target_url.is_none()
    }
}

/// Request to create a dynamic link
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, max = 120, message = "Display name must be 1-120 characters"))]
    pub display_name: String,

    #[validate(length(min = 1, max = 2048, message = "Target URL must be 1-2048 characters"))]
    pub target_url: String,

    #[serde(default = "empty_style_options")]
    pub style_options: serde_json::Value,
}

/// Matches the column default
pub fn empty_style_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A mapping as returned by the API, with its public URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    #[serde(flatten)]
    pub mapping: ShortLinkMapping,
    pub short_url: String,
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Unknown stored values degrade to the least privileged role
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// User account row
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub is_pro: bool,
    pub pro_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

/// Account data for insertion; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_pro: bool,
    pub pro_until: Option<DateTime<Utc>>,
}

/// Field changes applied to an account.
///
/// When `is_pro` is set, `pro_until` replaces the stored expiry (None means
/// no expiry). Otherwise a present `pro_until` only moves the expiry.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_pro: Option<bool>,
    pub pro_until: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_pro: bool,
    pub pro_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        AccountProfile {
            role: account.role(),
            id: account.id,
            email: account.email,
            name: account.name,
            is_pro: account.is_pro,
            pro_until: account.pro_until,
            created_at: account.created_at,
        }
    }
}

/// Admin listing row: an account plus how many links it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub link_count: i64,
}

/// Request to register an account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(max = 120, message = "Name must be at most 120 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountProfile,
}

/// Admin update of an account
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(max = 120, message = "Name must be at most 120 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Must be a valid email"))]
    pub email: Option<String>,

    pub role: Option<Role>,

    pub is_pro: Option<bool>,

    pub pro_until: Option<DateTime<Utc>>,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,
}

/// Link totals from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkStats {
    pub total_links: i64,
    pub total_clicks: i64,
    /// Links created per UTC day since the requested start, days without links omitted
    pub created_per_day: Vec<DailyCount>,
}

/// Account totals from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountStats {
    pub total_users: i64,
    pub pro_users: i64,
    pub new_users_today: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Admin dashboard statistics
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: i64,
    pub pro_users: i64,
    pub total_links: i64,
    pub total_clicks: i64,
    pub new_users_today: i64,
    pub history: Vec<DailyCount>,
}
