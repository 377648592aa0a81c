//! Identity schema and its normalization.
//!
//! The sign-in collaborator hands over a loosely typed JSON payload. It is
//! parsed exactly once, into [`RawIdentity`], and every downstream consumer
//! works with the typed [`Session`](crate::Session) built from it.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Numeric user identifier as issued by the backend.
///
/// Identifiers arrive either as JSON numbers or as numeric strings. Both are
/// normalized to [`UserId::Numeric`]; anything that cannot be read as a
/// number is kept verbatim in [`UserId::Unparsed`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// An integral identifier
    Numeric(i64),
    /// The original input, when it was not numeric
    Unparsed(String),
}

impl UserId {
    /// Normalize a JSON identifier.
    ///
    /// Integral numbers and numeric strings become [`UserId::Numeric`];
    /// fractional input is truncated toward zero. `null`, absent and blank
    /// values yield `None`.
    pub fn normalize(value: &Value) -> Option<UserId> {
        match value {
            Value::Null => None,
            Value::Number(number) => Some(Self::from_number(number)),
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(
                parse_integral(text)
                    .map(UserId::Numeric)
                    .unwrap_or_else(|| UserId::Unparsed(text.clone())),
            ),
            other => Some(UserId::Unparsed(other.to_string())),
        }
    }

    fn from_number(number: &Number) -> UserId {
        if let Some(integral) = number.as_i64() {
            return UserId::Numeric(integral);
        }
        number
            .as_f64()
            .and_then(truncate)
            .map(UserId::Numeric)
            .unwrap_or_else(|| UserId::Unparsed(number.to_string()))
    }

    /// Re-coerce to integral form, reparsing an unparsed original.
    pub fn coerce(&self) -> UserId {
        match self {
            UserId::Numeric(_) => self.clone(),
            UserId::Unparsed(text) => parse_integral(text)
                .map(UserId::Numeric)
                .unwrap_or_else(|| self.clone()),
        }
    }

    /// The integral value, if there is one
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            UserId::Numeric(value) => Some(*value),
            UserId::Unparsed(_) => None,
        }
    }

    /// JSON form used when persisting and when injecting into requests
    pub fn to_json(&self) -> Value {
        match self {
            UserId::Numeric(value) => Value::from(*value),
            UserId::Unparsed(text) => Value::from(text.as_str()),
        }
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId::Numeric(value)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Numeric(value) => write!(f, "{value}"),
            UserId::Unparsed(text) => f.write_str(text),
        }
    }
}

fn parse_integral(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(truncate))
}

fn truncate(value: f64) -> Option<i64> {
    let truncated = value.trunc();
    (truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64)
        .then_some(truncated as i64)
}

/// Coarse class of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserClass {
    /// Administrators
    Admin,
    /// Internal staff
    Internal,
    /// External accounts
    External,
    /// Any other class the backend reports (e.g. `user`, `guest`)
    Other(String),
}

impl UserClass {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            UserClass::Admin => "admin",
            UserClass::Internal => "internal",
            UserClass::External => "external",
            UserClass::Other(other) => other,
        }
    }
}

impl From<String> for UserClass {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => UserClass::Admin,
            "internal" => UserClass::Internal,
            "external" => UserClass::External,
            _ => UserClass::Other(value),
        }
    }
}

impl From<&str> for UserClass {
    fn from(value: &str) -> Self {
        UserClass::from(value.to_owned())
    }
}

impl From<UserClass> for String {
    fn from(value: UserClass) -> Self {
        match value {
            UserClass::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for UserClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained permission level carried next to the user class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PermissionLevel {
    /// Regular administrator
    Admin,
    /// Administrator allowed to manage other administrators
    SuperAdmin,
    /// Anything else (e.g. `user`)
    Other(String),
}

impl PermissionLevel {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            PermissionLevel::Admin => "admin",
            PermissionLevel::SuperAdmin => "super_admin",
            PermissionLevel::Other(other) => other,
        }
    }

    /// True for the levels that make an `admin` class account an
    /// administrator
    pub fn is_elevated(&self) -> bool {
        matches!(self, PermissionLevel::Admin | PermissionLevel::SuperAdmin)
    }
}

impl From<String> for PermissionLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => PermissionLevel::Admin,
            "super_admin" => PermissionLevel::SuperAdmin,
            _ => PermissionLevel::Other(value),
        }
    }
}

impl From<&str> for PermissionLevel {
    fn from(value: &str) -> Self {
        PermissionLevel::from(value.to_owned())
    }
}

impl From<PermissionLevel> for String {
    fn from(value: PermissionLevel) -> Self {
        match value {
            PermissionLevel::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

/// Identity payload as produced by sign-in and as persisted.
///
/// Required for an authenticated session: `userId` and `userType`.
/// Everything else is optional; the two capability flags accept any JSON
/// value and are read by truthiness. Unrecognized fields are carried in
/// `extra` so that persisting a normalized copy loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIdentity {
    /// Identifier, numeric or numeric string
    #[serde(default)]
    pub user_id: Value,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    /// User class
    #[serde(default)]
    pub user_type: Option<UserClass>,
    /// Permission level
    #[serde(default)]
    pub permission: Option<PermissionLevel>,
    /// May read the restricted resource
    #[serde(default, deserialize_with = "truthy")]
    pub can_access_login: bool,
    /// May write the restricted resource
    #[serde(default, deserialize_with = "truthy")]
    pub can_modify_login: bool,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawIdentity {
    /// Parse a JSON identity payload
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Copy with `userId` replaced by its normalized form. Unparseable
    /// identifiers keep their original value.
    pub fn normalized(&self) -> RawIdentity {
        let user_id = match UserId::normalize(&self.user_id) {
            Some(UserId::Numeric(value)) => Value::from(value),
            Some(UserId::Unparsed(_)) => self.user_id.clone(),
            None => Value::Null,
        };
        RawIdentity {
            user_id,
            ..self.clone()
        }
    }
}

/// JavaScript-style truthiness, so `"1"`, `1` and `true` all enable a flag
/// and legacy payloads with odd flag encodings still parse.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(false),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    })
}
