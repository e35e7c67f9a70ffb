use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::VaultError;

const MASK_GLYPH: char = '•';
const CONSTANT_MASK_WIDTH: usize = 8;

/// Opaque entry identity. New entries get a UUID v4; ids read from disk are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored account. `id` and `created_at` are fixed at creation.
///
/// Field names on disk are `id, serviceName, login, password, note, createdAt`; the
/// PascalCase spellings and `secret` are accepted when reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    #[serde(alias = "Id")]
    id: EntryId,
    #[serde(alias = "ServiceName")]
    pub service_name: String,
    #[serde(alias = "Login")]
    pub login: String,
    #[serde(
        rename = "password",
        alias = "secret",
        alias = "Password",
        default = "empty_secret",
        with = "crate::cryptography::types::secret_string"
    )]
    pub secret: SecretString,
    #[serde(alias = "Note", default, deserialize_with = "null_as_empty")]
    pub note: String,
    #[serde(alias = "CreatedAt", with = "timestamp")]
    created_at: DateTime<Utc>,
}

impl AccountEntry {
    pub fn new(
        service_name: impl Into<String>,
        login: impl Into<String>,
        secret: SecretString,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            service_name: service_name.into(),
            login: login.into(),
            secret,
            note: note.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// One mask glyph per secret character. Reveals the secret's length.
    pub fn masked_secret(&self) -> String {
        MASK_GLYPH
            .to_string()
            .repeat(self.secret.expose_secret().chars().count())
    }

    /// Fixed-width mask that says nothing about the secret.
    pub fn constant_mask() -> String {
        MASK_GLYPH.to_string().repeat(CONSTANT_MASK_WIDTH)
    }

    /// Case-insensitive substring match on the service name.
    pub fn matches_service(&self, query: &str) -> bool {
        self.service_name
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.service_name.trim().is_empty() {
            return Err(VaultError::Validation(
                "service name must not be empty".to_string(),
            ));
        }
        if self.login.trim().is_empty() {
            return Err(VaultError::Validation("login must not be empty".to_string()));
        }
        Ok(())
    }
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// ISO-8601 timestamps. Written as RFC 3339 UTC; read with any offset, or
/// without one (taken as UTC).
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(t.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|n| n.and_utc())
            .map_err(|e| format!("invalid createdAt timestamp \"{s}\": {e}"))
    }
}
