/// Serde helpers for `secrecy::SecretString`: the secret is written as a plain
/// string inside the encrypted payload while `Debug` output stays redacted.
pub mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older files may carry `null` for an unset password.
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(SecretString::from(s))
    }
}
