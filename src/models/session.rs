use serde::{Deserialize, Serialize};

/// Maximum accepted length for a client-echoed session id.
const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque per-visit session identifier.
///
/// Minted once by this service on the first tracked page view and echoed
/// back by the client on every subsequent tracking call. The id combines
/// a millisecond timestamp with a short random suffix; it only needs to
/// be collision-resistant at our traffic volume, not unguessable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(opaque_id("session"))
    }

    /// Accept a client-supplied id, rejecting obviously bogus values.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_SESSION_ID_LEN {
            return None;
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a `<prefix>_<unix millis>_<random suffix>` identifier.
pub fn opaque_id(prefix: &str) -> String {
    use rand::RngExt;

    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();

    format!("{}_{}_{}", prefix, millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_well_formed() {
        let id = SessionId::generate();
        assert!(id.as_str().starts_with("session_"));
        assert!(SessionId::parse(id.as_str()).is_some());
    }

    #[test]
    fn generated_ids_differ() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("   ").is_none());
        assert!(SessionId::parse("has space").is_none());
        assert!(SessionId::parse(&"x".repeat(200)).is_none());
        assert!(SessionId::parse("session_1700000000000_ab12cd3").is_some());
    }
}
