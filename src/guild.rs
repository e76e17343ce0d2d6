use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An ID for a "guild", the isolated namespace that owns a set of tallies.
///
/// Currently this can be any generic string, the chat transport decides what it contains
/// (typically the numeric id of the community rendered as text).
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(Arc<str>);

impl GuildId {
    /// Identifier of the single implicit guild used by single-tenant deployments.
    pub const GLOBAL: &'static str = "global";

    /// Create a new [`GuildId`] from any type that can be converted into an `Arc<str>`.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The [`GuildId`] every command is routed to when running single-tenant.
    pub fn global() -> Self {
        Self::new(Self::GLOBAL)
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GuildId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for GuildId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<u64> for GuildId {
    fn from(id: u64) -> Self {
        Self(id.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_guild_ids_match_text_form() {
        assert_eq!(GuildId::from(1234_u64), GuildId::from("1234"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&GuildId::from("42")).unwrap();
        assert_eq!(json, "\"42\"");
    }
}
