//! Domain records decoded from Graph API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque credential returned by the platform.
///
/// Formatting never reveals the full value; use [`AccessToken::expose`] when
/// the raw string must go on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a masked version of the token for display (first 12 chars + ...).
    pub fn masked(&self) -> String {
        mask_token(&self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&self.masked()).finish()
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Returns a masked version of a token for display.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

/// Profile of the logged-in user, fetched once per login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct GraphUser {
    id: String,
    name: String,
    #[serde(default)]
    picture: Option<GraphPicture>,
}

#[derive(Deserialize)]
struct GraphPicture {
    data: GraphPictureData,
}

#[derive(Deserialize)]
struct GraphPictureData {
    url: String,
}

impl<'de> Deserialize<'de> for User {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = GraphUser::deserialize(deserializer)?;
        Ok(Self {
            id: raw.id,
            display_name: raw.name,
            avatar_url: raw.picture.map(|p| p.data.url),
        })
    }
}

/// A single post of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(rename = "message", default)]
    pub text: Option<String>,
    #[serde(rename = "created_time", deserialize_with = "deserialize_graph_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "full_picture", default)]
    pub image_url: Option<String>,
    #[serde(rename = "permalink_url", default)]
    pub permalink: Option<String>,
}

/// Graph timestamps look like `2024-03-01T18:22:05+0000`; RFC 3339 is accepted too.
fn deserialize_graph_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_graph_time(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_graph_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
}
