use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the metadata slot that shadows every primary slot.
pub const METADATA_PREFIX: &str = "meta:";

/// `createdBy` reported for entries that predate the metadata slot.
pub const LEGACY_AUTHOR: &str = "unknown";

/// Metadata slot key for a short key.
pub fn metadata_key(key: &str) -> String {
    format!("{}{}", METADATA_PREFIX, key)
}

pub fn is_metadata_key(key: &str) -> bool {
    key.starts_with(METADATA_PREFIX)
}

/// One short-link mapping as exposed by the management API.
///
/// The JSON shape (`key`, `url`, `createdAt`, `createdBy`) is also the
/// format of the metadata slot, so existing stored records stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    pub key: String,
    #[serde(rename = "url")]
    pub target_url: String,
    #[serde(with = "iso8601_millis")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl LinkEntry {
    pub fn new(key: impl Into<String>, target_url: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target_url: target_url.into(),
            // 与存储格式同为毫秒精度，写入后读回的值保持相等
            created_at: Utc::now().trunc_subsecs(3),
            created_by: created_by.into(),
        }
    }

    /// Entry for a primary slot that has no metadata slot.
    pub fn legacy(key: impl Into<String>, target_url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            target_url: target_url.into(),
            created_at: now.trunc_subsecs(3),
            created_by: LEGACY_AUTHOR.to_string(),
        }
    }
}

/// A primary slot resolved against its (optional) metadata slot.
///
/// Resolution happens once, at read time; callers only ever see one of
/// these two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredEntry {
    Structured(LinkEntry),
    Legacy { key: String, target_url: String },
}

impl StoredEntry {
    /// Pair the primary slot value with the raw metadata slot value.
    ///
    /// Metadata that does not parse, or that describes a different key,
    /// is ignored and the entry is reported as legacy.
    pub fn resolve(key: &str, target_url: String, metadata: Option<&str>) -> Self {
        let structured = metadata
            .and_then(|raw| serde_json::from_str::<LinkEntry>(raw).ok())
            .filter(|entry| entry.key == key);

        match structured {
            Some(entry) => StoredEntry::Structured(entry),
            None => StoredEntry::Legacy {
                key: key.to_string(),
                target_url,
            },
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StoredEntry::Structured(entry) => &entry.key,
            StoredEntry::Legacy { key, .. } => key,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredEntry::Legacy { .. })
    }

    pub fn into_link_entry(self, now: DateTime<Utc>) -> LinkEntry {
        match self {
            StoredEntry::Structured(entry) => entry,
            StoredEntry::Legacy { key, target_url } => LinkEntry::legacy(key, target_url, now),
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, the format the
/// metadata slots were originally written in. Any RFC 3339 value is accepted
/// on read.
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
