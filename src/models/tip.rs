use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Situation {
    Morning,
    Work,
    Break,
    Evening,
    Sleep,
}

impl Situation {
    pub const ALL: [Situation; 5] = [
        Situation::Morning,
        Situation::Work,
        Situation::Break,
        Situation::Evening,
        Situation::Sleep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Situation::Morning => "morning",
            Situation::Work => "work",
            Situation::Break => "break",
            Situation::Evening => "evening",
            Situation::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Situation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Situation::ALL
            .into_iter()
            .find(|situation| situation.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown situation '{s}'")))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Zh, Language::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Language::Zh => Language::En,
            Language::En => Language::Zh,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zh" => Ok(Language::Zh),
            "en" => Ok(Language::En),
            other => Err(AppError::Validation(format!("unknown language '{other}'"))),
        }
    }
}

/// Everything a backend needs to address a single tip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TipKey {
    pub id: String,
    pub situation: Situation,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub situation: Situation,
    pub language: Language,
    pub content: String,
    pub likes: i64,
    pub display_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewTip {
    pub id: String,
    pub situation: Situation,
    pub language: Language,
    pub content: String,
}

/// A flat row as returned by a backend, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TipRow {
    pub id: String,
    pub situation: Option<String>,
    pub language: Option<String>,
    pub content: Option<String>,
    pub likes: i64,
    pub display_count: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TipFilter {
    pub situation: Option<Situation>,
    pub language: Option<Language>,
}

impl TipFilter {
    pub fn matches(&self, situation: Situation, language: Language) -> bool {
        self.situation.map_or(true, |s| s == situation)
            && self.language.map_or(true, |l| l == language)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Recorded,
    AlreadyLiked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipEntry {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub display_count: i64,
    #[serde(default)]
    pub likes: i64,
}

/// Tips grouped by situation, then language. Serializes to the nested
/// `{"morning": {"zh": [...], "en": [...]}, ...}` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipCollection(BTreeMap<Situation, BTreeMap<Language, Vec<TipEntry>>>);

impl TipCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, situation: Situation, language: Language, entry: TipEntry) {
        self.0
            .entry(situation)
            .or_default()
            .entry(language)
            .or_default()
            .push(entry);
    }

    pub fn bucket(&self, situation: Situation, language: Language) -> &[TipEntry] {
        self.0
            .get(&situation)
            .and_then(|languages| languages.get(&language))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entry_mut(&mut self, key: &TipKey) -> Option<&mut TipEntry> {
        self.0
            .get_mut(&key.situation)?
            .get_mut(&key.language)?
            .iter_mut()
            .find(|entry| entry.id == key.id)
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|languages| languages.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (Situation, Language, &TipEntry)> {
        self.0.iter().flat_map(|(situation, languages)| {
            languages.iter().flat_map(move |(language, entries)| {
                entries.iter().map(move |entry| (*situation, *language, entry))
            })
        })
    }

    /// Flattens back into rows; the inverse of `db::reshape` for well-formed data.
    #[cfg(test)]
    pub fn to_rows(&self) -> Vec<TipRow> {
        self.iter()
            .map(|(situation, language, entry)| TipRow {
                id: entry.id.clone(),
                situation: Some(situation.as_str().to_string()),
                language: Some(language.as_str().to_string()),
                content: Some(entry.content.clone()),
                likes: entry.likes,
                display_count: entry.display_count,
                is_active: true,
            })
            .collect()
    }
}

/// Validated set of changes for `Repository::update_tip`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipUpdate {
    pub content: Option<String>,
    pub is_active: Option<bool>,
    pub situation: Option<Situation>,
    pub language: Option<Language>,
}

impl TipUpdate {
    pub const ALLOWED_FIELDS: [&'static str; 4] = ["content", "is_active", "situation", "language"];

    /// Picks the allowed fields out of a loosely typed request. Unknown keys
    /// are ignored, but at least one allowed key must be present.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let mut update = TipUpdate::default();

        for (key, value) in fields {
            match key.as_str() {
                "content" => {
                    let content = value
                        .as_str()
                        .ok_or_else(|| AppError::Validation("content must be a string".into()))?;
                    update.content = Some(content.to_string());
                }
                "is_active" => {
                    let active = match value {
                        Value::Bool(b) => *b,
                        Value::Number(n) if n.as_i64() == Some(0) => false,
                        Value::Number(n) if n.as_i64() == Some(1) => true,
                        _ => {
                            return Err(AppError::Validation(
                                "is_active must be a boolean".into(),
                            ))
                        }
                    };
                    update.is_active = Some(active);
                }
                "situation" => {
                    let s = value
                        .as_str()
                        .ok_or_else(|| AppError::Validation("situation must be a string".into()))?;
                    update.situation = Some(s.parse()?);
                }
                "language" => {
                    let l = value
                        .as_str()
                        .ok_or_else(|| AppError::Validation("language must be a string".into()))?;
                    update.language = Some(l.parse()?);
                }
                other => {
                    tracing::debug!("Ignoring non-updatable field '{}'", other);
                }
            }
        }

        if update.is_empty() {
            return Err(AppError::Validation(format!(
                "no updatable fields supplied (allowed: {})",
                Self::ALLOWED_FIELDS.join(", ")
            )));
        }

        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.is_active.is_none()
            && self.situation.is_none()
            && self.language.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, content: &str) -> TipEntry {
        TipEntry {
            id: id.to_string(),
            content: content.to_string(),
            display_count: 0,
            likes: 0,
        }
    }

    #[test]
    fn situation_parses_known_names_only() {
        assert_eq!("break".parse::<Situation>().unwrap(), Situation::Break);
        assert!("noon".parse::<Situation>().is_err());
    }

    #[test]
    fn language_toggles_between_zh_and_en() {
        assert_eq!(Language::Zh.toggle(), Language::En);
        assert_eq!(Language::En.toggle(), Language::Zh);
        assert_eq!(Language::default(), Language::Zh);
    }

    #[test]
    fn collection_serializes_to_nested_shape() {
        let mut tips = TipCollection::new();
        tips.push(Situation::Morning, Language::En, entry("m1", "Breathe."));

        let value = serde_json::to_value(&tips).unwrap();
        assert_eq!(
            value,
            json!({"morning": {"en": [{"id": "m1", "content": "Breathe.", "displayCount": 0, "likes": 0}]}})
        );

        let parsed: TipCollection = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, tips);
    }

    #[test]
    fn cached_entries_without_counters_default_to_zero() {
        let raw = json!({"sleep": {"zh": [{"id": "s1", "content": "放松"}]}});
        let tips: TipCollection = serde_json::from_value(raw).unwrap();
        let bucket = tips.bucket(Situation::Sleep, Language::Zh);
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].display_count, 0);
        assert_eq!(bucket[0].likes, 0);
    }

    #[test]
    fn missing_bucket_is_empty_slice() {
        let tips = TipCollection::new();
        assert!(tips.bucket(Situation::Work, Language::Zh).is_empty());
        assert!(tips.is_empty());
    }

    #[test]
    fn entry_mut_finds_by_key() {
        let mut tips = TipCollection::new();
        tips.push(Situation::Work, Language::Zh, entry("w1", "伸展"));
        let key = TipKey {
            id: "w1".into(),
            situation: Situation::Work,
            language: Language::Zh,
        };
        tips.entry_mut(&key).unwrap().likes = 3;
        assert_eq!(tips.bucket(Situation::Work, Language::Zh)[0].likes, 3);

        let other_language = TipKey {
            language: Language::En,
            ..key
        };
        assert!(tips.entry_mut(&other_language).is_none());
    }

    #[test]
    fn update_rejects_request_without_allowed_fields() {
        let fields = json!({"foo": 1}).as_object().cloned().unwrap();
        let err = TipUpdate::from_fields(&fields).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn update_keeps_allowed_fields_and_ignores_others() {
        let fields = json!({"content": "new", "is_active": 0, "foo": true})
            .as_object()
            .cloned()
            .unwrap();
        let update = TipUpdate::from_fields(&fields).unwrap();
        assert_eq!(update.content.as_deref(), Some("new"));
        assert_eq!(update.is_active, Some(false));
        assert_eq!(update.situation, None);
    }

    #[test]
    fn update_rejects_bad_situation() {
        let fields = json!({"situation": "noon"}).as_object().cloned().unwrap();
        assert!(matches!(
            TipUpdate::from_fields(&fields),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn filter_matches_optional_fields() {
        let filter = TipFilter {
            situation: Some(Situation::Evening),
            language: None,
        };
        assert!(filter.matches(Situation::Evening, Language::En));
        assert!(!filter.matches(Situation::Sleep, Language::En));
        assert!(TipFilter::default().matches(Situation::Sleep, Language::Zh));
    }
}
