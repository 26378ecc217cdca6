use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultSummary {
    #[serde(rename = "imdbID")]
    pub id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Poster", default)]
    pub poster: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleDetail {
    pub id: String,
    pub title: String,
    pub year: String,
    pub director: String,
    pub actors: String,
    pub plot: String,
    pub poster: String,
    pub released: String,
    /// Runtime as OMDb reports it, e.g. `"148 min"`.
    pub runtime: String,
    pub runtime_minutes: u32,
    pub genre: String,
    pub imdb_rating: f64,
}

/// A rated title in the watchlist. Field names follow the stored JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedEntry {
    #[serde(rename = "imdbID")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub poster: String,
    #[serde(rename = "runtime", deserialize_with = "lenient_u32", default)]
    pub runtime_minutes: u32,
    #[serde(rename = "imdbRating", deserialize_with = "lenient_f64", default)]
    pub imdb_rating: f64,
    #[serde(rename = "userRating", deserialize_with = "lenient_u8")]
    pub user_rating: u8,
    #[serde(rename = "countRating", deserialize_with = "lenient_u32", default)]
    pub rating_change_count: u32,
    #[serde(rename = "addedAt", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WatchedEntry {
    pub fn from_detail(detail: &TitleDetail, user_rating: u8, rating_change_count: u32) -> Self {
        Self {
            id: detail.id.clone(),
            title: detail.title.clone(),
            year: detail.year.clone(),
            poster: detail.poster.clone(),
            runtime_minutes: detail.runtime_minutes,
            imdb_rating: detail.imdb_rating,
            user_rating,
            rating_change_count,
            added_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchSummary {
    pub count: usize,
    /// `None` when the watchlist is empty.
    pub average_imdb_rating: Option<f64>,
    pub average_user_rating: Option<f64>,
    pub average_runtime_minutes: Option<f64>,
}

/// Older stores kept numbers as strings (`"148"`, `"8.8"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(0))
}

fn lenient_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?;
    value
        .as_f64()
        .filter(|n| *n >= 0.0 && *n <= u8::MAX as f64)
        .map(|n| n as u8)
        .ok_or_else(|| serde::de::Error::custom("userRating is not a valid rating"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watched_entry_accepts_string_numbers() {
        let json = r#"{
            "imdbID": "tt0133093",
            "title": "The Matrix",
            "year": "1999",
            "poster": "http://img/matrix.jpg",
            "runtime": "136",
            "imdbRating": "8.7",
            "userRating": 9,
            "countRating": 2
        }"#;
        let entry: WatchedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.runtime_minutes, 136);
        assert_eq!(entry.imdb_rating, 8.7);
        assert_eq!(entry.user_rating, 9);
        assert_eq!(entry.rating_change_count, 2);
        assert!(entry.added_at.is_none());
    }

    #[test]
    fn watched_entry_tolerates_na_values() {
        let json = r#"{"imdbID":"tt1","title":"X","runtime":"N/A","imdbRating":"N/A","userRating":"4"}"#;
        let entry: WatchedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.runtime_minutes, 0);
        assert_eq!(entry.imdb_rating, 0.0);
        assert_eq!(entry.user_rating, 4);
    }

    #[test]
    fn watched_entry_serializes_with_stored_names() {
        let entry = WatchedEntry {
            id: "tt1".to_string(),
            title: "X".to_string(),
            year: "2001".to_string(),
            poster: String::new(),
            runtime_minutes: 90,
            imdb_rating: 7.5,
            user_rating: 8,
            rating_change_count: 1,
            added_at: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["imdbID"], "tt1");
        assert_eq!(value["runtime"], 90);
        assert_eq!(value["imdbRating"], 7.5);
        assert_eq!(value["countRating"], 1);
        assert!(value.get("addedAt").is_none());
    }
}
