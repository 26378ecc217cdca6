use crate::http::{FetchError, HttpClient};
use crate::models::{SearchResultSummary, TitleDetail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

pub const SEARCH_NOT_FOUND: &str = "Movie not found";
pub const DETAIL_NOT_FOUND: &str = "Unable to fetch Movie details";

/// The movie database as seen by the fetchers.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResultSummary>, FetchError>;
    async fn details(&self, id: &str) -> Result<TitleDetail, FetchError>;
}

pub struct OmdbClient {
    http: HttpClient,
    base_url: url::Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<SearchResultSummary>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TitlePayload {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Director")]
    director: String,
    #[serde(rename = "Actors")]
    actors: String,
    #[serde(rename = "Plot")]
    plot: String,
    #[serde(rename = "Poster")]
    poster: String,
    #[serde(rename = "Released")]
    released: String,
    #[serde(rename = "Runtime")]
    runtime: String,
    #[serde(rename = "Genre")]
    genre: String,
    #[serde(rename = "imdbRating")]
    imdb_rating: String,
}

impl OmdbClient {
    pub fn new(http: HttpClient, base_url: &str, api_key: String) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, param: &str, value: &str) -> url::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair(param, value);
        url
    }
}

#[async_trait]
impl MovieApi for OmdbClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchResultSummary>, FetchError> {
        let payload: SearchPayload = self.http.get_json(&self.url("s", query)).await?;
        let results = search_results(payload)?;
        info!("Search returned {} results", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn details(&self, id: &str) -> Result<TitleDetail, FetchError> {
        let payload: TitlePayload = self.http.get_json(&self.url("i", id)).await?;
        let detail = title_detail(payload, id)?;
        info!("Fetched details for {}", detail.title);
        Ok(detail)
    }
}

fn search_results(payload: SearchPayload) -> Result<Vec<SearchResultSummary>, FetchError> {
    if payload.response != "True" {
        warn!(
            "Search rejected by OMDb: {}",
            payload.error.as_deref().unwrap_or("no reason given")
        );
        return Err(FetchError::Application(SEARCH_NOT_FOUND.to_string()));
    }
    Ok(payload.search)
}

fn title_detail(payload: TitlePayload, id: &str) -> Result<TitleDetail, FetchError> {
    if payload.response != "True" {
        warn!(
            "Detail lookup rejected by OMDb: {}",
            payload.error.as_deref().unwrap_or("no reason given")
        );
        return Err(FetchError::Application(DETAIL_NOT_FOUND.to_string()));
    }

    Ok(TitleDetail {
        id: payload.imdb_id.unwrap_or_else(|| id.to_string()),
        runtime_minutes: parse_runtime(&payload.runtime),
        imdb_rating: payload.imdb_rating.trim().parse().unwrap_or(0.0),
        title: payload.title,
        year: payload.year,
        director: payload.director,
        actors: payload.actors,
        plot: payload.plot,
        poster: payload.poster,
        released: payload.released,
        runtime: payload.runtime,
        genre: payload.genre,
    })
}

/// `"148 min"` -> 148; anything unparsable is 0.
fn parse_runtime(runtime: &str) -> u32 {
    runtime
        .split_whitespace()
        .next()
        .and_then(|minutes| minutes.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_payload_with_results() {
        let json = r#"{
            "Search": [
                {"Title": "Inception", "Year": "2010", "imdbID": "tt1375666", "Type": "movie", "Poster": "http://img/inception.jpg"},
                {"Title": "Inception: The Cobol Job", "Year": "2010", "imdbID": "tt5295894", "Type": "movie", "Poster": "N/A"}
            ],
            "totalResults": "2",
            "Response": "True"
        }"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        let results = search_results(payload).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "tt1375666");
        assert_eq!(results[0].title, "Inception");
        assert_eq!(results[1].poster, "N/A");
    }

    #[test]
    fn search_payload_not_found_is_application_error() {
        let json = r#"{"Response": "False", "Error": "Movie not found!"}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        let err = search_results(payload).unwrap_err();
        assert!(matches!(err, FetchError::Application(_)));
        assert_eq!(err.to_string(), "Movie not found");
    }

    #[test]
    fn title_payload_maps_fields() {
        let json = r#"{
            "Title": "Inception", "Year": "2010", "Released": "16 Jul 2010",
            "Runtime": "148 min", "Genre": "Action, Adventure, Sci-Fi",
            "Director": "Christopher Nolan", "Actors": "Leonardo DiCaprio",
            "Plot": "A thief who steals corporate secrets.", "Poster": "http://img/inception.jpg",
            "imdbRating": "8.8", "imdbID": "tt1375666", "Response": "True"
        }"#;
        let payload: TitlePayload = serde_json::from_str(json).unwrap();
        let detail = title_detail(payload, "tt1375666").unwrap();
        assert_eq!(detail.title, "Inception");
        assert_eq!(detail.runtime_minutes, 148);
        assert_eq!(detail.runtime, "148 min");
        assert_eq!(detail.imdb_rating, 8.8);
        assert_eq!(detail.director, "Christopher Nolan");
    }

    #[test]
    fn title_payload_failure_is_application_error() {
        let json = r#"{"Response": "False", "Error": "Incorrect IMDb ID."}"#;
        let payload: TitlePayload = serde_json::from_str(json).unwrap();
        let err = title_detail(payload, "tt0").unwrap_err();
        assert_eq!(err.to_string(), "Unable to fetch Movie details");
    }

    #[test]
    fn runtime_parsing() {
        assert_eq!(parse_runtime("148 min"), 148);
        assert_eq!(parse_runtime("N/A"), 0);
        assert_eq!(parse_runtime(""), 0);
    }

    #[test]
    fn query_is_encoded() {
        let client = OmdbClient::new(
            HttpClient::new(std::time::Duration::from_secs(1)).unwrap(),
            "http://www.omdbapi.com/",
            "key".to_string(),
        )
        .unwrap();
        let url = client.url("s", "star wars & more");
        assert_eq!(
            url.as_str(),
            "http://www.omdbapi.com/?apikey=key&s=star+wars+%26+more"
        );
    }
}
