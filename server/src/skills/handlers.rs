//! Skill Handlers
//!
//! Placeholder skills returning canned data; swap the bodies for real
//! lookups.

use axum::Json;
use serde_json::json;
use tracing::instrument;

use super::types::{
    SearchDocsParams, SearchResult, SearchResults, SkillDefinition, SkillManifest, SkillRequest,
    WeatherParams, WeatherReport,
};
use crate::api::{RequestError, RequestResult};

/// Default and cap for `searchDocs` result counts.
const DEFAULT_MAX_RESULTS: usize = 5;
const PLACEHOLDER_RESULTS: usize = 3;

/// GET /manifest.json
pub async fn manifest() -> Json<SkillManifest> {
    Json(skill_manifest())
}

/// POST /skills/getWeather
#[instrument(skip_all)]
pub async fn get_weather(
    Json(req): Json<SkillRequest<WeatherParams>>,
) -> RequestResult<Json<WeatherReport>> {
    let city = required(req.parameters.city, "city")?;

    Ok(Json(WeatherReport {
        city,
        temperature: "18°C".to_string(),
        condition: "Partly cloudy".to_string(),
        humidity: "65%".to_string(),
    }))
}

/// POST /skills/searchDocs
#[instrument(skip_all)]
pub async fn search_docs(
    Json(req): Json<SkillRequest<SearchDocsParams>>,
) -> RequestResult<Json<SearchResults>> {
    let query = required(req.parameters.query, "query")?;
    let count = req
        .parameters
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .min(PLACEHOLDER_RESULTS);

    let results = (1..=count)
        .map(|i| SearchResult {
            title: format!("Document {i} matching \"{query}\""),
            snippet: format!(
                "This is a placeholder snippet for result {i}. Replace with real content."
            ),
            url: format!("https://docs.example.com/articles/{i}"),
        })
        .collect();

    Ok(Json(SearchResults { results }))
}

fn required(value: Option<String>, name: &str) -> RequestResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RequestError::Validation(format!("{name} parameter is required")))
}

pub fn skill_manifest() -> SkillManifest {
    SkillManifest {
        name: "copilot-relay-skills",
        description: "Example skills exposed to Copilot Chat",
        skills: vec![
            SkillDefinition {
                name: "getWeather",
                description: "Get the current weather for a city",
                endpoint: "/skills/getWeather",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "city": { "type": "string", "description": "City name" }
                    },
                    "required": ["city"]
                }),
            },
            SkillDefinition {
                name: "searchDocs",
                description: "Search the documentation for matching articles",
                endpoint: "/skills/searchDocs",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search terms" },
                        "maxResults": {
                            "type": "integer",
                            "description": "Maximum number of results",
                            "default": DEFAULT_MAX_RESULTS
                        }
                    },
                    "required": ["query"]
                }),
            },
        ],
    }
}
