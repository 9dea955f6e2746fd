//! Skill Types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Skill invocation body: `{ "parameters": { ... } }`.
#[derive(Debug, Deserialize)]
pub struct SkillRequest<P> {
    #[serde(default)]
    pub parameters: P,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocsParams {
    pub query: Option<String>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
}

/// Skill catalogue served to the platform for discovery.
#[derive(Debug, Serialize)]
pub struct SkillManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub skills: Vec<SkillDefinition>,
}

#[derive(Debug, Serialize)]
pub struct SkillDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub endpoint: &'static str,
    /// JSON schema of the `parameters` object.
    pub parameters: Value,
}
