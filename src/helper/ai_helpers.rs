use crate::config::AiConfig;
use crate::models::db_operations::ai_db_operations;
use crate::models::AiMessage;
use crate::DbPool;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service error: {0}")]
    Api(String),
    #[error("{0}")]
    Validation(String),
}

pub const MAX_QUESTION_LEN: usize = 500;
pub const HISTORY_LIMIT: u32 = 30;

const GENERATE_URL_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize, Deserialize)]
struct ContentPart {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Client for the generative-text collaborator. Built once at startup from
/// the config's `ai` section and injected as app data.
pub struct AiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AiClient {
    pub fn new(cfg: &AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            client,
        })
    }

    pub async fn ask(&self, question: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![ContentPart {
                    text: question.to_string(),
                }],
            }],
        };

        let url = format!("{}/{}:generateContent", GENERATE_URL_BASE, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("{}: {}", status, body)));
        }

        let parsed: GenerateResponse = response.json().await?;
        extract_answer(parsed).ok_or_else(|| AiError::Api("Empty response from model.".to_string()))
    }
}

fn extract_answer(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .filter(|text| !text.trim().is_empty())
}

/// Validates the question, calls the collaborator, and persists the exchange
/// only after a successful answer; a failed call leaves no record behind.
pub async fn ask_and_store(
    pool: &DbPool,
    client: &AiClient,
    user_id: i64,
    question: &str,
) -> Result<String, AiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AiError::Validation("Question cannot be empty.".to_string()));
    }
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(AiError::Validation(format!(
            "Question must be at most {} characters.",
            MAX_QUESTION_LEN
        )));
    }

    let answer = client.ask(question).await?;

    let conn = pool.get()?;
    ai_db_operations::insert_message(&conn, user_id, question, &answer)?;
    Ok(answer)
}

pub fn history(pool: &DbPool, user_id: i64) -> Result<Vec<AiMessage>, AiError> {
    let conn = pool.get()?;
    Ok(ai_db_operations::history_for_user(&conn, user_id, HISTORY_LIMIT)?)
}

pub fn clear_history(pool: &DbPool, user_id: i64) -> Result<usize, AiError> {
    let conn = pool.get()?;
    Ok(ai_db_operations::clear_for_user(&conn, user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_first_candidate_text() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Finals start June 3rd."}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_answer(parsed).as_deref(), Some("Finals start June 3rd."));
    }

    #[test]
    fn empty_or_missing_candidates_yield_none() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_answer(parsed).is_none());

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap();
        assert!(extract_answer(parsed).is_none());
    }
}
