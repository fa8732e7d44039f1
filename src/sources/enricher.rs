//! AI enrichment through an OpenAI-compatible API
//!
//! One chat completion in JSON mode produces the summary, categories,
//! sentiment and comment summary; one embeddings call produces the vector.

use crate::config::EnricherConfig;
use crate::model::{Analysis, RawContentItem};
use crate::sources::{build_http_client, require_env, Enricher};
use crate::{EnrichError, HarvestError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You analyze short-form social media videos from their caption \
and top comments. Reply with a JSON object with the keys: \
\"ai_summary\" (one or two sentences), \
\"category\" (array of up to three short category names), \
\"sentiment\" (one of \"Positive\", \"Neutral\", \"Negative\"), \
\"top_comment_summary\" (one sentence, empty if there are no comments).";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Fields the model is asked to return
#[derive(Debug, Deserialize)]
struct AnalysisReply {
    #[serde(default)]
    ai_summary: String,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    top_comment_summary: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiEnricher {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAiEnricher {
    pub fn new(config: &EnricherConfig) -> Result<Self, HarvestError> {
        let api_key = require_env(&config.api_key_env)?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &EnricherConfig, api_key: String) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(Duration::from_secs(60))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    /// Asks the chat model for the analysis fields of one item
    async fn complete(&self, item: &RawContentItem) -> Result<AnalysisReply, HarvestError> {
        let request = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(item) },
            ],
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let chat: ChatResponse = read_json(resp).await?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| HarvestError::InvalidResponse("empty chat response".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| HarvestError::InvalidResponse(format!("invalid analysis JSON: {}", e)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, HarvestError> {
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                input: text,
            })
            .send()
            .await?;
        let embedded: EmbeddingResponse = read_json(resp).await?;

        embedded
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| HarvestError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Decodes a successful response body, or turns an error status into `HarvestError::Api`
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, HarvestError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HarvestError::Api {
            status: status.as_u16(),
            message: body.trim().to_string(),
        });
    }
    Ok(resp.json().await?)
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    async fn analyze(&self, item: &RawContentItem) -> Result<Analysis, EnrichError> {
        let reply = self
            .complete(item)
            .await
            .map_err(|e| EnrichError::new(&item.id, e))?;

        let embedding_input = format!("{}\n{}", item.caption, reply.ai_summary);
        let embedding = self
            .embed(embedding_input.trim())
            .await
            .map_err(|e| EnrichError::new(&item.id, e))?;

        tracing::debug!(item_id = %item.id, sentiment = %reply.sentiment, "Item analyzed");

        Ok(Analysis {
            ai_summary: reply.ai_summary,
            categories: reply.category,
            sentiment: reply.sentiment,
            top_comment_summary: reply.top_comment_summary,
            embedding,
        })
    }
}

fn user_prompt(item: &RawContentItem) -> String {
    let mut prompt = format!(
        "Creator: @{}\nLikes: {}\nViews: {}\nCaption: {}\n",
        item.creator.username, item.like_count, item.view_count, item.caption
    );
    if item.top_comments.is_empty() {
        prompt.push_str("Top comments: none\n");
    } else {
        prompt.push_str("Top comments:\n");
        for comment in &item.top_comments {
            prompt.push_str(&format!("- {}: {}\n", comment.user, comment.comment));
        }
    }
    prompt
}
