use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::{config_from_row, DataSource, FetchError};
use crate::config::SyncConfig;
use crate::constants::{AI_CONFIG_TABLE, CONVERSATIONS_TABLE, MESSAGES_TABLE};
use crate::models::{AiConfig, AiConfigRow, Conversation, Message};

/// Asks PostgREST for exactly one row instead of an array
const SINGLE_OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// [`DataSource`] backed by a PostgREST endpoint (e.g. a Supabase project's `/rest/v1`).
#[derive(Debug, Clone)]
pub struct RestDataSource {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestDataSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &SyncConfig) -> anyhow::Result<Self> {
        let base_url = config
            .rest_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("restUrl is not set in the config"))?;
        let api_key = config.api_key.clone().unwrap_or_default();

        Ok(Self::new(base_url, api_key, config.request_timeout())?)
    }

    fn table(&self, table: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn conversations_request(&self) -> RequestBuilder {
        self.table(CONVERSATIONS_TABLE).query(&[
            ("select", "*"),
            ("order", "last_message_at.desc.nullslast"),
        ])
    }

    fn messages_request(&self, conversation_id: &str) -> RequestBuilder {
        let filter = format!("eq.{}", conversation_id);
        self.table(MESSAGES_TABLE).query(&[
            ("select", "*"),
            ("conversation_id", filter.as_str()),
            ("order", "created_at.asc"),
        ])
    }

    fn ai_config_request(&self) -> RequestBuilder {
        self.table(AI_CONFIG_TABLE)
            .query(&[("select", "*")])
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT_MEDIA_TYPE)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        what: &'static str,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        // PostgREST answers 406 when a single-object read matches no row
        if status == StatusCode::NOT_ACCEPTABLE {
            return Err(FetchError::NotFound(what));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            what,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DataSource for RestDataSource {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, FetchError> {
        self.fetch(CONVERSATIONS_TABLE, self.conversations_request())
            .await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError> {
        self.fetch(MESSAGES_TABLE, self.messages_request(conversation_id)).await
    }

    async fn read_ai_config(&self) -> Result<AiConfig, FetchError> {
        let row: AiConfigRow = self.fetch(AI_CONFIG_TABLE, self.ai_config_request()).await?;
        Ok(config_from_row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RestDataSource {
        RestDataSource::new(
            "https://project.supabase.co/rest/v1/",
            "anon-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_conversations_query_orders_nulls_last() {
        let request = source().conversations_request().build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://project.supabase.co/rest/v1/conversations?select=*&order=last_message_at.desc.nullslast"
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
    }

    #[test]
    fn test_messages_query_filters_by_conversation() {
        let request = source().messages_request("c1").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://project.supabase.co/rest/v1/messages?select=*&conversation_id=eq.c1&order=created_at.asc"
        );
    }

    #[test]
    fn test_ai_config_query_asks_for_single_object() {
        let request = source().ai_config_request().build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://project.supabase.co/rest/v1/ai_config?select=*"
        );
        assert_eq!(
            request.headers()[reqwest::header::ACCEPT],
            SINGLE_OBJECT_MEDIA_TYPE
        );
    }

    #[test]
    fn test_from_config_requires_rest_url() {
        let config = SyncConfig::default();
        assert!(RestDataSource::from_config(&config).is_err());

        let config = SyncConfig {
            rest_url: Some("http://localhost:54321/rest/v1".to_string()),
            ..SyncConfig::default()
        };
        let source = RestDataSource::from_config(&config).unwrap();
        assert_eq!(source.base_url, "http://localhost:54321/rest/v1");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine
        let source = RestDataSource::new("http://127.0.0.1:9", "", Duration::from_secs(2)).unwrap();
        let err = source.list_conversations().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
