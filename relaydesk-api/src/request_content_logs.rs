//! Admin request content log queries

use crate::client::{clean_query, ApiClient};
use crate::messages::{normalize_messages, ChatMessage};
use chrono::{DateTime, SecondsFormat, Utc};
use relaydesk_core::RelayDeskResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// Listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContentLogItem {
    pub id: i64,
    pub user_id: i64,
    pub api_key_id: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
}

/// Listing row plus the captured request messages in their platform-specific shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContentLogDetail {
    #[serde(flatten)]
    pub item: RequestContentLogItem,
    #[serde(default)]
    pub messages: serde_json::Value,
}

impl RequestContentLogDetail {
    pub fn normalized_messages(&self) -> Vec<ChatMessage> {
        normalize_messages(&self.messages)
    }
}

/// Listing filters; unset fields are not sent
#[derive(Debug, Clone, Default)]
pub struct RequestContentLogFilters {
    pub user_id: Option<i64>,
    pub api_key_id: Option<i64>,
    pub model: Option<String>,
    pub platform: Option<String>,
    pub session_fingerprint: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl RequestContentLogFilters {
    fn query_pairs(&self) -> Vec<(&'static str, Option<String>)> {
        let rfc3339 = |date: &DateTime<Utc>| date.to_rfc3339_opts(SecondsFormat::Secs, true);
        vec![
            ("user_id", self.user_id.map(|id| id.to_string())),
            ("api_key_id", self.api_key_id.map(|id| id.to_string())),
            ("model", self.model.clone()),
            ("platform", self.platform.clone()),
            ("session_fingerprint", self.session_fingerprint.clone()),
            ("start_date", self.start_date.as_ref().map(rfc3339)),
            ("end_date", self.end_date.as_ref().map(rfc3339)),
        ]
    }
}

/// `/admin/request-content-logs` endpoints
#[derive(Clone)]
pub struct RequestContentLogsApi {
    client: ApiClient,
}

impl RequestContentLogsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Page through captured requests, newest first
    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: &RequestContentLogFilters,
    ) -> RelayDeskResult<PaginatedResponse<RequestContentLogItem>> {
        let mut params = vec![
            ("page", Some(page.to_string())),
            ("page_size", Some(page_size.to_string())),
        ];
        params.extend(filters.query_pairs());

        self.client
            .get("/admin/request-content-logs", &clean_query(params))
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> RelayDeskResult<RequestContentLogDetail> {
        self.client
            .get(&format!("/admin/request-content-logs/{}", id), &[])
            .await
    }

    /// Every captured request of one conversation, in order
    pub async fn get_session(
        &self,
        fingerprint: &str,
    ) -> RelayDeskResult<Vec<RequestContentLogDetail>> {
        let path = format!(
            "/admin/request-content-logs/session/{}",
            urlencoding::encode(fingerprint)
        );
        self.client.get(&path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_filters_skip_unset_fields() {
        let filters = RequestContentLogFilters {
            model: Some("claude-sonnet".to_string()),
            platform: Some(String::new()),
            start_date: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };
        let query = clean_query(filters.query_pairs());
        assert_eq!(
            query,
            vec![
                ("model", "claude-sonnet".to_string()),
                ("start_date", "2024-01-02T03:04:05Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_detail_decodes_go_timestamps() {
        let raw = json!({
            "id": 9,
            "user_id": 2,
            "api_key_id": 3,
            "model": "gemini-2.5-pro",
            "platform": "gemini",
            "ip_address": "10.0.0.1",
            "user_agent": "curl/8",
            "created_at": "2024-06-01T20:00:00+08:00",
            "session_fingerprint": "fp-1",
            "message_offset": 0,
            "message_count": 1,
            "messages": [{"role": "model", "parts": [{"text": "hi"}]}]
        });

        let detail: RequestContentLogDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(detail.item.id, 9);
        assert_eq!(
            detail.item.created_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        );
        assert!(detail.item.user_email.is_none());
        assert_eq!(detail.normalized_messages()[0].content, "hi");
    }

    #[test]
    fn test_page_navigation() {
        let page: PaginatedResponse<i64> = PaginatedResponse {
            items: vec![1, 2],
            total: 42,
            page: 1,
            page_size: 20,
            pages: 3,
        };
        assert!(page.has_next());
    }
}
