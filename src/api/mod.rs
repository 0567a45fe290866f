//! Dashboard Lookup Client
//!
//! Backs the dependent drop-down on the dashboard: selecting a test type
//! fetches its sub-tests, selecting a sub-test fetches its details. Fetch
//! failures are reported to the caller, who logs them and leaves the prior
//! UI state unchanged; there is no retry.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Dashboard lookup error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport or HTTP status failure
    #[error("Dashboard request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with its `{"error": ...}` body
    #[error("Dashboard rejected the lookup: {0}")]
    Rejected(String),

    /// Request URL construction failed
    #[error("Invalid dashboard URL: {0}")]
    InvalidUrl(String),
}

/// One sub-test option for the drop-down
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubTest {
    /// Database identifier
    pub id: u64,
    /// Display name
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SubTestsResponse {
    sub_tests: Vec<SubTest>,
}

/// Detail view of one sub-test
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubTestDetail {
    /// Display name
    pub name: String,
    /// Description shown under the name
    pub details: String,
    /// Instructions shown to the test taker
    pub instructions: String,
}

/// Detail responses carry either the detail fields or an error body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubTestDetailResponse {
    Detail(SubTestDetail),
    Error {
        /// Server-provided failure description
        error: String,
    },
}

/// HTTP client for the dashboard lookup endpoints.
pub struct DashboardClient {
    http: reqwest::Client,
    base: Url,
}

impl DashboardClient {
    /// Create a client against the server base URL
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// `GET /dashboard/get-subtests/?test_type=<id>`
    ///
    /// An empty `sub_tests` list is a valid answer (the drop-down shows
    /// "no sub-tests available"), not an error.
    pub async fn get_sub_tests(&self, test_type: u64) -> Result<Vec<SubTest>, ApiError> {
        let mut url = self
            .base
            .join("dashboard/get-subtests/")
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("test_type", &test_type.to_string());

        debug!("Fetching sub-tests for test type {}", test_type);
        let response: SubTestsResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.sub_tests)
    }

    /// Same-page query: `GET {page_path}?sub_test_id=<id>`
    pub async fn sub_test_detail(
        &self,
        page_path: &str,
        sub_test_id: u64,
    ) -> Result<SubTestDetail, ApiError> {
        let mut url = self
            .base
            .join(page_path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("sub_test_id", &sub_test_id.to_string());

        debug!("Fetching detail for sub-test {}", sub_test_id);
        let response: SubTestDetailResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            SubTestDetailResponse::Detail(detail) => Ok(detail),
            SubTestDetailResponse::Error { error } => Err(ApiError::Rejected(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_tests_response_shape() {
        let body = r#"{"sub_tests": [{"id": 1, "name": "Listening"}, {"id": 2, "name": "Reading"}]}"#;
        let parsed: SubTestsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sub_tests.len(), 2);
        assert_eq!(
            parsed.sub_tests[0],
            SubTest {
                id: 1,
                name: "Listening".into()
            }
        );
    }

    #[test]
    fn test_empty_sub_tests_is_valid() {
        let parsed: SubTestsResponse = serde_json::from_str(r#"{"sub_tests": []}"#).unwrap();
        assert!(parsed.sub_tests.is_empty());
    }

    #[test]
    fn test_detail_response_shapes() {
        let body = r#"{"name": "Reading", "details": "40 questions", "instructions": "No notes."}"#;
        match serde_json::from_str::<SubTestDetailResponse>(body).unwrap() {
            SubTestDetailResponse::Detail(detail) => {
                assert_eq!(detail.name, "Reading");
                assert_eq!(detail.details, "40 questions");
            }
            SubTestDetailResponse::Error { .. } => panic!("expected detail variant"),
        }

        let body = r#"{"error": "SubTest not found"}"#;
        match serde_json::from_str::<SubTestDetailResponse>(body).unwrap() {
            SubTestDetailResponse::Error { error } => assert_eq!(error, "SubTest not found"),
            SubTestDetailResponse::Detail(_) => panic!("expected error variant"),
        }
    }
}
