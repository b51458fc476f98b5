//! Stateless calls to the assistant endpoints (test-case generation and
//! hints). These never touch the execution session.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const TEST_CASES_PATH: &str = "api/gemini/testcases";
pub const HINTS_PATH: &str = "api/gemini/hints";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("invalid assistant url: {0}")]
    Url(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
}

#[derive(Debug, Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestCasesResponse {
    test_cases: String,
}

#[derive(Debug, Deserialize)]
struct HintsResponse {
    result: String,
}

#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base: Url,
}

impl AssistantClient {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub async fn test_cases(&self, code: &str) -> Result<String, AssistantError> {
        let response: TestCasesResponse = self.post(TEST_CASES_PATH, code).await?;
        Ok(response.test_cases)
    }

    pub async fn hints(&self, code: &str) -> Result<String, AssistantError> {
        let response: HintsResponse = self.post(HINTS_PATH, code).await?;
        Ok(response.result)
    }

    async fn post<T>(&self, path: &str, code: &str) -> Result<T, AssistantError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.base.join(path)?;
        debug!(%url, bytes = code.len(), "assistant request");
        let response = self
            .http
            .post(url)
            .json(&CodeRequest { code })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::HttpStatus(status));
        }
        Ok(response.json::<T>().await?)
    }
}
