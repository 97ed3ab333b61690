//! Blocking client for the backlog data endpoint.

use reqwest::blocking::Client;
use reqwest::{header, StatusCode, Url};
use sprint_core::{BoardData, Error, Result, SprintConfig};

/// Path of the backlog data document below the Greenhopper REST root.
const BACKLOG_DATA_PATH: &str = "xboard/plan/backlog/data.json";

/// Name of the session cookie the tracker authenticates with.
const SESSION_COOKIE: &str = "JSESSIONID";

/// Client for one tracker instance, authenticated by session cookie.
pub struct TrackerClient {
    client: Client,
    endpoint: Url,
    project_key: String,
}

impl TrackerClient {
    /// Create a client that sends `session_id` as the `JSESSIONID` cookie.
    ///
    /// Both the token and the base URL are validated here, so a bad value
    /// surfaces as a config error before any request is made.
    pub fn new(
        session_id: &str,
        base_url: impl Into<String>,
        project_key: impl Into<String>,
    ) -> Result<Self> {
        let value = format!("{}={}", SESSION_COOKIE, session_id);
        let mut cookie = header::HeaderValue::from_str(&value)
            .map_err(|_| Error::Config("JSESSION_ID contains invalid characters".to_string()))?;
        cookie.set_sensitive(true);

        let base_url = base_url.into();
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), BACKLOG_DATA_PATH);
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::Config(format!("invalid BASE_URL '{}': {}", base_url, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::COOKIE, cookie);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("sprint-deck/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            project_key: project_key.into(),
        })
    }

    /// Create a client from run configuration.
    pub fn from_config(config: &SprintConfig) -> Result<Self> {
        Self::new(&config.session_id, &config.base_url, &config.project_key)
    }

    /// Full URL of the backlog data document for a rapid board.
    pub fn backlog_url(&self, rapid_view_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("rapidViewId", rapid_view_id)
            .append_pair("selectedProjectKey", &self.project_key);
        url
    }

    /// Fetch and parse the board data for a rapid board.
    pub fn fetch_board(&self, rapid_view_id: &str) -> Result<BoardData> {
        let url = self.backlog_url(rapid_view_id);
        log::info!("Fetching board data for rapid view {}", rapid_view_id);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let body = response.text().map_err(|e| Error::Http(e.to_string()))?;
        check_status(status, &body)?;

        log::debug!("Received {} bytes of board data", body.len());
        BoardData::from_json(&body)
    }
}

/// Map a response status to the matching error.
fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::SessionExpired);
    }

    if !status.is_success() {
        return Err(Error::TrackerStatus {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backlog_url() {
        let base = "https://jira.example.com/rest/greenhopper/1.0/";
        let client = TrackerClient::new("ABC", base, "LOG").unwrap();
        let url = client.backlog_url("77");
        assert_eq!(
            url.path(),
            "/rest/greenhopper/1.0/xboard/plan/backlog/data.json"
        );
        assert_eq!(url.query(), Some("rapidViewId=77&selectedProjectKey=LOG"));
    }

    #[test]
    fn test_backlog_url_encodes_query() {
        let client = TrackerClient::new("ABC", "https://jira.example.com", "A&B").unwrap();
        let url = client.backlog_url("12 34");
        assert_eq!(
            url.query(),
            Some("rapidViewId=12+34&selectedProjectKey=A%26B")
        );
    }

    #[test]
    fn test_invalid_base_url() {
        match TrackerClient::new("ABC", "not a url", "LOG") {
            Err(err) => assert!(err.is_config()),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[test]
    fn test_invalid_session_token() {
        let result = TrackerClient::new("bad\ntoken", "https://jira.example.com", "LOG");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unauthorized_is_session_expired() {
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, ""),
            Err(Error::SessionExpired)
        ));
    }

    #[test]
    fn test_other_failures_fail_fast() {
        match check_status(StatusCode::SERVICE_UNAVAILABLE, "maintenance") {
            Err(Error::TrackerStatus { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(check_status(StatusCode::OK, "{}").is_ok());
    }
}
