//! Unity Cloud Build REST client.
//!
//! [`BuildServiceClient`] owns the HTTP session and the build target catalog.
//! Its chat-facing operations never fail because of the remote side: every
//! transport error, bad status or unexpected payload is turned into a reply
//! string. The only errors they return are lifecycle misuse (calling them
//! before `start_worker` or after `stop_worker`).
//!
//! # Endpoints
//!
//! - `POST {base_url}/projects/{project_id}/buildtargets/{target_id}/builds`
//! - `GET  {base_url}/projects/{project_id}/buildtargets/{target_id}`

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::catalog::BuildTargetCatalog;
use crate::config::CloudBuildConfig;
use crate::error::{BuildServiceError, Result};

/// Outcome of a single HTTP call.
///
/// Transport failures are values, not errors: callers treat them the same
/// way as an empty response.
#[derive(Debug)]
pub enum HttpOutcome {
    /// The server answered, with any status.
    Response(reqwest::Response),
    /// The request never produced a response (DNS, connect, TLS, reset).
    TransportFailure,
}

/// Why a build service request did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    /// Target name is not in the catalog. No request was sent.
    UnsupportedTarget,
    /// No response was received.
    Transport,
    /// Response body was empty, not JSON, or missing expected fields.
    MalformedResponse,
    /// Server answered with a non-success status.
    Status(u16),
}

/// Result of one build service request.
pub type BuildRequestResult<T> = std::result::Result<T, BuildFailure>;

/// One build started by a `builds` POST.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedBuild {
    pub build_target_name: String,
    pub scm_branch: String,
}

/// Build target details returned by the build target GET.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildTargetInfo {
    pub name: String,
    pub platform: String,
    pub enabled: bool,
    pub settings: BuildTargetSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTargetSettings {
    pub unity_version: String,
    pub scm: ScmSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScmSettings {
    pub branch: String,
}

/// Client for the remote build service.
///
/// Idle until [`start_worker`](Self::start_worker) opens the session;
/// [`stop_worker`](Self::stop_worker) returns it to idle.
pub struct BuildServiceClient {
    project_name: String,
    base_url: String,
    project_id: String,
    catalog: BuildTargetCatalog,
    base_headers: HeaderMap,
    session: RwLock<Option<reqwest::Client>>,
}

impl BuildServiceClient {
    /// Create an idle client from config.
    ///
    /// # Errors
    /// Returns [`BuildServiceError::InvalidApiKey`] if the key cannot be sent
    /// as a header.
    pub fn new(config: &CloudBuildConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Basic {}", config.api_key))
            .map_err(|_| BuildServiceError::InvalidApiKey)?;
        auth.set_sensitive(true);

        let mut base_headers = HeaderMap::new();
        base_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        base_headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            project_name: config.project_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            catalog: config.cloud_build_targets.clone(),
            base_headers,
            session: RwLock::new(None),
        })
    }

    /// Open the HTTP session.
    ///
    /// # Errors
    /// [`BuildServiceError::AlreadyStarted`] if a session is already open; the
    /// existing session is kept.
    pub async fn start_worker(&self) -> Result<()> {
        let mut session = self.session.write().await;
        if session.is_some() {
            return Err(BuildServiceError::AlreadyStarted);
        }
        let client = reqwest::Client::builder().use_rustls_tls().build()?;
        *session = Some(client);
        info!(project = %self.project_name, "Build service worker started");
        Ok(())
    }

    /// Close the HTTP session. Does nothing if it is already closed.
    pub async fn stop_worker(&self) {
        if self.session.write().await.take().is_some() {
            info!(project = %self.project_name, "Build service worker stopped");
        }
    }

    /// Whether the session is open.
    pub async fn is_active(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Catalog target names, in config order.
    pub fn list_supported_builds(&self) -> Vec<String> {
        self.catalog.names().map(str::to_string).collect()
    }

    pub fn catalog(&self) -> &BuildTargetCatalog {
        &self.catalog
    }

    /// Start a build and describe it for chat.
    pub async fn start_build(&self, target: &str) -> Result<String> {
        let reply = match self.request_build(target).await? {
            Ok(build) => format!(
                "Start building {} | Branch: {}",
                build.build_target_name, build.scm_branch
            ),
            Err(BuildFailure::UnsupportedTarget) => unsupported(target),
            Err(_) => format!("Error starting build for target: {}", target),
        };
        Ok(reply)
    }

    /// Fetch build target details and describe them for chat.
    pub async fn build_target_info(&self, target: &str) -> Result<String> {
        let reply = match self.request_target_info(target).await? {
            Ok(info) => format!(
                "Name: {}\nPlatform: {}\nBuild target: {}\n\
                 Status: {}\nUnity version: {}\nBranch: {}\n",
                info.name,
                info.platform,
                target,
                if info.enabled { "enabled" } else { "disabled" },
                info.settings.unity_version,
                info.settings.scm.branch,
            ),
            Err(BuildFailure::UnsupportedTarget) => unsupported(target),
            Err(_) => format!("Error getting build target info for: {}", target),
        };
        Ok(reply)
    }

    /// Start a build of `target`.
    ///
    /// The service may start several builds in one call (one per device
    /// variant); only the first entry of the returned list is reported.
    pub async fn request_build(&self, target: &str) -> Result<BuildRequestResult<StartedBuild>> {
        let session = self.session().await?;
        let Some(target_id) = self.catalog.get(target) else {
            return Ok(Err(BuildFailure::UnsupportedTarget));
        };

        let url = format!(
            "{}/projects/{}/buildtargets/{}/builds",
            self.base_url, self.project_id, target_id
        );
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("clean"), HeaderValue::from_static("true"));

        let outcome = self.send(&session, Method::POST, &url, Some(headers)).await;
        let result = read_json(outcome).await.and_then(first_started_build);
        info!(project = %self.project_name, target, result = ?result, "Start build result");
        Ok(result)
    }

    /// Fetch details of `target`.
    pub async fn request_target_info(
        &self,
        target: &str,
    ) -> Result<BuildRequestResult<BuildTargetInfo>> {
        let session = self.session().await?;
        let Some(target_id) = self.catalog.get(target) else {
            return Ok(Err(BuildFailure::UnsupportedTarget));
        };

        let url = format!(
            "{}/projects/{}/buildtargets/{}",
            self.base_url, self.project_id, target_id
        );

        let outcome = self.send(&session, Method::GET, &url, None).await;
        let result = read_json(outcome).await.and_then(target_info);
        info!(project = %self.project_name, target, result = ?result, "Build target info result");
        Ok(result)
    }

    async fn session(&self) -> Result<reqwest::Client> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(BuildServiceError::NotStarted)
    }

    /// Send a request with the base headers merged over `headers`.
    async fn send(
        &self,
        session: &reqwest::Client,
        method: Method,
        url: &str,
        headers: Option<HeaderMap>,
    ) -> HttpOutcome {
        let mut merged = match headers {
            Some(custom) => {
                info!(
                    project = %self.project_name,
                    %method,
                    url,
                    headers = ?custom,
                    "Sending request with custom headers"
                );
                custom
            }
            None => {
                info!(
                    project = %self.project_name,
                    %method,
                    url,
                    "Sending request without custom headers"
                );
                HeaderMap::new()
            }
        };
        for (name, value) in &self.base_headers {
            merged.insert(name.clone(), value.clone());
        }

        match session.request(method, url).headers(merged).send().await {
            Ok(response) => HttpOutcome::Response(response),
            Err(e) => {
                error!(project = %self.project_name, url, error = %e, "Request failed");
                HttpOutcome::TransportFailure
            }
        }
    }
}

fn unsupported(target: &str) -> String {
    format!("Unsupported build target: {}", target)
}

async fn read_json(outcome: HttpOutcome) -> BuildRequestResult<Value> {
    let response = match outcome {
        HttpOutcome::Response(response) => response,
        HttpOutcome::TransportFailure => return Err(BuildFailure::Transport),
    };
    let status = response.status();
    if !status.is_success() {
        return Err(BuildFailure::Status(status.as_u16()));
    }
    response
        .json::<Value>()
        .await
        .map_err(|_| BuildFailure::MalformedResponse)
}

fn first_started_build(value: Value) -> BuildRequestResult<StartedBuild> {
    match value {
        Value::Array(mut builds) if !builds.is_empty() => {
            serde_json::from_value(builds.swap_remove(0))
                .map_err(|_| BuildFailure::MalformedResponse)
        }
        _ => Err(BuildFailure::MalformedResponse),
    }
}

fn target_info(value: Value) -> BuildRequestResult<BuildTargetInfo> {
    if !matches!(&value, Value::Object(map) if !map.is_empty()) {
        return Err(BuildFailure::MalformedResponse);
    }
    serde_json::from_value(value).map_err(|_| BuildFailure::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> CloudBuildConfig {
        CloudBuildConfig {
            base_url: base_url.to_string(),
            api_key: "secret".to_string(),
            project_id: "game".to_string(),
            project_name: "The Game".to_string(),
            cloud_build_targets: BuildTargetCatalog::from_pairs([
                ("prod", "id-1"),
                ("staging", "id-2"),
            ]),
        }
    }

    async fn started_client(base_url: &str) -> BuildServiceClient {
        let client = BuildServiceClient::new(&config(base_url)).unwrap();
        client.start_worker().await.unwrap();
        client
    }

    #[test]
    fn test_list_supported_builds_in_order() {
        let client = BuildServiceClient::new(&config("http://localhost")).unwrap();
        assert_eq!(client.list_supported_builds(), vec!["prod", "staging"]);
    }

    #[test]
    fn test_new_rejects_header_unsafe_key() {
        let mut cfg = config("http://localhost");
        cfg.api_key = "bad\nkey".to_string();
        assert!(matches!(
            BuildServiceClient::new(&cfg),
            Err(BuildServiceError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn test_start_worker_twice_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/game/buildtargets/id-1/builds"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([
                {"buildTargetName": "Prod", "scmBranch": "main"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        let err = client.start_worker().await.unwrap_err();
        assert!(matches!(err, BuildServiceError::AlreadyStarted));
        assert!(client.is_active().await);

        let reply = client.start_build("prod").await.unwrap();
        assert_eq!(reply, "Start building Prod | Branch: main");

        // One stop closes the single open session.
        client.stop_worker().await;
        assert!(!client.is_active().await);
    }

    #[tokio::test]
    async fn test_stop_worker_is_idempotent() {
        let client = started_client("http://localhost").await;
        client.stop_worker().await;
        client.stop_worker().await;
        assert!(!client.is_active().await);

        // A stopped worker can be started again.
        client.start_worker().await.unwrap();
        assert!(client.is_active().await);
    }

    #[tokio::test]
    async fn test_concurrent_stop_closes_once() {
        let client = std::sync::Arc::new(started_client("http://localhost").await);
        let a = tokio::spawn({
            let client = std::sync::Arc::clone(&client);
            async move { client.stop_worker().await }
        });
        let b = tokio::spawn({
            let client = std::sync::Arc::clone(&client);
            async move { client.stop_worker().await }
        });
        a.await.unwrap();
        b.await.unwrap();
        assert!(!client.is_active().await);
    }

    #[tokio::test]
    async fn test_operations_require_started_worker() {
        let client = BuildServiceClient::new(&config("http://localhost")).unwrap();
        assert!(matches!(
            client.start_build("prod").await,
            Err(BuildServiceError::NotStarted)
        ));
        assert!(matches!(
            client.build_target_info("prod").await,
            Err(BuildServiceError::NotStarted)
        ));

        client.start_worker().await.unwrap();
        client.stop_worker().await;
        assert!(matches!(
            client.start_build("prod").await,
            Err(BuildServiceError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_target_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.start_build("qa").await.unwrap(),
            "Unsupported build target: qa"
        );
        assert_eq!(
            client.build_target_info("qa").await.unwrap(),
            "Unsupported build target: qa"
        );
    }

    #[tokio::test]
    async fn test_start_build_reports_first_build() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/game/buildtargets/id-1/builds"))
            .and(header("clean", "true"))
            .and(header("authorization", "Basic secret"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([
                {"buildTargetName": "ios-prod", "scmBranch": "main", "build": 12},
                {"buildTargetName": "ios-prod-ipad", "scmBranch": "main", "build": 13}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.start_build("prod").await.unwrap(),
            "Start building ios-prod | Branch: main"
        );
    }

    #[tokio::test]
    async fn test_start_build_empty_list_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.start_build("prod").await.unwrap(),
            "Error starting build for target: prod"
        );
    }

    #[tokio::test]
    async fn test_start_build_object_response_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        let result = client.request_build("prod").await.unwrap();
        assert_eq!(result, Err(BuildFailure::MalformedResponse));
    }

    #[tokio::test]
    async fn test_start_build_bad_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!([
                {"buildTargetName": "ios-prod", "scmBranch": "main"}
            ])))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.request_build("prod").await.unwrap(),
            Err(BuildFailure::Status(401))
        );
        assert_eq!(
            client.start_build("prod").await.unwrap(),
            "Error starting build for target: prod"
        );
    }

    #[tokio::test]
    async fn test_start_build_not_json_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.request_build("prod").await.unwrap(),
            Err(BuildFailure::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_text() {
        // Nothing listens on port 1.
        let client = started_client("http://127.0.0.1:1").await;
        assert_eq!(
            client.request_build("prod").await.unwrap(),
            Err(BuildFailure::Transport)
        );
        assert_eq!(
            client.start_build("prod").await.unwrap(),
            "Error starting build for target: prod"
        );
        assert_eq!(
            client.build_target_info("staging").await.unwrap(),
            "Error getting build target info for: staging"
        );
    }

    #[tokio::test]
    async fn test_build_target_info_formats_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/game/buildtargets/id-2"))
            .and(header("authorization", "Basic secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Android Staging",
                "platform": "android",
                "enabled": false,
                "settings": {
                    "unityVersion": "2022_3_10f1",
                    "scm": {"branch": "develop", "type": "git"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.build_target_info("staging").await.unwrap(),
            "Name: Android Staging\nPlatform: android\nBuild target: staging\n\
             Status: disabled\nUnity version: 2022_3_10f1\nBranch: develop\n"
        );
    }

    #[tokio::test]
    async fn test_build_target_info_empty_object_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.build_target_info("prod").await.unwrap(),
            "Error getting build target info for: prod"
        );
    }

    #[tokio::test]
    async fn test_build_target_info_missing_nested_field_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "iOS", "platform": "ios", "enabled": true,
                "settings": {"unityVersion": "latest"}
            })))
            .mount(&server)
            .await;

        let client = started_client(&server.uri()).await;
        assert_eq!(
            client.request_target_info("prod").await.unwrap(),
            Err(BuildFailure::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/game/buildtargets/id-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "iOS", "platform": "ios", "enabled": true,
                "settings": {"unityVersion": "latest", "scm": {"branch": "main"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = started_client(&format!("{}/", server.uri())).await;
        let reply = client.build_target_info("prod").await.unwrap();
        assert!(reply.starts_with("Name: iOS\n"));
        assert!(reply.contains("Status: enabled\n"));
    }
}
