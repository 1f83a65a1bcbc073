//! reqwest-backed [`WorkspaceClient`]
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/2.0/sql/endpoints/` | List endpoints |
//! | POST   | `/api/2.0/sql/endpoints/` | Create endpoint |
//! | POST   | `/api/2.0/sql/endpoints/{id}/stop` | Stop endpoint |
//! | DELETE | `/api/2.0/sql/endpoints/{id}` | Delete endpoint |
//! | PATCH  | `/api/2.0/permissions/sql/endpoints/{id}` | Add ACL grants |

use async_trait::async_trait;
use janitor_api::{
    AccessControlRequest, CreateEndpointResponse, Endpoint, EndpointSpec, ListEndpointsResponse,
};
use janitor_util::EndpointId;
use janitor_workspace_api::{WorkspaceClient, WorkspaceError, WorkspaceResult};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const SQL_ENDPOINTS: &str = "api/2.0/sql/endpoints";
const ENDPOINT_PERMISSIONS: &str = "api/2.0/permissions/sql/endpoints";

/// Client for one workspace's control plane
#[derive(Debug, Clone)]
pub struct HttpWorkspaceClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWorkspaceClient {
    /// Build a client that authenticates every request with `token`
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> WorkspaceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| WorkspaceError::Config("token is not a valid header value".into()))?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .map_err(|e| WorkspaceError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and turn any non-2xx status into an error
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> WorkspaceResult<Response> {
        debug!(endpoint, "Sending request");

        let resp = request.send().await.map_err(|e| WorkspaceError::Transport {
            endpoint: endpoint.into(),
            message: e.to_string(),
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(WorkspaceError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: Response) -> WorkspaceResult<T> {
        resp.json().await.map_err(|e| WorkspaceError::Decode {
            endpoint: endpoint.into(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl WorkspaceClient for HttpWorkspaceClient {
    async fn list_endpoints(&self) -> WorkspaceResult<Vec<Endpoint>> {
        let endpoint = "GET /sql/endpoints/";
        let url = self.url(&format!("{SQL_ENDPOINTS}/"));

        let resp = self.send(endpoint, self.http.get(&url)).await?;
        let listing: ListEndpointsResponse = Self::decode(endpoint, resp).await?;
        Ok(listing.endpoints)
    }

    async fn create_endpoint(&self, spec: &EndpointSpec) -> WorkspaceResult<EndpointId> {
        let endpoint = "POST /sql/endpoints/";
        let url = self.url(&format!("{SQL_ENDPOINTS}/"));

        let resp = self.send(endpoint, self.http.post(&url).json(spec)).await?;
        let created: CreateEndpointResponse = Self::decode(endpoint, resp).await?;
        Ok(created.id)
    }

    async fn stop_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()> {
        let endpoint = format!("POST /sql/endpoints/{id}/stop");
        let url = self.url(&format!("{SQL_ENDPOINTS}/{id}/stop"));

        self.send(&endpoint, self.http.post(&url)).await?;
        Ok(())
    }

    async fn delete_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()> {
        let endpoint = format!("DELETE /sql/endpoints/{id}");
        let url = self.url(&format!("{SQL_ENDPOINTS}/{id}"));

        self.send(&endpoint, self.http.delete(&url)).await?;
        Ok(())
    }

    async fn set_permissions(
        &self,
        id: &EndpointId,
        acl: &AccessControlRequest,
    ) -> WorkspaceResult<()> {
        let endpoint = format!("PATCH /permissions/sql/endpoints/{id}");
        let url = self.url(&format!("{ENDPOINT_PERMISSIONS}/{id}"));

        self.send(&endpoint, self.http.patch(&url).json(acl)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use janitor_api::{EndpointState, EndpointTags, PermissionLevel, SpotInstancePolicy, CustomTag};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpWorkspaceClient {
        HttpWorkspaceClient::new(&format!("{}/", server.uri()), "dapi-test", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn list_endpoints_sends_token_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/endpoints/"))
            .and(header("authorization", "Bearer dapi-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "endpoints": [
                    {
                        "id": "e1",
                        "name": "scratch",
                        "state": "STOPPED",
                        "tags": { "custom_tags": [{ "key": "KeepAlive", "value": "True" }] }
                    },
                    { "id": "e2", "name": "new", "state": "SOMETHING_NEW" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoints = client(&server).list_endpoints().await.unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].state, EndpointState::Stopped);
        assert_eq!(endpoints[0].custom_tags()[0].key, "KeepAlive");
        assert_eq!(endpoints[1].state, EndpointState::Unknown);
    }

    #[tokio::test]
    async fn empty_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/endpoints/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert!(client(&server).list_endpoints().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_endpoint_posts_spec() {
        let server = MockServer::start().await;
        let spec = EndpointSpec {
            name: "Shared Endpoint".into(),
            cluster_size: "Medium".into(),
            min_num_clusters: 1,
            max_num_clusters: 5,
            auto_stop_mins: None,
            spot_instance_policy: SpotInstancePolicy::CostOptimized,
            enable_photon: false,
            tags: EndpointTags::new(vec![CustomTag::new("KeepAlive", "True")]),
        };

        Mock::given(method("POST"))
            .and(path("/api/2.0/sql/endpoints/"))
            .and(body_json(json!({
                "name": "Shared Endpoint",
                "cluster_size": "Medium",
                "min_num_clusters": 1,
                "max_num_clusters": 5,
                "spot_instance_policy": "COST_OPTIMIZED",
                "enable_photon": false,
                "tags": { "custom_tags": [{ "key": "KeepAlive", "value": "True" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).create_endpoint(&spec).await.unwrap();
        assert_eq!(id.as_str(), "new-1");
    }

    #[tokio::test]
    async fn stop_and_delete_hit_endpoint_paths() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/2.0/sql/endpoints/e1/stop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/2.0/sql/endpoints/e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let id = EndpointId::new("e1");
        client.stop_endpoint(&id).await.unwrap();
        client.delete_endpoint(&id).await.unwrap();
    }

    #[tokio::test]
    async fn set_permissions_patches_acl() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/2.0/permissions/sql/endpoints/e1"))
            .and(body_json(json!({
                "access_control_list": [
                    { "group_name": "users", "permission_level": "CAN_USE" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let acl = AccessControlRequest::single("users", PermissionLevel::CanUse);
        client(&server)
            .set_permissions(&EndpointId::new("e1"), &acl)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("{\"error_code\":\"PERMISSION_DENIED\"}"),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_endpoint(&EndpointId::new("e9"))
            .await
            .unwrap_err();
        match err {
            WorkspaceError::Api {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, "DELETE /sql/endpoints/e9");
                assert_eq!(status, 403);
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).list_endpoints().await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let client =
            HttpWorkspaceClient::new("http://127.0.0.1:1", "dapi-test", Duration::from_secs(2))
                .unwrap();
        let err = client.list_endpoints().await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Transport { .. }));
    }

    #[test]
    fn rejects_token_with_newline() {
        let result = HttpWorkspaceClient::new("https://x", "bad\ntoken", Duration::from_secs(1));
        assert!(matches!(result, Err(WorkspaceError::Config(_))));
    }
}
