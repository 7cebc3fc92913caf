//! HTTP adapter for the enrollment and client-MFA proxy endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dg_core::ports::{ClientMfaApiPort, EnrollmentApiPort, ProxyAuth};
use dg_core::proxy::{
    ActivateUserRequest, ClientMfaFinishRequest, ClientMfaFinishResponse, ClientMfaStartRequest,
    ClientMfaStartResponse, CreateDeviceRequest, DeviceResponse, EnrollmentStartReply,
    EnrollmentStartRequest, NetworkInfoRequest, ProxyApiError, RegisterMfaFinishRequest,
    RegisterMfaFinishResponse, RegisterMfaStartRequest, RegisterMfaStartResponse,
};
use dg_core::ProxyUrl;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

mod paths {
    pub const ENROLLMENT_START: &str = "enrollment/start";
    pub const CREATE_DEVICE: &str = "enrollment/create_device";
    pub const ACTIVATE_USER: &str = "enrollment/activate_user";
    pub const NETWORK_INFO: &str = "enrollment/network_info";
    pub const REGISTER_MFA_START: &str = "enrollment/register-mfa/code/start";
    pub const REGISTER_MFA_FINISH: &str = "enrollment/register-mfa/code/finish";
    pub const CLIENT_MFA_START: &str = "client-mfa/start";
    pub const CLIENT_MFA_FINISH: &str = "client-mfa/finish";
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// `reqwest` client talking JSON to one or more proxies.
#[derive(Clone, Debug)]
pub struct ReqwestProxyClient {
    http: reqwest::Client,
}

impl ReqwestProxyClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn post<B: Serialize>(
        &self,
        url: String,
        cookie: Option<&str>,
        body: &B,
    ) -> Result<Response, ProxyApiError> {
        debug!(url = %url, "proxy request");
        let mut request = self.http.post(&url).json(body);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProxyApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        warn!(url = %url, status = status.as_u16(), message = ?message, "proxy request failed");
        Err(ProxyApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        url: String,
        cookie: Option<&str>,
        body: &B,
    ) -> Result<R, ProxyApiError> {
        let response = self.post(url, cookie, body).await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ProxyApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ProxyApiError::Malformed(e.to_string()))
}

/// Message from an `{"error": "..."}` body, if the body has that shape.
async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .ok()
}

#[async_trait]
impl EnrollmentApiPort for ReqwestProxyClient {
    async fn start(
        &self,
        proxy_url: &ProxyUrl,
        request: EnrollmentStartRequest,
    ) -> Result<EnrollmentStartReply, ProxyApiError> {
        let response = self
            .post(proxy_url.api_url(paths::ENROLLMENT_START), None, &request)
            .await?;
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = decode(response).await?;
        Ok(EnrollmentStartReply { body, set_cookies })
    }

    async fn create_device(
        &self,
        auth: &ProxyAuth,
        request: CreateDeviceRequest,
    ) -> Result<DeviceResponse, ProxyApiError> {
        self.post_json(
            auth.proxy_url.api_url(paths::CREATE_DEVICE),
            Some(&auth.cookie),
            &request,
        )
        .await
    }

    async fn activate_user(
        &self,
        auth: &ProxyAuth,
        request: ActivateUserRequest,
    ) -> Result<(), ProxyApiError> {
        self.post(
            auth.proxy_url.api_url(paths::ACTIVATE_USER),
            Some(&auth.cookie),
            &request,
        )
        .await?;
        Ok(())
    }

    async fn network_info(
        &self,
        auth: &ProxyAuth,
        request: NetworkInfoRequest,
    ) -> Result<DeviceResponse, ProxyApiError> {
        self.post_json(
            auth.proxy_url.api_url(paths::NETWORK_INFO),
            Some(&auth.cookie),
            &request,
        )
        .await
    }

    async fn register_mfa_start(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaStartRequest,
    ) -> Result<RegisterMfaStartResponse, ProxyApiError> {
        let response = self
            .post(
                auth.proxy_url.api_url(paths::REGISTER_MFA_START),
                Some(&auth.cookie),
                &request,
            )
            .await?;
        // Email registration answers with an empty body.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProxyApiError::Transport(e.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RegisterMfaStartResponse::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| ProxyApiError::Malformed(e.to_string()))
    }

    async fn register_mfa_finish(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaFinishRequest,
    ) -> Result<RegisterMfaFinishResponse, ProxyApiError> {
        self.post_json(
            auth.proxy_url.api_url(paths::REGISTER_MFA_FINISH),
            Some(&auth.cookie),
            &request,
        )
        .await
    }
}

#[async_trait]
impl ClientMfaApiPort for ReqwestProxyClient {
    async fn start(
        &self,
        proxy_url: &ProxyUrl,
        request: ClientMfaStartRequest,
    ) -> Result<ClientMfaStartResponse, ProxyApiError> {
        self.post_json(proxy_url.api_url(paths::CLIENT_MFA_START), None, &request)
            .await
    }

    async fn finish(
        &self,
        proxy_url: &ProxyUrl,
        request: ClientMfaFinishRequest,
    ) -> Result<ClientMfaFinishResponse, ProxyApiError> {
        self.post_json(proxy_url.api_url(paths::CLIENT_MFA_FINISH), None, &request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::mfa::MfaMethod;
    use dg_core::LocationId;
    use mockito::{Matcher, Server};

    fn client() -> ReqwestProxyClient {
        ReqwestProxyClient::new(Duration::from_secs(5)).unwrap()
    }

    fn start_body() -> serde_json::Value {
        serde_json::json!({
            "admin": { "name": "Admin", "email": "admin@example.com" },
            "user": {
                "first_name": "Jane",
                "last_name": "Doe",
                "login": "jdoe",
                "email": "jane@example.com",
                "enrolled": false
            },
            "deadline_timestamp": 1_900_000_000,
            "final_page_content": "done",
            "vpn_setup_optional": false,
            "instance": {
                "id": "2f1c6f0e-3f36-4d6e-9a53-4a3b5d1f7c11",
                "name": "Example",
                "url": "https://core.example.com",
                "proxy_url": "https://vpn.example.com"
            },
            "settings": { "mfa_required": true, "mfa_skippable": false }
        })
    }

    #[tokio::test]
    async fn start_returns_body_and_every_set_cookie() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/enrollment/start")
            .match_body(Matcher::Json(serde_json::json!({ "token": "abc123" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("set-cookie", "AWSALB=x; Path=/")
            .with_header("set-cookie", "defguard_proxy=s3cr3t; HttpOnly; Path=/")
            .with_body(start_body().to_string())
            .create_async()
            .await;

        let url = ProxyUrl::parse(&server.url()).unwrap();
        let reply = EnrollmentApiPort::start(
            &client(),
            &url,
            EnrollmentStartRequest {
                token: "abc123".into(),
            },
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.body.user.login, "jdoe");
        assert_eq!(reply.set_cookies.len(), 2);
        assert!(reply
            .set_cookies
            .iter()
            .any(|c| c.starts_with("defguard_proxy=s3cr3t")));
    }

    #[tokio::test]
    async fn enrollment_calls_carry_the_session_cookie() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/enrollment/activate_user")
            .match_header("cookie", "defguard_proxy=s3cr3t")
            .match_body(Matcher::PartialJson(serde_json::json!({ "password": "Str0ng!pass" })))
            .with_status(200)
            .create_async()
            .await;

        let auth = ProxyAuth {
            proxy_url: ProxyUrl::parse(&server.url()).unwrap(),
            cookie: "defguard_proxy=s3cr3t".into(),
        };
        client()
            .activate_user(
                &auth,
                ActivateUserRequest {
                    phone_number: None,
                    password: "Str0ng!pass".into(),
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_body_message_is_extracted() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/enrollment/start")
            .with_status(401)
            .with_body(r#"{"error":"token expired"}"#)
            .create_async()
            .await;

        let url = ProxyUrl::parse(&server.url()).unwrap();
        let err = EnrollmentApiPort::start(
            &client(),
            &url,
            EnrollmentStartRequest {
                token: "abc123".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            ProxyApiError::Status {
                status: 401,
                message: Some("token expired".into()),
            }
        );
    }

    #[tokio::test]
    async fn openid_pending_is_a_bare_428() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/client-mfa/finish")
            .match_body(Matcher::Json(serde_json::json!({ "token": "tok" })))
            .with_status(428)
            .create_async()
            .await;

        let url = ProxyUrl::parse(&server.url()).unwrap();
        let err = client()
            .finish(
                &url,
                ClientMfaFinishRequest {
                    token: "tok".into(),
                    code: None,
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_precondition_required());
        assert_eq!(err.message(), None);
    }

    #[tokio::test]
    async fn client_mfa_start_sends_numeric_method() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/client-mfa/start")
            .match_body(Matcher::Json(serde_json::json!({
                "method": 2,
                "pubkey": "pk",
                "location_id": 7
            })))
            .with_status(200)
            .with_body(r#"{"token":"tok"}"#)
            .create_async()
            .await;

        let url = ProxyUrl::parse(&server.url()).unwrap();
        let response = ClientMfaApiPort::start(
            &client(),
            &url,
            ClientMfaStartRequest {
                method: MfaMethod::OpenId,
                pubkey: "pk".into(),
                location_id: LocationId(7),
            },
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(response.token, "tok");
        assert_eq!(response.challenge, None);
    }

    #[tokio::test]
    async fn unexpected_success_body_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/enrollment/network_info")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let auth = ProxyAuth {
            proxy_url: ProxyUrl::parse(&server.url()).unwrap(),
            cookie: "defguard_proxy=s3cr3t".into(),
        };
        let err = client()
            .network_info(
                &auth,
                NetworkInfoRequest {
                    pubkey: "pk".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn empty_email_registration_reply_has_no_secret() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/enrollment/register-mfa/code/start")
            .with_status(200)
            .create_async()
            .await;

        let auth = ProxyAuth {
            proxy_url: ProxyUrl::parse(&server.url()).unwrap(),
            cookie: "defguard_proxy=s3cr3t".into(),
        };
        let response = client()
            .register_mfa_start(
                &auth,
                RegisterMfaStartRequest {
                    method: MfaMethod::Email,
                },
            )
            .await
            .unwrap();

        assert_eq!(response.totp_secret, None);
    }

    #[tokio::test]
    async fn unreachable_proxy_is_a_transport_error() {
        let url = ProxyUrl::parse("http://127.0.0.1:9").unwrap();
        let err = ClientMfaApiPort::start(
            &client(),
            &url,
            ClientMfaStartRequest {
                method: MfaMethod::Totp,
                pubkey: "pk".into(),
                location_id: LocationId(1),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProxyApiError::Transport(_)));
    }
}
