//! Integration tests for azure-site-list
//!
//! These tests run the complete listing against mocked identity and management endpoints.

use azure_core::auth::Secret;
use azure_site_list::auth::{
    AuthenticationResult, Authenticator, DeviceCodeAuthenticator, TokenCache, TokenRequest,
};
use azure_site_list::azure::ManagementClient;
use azure_site_list::config::Config;
use azure_site_list::list_all_sites;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "user@contoso.com";

/// Hands out a fixed token per tenant, `None` entries fail.
struct StaticAuthenticator {
    tokens: HashMap<&'static str, Option<&'static str>>,
}

impl Authenticator for StaticAuthenticator {
    async fn acquire_token(
        &self,
        request: &TokenRequest,
        _cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>> {
        match self.tokens.get(request.tenant_id.as_str()) {
            Some(Some(token)) => Ok(AuthenticationResult {
                access_token: Secret::new(*token),
                expires_on: Utc::now() + Duration::hours(1),
                user_id: USER.to_string(),
                tenant_id: request.tenant_id.clone(),
            }),
            _ => Err(format!("AADSTS50020: no access to tenant {}", request.tenant_id).into()),
        }
    }
}

async fn mount_get(server: &MockServer, url_path: &str, token: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// tenants [A, B], subscriptions(T_A) = [S1], subscriptions(T_B) = [], sites(S1) = [app1]
async fn management_server() -> MockServer {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/tenants",
        "T1",
        json!({"value": [
            {"id": "/tenants/A", "tenantId": "A"},
            {"id": "/tenants/B", "tenantId": "B"}
        ]}),
    )
    .await;
    mount_get(
        &server,
        "/subscriptions",
        "T_A",
        json!({"value": [
            {"id": "/subscriptions/S1", "subscriptionId": "S1", "displayName": "Production", "state": "Enabled"}
        ]}),
    )
    .await;
    mount_get(&server, "/subscriptions", "T_B", json!({"value": []})).await;
    mount_get(
        &server,
        "/subscriptions/S1/providers/Microsoft.Web/sites",
        "T_A",
        json!([{"id": "/subscriptions/S1/resourceGroups/rg/providers/Microsoft.Web/sites/app1",
                "name": "app1", "location": "West US"}]),
    )
    .await;
    server
}

#[tokio::test]
async fn test_full_listing() {
    let server = management_server().await;
    let config = Config {
        management_url: server.uri(),
        ..Config::default()
    };
    let client = ManagementClient::from_config(&config);
    let authenticator = StaticAuthenticator {
        tokens: HashMap::from([("common", Some("T1")), ("A", Some("T_A")), ("B", Some("T_B"))]),
    };
    let mut cache = TokenCache::new();
    let mut out = Vec::new();

    let summary = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out)
        .await
        .expect("run failed");
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("User user@contoso.com has 2 tenants"));
    assert!(text.contains("Getting token for tenant A ... "));
    assert!(text.contains("Getting token for tenant B ... "));
    assert!(text.contains("Subscription: Production (S1)"));
    assert!(text.contains("List sites for subscription Production (S1) ... 1 sites found!"));
    assert!(text.contains("Site: app1 (West US)"));
    assert!(text.contains("List subscriptions for tenant B ... 0 subscriptions found!"));

    // tenants are listed in service order
    let a = text.find("List subscriptions for tenant A").unwrap();
    let b = text.find("List subscriptions for tenant B").unwrap();
    assert!(a < b);

    assert_eq!(summary.tenants, 2);
    assert_eq!(summary.subscriptions, 1);
    assert_eq!(summary.sites, 1);
    assert!(summary.failed_tenants.is_empty());
}

#[tokio::test]
async fn test_failed_tenant_is_skipped() {
    let server = management_server().await;
    let config = Config {
        management_url: server.uri(),
        ..Config::default()
    };
    let client = ManagementClient::from_config(&config);
    let authenticator = StaticAuthenticator {
        tokens: HashMap::from([("common", Some("T1")), ("A", None), ("B", Some("T_B"))]),
    };
    let mut cache = TokenCache::new();
    let mut out = Vec::new();

    let summary = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out)
        .await
        .expect("run failed");
    let text = String::from_utf8(out).unwrap();

    // the progress line ends with failed!, the reason follows on its own line
    let lines: Vec<&str> = text.lines().collect();
    let a = lines
        .iter()
        .position(|l| l.starts_with("Getting token for tenant A ... "))
        .unwrap();
    assert!(lines[a].contains("failed!"));
    assert!(!lines[a].contains("AADSTS"));
    assert_eq!(lines[a + 1], "AADSTS50020: no access to tenant A");
    assert!(text.contains("Skipping tenant A, no token"));
    assert!(!text.contains("List subscriptions for tenant A"));
    assert!(!text.contains("Site: app1"));
    assert!(text.contains("List subscriptions for tenant B ... 0 subscriptions found!"));
    assert_eq!(summary.failed_tenants, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_no_tenant_less_token_ends_run() {
    let server = MockServer::start().await;
    let config = Config {
        management_url: server.uri(),
        ..Config::default()
    };
    let client = ManagementClient::from_config(&config);
    let authenticator = StaticAuthenticator {
        tokens: HashMap::new(),
    };
    let mut cache = TokenCache::new();
    let mut out = Vec::new();

    let result = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out).await;
    assert!(result.is_err());
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Getting tenant-less token ... "));
    assert!(!text.contains("User "));
}

#[tokio::test]
async fn test_management_error_ends_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;
    let config = Config {
        management_url: server.uri(),
        ..Config::default()
    };
    let client = ManagementClient::from_config(&config);
    let authenticator = StaticAuthenticator {
        tokens: HashMap::from([("common", Some("T1"))]),
    };
    let mut cache = TokenCache::new();
    let mut out = Vec::new();

    let err = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out)
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("500"), "unexpected error: {err}");
}

fn jwt(claims: serde_json::Value) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// Device code sign-in for `common`, then silent refresh for each tenant.
#[tokio::test]
async fn test_device_code_end_to_end() {
    let management = management_server().await;
    let identity = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/common/oauth2/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_code": "ABCD", "device_code": "dc-1",
            "verification_url": "https://aka.ms/devicelogin",
            "expires_in": "900", "interval": "0",
            "message": "To sign in, enter the code ABCD"
        })))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/token"))
        .and(body_string_contains("grant_type=device_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer", "expires_in": "3599",
            "access_token": "T1", "refresh_token": "RT",
            "id_token": jwt(json!({"upn": USER}))
        })))
        .expect(1)
        .mount(&identity)
        .await;
    for (tenant, token) in [("A", "T_A"), ("B", "T_B")] {
        Mock::given(method("POST"))
            .and(path(format!("/{tenant}/oauth2/token")))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": 3599, "access_token": token, "refresh_token": "RT"
            })))
            .expect(1)
            .mount(&identity)
            .await;
    }

    let config = Config {
        management_url: management.uri(),
        login_url: identity.uri(),
        ..Config::default()
    };
    let client = ManagementClient::from_config(&config);
    let authenticator = DeviceCodeAuthenticator::new(&config.login_url);
    let mut cache = TokenCache::new();
    let mut out = Vec::new();

    let summary = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out)
        .await
        .expect("run failed");
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("Site: app1 (West US)"));
    assert_eq!(summary.user_id, USER);
    assert_eq!(summary.sites, 1);
    assert_eq!(cache.len(), 3);
}
