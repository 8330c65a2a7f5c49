use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use tower_http::cors::CorsLayer;

use syncroom::server::{AppState, create_router};
use syncroom::store::{SqliteStore, Store};

pub const ADMIN_KEY: &str = "sk_admin_integration-test-secret";

pub struct TestServer {
    pub base_url: String,
    pub admin_key: String,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("test.db")).expect("open store");
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(
            Arc::new(store),
            Some(ADMIN_KEY.to_string()),
        ));
        let app = create_router(state, CorsLayer::new());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            admin_key: ADMIN_KEY.to_string(),
            _temp_dir: temp_dir,
        }
    }

    /// Creates a tenant plus a read+write key via the admin API.
    pub async fn create_tenant_and_key(&self, client: &reqwest::Client) -> (String, String) {
        let resp: Value = client
            .post(format!("{}/admin/tenants", self.base_url))
            .header("x-api-key", &self.admin_key)
            .json(&serde_json::json!({"name": "test-tenant"}))
            .send()
            .await
            .expect("create tenant")
            .json()
            .await
            .expect("parse tenant response");
        let tenant_id = resp["id"].as_str().expect("tenant id").to_string();

        let key = self
            .create_key(client, &tenant_id, &["read", "write"])
            .await;

        (tenant_id, key)
    }

    pub async fn create_key(
        &self,
        client: &reqwest::Client,
        tenant_id: &str,
        permissions: &[&str],
    ) -> String {
        let resp: Value = client
            .post(format!("{}/admin/tenants/{}/keys", self.base_url, tenant_id))
            .header("x-api-key", &self.admin_key)
            .json(&serde_json::json!({"name": "test key", "permissions": permissions}))
            .send()
            .await
            .expect("create key")
            .json()
            .await
            .expect("parse key response");
        resp["key"].as_str().expect("key plaintext").to_string()
    }
}
