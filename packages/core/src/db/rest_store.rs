//! REST Backend
//!
//! `RestBackend` talks to a hosted Postgres through its PostgREST endpoint
//! (`/rest/v1`) and auth endpoint (`/auth/v1`). Reads use column filters
//! (`id=eq.x`, `node_id=in.(a,b)`), writes use `Prefer: return=representation`
//! so inserted rows come back in the response.
//!
//! Aggregates such as `completion_count` and `stability_score` are maintained
//! server-side by the `save_node_progress` procedure and table triggers.

use crate::config::BackendConfig;
use crate::db::{BackendError, ProgressBackend};
use crate::models::{
    Connector, Core, DayKey, Impulse, NewConnector, NewNode, Node, NodeUpdate, ProgressWrite,
    SaveProgressParams,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

const NODE_SELECT: &str = "*,node_connectors(connector_id)";

/// Node row joined with its connector links
#[derive(Debug, Deserialize)]
struct NodeRow {
    #[serde(flatten)]
    node: Node,
    #[serde(default)]
    node_connectors: Vec<ConnectorLink>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConnectorLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    node_id: Option<String>,
    connector_id: String,
}

impl From<NodeRow> for Node {
    fn from(row: NodeRow) -> Self {
        let mut node = row.node;
        node.connector_ids = row
            .node_connectors
            .into_iter()
            .map(|link| link.connector_id)
            .collect();
        node
    }
}

#[derive(Debug, Serialize)]
struct InsertNodeBody<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    node: &'a NewNode,
}

#[derive(Debug, Serialize)]
struct InsertConnectorBody<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    connector: &'a NewConnector,
}

#[derive(Debug, Serialize, Deserialize)]
struct FocusRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    focus_date: Option<DayKey>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// `column=eq.value` filter pair
fn eq(column: &str, value: impl ToString) -> (String, String) {
    (column.to_string(), format!("eq.{}", value.to_string()))
}

/// `column=in.("a","b")` filter pair
fn one_of(column: &str, values: &[String]) -> (String, String) {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect();
    (column.to_string(), format!("in.({})", quoted.join(",")))
}

/// Backend speaking PostgREST over HTTP
pub struct RestBackend {
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
    user_id: RwLock<Option<String>>,
    http_client: reqwest::Client,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::unavailable("backend url is not configured"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("nodes-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(config.access_token.clone().filter(|t| !t.is_empty())),
            user_id: RwLock::new(None),
            http_client,
        })
    }

    /// Install a refreshed session token (or `None` on sign-out)
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token.filter(|t| !t.is_empty());
        }
        if let Ok(mut guard) = self.user_id.write() {
            *guard = None;
        }
    }

    fn token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.token().unwrap_or_else(|| self.anon_key.clone());
        self.http_client
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<reqwest::Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::http(endpoint, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::status(endpoint, status.as_u16(), body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, BackendError> {
        self.send(builder, endpoint)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::decode(endpoint, e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder, endpoint: &str) -> Result<(), BackendError> {
        self.send(builder, endpoint).await.map(|_| ())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<T>, BackendError> {
        let path = format!("rest/v1/{}", table);
        debug!(table, ?filters, "Selecting rows");
        let builder = self
            .request(Method::GET, &path)
            .query(&[("select", select)])
            .query(filters);
        self.send_json(builder, &path).await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, BackendError> {
        let path = format!("rest/v1/{}", table);
        let builder = self
            .request(Method::POST, &path)
            .header("Prefer", "return=representation")
            .json(body);
        self.send_json(builder, &path).await
    }

    async fn delete_where(&self, table: &str, filters: &[(String, String)]) -> Result<u32, BackendError> {
        let path = format!("rest/v1/{}", table);
        let builder = self
            .request(Method::DELETE, &path)
            .header("Prefer", "return=representation")
            .query(filters);
        let deleted: Vec<serde_json::Value> = self.send_json(builder, &path).await?;
        Ok(deleted.len() as u32)
    }
}

#[async_trait]
impl ProgressBackend for RestBackend {
    async fn current_user_id(&self) -> Result<String, BackendError> {
        if self.token().is_none() {
            return Err(BackendError::NotAuthenticated);
        }
        if let Some(id) = self.user_id.read().ok().and_then(|u| u.clone()) {
            return Ok(id);
        }

        let path = "auth/v1/user";
        let user: AuthUser = self
            .send_json(self.request(Method::GET, path), path)
            .await?;
        if let Ok(mut guard) = self.user_id.write() {
            *guard = Some(user.id.clone());
        }
        Ok(user.id)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, BackendError> {
        let user_id = self.current_user_id().await?;
        let filters = [
            eq("user_id", &user_id),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        let rows: Vec<NodeRow> = self.select("nodes", NODE_SELECT, &filters).await?;
        Ok(rows.into_iter().map(Node::from).collect())
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, BackendError> {
        self.current_user_id().await?;
        let rows: Vec<NodeRow> = self.select("nodes", NODE_SELECT, &[eq("id", id)]).await?;
        Ok(rows.into_iter().next().map(Node::from))
    }

    async fn insert_node(&self, node: &NewNode) -> Result<Node, BackendError> {
        let user_id = self.current_user_id().await?;
        let body = InsertNodeBody {
            user_id: &user_id,
            node,
        };
        let rows: Vec<Node> = self.insert("nodes", &body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::decode("rest/v1/nodes", "insert returned no row"))
    }

    async fn update_node(&self, id: &str, update: &NodeUpdate) -> Result<Node, BackendError> {
        self.current_user_id().await?;
        if !update.has_row_changes() {
            return self
                .get_node(id)
                .await?
                .ok_or_else(|| BackendError::not_found("node", id));
        }

        let path = "rest/v1/nodes";
        let builder = self
            .request(Method::PATCH, path)
            .header("Prefer", "return=representation")
            .query(&[eq("id", id)])
            .json(update);
        let rows: Vec<Node> = self.send_json(builder, path).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::not_found("node", id))
    }

    async fn delete_node(&self, id: &str) -> Result<(), BackendError> {
        self.current_user_id().await?;
        self.delete_where("nodes", &[eq("id", id)]).await?;
        Ok(())
    }

    async fn replace_node_connectors(
        &self,
        node_id: &str,
        connector_ids: &[String],
    ) -> Result<(), BackendError> {
        self.current_user_id().await?;
        self.delete_where("node_connectors", &[eq("node_id", node_id)])
            .await?;
        if connector_ids.is_empty() {
            return Ok(());
        }

        let links: Vec<ConnectorLink> = connector_ids
            .iter()
            .map(|c| ConnectorLink {
                node_id: Some(node_id.to_string()),
                connector_id: c.clone(),
            })
            .collect();
        let path = "rest/v1/node_connectors";
        self.send_empty(self.request(Method::POST, path).json(&links), path)
            .await
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, BackendError> {
        let user_id = self.current_user_id().await?;
        let filters = [
            eq("user_id", &user_id),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        self.select("connectors", "*", &filters).await
    }

    async fn insert_connector(&self, connector: &NewConnector) -> Result<Connector, BackendError> {
        let user_id = self.current_user_id().await?;
        let body = InsertConnectorBody {
            user_id: &user_id,
            connector,
        };
        let rows: Vec<Connector> = self.insert("connectors", &body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::decode("rest/v1/connectors", "insert returned no row"))
    }

    async fn list_cores(&self) -> Result<Vec<Core>, BackendError> {
        let user_id = self.current_user_id().await?;
        self.select("cores", "*", &[eq("user_id", &user_id)]).await
    }

    async fn save_node_progress(&self, write: &ProgressWrite) -> Result<(), BackendError> {
        self.current_user_id().await?;
        let path = "rest/v1/rpc/save_node_progress";
        let params = SaveProgressParams::from(write);
        debug!(node_id = %write.node_id, date = %write.date, mode = ?write.mode, "Saving node progress");
        self.send_empty(self.request(Method::POST, path).json(&params), path)
            .await
    }

    async fn clear_day(&self, node_id: &str, date: DayKey) -> Result<u32, BackendError> {
        self.current_user_id().await?;
        self.delete_where(
            "impulses",
            &[eq("node_id", node_id), eq("completed_at", date)],
        )
        .await
    }

    async fn impulses_for(
        &self,
        node_ids: &[String],
        date: DayKey,
    ) -> Result<Vec<Impulse>, BackendError> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.current_user_id().await?;
        self.select(
            "impulses",
            "*",
            &[one_of("node_id", node_ids), eq("completed_at", date)],
        )
        .await
    }

    async fn focus_node_ids(&self, date: DayKey) -> Result<Vec<String>, BackendError> {
        let user_id = self.current_user_id().await?;
        let rows: Vec<FocusRow> = self
            .select(
                "daily_focus",
                "node_id",
                &[eq("user_id", &user_id), eq("focus_date", date)],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.node_id).collect())
    }

    async fn replace_focus(&self, date: DayKey, node_ids: &[String]) -> Result<(), BackendError> {
        let user_id = self.current_user_id().await?;
        self.delete_where(
            "daily_focus",
            &[eq("user_id", &user_id), eq("focus_date", date)],
        )
        .await?;
        if node_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<FocusRow> = node_ids
            .iter()
            .map(|id| FocusRow {
                user_id: Some(user_id.clone()),
                node_id: id.clone(),
                focus_date: Some(date),
            })
            .collect();
        let path = "rest/v1/daily_focus";
        self.send_empty(self.request(Method::POST, path).json(&rows), path)
            .await
    }
}
