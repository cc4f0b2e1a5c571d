use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::models::{Cluster, Snapshot, Vm};
use crate::wire::{ClusterList, CreateSnapshotRequest, Fault, SnapshotDto, SnapshotList, VmList};
use crate::Repository;
use osnap_config::ApiConfig;
use osnap_core::error::{OsnapError, Result};

/// oVirt engine REST client (API v4, JSON).
///
/// Authentication is HTTP basic against the engine's internal or LDAP
/// domains. Certificate checks can only be turned off wholesale with
/// `insecure_cert`.
pub struct OvirtClient {
    client: Client,
    base: Url,
    username: String,
    password: String,
    debug: bool,
}

impl OvirtClient {
    /// Build a client. Fails only if the TLS backend cannot be initialized.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("osnap/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.insecure_cert)
            .build()
            .map_err(|e| OsnapError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            debug: config.debug,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| OsnapError::Config(format!("API URL '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::ACCEPT, "application/json")
            .header("Version", "4")
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn execute(&self, method: Method, url: Url, request: RequestBuilder) -> Result<String> {
        if self.debug {
            debug!(%method, %url, "API request");
        }

        let response = request
            .send()
            .await
            .map_err(|e| OsnapError::Network(format!("{method} {url}: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OsnapError::Network(format!("{method} {url}: {e}")))?;

        if self.debug {
            debug!(%method, %url, status = status.as_u16(), body = %body, "API response");
        }

        if !status.is_success() {
            return Err(OsnapError::api(status.as_u16(), Fault::message_from(&body)));
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.request(Method::GET, url.clone());
        let body = self.execute(Method::GET, url, request).await?;
        parse_body(&body)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl Repository for OvirtClient {
    async fn list_vms(&self) -> Result<Vec<Vm>> {
        let list: VmList = self.get_json(self.endpoint(&["vms"])?).await?;
        Ok(list.vm.into_iter().map(Vm::from).collect())
    }

    async fn find_cluster_by_name(&self, name: &str) -> Result<Cluster> {
        let mut url = self.endpoint(&["clusters"])?;
        url.query_pairs_mut()
            .append_pair("search", &format!("name={name}"));
        let list: ClusterList = self.get_json(url).await?;

        // The search language treats `*` as a wildcard; only an exact name counts.
        list.cluster
            .into_iter()
            .find(|c| c.name == name)
            .map(Cluster::from)
            .ok_or_else(|| OsnapError::UnknownCluster(name.to_string()))
    }

    async fn create_snapshot(&self, vm_id: &str, description: &str) -> Result<Snapshot> {
        let url = self.endpoint(&["vms", vm_id, "snapshots"])?;
        let request = self
            .request(Method::POST, url.clone())
            .json(&CreateSnapshotRequest {
                description,
                persist_memorystate: false,
            });
        let body = self.execute(Method::POST, url, request).await?;
        let dto: SnapshotDto = parse_body(&body)?;
        Ok(dto.into_snapshot(vm_id))
    }

    async fn get_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<Snapshot> {
        let url = self.endpoint(&["vms", vm_id, "snapshots", snapshot_id])?;
        let dto: SnapshotDto = self.get_json(url).await?;
        Ok(dto.into_snapshot(vm_id))
    }

    async fn list_snapshots(&self, vm_id: &str) -> Result<Vec<Snapshot>> {
        let url = self.endpoint(&["vms", vm_id, "snapshots"])?;
        let list: SnapshotList = self.get_json(url).await?;
        Ok(list
            .snapshot
            .into_iter()
            .map(|dto| dto.into_snapshot(vm_id))
            .collect())
    }

    async fn delete_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<()> {
        let url = self.endpoint(&["vms", vm_id, "snapshots", snapshot_id])?;
        let request = self.request(Method::DELETE, url.clone());
        self.execute(Method::DELETE, url, request).await?;
        Ok(())
    }
}
