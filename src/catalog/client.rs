//! Minimal GeoServer REST catalog client.

use std::time::Duration;

use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::catalog::featuretype::FeatureType;
use crate::catalog::CatalogError;
use crate::config::{GeoServerConfig, TimeoutConfig};

#[derive(Debug, Deserialize)]
struct WorkspaceEnvelope {
    workspace: Named,
}

#[derive(Debug, Deserialize)]
struct DataStoreEnvelope {
    #[serde(rename = "dataStore")]
    data_store: DataStore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataStore {
    pub name: String,
    #[serde(rename = "type", default)]
    pub store_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FeatureTypesEnvelope {
    #[serde(rename = "featureTypes")]
    feature_types: FeatureTypeList,
}

/// GeoServer answers `""` instead of an object when a store is empty.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureTypeList {
    Listed {
        #[serde(rename = "featureType", default)]
        feature_type: Vec<Named>,
    },
    Empty(String),
}

/// Authenticated client for `{rest_url}/...`.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    rest_url: String,
    username: String,
    password: String,
}

impl CatalogClient {
    pub fn new(config: &GeoServerConfig, timeouts: &TimeoutConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            rest_url: config.rest_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.rest_url, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Unexpected { url, status, body });
        }
        Ok(response.json().await?)
    }

    /// Name of the catalog's default workspace.
    pub async fn default_workspace(&self) -> Result<String, CatalogError> {
        let envelope: WorkspaceEnvelope = self.get_json("workspaces/default.json").await?;
        Ok(envelope.workspace.name)
    }

    pub async fn datastore(&self, workspace: &str, store: &str) -> Result<DataStore, CatalogError> {
        let envelope: DataStoreEnvelope = self
            .get_json(&format!("workspaces/{}/datastores/{}.json", workspace, store))
            .await?;
        Ok(envelope.data_store)
    }

    /// Names of the feature types already configured in a store.
    pub async fn feature_type_names(&self, workspace: &str, store: &str) -> Result<Vec<String>, CatalogError> {
        let envelope: FeatureTypesEnvelope = self
            .get_json(&format!(
                "workspaces/{}/datastores/{}/featuretypes.json",
                workspace, store
            ))
            .await?;
        Ok(match envelope.feature_types {
            FeatureTypeList::Listed { feature_type } => {
                feature_type.into_iter().map(|n| n.name).collect()
            }
            FeatureTypeList::Empty(_) => Vec::new(),
        })
    }

    /// POST a new feature type; GeoServer must answer 201.
    pub async fn create_feature_type(
        &self,
        workspace: &str,
        store: &str,
        feature_type: &FeatureType,
    ) -> Result<(), CatalogError> {
        let url = self.url(&format!("workspaces/{}/datastores/{}/featuretypes", workspace, store));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::CONTENT_TYPE, "application/xml")
            .body(feature_type.to_xml())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(url = %url, status = %status, body = %body, "Feature type creation rejected");
            return Err(CatalogError::Unexpected { url, status, body });
        }
        Ok(())
    }
}
