//! Layer creation against GeoServer's REST catalog.
//!
//! # Data Flow
//! ```text
//! NewLayer (name, title, geometry, attributes)
//!     → slug.rs (normalize name)
//!     → client.rs: default workspace → datastore (must be PostGIS)
//!     → client.rs: existing feature types (name must be free)
//!     → featuretype.rs (typed XML document)
//!     → client.rs: POST featuretypes (expects 201)
//! ```
//!
//! Registering the new layer in GeoNode's own database is not done here.

pub mod client;
pub mod featuretype;
pub mod slug;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::CatalogClient;
pub use featuretype::{attributes_from_json, AttributeType, FeatureType, FeatureTypeError, GeometryType};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("geoserver.datastore must name a PostGIS datastore to create layers")]
    NoDatastore,

    #[error("layer name '{0}' is empty after normalization")]
    EmptyName(String),

    #[error("datastore {store} is of type {store_type}, layers can only be created in PostGIS")]
    NotPostgis { store: String, store_type: String },

    #[error("There is already a layer named {name} in {workspace}")]
    AlreadyExists { name: String, workspace: String },

    #[error(transparent)]
    FeatureType(#[from] FeatureTypeError),

    #[error("{url} answered {status}: {body}")]
    Unexpected {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What to create.
#[derive(Debug, Clone)]
pub struct NewLayer {
    pub name: String,
    pub title: String,
    pub geometry: GeometryType,
    pub attributes: Vec<(String, AttributeType)>,
}

/// Where the layer ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLayer {
    pub workspace: String,
    pub store: String,
    pub name: String,
}

impl CreatedLayer {
    /// `workspace:name`, the layer's qualified name.
    pub fn alternate(&self) -> String {
        format!("{}:{}", self.workspace, self.name)
    }
}

/// Create an empty PostGIS layer in GeoServer.
pub async fn create_layer(
    client: &CatalogClient,
    datastore: Option<&str>,
    layer: NewLayer,
) -> Result<CreatedLayer, CatalogError> {
    let store_name = datastore.filter(|s| !s.is_empty()).ok_or(CatalogError::NoDatastore)?;
    let name = slug::layer_name(&layer.name);
    if name.is_empty() {
        return Err(CatalogError::EmptyName(layer.name));
    }

    let workspace = client.default_workspace().await?;
    let store = client.datastore(&workspace, store_name).await?;
    let store_type = store.store_type.unwrap_or_default();
    if store_type != "PostGIS" {
        return Err(CatalogError::NotPostgis {
            store: store.name,
            store_type,
        });
    }

    let existing = client.feature_type_names(&workspace, &store.name).await?;
    if existing.iter().any(|n| *n == name) {
        return Err(CatalogError::AlreadyExists { name, workspace });
    }

    let feature_type = layer
        .attributes
        .into_iter()
        .fold(FeatureType::new(name.as_str(), layer.title, layer.geometry), |ft, (field, kind)| {
            ft.with_attribute(field, kind)
        });

    tracing::info!(workspace = %workspace, store = %store.name, name = %name, "Creating layer in GeoServer");
    client.create_feature_type(&workspace, &store.name, &feature_type).await?;

    Ok(CreatedLayer {
        workspace,
        store: store.name,
        name,
    })
}
