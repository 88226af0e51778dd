//! GeoNode proxy
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 GEONODE PROXY                │
//!   Browser              │  ┌────────────┐   ┌────────────────────────┐ │
//!   ─────────────────────┼─▶│ http server│──▶│ /proxy/?url=  generic  │─┼──▶ any http host
//!                        │  │ request id │   │ /geoserver/*  geoserver│─┼──▶ GeoServer (basic auth)
//!                        │  │ trace      │   │ /picasa       feed     │─┼──▶ photo feed
//!                        │  │ timeout    │   │ /maps/baselayers       │ │
//!                        │  └────────────┘   └────────────────────────┘ │
//!                        │   config (watch + swap) · resilience · obs   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use geonode_proxy::basemaps::google_base_layers;
use geonode_proxy::catalog::{attributes_from_json, create_layer, CatalogClient, GeometryType, NewLayer};
use geonode_proxy::lifecycle::startup::load_or_default;
use geonode_proxy::lifecycle::serve;
use geonode_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "geonode-proxy", version)]
#[command(about = "Forwarding proxy and GeoServer tooling for GeoNode", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy (default)
    Serve,
    /// Create an empty PostGIS layer in GeoServer
    CreateLayer {
        #[arg(long)]
        name: String,
        /// Defaults to the name
        #[arg(long)]
        title: Option<String>,
        /// Point, LineString or Polygon
        #[arg(long, default_value = "Point")]
        geometry: String,
        /// JSON object of field name to Float, Date, String or Integer
        #[arg(long)]
        attributes: Option<String>,
    },
    /// Print the configured base layers as JSON
    Basemaps,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config_path).await?,
        Commands::CreateLayer {
            name,
            title,
            geometry,
            attributes,
        } => {
            let config = load_or_default(config_path)?;
            logging::init(&config.observability);

            let layer = NewLayer {
                title: title.unwrap_or_else(|| name.clone()),
                name,
                geometry: geometry.parse::<GeometryType>()?,
                attributes: match attributes {
                    Some(json) => attributes_from_json(&json)?,
                    None => Vec::new(),
                },
            };
            let client = CatalogClient::new(&config.geoserver, &config.timeouts)?;
            let created = create_layer(&client, config.geoserver.datastore.as_deref(), layer).await?;
            println!("{}", created.alternate());
        }
        Commands::Basemaps => {
            let config = load_or_default(config_path)?;
            let layers = google_base_layers(&config.basemaps);
            println!("{}", serde_json::to_string_pretty(&layers)?);
        }
    }

    Ok(())
}
