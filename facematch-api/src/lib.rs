//! # FaceMatch API
//!
//! Service surface for face similarity search.
//!
//! ## Embedded vs Remote
//!
//! ```ignore
//! // Embedded - indexes live in this process
//! let fm = FaceMatchClient::new(&Config::default());
//! fm.load_catalog("catalog.json")?;
//!
//! // Remote - connects to a server via HTTP
//! let fm = RemoteClient::connect("http://10.0.1.100:3000").await?;
//! ```

pub mod catalog;
pub mod client;
pub mod logging;
pub mod remote;
pub mod server;

pub use catalog::{load_catalog, CatalogReport, CatalogRow};
pub use client::FaceMatchClient;
pub use remote::RemoteClient;
pub use server::{
    create_router, serve, ApiError, AppState, IngestRequest, RemoveResponse, SearchRequest,
};
