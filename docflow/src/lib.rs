//! # docflow
//!
//! Schema-validated document extraction via LLM providers with
//! deterministic fallback and a replayable audit trail.
//!
//! Feed it document bytes, a tenant, and a correlation id; it
//! preprocesses the document, renders a prompt from the versioned
//! template registry, calls providers along the tenant's fallback chain,
//! validates every output against the doc-type schema, and records every
//! attempt in an append-only audit log.
//!
//! ## Example
//!
//! ```no_run
//! # use docflow::prelude::*;
//! # use std::sync::Arc;
//! # async fn example(store: Arc<dyn ConfigStore>, creds: Arc<dyn CredentialStore>)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::builder()
//!     .config_store(store)
//!     .credentials(creds)
//!     .with_default_adapters()
//!     .build()?;
//!
//! let result = extractor
//!     .extract(
//!         ExtractionRequest::new(std::fs::read("report.txt")?, "acme", "req-42")
//!             .with_doc_type("LAB_REPORT"),
//!     )
//!     .await?;
//! println!("{}", result.data);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Public error type.
pub mod errors;

/// The high-level extractor and its builder.
pub mod extractor;

/// Commonly used types and traits.
pub mod prelude;

pub use errors::Error;
pub use extractor::{Extractor, ExtractorBuilder};

pub use docflow_engine::types::{ExtractionRequest, ExtractionResult, ExtractionStatus};
pub use docflow_gateway::adapters;
