//! Importing catalog items into the host application
//!
//! The host exposes a content-import endpoint (and a legacy one) that
//! downloads the item and answers with the file. The file is then handed
//! to the host's own ingestion routine.

mod client;

pub use client::{parse_content_disposition, FileIngestor, ImportClient, ImportedFile};

/// Content type the host can ingest
pub const CHARACTER_CONTENT_TYPE: &str = "character";
