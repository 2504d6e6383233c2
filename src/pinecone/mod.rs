//! Pinecone vector store integration.

pub mod client;
pub mod filters;
pub mod pager;
pub mod types;

pub use client::PineconeService;
pub use filters::build_metadata_filter;
pub use types::{PineconeError, VectorMatch, VectorRecord};
