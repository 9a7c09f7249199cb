//! Dropbox Dash search and metadata clients
//!
//! Both clients borrow a valid access token from a shared
//! [`dash_auth::AuthSession`] per call and normalize the loosely typed
//! upstream records into [`SearchResult`] and [`DetailRecord`].

pub mod detail;
pub mod error;
mod http;
pub mod models;
pub mod search;

pub use detail::DetailClient;
pub use error::{Error, Result};
pub use http::RetryPolicy;
pub use models::{
    ContentResult, DetailContent, DetailRecord, FileType, ImageMetadata, MediaMetadata,
    PersonResult, ResultBody, SearchResult, UnknownFileType, VideoMetadata,
};
pub use search::{SearchClient, SearchQuery};
