//! # atende-session
//!
//! Persists the WhatsApp session credentials as a single row keyed by a
//! fixed id.
//! - `store`: fail-soft load/save/clear on top of any backend
//! - `supabase`: PostgREST backend (remote)
//! - `sqlite`: local SQLite backend

pub mod sqlite;
pub mod store;
pub mod supabase;

pub use sqlite::SqliteBackend;
pub use store::SessionStore;
pub use supabase::SupabaseBackend;

use atende_core::{
    config::{SessionBackendKind, SessionConfig},
    error::AtendeError,
    traits::SessionBackend,
};
use std::sync::Arc;

/// Build the backend selected in config.
pub async fn open_backend(config: &SessionConfig) -> Result<Arc<dyn SessionBackend>, AtendeError> {
    match config.backend {
        SessionBackendKind::Supabase => Ok(Arc::new(SupabaseBackend::new(
            &config.supabase_url,
            &config.supabase_key,
            &config.table,
        )?)),
        SessionBackendKind::Sqlite => Ok(Arc::new(
            SqliteBackend::open(&config.sqlite_path, &config.table).await?,
        )),
    }
}
