//! External app context: store description, features, rating, reviews.
//!
//! The report never depends on a lookup succeeding. [`resolve_context`]
//! always returns a [`ReportContext`]: whatever the provider produced, or
//! [`ReportContext::fallback`] when it failed or took too long. Report
//! synthesis renders the fallback like any other context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("no context source configured")]
    Unavailable,
    #[error("no context entry for app '{0}'")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub description: String,
    pub category: String,
    /// Free text, e.g. `"4.5"`; the fallback is not a number.
    pub rating: String,
    pub features: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl ReportContext {
    /// Placeholder used whenever the lookup fails. Every field is present.
    pub fn fallback() -> Self {
        Self {
            description: "App description not available".to_string(),
            category: "App category not available".to_string(),
            rating: "Rating not available".to_string(),
            features: vec!["Features not available".to_string()],
            reviews: Vec::new(),
        }
    }
}

/// Source of [`ReportContext`] records, keyed by app name.
pub trait ContextProvider {
    fn lookup(
        &self,
        app_name: &str,
    ) -> impl Future<Output = Result<ReportContext, ContextError>> + Send;
}

/// Provider that never has anything; every report gets the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContextProvider;

impl ContextProvider for NoContextProvider {
    async fn lookup(&self, _app_name: &str) -> Result<ReportContext, ContextError> {
        Err(ContextError::Unavailable)
    }
}

/// Reads a JSON catalog of contexts keyed by app name:
///
/// ```json
/// { "Acme": { "description": "…", "category": "Social Networking",
///             "rating": "4.5", "features": ["…"], "reviews": [] } }
/// ```
///
/// App names match case-insensitively.
#[derive(Debug, Clone)]
pub struct JsonContextProvider {
    path: PathBuf,
}

impl JsonContextProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContextProvider for JsonContextProvider {
    async fn lookup(&self, app_name: &str) -> Result<ReportContext, ContextError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let catalog: BTreeMap<String, ReportContext> = serde_json::from_str(&content)?;
        catalog
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(app_name.trim()))
            .map(|(_, context)| context)
            .ok_or_else(|| ContextError::NotFound(app_name.to_string()))
    }
}

/// Look up context for `app_name`, degrading to the fallback record on any
/// error or after `timeout`. Never fails.
pub async fn resolve_context<P: ContextProvider>(
    provider: &P,
    app_name: &str,
    timeout: Duration,
) -> ReportContext {
    match tokio::time::timeout(timeout, provider.lookup(app_name)).await {
        Ok(Ok(context)) => {
            debug!(app = app_name, "using looked-up app context");
            context
        }
        Ok(Err(error)) => {
            warn!(app = app_name, %error, "app context unavailable, using fallback");
            ReportContext::fallback()
        }
        Err(_) => {
            warn!(app = app_name, ?timeout, "app context lookup timed out, using fallback");
            ReportContext::fallback()
        }
    }
}
