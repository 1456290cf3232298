//! Per-run execution context

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::encoding::{EncodingGuard, EncodingProvider};
use crate::error::Result;

/// Locale used when the request does not name one
pub const DEFAULT_LOCALE: &str = "en";

/// Everything one agent run knows about its caller
///
/// A context is owned by a single run and is never shared between
/// concurrent runs.
#[derive(Clone)]
pub struct TaskExecutionContext {
    /// Identifier of this run
    pub task_id: String,

    /// Language the model should answer in
    pub locale: String,

    /// Caller request headers, keys lowercased
    pub headers: HashMap<String, String>,

    /// Model identifier used for planning
    pub model: String,

    /// Log every planning request and response
    pub verbose: bool,

    encodings: Arc<dyn EncodingProvider>,
}

impl TaskExecutionContext {
    /// Create a context from the caller's request headers
    ///
    /// The locale is the first entry of `accept-language`, falling back to
    /// [`DEFAULT_LOCALE`].
    pub fn new(
        headers: HashMap<String, String>,
        model: impl Into<String>,
        verbose: bool,
        encodings: Arc<dyn EncodingProvider>,
    ) -> Self {
        let headers: HashMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let locale = headers
            .get("accept-language")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LOCALE)
            .to_string();

        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            locale,
            headers,
            model: model.into(),
            verbose,
            encodings,
        }
    }

    /// Use a caller supplied task id
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Override the locale derived from the headers
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Acquire a token encoder for this run's model
    ///
    /// The encoder is released when the returned guard drops.
    pub fn encoding(&self) -> Result<EncodingGuard> {
        self.encodings.acquire(&self.model)
    }

    /// Language part of the locale, `ja-JP` gives `ja`
    pub fn language(&self) -> &str {
        self.locale.split(['-', '_']).next().unwrap_or(DEFAULT_LOCALE)
    }
}

impl fmt::Debug for TaskExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecutionContext")
            .field("task_id", &self.task_id)
            .field("locale", &self.locale)
            .field("model", &self.model)
            .field("verbose", &self.verbose)
            .finish()
    }
}
