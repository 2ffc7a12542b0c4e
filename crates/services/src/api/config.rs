use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ApiConfigError;

const DEFAULT_BASE_URL: &str = "http://localhost:4000/api";
// Grading open-ended answers can take minutes server side.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl QuizApiConfig {
    /// # Errors
    ///
    /// Returns `ApiConfigError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ApiConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| ApiConfigError::InvalidBaseUrl {
            raw: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base_url: parsed,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read `QUIZ_API_BASE_URL`, `QUIZ_API_TOKEN` and `QUIZ_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ApiConfigError> {
        let base_url = env::var("QUIZ_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let mut config = Self::new(&base_url)?;
        config.token = env::var("QUIZ_API_TOKEN").ok();
        if let Ok(raw) = env::var("QUIZ_API_TIMEOUT_SECS") {
            config.timeout = parse_timeout(&raw)?;
        }
        Ok(config.normalized())
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.normalized()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build `{base}/{path}` without doubling slashes.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn normalized(mut self) -> Self {
        self.token = self.token.filter(|t| !t.trim().is_empty());
        self
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ApiConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ApiConfigError::InvalidTimeout {
            raw: raw.to_string(),
        }),
    }
}
