/// Backend base URL.
///
/// An empty base URL means relative endpoints: in development the
/// requests go through the dev-server proxy, in production through the
/// edge reverse proxy. A non-empty value is an explicit absolute origin.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Read the base URL from `ATELIER_API_BASE_URL`, falling back to
    /// relative endpoints when unset.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ATELIER_API_BASE_URL").unwrap_or_default(),
        }
    }
}
