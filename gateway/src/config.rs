//! Gateway configuration.

use std::fmt;
use std::time::Duration;

/// Default order-creation timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default API endpoint.
const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Razorpay credentials and connection settings.
///
/// The checkout key secret and the webhook secret are distinct: the two
/// confirmation channels verify against different secrets.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Public key id, handed to checkout clients.
    pub key_id: String,

    /// Key secret; signs checkout confirmations.
    pub key_secret: String,

    /// Webhook secret; signs webhook bodies.
    pub webhook_secret: String,

    /// API base URL.
    pub api_base: String,

    /// Bound on the order-creation call.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Create a config with the default endpoint and timeout.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the API base URL (tests, sandboxes).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the order-creation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET`,
    /// `RAZORPAY_WEBHOOK_SECRET`, and optionally `RAZORPAY_API_BASE` and
    /// `RAZORPAY_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the timeout
    /// is not an integer.
    pub fn from_env() -> anyhow::Result<Self> {
        let require = |name: &str| {
            std::env::var(name).map_err(|_| anyhow::anyhow!("{name} is not set"))
        };
        let mut config = Self::new(
            require("RAZORPAY_KEY_ID")?,
            require("RAZORPAY_KEY_SECRET")?,
            require("RAZORPAY_WEBHOOK_SECRET")?,
        );
        if let Ok(api_base) = std::env::var("RAZORPAY_API_BASE") {
            config.api_base = api_base;
        }
        if let Ok(secs) = std::env::var("RAZORPAY_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow::anyhow!("RAZORPAY_TIMEOUT_SECS must be an integer"))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

// Manual Debug: secrets stay out of logs.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}
