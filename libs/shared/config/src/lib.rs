use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clinic_base_url: String,
    pub csrf_header_name: String,
    pub csrf_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            clinic_base_url: env::var("CLINIC_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BASE_URL not set, using empty value");
                    String::new()
                }),
            csrf_header_name: env::var("CLINIC_CSRF_HEADER")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_CSRF_HEADER not set, using default");
                    "X-CSRF-TOKEN".to_string()
                }),
            csrf_token: env::var("CLINIC_CSRF_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_CSRF_TOKEN not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.clinic_base_url.is_empty() && !self.csrf_token.is_empty()
    }
}
