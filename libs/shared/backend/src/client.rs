use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use shared_config::AppConfig;

/// HTTP client for the clinic backend. Owns the base URL and the CSRF
/// header/token pair; the pair is treated as opaque strings supplied by the
/// hosting environment and attached to every mutating call.
pub struct BackendClient {
    client: Client,
    base_url: String,
    csrf_header: String,
    csrf_token: String,
}

/// Result of a form POST. Redirects are followed, so `final_url` is the page
/// the backend landed the client on.
#[derive(Debug, Clone)]
pub struct FormResponse {
    pub final_url: String,
    pub body: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.clinic_base_url.trim_end_matches('/').to_string(),
            csrf_header: config.csrf_header_name.clone(),
            csrf_token: config.csrf_token.clone(),
        }
    }

    fn csrf_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let name = HeaderName::from_bytes(self.csrf_header.as_bytes())
            .map_err(|e| anyhow!("Invalid CSRF header name: {}", e))?;
        let value = HeaderValue::from_str(&self.csrf_token)
            .map_err(|e| anyhow!("Invalid CSRF token value: {}", e))?;
        headers.insert(name, value);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        Ok(headers)
    }

    /// Read-only JSON GET. No CSRF attachment.
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Form-encoded POST with the CSRF pair attached. Redirect responses are
    /// followed and the landing URL reported back to the caller.
    pub async fn post_form(&self, path: &str, fields: &[(&str, String)]) -> Result<FormResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Submitting form to {}", url);

        let headers = self.csrf_headers()?;

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .form(fields)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Form submission rejected ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Submission failed ({}): {}", status, error_text),
            });
        }

        let body = response.text().await?;
        Ok(FormResponse { final_url, body })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
