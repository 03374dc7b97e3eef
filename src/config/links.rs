use serde::Deserialize;

/// Dynamic link configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Length of randomly generated short codes
    pub short_code_length: usize,

    /// Maximum number of attempts to generate a unique short code
    pub short_code_max_attempts: u32,

    /// Base URL for constructing public short links (e.g., "https://qr.example.com")
    pub base_url: String,

    /// Where unknown or unusable codes are redirected
    pub landing_path: String,
}

impl LinkConfig {
    /// Validate link configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.short_code_length < 4 || self.short_code_length > 16 {
            return Err("SHORT_CODE_LENGTH must be between 4 and 16".to_string());
        }

        if self.short_code_max_attempts < 1 || self.short_code_max_attempts > 100 {
            return Err("SHORT_CODE_MAX_ATTEMPTS must be between 1 and 100".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("BASE_URL must start with http:// or https://".to_string());
        }

        if !self.landing_path.starts_with('/') {
            return Err("LANDING_PATH must be a root-relative path".to_string());
        }

        Ok(())
    }

    /// Public URL for a short code
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/go/{}", self.base_url.trim_end_matches('/'), short_code)
    }
}
