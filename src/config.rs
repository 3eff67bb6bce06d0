use std::env;

#[derive(Debug, Clone)]
pub struct MattingConfig {
    pub backend: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub max_upload_bytes: u64,
    pub matting: MattingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("SNAPSHEET_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            host: env::var("SNAPSHEET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            max_upload_bytes: env::var("SNAPSHEET_MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "16".to_string())
                .parse::<u64>()?
                * 1024
                * 1024,
            matting: MattingConfig {
                backend: env::var("SNAPSHEET_MATTING_BACKEND")
                    .unwrap_or_else(|_| "passthrough".to_string()),
                endpoint: env::var("SNAPSHEET_MATTING_URL").ok(),
                api_key: env::var("SNAPSHEET_MATTING_API_KEY").ok(),
            },
        })
    }
}
