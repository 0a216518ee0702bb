use envconfig::Envconfig;
use std::collections::HashSet;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "postgresql://localhost/geoforum")]
    pub database_url: String,

    #[envconfig(from = "FORUM_HTTP_PORT", default = "3000")]
    pub http_port: u16,

    #[envconfig(from = "FORUM_DATABASE_MAX_CONNECTIONS", default = "5")]
    pub database_max_connections: u32,

    #[envconfig(from = "FORUM_SITE_NAME", default = "Forum")]
    pub site_name: String,

    #[envconfig(from = "FORUM_SITE_DOMAIN", default = "localhost:3000")]
    pub site_domain: String,

    #[envconfig(from = "FORUM_LANGUAGE_CODE", default = "en")]
    pub language_code: String,

    #[envconfig(from = "FORUM_DEFAULT_FROM_EMAIL", default = "forum@localhost")]
    pub default_from_email: String,

    // "smtp", "log" or "memory"
    #[envconfig(from = "FORUM_MAIL_BACKEND", default = "log")]
    pub mail_backend: String,

    #[envconfig(from = "FORUM_SMTP_HOST", default = "localhost")]
    pub smtp_host: String,

    #[envconfig(from = "FORUM_SMTP_PORT", default = "587")]
    pub smtp_port: u16,

    /// Empty means no authentication.
    #[envconfig(from = "FORUM_SMTP_USERNAME", default = "")]
    pub smtp_username: String,

    #[envconfig(from = "FORUM_SMTP_PASSWORD", default = "")]
    pub smtp_password: String,

    // "starttls", "tls" or "none"
    #[envconfig(from = "FORUM_SMTP_SECURITY", default = "starttls")]
    pub smtp_security: String,

    #[envconfig(from = "FORUM_PAGE_SIZE", default = "20")]
    pub forum_page_size: u64,

    #[envconfig(from = "FORUM_TOPIC_PAGE_SIZE", default = "10")]
    pub topic_page_size: u64,

    #[envconfig(from = "FORUM_ENABLE_ANONYMOUS_POST", default = "false")]
    pub enable_anonymous_post: bool,

    #[envconfig(from = "FORUM_ANONYMOUS_USERNAME", default = "Anonymous")]
    pub anonymous_username: String,

    #[envconfig(from = "FORUM_PREMODERATION", default = "false")]
    pub premoderation: bool,

    /// Comma separated, base64 encoded ed25519 public keys.
    #[envconfig(from = "FORUM_ADMIN_PUBKEYS", default = "")]
    pub admin_pubkeys: String,

    #[envconfig(from = "RUST_LOG", default = "info")]
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }

    /// Decodes `FORUM_ADMIN_PUBKEYS` into raw key bytes.
    pub fn admin_pubkey_set(&self) -> anyhow::Result<HashSet<Vec<u8>>> {
        let mut keys = HashSet::new();
        for encoded in self.admin_pubkeys.split(',') {
            let encoded = encoded.trim();
            if encoded.is_empty() {
                continue;
            }
            let key = base64::decode(encoded).map_err(|e| {
                anyhow::anyhow!("Invalid admin public key '{}': {}", encoded, e)
            })?;
            keys.insert(key);
        }
        Ok(keys)
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with the defaults above, for tests that build state by hand.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgresql://localhost/geoforum_test".to_string(),
            http_port: 0,
            database_max_connections: 1,
            site_name: "Test Forum".to_string(),
            site_domain: "forum.test".to_string(),
            language_code: "en".to_string(),
            default_from_email: "forum@forum.test".to_string(),
            mail_backend: "memory".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_security: "starttls".to_string(),
            forum_page_size: 20,
            topic_page_size: 10,
            enable_anonymous_post: false,
            anonymous_username: "Anonymous".to_string(),
            premoderation: false,
            admin_pubkeys: String::new(),
            log_level: "debug".to_string(),
        }
    }
}
