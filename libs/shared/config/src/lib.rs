use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub whatsapp_api_base_url: String,
    pub whatsapp_access_token: String,
    pub whatsapp_phone_number_id: String,
    pub whatsapp_verify_token: String,
    pub whatsapp_app_secret: String,
    pub email_api_base_url: String,
    pub email_api_key: String,
    pub meta_graph_base_url: String,
    pub meta_page_access_token: String,
    pub facebook_page_id: String,
    pub instagram_account_id: String,
    pub channel_timeout_seconds: u64,
    pub port: u16,
}

fn var_or_empty(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn var_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using default", name);
        default.to_string()
    })
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            whatsapp_api_base_url: String::new(),
            whatsapp_access_token: String::new(),
            whatsapp_phone_number_id: String::new(),
            whatsapp_verify_token: String::new(),
            whatsapp_app_secret: String::new(),
            email_api_base_url: String::new(),
            email_api_key: String::new(),
            meta_graph_base_url: String::new(),
            meta_page_access_token: String::new(),
            facebook_page_id: String::new(),
            instagram_account_id: String::new(),
            channel_timeout_seconds: 10,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_anon_key: var_or_empty("SUPABASE_ANON_PUBLIC_KEY"),
            whatsapp_api_base_url: var_or_default(
                "WHATSAPP_API_BASE_URL",
                "https://graph.facebook.com/v18.0",
            ),
            whatsapp_access_token: var_or_empty("WHATSAPP_ACCESS_TOKEN"),
            whatsapp_phone_number_id: var_or_empty("WHATSAPP_PHONE_NUMBER_ID"),
            whatsapp_verify_token: var_or_empty("WHATSAPP_VERIFY_TOKEN"),
            whatsapp_app_secret: var_or_empty("WHATSAPP_APP_SECRET"),
            email_api_base_url: var_or_default("EMAIL_API_BASE_URL", "https://api.sendgrid.com"),
            email_api_key: var_or_empty("EMAIL_API_KEY"),
            meta_graph_base_url: var_or_default(
                "META_GRAPH_BASE_URL",
                "https://graph.facebook.com/v18.0",
            ),
            meta_page_access_token: var_or_empty("META_PAGE_ACCESS_TOKEN"),
            facebook_page_id: var_or_empty("FACEBOOK_PAGE_ID"),
            instagram_account_id: var_or_empty("INSTAGRAM_ACCOUNT_ID"),
            channel_timeout_seconds: var_or_default("CHANNEL_TIMEOUT_SECONDS", "10")
                .parse()
                .unwrap_or_else(|_| {
                    warn!("CHANNEL_TIMEOUT_SECONDS is not a number, using 10");
                    10
                }),
            port: var_or_default("PORT", "3000").parse().unwrap_or_else(|_| {
                warn!("PORT is not a number, using 3000");
                3000
            }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_any_channel_configured() {
            warn!("No messaging channel configured - every reminder send will fail");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_whatsapp_configured(&self) -> bool {
        !self.whatsapp_api_base_url.is_empty()
            && !self.whatsapp_access_token.is_empty()
            && !self.whatsapp_phone_number_id.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_base_url.is_empty() && !self.email_api_key.is_empty()
    }

    pub fn is_facebook_configured(&self) -> bool {
        !self.meta_graph_base_url.is_empty()
            && !self.meta_page_access_token.is_empty()
            && !self.facebook_page_id.is_empty()
    }

    pub fn is_instagram_configured(&self) -> bool {
        !self.meta_graph_base_url.is_empty()
            && !self.meta_page_access_token.is_empty()
            && !self.instagram_account_id.is_empty()
    }

    pub fn is_any_channel_configured(&self) -> bool {
        self.is_whatsapp_configured()
            || self.is_email_configured()
            || self.is_facebook_configured()
            || self.is_instagram_configured()
    }

    pub fn is_webhook_signature_enabled(&self) -> bool {
        !self.whatsapp_app_secret.is_empty()
    }
}
