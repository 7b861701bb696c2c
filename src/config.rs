use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_days: i64,
}

/// Google OAuth2 credentials. Present only when the provider is configured.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

/// SMTP credentials for the welcome-mail sender.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub amqp_url: String,
    pub client_url: String,
    pub production: bool,
    pub session: SessionConfig,
    pub google: Option<GoogleConfig>,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let amqp_url =
            std::env::var("RABBITMQ_URL").unwrap_or_else(|_| "amqp://127.0.0.1:5672/%2f".into());
        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let session = SessionConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };

        let google = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => {
                let port = std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into());
                let callback_url = std::env::var("GOOGLE_CALLBACK_URL").unwrap_or_else(|_| {
                    format!("http://localhost:{port}/api/auth/google/callback")
                });
                Some(GoogleConfig {
                    client_id,
                    client_secret,
                    callback_url,
                })
            }
            _ => None,
        };

        let mail = match (std::env::var("EMAIL_USER"), std::env::var("EMAIL_PASS")) {
            (Ok(user), Ok(pass)) => Some(MailConfig {
                smtp_host: std::env::var("EMAIL_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
                user,
                pass,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            amqp_url,
            client_url,
            production,
            session,
            google,
            mail,
        })
    }
}
