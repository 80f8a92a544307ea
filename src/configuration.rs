use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub media: MediaSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub uri: String,
    pub database_name: String,
}

/// JWT authentication settings.
///
/// Access and refresh tokens are signed with distinct secrets so a leaked
/// refresh secret cannot be used to forge access tokens and vice versa.
/// Lifetimes are in seconds (e.g. 900 for 15 minutes, 864000 for 10 days).
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_token_secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry: i64,
    pub issuer: String,
}

/// Media host (Cloudinary-style) settings
#[derive(serde::Deserialize, Clone)]
pub struct MediaSettings {
    pub base_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
    /// Directory where incoming multipart files are spooled before upload
    pub temp_dir: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
