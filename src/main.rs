use std::net::TcpListener;
use std::sync::Arc;

use videotube::configuration::get_configuration;
use videotube::media::{CloudinaryClient, MediaStore};
use videotube::startup::run;
use videotube::telemetry::init_telemetry;
use videotube::users::{CredentialStore, MongoStore};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store = MongoStore::connect(&configuration.database)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database error")
        })?;
    tracing::info!("Database connection established");

    // Spool directory for incoming multipart uploads
    std::fs::create_dir_all(&configuration.media.temp_dir)?;

    let media_client = CloudinaryClient::new(&configuration.media, reqwest::Client::new());

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on {}", address);

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let media_store: Arc<dyn MediaStore> = Arc::new(media_client);

    let server = run(listener, store, media_store, configuration)?;
    server.await
}
