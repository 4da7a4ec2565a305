use mongodb::{Client, Database};

use crate::config::settings::{ConfigError, StoreSettings};

pub async fn connect(settings: &StoreSettings) -> anyhow::Result<Database> {
    let uri = settings
        .mongodb_uri
        .as_deref()
        .ok_or(ConfigError::Missing("MONGODB_URI"))?;

    let client = Client::with_uri_str(uri).await?;

    tracing::info!(database = %settings.database, "Connected to MongoDB");
    Ok(client.database(&settings.database))
}
