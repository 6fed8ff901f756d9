mod app;
mod bootstrap;
mod config;
mod docs;
mod routes;

use goodtables_core::config::ConfigBuilder;

use app::{Dependencies, database::Database};
use config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_base().await;

    let settings = Settings::build()?;

    let database = Database::connect(&settings.database_url).await?;
    database.migrate().await?;

    let server = app::create_app(&settings, Dependencies::production(&settings, &database));

    bootstrap::init_server(server.into_router(), settings.port).await
}
