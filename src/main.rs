use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use newsletter::app;
use newsletter::client::EmailClient;
use newsletter::dispatch::{self, Dispatcher};
use newsletter::links::LinkBuilder;
use newsletter::media::MediaStore;
use newsletter::repo::Repos;
use newsletter::scheduler::Scheduler;
use newsletter::settings::{Settings, StorageBackend};
use newsletter::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let repos = match settings.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPool::connect_with(settings.database.with_db())
                .await
                .context("Failed to connect to the database")?;
            sqlx::migrate!()
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            Repos::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on shutdown");
            Repos::in_memory()
        }
    };

    let email_client = EmailClient::new(
        settings.email.sender()?,
        settings.email.api_timeout(),
        settings.email.api_base_url()?,
        settings.email.api_auth_token(),
    )?;
    let links = LinkBuilder::new(settings.app.base_url()?)?;

    let dispatcher = Arc::new(Dispatcher::new(repos.clone(), email_client, links.clone()));
    let (queue, _worker) = dispatch::spawn_worker(dispatcher.clone());
    let _scheduler =
        Scheduler::new(repos.clone(), dispatcher, settings.scheduler.period()).spawn();

    let media_store = MediaStore::new(settings.media.upload_dir(), links);
    media_store
        .init()
        .await
        .context("Failed to create the media upload directory")?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    app::run(listener, repos, queue, media_store)?
        .await
        .context("Failed to run app")
}
