use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use waggle_engine::{
    events::{EventHandlers, EventHooks, EventProducers, LifecycleEvent},
    EngagementFlowApi,
    PaymentProcessor,
    PushGateway,
    SqliteDatabase,
};

use crate::{config::ServerConfig, errors::ServerError, routes};

#[cfg(feature = "stripe")]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    use crate::integrations::{PushRelay, StripeProcessor};

    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let processor = StripeProcessor::new(&config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let pusher = PushRelay::new(config.push_relay_url.clone());

    // The realtime socket tier subscribes downstream of this hub; the server's own hook keeps an audit trail of
    // everything published to the rooms.
    let mut hooks = EventHooks::default();
    hooks.on_lifecycle(|event: LifecycleEvent| {
        Box::pin(async move {
            info!("📬️ Room [{}] ← {} ({})", event.room, event.name, event.engagement.total);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let srv = create_server_instance(config, db, processor, pusher, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance<P, N>(
    config: ServerConfig,
    db: SqliteDatabase,
    processor: P,
    pusher: N,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    P: PaymentProcessor + Send + 'static,
    N: PushGateway + Send + 'static,
{
    let srv = HttpServer::new(move || {
        let api = EngagementFlowApi::new(db.clone(), processor.clone(), pusher.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("wgl::access_log"))
            .app_data(web::Data::new(api))
            .configure(routes::configure::<SqliteDatabase, P, N>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
