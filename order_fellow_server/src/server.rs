use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_fellow_engine::{
    notifications::{
        EmailSender,
        JobHandler,
        JobOutcome,
        JobQueue,
        LogMailer,
        NotificationDispatcher,
        NotificationJob,
        ResendMailer,
    },
    CredentialApi,
    NotificationQueue,
    OrderFlowApi,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

use crate::{
    config::{EmailBackend, NotificationConfig, ServerConfig},
    errors::ServerError,
    middleware::WebhookRateLimiter,
    routes::{
        health,
        json_config,
        query_config,
        ListOrdersRoute,
        ModifyOrderRoute,
        NewOrderRoute,
        OrderByIdRoute,
        RemoveOrderRoute,
        WebhookRoute,
    },
};

const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🚀️ Database is ready at {}", db.url());
    let (queue, worker) = start_notification_worker(db.clone(), &config.notifications)?;
    let srv = create_server_instance(config, db, queue)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Server has stopped. Waiting for queued notifications to be delivered");
    match tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => error!("🚀️ The notification worker crashed. {e}"),
        Err(_) => warn!(
            "🚀️ Notifications were still being sent after {}s. Remaining jobs are lost.",
            NOTIFICATION_DRAIN_TIMEOUT.as_secs()
        ),
    }
    result
}

/// Starts the background task that delivers customer emails, and returns the handle that the API uses to queue them.
///
/// The task keeps running until the returned queue, and every clone of it, has been dropped. It then finishes the jobs
/// it already has and exits, which completes the returned `JoinHandle`.
pub fn start_notification_worker(
    db: SqliteDatabase,
    config: &NotificationConfig,
) -> Result<(Arc<dyn NotificationQueue>, JoinHandle<()>), ServerError> {
    let mailer: Arc<dyn EmailSender> = match &config.backend {
        EmailBackend::Console => {
            info!("🚀️ Emails will be written to the log");
            Arc::new(LogMailer)
        },
        EmailBackend::Resend { api_key } => {
            info!("🚀️ Emails will be sent with Resend");
            let mailer = ResendMailer::new(api_key).map_err(|e| ServerError::InitializeError(e.to_string()))?;
            Arc::new(mailer)
        },
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(db, mailer, config.from_address.clone(), config.retry));
    let handler: JobHandler = Arc::new(move |job: NotificationJob| {
        let dispatcher = Arc::clone(&dispatcher);
        Box::pin(async move { dispatcher.execute(job).await }) as Pin<Box<dyn Future<Output = JobOutcome> + Send>>
    });
    let queue = JobQueue::new(handler);
    let submitter = queue.submitter();
    let worker = tokio::spawn(queue.run());
    info!(
        "🚀️ Notification worker started. Failed emails are retried {} times, {}s apart.",
        config.retry.max_retries,
        config.retry.delay.as_secs()
    );
    Ok((Arc::new(submitter), worker))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    queue: Arc<dyn NotificationQueue>,
) -> Result<Server, ServerError> {
    // One limiter for all workers, so that the limit holds across the whole server
    let rate_limiter = web::Data::new(WebhookRateLimiter::new(config.webhook_rate_limit));
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), Arc::clone(&queue), config.transition_policy);
        let credential_api = CredentialApi::new(db.clone(), config.credential_policy);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mof::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(credential_api))
            .app_data(rate_limiter.clone())
            .app_data(json_config())
            .app_data(query_config())
            .service(health)
            .service(WebhookRoute::<SqliteDatabase>::new())
            .service(ListOrdersRoute::<SqliteDatabase>::new())
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(ModifyOrderRoute::<SqliteDatabase>::new())
            .service(RemoveOrderRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
