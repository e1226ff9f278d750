//! Videoflix billing service.
//!
//! Serves the Stripe webhook endpoint and runs the reconciliation jobs
//! until Ctrl-C.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use videoflix_billing::adapters::events::LoggingEventPublisher;
use videoflix_billing::adapters::http::billing::{billing_router, BillingAppState};
use videoflix_billing::adapters::notification::{
    EmailOperationsAlerter, LoggingNotificationGateway, ResendConfig, ResendNotificationGateway,
};
use videoflix_billing::adapters::postgres::{
    PostgresFailedEmailRepository, PostgresLevelRepository, PostgresMetricsStore,
    PostgresSubscriptionRepository, PostgresUserDirectory, PostgresWatermarkStore,
};
use videoflix_billing::adapters::stripe::{
    StripeConfig, StripePaymentGateway, StripeWebhookVerifier,
};
use videoflix_billing::adapters::sync::{HttpCancellationSink, HttpSyncEndpoint};
use videoflix_billing::application::handlers::{
    HandlePaymentWebhookHandler, RecordPaymentFailureHandler, RecordPaymentSuccessHandler,
    RecordRenewalHandler,
};
use videoflix_billing::application::scheduler::{
    DataSynchronizationTask, ExpirationTask, InactiveSubscriptionCleanupTask, JobSchedule,
    PaymentReminderTask, RenewalTask, SchedulerRunner, SubscriptionMetricsAggregationTask,
    TrialPeriodEndTask,
};
use videoflix_billing::application::{CallDeadline, DataSynchronizer, NotificationDispatcher};
use videoflix_billing::config::{AppConfig, EmailConfig, SyncConfig};
use videoflix_billing::ports::{
    EventPublisher, NotificationGateway, SubscriptionLevelRepository, SubscriptionRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let deadline = CallDeadline::new(config.scheduler.external_call_timeout());
    let batch_size = config.scheduler.batch_size;

    let repository: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let levels: Arc<dyn SubscriptionLevelRepository> =
        Arc::new(PostgresLevelRepository::new(pool.clone()));
    let events: Arc<dyn EventPublisher> = Arc::new(LoggingEventPublisher::new());

    let mut stripe = StripeConfig::new(config.payment.stripe_api_key.clone());
    if let Some(url) = &config.payment.stripe_api_base_url {
        stripe = stripe.with_base_url(url.clone());
    }
    let payments = Arc::new(StripePaymentGateway::new(stripe));

    let gateway = notification_gateway(&config.email);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        gateway.clone(),
        Arc::new(PostgresUserDirectory::new(pool.clone())),
        Arc::new(PostgresFailedEmailRepository::new(pool.clone())),
        Arc::new(EmailOperationsAlerter::new(
            gateway,
            config.email.admin_emails.clone(),
        )),
        deadline,
    ));

    let synchronizer = Arc::new(build_synchronizer(
        &config.sync,
        repository.clone(),
        Arc::new(PostgresWatermarkStore::new(pool.clone())),
        batch_size,
        deadline,
    ));

    // Webhook path
    let failure = Arc::new(RecordPaymentFailureHandler::new(
        repository.clone(),
        levels.clone(),
        events.clone(),
        dispatcher.clone(),
    ));
    let success = Arc::new(RecordPaymentSuccessHandler::new(
        repository.clone(),
        levels.clone(),
        events.clone(),
        dispatcher.clone(),
    ));
    let verifier = Arc::new(StripeWebhookVerifier::new(
        config.payment.stripe_webhook_secret.clone(),
    ));
    let state = BillingAppState {
        webhook_handler: Arc::new(HandlePaymentWebhookHandler::new(verifier, failure, success)),
    };

    // Reconciliation jobs
    let hours = &config.scheduler.hours;
    let daily = |hour: u32| JobSchedule::DailyAt { hour, minute: 0 };
    let renewals = Arc::new(RecordRenewalHandler::new(
        repository.clone(),
        levels.clone(),
        events.clone(),
    ));
    let runner = SchedulerRunner::new()
        .register(
            Arc::new(RenewalTask::new(
                repository.clone(),
                levels.clone(),
                payments,
                renewals,
                deadline,
                batch_size,
            )),
            daily(hours.renewal),
        )
        .register(
            Arc::new(ExpirationTask::new(
                repository.clone(),
                levels.clone(),
                events.clone(),
                dispatcher.clone(),
                batch_size,
            )),
            daily(hours.expiration),
        )
        .register(
            Arc::new(TrialPeriodEndTask::new(
                repository.clone(),
                events.clone(),
                dispatcher.clone(),
                batch_size,
            )),
            daily(hours.trial_end),
        )
        .register(
            Arc::new(
                PaymentReminderTask::new(
                    repository.clone(),
                    levels.clone(),
                    dispatcher.clone(),
                    batch_size,
                )
                .with_days_before(config.scheduler.reminder_days_before),
            ),
            daily(hours.payment_reminder),
        )
        .register(
            Arc::new(
                InactiveSubscriptionCleanupTask::new(repository.clone(), batch_size).with_retention(
                    config.scheduler.cancelled_retention_days,
                    config.scheduler.inactive_deletion_days,
                ),
            ),
            daily(hours.cleanup),
        )
        .register(
            Arc::new(DataSynchronizationTask::new(synchronizer, config.sync.enabled)),
            daily(hours.data_sync),
        )
        .register(
            Arc::new(SubscriptionMetricsAggregationTask::new(
                repository.clone(),
                levels.clone(),
                Arc::new(PostgresMetricsStore::new(pool.clone())),
                config.features.metrics_aggregation,
                batch_size,
            )),
            daily(hours.metrics_aggregation),
        );
    tracing::info!(jobs = ?runner.job_names(), "Scheduler configured");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = runner.spawn(shutdown_rx);

    let app = billing_router(state, config.server.request_timeout());
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for incoming connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down scheduler");
    let _ = shutdown_tx.send(true);
    for handle in job_handles {
        if let Err(error) = handle.await {
            tracing::error!(%error, "Job loop panicked");
        }
    }

    pool.close().await;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.features.json_logs {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn notification_gateway(email: &EmailConfig) -> Arc<dyn NotificationGateway> {
    match &email.resend_api_key {
        Some(key) => Arc::new(ResendNotificationGateway::new(ResendConfig::new(
            key.clone(),
            &email.from_email,
            &email.from_name,
        ))),
        None => {
            tracing::warn!("No Resend API key configured, notifications are only logged");
            Arc::new(LoggingNotificationGateway::new())
        }
    }
}

fn build_synchronizer(
    sync: &SyncConfig,
    repository: Arc<dyn SubscriptionRepository>,
    watermark: Arc<PostgresWatermarkStore>,
    batch_size: usize,
    deadline: CallDeadline,
) -> DataSynchronizer {
    let mut synchronizer = DataSynchronizer::new(repository, watermark, batch_size, deadline);
    if let Some(url) = &sync.crm_url {
        synchronizer = synchronizer.with_endpoint(Arc::new(HttpSyncEndpoint::new("crm", url)));
    }
    if let Some(url) = &sync.analytics_url {
        synchronizer =
            synchronizer.with_endpoint(Arc::new(HttpSyncEndpoint::new("analytics", url)));
    }
    if let Some(url) = &sync.cancellation_url {
        synchronizer =
            synchronizer.with_cancellation_sink(Arc::new(HttpCancellationSink::new(url)));
    }
    if sync.enabled && !synchronizer.has_endpoints() {
        tracing::warn!("Data sync enabled but no endpoints configured");
    }
    synchronizer
}
