use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;

use integration_monitor::api::{self, ApiState};
use integration_monitor::cli::Cli;
use integration_monitor::config::Config;
use integration_monitor::error::AppError;
use integration_monitor::leads::LeadPipeline;
use integration_monitor::logging::init_logging;
use integration_monitor::metrics::AppMetrics;
use integration_monitor::monitor::{
    default_seeds, HealthProbe, IntegrationMonitor, ServiceProbe, SimulatedProbe,
};
use integration_monitor::scheduler::run_periodic_checks;
use integration_monitor::services::crm::CrmClient;
use integration_monitor::services::email::EmailClient;
use integration_monitor::services::sms::SmsClient;
use integration_monitor::store::IntegrationStore;

/// Integrations whose health can be read from a configured service client.
const EMAIL_INTEGRATION: &str = "Email Marketing (Mailchimp)";
const CRM_INTEGRATION: &str = "CRM System (Salesforce)";

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()
        .map(|config| config.apply_cli(&cli))
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    if let Err(err) = run(config).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    tracing::info!(
        "Starting integration monitor on {} (seed: {:?})",
        config.bind_addr,
        config.simulation_seed
    );

    let metrics = Arc::new(AppMetrics::new().map_err(|err| AppError::Config(err.to_string()))?);
    let store = IntegrationStore::from_seeds(&default_seeds(), Utc::now())
        .map_err(|err| AppError::Config(err.to_string()))?;

    let email = Arc::new(EmailClient::new(config.email.clone()));
    let sms = Arc::new(SmsClient::new(config.sms.clone()));
    let crm = Arc::new(CrmClient::new(config.crm.clone()));

    let simulated: Arc<dyn HealthProbe + Send + Sync> = Arc::new(SimulatedProbe::with_rates(
        config.retry_success_rate,
        config.bulk_success_rate,
        config.simulation_seed,
    ));
    let mut probe = ServiceProbe::new(simulated);
    if !config.email.api_key.is_empty() {
        tracing::info!("'{}' checks use the mail API", EMAIL_INTEGRATION);
        probe = probe.register(EMAIL_INTEGRATION, email.clone());
    }
    if !config.crm.api_key.is_empty() {
        tracing::info!("'{}' checks use the CRM API", CRM_INTEGRATION);
        probe = probe.register(CRM_INTEGRATION, crm.clone());
    }

    let monitor = IntegrationMonitor::builder(store, Arc::new(probe))
        .config(config.monitor)
        .metrics(metrics.clone())
        .build();

    let leads = Arc::new(LeadPipeline::new(email, sms, crm).with_metrics(metrics.clone()));

    if config.auto_check_interval_seconds > 0 {
        tokio::spawn(run_periodic_checks(
            monitor.clone(),
            config.auto_check_interval_seconds,
        ));
    }

    let app = api::router(Arc::new(ApiState {
        monitor: monitor.clone(),
        leads,
        metrics,
    }));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("Failed to bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(monitor))
        .await
        .map_err(|err| AppError::Unknown(err.to_string()))?;

    tracing::info!("Server stopped cleanly");
    Ok(())
}

async fn shutdown_signal(monitor: IntegrationMonitor) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    monitor.shutdown();
}
