//! Health probe interface
//!
//! Provides the outcome source for retries and bulk checks. The
//! orchestrators never decide success themselves; they ask a probe.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::monitor::types::{CheckKind, ProbeOutcome};
use crate::services::ConnectionTest;

/// Default success probability of a single retry.
pub const DEFAULT_RETRY_SUCCESS_RATE: f64 = 0.30;
/// Default per-record success probability of a bulk check.
pub const DEFAULT_BULK_SUCCESS_RATE: f64 = 0.70;

/// Reason recorded when a simulated check fails.
pub const SIMULATED_FAILURE_REASON: &str = "Health check failed";

/// Trait for anything that can answer "is this integration healthy?"
#[async_trait]
pub trait HealthProbe {
    async fn check(&self, name: &str, kind: CheckKind) -> ProbeOutcome;

    /// Name of this probe for logging
    fn probe_name(&self) -> &str;
}

/// Probe that draws outcomes from a seedable random source.
pub struct SimulatedProbe {
    retry_success_rate: f64,
    bulk_success_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedProbe {
    /// Probe with the default rates. `seed = None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_rates(DEFAULT_RETRY_SUCCESS_RATE, DEFAULT_BULK_SUCCESS_RATE, seed)
    }

    pub fn with_rates(retry_success_rate: f64, bulk_success_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            retry_success_rate: sanitize_rate(retry_success_rate),
            bulk_success_rate: sanitize_rate(bulk_success_rate),
            rng: Mutex::new(rng),
        }
    }

    pub fn retry_success_rate(&self) -> f64 {
        self.retry_success_rate
    }

    pub fn bulk_success_rate(&self) -> f64 {
        self.bulk_success_rate
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl HealthProbe for SimulatedProbe {
    async fn check(&self, _name: &str, kind: CheckKind) -> ProbeOutcome {
        let rate = match kind {
            CheckKind::Retry => self.retry_success_rate,
            CheckKind::Bulk => self.bulk_success_rate,
        };
        let healthy = self.rng.lock().await.gen_bool(rate);
        if healthy {
            ProbeOutcome::Healthy
        } else {
            ProbeOutcome::unhealthy(SIMULATED_FAILURE_REASON)
        }
    }

    fn probe_name(&self) -> &str {
        "simulated"
    }
}

/// Probe backed by real service clients.
///
/// Integrations registered with [`ServiceProbe::register`] are checked via
/// their `test_connection()`; every other name is answered by `fallback`.
pub struct ServiceProbe {
    services: HashMap<String, Arc<dyn ConnectionTest + Send + Sync>>,
    fallback: Arc<dyn HealthProbe + Send + Sync>,
}

impl ServiceProbe {
    pub fn new(fallback: Arc<dyn HealthProbe + Send + Sync>) -> Self {
        Self {
            services: HashMap::new(),
            fallback,
        }
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        service: Arc<dyn ConnectionTest + Send + Sync>,
    ) -> Self {
        self.services.insert(name.into(), service);
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

#[async_trait]
impl HealthProbe for ServiceProbe {
    async fn check(&self, name: &str, kind: CheckKind) -> ProbeOutcome {
        match self.services.get(name) {
            Some(service) => {
                if service.test_connection().await {
                    ProbeOutcome::Healthy
                } else {
                    ProbeOutcome::unhealthy(format!("{}: connection test failed", name))
                }
            }
            None => self.fallback.check(name, kind).await,
        }
    }

    fn probe_name(&self) -> &str {
        "service"
    }
}
