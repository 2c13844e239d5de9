//! In-memory integration record store.
//!
//! `IntegrationStore` holds exactly one [`IntegrationRecord`] per
//! configured integration. The set of names is fixed when the store is
//! built; records are mutated in place and never removed.
//!
//! Each record sits behind its own `tokio::sync::Mutex`, so updates to the
//! same integration are serialized while updates to different integrations
//! proceed independently. The store itself needs no outer lock; the monitor
//! owns it and hands out snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::monitor::error::{MonitorError, MonitorResult};
use crate::monitor::types::{IntegrationRecord, IntegrationSeed};

/// Insertion-ordered, per-key serialized store of integration records.
#[derive(Debug)]
pub struct IntegrationStore {
    order: Vec<String>,
    records: HashMap<String, Mutex<IntegrationRecord>>,
}

impl IntegrationStore {
    /// Build a store from seed data. Every record starts `Failed` with
    /// `last_check = now`. Duplicate names are rejected.
    pub fn from_seeds(seeds: &[IntegrationSeed], now: DateTime<Utc>) -> MonitorResult<Self> {
        let mut order = Vec::with_capacity(seeds.len());
        let mut records = HashMap::with_capacity(seeds.len());

        for seed in seeds {
            if records.contains_key(&seed.name) {
                return Err(MonitorError::DuplicateName {
                    name: seed.name.clone(),
                });
            }
            order.push(seed.name.clone());
            records.insert(
                seed.name.clone(),
                Mutex::new(IntegrationRecord::seeded(seed, now)),
            );
        }

        Ok(Self { order, records })
    }

    /// Snapshot of one record.
    pub async fn get(&self, name: &str) -> MonitorResult<IntegrationRecord> {
        let slot = self.slot(name)?;
        let record = slot.lock().await;
        Ok(record.clone())
    }

    /// Snapshots of every record, in insertion order.
    pub async fn list(&self) -> Vec<IntegrationRecord> {
        let mut snapshot = Vec::with_capacity(self.order.len());
        for name in &self.order {
            if let Some(slot) = self.records.get(name) {
                snapshot.push(slot.lock().await.clone());
            }
        }
        snapshot
    }

    /// Apply `mutator` to the named record while holding its lock.
    ///
    /// The mutator's error is passed through unchanged; it is responsible
    /// for leaving the record untouched when it fails.
    pub async fn update<F, T>(&self, name: &str, mutator: F) -> MonitorResult<T>
    where
        F: FnOnce(&mut IntegrationRecord) -> MonitorResult<T>,
    {
        let slot = self.slot(name)?;
        let mut record = slot.lock().await;
        mutator(&mut record)
    }

    /// Integration names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Number of integrations held.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// `true` when the store tracks no integrations.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn slot(&self, name: &str) -> MonitorResult<&Mutex<IntegrationRecord>> {
        self.records
            .get(name)
            .ok_or_else(|| MonitorError::not_found(name))
    }
}
