//! In-memory collaborators for service tests.
#![allow(dead_code)]

use chrono::Utc;
use nonprofit_backoffice::db_storage::IndicatorStore;
use nonprofit_backoffice::errors::AppError;
use nonprofit_backoffice::list_query::{FilterValue, ListQuery, SortOrder};
use nonprofit_backoffice::models::{NewIndicator, WealthIndicator};
use nonprofit_backoffice::permissions::{Access, Caller, PermissionGate};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const MANAGER_KEY: &str = "manager-key-0123456789";

/// Allows exactly one key.
pub struct StaticGate;

impl PermissionGate for StaticGate {
    fn can_manage_prospects(&self, caller: &Caller) -> Access {
        match caller.api_key.as_deref() {
            Some(MANAGER_KEY) => Access::Allow,
            Some(_) => Access::Deny("not a prospect manager".to_string()),
            None => Access::Deny("no credentials".to_string()),
        }
    }
}

pub fn manager() -> Caller {
    Caller::with_key(MANAGER_KEY)
}

/// Parks one store read after it has loaded its rows.
#[derive(Clone, Default)]
pub struct ReadHold {
    /// Notified once the read has its rows.
    pub loaded: Arc<Notify>,
    /// Notify to let the read return.
    pub resume: Arc<Notify>,
}

/// Vec-backed store that counts how often listing and item reads reach it.
#[derive(Clone, Default)]
pub struct MemoryIndicatorStore {
    rows: Arc<Mutex<Vec<WealthIndicator>>>,
    next_id: Arc<AtomicI64>,
    pub list_calls: Arc<AtomicUsize>,
    pub get_calls: Arc<AtomicUsize>,
    pub fail: Arc<Mutex<bool>>,
    hold: Arc<Mutex<Option<ReadHold>>>,
}

impl MemoryIndicatorStore {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    /// The next `get` or `list` pauses after loading until `resume` fires.
    pub fn hold_next_read(&self) -> ReadHold {
        let hold = ReadHold::default();
        *self.hold.lock().unwrap() = Some(hold.clone());
        hold
    }

    async fn pause_if_held(&self) {
        let hold = self.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            hold.loaded.notify_one();
            hold.resume.notified().await;
        }
    }

    fn check(&self) -> Result<(), AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::InternalError("store unavailable".to_string()));
        }
        Ok(())
    }
}

fn matches(row: &WealthIndicator, column: &str, value: &FilterValue) -> bool {
    match (column, value) {
        ("prospect_id", FilterValue::Int(v)) => row.prospect_id == *v,
        ("indicator_type", FilterValue::Text(v)) => row.indicator_type == *v,
        ("verified", FilterValue::Bool(v)) => row.verified == *v,
        ("source", FilterValue::Text(v)) => row.source.as_deref() == Some(v.as_str()),
        _ => false,
    }
}

fn compare(a: &WealthIndicator, b: &WealthIndicator, column: &str) -> Ordering {
    match column {
        "id" => a.id.cmp(&b.id),
        "prospect_id" => a.prospect_id.cmp(&b.prospect_id),
        "indicator_type" => a.indicator_type.cmp(&b.indicator_type),
        "date_found" => a.date_found.cmp(&b.date_found),
        "verified" => a.verified.cmp(&b.verified),
        _ => a.created_at.cmp(&b.created_at),
    }
}

impl IndicatorStore for MemoryIndicatorStore {
    async fn list_for_prospect(&self, prospect_id: i64) -> Result<Vec<WealthIndicator>, AppError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.prospect_id == prospect_id)
            .cloned()
            .collect())
    }

    async fn add(&self, indicator: &NewIndicator) -> Result<i64, AppError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.rows.lock().unwrap().push(WealthIndicator {
            id,
            prospect_id: indicator.prospect_id,
            indicator_type: indicator.indicator_type.clone(),
            indicator_value: indicator.indicator_value.clone(),
            source: indicator.source.clone(),
            date_found: indicator.date_found,
            verified: false,
            notes: indicator.notes.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<WealthIndicator>, AppError> {
        self.check()?;
        self.get_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let row = self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned();
        self.pause_if_held().await;
        Ok(row)
    }

    async fn set_verified(&self, id: i64, verified: bool) -> Result<bool, AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.verified = verified;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() < before)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<WealthIndicator>, i64), AppError> {
        self.check()?;
        self.list_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let rows = self.rows.lock().unwrap().clone();
        let mut matching: Vec<WealthIndicator> = rows
            .iter()
            .filter(|r| {
                query
                    .filters()
                    .iter()
                    .all(|(column, value)| matches(r, column, value))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            let ord = compare(a, b, query.order_by());
            let ord = match query.order() {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| b.id.cmp(&a.id))
        });
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect();
        self.pause_if_held().await;
        Ok((page, total))
    }

    async fn prospect_ids(&self) -> Result<Vec<i64>, AppError> {
        self.check()?;
        let mut ids: Vec<i64> = self.rows.lock().unwrap().iter().map(|r| r.prospect_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
