use crate::cache::{self, ListCache};
use crate::capacity;
use crate::db_storage::{IndicatorStore, INDICATOR_LIST};
use crate::errors::{AppError, ResultExt};
use crate::list_query::{ListQuery, DEFAULT_PER_PAGE};
use crate::models::{CapacityReport, NewIndicator, Page, WealthIndicator};
use crate::permissions::{Caller, PermissionGate};
use std::collections::HashMap;

const MAX_TYPE_LEN: usize = 50;
const MAX_VALUE_LEN: usize = 255;
const MAX_SOURCE_LEN: usize = 255;

/// Wealth-indicator records and the capacity report derived from them.
///
/// Writes are gated by [`PermissionGate`] and invalidate the module's cache
/// namespace. The capacity report is neither gated nor cached.
pub struct WealthIndicatorService<S, G> {
    store: S,
    gate: G,
    cache: ListCache,
    default_per_page: u32,
}

impl<S: IndicatorStore, G: PermissionGate> WealthIndicatorService<S, G> {
    pub fn new(store: S, gate: G, cache: ListCache) -> Self {
        Self {
            store,
            gate,
            cache,
            default_per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn with_default_per_page(mut self, per_page: u32) -> Self {
        self.default_per_page = per_page;
        self
    }

    pub fn module(&self) -> &'static str {
        INDICATOR_LIST.module
    }

    pub async fn add_indicator(
        &self,
        caller: &Caller,
        input: NewIndicator,
    ) -> Result<i64, AppError> {
        self.gate.require_manage_prospects(caller)?;
        let indicator = sanitize_new_indicator(input)?;

        let id = self.store.add(&indicator).await?;
        self.cache.invalidate_lists(self.module()).await?;

        tracing::info!(
            "Wealth indicator {} ({}) added for prospect {}",
            id,
            indicator.indicator_type,
            indicator.prospect_id
        );
        Ok(id)
    }

    pub async fn verify_indicator(&self, caller: &Caller, id: i64) -> Result<(), AppError> {
        self.gate.require_manage_prospects(caller)?;

        if !self.store.set_verified(id, true).await? {
            return Err(AppError::NotFound(format!("Wealth indicator {} not found", id)));
        }
        self.cache.invalidate_related(self.module(), id).await?;

        tracing::info!("Wealth indicator {} verified", id);
        Ok(())
    }

    pub async fn delete_indicator(&self, caller: &Caller, id: i64) -> Result<(), AppError> {
        self.gate.require_manage_prospects(caller)?;

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Wealth indicator {} not found", id)));
        }
        self.cache.invalidate_related(self.module(), id).await?;

        tracing::info!("Wealth indicator {} deleted", id);
        Ok(())
    }

    pub async fn get_indicator(
        &self,
        caller: &Caller,
        id: i64,
    ) -> Result<WealthIndicator, AppError> {
        self.gate.require_manage_prospects(caller)?;

        let key = cache::item_key(self.module(), id);
        if let Some(hit) = self.cache.get::<WealthIndicator>(&key).await {
            tracing::debug!("Cache HIT for {}", key);
            return Ok(hit);
        }
        tracing::debug!("Cache MISS for {}", key);

        let seen = self.cache.generation(self.module());
        let indicator = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wealth indicator {} not found", id)))?;
        self.cache
            .set_if_current(self.module(), key, &indicator, seen)
            .await?;

        Ok(indicator)
    }

    pub async fn list_indicators(
        &self,
        caller: &Caller,
        params: &HashMap<String, String>,
    ) -> Result<Page<WealthIndicator>, AppError> {
        self.gate.require_manage_prospects(caller)?;
        let query = ListQuery::parse(&INDICATOR_LIST, params, self.default_per_page)?;

        let key = query.cache_key();
        if let Some(hit) = self.cache.get::<Page<WealthIndicator>>(&key).await {
            tracing::debug!("Cache HIT for {}", key);
            return Ok(hit);
        }
        tracing::debug!("Cache MISS for {}", key);

        let seen = self.cache.generation(self.module());
        let (items, total) = self
            .store
            .list(&query)
            .await
            .context("listing wealth indicators")?;
        let page = Page {
            items,
            total,
            page: query.page(),
            per_page: query.limit(),
        };
        self.cache
            .set_if_current(self.module(), key, &page, seen)
            .await?;

        Ok(page)
    }

    /// Recomputes capacity and score from the prospect's current indicators.
    ///
    /// Reporting path: no permission check, no caching. A prospect with no
    /// indicators scores like capacity 0 instead of failing.
    pub async fn prospect_capacity(&self, prospect_id: i64) -> Result<CapacityReport, AppError> {
        let indicators = self.store.list_for_prospect(prospect_id).await?;
        Ok(capacity_report(prospect_id, &indicators))
    }

    /// Drops every cached list and item of the module.
    pub async fn clear_cache(&self, caller: &Caller) -> Result<(), AppError> {
        self.gate.require_manage_prospects(caller)?;
        self.cache.invalidate_all(self.module()).await?;
        tracing::info!("Cache cleared for module '{}'", self.module());
        Ok(())
    }
}

/// Builds the report for an already-loaded indicator set.
pub fn capacity_report(prospect_id: i64, indicators: &[WealthIndicator]) -> CapacityReport {
    let capacity = capacity::calculate_capacity(indicators);
    CapacityReport {
        prospect_id,
        capacity,
        score: capacity::get_capacity_score(capacity),
        indicator_count: indicators.len(),
        verified_count: indicators.iter().filter(|i| i.verified).count(),
        breakdown: capacity::breakdown(indicators),
    }
}

/// Trims, normalizes and bounds a new indicator before it reaches the store.
pub fn sanitize_new_indicator(input: NewIndicator) -> Result<NewIndicator, AppError> {
    if input.prospect_id <= 0 {
        return Err(AppError::BadRequest(
            "prospect_id must be a positive integer".to_string(),
        ));
    }

    let indicator_type = input.indicator_type.trim().to_ascii_lowercase();
    if indicator_type.is_empty() {
        return Err(AppError::BadRequest("indicator_type is required".to_string()));
    }
    if indicator_type.len() > MAX_TYPE_LEN
        || !indicator_type
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(AppError::BadRequest(format!(
            "indicator_type must be at most {} characters of a-z, 0-9 and '_'",
            MAX_TYPE_LEN
        )));
    }

    let indicator_value = input.indicator_value.trim().to_string();
    if indicator_value.is_empty() {
        return Err(AppError::BadRequest("indicator_value is required".to_string()));
    }
    if indicator_value.chars().count() > MAX_VALUE_LEN {
        return Err(AppError::BadRequest(format!(
            "indicator_value must be at most {} characters",
            MAX_VALUE_LEN
        )));
    }

    let source = non_empty(input.source);
    if source
        .as_ref()
        .is_some_and(|s| s.chars().count() > MAX_SOURCE_LEN)
    {
        return Err(AppError::BadRequest(format!(
            "source must be at most {} characters",
            MAX_SOURCE_LEN
        )));
    }

    Ok(NewIndicator {
        prospect_id: input.prospect_id,
        indicator_type,
        indicator_value,
        source,
        date_found: input.date_found,
        notes: non_empty(input.notes),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
