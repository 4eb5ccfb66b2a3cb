//! Shared list-query contract.
//!
//! Every listing operation takes a loose map of request options and turns it
//! into a [`ListQuery`]: pagination normalized, sort column checked against the
//! entity's allow-list, filters typed and restricted to known columns. The
//! normalized query is what gets bound into SQL and what the cache key is
//! derived from, so equivalent requests share one cache entry.

use crate::cache;
use crate::errors::AppError;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;
const MAX_FILTER_TEXT_LEN: usize = 255;

const RESERVED_KEYS: [&str; 6] = ["page", "per_page", "offset", "limit", "orderby", "order"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive; anything other than `asc` means `DESC`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            Some(s) if s == "ASC" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Column type of a filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Int,
    Bool,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(v) => write!(f, "i:{}", v),
            FilterValue::Bool(v) => write!(f, "b:{}", v),
            FilterValue::Text(v) => write!(f, "s:{:?}", v),
        }
    }
}

/// Per-entity description of what a list request may touch.
#[derive(Debug)]
pub struct ListSchema {
    /// Cache namespace of the entity.
    pub module: &'static str,
    /// Table the rows come from.
    pub table: &'static str,
    pub sortable: &'static [&'static str],
    pub default_order_by: &'static str,
    pub filterable: &'static [(&'static str, FilterKind)],
}

/// Normalized list request. Built once per call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    module: &'static str,
    table: &'static str,
    offset: u32,
    limit: u32,
    order_by: &'static str,
    order: SortOrder,
    filters: BTreeMap<&'static str, FilterValue>,
}

impl ListQuery {
    /// Normalizes raw request options against `schema`.
    ///
    /// Pagination never fails: negative numbers are taken by absolute value,
    /// unparseable ones fall back to defaults, and the page size is capped at
    /// [`MAX_PER_PAGE`]. An explicit `offset` wins over `page`. Unknown sort
    /// columns fall back to the schema default. Unknown filter columns and
    /// values that do not parse as the column's type are rejected.
    pub fn parse(
        schema: &'static ListSchema,
        params: &HashMap<String, String>,
        default_per_page: u32,
    ) -> Result<Self, AppError> {
        let fallback_per_page = default_per_page.clamp(1, MAX_PER_PAGE);
        let limit = params
            .get("per_page")
            .or_else(|| params.get("limit"))
            .and_then(|raw| parse_count(raw))
            .filter(|n| *n > 0)
            .map(|n| n.min(MAX_PER_PAGE))
            .unwrap_or(fallback_per_page);

        let offset = match params.get("offset").and_then(|raw| parse_count(raw)) {
            Some(offset) => offset,
            None => {
                let page = params
                    .get("page")
                    .and_then(|raw| parse_count(raw))
                    .filter(|n| *n > 0)
                    .unwrap_or(1);
                (page - 1).saturating_mul(limit)
            }
        };

        let requested_order_by = params
            .get("orderby")
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let order_by = schema
            .sortable
            .iter()
            .copied()
            .find(|column| *column == requested_order_by)
            .unwrap_or(schema.default_order_by);

        let order = SortOrder::parse(params.get("order").map(String::as_str));

        let mut filters = BTreeMap::new();
        for (key, raw) in params {
            if RESERVED_KEYS.contains(&key.as_str()) || raw.trim().is_empty() {
                continue;
            }
            let (column, kind) = schema
                .filterable
                .iter()
                .copied()
                .find(|(column, _)| *column == key.as_str())
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "unknown filter '{}' for {}",
                        key, schema.module
                    ))
                })?;
            filters.insert(column, parse_filter(column, kind, raw)?);
        }

        Ok(Self {
            module: schema.module,
            table: schema.table,
            offset,
            limit,
            order_by,
            order,
            filters,
        })
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// 1-based page the offset falls on.
    pub fn page(&self) -> u32 {
        (self.offset / self.limit.max(1)).saturating_add(1)
    }

    pub fn order_by(&self) -> &'static str {
        self.order_by
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn filters(&self) -> &BTreeMap<&'static str, FilterValue> {
        &self.filters
    }

    /// Deterministic cache key for this normalized query.
    pub fn cache_key(&self) -> String {
        let mut canonical = format!(
            "{}|{}|{}|{}",
            self.offset,
            self.limit,
            self.order_by,
            self.order.as_sql()
        );
        for (column, value) in &self.filters {
            canonical.push('|');
            canonical.push_str(column);
            canonical.push('=');
            canonical.push_str(&value.to_string());
        }
        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        cache::list_key(self.module, &digest)
    }

    /// Appends ` WHERE col = $n AND ...` with every value bound as a parameter.
    pub fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, (column, value)) in self.filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(*column);
            builder.push(" = ");
            match value {
                FilterValue::Int(v) => builder.push_bind(*v),
                FilterValue::Bool(v) => builder.push_bind(*v),
                FilterValue::Text(v) => builder.push_bind(v.clone()),
            };
        }
    }

    /// `SELECT * FROM table WHERE ... ORDER BY ... LIMIT $n OFFSET $m`
    pub fn select_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", self.table));
        self.push_filters(&mut builder);
        builder.push(format!(" ORDER BY {} {}", self.order_by, self.order.as_sql()));
        if self.order_by != "id" {
            builder.push(", id DESC");
        }
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(self.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(self.offset));
        builder
    }

    /// `SELECT COUNT(*) FROM table WHERE ...`
    pub fn count_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.push_filters(&mut builder);
        builder
    }
}

/// absint-style parse: sign dropped, garbage ignored.
fn parse_count(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|n| u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX))
}

fn parse_filter(column: &str, kind: FilterKind, raw: &str) -> Result<FilterValue, AppError> {
    let raw = raw.trim();
    match kind {
        FilterKind::Int => raw.parse::<i64>().map(FilterValue::Int).map_err(|_| {
            AppError::BadRequest(format!("filter '{}' must be an integer", column))
        }),
        FilterKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(FilterValue::Bool(true)),
            "0" | "false" | "no" => Ok(FilterValue::Bool(false)),
            _ => Err(AppError::BadRequest(format!(
                "filter '{}' must be a boolean",
                column
            ))),
        },
        FilterKind::Text => {
            if raw.chars().count() > MAX_FILTER_TEXT_LEN {
                return Err(AppError::BadRequest(format!(
                    "filter '{}' is longer than {} characters",
                    column, MAX_FILTER_TEXT_LEN
                )));
            }
            Ok(FilterValue::Text(raw.to_string()))
        }
    }
}
