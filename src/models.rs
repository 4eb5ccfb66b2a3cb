use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

// ============ Database Models ============

/// One recorded piece of evidence about a prospect's wealth or generosity.
///
/// Rows are immutable after insertion except for `verified`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WealthIndicator {
    /// Unique identifier assigned by the database.
    pub id: i64,
    /// The prospect this indicator belongs to.
    pub prospect_id: i64,
    /// Indicator kind as stored (e.g. "real_estate"). Unknown kinds are kept verbatim.
    pub indicator_type: String,
    /// Free text; monetary kinds carry a human-written amount such as "$250,000".
    pub indicator_value: String,
    /// Where the indicator was found.
    pub source: Option<String>,
    /// When the indicator was found.
    pub date_found: Option<NaiveDate>,
    /// Set only through the explicit verification action.
    pub verified: bool,
    /// Researcher notes.
    pub notes: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

impl WealthIndicator {
    /// Parsed indicator kind.
    pub fn kind(&self) -> IndicatorType {
        IndicatorType::parse(&self.indicator_type)
    }
}

/// Indicator kinds recognized by the capacity scorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    RealEstate,
    BusinessOwnership,
    StockHoldings,
    PhilanthropicHistory,
    ProfessionalPosition,
    FamilyFoundation,
    /// Stored but never scored.
    Other(String),
}

impl IndicatorType {
    /// Parses a stored type name. Never fails: unknown names become `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "real_estate" => IndicatorType::RealEstate,
            "business_ownership" => IndicatorType::BusinessOwnership,
            "stock_holdings" => IndicatorType::StockHoldings,
            "philanthropic_history" => IndicatorType::PhilanthropicHistory,
            "professional_position" => IndicatorType::ProfessionalPosition,
            "family_foundation" => IndicatorType::FamilyFoundation,
            other => IndicatorType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IndicatorType::RealEstate => "real_estate",
            IndicatorType::BusinessOwnership => "business_ownership",
            IndicatorType::StockHoldings => "stock_holdings",
            IndicatorType::PhilanthropicHistory => "philanthropic_history",
            IndicatorType::ProfessionalPosition => "professional_position",
            IndicatorType::FamilyFoundation => "family_foundation",
            IndicatorType::Other(name) => name,
        }
    }

    /// Whether the contribution is derived from an amount in `indicator_value`.
    pub fn is_monetary(&self) -> bool {
        matches!(
            self,
            IndicatorType::RealEstate
                | IndicatorType::BusinessOwnership
                | IndicatorType::StockHoldings
        )
    }
}

// ============ Request/Response Models ============

/// Body of `POST /api/v1/indicators`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIndicator {
    pub prospect_id: i64,
    pub indicator_type: String,
    pub indicator_value: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date_found: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the filters, ignoring pagination.
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Contribution of a single indicator to a prospect's capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityContribution {
    pub indicator_id: i64,
    pub indicator_type: String,
    pub verified: bool,
    pub amount: f64,
}

/// Derived capacity for one prospect. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub prospect_id: i64,
    /// Estimated giving capacity, rounded to cents.
    pub capacity: f64,
    /// 0-100 rating. Fractional below the 25,000 bucket.
    #[serde(serialize_with = "serialize_score")]
    pub score: f64,
    pub indicator_count: usize,
    pub verified_count: usize,
    pub breakdown: Vec<CapacityContribution>,
}

/// Whole scores go out as JSON integers, fractional ones keep their fraction.
fn serialize_score<S>(score: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if score.fract() == 0.0 {
        serializer.serialize_i64(*score as i64)
    } else {
        serializer.serialize_f64(*score)
    }
}
