use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for stored contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub Uuid);

/// Identifier wrapper for one contract-month obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentId(pub Uuid);

macro_rules! uuid_identifier {
    ($($name:ident),+) => {
        $(
            impl $name {
                pub fn generate() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )+
    };
}

uuid_identifier!(ContractId, PeriodId, AdjustmentId);

/// Calendar month a period covers, serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self(date - Duration::days(i64::from(date.day0())))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn checked_add_months(self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    /// Length of the month; the last month chrono can represent is December, so 31.
    pub fn days_in_month(self) -> u32 {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| u32::try_from((next - self.0).num_days()).ok())
            .unwrap_or(31)
    }

    /// The given day of this month, clamped to the month's last day.
    pub fn day_clamped(self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.days_in_month());
        self.0 + Duration::days(i64::from(day - 1))
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a YYYY-MM month")]
pub struct YearMonthParseError(pub String);

impl FromStr for YearMonth {
    type Err = YearMonthParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.len() != 7 {
            return Err(YearMonthParseError(raw.to_string()));
        }
        NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| YearMonthParseError(raw.to_string()))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = YearMonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// How the rent base evolves over the life of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Fixed,
    CpiIndex,
    RentIndex,
    Custom,
}

impl AdjustmentType {
    pub const fn label(self) -> &'static str {
        match self {
            AdjustmentType::Fixed => "fixed",
            AdjustmentType::CpiIndex => "cpi_index",
            AdjustmentType::RentIndex => "rent_index",
            AdjustmentType::Custom => "custom",
        }
    }
}

/// Escalation cadence agreed in the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentFrequency {
    Monthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

impl AdjustmentFrequency {
    pub const fn months(self) -> u32 {
        match self {
            AdjustmentFrequency::Monthly => 1,
            AdjustmentFrequency::Quarterly => 3,
            AdjustmentFrequency::FourMonthly => 4,
            AdjustmentFrequency::Semiannual => 6,
            AdjustmentFrequency::Annual => 12,
        }
    }
}

/// Where a new rent base came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentSource {
    Fixed,
    IndexValue,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Delinquent,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Delinquent => "delinquent",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Pending,
    Partial,
    Overdue,
    Collected,
}

impl PeriodStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PeriodStatus::Pending => "pending",
            PeriodStatus::Partial => "partial",
            PeriodStatus::Overdue => "overdue",
            PeriodStatus::Collected => "collected",
        }
    }
}

/// Terms as submitted by the CRM before validation.
///
/// `start_date` stays a raw `YYYY-MM-DD` string so an unparseable value is reported as an
/// invalid contract rather than a transport error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub property_ref: String,
    pub owner_ref: String,
    pub tenant_ref: String,
    pub agent_ref: String,
    pub start_date: String,
    pub duration_months: u32,
    pub base_amount: Decimal,
    pub currency: String,
    pub adjustment_type: AdjustmentType,
    pub adjustment_frequency: AdjustmentFrequency,
    pub agency_commission_percentage: Decimal,
    pub agent_commission_percentage: Decimal,
}

/// A signed rental agreement. Core terms are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub property_ref: String,
    pub owner_ref: String,
    pub tenant_ref: String,
    pub agent_ref: String,
    pub start_date: NaiveDate,
    pub duration_months: u32,
    pub base_amount: Decimal,
    pub currency: String,
    pub adjustment_type: AdjustmentType,
    pub adjustment_frequency: AdjustmentFrequency,
    pub agency_commission_percentage: Decimal,
    pub agent_commission_percentage: Decimal,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn first_month(&self) -> YearMonth {
        YearMonth::of(self.start_date)
    }

    /// `start_date` advanced by the contract duration.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(self.duration_months))
    }
}

/// One month's rent obligation under a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPeriod {
    pub id: PeriodId,
    pub contract_id: ContractId,
    pub period: YearMonth,
    pub due_date: NaiveDate,
    pub amount_rent: Decimal,
    pub amount_collected: Decimal,
    pub collected_at: Option<DateTime<Utc>>,
    pub status: PeriodStatus,
    pub agency_commission_amount: Option<Decimal>,
    pub agent_commission_amount: Option<Decimal>,
    pub owner_net_amount: Option<Decimal>,
}

impl PaymentPeriod {
    pub fn is_collected(&self) -> bool {
        self.status == PeriodStatus::Collected
    }

    /// Rent still owed, never negative.
    pub fn outstanding(&self) -> Decimal {
        (self.amount_rent - self.amount_collected).max(Decimal::ZERO)
    }
}

/// Append-only record of an applied escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    pub id: AdjustmentId,
    pub contract_id: ContractId,
    pub effective_period_index: u32,
    pub new_base_amount: Decimal,
    pub source: AdjustmentSource,
    pub applied_at: DateTime<Utc>,
}

/// Settlement values a reopen cleared, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReopenAudit {
    pub period_id: PeriodId,
    pub reason: String,
    pub previous_status: PeriodStatus,
    pub previous_amount_collected: Decimal,
    pub previous_collected_at: Option<DateTime<Utc>>,
    pub previous_agency_commission_amount: Option<Decimal>,
    pub previous_agent_commission_amount: Option<Decimal>,
    pub previous_owner_net_amount: Option<Decimal>,
    pub reopened_at: DateTime<Utc>,
}
