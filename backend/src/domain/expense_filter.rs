//! Date filters for listing a user's expenses.
//!
//! Callers hand over loosely-typed query parameters. Unknown periods and
//! unparseable dates are dropped rather than rejected, and a recognised
//! period always wins over explicit dates.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::Deserialize;

/// Relative look-back windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Seven days.
    LastWeek,
    /// Thirty days.
    LastMonth,
    /// Ninety days.
    LastThreeMonths,
}

impl Period {
    /// Look-back length in days.
    pub const fn days(self) -> u64 {
        match self {
            Self::LastWeek => 7,
            Self::LastMonth => 30,
            Self::LastThreeMonths => 90,
        }
    }

    /// Query parameter value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastWeek => "last_week",
            Self::LastMonth => "last_month",
            Self::LastThreeMonths => "last_3_months",
        }
    }
}

/// Raised for period names outside the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period: {0}")]
pub struct UnknownPeriod(String);

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "last_week" => Ok(Self::LastWeek),
            "last_month" => Ok(Self::LastMonth),
            "last_3_months" => Ok(Self::LastThreeMonths),
            other => Err(UnknownPeriod(other.to_owned())),
        }
    }
}

/// Raw list query: `period`, `from_date`, `to_date`, all optional strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListFilterParams {
    pub period: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl ListFilterParams {
    /// Parameters selecting a relative period.
    pub fn period(period: &str) -> Self {
        Self {
            period: Some(period.to_owned()),
            ..Self::default()
        }
    }

    /// Parameters selecting an explicit date range.
    pub fn range(from_date: Option<&str>, to_date: Option<&str>) -> Self {
        Self {
            period: None,
            from_date: from_date.map(str::to_owned),
            to_date: to_date.map(str::to_owned),
        }
    }
}

/// Interpreted list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpenseFilter {
    /// Every expense.
    #[default]
    All,
    /// Expenses within a look-back window ending with no upper bound.
    Since(Period),
    /// Explicit inclusive bounds; either side may be open.
    Between {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl ExpenseFilter {
    /// Interpret raw parameters.
    ///
    /// # Examples
    /// ```
    /// use expense_tracker::domain::{ExpenseFilter, ListFilterParams, Period};
    ///
    /// let params = ListFilterParams {
    ///     period: Some("last_week".to_owned()),
    ///     from_date: Some("2025-01-01".to_owned()),
    ///     to_date: None,
    /// };
    /// assert_eq!(ExpenseFilter::from_params(&params), ExpenseFilter::Since(Period::LastWeek));
    ///
    /// let lenient = ListFilterParams::range(Some("yesterday"), None);
    /// assert_eq!(ExpenseFilter::from_params(&lenient), ExpenseFilter::All);
    /// ```
    pub fn from_params(params: &ListFilterParams) -> Self {
        if let Some(raw) = params.period.as_deref() {
            return raw.trim().parse::<Period>().map_or(Self::All, Self::Since);
        }

        let from = params.from_date.as_deref().and_then(parse_date);
        let to = params.to_date.as_deref().and_then(parse_date);
        if from.is_none() && to.is_none() {
            Self::All
        } else {
            Self::Between { from, to }
        }
    }

    /// Resolve to concrete bounds relative to `today`.
    pub fn window(self, today: NaiveDate) -> DateWindow {
        match self {
            Self::All => DateWindow::default(),
            Self::Since(period) => DateWindow {
                from: Some(
                    today
                        .checked_sub_days(Days::new(period.days()))
                        .unwrap_or(NaiveDate::MIN),
                ),
                to: None,
            },
            Self::Between { from, to } => DateWindow { from, to },
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Inclusive date bounds; `None` leaves a side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    /// Whether `date` lies inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}
