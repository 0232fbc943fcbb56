//! Expense data model.
//!
//! Raw input arrives as an [`ExpensePayload`] with every field optional.
//! [`ExpenseDraft`] is the validated field set, built either for a new record
//! (defaults applied) or by merging a payload over an existing [`Expense`].
//! The owner is never part of either: it comes from the authenticated caller.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::user::UserId;
use super::validation::{BLANK, FieldErrors, ValidationError};

/// Maximum description length in characters.
pub const DESCRIPTION_MAX: usize = 255;
/// Currency applied when none is supplied.
pub const DEFAULT_CURRENCY: &str = "USD";
/// Largest storable amount, matching `decimal(10,2)`.
pub const AMOUNT_MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);
const AMOUNT_SCALE: u32 = 2;

/// Field constraint violations for expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseValidationError {
    Blank,
    AmountNotPositive,
    AmountTooPrecise,
    AmountTooLarge,
    DescriptionTooLong { max: usize },
    UnknownCategory,
    InvalidCurrency,
}

impl fmt::Display for ExpenseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => f.write_str(BLANK),
            Self::AmountNotPositive => f.write_str("must be greater than 0"),
            Self::AmountTooPrecise => write!(f, "must have at most {AMOUNT_SCALE} decimal places"),
            Self::AmountTooLarge => write!(f, "must be less than or equal to {AMOUNT_MAX}"),
            Self::DescriptionTooLong { max } => {
                write!(f, "is too long (maximum is {max} characters)")
            }
            Self::UnknownCategory => f.write_str("is not included in the list"),
            Self::InvalidCurrency => f.write_str("is invalid"),
        }
    }
}

impl std::error::Error for ExpenseValidationError {}

/// Opaque numeric expense identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(i64);

impl ExpenseId {
    /// Wrap a store-assigned identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Positive monetary amount with at most two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Validate an amount, normalising it to two decimal places.
    ///
    /// # Examples
    /// ```
    /// use expense_tracker::domain::Amount;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = Amount::new(Decimal::new(125, 1)).expect("12.5 is valid");
    /// assert_eq!(amount.to_string(), "12.50");
    /// assert!(Amount::new(Decimal::new(1001, 3)).is_err());
    /// ```
    pub fn new(value: Decimal) -> Result<Self, ExpenseValidationError> {
        if value <= Decimal::ZERO {
            return Err(ExpenseValidationError::AmountNotPositive);
        }
        let mut normalised = value.normalize();
        if normalised.scale() > AMOUNT_SCALE {
            return Err(ExpenseValidationError::AmountTooPrecise);
        }
        if normalised > AMOUNT_MAX {
            return Err(ExpenseValidationError::AmountTooLarge);
        }
        normalised.rescale(AMOUNT_SCALE);
        Ok(Self(normalised))
    }

    /// Decimal value.
    pub fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Closed set of expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Leisure,
    Electronics,
    Utilities,
    Clothing,
    Health,
    #[default]
    Others,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Groceries,
        Self::Leisure,
        Self::Electronics,
        Self::Utilities,
        Self::Clothing,
        Self::Health,
        Self::Others,
    ];

    /// Stored and serialised name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groceries => "groceries",
            Self::Leisure => "leisure",
            Self::Electronics => "electronics",
            Self::Utilities => "utilities",
            Self::Clothing => "clothing",
            Self::Health => "health",
            Self::Others => "others",
        }
    }
}

impl FromStr for Category {
    type Err = ExpenseValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or(ExpenseValidationError::UnknownCategory)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three uppercase letters, e.g. `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Currency(String);

static CURRENCY_RE: OnceLock<Regex> = OnceLock::new();

fn currency_regex() -> &'static Regex {
    CURRENCY_RE.get_or_init(|| {
        Regex::new(r"^[A-Z]{3}$")
            .unwrap_or_else(|error| panic!("currency regex failed to compile: {error}"))
    })
}

impl Currency {
    /// Validate and construct a [`Currency`].
    pub fn new(code: impl Into<String>) -> Result<Self, ExpenseValidationError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ExpenseValidationError::Blank);
        }
        if !currency_regex().is_match(&code) {
            return Err(ExpenseValidationError::InvalidCurrency);
        }
        Ok(Self(code))
    }

    /// The default currency.
    pub fn usd() -> Self {
        Self(DEFAULT_CURRENCY.to_owned())
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// Free-text description, 1 to [`DESCRIPTION_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct Description(String);

impl Description {
    /// Validate and construct a [`Description`].
    pub fn new(text: impl Into<String>) -> Result<Self, ExpenseValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ExpenseValidationError::Blank);
        }
        if text.chars().count() > DESCRIPTION_MAX {
            return Err(ExpenseValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX,
            });
        }
        Ok(Self(text))
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Description> for String {
    fn from(value: Description) -> Self {
        value.0
    }
}

/// Raw create/update input: `{amount, description, category?, date?, currency?}`.
///
/// Unknown keys, including any `user_id`, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExpensePayload {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub currency: Option<String>,
}

/// Fully validated expense fields, without identity or owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: Amount,
    pub description: Description,
    pub category: Category,
    pub date: NaiveDate,
    pub currency: Currency,
}

struct RawFields<'a> {
    amount: Option<Decimal>,
    description: Option<&'a str>,
    category: Option<&'a str>,
    date: NaiveDate,
    currency: &'a str,
}

impl ExpenseDraft {
    /// Validate a new expense, defaulting date to `today`, category to
    /// `others` and currency to `USD`.
    pub fn for_create(payload: &ExpensePayload, today: NaiveDate) -> Result<Self, ValidationError> {
        Self::validate(RawFields {
            amount: payload.amount,
            description: payload.description.as_deref(),
            category: payload.category.as_deref(),
            date: payload.date.unwrap_or(today),
            currency: payload.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
        })
    }

    /// Merge `payload` over `existing` and validate the result as a whole.
    pub fn merged(existing: &Expense, payload: &ExpensePayload) -> Result<Self, ValidationError> {
        Self::validate(RawFields {
            amount: payload.amount.or(Some(existing.amount().value())),
            description: payload
                .description
                .as_deref()
                .or(Some(existing.description().as_ref())),
            category: payload
                .category
                .as_deref()
                .or(Some(existing.category().as_str())),
            date: payload.date.unwrap_or(existing.date()),
            currency: payload
                .currency
                .as_deref()
                .unwrap_or(existing.currency().as_ref()),
        })
    }

    fn validate(raw: RawFields<'_>) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::default();
        let amount = errors.check(
            "amount",
            raw.amount
                .ok_or(ExpenseValidationError::Blank)
                .and_then(Amount::new),
        );
        let description = errors.check(
            "description",
            raw.description
                .ok_or(ExpenseValidationError::Blank)
                .and_then(Description::new),
        );
        let category = errors.check(
            "category",
            raw.category.map_or(Ok(Category::default()), str::parse),
        );
        let currency = errors.check("currency", Currency::new(raw.currency));

        let fields = amount
            .zip(description)
            .zip(category)
            .zip(currency)
            .map(|(((amount, description), category), currency)| Self {
                amount,
                description,
                category,
                date: raw.date,
                currency,
            });
        errors.finish(fields)
    }
}

/// Persisted expense owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    id: ExpenseId,
    owner: UserId,
    fields: ExpenseDraft,
}

impl Expense {
    /// Assemble a stored expense.
    pub fn new(id: ExpenseId, owner: UserId, fields: ExpenseDraft) -> Self {
        Self { id, owner, fields }
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    /// Owning user; never changes after creation.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn amount(&self) -> Amount {
        self.fields.amount
    }

    pub fn description(&self) -> &Description {
        &self.fields.description
    }

    pub fn category(&self) -> Category {
        self.fields.category
    }

    pub fn date(&self) -> NaiveDate {
        self.fields.date
    }

    pub fn currency(&self) -> &Currency {
        &self.fields.currency
    }

    /// Validated fields.
    pub fn fields(&self) -> &ExpenseDraft {
        &self.fields
    }
}

/// Outward representation of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseView {
    pub id: i64,
    pub amount: Decimal,
    pub description: String,
    pub category: Category,
    pub date: NaiveDate,
    pub currency: String,
    pub user_id: i64,
}

impl From<&Expense> for ExpenseView {
    fn from(value: &Expense) -> Self {
        Self {
            id: value.id.get(),
            amount: value.amount().value(),
            description: value.description().to_string(),
            category: value.category(),
            date: value.date(),
            currency: value.currency().to_string(),
            user_id: value.owner.get(),
        }
    }
}

impl From<Expense> for ExpenseView {
    fn from(value: Expense) -> Self {
        Self::from(&value)
    }
}
