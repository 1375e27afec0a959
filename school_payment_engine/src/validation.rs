//! Input validation for requests entering the engine.
//!
//! These checks run at the boundary, before any engine API is called, so the engine itself can assume well-formed
//! input.
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use crate::{
    db_types::PaymentStatus,
    order_objects::{
        NewPaymentRequest,
        SortField,
        SortOrder,
        TransactionQuery,
        TransactionQueryParams,
        DEFAULT_PAGE_SIZE,
        MAX_PAGE_SIZE,
    },
};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const REFERENCE_PATTERN: &str = r"^[A-Za-z0-9_\-]{1,128}$";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::InvalidField { field, reason: reason.into() }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).map(|re| re.is_match(email)).unwrap_or(false)
}

/// Order references (our order ids and the gateway's collection request ids) are short runs of letters, digits,
/// underscores and dashes.
pub fn validate_order_reference(reference: &str) -> Result<(), ValidationError> {
    require("order_id", reference)?;
    let valid = Regex::new(REFERENCE_PATTERN).map(|re| re.is_match(reference)).unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::invalid("order_id", format!("'{reference}' is not a valid order reference")))
    }
}

impl NewPaymentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("school_id", &self.school_id)?;
        require("trustee_id", &self.trustee_id)?;
        require("gateway_name", &self.gateway_name)?;
        require("payment_mode", &self.payment_mode)?;
        require("student_info.name", &self.student_info.name)?;
        require("student_info.id", &self.student_info.external_id)?;
        require("student_info.email", &self.student_info.email)?;
        if !is_valid_email(&self.student_info.email) {
            return Err(ValidationError::invalid("student_info.email", "not a valid email address"));
        }
        if !self.order_amount.is_positive() {
            return Err(ValidationError::invalid("order_amount", "must be greater than zero"));
        }
        Ok(())
    }
}

fn parse_number(field: &'static str, value: Option<&str>, default: u32) -> Result<u32, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse::<u32>().map_err(|e| ValidationError::invalid(field, format!("'{v}': {e}"))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses an RFC 3339 timestamp, or a bare `YYYY-MM-DD` date. A bare date is taken as the start of the day, or as the
/// last instant of the day when `end_of_day` is set, so that `date_to=2025-04-23` includes all of the 23rd.
pub fn parse_date_bound(
    field: &'static str,
    value: &str,
    end_of_day: bool,
) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid(field, format!("'{value}' is not an RFC 3339 timestamp or a date")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ValidationError::invalid(field, "could not construct time of day"))?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

fn parse_sort_field(value: &str) -> Result<SortField, ValidationError> {
    match value {
        "last_updated_at" | "payment_time" => Ok(SortField::LastUpdatedAt),
        "created_at" => Ok(SortField::CreatedAt),
        "order_amount" => Ok(SortField::OrderAmount),
        "transaction_amount" => Ok(SortField::TransactionAmount),
        "status" => Ok(SortField::Status),
        "school_id" => Ok(SortField::SchoolId),
        "order_id" => Ok(SortField::OrderId),
        _ => Err(ValidationError::invalid("sort", format!("cannot sort by '{value}'"))),
    }
}

fn parse_sort_order(value: &str) -> Result<SortOrder, ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(ValidationError::invalid("order", format!("'{value}' must be 'asc' or 'desc'"))),
    }
}

impl TryFrom<TransactionQueryParams> for TransactionQuery {
    type Error = ValidationError;

    fn try_from(params: TransactionQueryParams) -> Result<Self, Self::Error> {
        let page = parse_number("page", params.page.as_deref(), 1)?;
        if page < 1 {
            return Err(ValidationError::invalid("page", "must be at least 1"));
        }
        let limit = parse_number("limit", params.limit.as_deref(), DEFAULT_PAGE_SIZE)?;
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ValidationError::invalid("limit", format!("must be between 1 and {MAX_PAGE_SIZE}")));
        }
        let sort = non_blank(params.sort).map(|s| parse_sort_field(&s)).transpose()?.unwrap_or_default();
        let order = non_blank(params.order).map(|s| parse_sort_order(&s)).transpose()?.unwrap_or_default();
        let status = non_blank(params.status)
            .map(|s| s.parse::<PaymentStatus>().map_err(|e| ValidationError::invalid("status", e.to_string())))
            .transpose()?;
        let school_id = non_blank(params.school_id);
        let date_from = non_blank(params.date_from).map(|d| parse_date_bound("date_from", &d, false)).transpose()?;
        let date_to = non_blank(params.date_to).map(|d| parse_date_bound("date_to", &d, true)).transpose()?;
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(ValidationError::invalid("date_from", "must not be after date_to"));
            }
        }
        Ok(Self { page, limit, sort, order, status, school_id, date_from, date_to })
    }
}
