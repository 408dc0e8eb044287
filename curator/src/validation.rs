//! Request body validation.
//!
//! Runs before any workspace exists, so a rejected request never touches the
//! filesystem or spawns a process. Signal records are opaque here; only the
//! outer shape is checked.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::GenerationError;

pub const SIGNALS_MESSAGE: &str = "`signals` must be an array of signal objects.";
pub const BODY_MESSAGE: &str = "Request body must be a JSON object.";

/// Wire format for `referenceDate`, and for `--today` on the pipeline side.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub signals: Vec<Value>,
    pub reference_date: Option<NaiveDate>,
}

/// Check a decoded request body.
///
/// `referenceDate` is also accepted under its older name `today`; when both
/// are present `referenceDate` wins.
pub fn validate_request(body: Value) -> Result<ValidatedRequest, GenerationError> {
    let Value::Object(mut fields) = body else {
        return Err(GenerationError::Validation(BODY_MESSAGE.to_string()));
    };

    let signals = match fields.remove("signals") {
        Some(Value::Array(signals)) => signals,
        _ => return Err(GenerationError::Validation(SIGNALS_MESSAGE.to_string())),
    };

    let date_field = fields
        .remove("referenceDate")
        .filter(|v| !v.is_null())
        .or_else(|| fields.remove("today"));
    let reference_date = parse_reference_date(date_field)?;

    Ok(ValidatedRequest {
        signals,
        reference_date,
    })
}

fn parse_reference_date(value: Option<Value>) -> Result<Option<NaiveDate>, GenerationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => {
            // chrono accepts unpadded fields; the pipeline only takes the strict form.
            if raw.len() != 10 {
                return Err(invalid_date(&raw));
            }
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map(Some)
                .map_err(|_| invalid_date(&raw))
        }
        Some(_) => Err(GenerationError::Validation(
            "`referenceDate` must be an ISO date string (YYYY-MM-DD).".to_string(),
        )),
    }
}

fn invalid_date(raw: &str) -> GenerationError {
    GenerationError::Validation(format!(
        "`referenceDate` must be an ISO date (YYYY-MM-DD), got {raw:?}."
    ))
}
