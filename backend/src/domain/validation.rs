//! Input validation and normalization for new activity records.
//!
//! Everything here runs before the store is touched. A record that comes
//! out of [`ActivityValidator::build_record`] is exactly what will be read
//! back from the store: times are cut to the minute, notes are trimmed,
//! decimals are rounded to their stored precision and span durations are
//! computed once.

use chrono::{NaiveTime, Timelike};
use shared::{
    ActivityRecord, FeedingFields, FeedingKind, FeedingRecord, HealthFields, HealthRecord,
    MedicationRecord, NewActivity, SpanFields, SpanRecord,
};
use thiserror::Error;

use super::elapsed::span_length;
use super::policy::SpanPolicy;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Amount cannot be negative (got {0} ml)")]
    NegativeAmount(i64),
    #[error("Amount is too large (got {0} ml)")]
    AmountTooLarge(i64),
    #[error("An amount is required for {0:?}")]
    MissingAmount(FeedingKind),
    #[error("End time {end} is before start time {start}")]
    EndBeforeStart { start: NaiveTime, end: NaiveTime },
    #[error("Medication name cannot be empty")]
    EmptyMedicationName,
    #[error("{field} cannot be negative (got {value})")]
    NegativeMeasurement { field: &'static str, value: f64 },
    #[error("{field} must be a finite number")]
    NonFiniteMeasurement { field: &'static str },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityValidator {
    span_policy: SpanPolicy,
}

impl ActivityValidator {
    pub fn new(span_policy: SpanPolicy) -> Self {
        Self { span_policy }
    }

    /// Validate input fields and build the record to be stored
    pub fn build_record(&self, activity: NewActivity) -> Result<ActivityRecord, ValidationError> {
        let record = match activity {
            NewActivity::Feeding(fields) => ActivityRecord::Feeding(Self::feeding(fields)?),
            NewActivity::DiaperChange(mut record) => {
                record.time = truncate_to_minute(record.time);
                record.notes = clean_notes(record.notes);
                ActivityRecord::DiaperChange(record)
            }
            NewActivity::Sleep(fields) => ActivityRecord::Sleep(self.span(fields)?),
            NewActivity::Bath(mut record) => {
                record.time = truncate_to_minute(record.time);
                record.notes = clean_notes(record.notes);
                ActivityRecord::Bath(record)
            }
            NewActivity::Medication(record) => {
                ActivityRecord::Medication(Self::medication(record)?)
            }
            NewActivity::HealthMeasurement(fields) => {
                ActivityRecord::HealthMeasurement(Self::health(fields)?)
            }
            NewActivity::Daycare(fields) => ActivityRecord::Daycare(self.span(fields)?),
        };
        Ok(record)
    }

    fn feeding(fields: FeedingFields) -> Result<FeedingRecord, ValidationError> {
        let amount_ml = match (fields.kind, fields.amount_ml) {
            // No measurable amount when breastfeeding
            (FeedingKind::Breastfeeding, _) => None,
            (kind, None) if kind.is_bottle() => return Err(ValidationError::MissingAmount(kind)),
            (_, None) => None,
            (_, Some(amount)) if amount < 0 => return Err(ValidationError::NegativeAmount(amount)),
            (_, Some(amount)) => Some(
                u32::try_from(amount).map_err(|_| ValidationError::AmountTooLarge(amount))?,
            ),
        };

        Ok(FeedingRecord {
            date: fields.date,
            time: truncate_to_minute(fields.time),
            kind: fields.kind,
            amount_ml,
            notes: clean_notes(fields.notes),
        })
    }

    fn span(&self, fields: SpanFields) -> Result<SpanRecord, ValidationError> {
        let start = truncate_to_minute(fields.start);
        let end = truncate_to_minute(fields.end);

        if end < start && self.span_policy == SpanPolicy::Reject {
            return Err(ValidationError::EndBeforeStart { start, end });
        }

        let duration = span_length(start, end, self.span_policy == SpanPolicy::WrapMidnight);

        Ok(SpanRecord {
            date: fields.date,
            start,
            end,
            duration: duration.to_string(),
            notes: clean_notes(fields.notes),
        })
    }

    fn medication(record: MedicationRecord) -> Result<MedicationRecord, ValidationError> {
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyMedicationName);
        }

        Ok(MedicationRecord {
            date: record.date,
            time: truncate_to_minute(record.time),
            name,
            administered: record.administered,
            notes: clean_notes(record.notes),
        })
    }

    fn health(fields: HealthFields) -> Result<HealthRecord, ValidationError> {
        let appointment_kind = fields
            .appointment_kind
            .map(|kind| kind.trim().to_string())
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| HealthRecord::DEFAULT_APPOINTMENT.to_string());

        Ok(HealthRecord {
            date: fields.date,
            time: fields.time.map(truncate_to_minute),
            appointment_kind,
            weight_kg: measurement("Weight", fields.weight_kg, 2)?,
            height_cm: measurement("Height", fields.height_cm, 1)?,
            temperature_c: measurement("Temperature", fields.temperature_c, 1)?,
            notes: clean_notes(fields.notes),
        })
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Check a measurement and round it to the number of decimals it is stored with
fn measurement(
    field: &'static str,
    value: Option<f64>,
    decimals: i32,
) -> Result<Option<f64>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteMeasurement { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeMeasurement { field, value });
    }
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    if !rounded.is_finite() {
        return Err(ValidationError::NonFiniteMeasurement { field });
    }
    Ok(Some(rounded))
}
