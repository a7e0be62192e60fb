//! Mapping between activity records and store rows.
//!
//! Rows use the column layout and cell encodings of the existing stored
//! collections (French column names, `DD/MM/YYYY` dates, `HH:MM` times).

use shared::{
    columns, ActivityRecord, BathRecord, Category, DiaperContent, DiaperRecord, FeedingKind,
    FeedingRecord, HealthRecord, MedicationRecord, SpanRecord, DATE_FORMAT, TIME_FORMAT,
};

use super::elapsed::{parse_date, parse_time};
use crate::storage::Row;

const ADMINISTERED_YES: &str = "Oui";
const ADMINISTERED_NO: &str = "Non";

pub struct RowMapper;

impl RowMapper {
    pub fn to_row(record: &ActivityRecord) -> Row {
        let row = Row::new().with(columns::DATE, record.date().format(DATE_FORMAT).to_string());

        let row = match record {
            ActivityRecord::Feeding(r) => row
                .with(columns::TIME, r.time.format(TIME_FORMAT).to_string())
                .with(columns::QUANTITY, Self::quantity_cell(r))
                .with(columns::TYPE, r.kind.label()),
            ActivityRecord::DiaperChange(r) => row
                .with(columns::TIME, r.time.format(TIME_FORMAT).to_string())
                .with(columns::TYPE, r.content.label()),
            ActivityRecord::Sleep(r) => row
                .with(columns::START, r.start.format(TIME_FORMAT).to_string())
                .with(columns::END, r.end.format(TIME_FORMAT).to_string())
                .with(columns::DURATION, r.duration.as_str()),
            ActivityRecord::Bath(r) => {
                row.with(columns::TIME, r.time.format(TIME_FORMAT).to_string())
            }
            ActivityRecord::Medication(r) => row
                .with(columns::TIME, r.time.format(TIME_FORMAT).to_string())
                .with(columns::MEDICATION, r.name.as_str())
                .with(
                    columns::ADMINISTERED,
                    if r.administered { ADMINISTERED_YES } else { ADMINISTERED_NO },
                ),
            ActivityRecord::HealthMeasurement(r) => row
                .with(
                    columns::TIME,
                    r.time.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default(),
                )
                .with(columns::APPOINTMENT, r.appointment_kind.as_str())
                .with(columns::WEIGHT, decimal_cell(r.weight_kg, 2))
                .with(columns::HEIGHT, decimal_cell(r.height_cm, 1))
                .with(columns::TEMPERATURE, decimal_cell(r.temperature_c, 1)),
            ActivityRecord::Daycare(r) => row
                .with(columns::ARRIVAL, r.start.format(TIME_FORMAT).to_string())
                .with(columns::DEPARTURE, r.end.format(TIME_FORMAT).to_string())
                .with(columns::DURATION, r.duration.as_str()),
        };

        row.with(columns::NOTES, record.notes().unwrap_or(""))
    }

    /// Rebuild a record from a stored row. The error is a human readable reason.
    pub fn from_row(category: Category, row: &Row) -> Result<ActivityRecord, String> {
        let date = required(row, columns::DATE)
            .and_then(|v| parse_date(v).ok_or_else(|| format!("invalid date '{}'", v)))?;
        let notes = optional(row, columns::NOTES).map(str::to_string);

        let record = match category {
            Category::Feeding => {
                let kind = FeedingKind::from_label(required(row, columns::TYPE)?)
                    .map_err(|e| e.to_string())?;
                ActivityRecord::Feeding(FeedingRecord {
                    date,
                    time: time_cell(row, columns::TIME)?,
                    kind,
                    amount_ml: Self::parse_quantity(kind, optional(row, columns::QUANTITY))?,
                    notes,
                })
            }
            Category::DiaperChange => ActivityRecord::DiaperChange(DiaperRecord {
                date,
                time: time_cell(row, columns::TIME)?,
                content: DiaperContent::from_label(required(row, columns::TYPE)?)
                    .map_err(|e| e.to_string())?,
                notes,
            }),
            Category::Sleep => {
                ActivityRecord::Sleep(span(row, date, columns::START, columns::END, notes)?)
            }
            Category::Bath => ActivityRecord::Bath(BathRecord {
                date,
                time: time_cell(row, columns::TIME)?,
                notes,
            }),
            Category::Medication => ActivityRecord::Medication(MedicationRecord {
                date,
                time: time_cell(row, columns::TIME)?,
                name: required(row, columns::MEDICATION)?.to_string(),
                administered: parse_administered(optional(row, columns::ADMINISTERED))?,
                notes,
            }),
            Category::HealthMeasurement => ActivityRecord::HealthMeasurement(HealthRecord {
                date,
                time: match optional(row, columns::TIME) {
                    Some(v) => Some(parse_time(v).ok_or_else(|| format!("invalid time '{}'", v))?),
                    None => None,
                },
                appointment_kind: optional(row, columns::APPOINTMENT)
                    .unwrap_or(HealthRecord::DEFAULT_APPOINTMENT)
                    .to_string(),
                weight_kg: parse_decimal(row, columns::WEIGHT)?,
                height_cm: parse_decimal(row, columns::HEIGHT)?,
                temperature_c: parse_decimal(row, columns::TEMPERATURE)?,
                notes,
            }),
            Category::Daycare => {
                let record = span(row, date, columns::ARRIVAL, columns::DEPARTURE, notes)?;
                ActivityRecord::Daycare(record)
            }
        };

        Ok(record)
    }

    fn quantity_cell(record: &FeedingRecord) -> String {
        match (record.kind, record.amount_ml) {
            (FeedingKind::Breastfeeding, _) => FeedingKind::BREASTFEEDING_SENTINEL.to_string(),
            (_, Some(amount)) => amount.to_string(),
            (_, None) => String::new(),
        }
    }

    fn parse_quantity(kind: FeedingKind, cell: Option<&str>) -> Result<Option<u32>, String> {
        if kind == FeedingKind::Breastfeeding {
            return Ok(None);
        }
        let Some(cell) = cell else {
            return Ok(None);
        };
        if cell == FeedingKind::BREASTFEEDING_SENTINEL {
            return Ok(None);
        }
        if let Ok(amount) = cell.parse::<u32>() {
            return Ok(Some(amount));
        }
        // Spreadsheets hand integers back as floats ("120.0")
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                Ok(Some(v as u32))
            }
            _ => Err(format!("invalid quantity '{}'", cell)),
        }
    }
}

/// A trimmed, non-empty cell
fn optional<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(row: &'a Row, column: &str) -> Result<&'a str, String> {
    optional(row, column).ok_or_else(|| format!("missing '{}'", column))
}

fn time_cell(row: &Row, column: &str) -> Result<chrono::NaiveTime, String> {
    let value = required(row, column)?;
    parse_time(value).ok_or_else(|| format!("invalid time '{}' in '{}'", value, column))
}

fn span(
    row: &Row,
    date: chrono::NaiveDate,
    start_column: &str,
    end_column: &str,
    notes: Option<String>,
) -> Result<SpanRecord, String> {
    Ok(SpanRecord {
        date,
        start: time_cell(row, start_column)?,
        end: time_cell(row, end_column)?,
        // Stored as entered; never recomputed
        duration: optional(row, columns::DURATION).unwrap_or("").to_string(),
        notes,
    })
}

fn parse_administered(cell: Option<&str>) -> Result<bool, String> {
    match cell {
        Some(v) if v.eq_ignore_ascii_case(ADMINISTERED_YES) || v.eq_ignore_ascii_case("true") => {
            Ok(true)
        }
        Some(v) if v.eq_ignore_ascii_case(ADMINISTERED_NO) || v.eq_ignore_ascii_case("false") => {
            Ok(false)
        }
        None => Ok(false),
        Some(v) => Err(format!("invalid administered flag '{}'", v)),
    }
}

fn decimal_cell(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

fn parse_decimal(row: &Row, column: &str) -> Result<Option<f64>, String> {
    match optional(row, column) {
        // Decimal commas show up when the sheet uses a French locale
        Some(v) => v
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("invalid number '{}' in '{}'", v, column)),
        None => Ok(None),
    }
}
