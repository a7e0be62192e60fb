use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date cell format used in every collection (e.g. `01/03/2024`)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Time cell format used in every collection, 24-hour clock (e.g. `08:00`)
pub const TIME_FORMAT: &str = "%H:%M";

/// Column names shared by the stored collections
pub mod columns {
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Heure";
    pub const NOTES: &str = "Notes";
    pub const TYPE: &str = "Type";
    pub const QUANTITY: &str = "Quantite";
    pub const START: &str = "Debut";
    pub const END: &str = "Fin";
    pub const ARRIVAL: &str = "Arrivee";
    pub const DEPARTURE: &str = "Depart";
    pub const DURATION: &str = "Duree";
    pub const MEDICATION: &str = "Medicament";
    pub const ADMINISTERED: &str = "Administre";
    pub const APPOINTMENT: &str = "Type_RDV";
    pub const WEIGHT: &str = "Poids";
    pub const HEIGHT: &str = "Taille";
    pub const TEMPERATURE: &str = "Temperature";
}

/// One kind of logged activity. Each category is stored in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Feeding,
    DiaperChange,
    Sleep,
    Bath,
    Medication,
    HealthMeasurement,
    Daycare,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Feeding,
        Category::DiaperChange,
        Category::Sleep,
        Category::Bath,
        Category::Medication,
        Category::HealthMeasurement,
        Category::Daycare,
    ];

    /// Name of the collection (worksheet) holding this category's rows
    pub fn collection_name(&self) -> &'static str {
        match self {
            Category::Feeding => "Repas",
            Category::DiaperChange => "Changes",
            Category::Sleep => "Sommeil",
            Category::Bath => "Bain",
            Category::Medication => "Medicaments",
            Category::HealthMeasurement => "Sante",
            Category::Daycare => "Creche",
        }
    }

    /// Columns written for this category, in order
    pub fn columns(&self) -> &'static [&'static str] {
        use columns::*;
        match self {
            Category::Feeding => &[DATE, TIME, QUANTITY, TYPE, NOTES],
            Category::DiaperChange => &[DATE, TIME, TYPE, NOTES],
            Category::Sleep => &[DATE, START, END, DURATION, NOTES],
            Category::Bath => &[DATE, TIME, NOTES],
            Category::Medication => &[DATE, TIME, MEDICATION, ADMINISTERED, NOTES],
            Category::HealthMeasurement => {
                &[DATE, TIME, APPOINTMENT, WEIGHT, HEIGHT, TEMPERATURE, NOTES]
            }
            Category::Daycare => &[DATE, ARRIVAL, DEPARTURE, DURATION, NOTES],
        }
    }

    /// Column holding the clock time that marks when the event happened
    pub fn event_time_column(&self) -> &'static str {
        match self {
            Category::Sleep => columns::START,
            Category::Daycare => columns::ARRIVAL,
            _ => columns::TIME,
        }
    }

    pub fn has_duration(&self) -> bool {
        matches!(self, Category::Sleep | Category::Daycare)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Category::Feeding => "Feeding",
            Category::DiaperChange => "DiaperChange",
            Category::Sleep => "Sleep",
            Category::Bath => "Bath",
            Category::Medication => "Medication",
            Category::HealthMeasurement => "HealthMeasurement",
            Category::Daycare => "Daycare",
        };
        write!(f, "{}", name)
    }
}

/// Error returned when a stored label does not match any known variant
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown {} label: '{}'", self.kind, self.label)
    }
}

impl std::error::Error for UnknownLabel {}

/// How the baby was fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedingKind {
    Breastfeeding,
    FormulaBottle,
    BreastmilkBottle,
    Weaning,
}

impl FeedingKind {
    /// Marker stored in the quantity column for breastfeeding
    pub const BREASTFEEDING_SENTINEL: &'static str = "Tétée";

    pub fn label(&self) -> &'static str {
        match self {
            FeedingKind::Breastfeeding => "Tétée (Sein)",
            FeedingKind::FormulaBottle => "Biberon (Infantile)",
            FeedingKind::BreastmilkBottle => "Biberon (Maternel)",
            FeedingKind::Weaning => "Diversification",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, UnknownLabel> {
        match label.trim() {
            "Tétée (Sein)" => Ok(FeedingKind::Breastfeeding),
            "Biberon (Infantile)" => Ok(FeedingKind::FormulaBottle),
            "Biberon (Maternel)" => Ok(FeedingKind::BreastmilkBottle),
            "Diversification" => Ok(FeedingKind::Weaning),
            other => Err(UnknownLabel {
                kind: "feeding",
                label: other.to_string(),
            }),
        }
    }

    pub fn is_bottle(&self) -> bool {
        matches!(self, FeedingKind::FormulaBottle | FeedingKind::BreastmilkBottle)
    }
}

/// Diaper content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiaperContent {
    Urine,
    Stool,
    Both,
    None,
}

impl DiaperContent {
    pub fn label(&self) -> &'static str {
        match self {
            DiaperContent::Urine => "Urine",
            DiaperContent::Stool => "Selles",
            DiaperContent::Both => "Les deux",
            DiaperContent::None => "Rien",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, UnknownLabel> {
        match label.trim() {
            "Urine" => Ok(DiaperContent::Urine),
            "Selles" => Ok(DiaperContent::Stool),
            "Les deux" => Ok(DiaperContent::Both),
            "Rien" => Ok(DiaperContent::None),
            other => Err(UnknownLabel {
                kind: "diaper",
                label: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub kind: FeedingKind,
    /// Amount in millilitres; always `None` for breastfeeding
    pub amount_ml: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaperRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub content: DiaperContent,
    pub notes: Option<String>,
}

/// A sleep or daycare period. `duration` is formatted once when the record
/// is created and is never recomputed from `start`/`end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub duration: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BathRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub name: String,
    pub administered: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    /// Kind of appointment, "Suivi" for routine follow-up
    pub appointment_kind: String,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
}

impl HealthRecord {
    pub const DEFAULT_APPOINTMENT: &'static str = "Suivi";
}

/// One logged event within a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivityRecord {
    Feeding(FeedingRecord),
    DiaperChange(DiaperRecord),
    Sleep(SpanRecord),
    Bath(BathRecord),
    Medication(MedicationRecord),
    HealthMeasurement(HealthRecord),
    Daycare(SpanRecord),
}

impl ActivityRecord {
    pub fn category(&self) -> Category {
        match self {
            ActivityRecord::Feeding(_) => Category::Feeding,
            ActivityRecord::DiaperChange(_) => Category::DiaperChange,
            ActivityRecord::Sleep(_) => Category::Sleep,
            ActivityRecord::Bath(_) => Category::Bath,
            ActivityRecord::Medication(_) => Category::Medication,
            ActivityRecord::HealthMeasurement(_) => Category::HealthMeasurement,
            ActivityRecord::Daycare(_) => Category::Daycare,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ActivityRecord::Feeding(r) => r.date,
            ActivityRecord::DiaperChange(r) => r.date,
            ActivityRecord::Sleep(r) | ActivityRecord::Daycare(r) => r.date,
            ActivityRecord::Bath(r) => r.date,
            ActivityRecord::Medication(r) => r.date,
            ActivityRecord::HealthMeasurement(r) => r.date,
        }
    }

    /// Clock time of the event; spans report their start
    pub fn event_time(&self) -> Option<NaiveTime> {
        match self {
            ActivityRecord::Feeding(r) => Some(r.time),
            ActivityRecord::DiaperChange(r) => Some(r.time),
            ActivityRecord::Sleep(r) | ActivityRecord::Daycare(r) => Some(r.start),
            ActivityRecord::Bath(r) => Some(r.time),
            ActivityRecord::Medication(r) => Some(r.time),
            ActivityRecord::HealthMeasurement(r) => r.time,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        let notes = match self {
            ActivityRecord::Feeding(r) => &r.notes,
            ActivityRecord::DiaperChange(r) => &r.notes,
            ActivityRecord::Sleep(r) | ActivityRecord::Daycare(r) => &r.notes,
            ActivityRecord::Bath(r) => &r.notes,
            ActivityRecord::Medication(r) => &r.notes,
            ActivityRecord::HealthMeasurement(r) => &r.notes,
        };
        notes.as_deref()
    }
}

/// Raw feeding input. The amount is signed so negative entries can be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingFields {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub kind: FeedingKind,
    pub amount_ml: Option<i64>,
    pub notes: Option<String>,
}

/// Raw sleep or daycare input; the duration is derived on append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanFields {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFields {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub appointment_kind: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub notes: Option<String>,
}

/// Input for appending one record to a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NewActivity {
    Feeding(FeedingFields),
    DiaperChange(DiaperRecord),
    Sleep(SpanFields),
    Bath(BathRecord),
    Medication(MedicationRecord),
    HealthMeasurement(HealthFields),
    Daycare(SpanFields),
}

impl NewActivity {
    pub fn category(&self) -> Category {
        match self {
            NewActivity::Feeding(_) => Category::Feeding,
            NewActivity::DiaperChange(_) => Category::DiaperChange,
            NewActivity::Sleep(_) => Category::Sleep,
            NewActivity::Bath(_) => Category::Bath,
            NewActivity::Medication(_) => Category::Medication,
            NewActivity::HealthMeasurement(_) => Category::HealthMeasurement,
            NewActivity::Daycare(_) => Category::Daycare,
        }
    }
}

/// A non-negative elapsed time with whole-minute display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElapsedTime {
    total_seconds: i64,
}

impl ElapsedTime {
    pub const SECONDS_PER_DAY: i64 = 24 * 3600;

    /// Negative inputs are floored at zero
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            total_seconds: seconds.max(0),
        }
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_seconds
    }

    /// Whole hours, truncated
    pub fn hours(&self) -> i64 {
        self.total_seconds / 3600
    }

    /// Whole minutes past the hour, truncated
    pub fn minutes(&self) -> i64 {
        (self.total_seconds % 3600) / 60
    }

    pub fn exceeds_day(&self) -> bool {
        self.total_seconds > Self::SECONDS_PER_DAY
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}h {}min", self.hours(), self.minutes())
    }
}

/// Why no elapsed time could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unavailable {
    NoRecord,
    ParseError,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unavailable::NoRecord => write!(f, "no record"),
            Unavailable::ParseError => write!(f, "parse error"),
        }
    }
}

/// Answer to "how long since the last event in this category"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSinceLast {
    Elapsed(ElapsedTime),
    /// Only produced when collapsing past 24 hours is enabled
    MoreThanADay(ElapsedTime),
    Unavailable(Unavailable),
}

impl TimeSinceLast {
    pub fn elapsed(&self) -> Option<ElapsedTime> {
        match self {
            TimeSinceLast::Elapsed(e) | TimeSinceLast::MoreThanADay(e) => Some(*e),
            TimeSinceLast::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for TimeSinceLast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeSinceLast::Elapsed(e) => write!(f, "{}", e),
            TimeSinceLast::MoreThanADay(_) => write!(f, "more than a day"),
            TimeSinceLast::Unavailable(reason) => write!(f, "{}", reason),
        }
    }
}

/// Latest state of one category, as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub time_since_last: TimeSinceLast,
    pub recent: Vec<ActivityRecord>,
}
