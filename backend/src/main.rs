use std::path::PathBuf;

use baby_tracker::initialize_backend;
use shared::{ActivityRecord, CategorySummary, FeedingKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the data directory
const DATA_DIR_ENV: &str = "BABY_TRACKER_DATA_DIR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_directory = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(DATA_DIR_ENV).ok())
        .map(PathBuf::from);

    let state = initialize_backend(data_directory.as_deref())?;
    let now = state.config.now();
    info!("Building status report at {}", now.format("%d/%m/%Y %H:%M"));

    let summaries = state
        .activity_log
        .summary(now, state.config.recent_count)
        .await?;

    for summary in &summaries {
        print_summary(summary);
    }

    Ok(())
}

fn print_summary(summary: &CategorySummary) {
    println!("{}: last {}", summary.category, summary.time_since_last);
    for record in &summary.recent {
        println!("    {}", describe(record));
    }
}

fn describe(record: &ActivityRecord) -> String {
    let when = match record.event_time() {
        Some(time) => format!("{} {}", record.date().format("%d/%m/%Y"), time.format("%H:%M")),
        None => record.date().format("%d/%m/%Y").to_string(),
    };

    let what = match record {
        ActivityRecord::Feeding(r) => match (r.kind, r.amount_ml) {
            (FeedingKind::Breastfeeding, _) | (_, None) => r.kind.label().to_string(),
            (_, Some(ml)) => format!("{} {} ml", r.kind.label(), ml),
        },
        ActivityRecord::DiaperChange(r) => r.content.label().to_string(),
        ActivityRecord::Sleep(r) | ActivityRecord::Daycare(r) => format!(
            "{} → {} ({})",
            r.start.format("%H:%M"),
            r.end.format("%H:%M"),
            r.duration
        ),
        ActivityRecord::Bath(_) => "bath".to_string(),
        ActivityRecord::Medication(r) => format!(
            "{} ({})",
            r.name,
            if r.administered { "given" } else { "not given" }
        ),
        ActivityRecord::HealthMeasurement(r) => {
            let mut parts = vec![r.appointment_kind.clone()];
            if let Some(w) = r.weight_kg {
                parts.push(format!("{:.2} kg", w));
            }
            if let Some(h) = r.height_cm {
                parts.push(format!("{:.1} cm", h));
            }
            if let Some(t) = r.temperature_c {
                parts.push(format!("{:.1} °C", t));
            }
            parts.join(", ")
        }
    };

    match record.notes() {
        Some(notes) => format!("{}  {}  ({})", when, what, notes),
        None => format!("{}  {}", when, what),
    }
}
