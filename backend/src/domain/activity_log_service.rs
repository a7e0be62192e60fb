//! Activity log service: append, remove the most recent entry, and report
//! recent entries and the time since the last one, per category.
//!
//! Every mutation is a whole-collection read, an in-memory change and a
//! whole-collection write. Under [`ConcurrencyPolicy::LastWriterWins`] two
//! callers appending at the same time both read the old rows and the later
//! write silently drops the other's new row. [`ConcurrencyPolicy::OptimisticRetry`]
//! closes that gap on stores that track versions.

use chrono::NaiveDateTime;
use log::{info, warn};
use shared::{ActivityRecord, Category, CategorySummary, NewActivity, TimeSinceLast, Unavailable};
use std::sync::Arc;
use thiserror::Error;

use super::elapsed::time_since_row;
use super::policy::{ConcurrencyPolicy, LogPolicy};
use super::row_mapper::RowMapper;
use super::validation::{ActivityValidator, ValidationError};
use crate::storage::{Row, StoreError, TabularStore};

#[derive(Debug, Error)]
pub enum ActivityLogError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ActivityLogService<S: TabularStore + ?Sized> {
    store: Arc<S>,
    validator: ActivityValidator,
    policy: LogPolicy,
}

impl<S: TabularStore + ?Sized> Clone for ActivityLogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            validator: self.validator,
            policy: self.policy,
        }
    }
}

impl<S: TabularStore + ?Sized> ActivityLogService<S> {
    pub fn new(store: Arc<S>, policy: LogPolicy) -> Self {
        Self {
            store,
            validator: ActivityValidator::new(policy.span_policy),
            policy,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> LogPolicy {
        self.policy
    }

    /// Validate and append one record to the end of its category.
    ///
    /// Returns the record as stored. Nothing is queued on failure: if the
    /// store write fails the entry is lost unless the caller submits it again.
    pub async fn append(&self, activity: NewActivity) -> Result<ActivityRecord, ActivityLogError> {
        let category = activity.category();
        let record = self.validator.build_record(activity)?;
        let row = RowMapper::to_row(&record);

        self.modify(category, |rows| {
            rows.push(row.clone());
            true
        })
        .await?;

        info!("Appended {} record dated {}", category, record.date());
        Ok(record)
    }

    /// Remove the most recently appended record of a category.
    ///
    /// Returns `false` without writing when the category is empty.
    pub async fn remove_last(&self, category: Category) -> Result<bool, ActivityLogError> {
        let removed = self.modify(category, |rows| rows.pop().is_some()).await?;

        if removed {
            info!("Removed last {} record", category);
        } else {
            info!("No {} record to remove", category);
        }
        Ok(removed)
    }

    /// Time between the last appended record of a category and `reference`.
    ///
    /// "Last" is append order, not the latest date. Empty categories and
    /// unparsable rows are reported as unavailable; store failures are errors.
    pub async fn time_since_last(
        &self,
        category: Category,
        reference: NaiveDateTime,
    ) -> Result<TimeSinceLast, StoreError> {
        let rows = self.store.read(category.collection_name()).await?;
        Ok(self.time_since_in(category, &rows, reference))
    }

    /// Up to `n` records from the end of a category, in append order
    pub async fn list_recent(
        &self,
        category: Category,
        n: usize,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let rows = self.store.read(category.collection_name()).await?;
        Self::recent_in(category, &rows, n)
    }

    /// Time since last and recent records for every category
    pub async fn summary(
        &self,
        reference: NaiveDateTime,
        n: usize,
    ) -> Result<Vec<CategorySummary>, StoreError> {
        let mut summaries = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let rows = self.store.read(category.collection_name()).await?;
            summaries.push(CategorySummary {
                category,
                time_since_last: self.time_since_in(category, &rows, reference),
                recent: Self::recent_in(category, &rows, n)?,
            });
        }
        Ok(summaries)
    }

    fn time_since_in(
        &self,
        category: Category,
        rows: &[Row],
        reference: NaiveDateTime,
    ) -> TimeSinceLast {
        match rows.last() {
            None => TimeSinceLast::Unavailable(Unavailable::NoRecord),
            Some(row) => {
                let result =
                    time_since_row(category, row, reference, self.policy.collapse_after_day);
                if result == TimeSinceLast::Unavailable(Unavailable::ParseError) {
                    warn!("Last {} row has an unreadable date or time", category);
                }
                result
            }
        }
    }

    fn recent_in(
        category: Category,
        rows: &[Row],
        n: usize,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let start = rows.len().saturating_sub(n);
        rows[start..]
            .iter()
            .enumerate()
            .map(|(offset, row)| {
                RowMapper::from_row(category, row).map_err(|reason| StoreError::MalformedRow {
                    collection: category.collection_name().to_string(),
                    index: start + offset,
                    reason,
                })
            })
            .collect()
    }

    /// Read a category, apply `change`, and write it back if `change`
    /// returned true. Returns whether a write happened.
    async fn modify<F>(&self, category: Category, change: F) -> Result<bool, StoreError>
    where
        F: Fn(&mut Vec<Row>) -> bool + Send + Sync,
    {
        let collection = category.collection_name();

        match self.policy.concurrency {
            ConcurrencyPolicy::LastWriterWins => {
                // Versioned reads skip any read cache
                let mut rows = self.store.read_versioned(collection).await?.value;
                if !change(&mut rows) {
                    return Ok(false);
                }
                self.store.write(collection, &rows).await?;
                Ok(true)
            }
            ConcurrencyPolicy::OptimisticRetry { max_attempts } => {
                let attempts = max_attempts.max(1);
                for attempt in 1..=attempts {
                    let snapshot = self.store.read_versioned(collection).await?;
                    let mut rows = snapshot.value;
                    if !change(&mut rows) {
                        return Ok(false);
                    }
                    match self
                        .store
                        .write_if_version(collection, &rows, snapshot.version)
                        .await
                    {
                        Ok(()) => return Ok(true),
                        Err(StoreError::VersionMismatch { .. }) => {
                            warn!(
                                "Collection '{}' changed during update (attempt {}/{})",
                                collection, attempt, attempts
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::SpanPolicy;
    use crate::storage::{CachePolicy, CachedStore, MemoryStore, Versioned};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use shared::{
        BathRecord, DiaperContent, DiaperRecord, ElapsedTime, FeedingFields, FeedingKind,
        HealthFields, MedicationRecord, SpanFields,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_time(time(h, m))
    }

    fn bottle(h: u32, m: u32, amount: i64) -> NewActivity {
        NewActivity::Feeding(FeedingFields {
            date: date(1),
            time: time(h, m),
            kind: FeedingKind::FormulaBottle,
            amount_ml: Some(amount),
            notes: None,
        })
    }

    fn diaper(h: u32, m: u32) -> NewActivity {
        NewActivity::DiaperChange(DiaperRecord {
            date: date(1),
            time: time(h, m),
            content: DiaperContent::Urine,
            notes: None,
        })
    }

    fn setup_with(policy: LogPolicy) -> (ActivityLogService<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ActivityLogService::new(Arc::clone(&store), policy), store)
    }

    fn setup() -> (ActivityLogService<MemoryStore>, Arc<MemoryStore>) {
        setup_with(LogPolicy::default())
    }

    #[tokio::test]
    async fn test_feeding_scenario() {
        let (service, _) = setup();

        let stored = service.append(bottle(8, 0, 120)).await.unwrap();

        let recent = service.list_recent(Category::Feeding, 1).await.unwrap();
        assert_eq!(recent, vec![stored.clone()]);
        match &stored {
            ActivityRecord::Feeding(r) => {
                assert_eq!(r.date, date(1));
                assert_eq!(r.time, time(8, 0));
                assert_eq!(r.kind, FeedingKind::FormulaBottle);
                assert_eq!(r.amount_ml, Some(120));
            }
            other => panic!("unexpected record {:?}", other),
        }

        let since = service
            .time_since_last(Category::Feeding, at(1, 9, 30))
            .await
            .unwrap();
        assert_eq!(since.to_string(), "1h 30min");
    }

    #[tokio::test]
    async fn test_append_keeps_order_and_duplicates() {
        let (service, _) = setup();

        service.append(bottle(8, 0, 120)).await.unwrap();
        service.append(bottle(8, 0, 120)).await.unwrap();
        service.append(bottle(6, 0, 90)).await.unwrap();

        let recent = service.list_recent(Category::Feeding, 10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0], recent[1]);
        assert_eq!(recent[2].event_time(), Some(time(6, 0)));
    }

    #[tokio::test]
    async fn test_list_recent_takes_tail() {
        let (service, _) = setup();
        for h in 1..=5 {
            service.append(diaper(h, 0)).await.unwrap();
        }

        let recent = service.list_recent(Category::DiaperChange, 3).await.unwrap();
        let times: Vec<_> = recent.iter().filter_map(|r| r.event_time()).collect();
        assert_eq!(times, vec![time(3, 0), time(4, 0), time(5, 0)]);

        assert!(service.list_recent(Category::DiaperChange, 0).await.unwrap().is_empty());
        assert!(service.list_recent(Category::Bath, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_last_on_empty_is_noop() {
        let (service, store) = setup();

        assert!(!service.remove_last(Category::Sleep).await.unwrap());
        assert!(!service.remove_last(Category::Sleep).await.unwrap());

        assert!(store.read("Sommeil").await.unwrap().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_append_then_remove_restores_rows() {
        let (service, store) = setup();
        service.append(diaper(9, 0)).await.unwrap();
        let before = store.read("Changes").await.unwrap();

        service.append(diaper(12, 30)).await.unwrap();
        assert!(service.remove_last(Category::DiaperChange).await.unwrap());

        assert_eq!(store.read("Changes").await.unwrap(), before);
    }

    /// One valid entry per category, varied by `h` so successive entries differ
    fn sample(category: Category, h: u32) -> NewActivity {
        let notes = Some(format!("entry {}", h));
        match category {
            Category::Feeding => NewActivity::Feeding(FeedingFields {
                date: date(1),
                time: time(h, 0),
                kind: FeedingKind::BreastmilkBottle,
                amount_ml: Some(90),
                notes,
            }),
            Category::DiaperChange => NewActivity::DiaperChange(DiaperRecord {
                date: date(1),
                time: time(h, 5),
                content: DiaperContent::Both,
                notes,
            }),
            Category::Sleep => NewActivity::Sleep(SpanFields {
                date: date(1),
                start: time(h, 0),
                end: time(h + 1, 45),
                notes,
            }),
            Category::Bath => NewActivity::Bath(BathRecord {
                date: date(1),
                time: time(h, 30),
                notes,
            }),
            Category::Medication => NewActivity::Medication(MedicationRecord {
                date: date(1),
                time: time(h, 15),
                name: "Doliprane".to_string(),
                administered: h % 2 == 0,
                notes,
            }),
            Category::HealthMeasurement => NewActivity::HealthMeasurement(HealthFields {
                date: date(1),
                time: Some(time(h, 0)),
                appointment_kind: Some("Pediatre".to_string()),
                weight_kg: Some(4.25),
                height_cm: Some(55.5),
                temperature_c: Some(37.2),
                notes,
            }),
            Category::Daycare => NewActivity::Daycare(SpanFields {
                date: date(1),
                start: time(h, 30),
                end: time(h + 8, 0),
                notes,
            }),
        }
    }

    #[tokio::test]
    async fn test_every_category_round_trips_and_removes() {
        let (service, store) = setup();

        for category in Category::ALL {
            service.append(sample(category, 8)).await.unwrap();
            let before = store.read(category.collection_name()).await.unwrap();

            let stored = service.append(sample(category, 10)).await.unwrap();
            assert_eq!(stored.category(), category);
            assert_eq!(
                service.list_recent(category, 1).await.unwrap(),
                vec![stored],
                "{}",
                category
            );

            assert!(service.remove_last(category).await.unwrap());
            assert_eq!(
                store.read(category.collection_name()).await.unwrap(),
                before,
                "{}",
                category
            );
        }
    }

    #[tokio::test]
    async fn test_append_reads_past_cached_rows() {
        let store = Arc::new(CachedStore::new(
            MemoryStore::new(),
            CachePolicy::with_ttl(Duration::from_secs(600)),
        ));
        let service = ActivityLogService::new(Arc::clone(&store), LogPolicy::default());
        service.append(diaper(8, 0)).await.unwrap();

        // Prime the cache, then let another device append behind it
        assert_eq!(service.list_recent(Category::DiaperChange, 5).await.unwrap().len(), 1);
        let mut rows = store.inner().read("Changes").await.unwrap();
        rows.push(intruder_row());
        store.inner().write("Changes", &rows).await.unwrap();

        service.append(diaper(9, 0)).await.unwrap();

        let rows = store.inner().read("Changes").await.unwrap();
        let times: Vec<_> = rows.iter().filter_map(|r| r.get("Heure")).collect();
        assert_eq!(times, vec!["08:00", "07:45", "09:00"]);
    }

    #[tokio::test]
    async fn test_remove_last_drops_most_recent_append() {
        let (service, _) = setup();
        service.append(bottle(10, 0, 150)).await.unwrap();
        service.append(bottle(7, 0, 90)).await.unwrap();

        service.remove_last(Category::Feeding).await.unwrap();

        let recent = service.list_recent(Category::Feeding, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_time(), Some(time(10, 0)));
    }

    #[tokio::test]
    async fn test_time_since_last_empty() {
        let (service, _) = setup();
        let since = service
            .time_since_last(Category::Bath, at(1, 9, 0))
            .await
            .unwrap();
        assert_eq!(since, TimeSinceLast::Unavailable(Unavailable::NoRecord));
    }

    #[tokio::test]
    async fn test_time_since_last_uses_append_order() {
        let (service, _) = setup();
        service.append(bottle(9, 0, 120)).await.unwrap();
        // Backdated entry appended after a later one
        service.append(bottle(7, 0, 90)).await.unwrap();

        let since = service
            .time_since_last(Category::Feeding, at(1, 10, 0))
            .await
            .unwrap();
        assert_eq!(since.to_string(), "3h 0min");
    }

    #[tokio::test]
    async fn test_time_since_last_future_record_is_zero() {
        let (service, _) = setup();
        service.append(bottle(11, 0, 120)).await.unwrap();

        let since = service
            .time_since_last(Category::Feeding, at(1, 9, 0))
            .await
            .unwrap();
        assert_eq!(since.elapsed(), Some(ElapsedTime::from_seconds(0)));
    }

    #[tokio::test]
    async fn test_time_since_last_parse_error() {
        let (service, store) = setup();
        let broken = Row::new().with("Date", "demain").with("Heure", "08:00");
        store.write("Repas", &[broken]).await.unwrap();

        let since = service
            .time_since_last(Category::Feeding, at(1, 9, 0))
            .await
            .unwrap();
        assert_eq!(since, TimeSinceLast::Unavailable(Unavailable::ParseError));
    }

    #[tokio::test]
    async fn test_collapse_after_day() {
        let (service, _) = setup_with(LogPolicy {
            collapse_after_day: true,
            ..LogPolicy::default()
        });
        service.append(bottle(8, 0, 120)).await.unwrap();

        let since = service
            .time_since_last(Category::Feeding, at(3, 8, 0))
            .await
            .unwrap();
        assert_eq!(since.to_string(), "more than a day");
    }

    #[tokio::test]
    async fn test_overnight_sleep_duration_stored_once() {
        let (service, store) = setup();
        for _ in 0..2 {
            service
                .append(NewActivity::Sleep(SpanFields {
                    date: date(1),
                    start: time(20, 0),
                    end: time(6, 0),
                    notes: None,
                }))
                .await
                .unwrap();
        }

        let rows = store.read("Sommeil").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.get("Duree") == Some("10h 0min")));
    }

    #[tokio::test]
    async fn test_validation_error_skips_store() {
        let (service, store) = setup_with(LogPolicy {
            span_policy: SpanPolicy::Reject,
            ..LogPolicy::default()
        });

        let err = service.append(bottle(8, 0, -30)).await.unwrap_err();
        assert!(matches!(
            err,
            ActivityLogError::Validation(ValidationError::NegativeAmount(-30))
        ));

        let err = service
            .append(NewActivity::Daycare(SpanFields {
                date: date(1),
                start: time(17, 0),
                end: time(8, 0),
                notes: None,
            }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActivityLogError::Validation(ValidationError::EndBeforeStart { .. })
        ));

        assert_eq!(store.read_count(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let (service, store) = setup();
        service.append(bottle(8, 0, 120)).await.unwrap();
        store.set_available(false);

        assert!(matches!(
            service.append(bottle(9, 0, 120)).await,
            Err(ActivityLogError::Store(StoreError::Unavailable(_)))
        ));
        assert!(service.remove_last(Category::Feeding).await.is_err());
        assert!(service
            .time_since_last(Category::Feeding, at(1, 10, 0))
            .await
            .is_err());
        assert!(service.list_recent(Category::Feeding, 3).await.is_err());

        // The failed append was not queued
        store.set_available(true);
        assert_eq!(service.list_recent(Category::Feeding, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_row_in_recent() {
        let (service, store) = setup();
        service.append(diaper(9, 0)).await.unwrap();
        let mut rows = store.read("Changes").await.unwrap();
        rows.push(
            Row::new()
                .with("Date", "01/03/2024")
                .with("Heure", "10:00")
                .with("Type", "Vert"),
        );
        store.write("Changes", &rows).await.unwrap();

        let err = service.list_recent(Category::DiaperChange, 5).await.unwrap_err();
        match err {
            StoreError::MalformedRow { collection, index, .. } => {
                assert_eq!(collection, "Changes");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }

        // Time since last only needs the date and time cells
        let since = service
            .time_since_last(Category::DiaperChange, at(1, 10, 20))
            .await
            .unwrap();
        assert_eq!(since.to_string(), "0h 20min");
    }

    #[tokio::test]
    async fn test_summary_covers_all_categories() {
        let (service, _) = setup();
        service.append(bottle(8, 0, 120)).await.unwrap();
        service.append(diaper(9, 0)).await.unwrap();

        let summary = service.summary(at(1, 9, 30), 3).await.unwrap();

        assert_eq!(summary.len(), Category::ALL.len());
        let feeding = summary.iter().find(|s| s.category == Category::Feeding).unwrap();
        assert_eq!(feeding.time_since_last.to_string(), "1h 30min");
        assert_eq!(feeding.recent.len(), 1);
        let bath = summary.iter().find(|s| s.category == Category::Bath).unwrap();
        assert_eq!(bath.time_since_last, TimeSinceLast::Unavailable(Unavailable::NoRecord));
        assert!(bath.recent.is_empty());
    }

    /// Store that lets another device's append land between a caller's
    /// read and its write
    struct RacingStore {
        inner: MemoryStore,
        intruder: Mutex<Option<Row>>,
    }

    impl RacingStore {
        fn new(intruder: Row) -> Self {
            Self {
                inner: MemoryStore::new(),
                intruder: Mutex::new(Some(intruder)),
            }
        }

        async fn let_intruder_in(&self, collection: &str) {
            let intruder = self.intruder.lock().unwrap().take();
            if let Some(row) = intruder {
                let mut rows = self.inner.read(collection).await.unwrap();
                rows.push(row);
                self.inner.write(collection, &rows).await.unwrap();
            }
        }
    }

    #[async_trait]
    impl TabularStore for RacingStore {
        async fn read(&self, collection: &str) -> Result<Vec<Row>, StoreError> {
            self.inner.read(collection).await
        }

        async fn write(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError> {
            self.let_intruder_in(collection).await;
            self.inner.write(collection, rows).await
        }

        async fn read_versioned(
            &self,
            collection: &str,
        ) -> Result<Versioned<Vec<Row>>, StoreError> {
            self.inner.read_versioned(collection).await
        }

        async fn write_if_version(
            &self,
            collection: &str,
            rows: &[Row],
            expected: Option<u64>,
        ) -> Result<(), StoreError> {
            self.let_intruder_in(collection).await;
            self.inner.write_if_version(collection, rows, expected).await
        }
    }

    fn intruder_row() -> Row {
        RowMapper::to_row(&ActivityRecord::DiaperChange(DiaperRecord {
            date: date(1),
            time: time(7, 45),
            content: DiaperContent::Stool,
            notes: Some("other phone".to_string()),
        }))
    }

    #[tokio::test]
    async fn test_last_writer_wins_loses_concurrent_append() {
        let store = Arc::new(RacingStore::new(intruder_row()));
        let service = ActivityLogService::new(Arc::clone(&store), LogPolicy::default());

        service.append(diaper(8, 0)).await.unwrap();

        let recent = service.list_recent(Category::DiaperChange, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_time(), Some(time(8, 0)));
    }

    #[tokio::test]
    async fn test_optimistic_retry_keeps_concurrent_append() {
        let store = Arc::new(RacingStore::new(intruder_row()));
        let service = ActivityLogService::new(
            Arc::clone(&store),
            LogPolicy {
                concurrency: ConcurrencyPolicy::OptimisticRetry { max_attempts: 3 },
                ..LogPolicy::default()
            },
        );

        service.append(diaper(8, 0)).await.unwrap();

        let recent = service.list_recent(Category::DiaperChange, 10).await.unwrap();
        let times: Vec<_> = recent.iter().filter_map(|r| r.event_time()).collect();
        assert_eq!(times, vec![time(7, 45), time(8, 0)]);
    }

    #[tokio::test]
    async fn test_optimistic_retry_gives_up() {
        let store = Arc::new(RacingStore::new(intruder_row()));
        let service = ActivityLogService::new(
            Arc::clone(&store),
            LogPolicy {
                concurrency: ConcurrencyPolicy::OptimisticRetry { max_attempts: 1 },
                ..LogPolicy::default()
            },
        );

        let err = service.append(diaper(8, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            ActivityLogError::Store(StoreError::Conflict { attempts: 1, .. })
        ));

        // Only the other device's row made it
        let recent = service.list_recent(Category::DiaperChange, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_time(), Some(time(7, 45)));
    }

    #[tokio::test]
    async fn test_works_behind_trait_object() {
        let store: Arc<dyn TabularStore> = Arc::new(MemoryStore::new());
        let service = ActivityLogService::new(store, LogPolicy::default());

        service.append(diaper(9, 0)).await.unwrap();
        assert_eq!(service.list_recent(Category::DiaperChange, 1).await.unwrap().len(), 1);
    }
}
