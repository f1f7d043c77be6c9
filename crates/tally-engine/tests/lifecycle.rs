use anyhow::Result;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use tally_core::models::Credentials;
use tally_core::storage::TimerStorage;
use tally_engine::{ManualClock, ManualEntryForm, MemoryBackend, SignUpOutcome, TimeTracker};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    backend: Arc<MemoryBackend>,
    clock: Arc<ManualClock>,
    tracker: TimeTracker,
}

fn harness() -> Result<Harness> {
    let dir = TempDir::new()?;
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::utc(
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
    ));
    let tracker = TimeTracker::new(
        backend.clone(),
        backend.clone(),
        TimerStorage::new(dir.path().to_path_buf()),
        clock.clone(),
    );

    Ok(Harness {
        _dir: dir,
        backend,
        clock,
        tracker,
    })
}

fn credentials() -> Credentials {
    Credentials::new("worker@example.com", "hunter22")
}

#[tokio::test]
async fn test_day_of_work_exports_every_entry() -> Result<()> {
    let h = harness()?;
    let outcome = h.tracker.sign_up(&credentials()).await?;
    assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));

    let store = h.tracker.store();
    let acme = store.add_company("Acme").await?.expect("company");
    let globex = store.add_company("Globex").await?.expect("company");

    h.tracker.timers().start(&acme.id).await?;
    h.clock.advance(ChronoDuration::minutes(50));
    let switched = h.tracker.timers().start(&globex.id).await?.expect("started");
    assert_eq!(switched.flushed.expect("flushed").duration_minutes, 50);

    h.clock.advance(ChronoDuration::seconds(90));
    h.tracker.timers().stop().await?;

    let form = ManualEntryForm {
        company_id: Some(acme.id.clone()),
        date: Some(ManualEntryForm::parse_date("2024-01-14")?),
        start_time: Some(ManualEntryForm::parse_time("13:00")?),
        end_time: Some(ManualEntryForm::parse_time("14:15")?),
    };
    h.tracker.composer().add(&form).await?;

    store.rename_company(&acme.id, "Acme Corp").await?;

    let csv = h.tracker.export_csv().await?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("\"Acme Corp\""));
    assert!(lines[2].starts_with("\"Acme Corp\""));
    assert!(lines[3].starts_with("\"Globex\""));
    assert!(lines[3].contains("\"0h 2m\",\"Tracked\""));
    assert_eq!(h.tracker.export_file_name(), "time-tracker-export-2024-01-15.csv");
    Ok(())
}

#[tokio::test]
async fn test_written_export_counts_rows_not_lines() -> Result<()> {
    let h = harness()?;
    h.tracker.sign_up(&credentials()).await?;

    let store = h.tracker.store();
    let company = store.add_company("Acme\nNorth").await?.expect("company");
    h.tracker.timers().start(&company.id).await?;
    h.clock.advance(ChronoDuration::minutes(30));
    h.tracker.timers().stop().await?;

    let mut out = Vec::new();
    let rows = h.tracker.write_export(&mut out).await?;
    assert_eq!(rows, 1);

    let csv = String::from_utf8(out)?;
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("\"Acme\nNorth\""));
    Ok(())
}

#[tokio::test]
async fn test_deleting_timed_company_flushes_then_cascades() -> Result<()> {
    let h = harness()?;
    h.tracker.sign_up(&credentials()).await?;
    let store = h.tracker.store();
    let acme = store.add_company("Acme").await?.expect("company");
    let globex = store.add_company("Globex").await?.expect("company");

    h.tracker.timers().start(&globex.id).await?;
    h.clock.advance(ChronoDuration::minutes(10));
    h.tracker.timers().start(&acme.id).await?;
    h.clock.advance(ChronoDuration::minutes(5));

    let deletion = h.tracker.delete_company(&acme.id).await?;
    assert!(deletion.deleted);
    assert_eq!(deletion.flushed.expect("flushed").company_id, acme.id);

    assert!(h.tracker.timers().active().await.is_none());
    let entries = store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].company_id, globex.id);
    assert_eq!(h.backend.entry_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_signed_out_operations_do_nothing() -> Result<()> {
    let h = harness()?;
    assert!(h.tracker.restore().await?.is_none());

    assert!(h.tracker.timers().start("any").await?.is_none());
    assert!(h.tracker.timers().stop().await?.is_none());
    let form = ManualEntryForm {
        company_id: Some("any".to_string()),
        date: Some(ManualEntryForm::parse_date("2024-01-15")?),
        start_time: Some(ManualEntryForm::parse_time("09:00")?),
        end_time: Some(ManualEntryForm::parse_time("10:00")?),
    };
    assert!(h.tracker.composer().add(&form).await?.is_none());
    assert_eq!(h.backend.entry_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_sign_out_and_back_in_resumes_timer() -> Result<()> {
    let h = harness()?;
    h.tracker.sign_up(&credentials()).await?;
    let acme = h.tracker.store().add_company("Acme").await?.expect("company");
    h.tracker.timers().start(&acme.id).await?;

    h.tracker.sign_out().await?;
    assert!(h.tracker.store().companies().await.is_empty());
    assert!(h.tracker.timers().active().await.is_none());

    h.tracker.sign_in(&credentials()).await?;
    assert_eq!(h.tracker.store().companies().await.len(), 1);
    h.clock.advance(ChronoDuration::seconds(42));
    assert_eq!(h.tracker.timers().elapsed_seconds().await, 42);
    Ok(())
}

#[tokio::test]
async fn test_bad_credentials_surface_service_message() -> Result<()> {
    let h = harness()?;
    let err = h
        .tracker
        .sign_in(&Credentials::new("nobody@example.com", "abc123"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid login credentials");
    Ok(())
}
