//! End-to-end scheduling tests through the operation layer.
//!
//! Every test pins "today" to 2024-01-10 so the fixed dates below stay in the future.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use front_desk_core::{DeskConfig, FfiAvailability, FixedClock, FrontDeskCore, FrontDeskError};

fn open_core(dir: &Path) -> Arc<FrontDeskCore> {
    let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    FrontDeskCore::open(&DeskConfig::in_dir(dir), Arc::new(FixedClock::on(today))).unwrap()
}

fn book(
    core: &FrontDeskCore,
    name: &str,
    phone: &str,
    date: &str,
    time: &str,
) -> Result<front_desk_core::FfiAppointment, FrontDeskError> {
    core.book_appointment(
        name.into(),
        phone.into(),
        date.into(),
        time.into(),
        "visita_controllo".into(),
        None,
    )
}

fn availability(core: &FrontDeskCore, date: &str, time: &str) -> FfiAvailability {
    core.check_availability(date.into(), time.into()).unwrap()
}

#[test]
fn test_mario_rossi_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());

    let booked = book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();
    assert!(!booked.id.is_empty());
    assert_eq!(booked.phone, "+393331234567");

    let second = book(&core, "Giulia Bianchi", "+39 333 7654321", "2024-01-15", "10:00");
    assert!(matches!(second, Err(FrontDeskError::SlotConflict(_))));
    assert_eq!(availability(&core, "2024-01-15", "10:00"), FfiAvailability::Occupied);

    core.cancel_appointment(
        "Mario Rossi".into(),
        "+39 333 1234567".into(),
        "2024-01-15".into(),
        "10:00".into(),
    )
    .unwrap();
    assert_eq!(availability(&core, "2024-01-15", "10:00"), FfiAvailability::Available);
}

#[test]
fn test_slot_exclusive_regardless_of_patient() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());

    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();
    // Same patient, same slot
    assert!(matches!(
        book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00"),
        Err(FrontDeskError::SlotConflict(_))
    ));
    // Seconds are dropped, so this is the same slot
    assert!(matches!(
        book(&core, "Luca Verdi", "+39 347 0000001", "2024-01-15", "10:00:30"),
        Err(FrontDeskError::SlotConflict(_))
    ));
    // Neighbouring slot is free
    book(&core, "Luca Verdi", "+39 347 0000001", "2024-01-15", "10:30").unwrap();
}

#[test]
fn test_past_dates_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());

    assert!(matches!(
        book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-09", "10:00"),
        Err(FrontDeskError::PastDate(_))
    ));
    assert_eq!(availability(&core, "2023-12-31", "10:00"), FfiAvailability::PastDate);
    // Today is still bookable
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-10", "17:00").unwrap();
}

#[test]
fn test_cancel_requires_exact_match() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();

    let cancel = |name: &str, phone: &str, time: &str| {
        core.cancel_appointment(name.into(), phone.into(), "2024-01-15".into(), time.into())
    };
    assert!(matches!(cancel("Giulia Bianchi", "+39 333 1234567", "10:00"), Err(FrontDeskError::NotFound(_))));
    assert!(matches!(cancel("Mario Rossi", "+39 333 0000000", "10:00"), Err(FrontDeskError::NotFound(_))));
    assert!(matches!(cancel("Mario Rossi", "+39 333 1234567", "11:00"), Err(FrontDeskError::NotFound(_))));
    assert_eq!(availability(&core, "2024-01-15", "10:00"), FfiAvailability::Occupied);

    // Formatting of name and phone does not matter
    cancel("  mario rossi ", "+39-333-123-4567", "10:00").unwrap();
    assert!(matches!(cancel("Mario Rossi", "+39 333 1234567", "10:00"), Err(FrontDeskError::NotFound(_))));
}

#[test]
fn test_cancel_then_rebook() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());

    let first = book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();
    core.cancel_appointment(
        "Mario Rossi".into(),
        "+39 333 1234567".into(),
        "2024-01-15".into(),
        "10:00".into(),
    )
    .unwrap();

    let second = book(&core, "Giulia Bianchi", "+39 333 7654321", "2024-01-15", "10:00").unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn test_reschedule_moves_booking() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());
    let original = book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();

    let moved = core
        .reschedule_appointment(
            "Mario Rossi".into(),
            "+39 333 1234567".into(),
            "2024-01-15".into(),
            "10:00".into(),
            "2024-01-16".into(),
            "15:00".into(),
        )
        .unwrap();

    assert_eq!(moved.date, "2024-01-16");
    assert_eq!(moved.time, "15:00");
    assert_eq!(moved.appointment_type, original.appointment_type);
    assert_ne!(moved.id, original.id);
    assert_eq!(availability(&core, "2024-01-15", "10:00"), FfiAvailability::Available);
    assert_eq!(availability(&core, "2024-01-16", "15:00"), FfiAvailability::Occupied);
    assert_eq!(core.list_appointments("+393331234567".into()).unwrap(), vec![moved]);
}

#[test]
fn test_failed_reschedule_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());
    let original = book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "10:00").unwrap();
    book(&core, "Giulia Bianchi", "+39 333 7654321", "2024-01-16", "15:00").unwrap();

    let reschedule = |date: &str, time: &str| {
        core.reschedule_appointment(
            "Mario Rossi".into(),
            "+39 333 1234567".into(),
            "2024-01-15".into(),
            "10:00".into(),
            date.into(),
            time.into(),
        )
    };

    assert!(matches!(reschedule("2024-01-16", "15:00"), Err(FrontDeskError::SlotConflict(_))));
    assert!(matches!(reschedule("2024-01-01", "09:00"), Err(FrontDeskError::PastDate(_))));
    assert!(matches!(reschedule("2024-13-01", "09:00"), Err(FrontDeskError::Validation(_))));

    let listed = core.list_appointments("+39 333 1234567".into()).unwrap();
    assert_eq!(listed, vec![original]);
    assert_eq!(availability(&core, "2024-01-15", "10:00"), FfiAvailability::Occupied);
}

#[test]
fn test_list_appointments_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-17", "09:00").unwrap();
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "16:00").unwrap();
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "09:30").unwrap();
    book(&core, "Giulia Bianchi", "+39 333 7654321", "2024-01-15", "11:00").unwrap();

    let listed = core.list_appointments("0039 333 1234567".into()).unwrap();
    let slots: Vec<String> = listed.iter().map(|a| format!("{} {}", a.date, a.time)).collect();
    assert_eq!(slots, vec!["2024-01-15 09:30", "2024-01-15 16:00", "2024-01-17 09:00"]);
    assert!(core.list_appointments("+39 320 9999999".into()).unwrap().is_empty());
}

#[test]
fn test_free_slots_exclude_bookings() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());
    book(&core, "Mario Rossi", "+39 333 1234567", "2024-01-15", "09:00").unwrap();
    book(&core, "Giulia Bianchi", "+39 333 7654321", "2024-01-15", "17:30").unwrap();

    // Monday 09:00-18:00 in 30 minute slots, minus two bookings
    let free = core.free_slots("2024-01-15".into()).unwrap();
    assert_eq!(free.len(), 16);
    assert_eq!(free.first().map(String::as_str), Some("09:30"));
    assert_eq!(free.last().map(String::as_str), Some("17:00"));
    assert!(matches!(core.free_slots("2024-01-01".into()), Err(FrontDeskError::PastDate(_))));
}

#[test]
fn test_concurrent_booking_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let core = open_core(dir.path());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let core = Arc::clone(&core);
            thread::spawn(move || {
                let phone = format!("+39 333 000000{}", i);
                book(&core, &format!("Caller {}", i), &phone, "2024-01-15", "10:00")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(FrontDeskError::SlotConflict(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
}
