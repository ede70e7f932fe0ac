use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use wellai::ledger::{CsvSheetStore, Ledger, LedgerRecord, MemoryStore};
use wellai::normalize::Probability;
use wellai::types::{Condition, Submission};
use wellai::validate::validate;

const THREADS: usize = 8;
const PER_THREAD: usize = 6;

fn record(name: &str) -> LedgerRecord {
    let mut submission: Submission = toml::from_str(include_str!("../submissions/jane.toml"))
        .expect("bundled submission parses");
    submission.name = name.to_string();
    let submission = validate(submission).expect("valid submission");
    let predictions: Vec<(Condition, Option<Probability>)> = Condition::ALL
        .iter()
        .map(|c| (*c, Probability::new(0.25)))
        .collect();
    LedgerRecord::new(&submission, &predictions)
}

fn expected_names() -> HashSet<String> {
    (0..THREADS)
        .flat_map(|t| (0..PER_THREAD).map(move |i| format!("T{t}-{i}")))
        .collect()
}

#[test]
fn concurrent_appends_to_memory_sheet_lose_nothing() {
    let ledger = Ledger::new(MemoryStore::new(), Duration::ZERO);

    thread::scope(|scope| {
        for t in 0..THREADS {
            let ledger = &ledger;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    ledger.append(&record(&format!("T{t}-{i}"))).expect("append");
                }
            });
        }
    });

    let table = ledger.read().expect("read");
    assert_eq!(table.len(), THREADS * PER_THREAD);
    let names: HashSet<String> = (0..table.len())
        .filter_map(|i| table.cell(i, "Name").map(str::to_string))
        .collect();
    assert_eq!(names, expected_names());
}

#[test]
fn concurrent_appends_to_csv_sheet_lose_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    // A long read TTL: appends must still see every earlier write.
    let ledger = Ledger::new(CsvSheetStore::new(dir.path(), "WellAI"), Duration::from_secs(60));

    thread::scope(|scope| {
        for t in 0..THREADS {
            let ledger = &ledger;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    ledger.append(&record(&format!("T{t}-{i}"))).expect("append");
                }
            });
        }
    });

    let reopened = Ledger::new(CsvSheetStore::new(dir.path(), "WellAI"), Duration::ZERO);
    let table = reopened.read()?;
    assert_eq!(table.len(), THREADS * PER_THREAD);

    // Rows from a single thread keep their relative order.
    for t in 0..THREADS {
        let prefix = format!("T{t}-");
        let order: Vec<String> = (0..table.len())
            .filter_map(|i| table.cell(i, "Name"))
            .filter(|name| name.starts_with(&prefix))
            .map(str::to_string)
            .collect();
        let expected: Vec<String> = (0..PER_THREAD).map(|i| format!("{prefix}{i}")).collect();
        assert_eq!(order, expected);
    }
    Ok(())
}
