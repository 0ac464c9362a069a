//! Concurrent access to the config cache
//!
//! Readers must always see a rules + matrix pair from a single load,
//! while the sheets are edited and the cache is reloaded underneath them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Duration;
use pond_diagd::config::loader::{DEFAULT_MATRIX_TABLE, DEFAULT_RULES_TABLE};
use pond_diagd::{ConfigCache, DiagnosisConfig, InMemorySource, SystemClock, Table};

fn rules(n: usize) -> Table {
    let rows: Vec<Vec<String>> = (0..n)
        .map(|i| {
            vec![
                format!("P{}", i),
                format!("K{}", i),
                "Water Quality".to_string(),
                ">".to_string(),
                i.to_string(),
            ]
        })
        .collect();
    Table::new(
        ["Param", "Keyword", "Tab", "Operator", "Value"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    )
}

fn matrix(n: usize) -> Table {
    let mut headers = vec!["No".to_string(), "Freq".to_string(), "Diagnosis".to_string()];
    headers.extend((0..n).map(|i| format!("P{}", i)));
    let rows = (0..n)
        .map(|i| {
            let mut row = vec![format!("D{}", i), "1".to_string(), format!("Diagnosis {}", i)];
            row.extend((0..n).map(|j| if i == j { "PASS" } else { "?" }.to_string()));
            row
        })
        .collect();
    Table::new(headers, rows)
}

fn assert_consistent(config: &DiagnosisConfig) {
    assert_eq!(
        config.version,
        DiagnosisConfig::compute_version(&config.rules, &config.matrix)
    );
    for param in &config.matrix.params {
        assert!(config.rules.iter().any(|r| &r.param == param));
    }
}

#[test]
fn test_no_torn_reads_under_reload() {
    let source = Arc::new(
        InMemorySource::new()
            .with_table(DEFAULT_RULES_TABLE, rules(2))
            .with_table(DEFAULT_MATRIX_TABLE, matrix(2)),
    );
    // Zero TTL: every reader races a reload
    let cache = Arc::new(
        ConfigCache::new(source.clone(), Arc::new(SystemClock)).with_ttl(Duration::zero()),
    );
    let stop = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            let reads = Arc::clone(&reads);
            thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let config = cache.get_config().unwrap();
                    assert_consistent(&config);
                    reads.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for i in 0..200 {
        let n = 1 + i % 5;
        source.set_table(DEFAULT_RULES_TABLE, rules(n));
        source.set_table(DEFAULT_MATRIX_TABLE, matrix(n));
        if i % 10 == 0 {
            cache.force_reload();
        }
    }
    stop.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.join().unwrap();
    }
    assert!(reads.load(Ordering::SeqCst) > 0);

    let last = cache.get_config().unwrap();
    assert_consistent(&last);
}

#[test]
fn test_held_config_survives_reload() {
    let source = Arc::new(
        InMemorySource::new()
            .with_table(DEFAULT_RULES_TABLE, rules(3))
            .with_table(DEFAULT_MATRIX_TABLE, matrix(3)),
    );
    let cache = ConfigCache::new(source.clone(), Arc::new(SystemClock));

    let held = cache.get_config().unwrap();
    source.set_table(DEFAULT_RULES_TABLE, rules(1));
    source.set_table(DEFAULT_MATRIX_TABLE, matrix(1));
    cache.force_reload();
    let fresh = cache.get_config().unwrap();

    assert_eq!(held.rules.len(), 3);
    assert_eq!(held.matrix.rows.len(), 3);
    assert_eq!(fresh.rules.len(), 1);
    assert_ne!(held.version, fresh.version);
    assert_consistent(&held);
    assert_consistent(&fresh);
}

#[test]
fn test_concurrent_first_load_fetches_once() {
    let source = Arc::new(
        InMemorySource::new()
            .with_table(DEFAULT_RULES_TABLE, rules(2))
            .with_table(DEFAULT_MATRIX_TABLE, matrix(2)),
    );
    let cache = Arc::new(ConfigCache::new(source.clone(), Arc::new(SystemClock)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_config().unwrap().version.clone())
        })
        .collect();
    let versions: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(versions.windows(2).all(|w| w[0] == w[1]));
    // One load = rules + matrix
    assert_eq!(source.fetch_count(), 2);
}
