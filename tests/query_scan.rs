//! Cursor semantics: exact vs prefix matching, scoped vs global scans,
//! ordering and early termination.

use std::collections::BTreeSet;
use symdex::{IndexDb, Location, QueryResult, Table, UnitBundle};
use tempfile::TempDir;

fn open_store(tmp: &TempDir) -> IndexDb {
    IndexDb::open(&tmp.path().join("store")).unwrap()
}

fn loc(file_id: u32, line: u32, column: u32) -> Location {
    Location::new(file_id, line, column)
}

fn names_bundle(entries: &[(&str, &[Location])]) -> UnitBundle {
    let mut bundle = UnitBundle::default();
    for (name, locs) in entries {
        bundle
            .symbol_names
            .insert((*name).to_string(), locs.iter().copied().collect());
    }
    bundle
}

fn collect_names(
    db: &IndexDb,
    scope: Option<u32>,
    key: &str,
    is_prefix: bool,
) -> Vec<(u32, String, BTreeSet<Location>)> {
    let mut seen = Vec::new();
    db.query_symbol_names(scope, key, is_prefix, |file_id, name, set| {
        seen.push((file_id, name.to_string(), set.clone()));
        QueryResult::Continue
    })
    .unwrap();
    seen
}

/// Two units sharing the symbol "foo"; unit 7 also has "foobar" and "other".
fn seeded_store(tmp: &TempDir) -> IndexDb {
    let db = open_store(tmp);
    db.update_unit(
        7,
        &names_bundle(&[
            ("foo", &[loc(7, 1, 1), loc(7, 2, 5)]),
            ("foobar", &[loc(7, 3, 1)]),
            ("other", &[loc(7, 9, 9)]),
        ]),
    )
    .unwrap();
    db.update_unit(9, &names_bundle(&[("foo", &[loc(9, 4, 2)])]))
        .unwrap();
    db
}

#[test]
fn scoped_prefix_scan_in_ascending_order() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let seen = collect_names(&db, Some(7), "foo", true);
    assert_eq!(
        seen,
        vec![
            (
                7,
                "foo".to_string(),
                [loc(7, 1, 1), loc(7, 2, 5)].into()
            ),
            (7, "foobar".to_string(), [loc(7, 3, 1)].into()),
        ]
    );
}

#[test]
fn scoped_exact_scan_single_row() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let seen = collect_names(&db, Some(7), "foo", false);
    assert_eq!(
        seen,
        vec![(7, "foo".to_string(), [loc(7, 1, 1), loc(7, 2, 5)].into())]
    );
}

#[test]
fn global_exact_scan_visits_all_units() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let seen = collect_names(&db, None, "foo", false);
    assert_eq!(
        seen,
        vec![
            (7, "foo".to_string(), [loc(7, 1, 1), loc(7, 2, 5)].into()),
            (9, "foo".to_string(), [loc(9, 4, 2)].into()),
        ]
    );
}

#[test]
fn global_scan_after_delete() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    db.delete_unit(7).unwrap();

    let seen = collect_names(&db, None, "foo", false);
    assert_eq!(seen, vec![(9, "foo".to_string(), [loc(9, 4, 2)].into())]);
}

#[test]
fn global_order_is_key_major_then_unit() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let seen: Vec<(u32, String)> = collect_names(&db, None, "", true)
        .into_iter()
        .map(|(f, name, _)| (f, name))
        .collect();
    assert_eq!(
        seen,
        vec![
            (7, "foo".to_string()),
            (9, "foo".to_string()),
            (7, "foobar".to_string()),
            (7, "other".to_string()),
        ]
    );
}

#[test]
fn stop_halts_scoped_scan() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let mut calls = 0;
    db.query_symbol_names(Some(7), "foo", true, |_, _, _| {
        calls += 1;
        QueryResult::Stop
    })
    .unwrap();
    assert_eq!(calls, 1);
}

#[test]
fn stop_halts_global_scan() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let mut calls = 0;
    db.query_symbol_names(None, "", true, |_, _, _| {
        calls += 1;
        QueryResult::Stop
    })
    .unwrap();
    assert_eq!(calls, 1);
}

#[test]
fn prefix_scan_excludes_near_misses() {
    let tmp = TempDir::new().unwrap();
    let db = open_store(&tmp);
    db.update_unit(
        7,
        &names_bundle(&[
            ("fo", &[loc(7, 1, 1)]),
            ("foo", &[loc(7, 1, 1)]),
            ("fox", &[loc(7, 1, 1)]),
            ("fp", &[loc(7, 1, 1)]),
        ]),
    )
    .unwrap();

    let seen: Vec<String> = collect_names(&db, Some(7), "fo", true)
        .into_iter()
        .map(|(_, name, _)| name)
        .collect();
    assert_eq!(seen, vec!["fo", "foo", "fox"]);

    assert!(collect_names(&db, Some(7), "food", true).is_empty());
    assert!(collect_names(&db, Some(7), "fp2", false).is_empty());
}

#[test]
fn start_past_end_is_empty_success() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    // "zzz" sorts after every stored key, scoped and global
    assert!(collect_names(&db, Some(7), "zzz", true).is_empty());
    assert!(collect_names(&db, None, "zzz", false).is_empty());

    // scoped scan of a unit that was never written
    assert!(collect_names(&db, Some(1234), "", true).is_empty());
}

#[test]
fn raw_byte_callbacks_see_borrowed_views() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let mut rows: Vec<(u32, Vec<u8>)> = Vec::new();
    db.query_unit(Table::SymbolNames, 7, b"foo", true, |file_id, key, value| {
        assert!(!value.is_empty());
        rows.push((file_id, key.to_vec()));
        QueryResult::Continue
    })
    .unwrap();
    assert_eq!(
        rows,
        vec![(7, b"foo".to_vec()), (7, b"foobar".to_vec())]
    );

    let mut global_rows: Vec<(u32, Vec<u8>)> = Vec::new();
    db.query(Table::SymbolNames, b"foo", false, |file_id, key, _| {
        global_rows.push((file_id, key.to_vec()));
        QueryResult::Continue
    })
    .unwrap();
    assert_eq!(
        global_rows,
        vec![(7, b"foo".to_vec()), (9, b"foo".to_vec())]
    );
}

#[test]
#[should_panic(expected = "file_id 0 is reserved")]
fn scoped_query_unit_zero_panics() {
    let tmp = TempDir::new().unwrap();
    let db = open_store(&tmp);
    let _ = db.query_unit(Table::SymbolNames, 0, b"", true, |_, _, _| {
        QueryResult::Continue
    });
}

#[test]
fn status_dump_sections() {
    let tmp = TempDir::new().unwrap();
    let db = seeded_store(&tmp);

    let mut out = Vec::new();
    symdex::status::dump(&db, "symbolnames", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("symbolnames"));
    assert!(text.contains("  foo"));
    assert!(text.contains("    7: 7:1:1"));
    assert!(!text.contains("targets"));

    let mut out = Vec::new();
    symdex::status::dump(&db, "", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    for section in ["symbolnames", "targets", "usrs", "symbols", "tokens"] {
        assert!(text.contains(section), "missing section {section}");
    }

    let mut out = Vec::new();
    symdex::status::dump(&db, "nonsense", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("symbolnames|targets|usrs|symbols|tokens"));
}
