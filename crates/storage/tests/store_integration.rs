//! 신뢰 저장소 + 감사 로그 통합 테스트
//!
//! 파일 데이터베이스(WAL)에서 동시 변경, 범위 조회, 재시작 후 보존을 검증합니다.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lanwarden_core::types::{
    BehaviorLabel, ClassifiedPacketRecord, MacAddr, PacketObservation, TrustState,
};
use lanwarden_storage::{CSV_HEADER, Database, PacketFilter, PacketRecorder, TrustStore};

fn open(dir: &tempfile::TempDir) -> Arc<Database> {
    Arc::new(Database::open(dir.path().join("lanwarden.db"), Duration::from_secs(5)).unwrap())
}

fn mac(s: &str) -> MacAddr {
    s.parse().unwrap()
}

fn record(src: &str, time: &str, classification: TrustState) -> ClassifiedPacketRecord {
    ClassifiedPacketRecord {
        observation: PacketObservation {
            eth_src: mac(src),
            eth_dst: mac("ff:ff:ff:ff:ff:ff"),
            protocol: "TLS".to_owned(),
            port_src: "51000".to_owned(),
            port_dst: "443".to_owned(),
            size: 1514,
            time: time.to_owned(),
            host: "example.org".to_owned(),
            hostname: "Unknown".to_owned(),
        },
        classification,
        behavior_prediction: BehaviorLabel::Normal,
    }
}

#[test]
fn concurrent_trust_and_block_keep_exclusivity() {
    let dir = tempfile::tempdir().unwrap();
    let store = TrustStore::new(open(&dir));
    let target = mac("aa:bb:cc:dd:ee:ff");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        store.trust(&target).unwrap();
                    } else {
                        store.block(&target).unwrap();
                    }
                    let _ = store.classify(&target).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let trusted = store.list(TrustState::Trusted).unwrap();
    let blocked = store.list(TrustState::Blocked).unwrap();
    assert_eq!(trusted.len() + blocked.len(), 1, "exactly one membership");
    assert_ne!(store.classify(&target).unwrap(), TrustState::Unknown);
}

#[test]
fn range_query_is_inclusive_regardless_of_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = PacketRecorder::new(open(&dir));

    let times = [
        "2024-01-02T00:00:00.000000",
        "2023-12-31T23:59:59.999999",
        "2024-01-01T00:00:00.000000",
        "2024-01-02T00:00:00.000001",
        "2024-01-01T12:30:00.000000",
    ];
    for t in times {
        recorder
            .append(&record("aa:aa:aa:aa:aa:aa", t, TrustState::Unknown))
            .unwrap();
    }

    let filter =
        PacketFilter::parse(None, Some("2024-01-01T00:00:00"), Some("2024-01-02T00:00:00")).unwrap();
    let rows = recorder.query(&filter).unwrap();
    let got: Vec<_> = rows.iter().map(|r| r.time.as_str()).collect();
    assert_eq!(
        got,
        vec![
            "2024-01-01T00:00:00.000000",
            "2024-01-01T12:30:00.000000",
            "2024-01-02T00:00:00.000000",
        ]
    );
}

#[test]
fn export_reflects_current_trust_while_query_keeps_point_in_time() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    let store = TrustStore::new(Arc::clone(&db));
    let recorder = PacketRecorder::new(db);

    recorder
        .append(&record(
            "aa:aa:aa:aa:aa:aa",
            "2024-01-01T00:00:00.000000",
            TrustState::Unknown,
        ))
        .unwrap();
    recorder
        .append(&record(
            "bb:bb:bb:bb:bb:bb",
            "2024-01-01T00:00:01.000000",
            TrustState::Trusted,
        ))
        .unwrap();
    store.block(&mac("aa:aa:aa:aa:aa:aa")).unwrap();

    let stored = recorder.query(&PacketFilter::default()).unwrap();
    assert_eq!(stored[0].classification, "Unknown");
    assert_eq!(stored[1].classification, "Trusted");

    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    recorder
        .export_rows(|row| {
            csv.push_str(&row.to_csv_line());
            true
        })
        .unwrap();

    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with("aa:aa:aa:aa:aa:aa,") && lines[1].ends_with(",Blocked"));
    assert!(lines[2].starts_with("bb:bb:bb:bb:bb:bb,") && lines[2].ends_with(",Unknown"));
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open(&dir);
        TrustStore::new(Arc::clone(&db))
            .trust(&mac("11:22:33:44:55:66"))
            .unwrap();
        PacketRecorder::new(db)
            .append(&record(
                "11:22:33:44:55:66",
                "2024-03-01T08:00:00.000000",
                TrustState::Trusted,
            ))
            .unwrap();
    }

    let db = open(&dir);
    let store = TrustStore::new(Arc::clone(&db));
    let recorder = PacketRecorder::new(db);
    assert_eq!(
        store.classify(&mac("11:22:33:44:55:66")).unwrap(),
        TrustState::Trusted
    );
    assert_eq!(recorder.count().unwrap(), 1);
    assert_eq!(
        recorder.seen_devices().unwrap(),
        vec![mac("11:22:33:44:55:66")]
    );
}

#[test]
fn reads_proceed_while_appending() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    let recorder = PacketRecorder::new(Arc::clone(&db));
    let store = TrustStore::new(db);

    let writer = {
        let recorder = recorder.clone();
        thread::spawn(move || {
            for i in 0..200 {
                recorder
                    .append(&record(
                        "cc:cc:cc:cc:cc:cc",
                        &format!("2024-01-01T00:00:{:02}.{:06}", i / 10, i),
                        TrustState::Unknown,
                    ))
                    .unwrap();
            }
        })
    };
    for _ in 0..50 {
        store.stats().unwrap();
        recorder.query(&PacketFilter::default()).unwrap();
    }
    writer.join().unwrap();

    assert_eq!(recorder.count().unwrap(), 200);
    assert_eq!(store.stats().unwrap().unknown, 1);
}
