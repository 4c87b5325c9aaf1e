//! Concurrent dispatch from many producer threads

use canary_telemetry::{Category, Dispatcher, SignalKind, TamperKind};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_one_first_sighting_per_pair_under_contention() {
    let dispatcher = Arc::new(Dispatcher::default());
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut firsts = 0;
                for device in 0..4 {
                    let id = format!("canary-{:02}", device);
                    for category in [Category::Status, Category::Health, Category::Tamper] {
                        let payload: &[u8] = match category {
                            Category::Tamper if t % 3 == 0 => br#"{"type":"gpio"}"#,
                            Category::Tamper => br#"{"type":"watchdog"}"#,
                            Category::Status => b"online",
                            _ => br#"{"battery": 50}"#,
                        };
                        let dispatch = dispatcher.handle_at(&id, category, payload, t as u64).unwrap();
                        if dispatch.first_sighting {
                            firsts += 1;
                        }
                    }
                }
                firsts
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 4 * 3);
    assert_eq!(dispatcher.diagnostics().discovered_pairs, 12);

    for device in 0..4 {
        let id = format!("canary-{:02}", device);
        let store = dispatcher.classifier().store();
        assert!(store.get(&id, SignalKind::Tamper(TamperKind::Gpio)).unwrap().is_on());
        assert!(store.get(&id, SignalKind::Tamper(TamperKind::Watchdog)).unwrap().is_on());
        assert!(store.get(&id, SignalKind::AnyTamper).unwrap().is_on());
    }
}
