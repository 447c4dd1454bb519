//! Concurrency tests for the shared context.

#[cfg(test)]
mod tests {
    use crate::context::{ChangeRecord, Context};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_concurrent_writers_produce_one_record_per_write() {
        let ctx = Arc::new(Context::new());
        let writers = 8;
        let writes_per_writer = 200;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let ctx = ctx.clone();
                std::thread::spawn(move || {
                    for i in 0..writes_per_writer {
                        ctx.set(format!("worker{w}.value"), i, &format!("worker{w}"))
                            .unwrap();
                        ctx.set("shared.counter", i, &format!("worker{w}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = ctx.get_history(None);
        assert_eq!(history.len(), writers * writes_per_writer * 2);

        // Sequence numbers are dense and strictly increasing.
        let seqs: Vec<u64> = history.iter().map(|r| r.seq).collect();
        let expected: Vec<u64> = (1..=history.len() as u64).collect();
        assert_eq!(seqs, expected);

        // The last record for each key agrees with the live value.
        for key in ctx.keys() {
            let last = history.iter().rev().find(|r| r.key == key).unwrap();
            assert_eq!(last.after, ctx.get(&key));
        }
    }

    #[test]
    fn test_history_chain_is_consistent_per_key() {
        let ctx = Arc::new(Context::new());
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let ctx = ctx.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        ctx.set("contended", json!([w, i]), &format!("w{w}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each record's `before` is exactly the previous record's `after`.
        let records: Vec<ChangeRecord> = ctx.history_for_key("contended");
        assert_eq!(records.len(), 400);
        assert_eq!(records[0].before, None);
        for pair in records.windows(2) {
            assert_eq!(pair[1].before, pair[0].after);
        }
    }

    #[test]
    fn test_readers_never_observe_torn_values() {
        let ctx = Arc::new(Context::new());
        ctx.set("doc", json!({"a": 0, "b": 0}), "init").unwrap();

        let writer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 1..=500 {
                    ctx.set("doc", json!({"a": i, "b": i}), "writer").unwrap();
                }
            })
        };
        let reader = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let doc = ctx.get("doc").unwrap();
                    assert_eq!(doc["a"], doc["b"]);
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn test_snapshot_taken_during_writes_is_a_prefix_state() {
        let ctx = Arc::new(Context::new());
        let writer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 0..300 {
                    ctx.set(format!("k{i}"), i, "writer").unwrap();
                }
            })
        };
        let id = ctx.create_snapshot("mid");
        writer.join().unwrap();

        let info = ctx
            .list_snapshots()
            .into_iter()
            .find(|info| info.id == id)
            .unwrap();
        assert_eq!(info.key_count, info.history_len);

        ctx.restore_snapshot(&id, "tester").unwrap();
        let keys: HashSet<String> = ctx.keys().into_iter().collect();
        let expected: HashSet<String> = (0..info.key_count).map(|i| format!("k{i}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_concurrent_restore_and_writes_keep_history_consistent() {
        let ctx = Arc::new(Context::new());
        ctx.set("v", 0, "init").unwrap();
        let id = ctx.create_snapshot("base");

        let writer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 1..200 {
                    ctx.set("v", i, "writer").unwrap();
                }
            })
        };
        let restorer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    ctx.restore_snapshot(&id, "restorer").unwrap();
                }
            })
        };
        writer.join().unwrap();
        restorer.join().unwrap();

        let records = ctx.history_for_key("v");
        for pair in records.windows(2) {
            assert_eq!(pair[1].before, pair[0].after);
        }
        assert_eq!(records.last().unwrap().after, ctx.get("v"));
    }
}
