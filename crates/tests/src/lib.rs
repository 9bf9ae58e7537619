//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> dispatcher -> 文件 的端到端测试
//! - 排序、背压、关闭排空等并发行为

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatcherConfig, WriteMode};

    #[test]
    fn test_contract_defaults() {
        let _ = contracts::ConfigVersion::V1;
        let config = DispatcherConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.default_mode, WriteMode::Buffered);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Destination, DispatcherConfig, WriteMode};
    use dispatcher::{Dispatcher, DispatcherError, Lifecycle, MemoryDestination, create_dispatcher};
    use tokio::sync::{Semaphore, mpsc};

    fn dispatcher(queue_capacity: usize) -> Dispatcher {
        Dispatcher::new(DispatcherConfig {
            queue_capacity,
            ..Default::default()
        })
        .unwrap()
    }

    /// Fails the first `failures` writes, then records like a memory destination
    struct FlakyDestination {
        remaining_failures: usize,
        inner: MemoryDestination,
    }

    #[async_trait]
    impl Destination for FlakyDestination {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining_failures > 0 {
                self.remaining_failures -= 1;
                return Err(std::io::Error::other("transient failure"));
            }
            self.inner.write(buf).await
        }
    }

    /// Blocks every write until the gate hands out a permit
    struct GatedDestination {
        entered: mpsc::UnboundedSender<()>,
        gate: Arc<Semaphore>,
        inner: MemoryDestination,
    }

    #[async_trait]
    impl Destination for GatedDestination {
        fn name(&self) -> &str {
            "gated"
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let _ = self.entered.send(());
            let _permit = self.gate.acquire().await.map_err(std::io::Error::other)?;
            self.inner.write(buf).await
        }
    }

    /// Records `(index, payload)` and counts writes that start while another
    /// destination sharing `busy` is still inside `write`
    struct OverlapDetector {
        index: usize,
        busy: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
        log: Arc<std::sync::Mutex<Vec<(usize, Vec<u8>)>>>,
    }

    #[async_trait]
    impl Destination for OverlapDetector {
        fn name(&self) -> &str {
            "overlap_detector"
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            self.log
                .lock()
                .unwrap()
                .push((self.index, buf.to_vec()));
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.busy.store(false, Ordering::SeqCst);
            Ok(buf.len())
        }
    }

    /// Counts writes without keeping payloads
    struct CountingDestination(Arc<AtomicUsize>);

    #[async_trait]
    impl Destination for CountingDestination {
        fn name(&self) -> &str {
            "counting"
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(buf.len())
        }
    }

    #[tokio::test]
    async fn test_buffered_writes_arrive_in_order_everywhere() {
        let dispatcher = dispatcher(8);
        let a = MemoryDestination::new("a");
        let b = MemoryDestination::new("b");
        dispatcher.add_destination(a.clone());
        dispatcher.add_destination(b.clone());

        let expected: Vec<String> = (0..100).map(|i| format!("entry-{i};")).collect();
        for entry in &expected {
            dispatcher.write(entry.as_bytes()).await.unwrap();
        }
        dispatcher.close().await.unwrap();

        assert_eq!(a.contents(), expected.concat().into_bytes());
        assert_eq!(b.contents(), a.contents());
        assert_eq!(a.len(), 100);
    }

    #[tokio::test]
    async fn test_immediate_write_is_visible_on_return() {
        let dispatcher = dispatcher(8);
        let memory = MemoryDestination::new("mem");
        dispatcher.add_destination(memory.clone());

        let n = dispatcher
            .write_tagged(WriteMode::Immediate, b"flush me")
            .await
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(memory.contents(), b"flush me");
    }

    #[tokio::test]
    async fn test_failed_destination_stops_pass_but_not_later_writes() {
        let dispatcher = dispatcher(8);
        let before = MemoryDestination::new("before");
        let flaky = MemoryDestination::new("flaky");
        let after = MemoryDestination::new("after");
        dispatcher.add_destination(before.clone());
        dispatcher.add_destination(FlakyDestination {
            remaining_failures: 1,
            inner: flaky.clone(),
        });
        dispatcher.add_destination(after.clone());

        let err = dispatcher
            .write_tagged(WriteMode::Immediate, b"first")
            .await
            .unwrap_err();
        assert_eq!(err.destination(), Some("flaky"));
        assert_eq!(before.payloads(), vec!["first"]);
        assert!(after.is_empty());

        dispatcher
            .write_tagged(WriteMode::Immediate, b"second")
            .await
            .unwrap();
        assert_eq!(before.payloads(), vec!["first", "second"]);
        assert_eq!(flaky.payloads(), vec!["second"]);
        assert_eq!(after.payloads(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_buffered_failure_is_published_and_worker_survives() {
        let dispatcher = dispatcher(8);
        let mut failures = dispatcher.subscribe_failures();
        let after = MemoryDestination::new("after");
        dispatcher.add_destination(FlakyDestination {
            remaining_failures: 1,
            inner: MemoryDestination::new("flaky"),
        });
        dispatcher.add_destination(after.clone());

        dispatcher.write(b"lost").await.unwrap();
        dispatcher.write(b"kept").await.unwrap();
        dispatcher.close().await.unwrap();

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.mode, WriteMode::Buffered);
        assert_eq!(failure.payload_len, 4);
        assert_eq!(failure.error.destination(), Some("flaky"));
        assert_eq!(after.payloads(), vec!["kept"]);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.pass_count, 1);
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let dispatcher = dispatcher(8);
        let memory = MemoryDestination::new("mem");
        dispatcher.add_destination(memory.clone());
        dispatcher.write(b"before").await.unwrap();
        dispatcher.close().await.unwrap();

        let err = dispatcher.write(b"after").await.unwrap_err();
        assert!(matches!(err, DispatcherError::Closing));
        let err = dispatcher
            .write_tagged(WriteMode::Immediate, b"after")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Closing));

        assert_eq!(memory.payloads(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_close_after_writers_join_drains_all() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 250;

        let dispatcher = Arc::new(dispatcher(16));
        let memory = MemoryDestination::new("mem");
        dispatcher.add_destination(memory.clone());

        let mut handles = Vec::new();
        for writer in 0..WRITERS {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                for seq in 0..PER_WRITER {
                    let payload = format!("{writer}:{seq}");
                    dispatcher.write(payload.as_bytes()).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        dispatcher.close().await.unwrap();

        let payloads = memory.payloads();
        assert_eq!(payloads.len(), WRITERS * PER_WRITER);

        // Each writer's own payloads keep their relative order.
        let mut next = [0usize; WRITERS];
        for payload in &payloads {
            let text = std::str::from_utf8(payload).unwrap();
            let (writer, seq) = text.split_once(':').unwrap();
            let writer: usize = writer.parse().unwrap();
            let seq: usize = seq.parse().unwrap();
            assert_eq!(seq, next[writer], "writer {writer} out of order");
            next[writer] += 1;
        }
        assert_eq!(dispatcher.state(), Lifecycle::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_during_concurrent_writes_delivers_every_accepted_payload() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 5_000;

        let dispatcher = Arc::new(dispatcher(16));
        let memory = MemoryDestination::new("mem");
        dispatcher.add_destination(memory.clone());

        let mut handles = Vec::new();
        for writer in 0..WRITERS {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                let mut accepted = 0usize;
                for seq in 0..PER_WRITER {
                    let payload = format!("{writer}:{seq}");
                    match dispatcher.write(payload.as_bytes()).await {
                        Ok(_) => accepted += 1,
                        Err(DispatcherError::Closing) => break,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                accepted
            }));
        }

        // Let the writers get going, then close underneath them.
        while memory.len() < 100 {
            tokio::task::yield_now().await;
        }
        dispatcher.close().await.unwrap();
        let delivered_at_close = memory.payloads();

        let mut accepted = [0usize; WRITERS];
        for (writer, handle) in handles.into_iter().enumerate() {
            accepted[writer] = handle.await.unwrap();
        }

        // Everything accepted was delivered before close returned, and
        // each writer's payloads form an in-order prefix.
        assert_eq!(delivered_at_close.len(), accepted.iter().sum::<usize>());
        assert_eq!(memory.len(), delivered_at_close.len());
        let mut next = [0usize; WRITERS];
        for payload in &delivered_at_close {
            let text = std::str::from_utf8(payload).unwrap();
            let (writer, seq) = text.split_once(':').unwrap();
            let writer: usize = writer.parse().unwrap();
            assert_eq!(seq.parse::<usize>().unwrap(), next[writer]);
            next[writer] += 1;
        }
        assert_eq!(next, accepted);
    }

    #[tokio::test]
    async fn test_writer_blocked_on_full_queue_is_delivered_by_close() {
        let dispatcher = Arc::new(dispatcher(1));
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let memory = MemoryDestination::new("gated");
        dispatcher.add_destination(GatedDestination {
            entered: entered_tx,
            gate: Arc::clone(&gate),
            inner: memory.clone(),
        });

        dispatcher.write(b"1").await.unwrap();
        entered.recv().await.unwrap();
        dispatcher.write(b"2").await.unwrap();

        let parked = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.write(b"3").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!parked.is_finished(), "third write should wait for space");

        let closing = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.close().await })
        };
        tokio::time::timeout(Duration::from_secs(1), async {
            while dispatcher.state() != Lifecycle::Closing {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("close should move the dispatcher to Closing");

        let err = dispatcher.write(b"late").await.unwrap_err();
        assert!(matches!(err, DispatcherError::Closing));
        assert!(!closing.is_finished(), "close must wait for the drain");

        gate.add_permits(16);
        assert_eq!(parked.await.unwrap().unwrap(), 1);
        closing.await.unwrap().unwrap();

        assert_eq!(memory.payloads(), vec!["1", "2", "3"]);
        assert_eq!(dispatcher.state(), Lifecycle::Closed);
    }

    #[tokio::test]
    async fn test_destination_registered_twice_receives_twice() {
        let dispatcher = dispatcher(8);
        let memory = MemoryDestination::new("twice");
        dispatcher.add_destination(memory.clone());
        dispatcher.add_destination(memory.clone());
        assert_eq!(dispatcher.destination_count(), 2);

        dispatcher
            .write_tagged(WriteMode::Immediate, b"now")
            .await
            .unwrap();
        dispatcher.write(b"later").await.unwrap();
        dispatcher.close().await.unwrap();

        assert_eq!(memory.payloads(), vec!["now", "now", "later", "later"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_immediate_and_buffered_passes_never_interleave() {
        let dispatcher = Arc::new(dispatcher(8));
        let busy = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for index in 0..2 {
            dispatcher.add_destination(OverlapDetector {
                index,
                busy: Arc::clone(&busy),
                overlaps: Arc::clone(&overlaps),
                log: Arc::clone(&log),
            });
        }

        let mut handles = Vec::new();
        for writer in 0..4u8 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                for seq in 0..50u8 {
                    dispatcher
                        .write_tagged(WriteMode::Immediate, &[b'i', writer, seq])
                        .await
                        .unwrap();
                }
            }));
        }
        {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                for seq in 0..100u8 {
                    dispatcher
                        .write_tagged(WriteMode::Buffered, &[b'b', seq])
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        dispatcher.close().await.unwrap();

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);

        // Each pass writes destination 0 then destination 1 with no other
        // pass in between.
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2 * (4 * 50 + 100));
        for pair in log.chunks(2) {
            assert_eq!(pair[0].0, 0);
            assert_eq!(pair[1].0, 1);
            assert_eq!(pair[0].1, pair[1].1);
        }
    }

    #[tokio::test]
    async fn test_delivery_runs_with_metrics_facade() {
        observability::describe_metrics();
        assert_eq!(
            observability::LogFormat::parse("json"),
            Some(observability::LogFormat::Json)
        );

        let dispatcher = dispatcher(4);
        let memory = MemoryDestination::new("mem");
        dispatcher.add_destination(memory.clone());
        dispatcher.write(b"queued").await.unwrap();
        dispatcher
            .write_tagged(WriteMode::Immediate, b"direct")
            .await
            .unwrap();
        dispatcher.close().await.unwrap();
        let _ = dispatcher.write(b"rejected").await;

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.buffered_accepted, 1);
        assert_eq!(metrics.immediate_accepted, 1);
        assert_eq!(metrics.rejected_count, 1);
        assert_eq!(metrics.pass_count, 2);
        assert_eq!(metrics.queue_len, 0);
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn test_late_destination_sees_later_writes() {
        let dispatcher = dispatcher(8);
        let early = MemoryDestination::new("early");
        dispatcher.add_destination(early.clone());
        dispatcher
            .write_tagged(WriteMode::Immediate, b"one")
            .await
            .unwrap();

        let late = MemoryDestination::new("late");
        dispatcher.add_destination(late.clone());
        dispatcher.write(b"two").await.unwrap();
        dispatcher
            .write_tagged(WriteMode::Immediate, b"three")
            .await
            .unwrap();
        dispatcher.close().await.unwrap();

        assert_eq!(early.payloads(), vec!["one", "two", "three"]);
        assert_eq!(late.payloads(), vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_small_queue_delivers_everything() {
        let dispatcher = dispatcher(2);
        let a = MemoryDestination::new("a");
        let b = MemoryDestination::new("b");
        dispatcher.add_destination(a.clone());
        dispatcher.add_destination(b.clone());

        for payload in ["A", "B", "C"] {
            dispatcher.write(payload.as_bytes()).await.unwrap();
        }
        dispatcher.close().await.unwrap();

        assert_eq!(a.payloads(), vec!["A", "B", "C"]);
        assert_eq!(b.payloads(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let dispatcher = dispatcher(1);
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let memory = MemoryDestination::new("gated");
        dispatcher.add_destination(GatedDestination {
            entered: entered_tx,
            gate: Arc::clone(&gate),
            inner: memory.clone(),
        });

        // First payload is taken by the worker and parks inside the destination.
        dispatcher.write(b"1").await.unwrap();
        entered.recv().await.unwrap();

        // Second fills the queue; third has nowhere to go.
        dispatcher.write(b"2").await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), dispatcher.write(b"3")).await;
        assert!(blocked.is_err(), "write on a full queue should wait");

        gate.add_permits(16);
        dispatcher.write(b"3").await.unwrap();
        dispatcher.close().await.unwrap();

        assert_eq!(memory.payloads(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_concurrent_close_calls_all_return() {
        let dispatcher = Arc::new(dispatcher(64));
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.add_destination(CountingDestination(Arc::clone(&count)));

        for i in 0..50u32 {
            dispatcher.write(&i.to_le_bytes()).await.unwrap();
        }

        let closers: Vec<_> = (0..3)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.close().await })
            })
            .collect();
        for closer in closers {
            closer.await.unwrap().unwrap();
        }

        // Every close returned after the full drain.
        assert_eq!(count.load(Ordering::SeqCst), 50);
        dispatcher.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_config_file_to_file_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("primary.log");
        let mirror = dir.path().join("mirror.log");
        let config = format!(
            r#"
[dispatcher]
queue_capacity = 4

[[destinations]]
name = "primary"
kind = "file"
[destinations.params]
path = "{}"

[[destinations]]
name = "mirror"
kind = "file"
[destinations.params]
path = "{}"
truncate = "true"
"#,
            primary.display(),
            mirror.display()
        );
        std::fs::write(&mirror, "stale contents\n").unwrap();

        let blueprint = ConfigLoader::load_from_str(&config, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        assert_eq!(dispatcher.destination_count(), 2);

        for line in ["alpha\n", "beta\n", "gamma\n"] {
            dispatcher.write(line.as_bytes()).await.unwrap();
        }
        dispatcher.close().await.unwrap();

        let expected = "alpha\nbeta\ngamma\n";
        assert_eq!(std::fs::read_to_string(&primary).unwrap(), expected);
        assert_eq!(std::fs::read_to_string(&mirror).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_dispatch() {
        let config = r#"
[[destinations]]
name = "dup"
kind = "log"

[[destinations]]
name = "dup"
kind = "stdout"
"#;
        let err = ConfigLoader::load_from_str(config, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
