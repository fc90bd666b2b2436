// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::engine::{ExitStatus, Phase, Placement, Relay, RunReport, Stage, Worker, WorkerExit};
use crate::errors::TopologyError;
use crate::traits::{Actor, ActorContext};

/// Integration tests running whole relays with real actors
#[cfg(test)]
mod tests {
    use super::*;

    type Shared<V> = Arc<Mutex<Vec<V>>>;

    /// Sends a fixed list of items.
    struct Producer {
        items: Vec<u32>,
    }

    impl Producer {
        fn range(from: u32, count: u32) -> Self {
            Self {
                items: (from..from + count).collect(),
            }
        }
    }

    #[async_trait]
    impl Actor<u32> for Producer {
        async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            for item in self.items.drain(..) {
                ctx.send(item).await?;
            }
            Ok(())
        }
    }

    /// Records every payload it sees.
    struct Sink {
        seen: Shared<u32>,
    }

    #[async_trait]
    impl Actor<u32> for Sink {
        async fn handle(&mut self, _ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(msg);
            Ok(())
        }
    }

    /// Adds one and passes the value on.
    struct Proxy;

    #[async_trait]
    impl Actor<u32> for Proxy {
        async fn handle(&mut self, ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
            ctx.send(msg + 1).await?;
            Ok(())
        }
    }

    struct SlowSink {
        delay: Duration,
        seen: Shared<u32>,
    }

    #[async_trait]
    impl Actor<u32> for SlowSink {
        async fn handle(&mut self, _ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.seen.lock().unwrap().push(msg);
            Ok(())
        }
    }

    /// Collects into a container owned by the test, only possible inline.
    struct Collector<'a> {
        out: &'a mut Vec<u32>,
    }

    #[async_trait]
    impl Actor<u32> for Collector<'_> {
        async fn handle(&mut self, _ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
            self.out.push(msg);
            Ok(())
        }
    }

    /// Fails in the configured phases after sending `before_failure` items.
    struct Faulty {
        fail_in: &'static [Phase],
        before_failure: u32,
        shut_down: Arc<AtomicBool>,
    }

    impl Faulty {
        fn new(fail_in: &'static [Phase], before_failure: u32) -> (Self, Arc<AtomicBool>) {
            let shut_down = Arc::new(AtomicBool::new(false));
            let actor = Self {
                fail_in,
                before_failure,
                shut_down: shut_down.clone(),
            };
            (actor, shut_down)
        }
    }

    #[async_trait]
    impl Actor<u32> for Faulty {
        async fn startup(&mut self, _ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            if self.fail_in.contains(&Phase::Startup) {
                anyhow::bail!("no database");
            }
            Ok(())
        }

        async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            for item in 0..self.before_failure {
                ctx.send(item).await?;
            }
            if self.fail_in.contains(&Phase::Loop) {
                anyhow::bail!("disk full");
            }
            Ok(())
        }

        async fn shutdown(&mut self, _ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            if self.fail_in.contains(&Phase::Shutdown) {
                anyhow::bail!("flush failed");
            }
            Ok(())
        }
    }

    /// Panics on a given payload.
    struct Fragile {
        breaks_on: u32,
    }

    #[async_trait]
    impl Actor<u32> for Fragile {
        async fn handle(&mut self, _ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
            if msg == self.breaks_on {
                panic!("bad message {}", msg);
            }
            Ok(())
        }
    }

    /// Panics before doing anything.
    struct Unready;

    #[async_trait]
    impl Actor<u32> for Unready {
        async fn startup(&mut self, _ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            panic!("config missing")
        }
    }

    /// Sends a few items, then finishes quickly.
    struct Quick;

    #[async_trait]
    impl Actor<u32> for Quick {
        async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            for item in 0..3 {
                ctx.send(item).await?;
            }
            Ok(())
        }
    }

    /// Blocks on the first payload.
    struct Hung;

    #[async_trait]
    impl Actor<u32> for Hung {
        async fn handle(&mut self, _ctx: &mut ActorContext<u32>, _msg: u32) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    /// Records what its context offers during startup.
    struct Observer {
        seen: Shared<(String, bool, bool)>,
        touched: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Actor<u32> for Observer {
        async fn startup(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            self.touched.store(true, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((ctx.id().to_string(), ctx.is_sender(), ctx.is_receiver()));
            Ok(())
        }

        async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            if ctx.is_receiver() {
                while ctx.recv().await?.is_some() {}
            }
            Ok(())
        }
    }

    /// Never finishes on its own.
    struct Stuck;

    #[async_trait]
    impl Actor<u32> for Stuck {
        async fn run_loop(&mut self, _ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn shared<V>() -> Shared<V> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn sinks(count: usize, seen: &Shared<u32>) -> Stage<'static, u32> {
        Stage::pool(count, |_| Sink { seen: seen.clone() })
    }

    fn exits_of<'r>(report: &'r RunReport, stage: &'r str) -> Vec<&'r WorkerExit> {
        report.stage(stage).collect()
    }

    async fn run(config: RelayConfig, stages: Vec<Stage<'_, u32>>) -> RunReport {
        let mut relay = Relay::new(config);
        relay.connect(stages).unwrap();
        relay.start().await.unwrap()
    }

    #[tokio::test]
    async fn one_to_one_delivers_in_order() {
        let seen = shared();
        let report = run(
            RelayConfig::default(),
            vec![Worker::spawned(Producer::range(0, 3)).into(), sinks(1, &seen)],
        )
        .await;

        assert!(report.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);

        let sink = exits_of(&report, "stage-1")[0];
        assert_eq!(sink.received, 3);
        assert_eq!(sink.poison_received, 1);
        assert_eq!(sink.poison_expected, 1);
        assert_eq!(report.exits[0].sent, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_out_delivers_each_item_once() {
        let seen = shared();
        let report = run(
            RelayConfig::default(),
            vec![Worker::spawned(Producer::range(0, 100)).into(), sinks(5, &seen)],
        )
        .await;

        assert!(report.is_success());
        let mut values = seen.lock().unwrap().clone();
        values.sort_unstable();
        assert_eq!(values, (0..100).collect::<Vec<_>>());

        let consumers = exits_of(&report, "stage-1");
        assert_eq!(consumers.len(), 5);
        for consumer in consumers {
            assert_eq!((consumer.poison_received, consumer.poison_expected), (1, 1));
        }
        assert_eq!(report.exits[0].sent, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_in_keeps_per_producer_order() {
        let seen = shared();
        let producers = Stage::pool(3, |i| Producer::range(i as u32 * 1000, 50));
        let report = run(RelayConfig::default(), vec![producers, sinks(1, &seen)]).await;

        assert!(report.is_success());
        let values = seen.lock().unwrap().clone();
        assert_eq!(values.len(), 150);
        for producer in 0..3u32 {
            let from_producer: Vec<u32> = values.iter().copied().filter(|v| v / 1000 == producer).collect();
            let expected: Vec<u32> = (producer * 1000..producer * 1000 + 50).collect();
            assert_eq!(from_producer, expected);
        }

        let sink = exits_of(&report, "stage-1")[0];
        assert_eq!((sink.poison_received, sink.poison_expected), (3, 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_consumer_counts_one_pill_per_producer() {
        let seen = shared();
        let producers = Stage::pool(3, |i| Producer::range(i as u32 * 100, 20));
        let report = run(RelayConfig::with_maxsize(4), vec![producers, sinks(4, &seen)]).await;

        assert!(report.is_success());
        assert_eq!(seen.lock().unwrap().len(), 60);
        for consumer in exits_of(&report, "stage-1") {
            assert_eq!(consumer.poison_received, 3);
        }
        let received: u64 = exits_of(&report, "stage-1").iter().map(|e| e.received).sum();
        assert_eq!(received, 60);
    }

    #[tokio::test]
    async fn bounded_channel_slows_the_producer() {
        let seen = shared();
        let report = run(
            RelayConfig::with_maxsize(1),
            vec![
                Worker::spawned(Producer::range(0, 5)).into(),
                Worker::spawned(SlowSink {
                    delay: Duration::from_millis(40),
                    seen: seen.clone(),
                })
                .into(),
            ],
        )
        .await;

        assert!(report.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        // the producer can only ever be one item ahead of the sink
        assert!(report.exits[0].elapsed >= Duration::from_millis(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn chain_propagates_termination_through_middle_stage() {
        let seen = shared();
        let report = run(
            RelayConfig::default(),
            vec![
                Worker::spawned(Producer::range(0, 10)).into(),
                Stage::pool(2, |_| Proxy),
                sinks(1, &seen),
            ],
        )
        .await;

        assert!(report.is_success());
        let mut values = seen.lock().unwrap().clone();
        values.sort_unstable();
        assert_eq!(values, (1..=10).collect::<Vec<_>>());

        for middle in exits_of(&report, "stage-1") {
            assert_eq!((middle.poison_received, middle.poison_expected), (1, 1));
        }
        let sink = exits_of(&report, "stage-2")[0];
        assert_eq!((sink.poison_received, sink.poison_expected), (2, 2));
    }

    #[tokio::test]
    async fn invalid_topology_starts_nothing() {
        let touched = Arc::new(AtomicBool::new(false));
        let observer = || Observer {
            seen: shared(),
            touched: touched.clone(),
        };
        let mut relay = Relay::default();

        assert_eq!(
            relay.connect(Vec::<Stage<u32>>::new()),
            Err(TopologyError::TooFewStages { found: 0 })
        );
        assert_eq!(
            relay.connect(vec![Worker::spawned(observer())]),
            Err(TopologyError::TooFewStages { found: 1 })
        );
        assert!(matches!(
            relay.connect(vec![Stage::from(Worker::spawned(observer())), Stage::new(vec![])]),
            Err(TopologyError::EmptyStage { .. })
        ));

        assert!(relay.start().await.is_err());
        tokio::task::yield_now().await;
        assert!(!touched.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn context_reflects_position_in_pipeline() {
        let seen = shared();
        let touched = Arc::new(AtomicBool::new(false));
        let observer = |_| Observer {
            seen: seen.clone(),
            touched: touched.clone(),
        };

        let report = run(
            RelayConfig::default(),
            vec![
                Stage::pool(1, observer).with_name("source"),
                Stage::pool(2, observer).with_name("middle"),
                Stage::pool(1, observer).with_name("sink"),
            ],
        )
        .await;

        assert!(report.is_success());
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("middle/Observer-0".to_string(), true, true),
                ("middle/Observer-1".to_string(), true, true),
                ("sink/Observer-0".to_string(), false, true),
                ("source/Observer-0".to_string(), true, false),
            ]
        );
    }

    #[tokio::test]
    async fn inline_collector_fills_caller_state() {
        let mut collected = Vec::new();

        let mut relay = Relay::new(RelayConfig::with_maxsize(2));
        relay
            .connect(vec![
                Stage::pool(2, |i| Producer::range(i as u32 * 10, 5)),
                Stage::from(Worker::inline(Collector { out: &mut collected })),
            ])
            .unwrap();
        let report = relay.start().await.unwrap();
        drop(relay);

        assert!(report.is_success());
        assert_eq!(report.exits[2].placement, Placement::Inline);
        collected.sort_unstable();
        assert_eq!(collected, vec![0, 1, 2, 3, 4, 10, 11, 12, 13, 14]);
    }

    #[tokio::test]
    async fn inline_producer_feeds_spawned_pool() {
        let seen = shared();
        let report = run(
            RelayConfig::with_maxsize(1),
            vec![Worker::inline(Producer::range(0, 20)).into(), sinks(3, &seen)],
        )
        .await;

        assert!(report.is_success());
        assert_eq!(seen.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn failed_startup_sends_no_pills() {
        let seen = shared();
        let (faulty, shut_down) = Faulty::new(&[Phase::Startup], 3);
        let report = run(RelayConfig::default(), vec![Worker::spawned(faulty).into(), sinks(1, &seen)]).await;

        assert!(!report.is_success());
        assert!(shut_down.load(Ordering::SeqCst));
        assert_eq!(
            report.exits[0].status,
            ExitStatus::Failed {
                phase: Phase::Startup,
                error: "no database".into()
            }
        );

        // the sink still ends once the channel closes, but undrained
        let sink = &report.exits[1];
        assert!(sink.status.is_completed());
        assert_eq!((sink.poison_received, sink.poison_expected), (0, 1));
        assert!(!sink.drained());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn poison_on_failure_drains_downstream() {
        let seen = shared();
        let (faulty, _) = Faulty::new(&[Phase::Startup], 3);
        let config = RelayConfig {
            poison_on_failure: true,
            ..RelayConfig::default()
        };
        let report = run(config, vec![Worker::spawned(faulty).into(), sinks(1, &seen)]).await;

        assert_eq!(report.failures().count(), 1);
        assert!(report.exits[1].is_success());
        assert_eq!(report.exits[1].poison_received, 1);
    }

    #[tokio::test]
    async fn failed_loop_still_shuts_down() {
        let seen = shared();
        let (faulty, shut_down) = Faulty::new(&[Phase::Loop], 2);
        let report = run(RelayConfig::default(), vec![Worker::spawned(faulty).into(), sinks(1, &seen)]).await;

        assert!(shut_down.load(Ordering::SeqCst));
        assert_eq!(report.exits[0].status.to_string(), "loop failed: disk full");
        assert_eq!(report.exits[0].sent, 2);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert!(!report.exits[1].drained());
    }

    #[tokio::test]
    async fn failed_shutdown_is_reported() {
        let seen = shared();
        let (faulty, shut_down) = Faulty::new(&[Phase::Shutdown], 2);
        let report = run(RelayConfig::default(), vec![Worker::spawned(faulty).into(), sinks(1, &seen)]).await;

        assert!(shut_down.load(Ordering::SeqCst));
        assert_eq!(
            report.exits[0].status,
            ExitStatus::Failed {
                phase: Phase::Shutdown,
                error: "flush failed".into()
            }
        );
        assert_eq!(report.exits[0].sent, 2);
        // pills go out before shutdown, so the sink drains normally
        assert!(report.exits[1].is_success());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn first_failure_wins_over_shutdown_failure() {
        let seen = shared();
        let (faulty, shut_down) = Faulty::new(&[Phase::Loop, Phase::Shutdown], 1);
        let report = run(RelayConfig::default(), vec![Worker::spawned(faulty).into(), sinks(1, &seen)]).await;

        assert!(shut_down.load(Ordering::SeqCst));
        assert_eq!(
            report.exits[0].status,
            ExitStatus::Failed {
                phase: Phase::Loop,
                error: "disk full".into()
            }
        );
    }

    #[tokio::test]
    async fn panicking_startup_is_reported() {
        let seen = shared();
        let report = run(RelayConfig::default(), vec![Worker::spawned(Unready).into(), sinks(1, &seen)]).await;

        assert_eq!(
            report.exits[0].status,
            ExitStatus::Failed {
                phase: Phase::Startup,
                error: "panicked: config missing".into()
            }
        );
        assert_eq!(report.exits[0].sent, 0);
        assert!(!report.exits[1].drained());
    }

    #[tokio::test]
    async fn panicking_handler_is_reported() {
        let report = run(
            RelayConfig::default(),
            vec![
                Worker::spawned(Producer::range(0, 5)).into(),
                Worker::spawned(Fragile { breaks_on: 3 }).into(),
            ],
        )
        .await;

        assert_eq!(
            report.exits[1].status,
            ExitStatus::Failed {
                phase: Phase::Loop,
                error: "panicked: bad message 3".into()
            }
        );
        assert_eq!(report.exits[1].received, 4);
    }

    #[tokio::test]
    async fn missing_channel_ends_are_errors() {
        // a first-stage actor with the default loop has nothing to read
        let report = run(
            RelayConfig::default(),
            vec![Worker::spawned(Proxy).into(), Worker::spawned(Proxy).into()],
        )
        .await;

        assert_eq!(
            report.exits[0].status.to_string(),
            "loop failed: actor stage-0/Proxy-0 has no inbound channel"
        );
        // the last stage received nothing to forward and the upstream
        // channel closed without a pill
        assert!(report.exits[1].status.is_completed());
        assert!(!report.exits[1].drained());

        let report = run(
            RelayConfig::default(),
            vec![
                Worker::spawned(Producer::range(7, 1)).into(),
                Worker::spawned(Proxy).into(),
            ],
        )
        .await;
        assert_eq!(
            report.exits[1].status.to_string(),
            "loop failed: actor stage-1/Proxy-0 has no outbound channel"
        );
    }

    #[tokio::test]
    async fn deadline_aborts_outstanding_workers() {
        let mut collected = Vec::new();
        let config = RelayConfig {
            deadline_ms: Some(100),
            ..RelayConfig::default()
        };

        let mut relay = Relay::new(config);
        relay
            .connect(vec![
                Stage::from(Worker::spawned(Stuck)),
                Stage::from(Worker::inline(Collector { out: &mut collected })),
            ])
            .unwrap();
        let report = tokio::time::timeout(Duration::from_secs(5), relay.start())
            .await
            .expect("relay must give up at its deadline")
            .unwrap();
        drop(relay);

        assert_eq!(report.failures().count(), 2);
        for exit in &report.exits {
            assert_eq!(exit.status, ExitStatus::Aborted);
        }
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn deadline_keeps_exits_of_finished_workers() {
        let config = RelayConfig {
            deadline_ms: Some(200),
            ..RelayConfig::default()
        };

        let mut relay = Relay::new(config);
        relay
            .connect(vec![
                Stage::from(Worker::spawned(Quick)),
                Stage::from(Worker::inline(Hung)),
            ])
            .unwrap();
        let report = relay.start().await.unwrap();

        let producer = &report.exits[0];
        assert_eq!(producer.status, ExitStatus::Completed);
        assert_eq!(producer.sent, 3);
        assert!(producer.is_success());

        assert_eq!(report.exits[1].status, ExitStatus::Aborted);
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn actor_logs_are_aggregated() {
        struct Chatty;

        #[async_trait]
        impl Actor<u32> for Chatty {
            async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
                for item in 0..3 {
                    ctx.send(item).await?;
                    ctx.log(format!("sent {}", item));
                }
                Ok(())
            }
        }

        let seen = shared();
        let report = run(
            RelayConfig::default(),
            vec![
                Stage::named("source", vec![Worker::spawned(Chatty)]),
                Stage::named("sink", vec![Worker::spawned(Sink { seen: seen.clone() })]),
            ],
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.exits[0].id.to_string(), "source/Chatty-0");
        assert_eq!(report.exits[1].id.to_string(), "sink/Sink-0");
        // six lifecycle lines per worker plus the actor's own
        assert_eq!(report.log_records, 12 + 3);
    }
}
