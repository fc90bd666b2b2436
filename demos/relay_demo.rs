// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use the_relay::config::{load_merged, RelayConfig};
use the_relay::engine::{Relay, Stage, Worker};
use the_relay::observability::init_tracing;
use the_relay::traits::{Actor, ActorContext};

/// Demo: a four-stage text pipeline configured from YAML.
/// Usage: cargo run --example relay_demo [override.yaml]
#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    relay: RelayConfig,
    producers: usize,
    items_per_producer: u32,
    prep_workers: usize,
    post_workers: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            producers: 1,
            items_per_producer: 5,
            prep_workers: 2,
            post_workers: 1,
        }
    }
}

#[derive(Debug)]
struct Line {
    source: usize,
    seq: u32,
    text: String,
}

struct Producer {
    source: usize,
    count: u32,
}

#[async_trait]
impl Actor<Line> for Producer {
    async fn run_loop(&mut self, ctx: &mut ActorContext<Line>) -> anyhow::Result<()> {
        for seq in 0..self.count {
            let text = format!("hello world {} from {}", seq, self.source);
            ctx.send(Line {
                source: self.source,
                seq,
                text,
            })
            .await?;
        }
        ctx.log(format!("produced {} lines", self.count));
        Ok(())
    }
}

/// Upper-cases each line.
struct Prep;

#[async_trait]
impl Actor<Line> for Prep {
    async fn handle(&mut self, ctx: &mut ActorContext<Line>, mut msg: Line) -> anyhow::Result<()> {
        msg.text = msg.text.to_uppercase();
        ctx.send(msg).await?;
        Ok(())
    }
}

/// Reverses each line.
struct Post;

#[async_trait]
impl Actor<Line> for Post {
    async fn handle(&mut self, ctx: &mut ActorContext<Line>, mut msg: Line) -> anyhow::Result<()> {
        msg.text = msg.text.chars().rev().collect();
        ctx.send(msg).await?;
        Ok(())
    }
}

/// Runs in the relay's own context and fills the caller's vector.
struct Collector<'a> {
    out: &'a mut Vec<Line>,
}

#[async_trait]
impl Actor<Line> for Collector<'_> {
    async fn handle(&mut self, _ctx: &mut ActorContext<Line>, msg: Line) -> anyhow::Result<()> {
        self.out.push(msg);
        Ok(())
    }

    async fn shutdown(&mut self, ctx: &mut ActorContext<Line>) -> anyhow::Result<()> {
        ctx.log(format!("collected {} lines", self.out.len()));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");

    let mut files = vec![concat!(env!("CARGO_MANIFEST_DIR"), "/demos/relay_demo.yaml").to_string()];
    files.extend(env::args().skip(1));

    let config: DemoConfig = load_merged(&files)?;
    println!("=== Relay Demo ===\n");
    println!("- Config files: {:?}", files);
    println!("- Producers: {}", config.producers);
    println!("- Prep workers: {}", config.prep_workers);
    println!("- Post workers: {}", config.post_workers);
    println!("- Channel maxsize: {}", config.relay.maxsize);

    let mut collected = Vec::new();
    let mut relay = Relay::new(config.relay.clone());
    let items = config.items_per_producer;

    relay.connect(vec![
        Stage::pool(config.producers, |source| Producer { source, count: items }).with_name("source"),
        Stage::pool(config.prep_workers, |_| Prep).with_name("prep"),
        Stage::pool(config.post_workers, |_| Post).with_name("post"),
        Stage::named("collect", vec![Worker::inline(Collector { out: &mut collected })]),
    ])?;

    let report = relay.start().await?;
    drop(relay);

    println!("\n=== Worker Exits ===");
    for exit in &report.exits {
        println!(
            "- {}: {} (in {}, out {}, pills {}/{})",
            exit.id, exit.status, exit.received, exit.sent, exit.poison_received, exit.poison_expected
        );
    }

    collected.sort_by_key(|line| (line.source, line.seq));
    println!("\n=== Collected {} lines ===", collected.len());
    for line in collected.iter().take(5) {
        println!("- [{}:{}] {}", line.source, line.seq, line.text);
    }

    let expected = config.producers * config.items_per_producer as usize;
    if report.is_success() && collected.len() == expected {
        println!("\nRelay completed in {:?}", report.elapsed);
        Ok(())
    } else {
        Err(format!("relay finished with {} failed workers", report.failures().count()).into())
    }
}
