//! Ringlane demo
//!
//! Pushes a stream of numbered events through one ring buffer into a single
//! batch event processor, then reports throughput and verifies the checksum
//! seen by the consumer.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use ringlane::config::RingConfig;
use ringlane::disruptor::{
    BatchEventProcessor, DataProvider, DefaultEventFactory, EventHandler, EventProcessor,
    EventSink, RingBuffer,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "ringlane")]
#[command(about = "Push events through a ring buffer and report throughput")]
#[command(version)]
struct Args {
    /// JSON configuration file (RINGLANE_* environment variables otherwise)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Events to publish per producer
    #[arg(short, long, default_value_t = 1_000_000)]
    events: u64,

    /// Number of producer threads
    #[arg(short, long, default_value_t = 1)]
    producers: u64,

    /// Pin the consumer thread to this core id
    #[arg(long)]
    pin_core: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Default)]
struct ValueEvent {
    value: u64,
}

/// Sums event values and reports the totals when the processor shuts down
struct Checksum {
    sum: u64,
    count: u64,
    reported_sum: Arc<AtomicU64>,
    reported_count: Arc<AtomicU64>,
}

impl EventHandler<ValueEvent> for Checksum {
    fn on_event(
        &mut self,
        event: &ValueEvent,
        _sequence: i64,
        _end_of_batch: bool,
    ) -> ringlane::Result<()> {
        self.sum = self.sum.wrapping_add(event.value);
        self.count += 1;
        Ok(())
    }

    fn on_start(&mut self) -> ringlane::Result<()> {
        debug!("checksum consumer started");
        Ok(())
    }

    fn on_shutdown(&mut self) -> ringlane::Result<()> {
        self.reported_sum.store(self.sum, Ordering::Release);
        self.reported_count.store(self.count, Ordering::Release);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(&args)?;
    info!(?config, "starting ringlane demo");

    if args.producers > 1 && config.producer_type.is_single() {
        bail!(
            "{} producers need a multi producer ring, config selects single",
            args.producers
        );
    }

    let ring = Arc::new(config.build_ring_buffer(DefaultEventFactory::<ValueEvent>::new())?);

    let reported_sum = Arc::new(AtomicU64::new(0));
    let reported_count = Arc::new(AtomicU64::new(0));
    let processor = Arc::new(
        BatchEventProcessor::new(
            Arc::clone(&ring) as Arc<dyn DataProvider<ValueEvent>>,
            Arc::new(ring.new_barrier(&[])),
            Checksum {
                sum: 0,
                count: 0,
                reported_sum: Arc::clone(&reported_sum),
                reported_count: Arc::clone(&reported_count),
            },
        )
        .with_rewind_strategy(config.rewind_strategy()),
    );
    ring.add_gating_sequences(&[processor.get_sequence()]);

    let consumer = {
        let processor = Arc::clone(&processor);
        let pin_core = args.pin_core;
        thread::Builder::new()
            .name("ringlane-consumer".to_string())
            .spawn(move || {
                if let Some(core) = pin_core {
                    pin_current_thread(core);
                }
                processor.run()
            })
            .context("failed to spawn consumer thread")?
    };

    let total = args
        .producers
        .checked_mul(args.events)
        .context("event count overflows")?;
    let started = Instant::now();
    publish_all(&ring, args.producers, args.events)?;

    if total > 0 {
        let last = i64::try_from(total - 1).context("event count exceeds sequence range")?;
        while processor.get_sequence().get() < last {
            thread::yield_now();
        }
    }
    let elapsed = started.elapsed();

    processor.halt();
    consumer
        .join()
        .map_err(|_| anyhow!("consumer thread panicked"))??;

    let throughput = total as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    let checksum = reported_sum.load(Ordering::Acquire);
    let expected = expected_checksum(total);
    info!(
        events = total,
        consumed = reported_count.load(Ordering::Acquire),
        elapsed_ms = elapsed.as_millis() as u64,
        ops_per_sec = throughput as u64,
        checksum,
        "run complete"
    );

    if checksum != expected {
        bail!("checksum mismatch: consumer saw {checksum}, expected {expected}");
    }
    Ok(())
}

/// Initialize logging, preferring `RUST_LOG` over the command line level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<RingConfig> {
    match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RingConfig::from_json_str(&json)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => RingConfig::from_env().context("invalid RINGLANE_* environment"),
    }
}

fn pin_current_thread(core: usize) {
    let core_id = core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .find(|id| id.id == core);

    match core_id {
        Some(core_id) if core_affinity::set_for_current(core_id) => {
            info!(core, "pinned consumer thread");
        }
        _ => warn!(core, "could not pin consumer thread"),
    }
}

/// Producer `p` publishes the values `p * events + 1 ..= (p + 1) * events`
fn publish_all(
    ring: &Arc<RingBuffer<ValueEvent>>,
    producers: u64,
    events: u64,
) -> anyhow::Result<()> {
    let handles: Vec<_> = (0..producers)
        .map(|producer| {
            let ring = Arc::clone(ring);
            thread::Builder::new()
                .name(format!("ringlane-producer-{producer}"))
                .spawn(move || {
                    let base = producer * events;
                    for i in 1..=events {
                        ring.publish_event(|event, _| event.value = base + i);
                    }
                })
        })
        .collect::<std::io::Result<_>>()
        .context("failed to spawn producer thread")?;

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))?;
    }
    Ok(())
}

/// Sum of `1..=total`, modulo 2^64 like the consumer's running sum
fn expected_checksum(total: u64) -> u64 {
    if total % 2 == 0 {
        (total / 2).wrapping_mul(total.wrapping_add(1))
    } else {
        total.wrapping_mul((total + 1) / 2)
    }
}
