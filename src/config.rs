//! Ring configuration
//!
//! [`RingConfig`] collects the choices made when a ring is built: size,
//! producer type, wait strategy and rewind policy. It can be read from JSON or
//! from `RINGLANE_*` environment variables and turned into the runtime objects.

use crate::disruptor::{
    is_power_of_two, BatchRewindStrategy, BlockingWaitStrategy, BusySpinWaitStrategy,
    DisruptorError, EventFactory, EventuallyGiveUpBatchRewindStrategy,
    NanosecondPauseBatchRewindStrategy, ProducerType, Result, RingBuffer,
    SimpleBatchRewindStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy,
    YieldingWaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the buffer size
pub const ENV_BUFFER_SIZE: &str = "RINGLANE_BUFFER_SIZE";
/// Environment variable holding the producer type
pub const ENV_PRODUCER_TYPE: &str = "RINGLANE_PRODUCER_TYPE";
/// Environment variable holding the wait strategy
pub const ENV_WAIT_STRATEGY: &str = "RINGLANE_WAIT_STRATEGY";

const DEFAULT_BUFFER_SIZE: usize = 1024;

fn default_spin_tries() -> u32 {
    100
}

fn default_sleep_retries() -> u32 {
    200
}

fn default_sleep_nanos() -> u64 {
    100
}

/// Which [`WaitStrategy`] consumers use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitStrategyKind {
    /// [`BlockingWaitStrategy`]
    #[default]
    Blocking,
    /// [`TimeoutBlockingWaitStrategy`]
    TimeoutBlocking {
        /// Milliseconds before a wait reports a timeout
        timeout_ms: u64,
    },
    /// [`BusySpinWaitStrategy`]
    BusySpin,
    /// [`YieldingWaitStrategy`]
    Yielding {
        /// Spins before the first yield
        #[serde(default = "default_spin_tries")]
        spin_tries: u32,
    },
    /// [`SleepingWaitStrategy`]
    Sleeping {
        /// Spin and yield attempts before sleeping
        #[serde(default = "default_sleep_retries")]
        retries: u32,
        /// Sleep between polls once retries are spent
        #[serde(default = "default_sleep_nanos")]
        sleep_nanos: u64,
    },
}

impl WaitStrategyKind {
    /// Build the configured wait strategy
    pub fn build(&self) -> Arc<dyn WaitStrategy> {
        match *self {
            WaitStrategyKind::Blocking => Arc::new(BlockingWaitStrategy::new()),
            WaitStrategyKind::TimeoutBlocking { timeout_ms } => Arc::new(
                TimeoutBlockingWaitStrategy::new(Duration::from_millis(timeout_ms)),
            ),
            WaitStrategyKind::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            WaitStrategyKind::Yielding { spin_tries } => {
                Arc::new(YieldingWaitStrategy::with_spin_tries(spin_tries))
            }
            WaitStrategyKind::Sleeping {
                retries,
                sleep_nanos,
            } => Arc::new(
                SleepingWaitStrategy::new_with_duration(Duration::from_nanos(sleep_nanos))
                    .with_retries(retries),
            ),
        }
    }
}

impl FromStr for WaitStrategyKind {
    type Err = DisruptorError;

    /// Parse `blocking`, `busy_spin`, `yielding`, `sleeping` or
    /// `timeout_blocking:<millis>`
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_lowercase();
        let (name, argument) = match value.split_once(':') {
            Some((name, argument)) => (name, Some(argument)),
            None => (value.as_str(), None),
        };

        match (name, argument) {
            ("blocking", None) => Ok(WaitStrategyKind::Blocking),
            ("busy_spin", None) => Ok(WaitStrategyKind::BusySpin),
            ("yielding", None) => Ok(WaitStrategyKind::Yielding {
                spin_tries: default_spin_tries(),
            }),
            ("sleeping", None) => Ok(WaitStrategyKind::Sleeping {
                retries: default_sleep_retries(),
                sleep_nanos: default_sleep_nanos(),
            }),
            ("timeout_blocking", Some(millis)) => {
                let timeout_ms = millis.parse().map_err(|_| {
                    DisruptorError::InvalidConfig(format!("invalid wait timeout: '{millis}'"))
                })?;
                Ok(WaitStrategyKind::TimeoutBlocking { timeout_ms })
            }
            _ => Err(DisruptorError::InvalidConfig(format!(
                "invalid wait strategy: '{s}'"
            ))),
        }
    }
}

/// What a processor does when a handler raises a rewindable error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewindPolicy {
    /// [`SimpleBatchRewindStrategy`]
    #[default]
    Always,
    /// [`EventuallyGiveUpBatchRewindStrategy`]
    EventuallyGiveUp {
        /// Consecutive failures before the error is reported
        max_attempts: u32,
    },
    /// [`NanosecondPauseBatchRewindStrategy`]
    NanosecondPause {
        /// Pause before each rewind
        nanos: u64,
    },
}

impl RewindPolicy {
    /// Build the configured rewind strategy
    pub fn build(&self) -> Box<dyn BatchRewindStrategy> {
        match *self {
            RewindPolicy::Always => Box::new(SimpleBatchRewindStrategy::new()),
            RewindPolicy::EventuallyGiveUp { max_attempts } => {
                Box::new(EventuallyGiveUpBatchRewindStrategy::new(max_attempts))
            }
            RewindPolicy::NanosecondPause { nanos } => {
                Box::new(NanosecondPauseBatchRewindStrategy::new(nanos))
            }
        }
    }
}

/// Configuration for building a ring buffer and its consumers
///
/// # Examples
/// ```
/// use ringlane::config::{RingConfig, WaitStrategyKind};
/// use ringlane::disruptor::ProducerType;
///
/// let config = RingConfig::from_json_str(
///     r#"{ "buffer_size": 256, "producer_type": "single", "wait_strategy": { "kind": "busy_spin" } }"#,
/// ).unwrap();
///
/// assert_eq!(config.buffer_size, 256);
/// assert_eq!(config.producer_type, ProducerType::Single);
/// assert_eq!(config.wait_strategy, WaitStrategyKind::BusySpin);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingConfig {
    /// Number of slots, a power of two
    pub buffer_size: usize,
    /// Single or multi producer sequencing
    pub producer_type: ProducerType,
    /// How consumers wait for events
    pub wait_strategy: WaitStrategyKind,
    /// How processors handle rewindable errors
    pub rewind: RewindPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            producer_type: ProducerType::default(),
            wait_strategy: WaitStrategyKind::default(),
            rewind: RewindPolicy::default(),
        }
    }
}

impl RingConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults
    ///
    /// # Errors
    /// `ConfigParse` for malformed JSON, otherwise see [`RingConfig::validate`]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `RINGLANE_*` environment variables over the defaults
    ///
    /// # Errors
    /// `InvalidConfig` for unparsable values, otherwise see [`RingConfig::validate`]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RingConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RingConfig::default();

        if let Some(value) = lookup(ENV_BUFFER_SIZE) {
            config.buffer_size = value.trim().parse().map_err(|_| {
                DisruptorError::InvalidConfig(format!("{ENV_BUFFER_SIZE}: invalid size '{value}'"))
            })?;
        }

        if let Some(value) = lookup(ENV_PRODUCER_TYPE) {
            config.producer_type = value
                .parse()
                .map_err(|e: String| DisruptorError::InvalidConfig(format!("{ENV_PRODUCER_TYPE}: {e}")))?;
        }

        if let Some(value) = lookup(ENV_WAIT_STRATEGY) {
            config.wait_strategy = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no ring could be built with
    ///
    /// # Errors
    /// `InvalidBufferSize` for a size that is not a power of two,
    /// `InvalidConfig` for a zero timeout or a zero rewind attempt limit
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(self.buffer_size));
        }

        if let WaitStrategyKind::TimeoutBlocking { timeout_ms: 0 } = self.wait_strategy {
            return Err(DisruptorError::InvalidConfig(
                "wait timeout must be greater than zero".to_string(),
            ));
        }

        if let RewindPolicy::EventuallyGiveUp { max_attempts: 0 } = self.rewind {
            return Err(DisruptorError::InvalidConfig(
                "max rewind attempts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the configured wait strategy
    pub fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        self.wait_strategy.build()
    }

    /// Build the configured rewind strategy
    pub fn rewind_strategy(&self) -> Box<dyn BatchRewindStrategy> {
        self.rewind.build()
    }

    /// Build a ring buffer from this configuration
    ///
    /// # Errors
    /// See [`RingConfig::validate`]
    pub fn build_ring_buffer<T, F>(&self, event_factory: F) -> Result<RingBuffer<T>>
    where
        F: EventFactory<T>,
    {
        self.validate()?;
        RingBuffer::create(
            self.producer_type,
            event_factory,
            self.buffer_size,
            self.wait_strategy(),
        )
    }
}
