//! 存储调用熔断
//!
//! ```text
//! Closed --连续失败达到阈值--> Open --reset_timeout--> HalfOpen
//!   ^                                                   |
//!   +--------------------探测成功-----------------------+
//! ```
//! HalfOpen 只放行一个探测请求，探测失败立即回到 Open。

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use strum::Display;
use tracing::{info, warn};

use crate::errors::{Result, ShortpoolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                ..config
            },
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// 请求放行；熔断打开时快速失败
    pub fn try_acquire(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!("Store circuit half-open, sending probe");
                    Ok(())
                } else {
                    Err(ShortpoolError::store_unavailable(
                        "存储熔断已打开，暂停访问后端",
                    ))
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(ShortpoolError::store_unavailable(
                        "存储熔断半开，探测请求进行中",
                    ))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!("Store circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.probe_in_flight = false;

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            warn!(
                "Store circuit opened after {} consecutive failures; failing fast for {:?}",
                inner.consecutive_failures, self.config.reset_timeout
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}
