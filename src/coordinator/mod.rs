use crate::prelude::*;
use crate::register_cache::reading_from_words;
use crate::timnet::RegisterReader;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// First register of the block read every tick.
pub const BLOCK_START: u16 = 0x0000;
/// Covers every catalogued register, 0x0000-0x0015.
pub const BLOCK_SIZE: u16 = 22;

#[derive(Debug, Clone)]
pub enum ChannelData {
    Polled(config::Controller, Arc<CachedState>),
    Shutdown,
}

/// How a single fetch went, before it is folded into the cache.
#[derive(Debug)]
pub enum PollOutcome {
    Data(RawReading),
    /// The device answered with fewer registers than asked for (possibly none).
    Short(usize),
    Failed(ModbusError),
}

#[derive(Default, Debug, Clone)]
pub struct PollStats {
    pub polls: u64,
    pub successes: u64,
    pub short_reads: u64,
    pub transport_errors: u64,
    pub protocol_errors: u64,
    pub overlapping_ticks: u64,
}

impl PollStats {
    pub fn print_summary(&self, name: &str) {
        info!("Poll statistics for {}:", name);
        info!("  Polls: {}", self.polls);
        info!("  Successful: {}", self.successes);
        info!("  Short reads: {}", self.short_reads);
        info!("  Transport errors: {}", self.transport_errors);
        info!("  Protocol errors: {}", self.protocol_errors);
        info!("  Overlapping ticks skipped: {}", self.overlapping_ticks);
    }
}

// clears the in-progress flag however the poll ends
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Acquisition loop for one controller: one call to [`Coordinator::poll`]
/// is one tick. The timer lives in the scheduler.
#[derive(Clone)]
pub struct Coordinator {
    controller: config::Controller,
    reader: Arc<dyn RegisterReader>,
    cache: RegisterCache,
    in_progress: Arc<AtomicBool>,
    pub stats: Arc<Mutex<PollStats>>,
}

impl Coordinator {
    pub fn new(
        controller: config::Controller,
        reader: Arc<dyn RegisterReader>,
        cache: RegisterCache,
    ) -> Self {
        Self {
            controller,
            reader,
            cache,
            in_progress: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(PollStats::default())),
        }
    }

    pub fn controller(&self) -> &config::Controller {
        &self.controller
    }

    pub fn cache(&self) -> &RegisterCache {
        &self.cache
    }

    pub fn stats(&self) -> PollStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Runs one tick and returns the state consumers will now see.
    ///
    /// Never fails: errors only flip `connection_healthy` and leave the last
    /// good reading in place. A tick that arrives while another is still
    /// running returns the current state untouched.
    pub async fn poll(&self) -> Arc<CachedState> {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            warn!(
                "{}: previous poll still running, skipping this tick",
                self.controller.name()
            );
            if let Ok(mut stats) = self.stats.lock() {
                stats.overlapping_ticks += 1;
            }
            return self.cache.snapshot();
        }
        let _guard = PollGuard(&self.in_progress);

        let outcome = self.fetch().await;
        self.apply(outcome)
    }

    /// Reads the register block. No retries; the next tick is the retry.
    pub async fn fetch(&self) -> PollOutcome {
        match self
            .reader
            .read_holding_registers(BLOCK_START, BLOCK_SIZE)
            .await
        {
            Ok(words) if words.len() == BLOCK_SIZE as usize => {
                PollOutcome::Data(reading_from_words(&words))
            }
            Ok(words) => PollOutcome::Short(words.len()),
            Err(err) => PollOutcome::Failed(err),
        }
    }

    fn apply(&self, outcome: PollOutcome) -> Arc<CachedState> {
        let name = self.controller.name();
        let mut stats = self.stats.lock().ok();
        if let Some(stats) = stats.as_mut() {
            stats.polls += 1;
        }

        let next = match outcome {
            PollOutcome::Data(reading) => {
                debug!("{}: read {} registers", name, reading.len());
                if let Some(stats) = stats.as_mut() {
                    stats.successes += 1;
                }
                CachedState {
                    last_good_reading: reading,
                    connection_healthy: true,
                }
            }
            PollOutcome::Short(len) => {
                warn!(
                    "{}: got {} of {} registers from {}:{} - using last known values",
                    name,
                    len,
                    BLOCK_SIZE,
                    self.controller.host(),
                    self.controller.port()
                );
                if let Some(stats) = stats.as_mut() {
                    stats.short_reads += 1;
                }
                self.degraded()
            }
            PollOutcome::Failed(err) => {
                warn!(
                    "{}: error reading from {}:{}: {} - using last known values",
                    name,
                    self.controller.host(),
                    self.controller.port(),
                    err
                );
                if let Some(stats) = stats.as_mut() {
                    if err.is_protocol() {
                        stats.protocol_errors += 1;
                    } else {
                        stats.transport_errors += 1;
                    }
                }
                self.degraded()
            }
        };
        drop(stats);

        self.cache.replace(next)
    }

    // previous reading, connection marked down
    fn degraded(&self) -> CachedState {
        CachedState {
            last_good_reading: self.cache.snapshot().last_good_reading.clone(),
            connection_healthy: false,
        }
    }
}
