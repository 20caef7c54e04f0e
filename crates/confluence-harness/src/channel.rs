//! Frame-latency channel.
//!
//! Carries encoded [`InterfaceFrame`]s one way between two simulated
//! networks. Time is counted in frames: every [`FrameChannel::advance`] is
//! one integration step. Frames are delayed by a fixed latency plus seeded
//! random jitter, and may be dropped.
//!
//! The channel has latest-value semantics. When several frames are due at
//! once only the newest is delivered, and a frame older than one already
//! delivered is discarded.

use bytes::BytesMut;
use confluence_proto::InterfaceFrame;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::HarnessError;

/// Channel behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Base delay in frames. A frame is never delivered before the next step.
    pub latency: u32,
    /// Extra random delay, uniform in `0..=jitter` frames.
    pub jitter: u32,
    /// Probability that a frame is lost.
    pub drop_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { latency: 1, jitter: 0, drop_rate: 0.0, seed: 0 }
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStats {
    /// Frames handed to the channel.
    pub sent: u64,
    /// Frames delivered.
    pub delivered: u64,
    /// Frames lost to the drop rate.
    pub dropped: u64,
    /// Frames overtaken by a newer one.
    pub superseded: u64,
    /// Frames that failed to decode.
    pub corrupt: u64,
}

#[derive(Debug, Clone)]
struct InFlight {
    seq: u64,
    due: u64,
    bytes: BytesMut,
}

/// One-way frame channel.
#[derive(Debug, Clone)]
pub struct FrameChannel {
    config: ChannelConfig,
    rng: ChaCha8Rng,
    now: u64,
    next_seq: u64,
    in_flight: Vec<InFlight>,
    stats: ChannelStats,
}

impl FrameChannel {
    /// Create a channel.
    pub fn new(config: ChannelConfig) -> Result<Self, HarnessError> {
        if !(0.0..=1.0).contains(&config.drop_rate) {
            return Err(HarnessError::InvalidDropRate(config.drop_rate));
        }
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            now: 0,
            next_seq: 0,
            in_flight: Vec::new(),
            stats: ChannelStats::default(),
        })
    }

    /// Channel behaviour.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Delivery counters.
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Frames currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Encode and enqueue a frame.
    pub fn send(&mut self, frame: &InterfaceFrame) -> Result<(), HarnessError> {
        let mut bytes = BytesMut::with_capacity(frame.encoded_len());
        frame.encode(&mut bytes)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.sent += 1;

        if self.config.drop_rate > 0.0 && self.rng.gen_bool(self.config.drop_rate) {
            self.stats.dropped += 1;
            tracing::trace!("Channel dropped frame {}", frame.frame_count);
            return Ok(());
        }

        let jitter =
            if self.config.jitter > 0 { self.rng.gen_range(0..=self.config.jitter) } else { 0 };
        let delay = u64::from(self.config.latency.saturating_add(jitter).max(1));
        self.in_flight.push(InFlight { seq, due: self.now + delay, bytes });
        Ok(())
    }

    /// Advance one frame and return the newest frame now due, if any.
    pub fn advance(&mut self) -> Option<InterfaceFrame> {
        self.now += 1;

        let (due, pending): (Vec<_>, Vec<_>) =
            self.in_flight.drain(..).partition(|f| f.due <= self.now);
        self.in_flight = pending;

        let overtaken = due.len().saturating_sub(1);
        let newest = due.into_iter().max_by_key(|f| f.seq)?;
        self.stats.superseded += overtaken as u64;

        // Anything still in flight and older than this frame is stale, so
        // deliveries never go backwards.
        let before = self.in_flight.len();
        self.in_flight.retain(|f| f.seq > newest.seq);
        self.stats.superseded += (before - self.in_flight.len()) as u64;

        match InterfaceFrame::decode(&newest.bytes) {
            Ok(frame) => {
                self.stats.delivered += 1;
                Some(frame)
            },
            Err(e) => {
                tracing::warn!("Channel failed to decode frame: {}", e);
                self.stats.corrupt += 1;
                None
            },
        }
    }
}
