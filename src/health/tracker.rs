//! Per-destination TKO state machine.
//!
//! # States
//! - Healthy: destination receives traffic
//! - SoftTko: failures observed, still below the knock-out threshold
//! - HardTko: destination excluded from attempts until a success resets it
//!
//! # State Transitions
//! ```text
//! Healthy → SoftTko: first failure (threshold > 1)
//! SoftTko → HardTko: consecutive_failures >= timeouts_until_tko
//! any     → Healthy: any success (immediate reset, no probe phase)
//! ```
//!
//! # Design Decisions
//! - One packed atomic word per destination: failure count and
//!   classification change together in a single CAS, so `HardTko` always
//!   implies `consecutive_failures >= threshold`
//! - SeqCst: record_outcome calls for one destination form a single total
//!   order observed identically by every worker shard
//! - Recovery is immediate on success; no half-open probe state is modeled

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::DestinationId;

/// Health classification of a destination.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Healthy = 0,
    SoftTko = 1,
    HardTko = 2,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Healthy => "healthy",
            Classification::SoftTko => "soft-tko",
            Classification::HardTko => "hard-tko",
        }
    }
}

impl From<u8> for Classification {
    fn from(val: u8) -> Self {
        match val {
            1 => Classification::SoftTko,
            2 => Classification::HardTko,
            _ => Classification::Healthy,
        }
    }
}

// State word layout: low 32 bits consecutive failures, bits 32..40 the
// classification discriminant.
const CLASS_SHIFT: u32 = 32;
const FAILURE_MASK: u64 = u32::MAX as u64;

fn pack(failures: u32, classification: Classification) -> u64 {
    (failures as u64) | ((classification as u64) << CLASS_SHIFT)
}

fn unpack(word: u64) -> (u32, Classification) {
    (
        (word & FAILURE_MASK) as u32,
        Classification::from((word >> CLASS_SHIFT) as u8),
    )
}

/// Arena of per-destination health cells.
///
/// Sized to the destination registry at construction; lives exactly as long
/// as one configuration load. A reload builds a fresh tracker, which is what
/// resets health state.
#[derive(Debug)]
pub struct HealthTracker {
    cells: Vec<AtomicU64>,
    timeouts_until_tko: u32,
}

impl HealthTracker {
    /// Create a tracker for `destination_count` destinations.
    ///
    /// `timeouts_until_tko` is the consecutive-failure threshold; config
    /// validation guarantees it is at least 1.
    pub fn new(destination_count: usize, timeouts_until_tko: u32) -> Self {
        let cells = (0..destination_count)
            .map(|_| AtomicU64::new(pack(0, Classification::Healthy)))
            .collect();
        Self {
            cells,
            timeouts_until_tko,
        }
    }

    /// Record the outcome of an attempted transport operation.
    ///
    /// Failures increment the consecutive-failure count and knock the
    /// destination out once the threshold is reached. A success resets the
    /// count and classification unconditionally.
    pub fn record_outcome(&self, id: DestinationId, success: bool) {
        let cell = &self.cells[id.index()];

        if success {
            let previous = cell.swap(pack(0, Classification::Healthy), Ordering::SeqCst);
            let (_, previous_class) = unpack(previous);
            if previous_class == Classification::HardTko {
                tracing::info!(destination = %id, "Destination recovered from TKO");
            }
            return;
        }

        let mut current = cell.load(Ordering::SeqCst);
        loop {
            let (failures, _) = unpack(current);
            let failures = failures.saturating_add(1);
            let next_class = if failures >= self.timeouts_until_tko {
                Classification::HardTko
            } else {
                Classification::SoftTko
            };
            match cell.compare_exchange(
                current,
                pack(failures, next_class),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(previous) => {
                    let (_, previous_class) = unpack(previous);
                    if next_class == Classification::HardTko
                        && previous_class != Classification::HardTko
                    {
                        tracing::warn!(
                            destination = %id,
                            consecutive_failures = failures,
                            threshold = self.timeouts_until_tko,
                            "Destination knocked out"
                        );
                    }
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Whether the destination may be attempted.
    ///
    /// False iff classified HardTko. Pure read; never mutates state.
    pub fn is_routable(&self, id: DestinationId) -> bool {
        self.classification(id) != Classification::HardTko
    }

    pub fn classification(&self, id: DestinationId) -> Classification {
        let (_, classification) = unpack(self.cells[id.index()].load(Ordering::SeqCst));
        classification
    }

    pub fn consecutive_failures(&self, id: DestinationId) -> u32 {
        let (failures, _) = unpack(self.cells[id.index()].load(Ordering::SeqCst));
        failures
    }

    pub fn destination_count(&self) -> usize {
        self.cells.len()
    }

    pub fn threshold(&self) -> u32 {
        self.timeouts_until_tko
    }
}
