//! Named, ordered destination pools.

use std::fmt;

use crate::registry::destination::DestinationId;

/// Identifier for a pool within one configuration load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(pub(crate) u32);

impl PoolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A named, ordered sequence of destinations.
///
/// Order is significant: it is an input to deterministic selection. Pools may
/// overlap; a destination appearing in two pools keeps a single
/// `DestinationId`, which is what makes duplicate candidates detectable.
#[derive(Debug, Clone)]
pub struct Pool {
    pub name: String,
    pub destinations: Vec<DestinationId>,
}

impl Pool {
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
