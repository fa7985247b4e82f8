//! Failover decision engine.
//!
//! # Responsibilities
//! - Select the primary destination for a key
//! - Gate every candidate through the health tracker (TKO short-circuit)
//! - Walk the failover policy deterministically on failure
//! - Suppress duplicate candidates (collisions)
//! - Account every outcome in the stats registry exactly once
//!
//! # Design Decisions
//! - The candidate sequence for a key is a pure function of (key, topology):
//!   no retry counter, timestamp, or worker identity feeds selection, so
//!   uncoordinated shards and restarted processes agree on every choice
//! - A pool-valued policy entry is one candidate, not an inner retry loop
//! - A destination consumed once in a request (attempted or short-circuited)
//!   is never consumed again; later entries resolving to it are collisions
//! - Dropping the returned future aborts the remaining iteration; counters
//!   already incremented stay, nothing else is touched

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::registry::DestinationId;
use crate::routing::hasher::hash_to_index;
use crate::routing::policy::PolicyEntry;
use crate::routing::RouterState;
use crate::stats::StatsRegistry;
use crate::transport::{Operation, Reply, Transport};

/// Terminal routing failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The key carried a routing prefix that names no configured route.
    #[error("no route for key '{0}'")]
    NoRoute(String),

    /// Every policy entry was exhausted without a successful attempt.
    #[error("all failover candidates failed")]
    AllFailed,
}

/// Ephemeral per-request state: the ordered set of physical destinations
/// already consumed as candidates.
#[derive(Debug, Default)]
struct RequestContext {
    consumed: Vec<DestinationId>,
}

impl RequestContext {
    fn already_consumed(&self, id: DestinationId) -> bool {
        self.consumed.contains(&id)
    }

    fn consume(&mut self, id: DestinationId) {
        self.consumed.push(id);
    }

    fn candidates(&self) -> usize {
        self.consumed.len()
    }
}

enum CandidateOutcome {
    Success(Reply),
    TkoShortCircuit,
    Failed,
}

/// Orchestrates one request's journey through primary attempt, health-gated
/// skips, deterministic failover iteration, and exhaustion handling.
pub struct FailoverEngine {
    transport: Arc<dyn Transport>,
    stats: Arc<StatsRegistry>,
    attempt_timeout: Duration,
    disable_miss_on_get_errors: bool,
}

impl FailoverEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        stats: Arc<StatsRegistry>,
        attempt_timeout: Duration,
        disable_miss_on_get_errors: bool,
    ) -> Self {
        Self {
            transport,
            stats,
            attempt_timeout,
            disable_miss_on_get_errors,
        }
    }

    /// Route one operation.
    ///
    /// On exhaustion, a get is downgraded to a miss unless
    /// `disable_miss_on_get_errors` is set; mutations always surface the
    /// error.
    pub async fn route(&self, state: &RouterState, op: &Operation) -> Result<Reply, RouteError> {
        let Some((policy, effective_key)) = state.table.select(op.key()) else {
            return Err(RouteError::NoRoute(op.key().to_string()));
        };
        let op: Cow<'_, Operation> = if effective_key == op.key() {
            Cow::Borrowed(op)
        } else {
            Cow::Owned(op.rekeyed(effective_key))
        };

        let registry = state.table.registry();
        let mut ctx = RequestContext::default();

        let primary_pool = registry.pool(policy.primary);
        let primary =
            primary_pool.destinations[hash_to_index(op.key(), primary_pool.len())];

        if let CandidateOutcome::Success(reply) =
            self.try_candidate(state, primary, &op, &mut ctx).await
        {
            return Ok(reply);
        }

        for entry in &policy.entries {
            let candidate = match entry {
                PolicyEntry::Pool(pool_id) => {
                    let pool = registry.pool(*pool_id);
                    pool.destinations[hash_to_index(op.key(), pool.len())]
                }
                PolicyEntry::Destination(id) => *id,
            };

            if ctx.already_consumed(candidate) {
                self.stats.incr_collisions();
                tracing::debug!(
                    route = %policy.route_name,
                    destination = %candidate,
                    "Failover entry resolved to an already-consumed destination"
                );
                continue;
            }

            match self.try_candidate(state, candidate, &op, &mut ctx).await {
                CandidateOutcome::Success(reply) => {
                    tracing::debug!(
                        route = %policy.route_name,
                        destination = %candidate,
                        candidates = ctx.candidates(),
                        "Failover candidate succeeded"
                    );
                    return Ok(reply);
                }
                CandidateOutcome::TkoShortCircuit | CandidateOutcome::Failed => {}
            }
        }

        self.stats.incr_all_failed();
        tracing::warn!(
            route = %policy.route_name,
            key = %op.key(),
            candidates = ctx.candidates(),
            "All failover candidates exhausted"
        );

        if op.is_get() && !self.disable_miss_on_get_errors {
            Ok(Reply::Miss)
        } else {
            self.stats.incr_result_error();
            Err(RouteError::AllFailed)
        }
    }

    /// Consume one candidate: health gate, then a bounded transport attempt.
    async fn try_candidate(
        &self,
        state: &RouterState,
        id: DestinationId,
        op: &Operation,
        ctx: &mut RequestContext,
    ) -> CandidateOutcome {
        ctx.consume(id);

        if !state.tracker.is_routable(id) {
            self.stats.incr_policy_tko_error();
            tracing::debug!(destination = %id, "Skipping knocked-out destination");
            return CandidateOutcome::TkoShortCircuit;
        }

        let destination = state.table.registry().destination(id);
        match self
            .transport
            .attempt(destination, op, self.attempt_timeout)
            .await
        {
            Ok(reply) => {
                state.tracker.record_outcome(id, true);
                CandidateOutcome::Success(reply)
            }
            Err(error) => {
                state.tracker.record_outcome(id, false);
                self.stats.incr_policy_result_error();
                tracing::debug!(
                    destination = %destination,
                    error = %error,
                    "Attempt failed"
                );
                CandidateOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, RuntimeOverrides};
    use crate::stats;
    use crate::transport::TransportError;
    use crate::registry::Destination;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Transport double: fails for addresses in `failing`, records every
    /// attempt in order.
    struct MockTransport {
        failing: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn failing_all() -> Self {
            Self {
                failing: HashSet::from(["*".to_string()]),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn failing_only(addresses: &[&str]) -> Self {
            Self {
                failing: addresses.iter().map(|s| s.to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn attempt(
            &self,
            destination: &Destination,
            _op: &Operation,
            _timeout: Duration,
        ) -> Result<Reply, TransportError> {
            let address = destination.address();
            self.attempts.lock().unwrap().push(address.clone());
            if self.failing.contains("*") || self.failing.contains(&address) {
                Err(TransportError::Timeout)
            } else {
                Ok(Reply::Hit(b"value".to_vec()))
            }
        }
    }

    fn build_state(json: &str) -> RouterState {
        let config = parse_config(json, &RuntimeOverrides::default()).unwrap();
        RouterState::build(&config).unwrap()
    }

    fn engine(transport: Arc<MockTransport>, stats: Arc<StatsRegistry>) -> FailoverEngine {
        FailoverEngine::new(transport, stats, Duration::from_millis(50), false)
    }

    fn get(key: &str) -> Operation {
        Operation::Get {
            key: key.to_string(),
        }
    }

    // Primary pool of one destination, two single-server failover entries:
    // candidate order is fixed by construction, no hashing involved.
    const CHAIN: &str = r#"{
        "pools": [
            {"name": "main", "servers": ["10.0.0.1:5000"]},
            {"name": "backups", "servers": ["10.0.0.2:5000", "10.0.0.3:5000"]}
        ],
        "routes": [{
            "name": "default",
            "pool": "main",
            "failover": [
                {"server": "10.0.0.2:5000"},
                {"server": "10.0.0.3:5000"}
            ]
        }],
        "tko": {"timeouts_until_tko": 1}
    }"#;

    #[tokio::test]
    async fn test_primary_success_touches_no_counters() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_only(&[]));
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport.clone(), stats.clone());

        let reply = engine.route(&state, &get("k")).await.unwrap();
        assert_eq!(reply, Reply::Hit(b"value".to_vec()));
        assert_eq!(transport.attempts(), vec!["10.0.0.1:5000"]);
        for name in stats::COUNTER_NAMES {
            assert_eq!(stats.get(name), Some(0), "{name} should be untouched");
        }
    }

    #[tokio::test]
    async fn test_failover_chain_walked_in_order() {
        let state = build_state(CHAIN);
        let transport =
            Arc::new(MockTransport::failing_only(&["10.0.0.1:5000", "10.0.0.2:5000"]));
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport.clone(), stats.clone());

        let reply = engine.route(&state, &get("k")).await.unwrap();
        assert_eq!(reply, Reply::Hit(b"value".to_vec()));
        assert_eq!(
            transport.attempts(),
            vec!["10.0.0.1:5000", "10.0.0.2:5000", "10.0.0.3:5000"]
        );
        assert_eq!(stats.get(stats::FAILOVER_POLICY_RESULT_ERROR), Some(2));
        assert_eq!(stats.get(stats::FAILOVER_POLICY_TKO_ERROR), Some(0));
        assert_eq!(stats.get(stats::FAILOVER_ALL_FAILED), Some(0));
    }

    #[tokio::test]
    async fn test_exhaustion_counts_all_failed_exactly_once() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport, stats.clone());

        // Default behavior: exhausted get is a miss, not an error reply.
        let reply = engine.route(&state, &get("k")).await.unwrap();
        assert_eq!(reply, Reply::Miss);

        assert_eq!(stats.get(stats::FAILOVER_POLICY_RESULT_ERROR), Some(3));
        assert_eq!(stats.get(stats::FAILOVER_ALL_FAILED), Some(1));
        assert_eq!(stats.get(stats::RESULT_ERROR_COUNT), Some(0));
    }

    #[tokio::test]
    async fn test_second_request_short_circuits_on_tko() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport.clone(), stats.clone());

        let _ = engine.route(&state, &get("first")).await;
        // Every destination is now knocked out (threshold 1): the second
        // request must not attempt any transport operation.
        let _ = engine.route(&state, &get("second")).await;

        assert_eq!(transport.attempts().len(), 3);
        assert_eq!(stats.get(stats::FAILOVER_POLICY_RESULT_ERROR), Some(3));
        assert_eq!(stats.get(stats::FAILOVER_POLICY_TKO_ERROR), Some(3));
        assert_eq!(stats.get(stats::FAILOVER_ALL_FAILED), Some(2));
    }

    #[tokio::test]
    async fn test_success_resets_tko_and_restores_routing() {
        let state = build_state(CHAIN);
        let stats = Arc::new(StatsRegistry::new());

        // Knock out the primary; the first failover entry serves the reply.
        let failing = Arc::new(MockTransport::failing_only(&["10.0.0.1:5000"]));
        let first = engine(failing.clone(), stats.clone());
        let _ = first.route(&state, &get("k")).await.unwrap();
        assert_eq!(failing.attempts(), vec!["10.0.0.1:5000", "10.0.0.2:5000"]);

        // Next request short-circuits the knocked-out primary and goes
        // straight to the same failover destination.
        let healthy = Arc::new(MockTransport::failing_only(&[]));
        let engine = engine(healthy.clone(), stats.clone());
        let reply = engine.route(&state, &get("k")).await.unwrap();
        assert_eq!(reply, Reply::Hit(b"value".to_vec()));
        assert_eq!(healthy.attempts(), vec!["10.0.0.2:5000"]);
        assert_eq!(stats.get(stats::FAILOVER_POLICY_TKO_ERROR), Some(1));

        // A success against the primary re-admits it.
        let primary = state.table.registry().destinations()[0].id;
        state.tracker.record_outcome(primary, true);
        assert!(state.tracker.is_routable(primary));
    }

    // Failover entry "dup" is the primary pool again: with a single-server
    // pool both resolve to the same physical destination.
    const COLLIDING: &str = r#"{
        "pools": [
            {"name": "main", "servers": ["10.0.0.1:5000"]},
            {"name": "spare", "servers": ["10.0.0.9:5000"]}
        ],
        "routes": [{
            "name": "default",
            "pool": "main",
            "failover": [
                {"pool": "main"},
                {"pool": "spare"}
            ]
        }],
        "tko": {"timeouts_until_tko": 1}
    }"#;

    #[tokio::test]
    async fn test_collision_skipped_and_counted_once() {
        let state = build_state(COLLIDING);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport.clone(), stats.clone());

        let _ = engine.route(&state, &get("k")).await;

        // Primary attempted, duplicate entry skipped, spare attempted.
        assert_eq!(transport.attempts(), vec!["10.0.0.1:5000", "10.0.0.9:5000"]);
        assert_eq!(stats.get(stats::FAILOVER_NUM_COLLISIONS), Some(1));
        assert_eq!(stats.get(stats::FAILOVER_POLICY_RESULT_ERROR), Some(2));
        assert_eq!(stats.get(stats::FAILOVER_POLICY_TKO_ERROR), Some(0));
        assert_eq!(stats.get(stats::FAILOVER_ALL_FAILED), Some(1));
    }

    #[tokio::test]
    async fn test_disable_miss_on_get_errors_surfaces_error() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = FailoverEngine::new(transport, stats.clone(), Duration::from_millis(50), true);

        let result = engine.route(&state, &get("k")).await;
        assert!(matches!(result, Err(RouteError::AllFailed)));
        assert_eq!(stats.get(stats::RESULT_ERROR_COUNT), Some(1));
        assert_eq!(stats.get(stats::FAILOVER_ALL_FAILED), Some(1));
    }

    #[tokio::test]
    async fn test_set_exhaustion_always_surfaces_error() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport, stats.clone());

        let op = Operation::Set {
            key: "k".to_string(),
            value: b"v".to_vec(),
        };
        let result = engine.route(&state, &op).await;
        assert!(matches!(result, Err(RouteError::AllFailed)));
        assert_eq!(stats.get(stats::RESULT_ERROR_COUNT), Some(1));
    }

    const SEVENTEEN: &str = r#"{
        "pools": [
            {"name": "east", "servers": [
                "10.0.0.1:5000", "10.0.0.2:5000", "10.0.0.3:5000", "10.0.0.4:5000",
                "10.0.0.5:5000", "10.0.0.6:5000", "10.0.0.7:5000", "10.0.0.8:5000",
                "10.0.0.9:5000", "10.0.0.10:5000", "10.0.0.11:5000", "10.0.0.12:5000"
            ]},
            {"name": "wc", "servers": [
                "10.0.1.1:5000", "10.0.1.2:5000", "10.0.1.3:5000",
                "10.0.1.4:5000", "10.0.1.5:5000"
            ]}
        ],
        "routes": [{
            "name": "default",
            "pool": "east",
            "failover": [
                {"pool": "wc"},
                {"pool": "east"}
            ]
        }],
        "tko": {"timeouts_until_tko": 1}
    }"#;

    #[tokio::test]
    async fn test_candidate_sequence_is_deterministic_across_instances() {
        // Two independent stacks (fresh tracker, fresh transport) must walk
        // identical candidate sequences for the same keys.
        let mut recorded = Vec::new();
        for _ in 0..2 {
            let state = build_state(SEVENTEEN);
            let transport = Arc::new(MockTransport::failing_all());
            let engine = engine(transport.clone(), Arc::new(StatsRegistry::new()));
            for i in 0..10 {
                let key = format!("key_{}_abc_{}", i, 17 * i);
                let _ = engine.route(&state, &get(&key)).await;
            }
            recorded.push(transport.attempts());
        }
        assert_eq!(recorded[0], recorded[1]);
    }

    #[tokio::test]
    async fn test_per_request_conservation() {
        // Every request consumes exactly 1 + |entries| policy positions:
        // each is a result error, a TKO error, or a collision.
        let state = build_state(SEVENTEEN);
        let transport = Arc::new(MockTransport::failing_all());
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport, stats.clone());

        let mut previous = (0, 0, 0, 0);
        for i in 0..10 {
            let key = format!("key_{}_abc_{}", i, 17 * i);
            let _ = engine.route(&state, &get(&key)).await;

            let current = (
                stats.get(stats::FAILOVER_POLICY_RESULT_ERROR).unwrap(),
                stats.get(stats::FAILOVER_POLICY_TKO_ERROR).unwrap(),
                stats.get(stats::FAILOVER_NUM_COLLISIONS).unwrap(),
                stats.get(stats::FAILOVER_ALL_FAILED).unwrap(),
            );
            let delta_positions = (current.0 - previous.0)
                + (current.1 - previous.1)
                + (current.2 - previous.2);
            assert_eq!(delta_positions, 3, "request {i} consumed 3 policy positions");
            assert_eq!(current.3, i + 1, "exactly one all-failed per request");
            // Monotonic, never decremented.
            assert!(current.0 >= previous.0 && current.1 >= previous.1 && current.2 >= previous.2);
            previous = current;
        }
    }

    #[tokio::test]
    async fn test_unknown_routing_prefix_is_no_route() {
        let state = build_state(CHAIN);
        let transport = Arc::new(MockTransport::failing_only(&[]));
        let stats = Arc::new(StatsRegistry::new());
        let engine = engine(transport, stats.clone());

        let result = engine.route(&state, &get("/ghost/k")).await;
        assert!(matches!(result, Err(RouteError::NoRoute(_))));
        // Not a backend failure: no counter moves.
        assert_eq!(stats.get(stats::RESULT_ERROR_COUNT), Some(0));
    }
}
