//! Scatter a log filter to several indexers and accept only an agreed answer.
//!
//! Indexers are independent and untrusted. Each answers (or abstains by
//! failing or missing the deadline); answers are compared as multisets of full
//! log entries, and the largest group of identical multisets wins if it is a
//! strict majority of the respondents.
//!
//! Repeated entries are kept. Without block positions, two identical deposits
//! are indistinguishable on the wire and both count.

mod http;

pub use http::HttpIndexer;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::error::{IndexerError, QueryError};
use crate::filter::LogFilter;
use crate::log::RawLogEntry;

/// A single source of event logs.
#[async_trait::async_trait]
pub trait LogIndexer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Weight used to break ties between equally sized groups.
    fn reliability(&self) -> u32 {
        0
    }

    /// Fetch logs matching `filter`.
    async fn fetch_logs(&self, filter: &LogFilter) -> Result<Vec<RawLogEntry>, IndexerError>;
}

/// Acceptance thresholds for a quorum query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumPolicy {
    /// Indexers that must answer before agreement is even considered.
    pub min_respondents: usize,
    /// Lower bound on the winning group size, on top of the strict majority.
    pub min_agreeing: usize,
    /// Shared deadline for all indexers, measured from the start of the query.
    pub timeout: Duration,
}

impl QuorumPolicy {
    /// Require a majority of `indexers` to respond.
    pub fn majority_of(indexers: usize, timeout: Duration) -> Self {
        Self {
            min_respondents: indexers / 2 + 1,
            min_agreeing: 1,
            timeout,
        }
    }
}

/// An agreed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Logs from the first-seen member of the winning group, in its order.
    pub items: Vec<RawLogEntry>,
    /// Size of the winning group.
    pub agreeing: usize,
    /// Indexers that answered in time.
    pub respondents: usize,
}

/// Fans a filter out to every configured indexer and reconciles the answers.
pub struct QuorumClient {
    indexers: Vec<Arc<dyn LogIndexer>>,
    policy: QuorumPolicy,
}

impl QuorumClient {
    /// Create a client over a fixed set of indexers.
    pub fn new(indexers: Vec<Arc<dyn LogIndexer>>, policy: QuorumPolicy) -> Self {
        Self { indexers, policy }
    }

    /// Query every indexer and return the agreed logs.
    ///
    /// No retries: an indexer that fails or misses the deadline abstains, and
    /// a query without quorum fails.
    pub async fn query(&self, filter: &LogFilter) -> Result<QueryResult, QueryError> {
        let responses = self.gather(filter).await;
        let reliabilities: Vec<u32> = self.indexers.iter().map(|i| i.reliability()).collect();

        let result = compute_quorum(&responses, &reliabilities, &self.policy)?;
        tracing::info!(
            agreeing = result.agreeing,
            respondents = result.respondents,
            configured = self.indexers.len(),
            items = result.items.len(),
            "Indexer quorum reached"
        );
        Ok(result)
    }

    /// One slot per indexer, in configuration order. `None` means it abstained.
    async fn gather(&self, filter: &LogFilter) -> Vec<Option<Vec<RawLogEntry>>> {
        let timeout = self.policy.timeout;
        let deadline = Instant::now() + timeout;

        let futures = self.indexers.iter().map(|indexer| {
            let indexer = Arc::clone(indexer);
            async move {
                let result = match timeout_at(deadline, indexer.fetch_logs(filter)).await {
                    Ok(result) => result,
                    Err(_) => Err(IndexerError::Timeout(timeout)),
                };
                match result {
                    Ok(entries) => {
                        tracing::debug!(
                            indexer = indexer.name(),
                            entries = entries.len(),
                            "Indexer responded"
                        );
                        Some(entries)
                    }
                    Err(e) => {
                        tracing::warn!(indexer = indexer.name(), error = %e, "Indexer abstained");
                        None
                    }
                }
            }
        });

        join_all(futures).await
    }
}

struct Group {
    canonical: Vec<RawLogEntry>,
    members: Vec<usize>,
    reliability: u64,
}

/// Group identical answers, in first-seen order.
fn group_responses(responses: &[Option<Vec<RawLogEntry>>], reliabilities: &[u32]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for (index, response) in responses.iter().enumerate() {
        let Some(entries) = response else {
            continue;
        };

        let mut canonical = entries.clone();
        canonical.sort();

        let weight = u64::from(reliabilities.get(index).copied().unwrap_or(0));
        match groups.iter_mut().find(|g| g.canonical == canonical) {
            Some(group) => {
                group.members.push(index);
                group.reliability += weight;
            }
            None => groups.push(Group {
                canonical,
                members: vec![index],
                reliability: weight,
            }),
        }
    }
    groups
}

/// Largest group, then highest summed reliability, then earliest.
fn pick_winner(groups: &[Group]) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (i, group) in groups.iter().enumerate() {
        let better = match winner {
            None => true,
            Some(best) => {
                let best = &groups[best];
                (group.members.len(), group.reliability) > (best.members.len(), best.reliability)
            }
        };
        if better {
            winner = Some(i);
        }
    }
    winner
}

/// Reconcile gathered responses.
///
/// `responses[i]` is indexer `i`'s answer, or `None` if it abstained;
/// `reliabilities[i]` is its tie-break weight. Deterministic for a given input.
pub fn compute_quorum(
    responses: &[Option<Vec<RawLogEntry>>],
    reliabilities: &[u32],
    policy: &QuorumPolicy,
) -> Result<QueryResult, QueryError> {
    let respondents = responses.iter().filter(|r| r.is_some()).count();
    if respondents < policy.min_respondents {
        return Err(QueryError::InsufficientRespondents {
            respondents,
            configured: responses.len(),
            required: policy.min_respondents,
        });
    }

    let groups = group_responses(responses, reliabilities);
    let winner = pick_winner(&groups).map(|i| &groups[i]);

    let required = (respondents / 2 + 1).max(policy.min_agreeing);
    let largest = winner.map(|g| g.members.len()).unwrap_or(0);

    let winner = match winner {
        Some(group) if largest >= required => group,
        _ => {
            tracing::warn!(
                largest,
                respondents,
                required,
                groups = groups.len(),
                "Indexers disagree"
            );
            return Err(QueryError::QuorumNotReached {
                largest,
                respondents,
                required,
            });
        }
    };

    let items = responses[winner.members[0]].clone().unwrap_or_default();

    Ok(QueryResult {
        items,
        agreeing: largest,
        respondents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, B256};

    struct MockIndexer {
        name: &'static str,
        reliability: u32,
        delay: Option<Duration>,
        result: Result<Vec<RawLogEntry>, &'static str>,
    }

    impl MockIndexer {
        fn answering(name: &'static str, entries: Vec<RawLogEntry>) -> Arc<dyn LogIndexer> {
            Arc::new(Self {
                name,
                reliability: 0,
                delay: None,
                result: Ok(entries),
            })
        }

        fn failing(name: &'static str) -> Arc<dyn LogIndexer> {
            Arc::new(Self {
                name,
                reliability: 0,
                delay: None,
                result: Err("connection refused"),
            })
        }
    }

    #[async_trait::async_trait]
    impl LogIndexer for MockIndexer {
        fn name(&self) -> &str {
            self.name
        }

        fn reliability(&self) -> u32 {
            self.reliability
        }

        async fn fetch_logs(&self, _filter: &LogFilter) -> Result<Vec<RawLogEntry>, IndexerError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result
                .clone()
                .map_err(|e| IndexerError::Malformed(e.to_string()))
        }
    }

    fn entry(tag: u8) -> RawLogEntry {
        RawLogEntry::new(vec![B256::repeat_byte(tag)], Bytes::from(vec![tag]))
    }

    fn policy(min_respondents: usize) -> QuorumPolicy {
        QuorumPolicy {
            min_respondents,
            min_agreeing: 1,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_majority_wins() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::answering("a", vec![entry(1), entry(2)]),
                MockIndexer::answering("b", vec![entry(1), entry(2)]),
                MockIndexer::answering("c", vec![entry(9)]),
            ],
            policy(2),
        );

        let result = client.query(&LogFilter::new()).await.unwrap();

        assert_eq!(result.items, vec![entry(1), entry(2)]);
        assert_eq!(result.agreeing, 2);
        assert_eq!(result.respondents, 3);
    }

    #[tokio::test]
    async fn test_order_does_not_split_agreement() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::answering("a", vec![entry(2), entry(1), entry(2)]),
                MockIndexer::answering("b", vec![entry(2), entry(2), entry(1)]),
            ],
            policy(2),
        );

        let result = client.query(&LogFilter::new()).await.unwrap();

        // First-seen member's order, repeats kept.
        assert_eq!(result.items, vec![entry(2), entry(1), entry(2)]);
        assert_eq!(result.agreeing, 2);
    }

    #[test]
    fn test_missing_repeat_is_a_different_answer() {
        let full = vec![entry(1), entry(2), entry(2)];
        let stale = vec![entry(1), entry(2)];
        let responses = vec![Some(full.clone()), Some(stale)];

        let err = compute_quorum(&responses, &[0, 0], &policy(2)).unwrap_err();
        assert!(matches!(
            err,
            QueryError::QuorumNotReached { largest: 1, required: 2, .. }
        ));

        let responses = vec![Some(full.clone()), Some(full.clone())];
        let result = compute_quorum(&responses, &[0, 0], &policy(2)).unwrap();
        assert_eq!(result.items, full);
    }

    #[tokio::test]
    async fn test_no_majority() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::answering("a", vec![entry(1)]),
                MockIndexer::answering("b", vec![entry(2)]),
                MockIndexer::answering("c", vec![entry(3)]),
            ],
            policy(2),
        );

        let err = client.query(&LogFilter::new()).await.unwrap_err();

        assert!(matches!(
            err,
            QueryError::QuorumNotReached {
                largest: 1,
                respondents: 3,
                required: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_two_of_four_is_not_a_majority() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::answering("a", vec![entry(1)]),
                MockIndexer::answering("b", vec![entry(1)]),
                MockIndexer::answering("c", vec![entry(2)]),
                MockIndexer::answering("d", vec![entry(3)]),
            ],
            policy(1),
        );

        let err = client.query(&LogFilter::new()).await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::QuorumNotReached { largest: 2, required: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_insufficient_respondents() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::answering("a", vec![entry(1)]),
                MockIndexer::failing("b"),
                MockIndexer::failing("c"),
            ],
            policy(2),
        );

        let err = client.query(&LogFilter::new()).await.unwrap_err();

        assert!(matches!(
            err,
            QueryError::InsufficientRespondents {
                respondents: 1,
                configured: 3,
                required: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_failures_abstain() {
        let client = QuorumClient::new(
            vec![
                MockIndexer::failing("a"),
                MockIndexer::answering("b", vec![entry(1)]),
                MockIndexer::answering("c", vec![entry(1)]),
            ],
            policy(2),
        );

        let result = client.query(&LogFilter::new()).await.unwrap();

        assert_eq!(result.respondents, 2);
        assert_eq!(result.agreeing, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_indexer_abstains_at_deadline() {
        let slow: Arc<dyn LogIndexer> = Arc::new(MockIndexer {
            name: "slow",
            reliability: 100,
            delay: Some(Duration::from_secs(30)),
            result: Ok(vec![entry(7)]),
        });
        let client = QuorumClient::new(
            vec![
                slow,
                MockIndexer::answering("b", vec![entry(1)]),
                MockIndexer::answering("c", vec![entry(1)]),
            ],
            policy(2),
        );

        let result = client.query(&LogFilter::new()).await.unwrap();

        assert_eq!(result.items, vec![entry(1)]);
        assert_eq!(result.respondents, 2);
    }

    #[test]
    fn test_min_agreeing_raises_threshold() {
        let responses = vec![Some(vec![entry(1)]), Some(vec![entry(1)]), None];
        let policy = QuorumPolicy {
            min_respondents: 1,
            min_agreeing: 3,
            timeout: Duration::from_secs(1),
        };

        let err = compute_quorum(&responses, &[0, 0, 0], &policy).unwrap_err();
        assert!(matches!(
            err,
            QueryError::QuorumNotReached { largest: 2, required: 3, .. }
        ));
    }

    fn winner_items(responses: &[Option<Vec<RawLogEntry>>], reliabilities: &[u32]) -> Vec<RawLogEntry> {
        let groups = group_responses(responses, reliabilities);
        let winner = pick_winner(&groups).unwrap();
        groups[winner].canonical.clone()
    }

    #[test]
    fn test_grouping_ignores_order_and_abstentions() {
        let responses = vec![
            Some(vec![entry(2), entry(1)]),
            None,
            Some(vec![entry(1), entry(2)]),
            Some(vec![entry(3)]),
        ];

        let groups = group_responses(&responses, &[1, 1, 2, 4]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![0, 2]);
        assert_eq!(groups[0].reliability, 3);
        assert_eq!(groups[1].members, vec![3]);
    }

    #[test]
    fn test_larger_group_beats_reliability() {
        let responses = vec![Some(vec![entry(1)]), Some(vec![entry(1)]), Some(vec![entry(2)])];
        assert_eq!(winner_items(&responses, &[0, 0, 100]), vec![entry(1)]);
    }

    #[test]
    fn test_tie_break_by_reliability() {
        let responses = vec![Some(vec![entry(1)]), Some(vec![entry(2)])];
        assert_eq!(winner_items(&responses, &[1, 5]), vec![entry(2)]);
    }

    #[test]
    fn test_tie_break_by_first_seen() {
        let responses = vec![Some(vec![entry(1)]), Some(vec![entry(2)])];
        assert_eq!(winner_items(&responses, &[3, 3]), vec![entry(1)]);
    }

    #[test]
    fn test_empty_agreement_is_valid() {
        let responses = vec![Some(vec![]), Some(vec![]), Some(vec![entry(1)])];
        let result = compute_quorum(&responses, &[0, 0, 0], &policy(2)).unwrap();

        assert!(result.items.is_empty());
        assert_eq!(result.agreeing, 2);
    }

    #[test]
    fn test_majority_of_policy() {
        let policy = QuorumPolicy::majority_of(5, Duration::from_secs(3));
        assert_eq!(policy.min_respondents, 3);
        assert_eq!(policy.min_agreeing, 1);
    }
}
