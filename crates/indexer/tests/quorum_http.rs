//! End-to-end: HTTP indexers → quorum → decoder → reducer.

use alloy::primitives::{Address, B256, I256, U256};
use alloy::sol_types::SolValue;
use farmscope_core::hashing::expand_address_to_bytes32;
use farmscope_core::{
    ChainAddress, FarmType, TokenChange, DAILY_REWARD_RATE_KEY,
    PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN,
};
use farmscope_indexer::events::{
    FarmDepositChangeEvent, FarmExistsEvent, FarmMetastateEvent, FarmTokenChangeEvent,
};
use farmscope_indexer::log::IndexerResponse;
use farmscope_indexer::{
    DecodeMode, DomainEvent, EventKind, EventRegistry, FarmQueries, HttpIndexer, IndexerError,
    LogFilter, LogIndexer, QueryError, QuorumClient, QuorumPolicy, RawLogEntry, TokenFilter,
};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const CHAIN: u64 = 137;
const CONTRACT: Address = Address::repeat_byte(0xfa);

fn token(tag: u8) -> ChainAddress {
    ChainAddress::new(CHAIN, Address::repeat_byte(tag)).unwrap()
}

fn farm_events(hash: B256) -> Vec<DomainEvent> {
    vec![
        DomainEvent::FarmExists(FarmExistsEvent {
            farm_hash: hash,
            sponsor: Address::repeat_byte(0x5a),
            reward_token_defn: token(0x01),
            referred_token_defn: PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN,
        }),
        DomainEvent::FarmTokenChange(FarmTokenChangeEvent {
            farm_hash: hash,
            token: token(0xa0),
            change: TokenChange::Added,
        }),
        DomainEvent::FarmDepositChange(FarmDepositChangeEvent {
            farm_hash: hash,
            delta: I256::try_from(100).unwrap(),
        }),
        DomainEvent::FarmDepositChange(FarmDepositChangeEvent {
            farm_hash: hash,
            delta: I256::try_from(-30).unwrap(),
        }),
        DomainEvent::FarmMetastateSet(FarmMetastateEvent {
            farm_hash: hash,
            key: DAILY_REWARD_RATE_KEY,
            value: U256::from(5).abi_encode().into(),
        }),
    ]
}

/// Encode events as an indexer would, with chain positions.
fn entries(events: &[DomainEvent]) -> Vec<RawLogEntry> {
    events
        .iter()
        .enumerate()
        .map(|(i, e)| RawLogEntry::from_log_data(&e.encode_log()).at(1_000, 0, i as u64))
        .collect()
}

fn body(entries: &[RawLogEntry]) -> serde_json::Value {
    serde_json::to_value(IndexerResponse::from_entries(entries)).unwrap()
}

fn indexer(server: &MockServer, reliability: u32) -> Arc<dyn LogIndexer> {
    let url = server.url("/logs").parse().unwrap();
    Arc::new(HttpIndexer::new(url, reliability, Duration::from_secs(5)).unwrap())
}

fn queries(indexers: Vec<Arc<dyn LogIndexer>>, timeout: Duration) -> FarmQueries {
    let policy = QuorumPolicy::majority_of(indexers.len(), timeout);
    FarmQueries::new(
        QuorumClient::new(indexers, policy),
        EventRegistry::new(),
        CONTRACT,
        CHAIN,
        PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN,
    )
}

#[tokio::test]
async fn test_majority_of_http_indexers_builds_farm() {
    let hash = B256::repeat_byte(0x48);
    let honest = body(&entries(&farm_events(hash)));
    let lying = body(&entries(&farm_events(B256::repeat_byte(0x66))));

    let a = MockServer::start_async().await;
    let b = MockServer::start_async().await;
    let c = MockServer::start_async().await;
    let mock_a = a
        .mock_async(|when, then| {
            when.method(POST).path("/logs");
            then.status(200).json_body(honest.clone());
        })
        .await;
    b.mock_async(|when, then| {
        when.method(POST).path("/logs");
        then.status(200).json_body(lying.clone());
    })
    .await;
    c.mock_async(|when, then| {
        when.method(POST).path("/logs");
        then.status(200).json_body(honest.clone());
    })
    .await;

    let queries = queries(
        vec![indexer(&a, 0), indexer(&b, 50), indexer(&c, 0)],
        Duration::from_secs(5),
    );
    let farms = queries.all_farms(&TokenFilter::default()).await.unwrap();

    mock_a.assert_async().await;
    assert_eq!(farms.len(), 1);
    let farm = &farms[0];
    assert_eq!(farm.farm_hash, hash);
    assert_eq!(farm.farm_type, FarmType::Proportional);
    assert_eq!(farm.tokens.iter().collect::<Vec<_>>(), vec![&token(0xa0)]);
    assert_eq!(farm.total_farm_rewards, I256::try_from(70).unwrap());
    assert_eq!(farm.daily_farm_reward, U256::from(5));
}

#[tokio::test]
async fn test_request_body_matches_filter() {
    let registry = EventRegistry::new();
    let sponsor = Address::repeat_byte(0x5a);
    let exists = match &farm_events(B256::repeat_byte(0x01))[0] {
        DomainEvent::FarmExists(e) => e.clone(),
        _ => unreachable!(),
    };

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/logs").json_body(json!({
                "addresses": [CONTRACT.to_string()],
                "topic1": [registry.topic(EventKind::FarmExists).to_string()],
                "topic2": [expand_address_to_bytes32(&sponsor).to_string()],
                "chainId": [CHAIN],
            }));
            then.status(200)
                .json_body(body(&entries(&[DomainEvent::FarmExists(exists.clone())])));
        })
        .await;

    let queries = queries(vec![indexer(&server, 0)], Duration::from_secs(5));
    let farms = queries
        .farms_by_sponsor(sponsor, &TokenFilter::default())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(farms, vec![exists]);
}

#[tokio::test]
async fn test_filter_round_trip_recovers_events() {
    let events = farm_events(B256::repeat_byte(0x07));
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/logs");
            then.status(200).json_body(body(&entries(&events)));
        })
        .await;

    let source = indexer(&server, 0);
    let filter = LogFilter::new()
        .address(CONTRACT)
        .chain_id(CHAIN)
        .topic1(EventRegistry::new().all_topics());
    let raw = source.fetch_logs(&filter).await.unwrap();
    let decoded = EventRegistry::new()
        .decode_all(&raw, DecodeMode::Strict)
        .unwrap();

    assert_eq!(decoded, events);
}

#[tokio::test]
async fn test_server_error_abstains() {
    let hash = B256::repeat_byte(0x48);
    let honest = body(&entries(&farm_events(hash)));

    let a = MockServer::start_async().await;
    let b = MockServer::start_async().await;
    let c = MockServer::start_async().await;
    a.mock_async(|when, then| {
        when.method(POST);
        then.status(503).body("maintenance");
    })
    .await;
    for server in [&b, &c] {
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(honest.clone());
            })
            .await;
    }

    let queries = queries(
        vec![indexer(&a, 0), indexer(&b, 0), indexer(&c, 0)],
        Duration::from_secs(5),
    );
    let farms = queries.all_farms(&TokenFilter::default()).await.unwrap();
    assert_eq!(farms.len(), 1);
}

#[tokio::test]
async fn test_slow_indexer_misses_deadline() {
    let honest = body(&entries(&farm_events(B256::repeat_byte(0x48))));

    let slow = MockServer::start_async().await;
    let b = MockServer::start_async().await;
    let c = MockServer::start_async().await;
    slow.mock_async(|when, then| {
        when.method(POST);
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(json!({"items": []}));
    })
    .await;
    for server in [&b, &c] {
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(honest.clone());
            })
            .await;
    }

    let queries = queries(
        vec![indexer(&slow, 100), indexer(&b, 0), indexer(&c, 0)],
        Duration::from_millis(500),
    );
    let farms = queries.all_farms(&TokenFilter::default()).await.unwrap();
    assert_eq!(farms.len(), 1);
}

#[tokio::test]
async fn test_disagreement_fails_query() {
    let servers = [
        MockServer::start_async().await,
        MockServer::start_async().await,
    ];
    for (i, server) in servers.iter().enumerate() {
        let events = farm_events(B256::repeat_byte(i as u8 + 1));
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(body(&entries(&events)));
            })
            .await;
    }

    let queries = queries(
        servers.iter().map(|s| indexer(s, 0)).collect(),
        Duration::from_secs(5),
    );
    let err = queries.all_farms(&TokenFilter::default()).await.unwrap_err();

    assert!(matches!(
        err,
        QueryError::QuorumNotReached {
            largest: 1,
            respondents: 2,
            required: 2
        }
    ));
}

#[tokio::test]
async fn test_http_indexer_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/bad-status");
            then.status(500).body("boom");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/bad-body");
            then.status(200).body("not json");
        })
        .await;

    let filter = LogFilter::new();

    let bad_status = HttpIndexer::new(
        server.url("/bad-status").parse().unwrap(),
        0,
        Duration::from_secs(5),
    )
    .unwrap();
    let err = bad_status.fetch_logs(&filter).await.unwrap_err();
    assert!(matches!(err, IndexerError::Status { status: 500, body: ref text } if text == "boom"));

    let bad_body = HttpIndexer::new(
        server.url("/bad-body").parse().unwrap(),
        0,
        Duration::from_secs(5),
    )
    .unwrap();
    let err = bad_body.fetch_logs(&filter).await.unwrap_err();
    assert!(matches!(err, IndexerError::Malformed(_)));
}
