//! Redis sorted-set store against a live server.
//!
//! Run with: REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_store_test -- --ignored

use chrono::NaiveDate;
use product_ranking::{MemberCodec, OrderedSetStore, RankingKey, RedisOrderedSetStore};
use redis::AsyncCommands;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Day key under a throwaway prefix so parallel runs never share a set
fn scratch_key() -> String {
    let day = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    RankingKey::new(format!("ranking-test:{}", uuid::Uuid::new_v4())).day(day)
}

async fn seed(url: &str, key: &str, entries: &[(i64, f64)]) -> redis::aio::MultiplexedConnection {
    let client = redis::Client::open(url).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let codec = MemberCodec::default();
    for (product_id, score) in entries {
        let _: () = conn
            .zadd(key, codec.encode(*product_id).unwrap(), *score)
            .await
            .unwrap();
    }
    conn
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_equal_scores_list_lower_product_first() {
    let url = redis_url();
    let key = scratch_key();
    let mut conn = seed(&url, &key, &[(303, 50.0), (202, 10.0), (101, 50.0)]).await;

    let store = RedisOrderedSetStore::connect(&url).await.unwrap();
    let codec = MemberCodec::default();

    let members = store.reverse_range(&key, 0, 9).await.unwrap();
    let ids: Vec<i64> = members.iter().map(|m| codec.decode(m).unwrap()).collect();
    assert_eq!(ids, vec![101, 303, 202]);

    let scored = store.reverse_range_with_scores(&key, 0, 1).await.unwrap();
    assert_eq!(scored.len(), 2);
    assert_eq!(codec.decode(&scored[1].0).unwrap(), 303);
    assert_eq!(scored[1].1, 50.0);

    let member = codec.encode(303).unwrap();
    assert_eq!(store.rank(&key, &member).await.unwrap(), Some(1));
    assert_eq!(store.cardinality(&key).await.unwrap(), 3);

    let _: () = conn.del(&key).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_missing_key_reads_as_empty() {
    let url = redis_url();
    let key = scratch_key();
    let store = RedisOrderedSetStore::connect(&url).await.unwrap();

    assert!(store.reverse_range(&key, 0, 9).await.unwrap().is_empty());
    assert_eq!(store.cardinality(&key).await.unwrap(), 0);
    let member = MemberCodec::default().encode(101).unwrap();
    assert_eq!(store.rank(&key, &member).await.unwrap(), None);
}
