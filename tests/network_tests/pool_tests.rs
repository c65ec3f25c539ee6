//! Tests for ConnectionPool
//!
//! These tests verify:
//! - Connections are created lazily and reused
//! - The pool never exceeds its size
//! - Checkout times out when every connection is busy
//! - Explicitly closed connections leave the pool

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::FakeStore;
use lockwire::network::{ConnectionPool, Executor};
use lockwire::protocol::Command;
use lockwire::LockwireError;

#[test]
fn test_pool_creates_lazily_and_reuses() {
    let store = FakeStore::start();
    let pool = ConnectionPool::new(store.config_builder().pool_size(4).build());

    assert_eq!(pool.created_count(), 0);

    for _ in 0..10 {
        assert!(pool.get().unwrap().ping().unwrap());
    }

    assert_eq!(pool.created_count(), 1);
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(store.connection_count(), 1);
}

#[test]
fn test_pool_hands_out_distinct_connections() {
    let store = FakeStore::start();
    let pool = ConnectionPool::new(store.config_builder().pool_size(2).build());

    let mut first = pool.get().unwrap();
    let mut second = pool.get().unwrap();
    first.ping().unwrap();
    second.ping().unwrap();

    assert_eq!(pool.created_count(), 2);
    assert_eq!(store.connection_count(), 2);

    drop(first);
    drop(second);
    assert_eq!(pool.idle_count(), 2);
}

#[test]
fn test_pool_checkout_times_out_when_exhausted() {
    let store = FakeStore::start();
    let pool = ConnectionPool::new(
        store
            .config_builder()
            .pool_size(1)
            .pool_timeout_ms(100)
            .build(),
    );

    let _busy = pool.get().unwrap();

    assert!(matches!(pool.get(), Err(LockwireError::Pool(_))));
}

#[test]
fn test_pool_waiter_gets_returned_connection() {
    let store = FakeStore::start();
    let pool = Arc::new(ConnectionPool::new(
        store
            .config_builder()
            .pool_size(1)
            .pool_timeout_ms(2000)
            .build(),
    ));

    let busy = pool.get().unwrap();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.get().unwrap().ping().unwrap())
    };

    thread::sleep(Duration::from_millis(100));
    drop(busy);

    assert!(waiter.join().unwrap());
    assert_eq!(pool.created_count(), 1);
}

#[test]
fn test_closed_connection_leaves_pool() {
    let store = FakeStore::start();
    let pool = ConnectionPool::new(store.config_builder().pool_size(2).build());

    {
        let mut conn = pool.get().unwrap();
        conn.ping().unwrap();
        conn.close().unwrap();
    }

    assert_eq!(pool.created_count(), 0);
    assert_eq!(pool.idle_count(), 0);
    assert!(pool.get().unwrap().ping().unwrap());
}

#[test]
fn test_pool_as_executor_from_many_threads() {
    let store = FakeStore::start();
    let pool = Arc::new(ConnectionPool::new(
        store.config_builder().pool_size(3).build(),
    ));

    let handles: Vec<_> = (0..6)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..20 {
                    let text = format!("{}:{}", t, i);
                    let reply = pool
                        .execute_command(&Command::new("ECHO").arg(&text))
                        .unwrap();
                    assert_eq!(reply.as_bulk(), Some(text.as_bytes()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(pool.created_count() <= 3);
    assert!(store.connection_count() <= 3);
    assert_eq!(store.commands().len(), 120);
}
