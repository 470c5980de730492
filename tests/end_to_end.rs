//! Whole-binary scenarios driven over a real `TcpListener` on an ephemeral
//! port (spec.md §8's six end-to-end scenarios), matching the teacher's
//! convention of exercising the accept loop and client together rather
//! than unit-testing collaborators in isolation.

use ledgerd::credentials::CredentialStore;
use ledgerd::notify::Notifier;
use ledgerd::server::{listener, Collaborators, WorkerPool};
use ledgerd::storage::StorageEngine;
use ledgerd::Client;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    addr: std::net::SocketAddr,
    _data_dir: TempDir,
}

fn start_server(loaded_series_capacity: usize, retention_window: i64, threads: usize) -> TestServer {
    let data_dir = TempDir::new().unwrap();
    let storage = Arc::new(StorageEngine::open(data_dir.path(), loaded_series_capacity, retention_window).unwrap());
    let credentials = Arc::new(CredentialStore::open(data_dir.path()).unwrap());
    let notifier = Arc::new(Notifier::new());
    let pool = Arc::new(WorkerPool::new(threads));
    let collaborators = Arc::new(Collaborators {
        storage,
        notifier,
        credentials,
        pool,
    });

    let tcp_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = tcp_listener.local_addr().unwrap();
    thread::spawn(move || {
        let _ = listener::serve(tcp_listener, collaborators);
    });

    TestServer {
        addr,
        _data_dir: data_dir,
    }
}

fn connect(server: &TestServer) -> Client {
    Client::connect(server.addr).unwrap()
}

#[test]
fn scenario_one_fresh_register_and_login() {
    let server = start_server(10, 365, 4);
    let client = connect(&server);

    assert!(client.register("alice", "pw").unwrap());
    assert!(client.login("alice", "pw").unwrap());
    assert!(!client.register("alice", "other").unwrap());
    assert!(!client.login("alice", "bad").unwrap());
}

fn authenticated_client(server: &TestServer) -> Client {
    let client = connect(server);
    client.register("user", "pw").unwrap();
    assert!(client.login("user", "pw").unwrap());
    client
}

#[test]
fn scenario_two_single_day_aggregation() {
    let server = start_server(10, 365, 4);
    let client = authenticated_client(&server);

    client.add_event("A", 10, 5.0).unwrap();
    client.add_event("A", 5, 10.0).unwrap();
    client.new_day().unwrap();

    assert_eq!(client.aggregate_qty("A", 1).unwrap(), 15.0);
    assert_eq!(client.aggregate_volume("A", 1).unwrap(), 100.0);
    assert_eq!(client.aggregate_max("A", 1).unwrap(), 10.0);
    assert_eq!(client.aggregate_avg("A", 1).unwrap(), 100.0 / 15.0);
}

#[test]
fn scenario_three_two_day_aggregation() {
    let server = start_server(10, 365, 4);
    let client = authenticated_client(&server);

    client.add_event("A", 10, 5.0).unwrap();
    client.add_event("A", 5, 10.0).unwrap();
    client.new_day().unwrap();
    client.add_event("A", 20, 8.0).unwrap();
    client.new_day().unwrap();

    assert_eq!(client.aggregate_qty("A", 2).unwrap(), 35.0);
    assert_eq!(client.aggregate_volume("A", 2).unwrap(), 260.0);
    assert_eq!(client.aggregate_max("A", 2).unwrap(), 10.0);
    assert_eq!(client.aggregate_avg("A", 2).unwrap(), 260.0 / 35.0);
}

#[test]
fn scenario_four_simultaneous_wait_success() {
    let server = start_server(10, 365, 8);
    let x = authenticated_client(&server);
    let y = authenticated_client(&server);

    let waiter = thread::spawn(move || x.wait_simultaneous("Banana", "Apple").unwrap());
    thread::sleep(Duration::from_millis(50));
    y.add_event("Banana", 1, 1.0).unwrap();
    y.add_event("Apple", 1, 1.0).unwrap();

    assert!(waiter.join().unwrap());
}

#[test]
fn scenario_five_consecutive_wait_with_late_subscriber() {
    let server = start_server(10, 365, 8);
    let y = authenticated_client(&server);
    let x = authenticated_client(&server);

    y.add_event("Orange", 1, 0.5).unwrap();
    y.add_event("Orange", 1, 0.5).unwrap();
    y.add_event("Orange", 1, 0.5).unwrap();

    assert_eq!(x.wait_consecutive(3).unwrap(), Some("Orange".to_string()));
}

#[test]
fn scenario_six_retention_cleanup() {
    let server = start_server(3, 10, 4);
    let client = authenticated_client(&server);

    for _ in 0..12 {
        client.add_event("P", 1, 1.0).unwrap();
        client.new_day().unwrap();
    }

    assert_eq!(client.aggregate_qty("P", 10).unwrap(), 10.0);
}

#[test]
fn unauthenticated_requests_are_rejected() {
    let server = start_server(10, 365, 4);
    let client = connect(&server);
    assert!(client.add_event("A", 1, 1.0).is_err());
    assert!(client.get_current_day().is_err());
}

#[test]
fn filter_round_trips_events_for_a_closed_day() {
    let server = start_server(10, 365, 4);
    let client = authenticated_client(&server);

    client.add_event("Apple", 3, 1.5).unwrap();
    client.add_event("Banana", 2, 0.5).unwrap();
    client.new_day().unwrap();

    let sales = client.filter(0, &["Apple".to_string()]).unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].product, "Apple");
}

#[test]
fn filter_rejects_the_open_day() {
    let server = start_server(10, 365, 4);
    let client = authenticated_client(&server);
    assert!(client.filter(0, &[]).is_err());
}

#[test]
fn new_day_cancels_waiters_without_satisfying_them() {
    let server = start_server(10, 365, 8);
    let x = authenticated_client(&server);
    let y = authenticated_client(&server);

    let waiter = thread::spawn(move || x.wait_simultaneous("A", "B").unwrap());
    thread::sleep(Duration::from_millis(50));
    y.new_day().unwrap();

    assert!(!waiter.join().unwrap());
}
