// Copyright 2025 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use fixedpool::ConnectionConfig;
use fixedpool::ConnectionFactory;
use fixedpool::Pool;
use fixedpool::PoolConfig;

/// Five simultaneous requests over two connections: two run at once, three queue and are
/// admitted in arrival order as connections come back, whether their query succeeded or not.
#[tokio::test(start_paused = true)]
async fn test_requests_are_admitted_in_arrival_order() {
    const REQUESTS: usize = 5;

    let config = ConnectionConfig::new().with_connect_latency(Duration::from_millis(10));
    let pool = Pool::new(PoolConfig::new(2), ConnectionFactory::new(config)).unwrap();

    let admitted = Arc::new(Mutex::new(vec![]));
    let in_use = Arc::new(AtomicUsize::new(0));
    let max_in_use = Arc::new(AtomicUsize::new(0));
    let timeouts = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for i in 0..REQUESTS {
        let pool = pool.clone();
        let admitted = admitted.clone();
        let in_use = in_use.clone();
        let max_in_use = max_in_use.clone();
        let timeouts = timeouts.clone();

        handles.push(tokio::spawn(async move {
            let conn = pool.acquire().await;
            admitted.lock().unwrap().push(i);
            let n = in_use.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_use.fetch_max(n, Ordering::SeqCst);

            conn.connect().await;
            let latency = Duration::from_millis(if i % 2 == 0 { 3 } else { 7 });
            let sql = format!("SELECT * FROM table_{i};");
            if let Err(err) = conn.query_with_latency(&sql, latency).await {
                assert!(err.is_timeout());
                timeouts.fetch_add(1, Ordering::SeqCst);
            }

            in_use.fetch_sub(1, Ordering::SeqCst);
            pool.release(&conn).unwrap();
        }));

        // let the request reach the pool before the next one arrives
        tokio::task::yield_now().await;
    }

    let status = pool.status();
    assert_eq!(status.available, 0);
    assert_eq!(status.wait_count, REQUESTS - 2);

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*admitted.lock().unwrap(), (0..REQUESTS).collect::<Vec<_>>());
    assert_eq!(max_in_use.load(Ordering::SeqCst), 2);
    assert_eq!(timeouts.load(Ordering::SeqCst), 2);

    let status = pool.status();
    assert_eq!(status.available, 2);
    assert_eq!(status.wait_count, 0);
    assert_eq!(pool.free_mask(), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn test_connections_keep_state_across_holders() {
    let config = ConnectionConfig::new().with_connect_latency(Duration::from_millis(10));
    let pool = Pool::new(PoolConfig::new(1), ConnectionFactory::new(config)).unwrap();

    let conn = pool.acquire().await;
    assert!(!conn.is_connected());
    conn.connect().await;
    pool.release(&conn).unwrap();

    let conn = pool.acquire().await;
    assert_eq!(conn.name(), "Client1");
    assert!(conn.is_connected());
    conn.disconnect().await;
    pool.release(&conn).unwrap();
}
