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

//! Emulates incoming requests that each borrow a database connection from a fixed pool.

use fixedpool::ConnectionConfig;
use fixedpool::ConnectionFactory;
use fixedpool::Pool;
use fixedpool::PoolConfig;
use tracing_subscriber::EnvFilter;

const CONNECTIONS: usize = 5;
const REQUESTS: usize = 10;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let factory = ConnectionFactory::new(ConnectionConfig::default());
    let pool = Pool::new(PoolConfig::new(CONNECTIONS), factory).unwrap();

    let mut requests = Vec::with_capacity(REQUESTS);
    for i in 1..=REQUESTS {
        tracing::info!(request = i, "received");
        let conn = pool.acquire().await;
        if !conn.is_connected() {
            conn.connect().await;
        }

        let pool = pool.clone();
        requests.push(tokio::spawn(async move {
            match conn.query(&format!("SELECT * FROM table_{i};")).await {
                Ok(result) => tracing::info!(request = i, rows = result.row_count, "returned data"),
                Err(err) => tracing::error!(request = i, %err, "got an error"),
            }
            pool.release(&conn).unwrap();
        }));
    }

    for request in requests {
        request.await.unwrap();
    }

    let status = pool.status();
    tracing::info!(available = status.available, capacity = status.capacity, "all requests served");
}
