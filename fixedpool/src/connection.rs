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

//! A simulated database connection with a connect/query/disconnect lifecycle.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::ConnectionError;
use crate::ManageResource;
use crate::race::race_abort_timer;

/// The configuration of a [`Connection`].
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct ConnectionConfig {
    /// Simulated handshake latency of [`Connection::connect`].
    pub connect_latency: Duration,

    /// Simulated teardown latency of [`Connection::disconnect`].
    pub disconnect_latency: Duration,

    /// Delay after which the abort timer fails a running query.
    pub reject_after: Duration,

    /// Exclusive upper bound of the simulated query latency drawn by [`Connection::query`].
    pub max_latency: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_latency: Duration::from_millis(1000),
            disconnect_latency: Duration::from_millis(300),
            reject_after: Duration::from_millis(5),
            max_latency: Duration::from_millis(10),
        }
    }
}

impl ConnectionConfig {
    /// Creates a new [`ConnectionConfig`] with default latencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new [`ConnectionConfig`] with the specified handshake latency.
    pub fn with_connect_latency(mut self, connect_latency: Duration) -> Self {
        self.connect_latency = connect_latency;
        self
    }

    /// Returns a new [`ConnectionConfig`] with the specified teardown latency.
    pub fn with_disconnect_latency(mut self, disconnect_latency: Duration) -> Self {
        self.disconnect_latency = disconnect_latency;
        self
    }

    /// Returns a new [`ConnectionConfig`] with the specified abort threshold.
    pub fn with_reject_after(mut self, reject_after: Duration) -> Self {
        self.reject_after = reject_after;
        self
    }

    /// Returns a new [`ConnectionConfig`] with the specified query latency upper bound.
    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }
}

/// The lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state, and the state after [`Connection::disconnect`].
    Disconnected,
    /// The state after [`Connection::connect`].
    Connected,
}

/// A row returned by a simulated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub name: String,
}

/// The payload of a successful query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    fn sample() -> Self {
        let rows = vec![Row {
            id: 1,
            name: "Sample Data".to_string(),
        }];
        let row_count = rows.len();
        Self { rows, row_count }
    }
}

/// A simulated database connection.
///
/// A connection does no locking of its own. Exclusive use is the pool's job: only the current
/// holder of a connection acquired from a [`Pool`](crate::Pool) may call its methods.
#[derive(Debug)]
pub struct Connection {
    name: String,
    config: ConnectionConfig,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new disconnected [`Connection`].
    pub fn new(name: impl Into<String>, config: ConnectionConfig) -> Self {
        Self {
            name: name.into(),
            config,
            connected: AtomicBool::new(false),
        }
    }

    /// Returns the diagnostic name of this connection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration of this connection.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.connected.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Returns `true` if the connection is [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connects to the database.
    ///
    /// Does nothing if the connection is already connected.
    pub async fn connect(&self) {
        if self.is_connected() {
            return;
        }

        tracing::info!(name = %self.name, "connecting to database");
        tokio::time::sleep(self.config.connect_latency).await;
        self.connected.store(true, Ordering::Release);
        tracing::info!(name = %self.name, "connected");
    }

    /// Executes `sql` with a random simulated latency in `[0, max_latency)`.
    ///
    /// Fails with [`ConnectionError::Timeout`] if the latency reaches `reject_after`.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, ConnectionError> {
        self.ensure_connected()?;
        let latency = random_latency(self.config.max_latency);
        self.race_query(sql, latency).await
    }

    /// Executes `sql` with the given simulated latency.
    ///
    /// The query resolves with its rows if `latency < reject_after` and fails with
    /// [`ConnectionError::Timeout`] otherwise. Exactly one of the two outcomes occurs.
    pub async fn query_with_latency(
        &self,
        sql: &str,
        latency: Duration,
    ) -> Result<QueryResult, ConnectionError> {
        self.ensure_connected()?;
        self.race_query(sql, latency).await
    }

    /// Disconnects from the database.
    ///
    /// The teardown latency applies even if the connection was never connected.
    pub async fn disconnect(&self) {
        tracing::info!(name = %self.name, "disconnecting from database");
        tokio::time::sleep(self.config.disconnect_latency).await;
        self.connected.store(false, Ordering::Release);
        tracing::info!(name = %self.name, "disconnected");
    }

    fn ensure_connected(&self) -> Result<(), ConnectionError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ConnectionError::NotConnected {
                name: self.name.clone(),
            })
        }
    }

    async fn race_query(
        &self,
        sql: &str,
        latency: Duration,
    ) -> Result<QueryResult, ConnectionError> {
        tracing::debug!(
            name = %self.name,
            sql,
            ?latency,
            "executing query"
        );

        let completion = async {
            tokio::time::sleep(latency).await;
            QueryResult::sample()
        };

        match race_abort_timer(self.config.reject_after, completion).await {
            Ok(result) => {
                tracing::debug!(name = %self.name, "query completed");
                Ok(result)
            }
            Err(_) => {
                tracing::warn!(
                    name = %self.name,
                    reject_after_ms = self.config.reject_after.as_millis() as u64,
                    "query aborted due to timer"
                );
                Err(ConnectionError::Timeout {
                    name: self.name.clone(),
                    after: self.config.reject_after,
                })
            }
        }
    }
}

fn random_latency(max_latency: Duration) -> Duration {
    let bound = u64::try_from(max_latency.as_nanos()).unwrap_or(u64::MAX);
    if bound == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(fastrand::u64(0..bound))
}

/// Creates [`Connection`]s named `Client1`, `Client2`, and so on.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFactory {
    config: ConnectionConfig,
    created: usize,
}

impl ConnectionFactory {
    /// Creates a new [`ConnectionFactory`] whose connections use `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, created: 0 }
    }

    /// Returns the number of connections created so far.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl ManageResource for ConnectionFactory {
    type Resource = Connection;

    fn create(&mut self) -> Connection {
        self.created += 1;
        Connection::new(format!("Client{}", self.created), self.config)
    }
}
