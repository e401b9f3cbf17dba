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

//! A fixed-capacity async resource pool.
//!
//! A [`Pool`] owns a fixed set of resources created once at construction. Callers
//! [`acquire`](Pool::acquire) a resource, use it, and [`release`](Pool::release) it back. When the
//! pool is exhausted, callers wait and are served in arrival order.
//!
//! [`Connection`] is a simulated database connection to pool. Its queries race an abort timer, so
//! any query slower than [`ConnectionConfig::reject_after`] fails with
//! [`ConnectionError::Timeout`] instead of running unbounded.
//!
//! # Example
//!
//! ```
//! use fixedpool::ConnectionConfig;
//! use fixedpool::ConnectionFactory;
//! use fixedpool::Pool;
//! use fixedpool::PoolConfig;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let factory = ConnectionFactory::new(ConnectionConfig::default());
//! let pool = Pool::new(PoolConfig::new(2), factory).unwrap();
//!
//! let conn = pool.acquire().await;
//! conn.connect().await;
//! match conn.query("SELECT * FROM table_1;").await {
//!     Ok(result) => assert_eq!(result.row_count, 1),
//!     Err(err) => assert!(err.is_timeout()),
//! }
//! pool.release(&conn).unwrap();
//! # }
//! ```

mod connection;
mod error;
mod manage;
mod mutex;
mod pool;
mod race;

pub use connection::Connection;
pub use connection::ConnectionConfig;
pub use connection::ConnectionFactory;
pub use connection::ConnectionState;
pub use connection::QueryResult;
pub use connection::Row;
pub use error::ConnectionError;
pub use error::PoolError;
pub use manage::ManageResource;
pub use pool::Lease;
pub use pool::Pool;
pub use pool::PoolConfig;
pub use pool::PoolStatus;
