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

use std::time::Duration;

/// Errors returned by [`Pool`](crate::Pool) construction and release.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool configuration cannot produce a usable pool.
    #[error("invalid pool configuration: {0}")]
    Configuration(String),

    /// The released resource was never produced by this pool.
    #[error("pool: release unexpected resource")]
    UnknownResource,

    /// The released resource is not currently held.
    #[error("pool: release of slot {slot} which is not captured")]
    DoubleRelease {
        /// The slot the resource lives in.
        slot: usize,
    },
}

/// Errors returned by [`Connection`](crate::Connection) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// The connection must be connected before it can run queries.
    #[error("[{name}] cannot execute query: not connected")]
    NotConnected {
        /// The connection name.
        name: String,
    },

    /// The query was aborted by the abort timer.
    #[error("[{name}] query aborted due to timer after {after:?}")]
    Timeout {
        /// The connection name.
        name: String,
        /// The abort threshold that fired.
        after: Duration,
    },
}

impl ConnectionError {
    /// Returns `true` if this error was produced by the abort timer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectionError::Timeout { .. })
    }
}
