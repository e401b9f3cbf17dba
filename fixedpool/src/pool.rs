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

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::Weak;

use tokio::sync::oneshot;

use crate::ManageResource;
use crate::PoolError;
use crate::mutex::Mutex;

/// The configuration of [`Pool`].
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Number of resources in the [`Pool`].
    ///
    /// Fixed for the lifetime of the pool. Must be greater than zero.
    pub capacity: usize,
}

impl PoolConfig {
    /// Creates a new [`PoolConfig`].
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

/// The current pool status.
///
/// See [`Pool::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolStatus {
    /// The number of slots in the pool.
    pub capacity: usize,

    /// The number of resources free for acquisition.
    pub available: usize,

    /// The number of queued [`Pool::acquire`] calls.
    pub wait_count: usize,
}

/// A fixed-capacity pool of shared resources.
///
/// All resources are created once by [`Pool::new`] and live as long as the pool. A resource
/// handed out by [`Pool::acquire`] has exactly one holder until it is given back with
/// [`Pool::release`].
///
/// Free resources are picked by a round-robin scan so that load spreads over all slots. When no
/// resource is free, callers queue up and are served strictly in arrival order: a released
/// resource passes directly from the releasing holder to the oldest waiter without ever being
/// observable as free.
pub struct Pool<R> {
    config: PoolConfig,
    /// Resources by slot index. Never added, removed, or replaced.
    slots: Box<[Arc<R>]>,
    state: Mutex<PoolState<R>>,
}

struct PoolState<R> {
    /// Per-slot availability; `true` means free.
    free: Vec<bool>,
    /// Always equals the number of `true` entries in `free`.
    available: usize,
    /// Slot where the next scan starts.
    cursor: usize,
    waiters: VecDeque<oneshot::Sender<Arc<R>>>,
}

impl<R> std::fmt::Debug for PoolState<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolState")
            .field("free", &self.free)
            .field("available", &self.available)
            .field("cursor", &self.cursor)
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

impl<R> std::fmt::Debug for Pool<R>
where
    R: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("slots", &self.slots)
            .field("state", &self.state)
            .finish()
    }
}

impl<R> Pool<R> {
    /// Creates a new [`Pool`], calling `manager` exactly `config.capacity` times.
    ///
    /// Returns [`PoolError::Configuration`] if the capacity is zero, since such a pool could never
    /// satisfy an acquisition.
    pub fn new<M>(config: PoolConfig, mut manager: M) -> Result<Arc<Self>, PoolError>
    where
        M: ManageResource<Resource = R>,
    {
        if config.capacity == 0 {
            return Err(PoolError::Configuration(
                "capacity must be greater than zero".to_string(),
            ));
        }

        let slots = (0..config.capacity)
            .map(|_| Arc::new(manager.create()))
            .collect::<Box<[_]>>();
        let state = Mutex::new(PoolState {
            free: vec![true; config.capacity],
            available: config.capacity,
            cursor: 0,
            waiters: VecDeque::new(),
        });

        tracing::debug!(capacity = config.capacity, "created pool");
        Ok(Arc::new(Self {
            config,
            slots,
            state,
        }))
    }

    /// Returns the number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Acquires a resource from this [`Pool`].
    ///
    /// If no resource is free, waits until one is released. Waiters are served in the order they
    /// arrived. There is no timeout; wrap the call in [`tokio::time::timeout`] for bounded waits.
    ///
    /// Cancelling a queued call is safe: a resource handed to it after cancellation goes back to
    /// the pool.
    pub async fn acquire(&self) -> Arc<R> {
        let rx = {
            let mut state = self.state.lock();
            if let Some(resource) = self.take_free(&mut state) {
                return resource;
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(wait_count = state.waiters.len(), "pool exhausted, waiting");
            rx
        };

        let mut rx = scopeguard::guard(rx, |mut rx| {
            rx.close();
            self.state.with(|state| state.waiters.retain(|waiter| !waiter.is_closed()));
            if let Ok(resource) = rx.try_recv() {
                self.release_or_log(&resource);
            }
        });

        let resource = match (&mut *rx).await {
            Ok(resource) => resource,
            Err(_) => unreachable!("invariant broken: waiter dropped by a live pool"),
        };

        scopeguard::ScopeGuard::into_inner(rx);
        resource
    }

    /// Acquires a free resource without waiting.
    ///
    /// Returns `None` if every resource is held.
    pub fn try_acquire(&self) -> Option<Arc<R>> {
        self.state.with(|state| self.take_free(state))
    }

    /// Acquires a resource wrapped in a [`Lease`] that releases it on drop.
    pub async fn lease(self: &Arc<Self>) -> Lease<R> {
        let resource = self.acquire().await;
        Lease {
            resource: Some(resource),
            pool: Arc::downgrade(self),
        }
    }

    /// Releases a resource previously returned by [`Pool::acquire`].
    ///
    /// If a caller is waiting, the resource goes straight to the oldest waiter; otherwise its slot
    /// is marked free.
    ///
    /// # Errors
    ///
    /// * [`PoolError::UnknownResource`] if `resource` does not belong to this pool.
    /// * [`PoolError::DoubleRelease`] if `resource` is not currently held.
    ///
    /// On error the pool is left untouched.
    ///
    /// A slot only records whether it is held, not by whom. Once a resource has been handed to a
    /// waiter, a second release by its previous holder is indistinguishable from the new holder's
    /// release and is accepted. Use [`Pool::lease`] to make a second release impossible.
    pub fn release(&self, resource: &Arc<R>) -> Result<(), PoolError> {
        let slot = self.slot_of(resource).ok_or(PoolError::UnknownResource)?;

        let mut state = self.state.lock();
        if state.free[slot] {
            return Err(PoolError::DoubleRelease { slot });
        }

        let mut resource = resource.clone();
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(resource) {
                Ok(()) => {
                    tracing::trace!(slot, "handed resource to waiter");
                    return Ok(());
                }
                // the waiter has been cancelled
                Err(returned) => resource = returned,
            }
        }

        assert!(
            state.available < self.config.capacity,
            "invariant broken: available < capacity before release (actual: {} < {})",
            state.available,
            self.config.capacity,
        );
        state.free[slot] = true;
        state.available += 1;
        tracing::trace!(slot, available = state.available, "released resource");
        Ok(())
    }

    /// Returns the current status of the pool.
    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            capacity: self.config.capacity,
            available: state.available,
            wait_count: state.waiters.len(),
        }
    }

    /// Returns a snapshot of per-slot availability; `true` means free.
    pub fn free_mask(&self) -> Vec<bool> {
        self.state.lock().free.clone()
    }

    /// Returns the slot of `resource` if it belongs to this pool.
    pub fn slot_of(&self, resource: &Arc<R>) -> Option<usize> {
        self.slots.iter().position(|r| Arc::ptr_eq(r, resource))
    }

    fn take_free(&self, state: &mut PoolState<R>) -> Option<Arc<R>> {
        if state.available == 0 {
            return None;
        }

        let capacity = self.config.capacity;
        for _ in 0..capacity {
            let slot = state.cursor;
            state.cursor = (state.cursor + 1) % capacity;
            if state.free[slot] {
                state.free[slot] = false;
                state.available -= 1;
                tracing::trace!(slot, available = state.available, "acquired resource");
                return Some(self.slots[slot].clone());
            }
        }

        panic!(
            "invariant broken: {} resources available but no free slot among {}",
            state.available, capacity,
        );
    }

    fn release_or_log(&self, resource: &Arc<R>) {
        if let Err(err) = self.release(resource) {
            tracing::error!(%err, "failed to return resource to the pool");
        }
    }
}

/// A resource acquired with [`Pool::lease`].
///
/// This object implements [`Deref`]. You can use it as if it was of type `R`.
///
/// This object implements [`Drop`] that releases the underlying resource to the pool on drop. Call
/// [`Lease::release`] to observe the release result instead.
pub struct Lease<R> {
    resource: Option<Arc<R>>,
    pool: Weak<Pool<R>>,
}

impl<R> std::fmt::Debug for Lease<R>
where
    R: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("resource", &self.resource)
            .finish()
    }
}

impl<R> Drop for Lease<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Some(pool) = self.pool.upgrade() {
                pool.release_or_log(&resource);
            }
        }
    }
}

impl<R> Deref for Lease<R> {
    type Target = R;
    fn deref(&self) -> &R {
        // SAFETY: `resource` is always `Some` when `Lease` is owned.
        self.resource.as_ref().unwrap()
    }
}

impl<R> AsRef<R> for Lease<R> {
    fn as_ref(&self) -> &R {
        self
    }
}

impl<R> Lease<R> {
    /// Returns the shared handle of the leased resource.
    pub fn resource(&self) -> &Arc<R> {
        // SAFETY: `resource` is always `Some` when `Lease` is owned.
        self.resource.as_ref().unwrap()
    }

    /// Releases the resource to the [`Pool`] now.
    ///
    /// Succeeds without effect if the pool has already been dropped.
    pub fn release(mut self) -> Result<(), PoolError> {
        // SAFETY: `resource` is always `Some` when `Lease` is owned.
        let resource = self.resource.take().unwrap();
        match self.pool.upgrade() {
            Some(pool) => pool.release(&resource),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_timed_out_acquires_leave_no_waiters() {
        let pool = Pool::new(PoolConfig::new(1), || ()).unwrap();
        let held = pool.acquire().await;

        for _ in 0..1000 {
            let result = tokio::time::timeout(Duration::from_millis(1), pool.acquire()).await;
            assert!(result.is_err());
        }
        assert_eq!(pool.state.lock().waiters.len(), 0);
        assert_eq!(pool.status().wait_count, 0);

        pool.release(&held).unwrap();
        assert_eq!(pool.status().available, 1);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_keeps_others_queued() {
        let pool = Pool::new(PoolConfig::new(1), || ()).unwrap();
        let held = pool.acquire().await;

        let first = {
            let p = pool.clone();
            tokio::spawn(async move { p.acquire().await })
        };
        while pool.status().wait_count != 1 {
            tokio::task::yield_now().await;
        }

        let result = tokio::time::timeout(Duration::from_millis(1), pool.acquire()).await;
        assert!(result.is_err());
        assert_eq!(pool.state.lock().waiters.len(), 1);

        pool.release(&held).unwrap();
        let handed = first.await.unwrap();
        assert!(Arc::ptr_eq(&handed, &held));
        assert_eq!(pool.status().available, 0);
    }

    #[test]
    fn test_broken_count_panics_before_release_mutates() {
        let pool = Pool::new(PoolConfig::new(2), || ()).unwrap();
        let held = pool.try_acquire().unwrap();
        pool.state.with(|state| state.available = 2);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = pool.release(&held);
        }));
        assert!(result.is_err());
        assert_eq!(pool.free_mask(), vec![false, true]);
        assert_eq!(pool.status().available, 2);
    }
}
