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

/// A trait whose instance creates the resources that populate a [`Pool`](crate::Pool).
///
/// [`Pool::new`](crate::Pool::new) calls [`ManageResource::create`] exactly `capacity` times and
/// never again. Every call must return a fresh instance; the pool tells its slots apart by the
/// address of the shared allocation it wraps each instance in.
///
/// Any `FnMut() -> R` closure is a factory:
///
/// ```
/// use fixedpool::ManageResource;
///
/// let mut next = 0;
/// let mut factory = move || {
///     next += 1;
///     format!("worker-{next}")
/// };
/// assert_eq!(factory.create(), "worker-1");
/// assert_eq!(factory.create(), "worker-2");
/// ```
pub trait ManageResource {
    /// The type of resources that this instance creates.
    type Resource;

    /// Creates a new resource.
    fn create(&mut self) -> Self::Resource;
}

impl<R, F> ManageResource for F
where
    F: FnMut() -> R,
{
    type Resource = R;

    fn create(&mut self) -> R {
        self()
    }
}
