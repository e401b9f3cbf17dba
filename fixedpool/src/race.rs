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

//! The abort timer raced against an operation's completion.

use std::future::Future;
use std::time::Duration;

/// The abort timer fired before the raced operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aborted;

/// Races `completion` against an abort timer firing after `reject_after`.
///
/// Exactly one side wins. The losing future is dropped, which cancels its timer, so it can never
/// resolve the race a second time. When both are ready on the same tick the abort timer wins,
/// making a completion that takes exactly `reject_after` an abort.
pub(crate) async fn race_abort_timer<F>(
    reject_after: Duration,
    completion: F,
) -> Result<F::Output, Aborted>
where
    F: Future,
{
    let abort = tokio::time::sleep(reject_after);
    tokio::select! {
        biased;
        () = abort => Err(Aborted),
        output = completion => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use super::*;

    const REJECT_AFTER: Duration = Duration::from_millis(5);

    #[tokio::test(start_paused = true)]
    async fn test_completion_before_abort() {
        let result = race_abort_timer(REJECT_AFTER, async {
            tokio::time::sleep(Duration::from_millis(4)).await;
            "rows"
        })
        .await;
        assert_eq!(result, Ok("rows"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tie_goes_to_abort() {
        let result = race_abort_timer(REJECT_AFTER, tokio::time::sleep(REJECT_AFTER)).await;
        assert_eq!(result, Err(Aborted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loser_never_completes() {
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let result = race_abort_timer(REJECT_AFTER, async move {
            tokio::time::sleep(Duration::from_millis(9)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;
        assert_eq!(result, Err(Aborted));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }
}
