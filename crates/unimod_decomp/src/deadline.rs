// Copyright contributors to the unimod project
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

use std::time::{Duration, Instant};

use crate::error::RecognitionError;

/// Wall-clock budget of a recognition call. Checked at every task dequeue,
/// before every breadth-first search and periodically inside the reducers;
/// a caller observing a timeout sees no side effects on its inputs.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn check(&self) -> Result<(), RecognitionError> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(RecognitionError::Timeout),
            _ => Ok(()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_expires() {
        assert!(Deadline::unlimited().check().is_ok());
    }

    #[test]
    fn zero_budget_expires() {
        let deadline = Deadline::new(Some(Duration::from_nanos(0)));
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(deadline.check(), Err(RecognitionError::Timeout));
    }
}
