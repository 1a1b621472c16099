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

use std::fmt::{Display, Formatter};

/// Errors raised by the matrix kernel and the file-format readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// The input violates a documented precondition (bad token, wrong
    /// dimensions, entry outside the admissible range, zero entry in a
    /// sparse file, ...).
    InvalidInput { message: String },
    /// An internally derived matrix disagrees with its invariants.
    Inconsistent { message: String },
}

impl MatrixError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

impl Display for MatrixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::Inconsistent { message } => write!(f, "inconsistent matrix: {message}"),
        }
    }
}

impl std::error::Error for MatrixError {}
