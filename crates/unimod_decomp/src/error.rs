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

use unimod_common::MatrixError;

/// Errors of the recognition pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Propagated matrix kernel or format error.
    Matrix(MatrixError),
    /// A supplied separation or sum component violates its rank or marker
    /// assumptions.
    Structure { message: String },
    /// An internally composed matrix disagrees with the decomposition.
    Inconsistent { message: String },
    /// The configured wall-clock budget was exceeded.
    Timeout,
    /// Integer arithmetic overflowed during the rank/determinant reduction.
    Overflow,
}

impl RecognitionError {
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

impl Display for RecognitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matrix(error) => write!(f, "{error}"),
            Self::Structure { message } => write!(f, "structure error: {message}"),
            Self::Inconsistent { message } => write!(f, "inconsistent decomposition: {message}"),
            Self::Timeout => write!(f, "time limit exceeded"),
            Self::Overflow => write!(f, "integer overflow"),
        }
    }
}

impl std::error::Error for RecognitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Matrix(error) => Some(error),
            _ => None,
        }
    }
}

impl From<MatrixError> for RecognitionError {
    fn from(error: MatrixError) -> Self {
        Self::Matrix(error)
    }
}
