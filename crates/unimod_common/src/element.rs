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

use std::fmt;

use serde::{Deserialize, Serialize};

/// A uniform name for a matrix line: `+k` denotes row `k-1`, `-k` denotes
/// column `k-1` and `0` is the invalid element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Element(pub i64);

pub const INVALID: Element = Element(0);

impl Element {
    pub fn from_row(row: usize) -> Self {
        Element(row as i64 + 1)
    }

    pub fn from_column(column: usize) -> Self {
        Element(-(column as i64) - 1)
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn is_row(self) -> bool {
        self.0 > 0
    }

    pub fn is_column(self) -> bool {
        self.0 < 0
    }

    /// Row index of a row element. Must not be called on columns.
    pub fn row(self) -> usize {
        debug_assert!(self.is_row());
        (self.0 - 1) as usize
    }

    /// Column index of a column element. Must not be called on rows.
    pub fn column(self) -> usize {
        debug_assert!(self.is_column());
        (-self.0 - 1) as usize
    }

    /// The same line viewed in the transposed matrix.
    pub fn transpose(self) -> Self {
        Element(-self.0)
    }
}

impl Default for Element {
    fn default() -> Self {
        INVALID
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_row() {
            write!(f, "r{}", self.row() + 1)
        } else if self.is_column() {
            write!(f, "c{}", self.column() + 1)
        } else {
            write!(f, "<invalid>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_and_column_round_trip() {
        for i in 0..10 {
            assert_eq!(Element::from_row(i).row(), i);
            assert_eq!(Element::from_column(i).column(), i);
            assert!(Element::from_row(i).is_row());
            assert!(Element::from_column(i).is_column());
        }
        assert!(!INVALID.is_valid());
    }

    #[test]
    fn transpose_swaps_roles() {
        assert_eq!(Element::from_row(4).transpose(), Element::from_column(4));
        assert_eq!(Element::from_column(0).transpose(), Element::from_row(0));
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(Element::from_row(0).to_string(), "r1");
        assert_eq!(Element::from_column(2).to_string(), "c3");
    }
}
