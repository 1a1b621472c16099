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

//! Construction of a sequence of nested 3-connected minors, starting from a
//! W3 seed. Each step adds one row, one column, one of each, or two of one
//! kind and one of the other, found through hashing (parallel detection)
//! and an augmenting-path search with pivots. An unreachable target reveals
//! a 2-separation.

use log::{debug, trace};
use unimod_common::dense::DenseBinaryMatrix;
use unimod_common::hashing::{hash_coefficients, next_power_of_two, project_signed_hash, ListHashTable, NO_ENTRY};
use unimod_common::{element, Element, Submatrix, TernaryMatrix};

use crate::deadline::Deadline;
use crate::error::RecognitionError;

/// The completed sequence in nested-minor coordinates: rows and columns are
/// permuted so that the minors appear as consecutive top-left submatrices.
#[derive(Debug, Clone)]
pub struct NestedMinorSequence {
    pub matrix: TernaryMatrix,
    pub transpose: TernaryMatrix,
    pub sequence_num_rows: Vec<usize>,
    pub sequence_num_columns: Vec<usize>,
    /// Element of the input matrix represented by each sequence row; pivots
    /// may have swapped a row with a column.
    pub rows_original: Vec<Element>,
    pub columns_original: Vec<Element>,
}

impl NestedMinorSequence {
    pub fn len(&self) -> usize {
        self.sequence_num_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_num_rows.is_empty()
    }
}

/// Result of the growth: either the full sequence or a 2-separation of the
/// input matrix (parts given per input line).
#[derive(Debug, Clone)]
pub enum NestedOutcome {
    Sequence(NestedMinorSequence),
    TwoSeparation {
        first_rows: Vec<bool>,
        first_columns: Vec<bool>,
    },
}

#[derive(Debug, Clone, Copy)]
struct LineData {
    hash: i64,
    hash_entry: usize,
    num_nonzeros: usize,
    representative: Element,
    predecessor: Element,
    original: Element,
    is_processed: bool,
    is_source: bool,
    is_target: bool,
    is_flipped: bool,
    in_queue: bool,
}

impl LineData {
    fn new(original: Element) -> Self {
        Self {
            hash: 0,
            hash_entry: NO_ENTRY,
            num_nonzeros: 0,
            representative: element::INVALID,
            predecessor: element::INVALID,
            original,
            is_processed: false,
            is_source: false,
            is_target: false,
            is_flipped: false,
            in_queue: false,
        }
    }
}

struct Growth {
    dense: DenseBinaryMatrix,
    rows: Vec<LineData>,
    columns: Vec<LineData>,
    row_table: ListHashTable,
    column_table: ListHashTable,
    coefficients: Vec<i64>,
    processed_rows: Vec<usize>,
    processed_columns: Vec<usize>,
}

/// Grows the sequence of nested 3-connected minors from the W3 seed.
pub fn extend_nested_minor_sequence(
    matrix: &TernaryMatrix,
    wheel: &Submatrix,
    deadline: &Deadline,
) -> Result<NestedOutcome, RecognitionError> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    debug!(
        "growing a nested minor sequence in a {}x{} matrix from a W{} seed",
        num_rows,
        num_columns,
        wheel.rows.len()
    );

    let mut growth = Growth {
        dense: DenseBinaryMatrix::from_sparse(&matrix.support()),
        rows: (0..num_rows).map(|row| LineData::new(Element::from_row(row))).collect(),
        columns: (0..num_columns)
            .map(|column| LineData::new(Element::from_column(column)))
            .collect(),
        row_table: ListHashTable::new(next_power_of_two(num_rows), num_rows.max(1)),
        column_table: ListHashTable::new(next_power_of_two(num_columns), num_columns.max(1)),
        coefficients: hash_coefficients(num_rows.max(num_columns)),
        processed_rows: wheel.rows.clone(),
        processed_columns: wheel.columns.clone(),
    };
    for &row in &wheel.rows {
        growth.rows[row].is_processed = true;
        growth.rows[row].representative = Element::from_row(row);
    }
    for &column in &wheel.columns {
        growth.columns[column].is_processed = true;
        growth.columns[column].representative = Element::from_column(column);
    }
    growth.initialize_hashing();

    let mut sequence_num_rows = vec![growth.processed_rows.len()];
    let mut sequence_num_columns = vec![growth.processed_columns.len()];

    while growth.processed_rows.len() < num_rows || growth.processed_columns.len() < num_columns {
        deadline.check()?;

        // Rule 1: a non-parallel line with more than one nonzero in the
        // processed part extends the sequence directly.
        if growth.add_nonparallel_line(true) || growth.add_nonparallel_line(false) {
            sequence_num_rows.push(growth.processed_rows.len());
            sequence_num_columns.push(growth.processed_columns.len());
            continue;
        }

        // Rule 2: every unprocessed line is zero, unit or parallel. Search
        // an augmenting path between two parallel classes, pivoting along
        // its interior.
        let start_element = growth.prepare_search();
        let reached = growth.search_shortest_path();
        match reached {
            Some(target) => {
                let new_elements = growth.apply_pivots(target);
                for element in new_elements {
                    if element.is_row() {
                        growth.add_element(element.row(), true);
                    } else {
                        growth.add_element(element.column(), false);
                    }
                }
                growth.reinsert_hashes();
                sequence_num_rows.push(growth.processed_rows.len());
                sequence_num_columns.push(growth.processed_columns.len());
            }
            None => {
                // The unreachable side defines a 2-separation of the input.
                trace!("sequence growth found a 2-separation");
                let mut first_rows = vec![false; num_rows];
                let mut first_columns = vec![false; num_columns];
                for row in 0..num_rows {
                    let data = &growth.rows[row];
                    let in_first = data.predecessor.is_valid()
                        || data.is_source
                        || Element::from_row(row) == start_element;
                    let original = data.original;
                    if original.is_row() {
                        first_rows[original.row()] = in_first;
                    } else {
                        first_columns[original.column()] = in_first;
                    }
                }
                for column in 0..num_columns {
                    let data = &growth.columns[column];
                    let in_first = data.predecessor.is_valid()
                        || data.is_source
                        || Element::from_column(column) == start_element;
                    let original = data.original;
                    if original.is_row() {
                        first_rows[original.row()] = in_first;
                    } else {
                        first_columns[original.column()] = in_first;
                    }
                }
                return Ok(NestedOutcome::TwoSeparation {
                    first_rows,
                    first_columns,
                });
            }
        }
    }

    // Assemble the nested-minors matrix from the pivoted dense matrix in
    // processed order.
    let mut triplets: Vec<(usize, usize, i8)> = Vec::new();
    for (new_row, &row) in growth.processed_rows.iter().enumerate() {
        for (new_column, &column) in growth.processed_columns.iter().enumerate() {
            if growth.dense.get(row, column) {
                triplets.push((new_row, new_column, 1));
            }
        }
    }
    let nested = TernaryMatrix::from_triplets(num_rows, num_columns, &triplets)?;
    let transpose = nested.transpose();
    let rows_original = growth
        .processed_rows
        .iter()
        .map(|&row| growth.rows[row].original)
        .collect();
    let columns_original = growth
        .processed_columns
        .iter()
        .map(|&column| growth.columns[column].original)
        .collect();
    debug!(
        "nested minor sequence of length {} completed",
        sequence_num_rows.len()
    );
    Ok(NestedOutcome::Sequence(NestedMinorSequence {
        matrix: nested,
        transpose,
        sequence_num_rows,
        sequence_num_columns,
        rows_original,
        columns_original,
    }))
}

impl Growth {
    fn initialize_hashing(&mut self) {
        let processed_columns = self.processed_columns.clone();
        let processed_rows = self.processed_rows.clone();
        for row in 0..self.rows.len() {
            for &column in &processed_columns {
                if self.dense.get(row, column) {
                    self.rows[row].hash =
                        project_signed_hash(self.rows[row].hash + self.coefficients[column]);
                    self.rows[row].num_nonzeros += 1;
                    self.rows[row].representative = Element::from_column(column);
                }
            }
            if self.rows[row].is_processed {
                self.rows[row].representative = Element::from_row(row);
                self.rows[row].hash_entry = self.row_table.insert(self.rows[row].hash.unsigned_abs(), row);
            }
        }
        for column in 0..self.columns.len() {
            for &row in &processed_rows {
                if self.dense.get(row, column) {
                    self.columns[column].hash =
                        project_signed_hash(self.columns[column].hash + self.coefficients[row]);
                    self.columns[column].num_nonzeros += 1;
                    self.columns[column].representative = Element::from_row(row);
                }
            }
            if self.columns[column].is_processed {
                self.columns[column].representative = Element::from_column(column);
                self.columns[column].hash_entry =
                    self.column_table.insert(self.columns[column].hash.unsigned_abs(), column);
            }
        }
    }

    /// Looks for an unprocessed line with more than one nonzero in the
    /// processed part that is not parallel to a processed line, and adds it.
    fn add_nonparallel_line(&mut self, rows: bool) -> bool {
        let count = if rows { self.rows.len() } else { self.columns.len() };
        for index in 0..count {
            let data = if rows { &self.rows[index] } else { &self.columns[index] };
            if data.is_processed || data.num_nonzeros <= 1 {
                continue;
            }
            self.update_representative(index, rows);
            let data = if rows { &self.rows[index] } else { &self.columns[index] };
            if data.representative.is_valid() {
                continue;
            }
            trace!(
                "adding non-parallel {} to the sequence",
                if rows { Element::from_row(index) } else { Element::from_column(index) }
            );
            self.add_element(index, rows);
            self.reinsert_hashes();
            return true;
        }
        false
    }

    /// Confirms or clears the representative of an unprocessed line by
    /// comparing against the hashed processed lines.
    fn update_representative(&mut self, index: usize, rows: bool) {
        let (hash, minors) = if rows {
            (self.rows[index].hash, self.processed_columns.clone())
        } else {
            (self.columns[index].hash, self.processed_rows.clone())
        };
        let table = if rows { &self.row_table } else { &self.column_table };
        let mut representative = element::INVALID;
        let mut entry = table.find_first(hash.unsigned_abs());
        while entry != NO_ENTRY {
            let candidate = table.value(entry);
            let candidate_hash = if rows {
                self.rows[candidate].hash
            } else {
                self.columns[candidate].hash
            };
            if candidate_hash == hash {
                let equal = minors.iter().all(|&minor| {
                    let (a, b) = if rows {
                        (self.dense.get(index, minor), self.dense.get(candidate, minor))
                    } else {
                        (self.dense.get(minor, index), self.dense.get(minor, candidate))
                    };
                    a == b
                });
                if equal {
                    representative = if rows {
                        Element::from_row(candidate)
                    } else {
                        Element::from_column(candidate)
                    };
                    break;
                }
            }
            entry = table.find_next(hash.unsigned_abs(), entry);
        }
        if rows {
            self.rows[index].representative = representative;
        } else {
            self.columns[index].representative = representative;
        }
    }

    /// Moves a line into the processed part, updating the crossing lines'
    /// hashes, counts and unit representatives.
    fn add_element(&mut self, index: usize, rows: bool) {
        if rows {
            debug_assert!(!self.rows[index].is_processed);
            self.rows[index].is_processed = true;
            self.rows[index].representative = Element::from_row(index);
            self.processed_rows.push(index);
            for column in 0..self.columns.len() {
                if !self.dense.get(index, column) {
                    continue;
                }
                if self.columns[column].is_processed {
                    if self.columns[column].hash_entry != NO_ENTRY {
                        self.column_table.remove(self.columns[column].hash_entry);
                        self.columns[column].hash_entry = NO_ENTRY;
                    }
                } else {
                    self.columns[column].num_nonzeros += 1;
                    self.columns[column].representative = Element::from_row(index);
                }
                self.columns[column].hash =
                    project_signed_hash(self.columns[column].hash + self.coefficients[index]);
            }
        } else {
            debug_assert!(!self.columns[index].is_processed);
            self.columns[index].is_processed = true;
            self.columns[index].representative = Element::from_column(index);
            self.processed_columns.push(index);
            for row in 0..self.rows.len() {
                if !self.dense.get(row, index) {
                    continue;
                }
                if self.rows[row].is_processed {
                    if self.rows[row].hash_entry != NO_ENTRY {
                        self.row_table.remove(self.rows[row].hash_entry);
                        self.rows[row].hash_entry = NO_ENTRY;
                    }
                } else {
                    self.rows[row].num_nonzeros += 1;
                    self.rows[row].representative = Element::from_column(index);
                }
                self.rows[row].hash = project_signed_hash(self.rows[row].hash + self.coefficients[index]);
            }
        }
    }

    /// Reinserts processed lines whose hash entries were invalidated.
    fn reinsert_hashes(&mut self) {
        for position in 0..self.processed_rows.len() {
            let row = self.processed_rows[position];
            if self.rows[row].hash_entry == NO_ENTRY {
                self.rows[row].hash_entry = self.row_table.insert(self.rows[row].hash.unsigned_abs(), row);
            }
        }
        for position in 0..self.processed_columns.len() {
            let column = self.processed_columns[position];
            if self.columns[column].hash_entry == NO_ENTRY {
                self.columns[column].hash_entry =
                    self.column_table.insert(self.columns[column].hash.unsigned_abs(), column);
            }
        }
    }

    /// Chooses the first parallel class as sources and the remaining
    /// classes as targets, and sets the flip marks that emulate negation.
    fn prepare_search(&mut self) -> Element {
        let mut start_element = element::INVALID;
        for row in 0..self.rows.len() {
            let valid = !self.rows[row].is_processed && self.rows[row].representative.is_valid();
            self.rows[row].is_source = false;
            self.rows[row].is_target = false;
            self.rows[row].is_flipped = false;
            if valid {
                if !start_element.is_valid() {
                    start_element = self.rows[row].representative;
                }
                if self.rows[row].representative == start_element {
                    self.rows[row].is_source = true;
                    if start_element.is_row() {
                        self.rows[row].is_flipped = true;
                    }
                } else {
                    self.rows[row].is_target = true;
                }
            }
        }
        for column in 0..self.columns.len() {
            let valid = !self.columns[column].is_processed && self.columns[column].representative.is_valid();
            self.columns[column].is_source = false;
            self.columns[column].is_target = false;
            self.columns[column].is_flipped = false;
            if valid {
                if !start_element.is_valid() {
                    start_element = self.columns[column].representative;
                }
                if self.columns[column].representative == start_element {
                    self.columns[column].is_source = true;
                    if start_element.is_column() {
                        self.columns[column].is_flipped = true;
                    }
                } else {
                    self.columns[column].is_target = true;
                }
            }
        }

        if start_element.is_row() {
            let row = start_element.row();
            for column in 0..self.columns.len() {
                if self.dense.get(row, column) && self.columns[column].is_target {
                    self.columns[column].is_flipped = true;
                }
            }
        } else if start_element.is_column() {
            let column = start_element.column();
            for row in 0..self.rows.len() {
                if self.dense.get(row, column) && self.rows[row].is_target {
                    self.rows[row].is_flipped = true;
                }
            }
        }
        start_element
    }

    /// BFS through the unprocessed part; an edge between a row and a column
    /// exists when the dense entry differs from the combined flip mark.
    fn search_shortest_path(&mut self) -> Option<Element> {
        let mut queue: Vec<Element> = Vec::new();
        for row in 0..self.rows.len() {
            self.rows[row].in_queue = self.rows[row].is_source;
            self.rows[row].predecessor = element::INVALID;
            if self.rows[row].is_source {
                queue.push(Element::from_row(row));
            }
        }
        for column in 0..self.columns.len() {
            self.columns[column].in_queue = self.columns[column].is_source;
            self.columns[column].predecessor = element::INVALID;
            if self.columns[column].is_source {
                queue.push(Element::from_column(column));
            }
        }

        let mut first = 0;
        while first < queue.len() {
            let top = queue[first];
            first += 1;
            if top.is_row() {
                let row = top.row();
                if self.rows[row].is_target {
                    return Some(top);
                }
                let row_flipped = self.rows[row].is_flipped;
                for column in 0..self.columns.len() {
                    let flip = row_flipped && self.columns[column].is_flipped;
                    if flip == self.dense.get(row, column) {
                        continue;
                    }
                    if self.columns[column].in_queue || self.columns[column].is_processed {
                        continue;
                    }
                    self.columns[column].in_queue = true;
                    self.columns[column].predecessor = top;
                    queue.push(Element::from_column(column));
                }
            } else {
                let column = top.column();
                if self.columns[column].is_target {
                    return Some(top);
                }
                let column_flipped = self.columns[column].is_flipped;
                for row in 0..self.rows.len() {
                    let flip = column_flipped && self.rows[row].is_flipped;
                    if flip == self.dense.get(row, column) {
                        continue;
                    }
                    if self.rows[row].in_queue || self.rows[row].is_processed {
                        continue;
                    }
                    self.rows[row].in_queue = true;
                    self.rows[row].predecessor = top;
                    queue.push(Element::from_row(row));
                }
            }
        }
        None
    }

    /// Pivots along the interior of the found path; the path endpoints (and
    /// for longer paths the element next to the target) become the new
    /// sequence elements.
    fn apply_pivots(&mut self, reached_target: Element) -> Vec<Element> {
        let mut news = [element::INVALID; 3];
        let mut count = 0usize;
        let mut current = reached_target;
        while current.is_valid() {
            if count > 0 {
                news[2] = news[1];
                news[1] = news[0];
                news[0] = current;
                if news[2].is_valid() {
                    let (pivot_row, pivot_column) = if news[2].is_row() {
                        (news[2].row(), news[1].column())
                    } else {
                        (news[1].row(), news[2].column())
                    };
                    trace!("pivot at r{},c{}", pivot_row + 1, pivot_column + 1);
                    self.dense.pivot(pivot_row, pivot_column);
                    let tmp = self.rows[pivot_row].original;
                    self.rows[pivot_row].original = self.columns[pivot_column].original;
                    self.columns[pivot_column].original = tmp;
                    news[2] = element::INVALID;
                    news[1] = element::INVALID;
                }
            }
            current = if current.is_row() {
                self.rows[current.row()].predecessor
            } else {
                self.columns[current.column()].predecessor
            };
            count += 1;
        }
        if news[1].is_valid() {
            news[2] = reached_target;
        } else {
            news[1] = reached_target;
        }
        news.into_iter().filter(|element| element.is_valid()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel3() -> Submatrix {
        Submatrix::new(vec![0, 1, 2], vec![0, 1, 2])
    }

    #[test]
    fn pure_wheel_has_trivial_sequence() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let outcome = extend_nested_minor_sequence(&matrix, &wheel3(), &Deadline::unlimited()).unwrap();
        let NestedOutcome::Sequence(sequence) = outcome else {
            panic!("expected a sequence");
        };
        assert_eq!(sequence.sequence_num_rows, vec![3]);
        assert_eq!(sequence.sequence_num_columns, vec![3]);
        assert_eq!(sequence.matrix, matrix);
    }

    #[test]
    fn extra_line_extends_by_one_step() {
        // W3 plus one extra column with two nonzeros that is not parallel
        // to anything.
        let matrix = TernaryMatrix::from_dense(
            3,
            4,
            &[
                1, 1, 0, 1, //
                0, 1, 1, 1, //
                1, 1, 1, 0,
            ],
        );
        let outcome = extend_nested_minor_sequence(&matrix, &wheel3(), &Deadline::unlimited()).unwrap();
        let NestedOutcome::Sequence(sequence) = outcome else {
            panic!("expected a sequence");
        };
        assert_eq!(sequence.sequence_num_rows, vec![3, 3]);
        assert_eq!(sequence.sequence_num_columns, vec![3, 4]);
        assert_eq!(sequence.columns_original[3], Element::from_column(3));
    }

    #[test]
    fn fano_grows_to_full_sequence() {
        // F7 = [I | ...] support contains W3 in rows/cols 0-2 after picking
        // the right seed; the remaining column is parallel to none.
        let matrix = TernaryMatrix::from_dense(
            3,
            4,
            &[
                1, 1, 0, 1, //
                1, 0, 1, 1, //
                0, 1, 1, 1,
            ],
        );
        // The leading 3x3 of F7 in this form is a wheel: rows have two
        // nonzeros each there.
        let outcome = extend_nested_minor_sequence(
            &matrix,
            &Submatrix::new(vec![0, 1, 2], vec![0, 1, 2]),
            &Deadline::unlimited(),
        )
        .unwrap();
        let NestedOutcome::Sequence(sequence) = outcome else {
            panic!("expected a sequence");
        };
        assert_eq!(*sequence.sequence_num_rows.last().unwrap(), 3);
        assert_eq!(*sequence.sequence_num_columns.last().unwrap(), 4);
    }

    #[test]
    fn glued_wheels_yield_two_separation() {
        // Two wheels glued along a rank-1 block; growth from the first
        // wheel cannot cross the glue 3-connectedly.
        let mut dense = vec![0i8; 36];
        let wheel = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        for row in 0..3 {
            for column in 0..3 {
                dense[row * 6 + column] = wheel.get(row, column);
                dense[(row + 3) * 6 + column + 3] = wheel.get(row, column);
            }
        }
        for row in 3..6 {
            dense[row * 6] = 1;
        }
        let matrix = TernaryMatrix::from_dense(6, 6, &dense);
        let outcome = extend_nested_minor_sequence(&matrix, &wheel3(), &Deadline::unlimited()).unwrap();
        let NestedOutcome::TwoSeparation {
            first_rows,
            first_columns,
        } = outcome
        else {
            panic!("expected a 2-separation");
        };
        // The second wheel block together with the glue column forms one
        // part.
        let first_count =
            first_rows.iter().filter(|&&f| f).count() + first_columns.iter().filter(|&&f| f).count();
        assert_eq!(first_count, 7);
        assert!(first_rows[3] && first_rows[4] && first_rows[5]);
        assert!(!first_rows[0] && !first_columns[1]);
    }
}
