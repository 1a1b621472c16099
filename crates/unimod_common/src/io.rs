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

//! Readers and writers for the dense, sparse and submatrix file formats.
//! All readers tolerate extra blanks, `#` comments and trailing newlines.

use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::error::MatrixError;
use crate::matrix::{MatrixValue, SparseMatrix};
use crate::submatrix::Submatrix;

/// Whitespace-separated token stream with `#`-to-end-of-line comments.
struct Tokens {
    tokens: Vec<String>,
    position: usize,
}

impl Tokens {
    fn read(reader: &mut dyn BufRead) -> Result<Self, MatrixError> {
        let mut tokens = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|error| MatrixError::invalid(format!("cannot read input: {error}")))?;
            if bytes == 0 {
                break;
            }
            let content = match line.find('#') {
                Some(position) => &line[..position],
                None => line.as_str(),
            };
            tokens.extend(content.split_whitespace().map(str::to_string));
        }
        Ok(Self { tokens, position: 0 })
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T, MatrixError> {
        let token = self
            .tokens
            .get(self.position)
            .ok_or_else(|| MatrixError::invalid(format!("unexpected end of input while reading {what}")))?;
        self.position += 1;
        token
            .parse::<T>()
            .map_err(|_| MatrixError::invalid(format!("bad token '{token}' while reading {what}")))
    }

    fn finished(&self) -> bool {
        self.position == self.tokens.len()
    }
}

/// Reads a matrix in dense format: `H W` followed by `H * W` entries.
pub fn read_dense<T: MatrixValue + FromStr>(
    reader: &mut dyn BufRead,
) -> Result<SparseMatrix<T>, MatrixError> {
    let mut tokens = Tokens::read(reader)?;
    let num_rows: usize = tokens.next("number of rows")?;
    let num_columns: usize = tokens.next("number of columns")?;
    let mut values = Vec::with_capacity(num_rows * num_columns);
    for row in 0..num_rows {
        for column in 0..num_columns {
            values.push(tokens.next(&format!("entry ({},{})", row + 1, column + 1))?);
        }
    }
    Ok(SparseMatrix::from_dense(num_rows, num_columns, &values))
}

/// Reads a matrix in sparse format: `H W K` followed by `K` lines `r c v`
/// with 1-based indices. Zero values are rejected; entries need not be
/// sorted on input.
pub fn read_sparse<T: MatrixValue + FromStr>(
    reader: &mut dyn BufRead,
) -> Result<SparseMatrix<T>, MatrixError> {
    let mut tokens = Tokens::read(reader)?;
    let num_rows: usize = tokens.next("number of rows")?;
    let num_columns: usize = tokens.next("number of columns")?;
    let num_nonzeros: usize = tokens.next("number of nonzeros")?;
    let mut triplets = Vec::with_capacity(num_nonzeros);
    for index in 0..num_nonzeros {
        let row: usize = tokens.next(&format!("row of nonzero #{}", index + 1))?;
        let column: usize = tokens.next(&format!("column of nonzero #{}", index + 1))?;
        let value: T = tokens.next(&format!("value of nonzero #{}", index + 1))?;
        if row == 0 || row > num_rows || column == 0 || column > num_columns {
            return Err(MatrixError::invalid(format!(
                "nonzero #{} at ({row},{column}) outside of {num_rows}x{num_columns} matrix",
                index + 1
            )));
        }
        triplets.push((row - 1, column - 1, value));
    }
    SparseMatrix::from_triplets(num_rows, num_columns, &triplets)
}

/// Reads a submatrix descriptor: `HR HC H W`, then `HR` row indices and
/// `HC` column indices, all 1-based.
pub fn read_submatrix(reader: &mut dyn BufRead) -> Result<(Submatrix, usize, usize), MatrixError> {
    let mut tokens = Tokens::read(reader)?;
    let num_sub_rows: usize = tokens.next("number of submatrix rows")?;
    let num_sub_columns: usize = tokens.next("number of submatrix columns")?;
    let num_rows: usize = tokens.next("number of matrix rows")?;
    let num_columns: usize = tokens.next("number of matrix columns")?;
    let mut rows = Vec::with_capacity(num_sub_rows);
    for index in 0..num_sub_rows {
        let row: usize = tokens.next(&format!("submatrix row #{}", index + 1))?;
        if row == 0 || row > num_rows {
            return Err(MatrixError::invalid(format!("submatrix row {row} out of range")));
        }
        rows.push(row - 1);
    }
    let mut columns = Vec::with_capacity(num_sub_columns);
    for index in 0..num_sub_columns {
        let column: usize = tokens.next(&format!("submatrix column #{}", index + 1))?;
        if column == 0 || column > num_columns {
            return Err(MatrixError::invalid(format!(
                "submatrix column {column} out of range"
            )));
        }
        columns.push(column - 1);
    }
    if !tokens.finished() {
        return Err(MatrixError::invalid("trailing tokens after submatrix"));
    }
    Ok((Submatrix::new(rows, columns), num_rows, num_columns))
}

pub fn write_dense<T: MatrixValue>(
    matrix: &SparseMatrix<T>,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    write!(writer, "{matrix}")
}

pub fn write_sparse<T: MatrixValue>(
    matrix: &SparseMatrix<T>,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {} {}",
        matrix.num_rows(),
        matrix.num_columns(),
        matrix.num_nonzeros()
    )?;
    for row in 0..matrix.num_rows() {
        for (column, value) in matrix.row_entries(row) {
            writeln!(writer, "{} {} {}", row + 1, column + 1, value)?;
        }
    }
    Ok(())
}

pub fn write_submatrix(
    submatrix: &Submatrix,
    num_rows: usize,
    num_columns: usize,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {} {} {}",
        submatrix.rows.len(),
        submatrix.columns.len(),
        num_rows,
        num_columns
    )?;
    for (index, row) in submatrix.rows.iter().enumerate() {
        write!(writer, "{}{}", if index > 0 { " " } else { "" }, row + 1)?;
    }
    writeln!(writer)?;
    for (index, column) in submatrix.columns.iter().enumerate() {
        write!(writer, "{}{}", if index > 0 { " " } else { "" }, column + 1)?;
    }
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::TernaryMatrix;

    #[test]
    fn dense_round_trip_with_comments() {
        let input = "# a triangle\n2 3\n1 0 -1\n0 1 1\n\n";
        let matrix: TernaryMatrix = read_dense(&mut input.as_bytes()).unwrap();
        assert_eq!(matrix.num_rows(), 2);
        assert_eq!(matrix.get(0, 2), -1);
        let mut output = Vec::new();
        write_dense(&matrix, &mut output).unwrap();
        let reread: TernaryMatrix = read_dense(&mut output.as_slice()).unwrap();
        assert_eq!(reread, matrix);
    }

    #[test]
    fn sparse_reader_sorts_and_rejects_zeros() {
        let input = "2 2 3\n2 2 -1\n1 2 1\n1 1 1\n";
        let matrix: TernaryMatrix = read_sparse(&mut input.as_bytes()).unwrap();
        assert!(matrix.check_consistency().is_ok());
        assert_eq!(matrix.get(1, 1), -1);

        let bad = "1 1 1\n1 1 0\n";
        assert!(read_sparse::<i8>(&mut bad.as_bytes()).is_err());
    }

    #[test]
    fn sparse_reader_rejects_out_of_range() {
        let input = "2 2 1\n3 1 1\n";
        assert!(read_sparse::<i8>(&mut input.as_bytes()).is_err());
    }

    #[test]
    fn submatrix_round_trip() {
        let input = "2 1 4 5\n4 2\n3\n";
        let (submatrix, num_rows, num_columns) = read_submatrix(&mut input.as_bytes()).unwrap();
        assert_eq!(submatrix.rows, vec![3, 1]);
        assert_eq!(submatrix.columns, vec![2]);
        let mut output = Vec::new();
        write_submatrix(&submatrix, num_rows, num_columns, &mut output).unwrap();
        let (reread, _, _) = read_submatrix(&mut output.as_slice()).unwrap();
        assert_eq!(reread, submatrix);
    }

    #[test]
    fn truncated_dense_input_is_an_error() {
        let input = "2 2\n1 0 1\n";
        assert!(read_dense::<i8>(&mut input.as_bytes()).is_err());
    }
}
