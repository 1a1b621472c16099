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

//! Benchmark for the series-parallel reducer on a wheel surrounded by many
//! series-parallel additions.
//!
//! Run with:
//!
//! ```sh
//! cargo bench --package unimod_decomp --bench bench_reduce
//! ```

use std::hint::black_box;
use std::time::{Duration, Instant};

use unimod_common::TernaryMatrix;
use unimod_decomp::series_parallel::find_series_parallel;
use unimod_decomp::Deadline;

/// A W3 extended by `extra` alternating duplicate rows and unit columns.
fn wheel_with_additions(extra: usize) -> TernaryMatrix {
    let size = 3 + extra;
    let mut dense = vec![0i8; size * size];
    let wheel = [[1, 1, 0], [0, 1, 1], [1, 1, 1]];
    for row in 0..3 {
        for column in 0..3 {
            dense[row * size + column] = wheel[row][column];
        }
    }
    for index in 0..extra {
        let line = 3 + index;
        if index % 2 == 0 {
            // Duplicate of the previous row.
            for column in 0..size {
                dense[line * size + column] = dense[(line - 1) * size + column];
            }
        } else {
            // Unit column crossing the previous line.
            dense[(line - 1) * size + line] = 1;
            dense[line * size + line] = 1;
        }
    }
    TernaryMatrix::from_dense(size, size, &dense)
}

fn bench<F: FnMut()>(label: &str, min_duration: Duration, mut f: F) {
    for _ in 0..3 {
        f();
    }
    let mut total_iters: u64 = 0;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        f();
        total_iters += 1;
    }
    let elapsed = start.elapsed();
    println!(
        "{label}: {total_iters} iterations in {elapsed:?} ({:?}/iter)",
        elapsed / total_iters.max(1) as u32
    );
}

fn main() {
    for &extra in &[10usize, 50, 200] {
        let matrix = wheel_with_additions(extra);
        bench(
            &format!("reduce wheel plus {extra} additions"),
            Duration::from_millis(500),
            || {
                let result = find_series_parallel(black_box(&matrix), &Deadline::unlimited()).unwrap();
                black_box(result.operations.len());
            },
        );
    }
}
