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

//! The `unimod` command line tool: recognition of totally unimodular,
//! regular, network and (equi)modular matrices, plus matrix utilities.
//! The file name `-` denotes stdin or stdout. Exit codes: 0 on success,
//! 1 on invalid input, 2 on any other error.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use unimod_common::io::{read_dense, read_sparse, read_submatrix, write_dense, write_sparse, write_submatrix};
use unimod_common::{IntMatrix, MatrixError, TernaryMatrix};
use unimod_decomp::{DecompositionStats, RecognitionError};
use unimod_graph::dot::{write_dot, write_dot_digraph};
use unimod_graph::edgelist::write_edge_list;
use unimod_tu::network::edge_elements;
use unimod_tu::{
    test_complement_tu, test_conetwork, test_k_modular, test_network, test_regular_binary,
    test_strongly_k_modular, test_strongly_unimodular, test_tu, test_unimodular, CtuResult, NetworkResult,
    TuResult,
};

/// Seeds are taken from the environment so that randomized runs stay
/// reproducible; defaults to a fixed seed.
fn parse_seed() -> u64 {
    env::var("UNIMOD_SEED")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Dense,
    Sparse,
}

#[derive(Parser)]
#[command(name = "unimod", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Input file; `-` reads from stdin.
    file: String,
    /// Input format.
    #[arg(short = 'i', long = "input", value_enum, default_value_t = Format::Dense)]
    input_format: Format,
    /// Restrict the operation to a submatrix read from this file.
    #[arg(short = 'S', long = "submatrix")]
    submatrix: Option<String>,
    /// Print statistics to stderr.
    #[arg(long = "stats")]
    stats: bool,
    /// Wall-clock budget in seconds.
    #[arg(long = "time-limit")]
    time_limit: Option<f64>,
}

/// Certificate outputs of the network test.
#[derive(clap::Args)]
struct NetworkCertificateArgs {
    /// Emit certificates.
    #[arg(short = 'c', long = "certificates")]
    certificates: bool,
    /// Write the realization graph as an edge list.
    #[arg(short = 'G', long = "graph")]
    graph_file: Option<String>,
    /// Write the spanning forest of the realization as an edge list.
    #[arg(short = 'T', long = "tree")]
    tree_file: Option<String>,
    /// Write the oriented realization as DOT.
    #[arg(short = 'D', long = "dot")]
    dot_file: Option<String>,
    /// Write the violating submatrix.
    #[arg(short = 'N', long = "violator")]
    violator_file: Option<String>,
}

/// Certificate outputs of the total unimodularity test: the decomposition
/// is summarized under `-c`, the violating submatrix goes to `-N`.
#[derive(clap::Args)]
struct TuCertificateArgs {
    /// Emit certificates.
    #[arg(short = 'c', long = "certificates")]
    certificates: bool,
    /// Write the violating submatrix.
    #[arg(short = 'N', long = "violator")]
    violator_file: Option<String>,
}

/// Certificate outputs of the graphicness test; a realization exists only
/// on the positive side, so no violator file is offered here.
#[derive(clap::Args)]
struct GraphicCertificateArgs {
    /// Write the realization graph as an edge list.
    #[arg(short = 'G', long = "graph")]
    graph_file: Option<String>,
    /// Write the spanning forest of the realization as an edge list.
    #[arg(short = 'T', long = "tree")]
    tree_file: Option<String>,
    /// Write the realization as DOT.
    #[arg(short = 'D', long = "dot")]
    dot_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Test for total unimodularity.
    Tu {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        certificates: TuCertificateArgs,
    },
    /// Test the binary input for regularity over GF(2).
    Regular {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(short = 'c', long = "certificates")]
        certificates: bool,
    },
    /// Test for being a network matrix; `-t` tests the conetwork dual.
    Network {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        certificates: NetworkCertificateArgs,
        /// Test the transposed (conetwork) property instead.
        #[arg(short = 't', long = "transposed")]
        transposed: bool,
    },
    /// Test the binary input for graphicness; `-t` tests cographicness.
    Graphic {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        certificates: GraphicCertificateArgs,
        /// Test the transposed (cographic) property instead.
        #[arg(short = 't', long = "transposed")]
        transposed: bool,
    },
    /// Test for unimodularity; `--strong` also tests the transpose.
    Unimodular {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long = "strong")]
        strong: bool,
    },
    /// Report the determinant gcd k of an equimodular matrix.
    KModular {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long = "strong")]
        strong: bool,
    },
    /// Test for complement total unimodularity.
    ComplementTu {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Matrix utilities: convert, transpose, support, randomize.
    Matrix {
        #[command(flatten)]
        common: CommonArgs,
        /// Output file; `-` writes to stdout.
        #[arg(default_value = "-")]
        output: String,
        /// Output format.
        #[arg(short = 'o', long = "output", value_enum, default_value_t = Format::Dense)]
        output_format: Format,
        /// Transpose the matrix.
        #[arg(short = 't', long = "transpose")]
        transpose: bool,
        /// Replace entries by their support.
        #[arg(long = "support")]
        support: bool,
        /// Replace entries by their signs.
        #[arg(long = "signed-support")]
        signed_support: bool,
        /// Apply this many random binary pivots.
        #[arg(long = "R2", value_name = "N")]
        random_binary_pivots: Option<usize>,
        /// Apply this many random ternary pivots.
        #[arg(long = "R3", value_name = "N")]
        random_ternary_pivots: Option<usize>,
        /// Randomly permute rows and columns.
        #[arg(short = 'r', long = "randomize")]
        randomize: bool,
    },
}

fn open_input(file: &str) -> Result<Box<dyn BufRead>, MatrixError> {
    if file == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        let handle = File::open(file)
            .map_err(|error| MatrixError::invalid(format!("cannot open '{file}': {error}")))?;
        Ok(Box::new(BufReader::new(handle)))
    }
}

fn open_output(file: &str) -> Result<Box<dyn Write>, RecognitionError> {
    if file == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        let handle = File::create(file).map_err(|error| {
            RecognitionError::Matrix(MatrixError::invalid(format!("cannot create '{file}': {error}")))
        })?;
        Ok(Box::new(handle))
    }
}

fn read_ternary(common: &CommonArgs) -> Result<TernaryMatrix, RecognitionError> {
    let mut reader = open_input(&common.file)?;
    let matrix: TernaryMatrix = match common.input_format {
        Format::Dense => read_dense(&mut reader)?,
        Format::Sparse => read_sparse(&mut reader)?,
    };
    restrict(matrix, common)
}

fn read_integer(common: &CommonArgs) -> Result<IntMatrix, RecognitionError> {
    let mut reader = open_input(&common.file)?;
    let matrix: IntMatrix = match common.input_format {
        Format::Dense => read_dense(&mut reader)?,
        Format::Sparse => read_sparse(&mut reader)?,
    };
    restrict(matrix, common)
}

fn restrict<T: unimod_common::MatrixValue>(
    matrix: unimod_common::SparseMatrix<T>,
    common: &CommonArgs,
) -> Result<unimod_common::SparseMatrix<T>, RecognitionError> {
    match &common.submatrix {
        Some(file) => {
            let mut reader = open_input(file)?;
            let (submatrix, _, _) = read_submatrix(&mut reader)?;
            Ok(matrix.slice(&submatrix)?)
        }
        None => Ok(matrix),
    }
}

fn time_limit(common: &CommonArgs) -> Option<Duration> {
    common.time_limit.map(Duration::from_secs_f64)
}

fn print_stats(stats: &DecompositionStats) {
    match serde_json::to_string(stats) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("cannot serialize statistics: {error}"),
    }
}

fn run(cli: Cli) -> Result<(), RecognitionError> {
    match cli.command {
        Commands::Tu { common, certificates } => {
            let matrix = read_ternary(&common)?;
            let mut stats = DecompositionStats::default();
            let result = test_tu(
                &matrix,
                certificates.certificates,
                time_limit(&common),
                common.stats.then_some(&mut stats),
            )?;
            if common.stats {
                print_stats(&stats);
            }
            match result {
                TuResult::Yes { decomposition } => {
                    println!(
                        "The {}x{} matrix is totally unimodular.",
                        matrix.num_rows(),
                        matrix.num_columns()
                    );
                    if let Some(tree) = decomposition {
                        println!("Decomposition tree with {} nodes.", tree.nodes.len());
                    }
                }
                TuResult::No { violator } => {
                    println!(
                        "The {}x{} matrix is not totally unimodular.",
                        matrix.num_rows(),
                        matrix.num_columns()
                    );
                    if let Some(file) = &certificates.violator_file {
                        let mut writer = open_output(file)?;
                        write_submatrix(&violator, matrix.num_rows(), matrix.num_columns(), &mut writer)
                            .map_err(io_error)?;
                    } else if certificates.certificates {
                        let mut writer = open_output("-")?;
                        write_submatrix(&violator, matrix.num_rows(), matrix.num_columns(), &mut writer)
                            .map_err(io_error)?;
                    }
                }
            }
        }
        Commands::Regular { common, certificates } => {
            let matrix = read_ternary(&common)?;
            let mut stats = DecompositionStats::default();
            let result = test_regular_binary(
                &matrix,
                certificates,
                time_limit(&common),
                common.stats.then_some(&mut stats),
            )?;
            if common.stats {
                print_stats(&stats);
            }
            println!(
                "The {}x{} matrix is {}regular.",
                matrix.num_rows(),
                matrix.num_columns(),
                if result.regular { "" } else { "NOT " }
            );
        }
        Commands::Network {
            common,
            certificates,
            transposed,
        } => {
            let matrix = read_ternary(&common)?;
            let mut stats = DecompositionStats::default();
            let result = if transposed {
                test_conetwork(&matrix, time_limit(&common), common.stats.then_some(&mut stats))?
            } else {
                test_network(&matrix, time_limit(&common), common.stats.then_some(&mut stats))?
            };
            if common.stats {
                print_stats(&stats);
            }
            match result {
                NetworkResult::Yes {
                    realization,
                    arcs_reversed,
                } => {
                    println!(
                        "The {}x{} matrix is a {}network matrix.",
                        matrix.num_rows(),
                        matrix.num_columns(),
                        if transposed { "co" } else { "" }
                    );
                    if let Some(file) = &certificates.graph_file {
                        let mut writer = open_output(file)?;
                        write_edge_list(&realization.graph, &edge_elements(&realization), &mut writer)
                            .map_err(io_error)?;
                    } else if certificates.certificates {
                        let mut writer = open_output("-")?;
                        write_edge_list(&realization.graph, &edge_elements(&realization), &mut writer)
                            .map_err(io_error)?;
                    }
                    if let Some(file) = &certificates.tree_file {
                        let mut writer = open_output(file)?;
                        let elements = edge_elements(&realization);
                        for &edge in realization.forest_edges.iter() {
                            writeln!(
                                writer,
                                "v{} v{} {}",
                                realization.graph.edge_u(edge),
                                realization.graph.edge_v(edge),
                                elements[edge]
                            )
                            .map_err(io_error)?;
                        }
                    }
                    if let Some(file) = &certificates.dot_file {
                        let mut writer = open_output(file)?;
                        write_dot_digraph(&realization, &arcs_reversed, &mut writer).map_err(io_error)?;
                    }
                }
                NetworkResult::No { violator } => {
                    println!(
                        "The {}x{} matrix is NOT a {}network matrix.",
                        matrix.num_rows(),
                        matrix.num_columns(),
                        if transposed { "co" } else { "" }
                    );
                    if let Some(violator) = violator {
                        if let Some(file) = &certificates.violator_file {
                            let mut writer = open_output(file)?;
                            write_submatrix(&violator, matrix.num_rows(), matrix.num_columns(), &mut writer)
                                .map_err(io_error)?;
                        } else if certificates.certificates {
                            let mut writer = open_output("-")?;
                            write_submatrix(&violator, matrix.num_rows(), matrix.num_columns(), &mut writer)
                                .map_err(io_error)?;
                        }
                    }
                }
            }
        }
        Commands::Graphic {
            common,
            certificates,
            transposed,
        } => {
            use unimod_decomp::{decompose, DecompositionParams};
            use unimod_tu::network::assemble_realization;
            let mut matrix = read_ternary(&common)?;
            if let Err((row, column)) = matrix.is_binary() {
                return Err(RecognitionError::Matrix(MatrixError::invalid(format!(
                    "entry at ({},{}) is not in {{0,1}}",
                    row + 1,
                    column + 1
                ))));
            }
            if transposed {
                matrix = matrix.transpose();
            }
            let params = DecompositionParams {
                stop_when_nongraphic: true,
                time_limit: time_limit(&common),
                ..DecompositionParams::default()
            };
            let mut stats = DecompositionStats::default();
            let tree = decompose(&matrix, false, &params, common.stats.then_some(&mut stats))?;
            if common.stats {
                print_stats(&stats);
            }
            let graphic = tree.root_node().graphicness == Some(true);
            println!(
                "The {}x{} matrix is {}{}graphic.",
                matrix.num_rows(),
                matrix.num_columns(),
                if graphic { "" } else { "NOT " },
                if transposed { "co" } else { "" }
            );
            if graphic {
                if let Some(realization) = assemble_realization(&tree, tree.root) {
                    if let Some(file) = &certificates.graph_file {
                        let mut writer = open_output(file)?;
                        write_edge_list(&realization.graph, &edge_elements(&realization), &mut writer)
                            .map_err(io_error)?;
                    }
                    if let Some(file) = &certificates.tree_file {
                        let mut writer = open_output(file)?;
                        let elements = edge_elements(&realization);
                        for &edge in realization.forest_edges.iter() {
                            writeln!(
                                writer,
                                "v{} v{} {}",
                                realization.graph.edge_u(edge),
                                realization.graph.edge_v(edge),
                                elements[edge]
                            )
                            .map_err(io_error)?;
                        }
                    }
                    if let Some(file) = &certificates.dot_file {
                        let mut writer = open_output(file)?;
                        write_dot(
                            &realization.graph,
                            &edge_elements(&realization),
                            &realization.forest_edges,
                            &mut writer,
                        )
                        .map_err(io_error)?;
                    }
                }
            }
        }
        Commands::Unimodular { common, strong } => {
            let matrix = read_integer(&common)?;
            let result = if strong {
                test_strongly_unimodular(&matrix, time_limit(&common))?
            } else {
                test_unimodular(&matrix, time_limit(&common))?
            };
            println!(
                "The {}x{} matrix is {}{}unimodular.",
                matrix.num_rows(),
                matrix.num_columns(),
                if result { "" } else { "NOT " },
                if strong { "strongly " } else { "" }
            );
        }
        Commands::KModular { common, strong } => {
            let matrix = read_integer(&common)?;
            let result = if strong {
                test_strongly_k_modular(&matrix, time_limit(&common))?
            } else {
                test_k_modular(&matrix, time_limit(&common))?
            };
            match result {
                Some(k) => println!(
                    "The {}x{} matrix is {}{k}-modular.",
                    matrix.num_rows(),
                    matrix.num_columns(),
                    if strong { "strongly " } else { "" }
                ),
                None => println!(
                    "The {}x{} matrix is not k-modular for any k.",
                    matrix.num_rows(),
                    matrix.num_columns()
                ),
            }
        }
        Commands::ComplementTu { common } => {
            let matrix = read_ternary(&common)?;
            match test_complement_tu(&matrix, time_limit(&common))? {
                CtuResult::Yes => println!(
                    "The {}x{} matrix is complement totally unimodular.",
                    matrix.num_rows(),
                    matrix.num_columns()
                ),
                CtuResult::No {
                    complement_row,
                    complement_column,
                } => println!(
                    "The {}x{} matrix is NOT complement totally unimodular; complementing row {} and column {} fails.",
                    matrix.num_rows(),
                    matrix.num_columns(),
                    complement_row.map_or("none".to_string(), |row| (row + 1).to_string()),
                    complement_column.map_or("none".to_string(), |column| (column + 1).to_string())
                ),
            }
        }
        Commands::Matrix {
            common,
            output,
            output_format,
            transpose,
            support,
            signed_support,
            random_binary_pivots,
            random_ternary_pivots,
            randomize,
        } => {
            use rand::rngs::StdRng;
            use rand::SeedableRng;
            let mut matrix = read_ternary(&common)?;
            let mut rng = StdRng::seed_from_u64(parse_seed());
            if let Some(count) = random_binary_pivots {
                matrix = unimod_common::random::random_binary_pivots(&matrix, count, &mut rng)?;
            }
            if let Some(count) = random_ternary_pivots {
                matrix = unimod_common::random::random_ternary_pivots(&matrix, count, &mut rng)?;
            }
            if randomize {
                matrix = unimod_common::random::random_permutation(&matrix, &mut rng);
            }
            if transpose {
                matrix = matrix.transpose();
            }
            if support {
                matrix = matrix.support();
            } else if signed_support {
                matrix = matrix.signed_support();
            }
            let mut writer = open_output(&output)?;
            match output_format {
                Format::Dense => write_dense(&matrix, &mut writer).map_err(io_error)?,
                Format::Sparse => write_sparse(&matrix, &mut writer).map_err(io_error)?,
            }
        }
    }
    Ok(())
}

fn io_error(error: io::Error) -> RecognitionError {
    RecognitionError::Matrix(MatrixError::invalid(format!("cannot write output: {error}")))
}

fn main() {
    // By default log INFO.
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
    info!("unimod starting");

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => {}
        Err(RecognitionError::Matrix(MatrixError::InvalidInput { message })) => {
            println!("Input error: {message}");
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(2);
        }
    }
}
