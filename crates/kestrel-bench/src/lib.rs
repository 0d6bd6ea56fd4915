//! Workloads for benchmarking the Kestrel collect-all machinery.
//!
//! - [`small_solutions`]: many tiny atomic solutions
//! - [`wide_solutions`]: fewer solutions with sizeable compound terms

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use kestrel_test_utils::Term;

/// `n` integer solutions.
pub fn small_solutions(n: usize) -> Vec<Term> {
    (0..n as i64).map(Term::Int).collect()
}

/// `n` solutions of the form `row(I, [a0, ..., a{width-1}])`.
pub fn wide_solutions(n: usize, width: usize) -> Vec<Term> {
    let row: Vec<Term> = (0..width).map(|i| Term::atom(&format!("a{i}"))).collect();
    (0..n as i64)
        .map(|i| Term::compound("row", vec![Term::Int(i), Term::list(row.clone())]))
        .collect()
}
