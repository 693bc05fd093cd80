// FracSubseqHash: subsequence seeds and the multi-read seed graph
//
// A Rust implementation of FracSubseqHash seed selection over sequencing
// reads, and of the seed graph that encodes which seeds co-occur on which
// reads and in what order.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod constants;
pub mod dp;
pub mod encoding;
pub mod graph;
pub mod kmer;
pub mod overlap;
pub mod pipeline;
pub mod rand_table;
pub mod reads;
pub mod seed_files;
pub mod seeds;

// Re-export common types at crate root
pub use dp::{DpCell, DpTable};
pub use graph::{Adjacency, GraphError, Locus, Node, NodeId, ReadPath, SeedGraph};
pub use kmer::Kmer;
pub use overlap::OverlapTable;
pub use pipeline::{run_read_pipeline, ReadJob, SeedParams};
pub use rand_table::{RandCell, RandTable, TableError};
pub use seed_files::{Occurrence, SeedFileError};
pub use seeds::{extract_seeds, scan_read, Seed};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
