//! Binary graph format
//!
//! All integers are little-endian u64 unless noted.
//!
//! ```text
//! num_nodes
//! per node, in key order:
//!   key (16 bytes, u128 LE) | id | read_count | num_locations
//!   per locus: read_id | pos | prev_id | next_id
//! per read path with a non-null head, until end of file:
//!   read_id | head_id | tail_id
//! ```
//!
//! Node serial ids are the stable references: `id = 0` encodes a null
//! neighbor or endpoint. The loader materializes every node first, stashing
//! raw neighbor ids, then resolves them through an id dictionary in a
//! second pass.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use ahash::AHashMap;
use thiserror::Error;

use super::{Adjacency, Locus, Node, NodeId, ReadPath, SeedGraph};
use crate::kmer::Kmer;

/// Errors from graph persistence
#[derive(Error, Debug)]
pub enum GraphError {
    /// An underlying I/O failure
    #[error("error accessing graph file: {0}")]
    Io(#[from] io::Error),
    /// The file contents are structurally invalid
    #[error("corrupt graph file: {0}")]
    Corrupt(String),
}

#[inline]
fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[inline]
fn read_kmer<R: Read>(reader: &mut R) -> io::Result<Kmer> {
    let mut buf = [0u8; 16];
    reader.read_exact(&mut buf)?;
    Ok(Kmer::from_le_bytes(buf))
}

/// Read exactly 8 bytes unless the stream is at a clean end.
///
/// `Ok(None)` on immediate end of file; an error if the stream ends inside
/// the word.
fn try_read_u64<R: Read>(reader: &mut R) -> Result<Option<u64>, GraphError> {
    let mut buf = [0u8; 8];
    let mut filled = 0usize;
    while filled < 8 {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(GraphError::Corrupt(
                    "file ended inside a read-path record".to_string(),
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(GraphError::Io(e)),
        }
    }
    Ok(Some(u64::from_le_bytes(buf)))
}

fn node_truncation(e: io::Error, num_nodes: u64) -> GraphError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        GraphError::Corrupt(format!(
            "file ended before the declared {} nodes",
            num_nodes
        ))
    } else {
        GraphError::Io(e)
    }
}

fn resolve(dict: &AHashMap<u64, NodeId>, code: u64) -> Result<Option<NodeId>, GraphError> {
    if code == 0 {
        return Ok(None);
    }
    dict.get(&code).copied().map(Some).ok_or_else(|| {
        GraphError::Corrupt(format!("reference to unknown node id {}", code))
    })
}

impl SeedGraph {
    /// Serial id of a node reference, with 0 for null.
    fn id_code(&self, id: Option<NodeId>) -> u64 {
        id.map_or(0, |i| self.node(i).id)
    }

    /// Write the graph to `path` in the binary format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the graph to an arbitrary sink.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), GraphError> {
        write_u64(writer, self.num_nodes() as u64)?;

        for (key, node) in self.iter_nodes() {
            writer.write_all(&key.to_le_bytes())?;
            write_u64(writer, node.id)?;
            write_u64(writer, node.read_count)?;
            write_u64(writer, node.locations.len() as u64)?;
            for (locus, adj) in &node.locations {
                write_u64(writer, locus.read_id)?;
                write_u64(writer, locus.pos)?;
                write_u64(writer, self.id_code(adj.prev))?;
                write_u64(writer, self.id_code(adj.next))?;
            }
        }

        for path in self.paths() {
            if path.head.is_none() {
                continue;
            }
            write_u64(writer, path.read_id)?;
            write_u64(writer, self.id_code(path.head))?;
            write_u64(writer, self.id_code(path.tail))?;
        }

        Ok(())
    }

    /// Load a graph from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SeedGraph, GraphError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Read a graph from an arbitrary source.
    ///
    /// # Errors
    /// [`GraphError::Corrupt`] when the declared node count cannot be
    /// satisfied, a node id repeats or is 0, or a neighbor id is absent
    /// from the node set.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<SeedGraph, GraphError> {
        let num_nodes = read_u64(reader)?;

        // Capacity hints come from untrusted input; cap them so a corrupt
        // count fails at the read, not at the allocation.
        let hint = (num_nodes as usize).min(1 << 20);
        let mut graph = SeedGraph::new();
        let mut dict: AHashMap<u64, NodeId> = AHashMap::with_capacity(hint);
        let mut pending: Vec<(NodeId, Vec<(Locus, u64, u64)>)> = Vec::with_capacity(hint);

        // First pass: materialize nodes with raw neighbor ids.
        for _ in 0..num_nodes {
            let key = read_kmer(reader).map_err(|e| node_truncation(e, num_nodes))?;
            let id = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
            let read_count = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
            let num_locations = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;

            if id == 0 {
                return Err(GraphError::Corrupt(
                    "node id 0 is reserved for null references".to_string(),
                ));
            }

            let mut loci = Vec::with_capacity((num_locations as usize).min(1 << 20));
            for _ in 0..num_locations {
                let read_id = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
                let pos = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
                let prev_id = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
                let next_id = read_u64(reader).map_err(|e| node_truncation(e, num_nodes))?;
                loci.push((Locus { read_id, pos }, prev_id, next_id));
            }

            let node_id = graph.arena.len();
            if graph.keys.insert(key, node_id).is_some() {
                return Err(GraphError::Corrupt(format!(
                    "duplicate node key {}",
                    key.bits()
                )));
            }
            if dict.insert(id, node_id).is_some() {
                return Err(GraphError::Corrupt(format!("duplicate node id {}", id)));
            }
            graph.arena.push(Some(Node {
                key,
                id,
                read_count,
                locations: std::collections::BTreeMap::new(),
            }));
            pending.push((node_id, loci));
        }

        // Second pass: resolve neighbor ids through the dictionary.
        for (node_id, loci) in pending {
            let mut locations = std::collections::BTreeMap::new();
            for (locus, prev_id, next_id) in loci {
                locations.insert(
                    locus,
                    Adjacency {
                        prev: resolve(&dict, prev_id)?,
                        next: resolve(&dict, next_id)?,
                    },
                );
            }
            graph.node_mut(node_id).locations = locations;
        }

        // Read-path records run to the end of the file.
        while let Some(read_id) = try_read_u64(reader)? {
            let head_id = try_read_u64(reader)?.ok_or_else(|| {
                GraphError::Corrupt("file ended inside a read-path record".to_string())
            })?;
            let tail_id = try_read_u64(reader)?.ok_or_else(|| {
                GraphError::Corrupt("file ended inside a read-path record".to_string())
            })?;
            graph.paths.push(ReadPath {
                read_id,
                head: resolve(&dict, head_id)?,
                tail: resolve(&dict, tail_id)?,
            });
        }

        Ok(graph)
    }
}
