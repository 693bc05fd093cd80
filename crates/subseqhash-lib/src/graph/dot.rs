//! Dot-format graph emission
//!
//! Mechanical rendering of the graph: one `n<id>` statement per node, one
//! edge per (source, destination) pair labeled with how many read
//! adjacencies it aggregates, and a synthetic `st<read>`/`ed<read>` pair
//! bracketing every recorded read path.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::SeedGraph;

impl SeedGraph {
    /// Write the graph in dot format to `path`; `k` is the seed length used
    /// to decode node labels.
    pub fn save_dot<P: AsRef<Path>>(&self, path: P, k: usize) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_dot(&mut writer, k)?;
        writer.flush()
    }

    /// Write the graph in dot format to an arbitrary sink.
    pub fn write_dot<W: Write>(&self, writer: &mut W, k: usize) -> io::Result<()> {
        writeln!(writer, "digraph{{")?;

        for (key, node) in self.iter_nodes() {
            writeln!(writer, "n{} [label=\"{}\"];", node.id, key.decode(k))?;
        }

        for (_, node) in self.iter_nodes() {
            // Aggregate parallel read adjacencies by destination.
            let mut edge_counts: BTreeMap<u64, u64> = BTreeMap::new();
            for adj in node.locations.values() {
                if let Some(next) = adj.next {
                    *edge_counts.entry(self.node(next).id).or_insert(0) += 1;
                }
            }
            for (dest, count) in edge_counts {
                writeln!(writer, "n{} -> n{} [label={}];", node.id, dest, count)?;
            }
        }

        for path in self.paths() {
            let (Some(head), Some(tail)) = (path.head, path.tail) else {
                continue;
            };
            writeln!(writer, "st{} [label=\"read {} head\"];", path.read_id, path.read_id)?;
            writeln!(writer, "ed{} [label=\"read {} tail\"];", path.read_id, path.read_id)?;
            writeln!(writer, "st{} -> n{};", path.read_id, self.node(head).id)?;
            writeln!(writer, "n{} -> ed{};", self.node(tail).id, path.read_id)?;
        }

        writeln!(writer, "}}")
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::SeedGraph;
    use crate::kmer::Kmer;
    use crate::seeds::Seed;

    fn seed(s: &str, pos: u32) -> Seed {
        Seed {
            value: Kmer::from_string(s).unwrap(),
            pos,
            span: 1,
        }
    }

    #[test]
    fn test_dot_output_shape() {
        let mut g = SeedGraph::new();
        g.insert_read_seeds(1, &[seed("AAA", 0), seed("CCC", 4)]);
        g.insert_read_seeds(2, &[seed("AAA", 2), seed("CCC", 9)]);

        let mut out = Vec::new();
        g.write_dot(&mut out, 3).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("digraph{\n"));
        assert!(text.ends_with("}\n"));
        assert!(text.contains("[label=\"AAA\"];"));
        assert!(text.contains("[label=\"CCC\"];"));
        // Both reads traverse AAA -> CCC, aggregated into one labeled edge.
        let a_id = g.node(g.get_node(&Kmer::from_string("AAA").unwrap()).unwrap()).id;
        let c_id = g.node(g.get_node(&Kmer::from_string("CCC").unwrap()).unwrap()).id;
        assert!(text.contains(&format!("n{} -> n{} [label=2];", a_id, c_id)));
        // Path brackets for both reads.
        for read in [1, 2] {
            assert!(text.contains(&format!("st{} -> n{};", read, a_id)));
            assert!(text.contains(&format!("n{} -> ed{};", c_id, read)));
        }
    }

    #[test]
    fn test_dot_skips_dissolved_paths() {
        let mut g = SeedGraph::new();
        g.insert_read_seeds(1, &[seed("AAA", 0)]);
        g.remove_unique_seeds();

        let mut out = Vec::new();
        g.write_dot(&mut out, 3).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("st1"));
        assert_eq!(text, "digraph{\n}\n");
    }
}
