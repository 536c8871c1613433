//! Graphviz rendering of a suffix tree, for diagnostics.
//!
//! Emits a strict digraph: the root in bold, every edge label decomposed
//! into per-symbol sub-edges (a chain of one-glyph edges through
//! intermediate point nodes, so the label reads as a concatenation along
//! the chain), suffix links as dashed red edges, and plaintext annotation
//! nodes marking the engine's tracked position and pending suffix-link
//! node. Intended for small trees; a million-node dot file helps nobody.

use std::io::{self, Write};

use crate::alphabet::Alphabet;
use crate::node::NodeId;
use crate::tree::SuffixTree;

impl<A: Alphabet> SuffixTree<A> {
    /// Write the tree as Graphviz dot.
    ///
    /// ```rust
    /// use seqtree::{Nucleotides, SuffixTree};
    ///
    /// let mut tree = SuffixTree::new(Nucleotides);
    /// tree.append(b"TAA").unwrap();
    /// tree.terminate().unwrap();
    ///
    /// let mut out = Vec::new();
    /// tree.dot(&mut out).unwrap();
    /// assert!(String::from_utf8(out).unwrap().contains("strict digraph"));
    /// ```
    pub fn dot<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "strict digraph suffix_tree {{")?;
        writeln!(writer, "    {} [label=\"root\", style=bold];", NodeId::ROOT)?;

        let phase = self.text().len().saturating_sub(1);

        for (id, node) in self.nodes() {
            let Some(parent) = node.parent() else {
                continue;
            };

            if let Some(string_start) = node.string_start() {
                writeln!(writer, "    {id} [label=\"{id}\\nsuffix {string_start}\", shape=box];")?;
            } else {
                writeln!(writer, "    {id} [label=\"{id}\"];")?;
            }

            // One sub-edge per label symbol: a multi-symbol edge becomes a
            // chain of one-glyph edges through point nodes, ending at the
            // child itself.
            let start = node.edge_start() as usize;
            let length = node.edge_length(phase);
            let mut from = parent.to_string();
            for (offset, &symbol) in self.text()[start..start + length].iter().enumerate() {
                let to = if offset + 1 == length {
                    id.to_string()
                } else {
                    let point = format!("{id}_{offset}");
                    writeln!(writer, "    {point} [shape=point];")?;
                    point
                };
                writeln!(
                    writer,
                    "    {from} -> {to} [label=\"{}\"];",
                    self.alphabet().glyph(symbol)
                )?;
                from = to;
            }

            if let Some(link) = node.suffix_link() {
                writeln!(writer, "    {id} -> {link} [style=dashed, color=red, constraint=false];")?;
            }
        }

        self.dot_annotations(writer)?;
        writeln!(writer, "}}")
    }

    /// Annotation nodes for the construction registers. No consistency
    /// guarantee mid-construction beyond what a single-threaded caller sees.
    fn dot_annotations<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let (last_end, last_end_offset) = self.tracked_end();
        writeln!(
            writer,
            "    tracked_end [label=\"end +{last_end_offset}\", shape=plaintext];"
        )?;
        writeln!(writer, "    tracked_end -> {last_end} [style=dotted];")?;

        if let Some(pending) = self.pending_internal_node() {
            writeln!(writer, "    pending_link [label=\"pending link\", shape=plaintext];")?;
            writeln!(writer, "    pending_link -> {pending} [style=dotted];")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::alphabet::Nucleotides;
    use crate::tree::SuffixTree;

    fn render(input: &[u8], terminate: bool) -> String {
        let mut tree = SuffixTree::new(Nucleotides);
        tree.append(input).unwrap();
        if terminate {
            tree.terminate().unwrap();
        }
        let mut out = Vec::new();
        tree.dot(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_root_and_edges() {
        let dot = render(b"TAA", true);
        assert!(dot.starts_with("strict digraph suffix_tree {"));
        assert!(dot.contains("n0 [label=\"root\", style=bold];"));
        // Single-symbol labels sit on one edge straight to the child.
        assert!(dot.contains("[label=\"$\"]"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn multi_symbol_labels_become_sub_edge_chains() {
        let dot = render(b"TAA", true);
        // The "TAA$" leaf edge is four one-glyph sub-edges through point
        // nodes, never one edge with the whole string.
        assert!(!dot.contains("label=\"TAA$\""));
        assert!(dot.contains("[shape=point];"));
        assert!(dot.contains("n0 -> n1_0 [label=\"T\"];"));
        assert!(dot.contains("n1_0 -> n1_1 [label=\"A\"];"));
        assert!(dot.contains("n1_1 -> n1_2 [label=\"A\"];"));
        assert!(dot.contains("n1_2 -> n1 [label=\"$\"];"));
    }

    #[test]
    fn renders_suffix_links_dashed_red() {
        let dot = render(b"TAATAA", true);
        assert!(dot.contains("style=dashed, color=red"));
    }

    #[test]
    fn annotates_the_tracked_end() {
        let dot = render(b"TAA", false);
        assert!(dot.contains("tracked_end"));
    }
}
