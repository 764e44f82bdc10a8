use std::num::NonZeroU32;

use crate::{
    alphabet::{Symbol, ALPHABET_LEN},
    corpus::EntryId,
};

/// Index of a non-root node. The root is never the child of another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0.get() as usize
    }
}

#[derive(Debug, Clone)]
struct Node {
    children: [Option<NodeId>; ALPHABET_LEN],
    postings: Vec<EntryId>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            children: [None; ALPHABET_LEN],
            postings: Vec::new(),
        }
    }
}

/// Arena-backed trie mapping words to the entries containing them.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<Node>,
}

impl Trie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    fn push_node(&mut self) -> NodeId {
        let index = u32::try_from(self.nodes.len())
            .ok()
            .and_then(NonZeroU32::new)
            .expect("trie nodes cannot exceed u32::MAX");
        self.nodes.push(Node::default());
        NodeId(index)
    }

    /// Appends `entry` to the posting list of `word`, creating the missing nodes.
    pub fn insert(&mut self, word: &[Symbol], entry: EntryId) {
        let mut node = 0;
        for &symbol in word {
            node = match self.nodes[node].children[symbol.index()] {
                Some(child) => child.index(),
                None => {
                    let child = self.push_node();
                    self.nodes[node].children[symbol.index()] = Some(child);
                    child.index()
                }
            };
        }

        self.nodes[node].postings.push(entry);
    }

    /// Entries inserted under `word`, in insertion order.
    pub fn get(&self, word: &[Symbol]) -> &[EntryId] {
        let mut node = &self.nodes[0];
        for &symbol in word {
            match node.children[symbol.index()] {
                Some(child) => node = &self.nodes[child.index()],
                None => return &[],
            }
        }

        &node.postings
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Trie {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::seq;

    #[test]
    fn insert_and_get() {
        let mut trie = Trie::new();
        trie.insert(&seq("AB"), EntryId(0));
        trie.insert(&seq("AB"), EntryId(2));
        trie.insert(&seq("ABC"), EntryId(1));
        trie.insert(&seq("z-"), EntryId(1));

        assert_eq!(trie.get(&seq("AB")), [EntryId(0), EntryId(2)]);
        assert_eq!(trie.get(&seq("ABC")), [EntryId(1)]);
        assert_eq!(trie.get(&seq("z-")), [EntryId(1)]);
        assert!(trie.get(&seq("A")).is_empty());
        assert!(trie.get(&seq("ABCD")).is_empty());
        assert!(trie.get(&seq("B")).is_empty());
    }

    #[test]
    fn shares_prefixes() {
        let mut trie = Trie::default();
        trie.insert(&seq("ABC"), EntryId(0));
        trie.insert(&seq("ABD"), EntryId(0));
        // root, A, B, C, D
        assert_eq!(trie.node_count(), 5);
    }

    #[test]
    fn empty_word_maps_to_root() {
        let mut trie = Trie::new();
        trie.insert(&[], EntryId(3));
        assert_eq!(trie.get(&[]), [EntryId(3)]);
        assert_eq!(trie.node_count(), 1);
    }
}
