//! Tree-structured policy table.
//!
//! Interior nodes split every signal at a pivot, so each has
//! `2^NUM_SIGNALS` children. Lookup picks the child by comparing each signal
//! with the pivot, which makes the table total: every memory, including
//! ones outside any trained region, reaches exactly one leaf.

use super::memory::{Memory, NUM_SIGNALS};
use super::whisker::{MemoryRange, Whisker};
use super::{PolicyError, PolicyTable};

const FANOUT: usize = 1 << NUM_SIGNALS;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(Whisker),
    Split {
        pivot: [f64; NUM_SIGNALS],
        children: Vec<Node>,
    },
}

impl Node {
    fn child_index(pivot: &[f64; NUM_SIGNALS], memory: &Memory) -> usize {
        memory
            .signals()
            .iter()
            .zip(pivot)
            .enumerate()
            .fold(0, |idx, (i, (value, p))| {
                if value >= p {
                    idx | (1 << i)
                } else {
                    idx
                }
            })
    }

    /// Index of the child that owns `memory`, or `None` at a leaf.
    fn next_index(&self, memory: &Memory) -> Option<usize> {
        match self {
            Node::Leaf(_) => None,
            Node::Split { pivot, .. } => Some(Self::child_index(pivot, memory)),
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Whisker>) {
        match self {
            Node::Leaf(whisker) => out.push(whisker),
            Node::Split { children, .. } => children.iter().for_each(|c| c.collect(out)),
        }
    }

    fn collect_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Whisker>) {
        match self {
            Node::Leaf(whisker) => out.push(whisker),
            Node::Split { children, .. } => {
                children.iter_mut().for_each(|c| c.collect_mut(out))
            }
        }
    }
}

/// Policy table mapping a [`Memory`] to the [`Whisker`] that governs it.
///
/// The table is immutable from the point of view of the queue disciplines
/// that consult it; refinement (`split`, `leaf_mut`) happens before it is
/// shared.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiskerTree {
    root: Node,
}

impl Default for WhiskerTree {
    fn default() -> Self {
        Self::new(Whisker::default())
    }
}

impl WhiskerTree {
    /// A table with a single rule covering the whole memory space.
    pub fn new(rule: Whisker) -> Self {
        Self {
            root: Node::Leaf(rule.with_domain(MemoryRange::full())),
        }
    }

    /// Splits the leaf containing `pivot` into `2^NUM_SIGNALS` children.
    ///
    /// Every child starts as a copy of the parent rule restricted to its
    /// sub-range. The pivot must lie strictly inside the leaf's domain on
    /// every signal.
    pub fn split(&mut self, pivot: [f64; NUM_SIGNALS]) -> Result<(), PolicyError> {
        let point = Memory::with_signals(pivot);
        let node = Self::descend_mut(&mut self.root, &point);
        let parent = match &*node {
            Node::Leaf(parent) => parent.clone(),
            Node::Split { .. } => unreachable!("descend_mut always stops at a leaf"),
        };
        let domain = *parent.domain();
        if !domain.strictly_contains(&pivot) {
            return Err(PolicyError::PivotOutsideDomain {
                pivot: pivot.to_vec(),
                domain: domain.to_string(),
            });
        }

        let children = (0..FANOUT)
            .map(|idx| Node::Leaf(parent.clone().with_domain(domain.child(&pivot, idx))))
            .collect();
        tracing::debug!(?pivot, %domain, "Split whisker leaf");
        *node = Node::Split { pivot, children };
        Ok(())
    }

    fn descend_mut<'a>(mut node: &'a mut Node, memory: &Memory) -> &'a mut Node {
        while let Some(idx) = node.next_index(memory) {
            if let Node::Split {
                ref mut children, ..
            } = *node
            {
                node = &mut children[idx];
            }
        }
        node
    }

    /// Mutable access to the rule that governs `memory`.
    pub fn leaf_mut(&mut self, memory: &Memory) -> &mut Whisker {
        match Self::descend_mut(&mut self.root, memory) {
            Node::Leaf(whisker) => whisker,
            Node::Split { .. } => unreachable!("descend_mut always stops at a leaf"),
        }
    }

    /// All rules in depth-first order.
    pub fn leaves(&self) -> Vec<&Whisker> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    /// All rules in depth-first order, for bulk assignment.
    pub fn leaves_mut(&mut self) -> Vec<&mut Whisker> {
        let mut out = Vec::new();
        self.root.collect_mut(&mut out);
        out
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves().len()
    }
}

impl PolicyTable for WhiskerTree {
    fn lookup(&self, memory: &Memory) -> &Whisker {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(whisker) => return whisker,
                Node::Split { pivot, children } => {
                    node = &children[Node::child_index(pivot, memory)];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Signal;

    #[test]
    fn test_single_leaf_answers_everything() {
        let tree = WhiskerTree::new(Whisker::constant(3));
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.lookup(&Memory::new()).window(0), 3);
        assert_eq!(
            tree.lookup(&Memory::with_signals([9.0, 9.0, 9.0])).window(0),
            3
        );
    }

    #[test]
    fn test_split_creates_full_fanout_with_disjoint_domains() {
        let mut tree = WhiskerTree::new(Whisker::constant(10));
        tree.split([0.01, 0.1, 20.0]).unwrap();
        assert_eq!(tree.num_leaves(), FANOUT);

        let points = [
            Memory::new(),
            Memory::with_signals([0.01, 0.0, 0.0]),
            Memory::with_signals([0.5, 0.5, 100.0]),
            Memory::with_signals([0.0, 0.2, 19.9]),
        ];
        for point in &points {
            let owners = tree
                .leaves()
                .iter()
                .filter(|w| w.domain().contains(point))
                .count();
            assert_eq!(owners, 1, "point {point} must belong to exactly one leaf");
            assert!(tree.lookup(point).domain().contains(point));
        }
    }

    #[test]
    fn test_leaf_assignment_drives_lookup() {
        let mut tree = WhiskerTree::new(Whisker::constant(10));
        tree.split([1.0, 1.0, 8.0]).unwrap();

        let congested = Memory::with_signals([0.0, 0.0, 50.0]);
        tree.leaf_mut(&congested).set_transform(-2, 0.5);

        let idle = Memory::new();
        assert_eq!(tree.lookup(&idle).window(40), 10);
        // constant(10) carries bounds [10, 10]; widen before the transform matters
        tree.leaf_mut(&congested).set_bounds(1, 100).unwrap();
        assert_eq!(tree.lookup(&congested).window(40), 18);
        assert!(tree.lookup(&congested).domain().contains(&congested));
    }

    #[test]
    fn test_nested_split() {
        let mut tree = WhiskerTree::default();
        tree.split([1.0, 1.0, 8.0]).unwrap();
        tree.split([0.5, 0.5, 4.0]).unwrap();
        assert_eq!(tree.num_leaves(), 2 * FANOUT - 1);

        let deep = Memory::with_signals([0.6, 0.1, 5.0]);
        let rule = tree.lookup(&deep);
        assert_eq!(rule.domain().lower()[Signal::ArrivalInterval.index()], 0.5);
        assert_eq!(rule.domain().upper()[Signal::QueueOccupancy.index()], 8.0);
    }

    #[test]
    fn test_split_on_boundary_rejected() {
        let mut tree = WhiskerTree::default();
        tree.split([1.0, 1.0, 8.0]).unwrap();

        let err = tree.split([1.0, 2.0, 9.0]).unwrap_err();
        assert!(matches!(err, PolicyError::PivotOutsideDomain { .. }));
        assert!(tree.split([f64::INFINITY, 2.0, 9.0]).is_err());
        assert_eq!(tree.num_leaves(), FANOUT);
    }

    #[test]
    fn test_leaves_mut_keeps_domains() {
        let mut tree = WhiskerTree::default();
        tree.split([1.0, 1.0, 8.0]).unwrap();
        let domains: Vec<_> = tree.leaves().iter().map(|w| *w.domain()).collect();

        for (i, leaf) in tree.leaves_mut().into_iter().enumerate() {
            leaf.set_transform(i as i32, 1.0);
        }

        let after: Vec<_> = tree.leaves().iter().map(|w| *w.domain()).collect();
        assert_eq!(domains, after);
        assert_eq!(tree.leaves()[3].window_increment(), 3);
    }
}
