use {
    crate::util::Parse,
    nom::{
        bytes::complete::tag,
        character::complete::digit1,
        combinator::{all_consuming, map_res},
        error::Error,
        Err, IResult,
    },
    static_assertions::const_assert,
    std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        mem::transmute,
        ops::Add,
        str::FromStr,
    },
    strum::{EnumCount, EnumIter, IntoEnumIterator},
};

/// Handle to a node in a `SnailfishNumber` arena
///
/// All-ones is the invalid sentinel, used both for "no parent" on the root node and for the
/// default value.
#[derive(Clone, Copy, Eq, PartialEq)]
pub(crate) struct NodeIndex(u32);

impl NodeIndex {
    pub(crate) const INVALID: Self = Self(u32::MAX);

    fn new(index: usize) -> Self {
        // `u32::MAX` itself is the invalid sentinel, so it is not a usable slot
        debug_assert!(index < u32::MAX as usize);

        Self(index as u32)
    }

    fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    fn get(self) -> usize {
        assert!(self.is_valid());

        self.0 as usize
    }

    fn opt(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }
}

impl Debug for NodeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_valid() {
            f.write_fmt(format_args!("{:?}", self.0))
        } else {
            f.write_str("<invalid>")
        }
    }
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Which branch of its parent pair a node hangs off of
#[derive(Copy, Clone, Debug, EnumCount, EnumIter, PartialEq)]
#[repr(u8)]
pub enum ChildPosition {
    Left,
    Right,
}

// This guarantees we can safely convert from `u8` to `ChildPosition` by masking the smallest bit,
// which is the same as masking by `U8_MASK`
const_assert!(ChildPosition::COUNT == 2_usize);

impl ChildPosition {
    const U8_MASK: u8 = Self::COUNT as u8 - 1_u8;

    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        // SAFETY: See `const_assert` above
        unsafe { transmute(value & Self::U8_MASK) }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        Self::from_u8(self as u8 + 1_u8)
    }
}

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    Leaf(u32),
    Pair { left: NodeIndex, right: NodeIndex },
}

#[derive(Clone, Copy, Debug)]
struct Node {
    kind: NodeKind,
    parent: NodeIndex,
    position: ChildPosition,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: NodeIndex::INVALID,
            position: ChildPosition::Left,
        }
    }
}

/// A snailfish number: a binary tree whose leaves are small unsigned integers
///
/// The arena owns every node, live or vacant; child-to-parent back-references are arena handles,
/// so cloning the arena clones a fully self-consistent tree. `Default` is the empty number, the
/// identity of `Add`.
#[derive(Clone, Default)]
pub struct SnailfishNumber {
    nodes: Vec<Node>,
    vacant: Vec<NodeIndex>,
    root: NodeIndex,
}

impl SnailfishNumber {
    const EXPLODE_DEPTH_THRESHOLD: usize = 4_usize;
    const SPLIT_LEAF_THRESHOLD: u32 = 10_u32;

    pub fn is_empty(&self) -> bool {
        !self.root.is_valid()
    }

    pub fn magnitude(&self) -> u64 {
        self.root
            .opt()
            .map_or(0_u64, |root: NodeIndex| self.magnitude_at(root))
    }

    /// Runs explode-then-split rounds until neither rule makes progress
    ///
    /// Explode is re-attempted after every successful split, since a split can push a pair past
    /// the depth threshold.
    pub fn reduce(&mut self) {
        while self.try_explode() || self.try_split() {}
    }

    /// Explodes the leftmost pair of leaves nested inside four pairs, if any, returning whether an
    /// explosion occurred
    ///
    /// The exploding pair's values are added to the nearest leaves to its left and right in tree
    /// order, and the pair itself becomes a zero leaf in the slot it occupied.
    pub fn try_explode(&mut self) -> bool {
        self.root
            .opt()
            .and_then(|root: NodeIndex| self.try_find_pair_to_explode(root, 0_usize))
            .map(|index: NodeIndex| {
                self.explode(index);

                true
            })
            .unwrap_or_default()
    }

    /// Splits the leftmost leaf of value 10 or greater, if any, returning whether a split occurred
    pub fn try_split(&mut self) -> bool {
        self.root
            .opt()
            .and_then(|root: NodeIndex| self.try_find_leaf_to_split(root))
            .map(|index: NodeIndex| {
                let value: u32 = self.leaf_value(index);
                let left: NodeIndex = self.alloc(NodeKind::Leaf(value / 2_u32));
                let right: NodeIndex = self.alloc(NodeKind::Leaf(value - value / 2_u32));

                self.node_mut(index).kind = NodeKind::Pair { left, right };
                self.link(index, left, ChildPosition::Left);
                self.link(index, right, ChildPosition::Right);

                true
            })
            .unwrap_or_default()
    }

    fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.get()]
    }

    fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.get()]
    }

    fn is_leaf(&self, index: NodeIndex) -> bool {
        matches!(self.node(index).kind, NodeKind::Leaf(_))
    }

    fn leaf_value(&self, index: NodeIndex) -> u32 {
        match self.node(index).kind {
            NodeKind::Leaf(value) => value,
            NodeKind::Pair { .. } => panic!("node {index:?} is not a leaf"),
        }
    }

    fn leaf_value_mut(&mut self, index: NodeIndex) -> &mut u32 {
        match &mut self.node_mut(index).kind {
            NodeKind::Leaf(value) => value,
            NodeKind::Pair { .. } => panic!("node {index:?} is not a leaf"),
        }
    }

    fn pair_child(&self, index: NodeIndex, position: ChildPosition) -> NodeIndex {
        match self.node(index).kind {
            NodeKind::Pair { left, right } => match position {
                ChildPosition::Left => left,
                ChildPosition::Right => right,
            },
            NodeKind::Leaf(_) => panic!("node {index:?} is not a pair"),
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeIndex {
        let node: Node = Node::new(kind);

        match self.vacant.pop() {
            Some(index) => {
                self.nodes[index.get()] = node;

                index
            }
            None => {
                let index: NodeIndex = NodeIndex::new(self.nodes.len());

                self.nodes.push(node);

                index
            }
        }
    }

    fn free(&mut self, index: NodeIndex) {
        self.vacant.push(index);
    }

    fn link(&mut self, parent: NodeIndex, child: NodeIndex, position: ChildPosition) {
        let node: &mut Node = self.node_mut(child);

        node.parent = parent;
        node.position = position;
    }

    fn try_find_pair_to_explode(&self, index: NodeIndex, depth: usize) -> Option<NodeIndex> {
        match self.node(index).kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Pair { left, right } => {
                if depth >= Self::EXPLODE_DEPTH_THRESHOLD
                    && self.is_leaf(left)
                    && self.is_leaf(right)
                {
                    Some(index)
                } else {
                    self.try_find_pair_to_explode(left, depth + 1_usize)
                        .or_else(|| self.try_find_pair_to_explode(right, depth + 1_usize))
                }
            }
        }
    }

    fn try_find_leaf_to_split(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.node(index).kind {
            NodeKind::Leaf(value) if value >= Self::SPLIT_LEAF_THRESHOLD => Some(index),
            NodeKind::Leaf(_) => None,
            NodeKind::Pair { left, right } => self
                .try_find_leaf_to_split(left)
                .or_else(|| self.try_find_leaf_to_split(right)),
        }
    }

    /// Finds the nearest leaf strictly to the `position` side of `index` in tree order
    ///
    /// `None` means `index` sits on the outermost `position` edge of the whole number.
    fn try_find_adjacent_leaf(
        &self,
        index: NodeIndex,
        position: ChildPosition,
    ) -> Option<NodeIndex> {
        let mut curr: NodeIndex = index;

        // Ascend until an ancestor is entered from the side opposite `position`, then cross over
        // into the sibling subtree
        loop {
            let node: &Node = self.node(curr);
            let parent: NodeIndex = node.parent.opt()?;

            if node.position == position {
                curr = parent;
            } else {
                curr = self.pair_child(parent, position);

                break;
            }
        }

        // Descend along the near edge until a leaf is reached
        while !self.is_leaf(curr) {
            curr = self.pair_child(curr, position.opposite());
        }

        Some(curr)
    }

    fn explode(&mut self, index: NodeIndex) {
        let (left, right): (NodeIndex, NodeIndex) = match self.node(index).kind {
            NodeKind::Pair { left, right } => (left, right),
            NodeKind::Leaf(_) => panic!("node {index:?} is not a pair"),
        };

        for position in ChildPosition::iter() {
            let child: NodeIndex = match position {
                ChildPosition::Left => left,
                ChildPosition::Right => right,
            };
            let value: u32 = self.leaf_value(child);

            if let Some(adjacent_leaf) = self.try_find_adjacent_leaf(child, position) {
                *self.leaf_value_mut(adjacent_leaf) += value;
            }
        }

        self.free(left);
        self.free(right);
        self.node_mut(index).kind = NodeKind::Leaf(0_u32);
    }

    fn magnitude_at(&self, index: NodeIndex) -> u64 {
        match self.node(index).kind {
            NodeKind::Leaf(value) => value as u64,
            NodeKind::Pair { left, right } => {
                3_u64 * self.magnitude_at(left) + 2_u64 * self.magnitude_at(right)
            }
        }
    }

    /// Moves every node of `other` into this arena, returning the handle of its root
    ///
    /// Handles are offset in bulk, so the grafted subtree keeps its internal back-references; only
    /// its root is left unparented, for the caller to link.
    fn graft(&mut self, mut other: Self) -> NodeIndex {
        let offset: usize = self.nodes.len();
        let offset_index = |index: NodeIndex| -> NodeIndex {
            if index.is_valid() {
                NodeIndex::new(index.get() + offset)
            } else {
                index
            }
        };

        for node in other.nodes.iter_mut() {
            node.parent = offset_index(node.parent);

            if let NodeKind::Pair { left, right } = &mut node.kind {
                *left = offset_index(*left);
                *right = offset_index(*right);
            }
        }

        let root: NodeIndex = offset_index(other.root);

        self.nodes.append(&mut other.nodes);
        self.vacant.extend(other.vacant.into_iter().map(offset_index));

        root
    }

    fn parse_leaf<'i>(&mut self, input: &'i str) -> IResult<&'i str, NodeIndex> {
        let (input, value): (&str, u32) = map_res(digit1, u32::from_str)(input)?;

        Ok((input, self.alloc(NodeKind::Leaf(value))))
    }

    fn parse_pair<'i>(&mut self, input: &'i str) -> IResult<&'i str, NodeIndex> {
        let (input, _) = tag("[")(input)?;
        let (input, left): (&str, NodeIndex) = self.parse_element(input)?;
        let (input, _) = tag(",")(input)?;
        let (input, right): (&str, NodeIndex) = self.parse_element(input)?;
        let (input, _) = tag("]")(input)?;

        let pair: NodeIndex = self.alloc(NodeKind::Pair { left, right });

        self.link(pair, left, ChildPosition::Left);
        self.link(pair, right, ChildPosition::Right);

        Ok((input, pair))
    }

    fn parse_element<'i>(&mut self, input: &'i str) -> IResult<&'i str, NodeIndex> {
        match self.parse_leaf(input) {
            Err(Err::Error(_)) => self.parse_pair(input),
            result => result,
        }
    }

    fn eq_at(&self, index: NodeIndex, other: &Self, other_index: NodeIndex) -> bool {
        match (self.node(index).kind, other.node(other_index).kind) {
            (NodeKind::Leaf(value), NodeKind::Leaf(other_value)) => value == other_value,
            (
                NodeKind::Pair { left, right },
                NodeKind::Pair {
                    left: other_left,
                    right: other_right,
                },
            ) => self.eq_at(left, other, other_left) && self.eq_at(right, other, other_right),
            _ => false,
        }
    }

    fn fmt_at(&self, index: NodeIndex, f: &mut Formatter<'_>) -> FmtResult {
        match self.node(index).kind {
            NodeKind::Leaf(value) => f.write_fmt(format_args!("{value}")),
            NodeKind::Pair { left, right } => {
                f.write_str("[")?;
                self.fmt_at(left, f)?;
                f.write_str(",")?;
                self.fmt_at(right, f)?;
                f.write_str("]")
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        match self.root.opt() {
            None => assert_eq!(self.nodes.len(), self.vacant.len()),
            Some(root) => {
                assert!(!self.node(root).parent.is_valid());

                let live_nodes: usize = self.assert_consistent_at(root);

                assert_eq!(live_nodes + self.vacant.len(), self.nodes.len());
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent_at(&self, index: NodeIndex) -> usize {
        match self.node(index).kind {
            NodeKind::Leaf(_) => 1_usize,
            NodeKind::Pair { left, right } => {
                for (child, position) in
                    [(left, ChildPosition::Left), (right, ChildPosition::Right)]
                {
                    let child_node: &Node = self.node(child);

                    assert_eq!(child_node.parent, index);
                    assert_eq!(child_node.position, position);
                }

                1_usize + self.assert_consistent_at(left) + self.assert_consistent_at(right)
            }
        }
    }
}

impl Add for SnailfishNumber {
    type Output = Self;

    /// Pairs up the two operands and reduces the result
    ///
    /// The empty number is a two-sided identity; operand order is otherwise significant, since
    /// reduction is not commutative in structure.
    fn add(self, rhs: Self) -> Self::Output {
        if self.is_empty() {
            rhs
        } else if rhs.is_empty() {
            self
        } else {
            let mut sum: Self = self;
            let left: NodeIndex = sum.root;
            let right: NodeIndex = sum.graft(rhs);
            let root: NodeIndex = sum.alloc(NodeKind::Pair { left, right });

            sum.link(root, left, ChildPosition::Left);
            sum.link(root, right, ChildPosition::Right);
            sum.root = root;
            sum.reduce();

            sum
        }
    }
}

impl Debug for SnailfishNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_fmt(format_args!("{self}"))
    }
}

impl Display for SnailfishNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.root.opt() {
            Some(root) => self.fmt_at(root, f),
            None => Ok(()),
        }
    }
}

impl Parse for SnailfishNumber {
    fn parse<'i>(input: &'i str) -> IResult<&'i str, Self> {
        let mut number: Self = Self::default();
        let (input, root): (&str, NodeIndex) = number.parse_pair(input)?;

        number.root = root;

        Ok((input, number))
    }
}

impl PartialEq for SnailfishNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self.root.opt(), other.root.opt()) {
            (None, None) => true,
            (Some(root), Some(other_root)) => self.eq_at(root, other, other_root),
            _ => false,
        }
    }
}

impl<'i> TryFrom<&'i str> for SnailfishNumber {
    type Error = Err<Error<&'i str>>;

    fn try_from(input: &'i str) -> Result<Self, Self::Error> {
        Ok(all_consuming(Self::parse)(input)?.1)
    }
}
