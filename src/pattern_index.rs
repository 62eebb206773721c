//! Prefix tree over the needle set.
//!
//! Each node owns its children in a vector sorted by character, so a lookup
//! is a binary search. Needles are prefix-exclusive: a needle may never be a
//! strict prefix of another, which means a node either carries a payload or
//! has children, never both.

use std::collections::TryReserveError;

use thiserror::Error;

/// Reasons an insertion into a [`PatternIndex`] can be rejected.
///
/// A rejected insertion leaves the index exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The needle was empty.
    #[error("needle must not be empty")]
    EmptyKey,
    /// The needle equals, extends, or is a prefix of an accepted needle.
    #[error("needle collides with a previously accepted needle")]
    KeyCollision,
    /// Growing a child table failed.
    #[error("out of memory while growing the pattern index")]
    ResourceExhausted,
}

impl From<TryReserveError> for IndexError {
    fn from(_: TryReserveError) -> Self {
        IndexError::ResourceExhausted
    }
}

struct TrieNode<V> {
    /// Sorted by character, unique per character.
    children: Vec<(char, TrieNode<V>)>,
    payload: Option<V>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            payload: None,
        }
    }

    /// `Ok(idx)` if a child for `ch` exists, otherwise `Err(idx)` with the
    /// index the child would have to be inserted at.
    fn find_child(&self, ch: char) -> Result<usize, usize> {
        self.children.binary_search_by_key(&ch, |(c, _)| *c)
    }

    fn child(&self, ch: char) -> Option<&TrieNode<V>> {
        self.find_child(ch).ok().map(|idx| &self.children[idx].1)
    }

    /// A chain of single-child nodes spelling `rest`, ending in `payload`.
    fn branch(rest: &[char], payload: V) -> Result<Self, IndexError> {
        let mut node = TrieNode {
            children: Vec::new(),
            payload: Some(payload),
        };
        for &ch in rest.iter().rev() {
            let mut parent = TrieNode::new();
            parent.children.try_reserve_exact(1)?;
            parent.children.push((ch, node));
            node = parent;
        }
        Ok(node)
    }

    fn is_terminal(&self) -> bool {
        self.payload.is_some()
    }
}

/// A position within a [`PatternIndex`]: the node reached by the characters
/// matched so far.
pub struct MatchCursor<'a, V> {
    node: &'a TrieNode<V>,
    depth: usize,
}

// Derives would put a bound on `V`.
impl<V> Clone for MatchCursor<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for MatchCursor<'_, V> {}

impl<V> MatchCursor<'_, V> {
    /// Number of characters matched to reach this position.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True at the root, before any character has been matched.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

impl<V> std::fmt::Debug for MatchCursor<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCursor")
            .field("depth", &self.depth)
            .field("terminal", &self.node.is_terminal())
            .finish()
    }
}

/// Insert-once, read-many map from needles to replacement payloads.
pub struct PatternIndex<V> {
    root: TrieNode<V>,
    height: usize,
    len: usize,
}

impl<V> Default for PatternIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PatternIndex<V> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            height: 0,
            len: 0,
        }
    }

    /// Insert `key` with its `payload`.
    ///
    /// Fails with [`IndexError::KeyCollision`] if `key` is equal to, a strict
    /// prefix of, or a strict extension of an already accepted needle. On any
    /// failure the index is left unchanged.
    pub fn insert(&mut self, key: &[char], payload: V) -> Result<(), IndexError> {
        if key.is_empty() {
            return Err(IndexError::EmptyKey);
        }
        self.check_insertable(key)?;

        // Descend through the part of the path that already exists.
        let mut node = &mut self.root;
        let mut rest = key;
        let (idx, ch, tail) = loop {
            let Some((&ch, tail)) = rest.split_first() else {
                return Err(IndexError::KeyCollision);
            };
            match node.find_child(ch) {
                Ok(idx) => {
                    node = &mut node.children[idx].1;
                    rest = tail;
                }
                Err(idx) => break (idx, ch, tail),
            }
        };

        // The new branch is built off-tree and attached last, so an
        // allocation failure cannot leave a leaf without a payload.
        let branch = TrieNode::branch(tail, payload)?;
        node.children.try_reserve(1)?;
        node.children.insert(idx, (ch, branch));

        self.height = self.height.max(key.len());
        self.len += 1;
        Ok(())
    }

    /// Walk `key` without mutating anything and report whether inserting it
    /// would break prefix-exclusivity.
    fn check_insertable(&self, key: &[char]) -> Result<(), IndexError> {
        let mut node = &self.root;
        for &ch in key {
            if node.is_terminal() {
                return Err(IndexError::KeyCollision);
            }
            match node.child(ch) {
                Some(child) => node = child,
                // Everything from here on is new, nothing else can collide.
                None => return Ok(()),
            }
        }
        if node.is_terminal() || !node.children.is_empty() {
            return Err(IndexError::KeyCollision);
        }
        Ok(())
    }

    /// Length of the longest accepted needle, 0 when empty.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of accepted needles.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cursor_at_root(&self) -> MatchCursor<'_, V> {
        MatchCursor {
            node: &self.root,
            depth: 0,
        }
    }

    /// Extend `cursor` by one character, or `None` if no needle continues
    /// with `ch` from here.
    pub fn advance<'a>(
        &'a self,
        cursor: MatchCursor<'a, V>,
        ch: char,
    ) -> Option<MatchCursor<'a, V>> {
        cursor.node.child(ch).map(|node| MatchCursor {
            node,
            depth: cursor.depth + 1,
        })
    }

    /// The payload of the needle ending at `cursor`, if one does.
    pub fn payload_at<'a>(&'a self, cursor: MatchCursor<'a, V>) -> Option<&'a V> {
        cursor.node.payload.as_ref()
    }

    /// Exact lookup of a whole needle.
    pub fn get(&self, key: &[char]) -> Option<&V> {
        let mut cursor = self.cursor_at_root();
        for &ch in key {
            cursor = self.advance(cursor, ch)?;
        }
        self.payload_at(cursor)
    }

    /// All `(needle, payload)` pairs in character order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![(&self.root, 0, None)],
            path: Vec::with_capacity(self.height),
        }
    }
}

/// Depth-first iterator returned by [`PatternIndex::iter`].
pub struct Iter<'a, V> {
    /// Nodes still to visit, with their depth and the character leading to
    /// them.
    stack: Vec<(&'a TrieNode<V>, usize, Option<char>)>,
    path: Vec<char>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<char>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, depth, edge)) = self.stack.pop() {
            if let Some(ch) = edge {
                self.path.truncate(depth - 1);
                self.path.push(ch);
            }
            // Reversed so the smallest character is visited first.
            for (ch, child) in node.children.iter().rev() {
                self.stack.push((child, depth + 1, Some(*ch)));
            }
            if let Some(payload) = node.payload.as_ref() {
                return Some((self.path.clone(), payload));
            }
        }
        None
    }
}
