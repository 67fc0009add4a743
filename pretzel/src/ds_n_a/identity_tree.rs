use crate::identity::{ObjId, ObjShared, Position};


/// Most ancestors an insert descent will record.
const PATH_CAPACITY: usize = 256;

/// Which key governs node ordering for one tree instance, fixed at
/// construction.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum KeyOrder {
    ByIdentity,
    ByPosition,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Color {
    Red,
    Black,
}

struct Node {
    children: [Option<u32>; 2],
    color: Color,
    id: ObjId,
    pos: Position,
    obj: Option<ObjShared>,
}

/// An IdentityTree maps composite objects to their stream positions and back.
///
/// ### API:
///
/// `insert` one `(identity, position, object)` triple; look one up by
/// identity (the encode direction) or by position (the decode direction);
/// `clear`. There is no removal: a tree lives exactly as long as one
/// top-level encode or decode and is discarded whole.
///
/// ### Internals:
///
/// A red-black tree over a `Vec` arena with `u32` child links. Every node
/// carries both keys; which one governs ordering is the [`KeyOrder`] chosen
/// at construction. An insert records its descent path (ancestors and branch
/// sides) in stack-local scratch and rebalances bottom-up from it.
pub struct IdentityTree {
    nodes: Vec<Node>,
    root: Option<u32>,
    order: KeyOrder,
}

impl IdentityTree {
    pub fn new(order: KeyOrder) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            order,
        }
    }

    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// Count of tracked objects; `len() + 1` is the next position to assign.
    pub fn len(&self) -> u64 {
        self.nodes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Releases every node at once and resets to empty, keeping the ordering
    /// discipline.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Inserts a node tracking `(id, pos, obj)`. If the active ordering's key
    /// is already present the tree is left untouched. A descent deeper than
    /// 256 recorded ancestors drops the insert; a balanced tree cannot reach
    /// that depth within `u32` arena capacity.
    pub fn insert(&mut self, id: ObjId, pos: Position, obj: Option<ObjShared>) {
        let mut parents = [0u32; PATH_CAPACITY];
        let mut sides = [0usize; PATH_CAPACITY];
        let mut depth: i32 = -1;

        let mut cur = self.root;
        while let Some(i) = cur {
            let node = &self.nodes[i as usize];
            let side = match self.descend_side(node, id, pos) {
                None => return,
                Some(side) => side,
            };
            if depth + 1 >= PATH_CAPACITY as i32 {
                return;
            }
            depth += 1;
            parents[depth as usize] = i;
            sides[depth as usize] = side;
            cur = node.children[side];
        }

        let new = self.nodes.len() as u32;
        self.nodes.push(Node {
            children: [None, None],
            color: Color::Red,
            id,
            pos,
            obj,
        });
        match depth {
            -1 => self.root = Some(new),
            _ => {
                let parent = parents[depth as usize] as usize;
                self.nodes[parent].children[sides[depth as usize]] = Some(new);
            }
        }
        self.rebalance(&parents, &sides, depth);
    }

    /// `None` = the active key matches (a duplicate); `Some(side)` = descend.
    fn descend_side(&self, node: &Node, id: ObjId, pos: Position) -> Option<usize> {
        match self.order {
            KeyOrder::ByIdentity => match node.id == id {
                true => None,
                false => Some((node.id < id) as usize),
            },
            KeyOrder::ByPosition => match node.pos == pos {
                true => None,
                false => Some((node.pos < pos) as usize),
            },
        }
    }

    /// Bottom-up red-black fixup along the recorded descent path.
    /// `parent_depth` indexes the inserted node's direct parent.
    fn rebalance(
        &mut self,
        parents: &[u32; PATH_CAPACITY],
        sides: &[usize; PATH_CAPACITY],
        parent_depth: i32,
    ) {
        let mut gp = parent_depth;
        loop {
            // Move up to the next grandparent of the node under repair.
            gp -= 1;
            if gp < 0 {
                break;
            }
            let gp_at = gp as usize;
            let side = sides[gp_at];
            let g = parents[gp_at] as usize;
            let mut x = parents[gp_at + 1] as usize;

            if self.nodes[x].color == Color::Black {
                break;
            }

            let uncle = self.nodes[g].children[1 - side];
            if let Some(y) = uncle {
                let y = y as usize;
                if self.nodes[y].color == Color::Red {
                    // Red uncle: recolor and continue two levels up.
                    self.nodes[x].color = Color::Black;
                    self.nodes[y].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    gp -= 1;
                    continue;
                }
            }

            if side == 1 - sides[gp_at + 1] {
                // Inner grandchild: rotate the parent first. The inner child
                // is the red node on the recorded path, so it exists.
                let y = self.nodes[x].children[1 - side].unwrap() as usize;
                self.nodes[x].children[1 - side] = self.nodes[y].children[side];
                self.nodes[y].children[side] = Some(x as u32);
                self.nodes[g].children[side] = Some(y as u32);
                x = y;
            }

            // Rotate the grandparent toward the uncle's side.
            self.nodes[g].color = Color::Red;
            self.nodes[x].color = Color::Black;
            self.nodes[g].children[side] = self.nodes[x].children[1 - side];
            self.nodes[x].children[1 - side] = Some(g as u32);
            match gp_at {
                0 => self.root = Some(x as u32),
                _ => {
                    let pp = parents[gp_at - 1] as usize;
                    self.nodes[pp].children[sides[gp_at - 1]] = Some(x as u32);
                }
            }
            break;
        }

        if let Some(root) = self.root {
            self.nodes[root as usize].color = Color::Black;
        }
    }

    /// Position assigned to `id`, if present. Walks the identity ordering, so
    /// it is meaningful only on a [`KeyOrder::ByIdentity`] tree.
    pub fn find_by_identity(&self, id: ObjId) -> Option<Position> {
        debug_assert_eq!(self.order, KeyOrder::ByIdentity);
        let mut cur = self.root;
        while let Some(i) = cur {
            let node = &self.nodes[i as usize];
            if node.id == id {
                return Some(node.pos);
            }
            cur = node.children[(node.id < id) as usize];
        }
        None
    }

    /// Object registered at `pos`, if any: `None` both for positions never
    /// inserted and for positions registered without an object. Walks the
    /// position ordering, so it is meaningful only on a
    /// [`KeyOrder::ByPosition`] tree.
    pub fn find_by_position(&self, pos: Position) -> Option<ObjShared> {
        debug_assert_eq!(self.order, KeyOrder::ByPosition);
        let mut cur = self.root;
        while let Some(i) = cur {
            let node = &self.nodes[i as usize];
            if node.pos == pos {
                return node.obj.clone();
            }
            cur = node.children[(node.pos < pos) as usize];
        }
        None
    }
}
