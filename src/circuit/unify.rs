//! Lead unification.
//!
//! Leads joined by zero-impedance paths (explicit connections, wires) are at
//! equal potential and must share one node equivalence class. A union-find
//! over lead slots produces those classes; it is rebuilt from scratch on
//! every analysis rather than mutated incrementally, so stale merges cannot
//! survive a topology change.

/// Union-find with path compression over dense lead slots.
#[derive(Debug)]
pub(crate) struct Unifier {
    parent: Vec<usize>,
}

impl Unifier {
    /// Create a unifier where every slot starts as its own class.
    pub(crate) fn new(slots: usize) -> Self {
        Self {
            parent: (0..slots).collect(),
        }
    }

    /// Find the class root of a slot, compressing the path on the way.
    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the classes of two slots.
    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_until_unioned() {
        let mut uf = Unifier::new(4);
        assert_ne!(uf.find(0), uf.find(1));
        uf.union(0, 1);
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
    }

    #[test]
    fn transitive_merge() {
        let mut uf = Unifier::new(6);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 2);
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
        // Re-union is a no-op.
        uf.union(3, 0);
        assert_eq!(uf.find(0), uf.find(3));
    }
}
