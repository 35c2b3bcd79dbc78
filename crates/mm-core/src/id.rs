use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Process-wide interner backing every `NodeId`.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned identifier of a mind-map node: a 4-byte `Spur` handle with
/// constant-time equality and hashing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Build the id for sequence number `n` under `prefix` (e.g. `node_7`).
    pub fn numbered(prefix: &str, n: u64) -> Self {
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// Parse the trailing sequence number of a `prefix_N` id.
    pub fn sequence(&self, prefix: &str) -> Option<u64> {
        self.as_str()
            .strip_prefix(prefix)?
            .strip_prefix('_')?
            .parse()
            .ok()
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by the resolved string so repairs and listings are deterministic
/// regardless of interning order.
impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("launch_plan");
        let b = NodeId::intern("launch_plan");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "launch_plan");
    }

    #[test]
    fn numbered_ids_carry_their_sequence() {
        let id = NodeId::numbered("node", 42);
        assert_eq!(id.as_str(), "node_42");
        assert_eq!(id.sequence("node"), Some(42));
        assert_eq!(NodeId::intern("root_thing").sequence("node"), None);
        assert_eq!(NodeId::intern("node_x").sequence("node"), None);
    }

    #[test]
    fn ordering_follows_the_string() {
        let b = NodeId::intern("zz_order_b");
        let a = NodeId::intern("aa_order_a");
        assert!(a < b);
    }
}
