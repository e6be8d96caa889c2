use crate::node::NodeId;

/// Sequential ID generator for nodes within a document
///
/// Ids are never reused, so a removed node's id can't alias a later one.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    count: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> NodeId {
        self.count += 1;
        NodeId(self.count)
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut ids = IdGenerator::new();

        let id1 = ids.new_id();
        let id2 = ids.new_id();
        let id3 = ids.new_id();

        assert_eq!(id1.as_u64(), 1);
        assert_eq!(id2.as_u64(), 2);
        assert_eq!(id3.as_u64(), 3);
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn test_cloned_generators_diverge_independently() {
        let mut a = IdGenerator::new();
        a.new_id();
        let mut b = a.clone();

        assert_eq!(a.new_id(), b.new_id());
        assert_eq!(a.issued(), 2);
    }
}
