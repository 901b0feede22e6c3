use slotmap::new_key_type;

new_key_type! {
    /// Identifies a storage node in the flow graph.
    pub struct NodeId;

    /// Identifies an edge (connector) between two nodes.
    pub struct EdgeId;
}
