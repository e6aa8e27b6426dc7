use std::{fmt, result};

#[allow(unused_imports)]
use crate::btree::Index;
use crate::{btree::Depth, ToJson};

/// Statistic type, for [Index] type.
pub struct Stats {
    pub name: String,
    pub spin: bool,
    pub node_size: usize,
    pub n_count: usize,
    pub n_nodes: usize,
    pub n_splits: usize,
    pub n_rebalances: usize,
    pub conflicts: usize,
    pub depths: Option<Depth>,
}

impl Stats {
    pub(crate) fn new(name: &str, spin: bool) -> Stats {
        Stats {
            name: name.to_string(),
            spin,
            node_size: Default::default(),
            n_count: Default::default(),
            n_nodes: Default::default(),
            n_splits: Default::default(),
            n_rebalances: Default::default(),
            conflicts: Default::default(),
            depths: None,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        writeln!(f, "btree.name = {}", self.name)?;
        writeln!(
            f,
            "btree = {{ n_count={}, n_nodes={}, node_size={}, spin={} }}",
            self.n_count, self.n_nodes, self.node_size, self.spin,
        )?;
        writeln!(
            f,
            "btree = {{ n_splits={}, n_rebalances={}, conflicts={} }}",
            self.n_splits, self.n_rebalances, self.conflicts,
        )?;
        writeln!(f, "btree.depths = {}", d)
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        let null = "null".to_string();
        format!(
            concat!(
                r#"{{ "btree": {{ "name": {:?}, "n_count": {}, "#,
                r#""n_nodes": {}, "node_size": {}, "spin": {}, "#,
                r#""n_splits": {}, "n_rebalances": {}, "conflicts": {}, "#,
                r#""depths": {} }} }}"#,
            ),
            self.name,
            self.n_count,
            self.n_nodes,
            self.node_size,
            self.spin,
            self.n_splits,
            self.n_rebalances,
            self.conflicts,
            self.depths.as_ref().map_or(null, |x| x.to_json()),
        )
    }
}
