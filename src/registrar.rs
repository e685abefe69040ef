use std::collections::HashSet;

use itertools::Itertools;

use crate::ast::{MergeKind, RuleName};
use crate::compiler::Block;
use crate::error::{Error, Result};

/// Result names produced by the rules of one block, in declaration order.
///
/// The runtime wires collections to rules positionally, so the closing tuple
/// must list results exactly in the order the rules were written.
#[derive(Clone, Debug)]
pub struct RuleRegistrar {
    block: Block,
    results: Vec<(RuleName, MergeKind)>,
    seen: HashSet<RuleName>,
}

impl RuleRegistrar {
    pub fn new(block: Block) -> Self {
        Self {
            block,
            results: vec![],
            seen: HashSet::new(),
        }
    }

    pub fn register(&mut self, name: &str, merge: MergeKind) -> Result<()> {
        if !self.seen.insert(name.to_owned()) {
            return Err(Error::DuplicateResult {
                block: self.block,
                name: name.to_owned(),
            });
        }
        self.results.push((name.to_owned(), merge));
        Ok(())
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, MergeKind)> {
        self.results
            .iter()
            .map(|(name, merge)| (name.as_str(), *merge))
    }

    pub fn closing_expression(&self) -> String {
        format!(
            "std::make_tuple({})",
            self.results.iter().map(|(name, _)| name).join(", ")
        )
    }
}
