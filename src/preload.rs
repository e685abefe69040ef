use itertools::Itertools;

use crate::ast::CollectionName;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// Name of the in-memory vector holding the preloaded rows of `collection`.
pub fn tuples_variable(collection: &str) -> String {
    format!("{}_tuples", collection)
}

/// Literal rows preloaded into one collection. Fields are C++ expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleSet {
    pub collection: CollectionName,
    pub column_types: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TupleSet {
    pub fn new(schema: &Schema, collection: &str, rows: Vec<Vec<String>>) -> Result<Self> {
        let entry = schema
            .resolve(collection)
            .ok_or_else(|| Error::UnknownPreload(collection.to_owned()))?;
        if entry.kind.is_stream() {
            return Err(Error::ReservedName {
                name: collection.to_owned(),
                reason: "standard streams cannot be preloaded",
            });
        }

        let expected = entry.columns.len();
        if let Some((row, fields)) = rows
            .iter()
            .enumerate()
            .find(|(_, fields)| fields.len() != expected)
        {
            return Err(Error::TupleArity {
                collection: collection.to_owned(),
                row,
                found: fields.len(),
                expected,
            });
        }

        Ok(Self {
            collection: entry.name.clone(),
            column_types: entry.column_types().map(str::to_owned).collect(),
            rows,
        })
    }

    pub fn tuple_type(&self) -> String {
        format!("{}_tuple_t", self.collection)
    }

    pub fn variable(&self) -> String {
        tuples_variable(&self.collection)
    }

    /// The `using` alias and vector definition for these rows.
    pub fn declaration(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "  using {} = std::tuple<{}>;\n",
            self.tuple_type(),
            self.column_types.iter().join(", ")
        ));
        s.push_str(&format!(
            "  std::vector<{}> {} = {{\n",
            self.tuple_type(),
            self.variable()
        ));
        s.push_str(
            &self
                .rows
                .iter()
                .map(|fields| format!("    std::make_tuple({})", fields.iter().join(", ")))
                .join(",\n"),
        );
        if !self.rows.is_empty() {
            s.push('\n');
        }
        s.push_str("  };\n");
        s
    }
}

/// The preloaded collections of one program, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct TupleSets(Vec<TupleSet>);

impl TupleSets {
    pub fn insert(&mut self, set: TupleSet) -> Result<()> {
        if self.get(&set.collection).is_some() {
            return Err(Error::DuplicatePreload(set.collection));
        }
        self.0.push(set);
        Ok(())
    }

    pub fn get(&self, collection: &str) -> Option<&TupleSet> {
        self.0.iter().find(|set| set.collection == collection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TupleSet> {
        self.0.iter()
    }
}
