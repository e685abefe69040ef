use std::collections::{hash_map, HashMap};
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::ast::{CollectionName, Identifier};
use crate::error::{Error, Result};

pub const STDIN: &str = "stdin";
pub const STDOUT: &str = "stdout";
pub const FLUIN: &str = "fluin";
pub const FLUOUT: &str = "fluout";

/// Maps the reserved surface names onto their canonical identifiers and
/// leaves every other name untouched.
pub fn canonical_name(name: &str) -> &str {
    match name {
        STDIN => FLUIN,
        STDOUT => FLUOUT,
        other => other,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    StreamIn,
    StreamOut,
    Channel,
    Table,
    Scratch,
}

impl CollectionKind {
    pub fn is_stream(self) -> bool {
        matches!(self, CollectionKind::StreamIn | CollectionKind::StreamOut)
    }
}

impl FromStr for CollectionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "channel" => Ok(CollectionKind::Channel),
            "table" => Ok(CollectionKind::Table),
            "scratch" => Ok(CollectionKind::Scratch),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionKind::StreamIn => STDIN,
            CollectionKind::StreamOut => STDOUT,
            CollectionKind::Channel => "channel",
            CollectionKind::Table => "table",
            CollectionKind::Scratch => "scratch",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: Identifier,
    pub ty: String,
}

impl Column {
    pub fn new(name: impl Into<Identifier>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Canonical name, i.e. `fluin` rather than `stdin`.
    pub name: CollectionName,
    pub kind: CollectionKind,
    pub columns: Vec<Column>,
}

impl Entry {
    /// The builder call declaring this collection, without the leading `.`.
    pub fn declaration(&self) -> String {
        match self.kind {
            CollectionKind::StreamIn => format!("{}()", STDIN),
            CollectionKind::StreamOut => format!("{}()", STDOUT),
            kind => format!(
                "template {}<{}>(\"{}\", {{{{{}}}}})",
                kind,
                self.columns.iter().map(|column| &column.ty).join(", "),
                self.name,
                self.columns
                    .iter()
                    .map(|column| format!("\"{}\"", column.name))
                    .join(", "),
            ),
        }
    }

    pub fn column_types(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.ty.as_str())
    }
}

fn stream_entry(kind: CollectionKind) -> Entry {
    let name = match kind {
        CollectionKind::StreamIn => FLUIN,
        _ => FLUOUT,
    };
    Entry {
        name: name.to_owned(),
        kind,
        columns: vec![],
    }
}

/// Every collection a program declares, in declaration order.
///
/// The standard streams resolve even when they are not declared.
#[derive(Clone, Debug)]
pub struct Schema {
    entries: Vec<Entry>,
    index: HashMap<CollectionName, usize>,
    streams: [Entry; 2],
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            entries: vec![],
            index: HashMap::new(),
            streams: [
                stream_entry(CollectionKind::StreamIn),
                stream_entry(CollectionKind::StreamOut),
            ],
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `stdin` or `stdout`.
    pub fn define_reserved(&mut self, name: &str) -> Result<()> {
        let kind = match name {
            STDIN => CollectionKind::StreamIn,
            STDOUT => CollectionKind::StreamOut,
            _ => {
                return Err(Error::ReservedName {
                    name: name.to_owned(),
                    reason: "only `stdin` and `stdout` may be declared without a definition",
                })
            }
        };
        self.insert(stream_entry(kind))
    }

    pub fn define(
        &mut self,
        name: &str,
        kind: CollectionKind,
        columns: Vec<Column>,
    ) -> Result<()> {
        if matches!(name, STDIN | STDOUT) {
            return Err(Error::ReservedName {
                name: name.to_owned(),
                reason: "standard streams take no type or columns",
            });
        }
        if matches!(name, FLUIN | FLUOUT) || kind.is_stream() {
            return Err(Error::ReservedName {
                name: name.to_owned(),
                reason: "the standard stream collections can only be declared as `stdin`/`stdout`",
            });
        }
        if let Some(column) = columns.iter().map(|column| &column.name).duplicates().next() {
            return Err(Error::DuplicateColumn {
                collection: name.to_owned(),
                column: column.clone(),
            });
        }

        self.insert(Entry {
            name: name.to_owned(),
            kind,
            columns,
        })
    }

    fn insert(&mut self, entry: Entry) -> Result<()> {
        match self.index.entry(entry.name.clone()) {
            hash_map::Entry::Occupied(_) => Err(Error::DuplicateCollection(entry.name)),
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(self.entries.len());
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    /// Looks `name` up by surface or canonical name.
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        let name = canonical_name(name);
        match self.index.get(name) {
            Some(&index) => Some(&self.entries[index]),
            None => self.streams.iter().find(|entry| entry.name == name),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}
