//! The YAML document describing one Fluent program:
//!
//! ```yaml
//! name: chat
//! args:
//!   nickname: std::string
//! schema:
//!   stdin:
//!   stdout:
//!   connect:
//!     type: channel
//!     cols: { addr: std::string, nick: std::string }
//! preload:
//!   nodes: [["\"alice\"", 1]]
//! bootstrap:
//!   load: "nodes <= ;"
//! bloom:
//!   shout: "stdout <= connect.map(c ```c++ return std::get<1>(c);```);"
//! ```
//!
//! Mappings keep document order and keep repeated keys, so that duplicates
//! can be reported instead of silently replaced.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::preload::{TupleSet, TupleSets};
use crate::schema::{CollectionKind, Column, Schema};

const ADDRESS_ARG: &str = "address";
const ADDRESS_TYPE: &str = "std::string";

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub args: Entries<String>,
    #[serde(default)]
    pub schema: Entries<Option<CollectionDef>>,
    #[serde(default)]
    pub preload: Entries<Vec<Vec<Field>>>,
    #[serde(default)]
    pub preamble: Option<String>,
    #[serde(default)]
    pub bootstrap: Entries<String>,
    #[serde(default)]
    pub bloom: Entries<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub cols: Entries<String>,
}

/// A preloaded field, written in YAML either as C++ source text or as a
/// plain scalar.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Code(String),
}

impl Field {
    pub fn to_cpp(&self) -> String {
        match self {
            Field::Bool(b) => b.to_string(),
            Field::Integer(n) => n.to_string(),
            Field::Float(x) => format!("{:?}", x),
            Field::Code(code) => code.trim().to_owned(),
        }
    }
}

impl Program {
    pub fn from_yaml(code: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(code)?)
    }

    /// Constructor arguments, with the `address` argument every program
    /// needs appended when the document leaves it out.
    pub fn arguments(&self) -> Result<Vec<(&str, &str)>> {
        let mut args: Vec<(&str, &str)> = self
            .args
            .iter()
            .map(|(name, ty)| (name.as_str(), ty.as_str()))
            .collect();

        match args.iter().find(|(name, _)| *name == ADDRESS_ARG) {
            Some((_, ty)) if ty.trim() != ADDRESS_TYPE => {
                return Err(Error::ReservedArgument(ty.to_string()))
            }
            Some(_) => {}
            None => args.push((ADDRESS_ARG, ADDRESS_TYPE)),
        }

        Ok(args)
    }

    pub fn build_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();

        for (name, def) in self.schema.iter() {
            match def {
                None => schema.define_reserved(name)?,
                Some(def) => {
                    let kind = def.kind.parse::<CollectionKind>().map_err(|()| {
                        Error::UnknownKind {
                            collection: name.clone(),
                            kind: def.kind.clone(),
                        }
                    })?;
                    let columns = def
                        .cols
                        .iter()
                        .map(|(column, ty)| Column::new(column.as_str(), ty.as_str()))
                        .collect();
                    schema.define(name, kind, columns)?;
                }
            }
        }

        Ok(schema)
    }

    pub fn build_tuples(&self, schema: &Schema) -> Result<TupleSets> {
        let mut tuples = TupleSets::default();

        for (collection, rows) in self.preload.iter() {
            let rows = rows
                .iter()
                .map(|fields| fields.iter().map(Field::to_cpp).collect())
                .collect();
            tuples.insert(TupleSet::new(schema, collection, rows)?)?;
        }

        Ok(tuples)
    }
}

/// An ordered mapping that keeps every entry, repeated keys included.
#[derive(Clone, Debug, PartialEq)]
pub struct Entries<T>(Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(vec![])
    }
}

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.0.iter().map(|(key, value)| (key, value))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            // `bloom:` with nothing after it
            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Entries::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
