use std::fmt;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::ast::{
    CollectionName, Lambda, Lang, MergeKind, Op, OpArgs, Rhs, Rule, RuleName,
};
use crate::error::{Error, Result};
use crate::parser::parse_rule;
use crate::preload::{tuples_variable, TupleSets};
use crate::registrar::RuleRegistrar;
use crate::schema::{canonical_name, Schema};

/// Adapter used for preloaded vectors, whatever block reads them.
const TUPLE_ADAPTER: &str = "lra::make_iterable";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    Bootstrap,
    SteadyState,
}

impl Block {
    /// Wraps a collection reference so it can be piped into `lra::` operators.
    pub fn collection_adapter(self) -> &'static str {
        match self {
            Block::Bootstrap => "lra::make_iterable",
            Block::SteadyState => "lra::make_collection",
        }
    }

    pub fn register_method(self) -> &'static str {
        match self {
            Block::Bootstrap => "RegisterBootstrapRules",
            Block::SteadyState => "RegisterRules",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Block::Bootstrap => "Bloom Bootstrap Rules",
            Block::SteadyState => "Bloom Rules",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Block::Bootstrap => "bootstrap",
            Block::SteadyState => "steady-state",
        })
    }
}

/// One translated rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub result: RuleName,
    /// Canonical name of the collection the rule merges into.
    pub lhs: CollectionName,
    pub merge: MergeKind,
    pub code: String,
}

impl Translation {
    pub fn statement(&self) -> String {
        format!(
            "auto {} = {} {} {};",
            self.result,
            self.lhs,
            self.merge.target_token(),
            self.code
        )
    }
}

/// Translation state for the rules of one block of one program.
#[derive(Clone, Debug)]
pub struct Translator<'a> {
    schema: &'a Schema,
    block: Block,
    /// Preloaded collections no rule of this block has read yet.
    captured: Vec<&'a str>,
}

impl<'a> Translator<'a> {
    pub fn new(schema: &'a Schema, tuples: &'a TupleSets, block: Block) -> Self {
        Self {
            schema,
            block,
            captured: tuples.iter().map(|set| set.collection.as_str()).collect(),
        }
    }

    pub fn unconsumed_tuples(&self) -> Vec<&'a str> {
        self.captured.clone()
    }

    /// Translates `rule` as the rule called `name`.
    ///
    /// The lhs may be a collection the schema does not declare; it is only
    /// canonicalised. Anchors and references must resolve.
    pub fn translate(&mut self, name: &str, rule: &Rule) -> Result<Translation> {
        let lhs = canonical_name(&rule.lhs);

        let code = match &rule.rhs {
            Rhs::Preloaded => self.take_tuples(name, lhs)?,
            Rhs::Anchor(anchor) => format!("({})", self.wrap(name, anchor)?),
            Rhs::Chain { anchor, ops } => self.translate_chain(name, anchor.as_deref(), ops)?,
        };

        if rule.merge == MergeKind::Deferred {
            debug!(rule = name, "deferred merge emitted as overwrite");
        }

        Ok(Translation {
            result: name.to_owned(),
            lhs: lhs.to_owned(),
            merge: rule.merge,
            code,
        })
    }

    fn take_tuples(&mut self, name: &str, lhs: &str) -> Result<String> {
        let index = self
            .captured
            .iter()
            .position(|&collection| collection == lhs)
            .ok_or_else(|| Error::MissingTuples {
                rule: name.to_owned(),
                collection: lhs.to_owned(),
            })?;
        self.captured.remove(index);

        Ok(format!("{}(&{})", TUPLE_ADAPTER, tuples_variable(lhs)))
    }

    fn translate_chain(&self, name: &str, anchor: Option<&str>, ops: &[Op]) -> Result<String> {
        let mut stages = vec![];

        match anchor {
            Some(anchor) => stages.push(self.wrap(name, anchor)?),
            None => {
                // The first operator's first reference is the starting collection.
                let starts_with_reference = matches!(
                    ops.first().and_then(|op| op.args.as_ref()),
                    Some(OpArgs::References(_))
                );
                if !starts_with_reference {
                    return Err(Error::MissingAnchor {
                        rule: name.to_owned(),
                    });
                }
            }
        }

        for op in ops {
            stages.push(self.translate_op(name, op)?);
        }

        Ok(format!("({})", stages.iter().join(" | ")))
    }

    fn translate_op(&self, name: &str, op: &Op) -> Result<String> {
        let mut s = format!("lra::{}", op.name.combinator());

        if !op.type_params.is_empty() {
            s.push('<');
            s.push_str(&op.type_params.iter().join(", "));
            s.push('>');
        }

        s.push('(');
        match &op.args {
            Some(OpArgs::References(references)) => {
                let wrapped = references
                    .iter()
                    .map(|reference| self.wrap(name, reference))
                    .collect::<Result<Vec<_>>>()?;
                s.push_str(&wrapped.join(", "));
            }
            Some(OpArgs::Lambda(lambda)) => s.push_str(&self.translate_lambda(name, lambda)),
            None => {}
        }
        s.push(')');

        Ok(s)
    }

    fn translate_lambda(&self, name: &str, lambda: &Lambda) -> String {
        if lambda.code.lang == Some(Lang::Python) {
            warn!(rule = name, "python code block spliced into a C++ lambda");
        }

        format!(
            "[&](const auto& {}) {{ {} }}",
            lambda.param,
            lambda.code.body.trim()
        )
    }

    fn wrap(&self, name: &str, collection: &str) -> Result<String> {
        let collection = self.resolve(name, collection)?;
        Ok(format!(
            "{}(&{})",
            self.block.collection_adapter(),
            collection
        ))
    }

    fn resolve(&self, name: &str, collection: &str) -> Result<&'a str> {
        self.schema
            .resolve(collection)
            .map(|entry| entry.name.as_str())
            .ok_or_else(|| Error::UnresolvedReference {
                rule: name.to_owned(),
                name: collection.to_owned(),
            })
    }
}

/// The translated statements of one block and its closing tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledBlock {
    pub block: Block,
    pub statements: Vec<String>,
    pub closing: String,
}

impl CompiledBlock {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Parses and translates `rules`, given as `(name, text)` pairs in document
/// order.
///
/// In the bootstrap block, every preloaded collection that no explicit rule
/// read gets a `<collection>_boot` rule loading its tuples.
pub fn compile_block<'r, I>(
    schema: &Schema,
    tuples: &TupleSets,
    block: Block,
    rules: I,
) -> Result<CompiledBlock>
where
    I: IntoIterator<Item = (&'r str, &'r str)>,
{
    let mut translator = Translator::new(schema, tuples, block);
    let mut registrar = RuleRegistrar::new(block);
    let mut statements = vec![];

    let mut push = |name: &str, rule: &Rule, translator: &mut Translator| -> Result<()> {
        let translation = translator.translate(name, rule)?;
        registrar.register(&translation.result, translation.merge)?;
        debug!(%block, rule = name, "translated rule");
        statements.push(translation.statement());
        Ok(())
    };

    for (name, code) in rules {
        let rule = parse_rule(name, code)?;
        push(name, &rule, &mut translator)?;
    }

    if block == Block::Bootstrap {
        for collection in translator.unconsumed_tuples() {
            let rule = Rule {
                lhs: collection.to_owned(),
                merge: MergeKind::Overwrite,
                rhs: Rhs::Preloaded,
            };
            push(&format!("{}_boot", collection), &rule, &mut translator)?;
        }
    }

    let results = registrar
        .results()
        .map(|(name, merge)| format!("{} {}", merge.surface_token(), name))
        .join(", ");
    debug!(%block, %results, "registered block");

    Ok(CompiledBlock {
        block,
        statements,
        closing: registrar.closing_expression(),
    })
}
