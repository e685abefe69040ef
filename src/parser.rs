use std::borrow::BorrowMut;

use itertools::Itertools;
use pest::error::{ErrorVariant, InputLocation, LineColLocation};
use pest::Parser as _;
use pest_derive::Parser;
use tracing::trace;

use crate::ast::{
    CodeBlock, Identifier, Lambda, Lang, MergeKind, Op, OpArgs, OpName, Rhs, Rule as BloomRule,
};
use crate::error::{ParseError, Result};

#[derive(Parser)]
#[grammar = "bloom.pest"]
struct Parser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;
type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

/// Parses the text of the rule called `name`.
///
/// Failures carry `name` and the deepest position the grammar reached, so
/// callers can point at the offending rule without re-parsing it.
pub fn parse_rule(name: &str, code: &str) -> Result<BloomRule> {
    let mut pairs = Parser::parse(Rule::rule, code).map_err(|err| parse_error(name, err))?;
    let rule = BloomRule::from(expect_next_rule(&mut pairs, Rule::rule));
    trace!(rule = name, ast = ?rule, "parsed rule");
    Ok(rule)
}

fn parse_error(name: &str, err: pest::error::Error<Rule>) -> ParseError {
    let offset = match err.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    let expected = match &err.variant {
        ErrorVariant::ParsingError { positives, .. } => positives
            .iter()
            .copied()
            .map(describe)
            .unique()
            .map(str::to_owned)
            .collect(),
        ErrorVariant::CustomError { message } => vec![message.clone()],
    };

    ParseError {
        rule: name.to_owned(),
        offset,
        line,
        column,
        expected,
    }
}

fn describe(r: Rule) -> &'static str {
    match r {
        Rule::catalog_entry | Rule::anchor => "collection name",
        Rule::ident => "parameter name",
        Rule::merge | Rule::merge_now | Rule::merge_next | Rule::merge_async | Rule::merge_delete => {
            "merge operator (`<=`, `<+`, `<~`, `<-`)"
        }
        Rule::rhs | Rule::opchain | Rule::op => "operator chain",
        Rule::opname => "operator (`where`, `project`, `map`, `cross`, `join`, `groupby`)",
        Rule::type_params | Rule::type_param => "type parameter",
        Rule::op_args | Rule::lambda | Rule::references => "operator arguments",
        Rule::codeblock | Rule::lang | Rule::code => "fenced code block",
        Rule::EOI => "end of rule",
        _ => "rule",
    }
}

fn expect_next_rule<'a, P: BorrowMut<Pairs<'a>>>(mut pairs: P, expected: Rule) -> Pair<'a> {
    match pairs.borrow_mut().next() {
        Some(pair) if pair.as_rule() == expected => pair,
        other => unreachable!(
            "expected {:?}, grammar produced {:?}",
            expected,
            other.map(|pair| pair.as_rule())
        ),
    }
}

fn convert_catalog_entry(pair: Pair) -> Identifier {
    assert_eq!(pair.as_rule(), Rule::catalog_entry);
    pair.as_str().to_string()
}

fn expect_catalog_entry<'a, P: BorrowMut<Pairs<'a>>>(pairs: P) -> Identifier {
    convert_catalog_entry(expect_next_rule(pairs, Rule::catalog_entry))
}

impl From<Pair<'_>> for BloomRule {
    fn from(pair: Pair<'_>) -> Self {
        let mut pairs = pair.into_inner();

        let lhs = expect_catalog_entry(&mut pairs);
        let merge = MergeKind::from(expect_next_rule(&mut pairs, Rule::merge));
        let rhs = match pairs.next() {
            Some(pair) if pair.as_rule() == Rule::rhs => Rhs::from(pair),
            _ => Rhs::Preloaded,
        };

        Self { lhs, merge, rhs }
    }
}

impl From<Pair<'_>> for MergeKind {
    fn from(pair: Pair<'_>) -> Self {
        let token = pair.into_inner().next().map(|pair| pair.as_rule());
        match token {
            Some(Rule::merge_now) => MergeKind::Overwrite,
            Some(Rule::merge_next) => MergeKind::Insert,
            Some(Rule::merge_async) => MergeKind::Deferred,
            Some(Rule::merge_delete) => MergeKind::Delete,
            other => unreachable!("unexpected merge token {:?}", other),
        }
    }
}

impl From<Pair<'_>> for Rhs {
    fn from(pair: Pair<'_>) -> Self {
        let mut anchor = None;
        let mut ops = vec![];

        for pair in pair.into_inner() {
            match pair.as_rule() {
                Rule::anchor => anchor = Some(expect_catalog_entry(pair.into_inner())),
                Rule::opchain => ops = pair.into_inner().map(Op::from).collect(),
                _ => unreachable!(),
            }
        }

        match anchor {
            Some(anchor) if ops.is_empty() => Rhs::Anchor(anchor),
            anchor => Rhs::Chain { anchor, ops },
        }
    }
}

impl From<Pair<'_>> for Op {
    fn from(pair: Pair<'_>) -> Self {
        let mut pairs = pair.into_inner();

        let keyword = expect_next_rule(&mut pairs, Rule::opname);
        let name = OpName::from_keyword(keyword.as_str())
            .unwrap_or_else(|| unreachable!("grammar accepted operator {:?}", keyword.as_str()));

        let mut type_params = vec![];
        let mut args = None;
        for pair in pairs {
            match pair.as_rule() {
                Rule::type_params => {
                    type_params = pair
                        .into_inner()
                        .map(|param| param.as_str().trim().to_owned())
                        .collect();
                }
                Rule::op_args => args = Some(OpArgs::from(pair)),
                _ => unreachable!(),
            }
        }

        Self {
            name,
            type_params,
            args,
        }
    }
}

impl From<Pair<'_>> for OpArgs {
    fn from(pair: Pair<'_>) -> Self {
        let pair = pair.into_inner().next().unwrap_or_else(|| unreachable!());

        match pair.as_rule() {
            Rule::lambda => OpArgs::Lambda(Lambda::from(pair)),

            Rule::references => {
                OpArgs::References(pair.into_inner().map(convert_catalog_entry).collect())
            }

            _ => unreachable!(),
        }
    }
}

impl From<Pair<'_>> for Lambda {
    fn from(pair: Pair<'_>) -> Self {
        let mut pairs = pair.into_inner();
        let param = expect_next_rule(&mut pairs, Rule::ident).as_str().to_owned();
        let code = CodeBlock::from(expect_next_rule(&mut pairs, Rule::codeblock));
        Self { param, code }
    }
}

impl From<Pair<'_>> for CodeBlock {
    fn from(pair: Pair<'_>) -> Self {
        let mut lang = None;
        let mut body = String::new();

        for pair in pair.into_inner() {
            match pair.as_rule() {
                Rule::lang => lang = Lang::from_tag(pair.as_str()),
                Rule::code => body = pair.as_str().to_owned(),
                _ => unreachable!(),
            }
        }

        Self { lang, body }
    }
}
