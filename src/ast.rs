use std::fmt;

pub type Identifier = String;
pub type CollectionName = Identifier;
pub type RuleName = Identifier;

/// One parsed rule: `<lhs> <merge> <rhs>;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub lhs: CollectionName,
    pub merge: MergeKind,
    pub rhs: Rhs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeKind {
    /// `<=`
    Overwrite,
    /// `<+`
    Insert,
    /// `<-`
    Delete,
    /// `<~`
    Deferred,
}

impl MergeKind {
    pub fn surface_token(self) -> &'static str {
        match self {
            MergeKind::Overwrite => "<=",
            MergeKind::Insert => "<+",
            MergeKind::Delete => "<-",
            MergeKind::Deferred => "<~",
        }
    }

    /// The Fluent infix operator for this merge. Deferred merges have no
    /// dedicated operator and share the overwrite one.
    pub fn target_token(self) -> &'static str {
        match self {
            MergeKind::Overwrite | MergeKind::Deferred => "<=",
            MergeKind::Insert => "+=",
            MergeKind::Delete => "-=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rhs {
    /// Empty right-hand side: read the preloaded tuples of the lhs.
    Preloaded,
    Anchor(CollectionName),
    Chain {
        anchor: Option<CollectionName>,
        ops: Vec<Op>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Op {
    pub name: OpName,
    pub type_params: Vec<String>,
    pub args: Option<OpArgs>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpName {
    Where,
    Project,
    Map,
    Cross,
    Join,
    GroupBy,
}

impl OpName {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "where" => OpName::Where,
            "project" => OpName::Project,
            "map" => OpName::Map,
            "cross" => OpName::Cross,
            "join" => OpName::Join,
            "groupby" => OpName::GroupBy,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            OpName::Where => "where",
            OpName::Project => "project",
            OpName::Map => "map",
            OpName::Cross => "cross",
            OpName::Join => "join",
            OpName::GroupBy => "groupby",
        }
    }

    /// Name of the `lra::` combinator implementing this operator.
    pub fn combinator(self) -> &'static str {
        match self {
            OpName::Where => "filter",
            OpName::Cross => "make_cross",
            other => other.keyword(),
        }
    }
}

impl fmt::Display for OpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpArgs {
    References(Vec<CollectionName>),
    Lambda(Lambda),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lambda {
    pub param: Identifier,
    pub code: CodeBlock,
}

/// Foreign code between two fences. The body is kept exactly as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: Option<Lang>,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lang {
    Cpp,
    C,
    Python,
}

impl Lang {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "c++" | "cpp" => Some(Lang::Cpp),
            "c" => Some(Lang::C),
            "python" => Some(Lang::Python),
            _ => None,
        }
    }
}
