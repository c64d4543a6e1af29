//! The standard function table and the bound-function model.
//!
//! Registration conventions:
//! - One [`Entry`] per function name; arity-specific variants use a `name#arity` key and
//!   are found before the generic entry.
//! - An entry flagged `context_item` may also be called with its first argument omitted;
//!   the bound call then supplies the context item in that slot.
//! - `FunctionKind` is a plain tag. Binding turns it into a [`SystemFunction`], which carries
//!   everything resolved at bind time (collations, decimal formats) and is immutable after.
//! - Implementations live in one file per family and take the already-converted arguments
//!   as [`Args`].

mod aggregates;
mod boolean;
mod call;
mod collating;
mod constructors;
mod datetime;
mod deep_equal;
mod diagnostics;
mod environment;
pub mod format_date;
pub mod format_number;
mod ids;
mod minimax;
mod nodes;
pub mod numberer;
mod numeric;
mod qnames;
mod regex;
mod sequences;
mod strings;
mod uri;

pub use call::{Args, BoundCall, CallTarget, ExecutableFn};
pub(crate) use constructors::construct;

use crate::engine::collation::{Collation, resolve_collation};
use crate::engine::functions::format_number::DecimalSymbols;
use crate::engine::runtime::{CallCtx, Error, ErrorCode, HostLanguage, StaticContext};
use crate::engine::iter::SequenceIter;
use crate::model::{NodeKind, XdmNode};
use crate::xdm::{AtomicType, ItemType, Occurrence, SequenceType, XdmAtomicValue};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Host languages (and modes) a function is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applicability(u8);

impl Applicability {
    pub const CORE: Applicability = Applicability(1);
    pub const XSLT: Applicability = Applicability(2);
    pub const USE_WHEN: Applicability = Applicability(4);
    pub const ALL: Applicability = Applicability(7);

    pub fn intersects(self, other: Applicability) -> bool {
        self.0 & other.0 != 0
    }

    /// What a call compiled under `sc` may see. XPath hosts get the core functions, XSLT
    /// hosts add the XSLT ones, and use-when expressions are limited to core plus use-when.
    pub fn for_context(sc: &StaticContext) -> Applicability {
        if sc.use_when {
            return Applicability::CORE.with(Applicability::USE_WHEN);
        }
        match sc.host_language {
            HostLanguage::XPath => Applicability::CORE,
            HostLanguage::Xslt => Applicability::CORE.with(Applicability::XSLT),
        }
    }

    const fn with(self, other: Applicability) -> Applicability {
        Applicability(self.0 | other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingOp {
    Floor,
    Ceiling,
    Round,
    HalfEven,
    Abs,
}

/// Component extracted from a date/time, duration or QName value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOp {
    Year,
    YearAllowingZero,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    WholeSeconds,
    Microseconds,
    Timezone,
    LocalName,
    Namespace,
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePartOp {
    Name,
    LocalName,
    NamespaceUri,
    NodeName,
    DocumentUri,
    GenerateId,
    BaseUri,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Concat,
    String,
    StringLength,
    NormalizeSpace,
    UpperCase,
    LowerCase,
    Substring,
    Translate,
    StringJoin,
    StringToCodepoints,
    CodepointsToString,
    CodepointEqual,
    NormalizeUnicode,
    UnparsedEntity,
}

/// Functions that take an optional collation argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollatingOp {
    Compare,
    Contains,
    StartsWith,
    EndsWith,
    SubstringBefore,
    SubstringAfter,
    DistinctValues,
    IndexOf,
    DeepEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexOp {
    Matches,
    Replace,
    Tokenize,
    RegexGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimaxOp {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOp {
    Exists,
    Empty,
    InsertBefore,
    Remove,
    Reverse,
    Subsequence,
    Unordered,
    ZeroOrOne,
    OneOrMore,
    ExactlyOne,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Boolean,
    Not,
    True,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeOp {
    CurrentDateTime,
    CurrentDate,
    CurrentTime,
    ImplicitTimezone,
    Adjust,
    DateTimeConstructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOp {
    Root,
    Lang,
    InScopePrefixes,
    NamespaceForPrefix,
    Nilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOp {
    Id,
    ElementWithId,
    Idref,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QNameOp {
    QName,
    ResolveQName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriOp {
    EncodeForUri,
    IriToUri,
    EscapeHtmlUri,
    ResolveUri,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    Position,
    Last,
    Current,
    CurrentGroup,
    CurrentGroupingKey,
    SystemProperty,
    StaticBaseUri,
    DefaultCollation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailableOp {
    Function,
    Element,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    Doc,
    DocAvailable,
    Document,
    Collection,
    UnparsedText,
    UnparsedTextAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticOp {
    Error,
    Trace,
}

/// Implementation tag of a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Rounding(RoundingOp),
    Number,
    Component(ComponentOp),
    NamePart(NamePartOp),
    Strings(StringOp),
    Collating(CollatingOp),
    Regex(RegexOp),
    Aggregate(AggregateOp),
    Minimax(MinimaxOp),
    Sequences(SequenceOp),
    Boolean(BooleanOp),
    DateTime(DateTimeOp),
    FormatDate,
    FormatNumber,
    Nodes(NodeOp),
    Ids(IdOp),
    QNames(QNameOp),
    Uri(UriOp),
    Environment(EnvOp),
    Available(AvailableOp),
    Resources(ResourceOp),
    Diagnostics(DiagnosticOp),
}

/// What the caller knows about an argument expression at bind time.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticArg {
    Literal(XdmAtomicValue),
    EmptySequence,
    Dynamic,
}

pub struct BindContext<'a> {
    pub static_ctx: &'a StaticContext,
    pub args: &'a [StaticArg],
    pub entry: &'static Entry,
}

impl BindContext<'_> {
    /// Index of the collation argument when the call supplies it (always the last slot of
    /// the full signature).
    fn collation_arg(&self) -> Option<usize> {
        let max = self.entry.max_arity?;
        (self.args.len() == max).then(|| max - 1)
    }

    /// Resolve the collation at bind time: the default collation when the argument is absent,
    /// the named one when it is a literal. `None` means the name is only known at run time.
    fn static_collation(&self) -> Result<Option<Arc<dyn Collation>>, Error> {
        let sc = self.static_ctx;
        let uri = match self.collation_arg().map(|i| &self.args[i]) {
            None => sc.default_collation.clone().unwrap_or_else(|| crate::consts::CODEPOINT_URI.to_string()),
            Some(StaticArg::Literal(v)) => v.string_value(),
            Some(_) => return Ok(None),
        };
        resolve_collation(&sc.collations, &uri, sc.base_uri.as_deref()).map(Some)
    }
}

impl FunctionKind {
    /// Produce the immutable bound form of this function for one call site.
    pub fn bind(self, cx: &BindContext<'_>) -> Result<SystemFunction, Error> {
        Ok(match self {
            FunctionKind::FormatDate if !matches!(cx.args.len(), 2 | 5) => {
                return Err(Error::from_code(
                    ErrorCode::XPST0017,
                    format!("function {} must have either two or five arguments", cx.entry.name),
                ));
            }
            FunctionKind::Collating(op) => SystemFunction::Collating { op, collation: cx.static_collation()? },
            FunctionKind::Minimax(op) => SystemFunction::Minimax { op, collation: cx.static_collation()? },
            FunctionKind::FormatNumber => {
                let symbols = match cx.args.get(2) {
                    None => Some(cx.static_ctx.decimal_formats.default_symbols().clone()),
                    Some(StaticArg::Literal(v)) => Some(
                        format_number::resolve_format_name(cx.static_ctx, &v.string_value())?,
                    ),
                    Some(_) => None,
                };
                SystemFunction::FormatNumber { symbols }
            }
            other => SystemFunction::Plain(other),
        })
    }
}

/// A system function bound to a call site.
#[derive(Clone)]
pub enum SystemFunction {
    Plain(FunctionKind),
    Collating { op: CollatingOp, collation: Option<Arc<dyn Collation>> },
    Minimax { op: MinimaxOp, collation: Option<Arc<dyn Collation>> },
    FormatNumber { symbols: Option<DecimalSymbols> },
}

impl core::fmt::Debug for SystemFunction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SystemFunction::Plain(k) => write!(f, "Plain({k:?})"),
            SystemFunction::Collating { op, collation } => {
                write!(f, "Collating({op:?}, {:?})", collation.as_ref().map(|c| c.uri().to_string()))
            }
            SystemFunction::Minimax { op, collation } => {
                write!(f, "Minimax({op:?}, {:?})", collation.as_ref().map(|c| c.uri().to_string()))
            }
            SystemFunction::FormatNumber { symbols } => write!(f, "FormatNumber({})", symbols.is_some()),
        }
    }
}

impl SystemFunction {
    pub(crate) fn call<N: XdmNode>(&self, ctx: &CallCtx<N>, args: Args<N>) -> Result<SequenceIter<N>, Error> {
        match self {
            SystemFunction::Collating { op, collation } => collating::call(*op, collation.as_ref(), ctx, args),
            SystemFunction::Minimax { op, collation } => minimax::call(*op, collation.as_ref(), ctx, args),
            SystemFunction::FormatNumber { symbols } => format_number::call(symbols.as_ref(), ctx, args),
            SystemFunction::Plain(kind) => match *kind {
                FunctionKind::Rounding(op) => numeric::rounding(op, args),
                FunctionKind::Number => numeric::number(args),
                FunctionKind::Component(op) => datetime::component(op, args),
                FunctionKind::NamePart(op) => nodes::name_part(op, ctx, args),
                FunctionKind::Strings(op) => strings::call(op, ctx, args),
                FunctionKind::Collating(op) => collating::call(op, None, ctx, args),
                FunctionKind::Regex(op) => regex::call(op, ctx, args),
                FunctionKind::Aggregate(op) => aggregates::call(op, args),
                FunctionKind::Minimax(op) => minimax::call(op, None, ctx, args),
                FunctionKind::Sequences(op) => sequences::call(op, args),
                FunctionKind::Boolean(op) => boolean::call(op, args),
                FunctionKind::DateTime(op) => datetime::call(op, ctx, args),
                FunctionKind::FormatDate => format_date::call(ctx, args),
                FunctionKind::FormatNumber => format_number::call(None, ctx, args),
                FunctionKind::Nodes(op) => nodes::call(op, ctx, args),
                FunctionKind::Ids(op) => ids::call(op, ctx, args),
                FunctionKind::QNames(op) => qnames::call(op, ctx, args),
                FunctionKind::Uri(op) => uri::call(op, ctx, args),
                FunctionKind::Environment(op) => environment::call(op, ctx, args),
                FunctionKind::Available(op) => environment::available(op, ctx, args),
                FunctionKind::Resources(op) => environment::resource(op, ctx, args),
                FunctionKind::Diagnostics(op) => diagnostics::call(op, ctx, args),
            },
        }
    }
}

/// One row of the standard function table.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub min_arity: usize,
    /// `None` for variadic functions.
    pub max_arity: Option<usize>,
    pub argument_types: Vec<SequenceType>,
    pub result_type: SequenceType,
    pub applicability: Applicability,
    pub context_item_as_first_argument: bool,
    pub same_item_type_as_first_argument: bool,
}

impl Entry {
    /// Required type of argument `i`. Variadic functions declare a single slot that applies
    /// to every argument.
    pub fn argument_type(&self, i: usize) -> SequenceType {
        let slot = if self.max_arity.is_none() { 0 } else { i };
        self.argument_types.get(slot).copied().unwrap_or(SequenceType::ANY_SEQUENCE)
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        arity >= self.min_arity && self.max_arity.is_none_or(|m| arity <= m)
    }
}

struct EntryBuilder {
    key: &'static str,
    entry: Entry,
}

fn def(key: &'static str, kind: FunctionKind, result: SequenceType) -> EntryBuilder {
    let name = key.split_once('#').map_or(key, |(n, _)| n);
    EntryBuilder {
        key,
        entry: Entry {
            name,
            kind,
            min_arity: 0,
            max_arity: Some(0),
            argument_types: Vec::new(),
            result_type: result,
            applicability: Applicability::CORE,
            context_item_as_first_argument: false,
            same_item_type_as_first_argument: false,
        },
    }
}

impl EntryBuilder {
    fn arg(mut self, t: SequenceType) -> Self {
        self.entry.min_arity += 1;
        self.entry.max_arity = self.entry.max_arity.map(|m| m + 1);
        self.entry.argument_types.push(t);
        self
    }
    fn optional(mut self, t: SequenceType) -> Self {
        self.entry.max_arity = self.entry.max_arity.map(|m| m + 1);
        self.entry.argument_types.push(t);
        self
    }
    fn variadic(mut self) -> Self {
        self.entry.max_arity = None;
        self
    }
    fn xslt(mut self) -> Self {
        self.entry.applicability = Applicability::XSLT;
        self
    }
    fn use_when(mut self) -> Self {
        self.entry.applicability = Applicability::XSLT.with(Applicability::USE_WHEN);
        self
    }
    fn context_item(mut self) -> Self {
        self.entry.context_item_as_first_argument = true;
        self
    }
    fn same_type(mut self) -> Self {
        self.entry.same_item_type_as_first_argument = true;
        self
    }
}

/// The standard function table, keyed by `name` and `name#arity`.
pub struct FunctionTable {
    entries: HashMap<&'static str, Entry>,
}

impl FunctionTable {
    fn insert(&mut self, b: EntryBuilder) {
        self.entries.insert(b.key, b.entry);
    }

    /// Arity-qualified entry first, then the generic one.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Entry> {
        self.entries.get(format!("{name}#{arity}").as_str()).or_else(|| self.entries.get(name))
    }

    /// Whether any entry carries this local name.
    pub fn is_known_name(&self, name: &str) -> bool {
        self.entries.values().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}

static STANDARD_FUNCTIONS: OnceLock<FunctionTable> = OnceLock::new();

pub fn standard_functions() -> &'static FunctionTable {
    STANDARD_FUNCTIONS.get_or_init(|| {
        let table = build_table();
        tracing::debug!(entries = table.len(), "standard function table initialised");
        table
    })
}

const fn atomic(t: AtomicType, o: Occurrence) -> SequenceType {
    SequenceType::atomic(t, o)
}

use AtomicType as T;
use Occurrence::{ExactlyOne as ONE, OneOrMore as PLUS, ZeroOrMore as STAR, ZeroOrOne as OPT};

const ANY: SequenceType = SequenceType::ANY_SEQUENCE;
const ITEM: SequenceType = SequenceType::item(ONE);
const ITEM_OPT: SequenceType = SequenceType::item(OPT);
const NODE_OPT: SequenceType = SequenceType::node(OPT);
const NODE_STAR: SequenceType = SequenceType::node(STAR);
const DOC_OPT: SequenceType = SequenceType::new(ItemType::Node(NodeKind::Document), OPT);
const ELEM: SequenceType = SequenceType::new(ItemType::Node(NodeKind::Element), ONE);
const ELEM_STAR: SequenceType = SequenceType::new(ItemType::Node(NodeKind::Element), STAR);
const ATOM: SequenceType = atomic(T::AnyAtomic, ONE);
const ATOM_OPT: SequenceType = atomic(T::AnyAtomic, OPT);
const ATOM_STAR: SequenceType = atomic(T::AnyAtomic, STAR);
const INT: SequenceType = atomic(T::Integer, ONE);
const INT_OPT: SequenceType = atomic(T::Integer, OPT);
const INT_STAR: SequenceType = atomic(T::Integer, STAR);
const DBL: SequenceType = atomic(T::Double, ONE);
const DEC_OPT: SequenceType = atomic(T::Decimal, OPT);
const NUM_OPT: SequenceType = atomic(T::Numeric, OPT);
const STR: SequenceType = atomic(T::String, ONE);
const STR_OPT: SequenceType = atomic(T::String, OPT);
const STR_STAR: SequenceType = atomic(T::String, STAR);
const BOOL: SequenceType = atomic(T::Boolean, ONE);
const BOOL_OPT: SequenceType = atomic(T::Boolean, OPT);
const DT: SequenceType = atomic(T::DateTime, ONE);
const DT_OPT: SequenceType = atomic(T::DateTime, OPT);
const DATE: SequenceType = atomic(T::Date, ONE);
const DATE_OPT: SequenceType = atomic(T::Date, OPT);
const TIME: SequenceType = atomic(T::Time, ONE);
const TIME_OPT: SequenceType = atomic(T::Time, OPT);
const DUR_OPT: SequenceType = atomic(T::Duration, OPT);
const DTD: SequenceType = atomic(T::DayTimeDuration, ONE);
const DTD_OPT: SequenceType = atomic(T::DayTimeDuration, OPT);
const QNAME: SequenceType = atomic(T::QName, ONE);
const QNAME_OPT: SequenceType = atomic(T::QName, OPT);
const URI: SequenceType = atomic(T::AnyUri, ONE);
const URI_OPT: SequenceType = atomic(T::AnyUri, OPT);

fn build_table() -> FunctionTable {
    use ComponentOp as C;
    use FunctionKind as K;

    let mut t = FunctionTable { entries: HashMap::with_capacity(160) };

    // ===== Numeric =====
    t.insert(def("abs", K::Rounding(RoundingOp::Abs), NUM_OPT).arg(NUM_OPT).same_type());
    t.insert(def("ceiling", K::Rounding(RoundingOp::Ceiling), NUM_OPT).arg(NUM_OPT).same_type());
    t.insert(def("floor", K::Rounding(RoundingOp::Floor), NUM_OPT).arg(NUM_OPT).same_type());
    t.insert(def("round", K::Rounding(RoundingOp::Round), NUM_OPT).arg(NUM_OPT).same_type());
    t.insert(
        def("round-half-to-even", K::Rounding(RoundingOp::HalfEven), NUM_OPT).arg(NUM_OPT).optional(INT).same_type(),
    );
    t.insert(def("number", K::Number, DBL).arg(ATOM_OPT).context_item());

    // ===== Aggregates =====
    t.insert(def("avg", K::Aggregate(AggregateOp::Avg), ATOM_OPT).arg(ATOM_STAR));
    t.insert(def("count", K::Aggregate(AggregateOp::Count), INT).arg(ANY));
    t.insert(def("sum", K::Aggregate(AggregateOp::Sum), ATOM_OPT).arg(ATOM_STAR).optional(ATOM_OPT));
    t.insert(def("max", K::Minimax(MinimaxOp::Max), ATOM_OPT).arg(ATOM_STAR).optional(STR));
    t.insert(def("min", K::Minimax(MinimaxOp::Min), ATOM_OPT).arg(ATOM_STAR).optional(STR));

    // ===== Booleans =====
    t.insert(def("boolean", K::Boolean(BooleanOp::Boolean), BOOL).arg(ANY));
    t.insert(def("not", K::Boolean(BooleanOp::Not), BOOL).arg(ANY));
    t.insert(def("true", K::Boolean(BooleanOp::True), BOOL));
    t.insert(def("false", K::Boolean(BooleanOp::False), BOOL));

    // ===== Strings =====
    t.insert(def("concat", K::Strings(StringOp::Concat), STR).arg(ATOM_OPT).arg(ATOM_OPT).variadic());
    t.insert(def("string", K::Strings(StringOp::String), STR).arg(ITEM_OPT).context_item());
    t.insert(def("string-length#0", K::Strings(StringOp::StringLength), INT));
    t.insert(def("string-length#1", K::Strings(StringOp::StringLength), INT).arg(STR_OPT));
    t.insert(def("normalize-space#0", K::Strings(StringOp::NormalizeSpace), STR));
    t.insert(def("normalize-space#1", K::Strings(StringOp::NormalizeSpace), STR).arg(STR_OPT));
    t.insert(def("upper-case", K::Strings(StringOp::UpperCase), STR).arg(STR_OPT));
    t.insert(def("lower-case", K::Strings(StringOp::LowerCase), STR).arg(STR_OPT));
    t.insert(def("substring", K::Strings(StringOp::Substring), STR).arg(STR_OPT).arg(DBL).optional(DBL));
    t.insert(def("translate", K::Strings(StringOp::Translate), STR).arg(STR_OPT).arg(STR).arg(STR));
    t.insert(def("string-join", K::Strings(StringOp::StringJoin), STR).arg(STR_STAR).arg(STR));
    t.insert(def("string-to-codepoints", K::Strings(StringOp::StringToCodepoints), INT_STAR).arg(STR_OPT));
    t.insert(def("codepoints-to-string", K::Strings(StringOp::CodepointsToString), STR).arg(INT_STAR));
    t.insert(def("codepoint-equal", K::Strings(StringOp::CodepointEqual), BOOL_OPT).arg(STR_OPT).arg(STR_OPT));
    t.insert(def("normalize-unicode", K::Strings(StringOp::NormalizeUnicode), STR).arg(STR_OPT).optional(STR));
    t.insert(def("unparsed-entity-uri", K::Strings(StringOp::UnparsedEntity), URI).arg(STR).xslt());
    t.insert(def("unparsed-entity-public-id", K::Strings(StringOp::UnparsedEntity), STR).arg(STR).xslt());

    // ===== Collation-aware =====
    t.insert(def("compare", K::Collating(CollatingOp::Compare), INT_OPT).arg(STR_OPT).arg(STR_OPT).optional(STR));
    t.insert(def("contains", K::Collating(CollatingOp::Contains), BOOL).arg(STR_OPT).arg(STR_OPT).optional(STR));
    t.insert(def("starts-with", K::Collating(CollatingOp::StartsWith), BOOL).arg(STR_OPT).arg(STR_OPT).optional(STR));
    t.insert(def("ends-with", K::Collating(CollatingOp::EndsWith), BOOL).arg(STR_OPT).arg(STR_OPT).optional(STR));
    t.insert(
        def("substring-before", K::Collating(CollatingOp::SubstringBefore), STR).arg(STR_OPT).arg(STR_OPT).optional(STR),
    );
    t.insert(
        def("substring-after", K::Collating(CollatingOp::SubstringAfter), STR).arg(STR_OPT).arg(STR_OPT).optional(STR),
    );
    t.insert(def("distinct-values", K::Collating(CollatingOp::DistinctValues), ATOM_STAR).arg(ATOM_STAR).optional(STR));
    t.insert(def("index-of", K::Collating(CollatingOp::IndexOf), INT_STAR).arg(ATOM_STAR).arg(ATOM).optional(STR));
    t.insert(def("deep-equal", K::Collating(CollatingOp::DeepEqual), BOOL).arg(ANY).arg(ANY).optional(STR));

    // ===== Regular expressions =====
    t.insert(def("matches", K::Regex(RegexOp::Matches), BOOL).arg(STR_OPT).arg(STR).optional(STR));
    t.insert(def("replace", K::Regex(RegexOp::Replace), STR).arg(STR_OPT).arg(STR).arg(STR).optional(STR));
    t.insert(def("tokenize", K::Regex(RegexOp::Tokenize), STR_STAR).arg(STR_OPT).arg(STR).optional(STR));
    t.insert(def("regex-group", K::Regex(RegexOp::RegexGroup), STR).arg(INT).xslt());

    // ===== Sequences =====
    t.insert(def("empty", K::Sequences(SequenceOp::Empty), BOOL).arg(ANY));
    t.insert(def("exists", K::Sequences(SequenceOp::Exists), BOOL).arg(ANY));
    t.insert(def("insert-before", K::Sequences(SequenceOp::InsertBefore), ANY).arg(ANY).arg(INT).arg(ANY));
    t.insert(def("remove", K::Sequences(SequenceOp::Remove), ANY).arg(ANY).arg(INT).same_type());
    t.insert(def("reverse", K::Sequences(SequenceOp::Reverse), ANY).arg(ANY));
    t.insert(def("subsequence", K::Sequences(SequenceOp::Subsequence), ANY).arg(ANY).arg(DBL).optional(DBL).same_type());
    t.insert(def("unordered", K::Sequences(SequenceOp::Unordered), ANY).arg(ANY).same_type());
    t.insert(def("zero-or-one", K::Sequences(SequenceOp::ZeroOrOne), ITEM_OPT).arg(ANY).same_type());
    t.insert(def("one-or-more", K::Sequences(SequenceOp::OneOrMore), SequenceType::item(PLUS)).arg(ANY).same_type());
    t.insert(def("exactly-one", K::Sequences(SequenceOp::ExactlyOne), ITEM).arg(ANY).same_type());
    t.insert(def("data", K::Sequences(SequenceOp::Data), ATOM_STAR).arg(ANY));

    // ===== Date/time =====
    t.insert(def("adjust-date-to-timezone", K::DateTime(DateTimeOp::Adjust), DATE_OPT).arg(DATE_OPT).optional(DTD_OPT));
    t.insert(def("adjust-dateTime-to-timezone", K::DateTime(DateTimeOp::Adjust), DT_OPT).arg(DT_OPT).optional(DTD_OPT));
    t.insert(def("adjust-time-to-timezone", K::DateTime(DateTimeOp::Adjust), TIME_OPT).arg(TIME_OPT).optional(DTD_OPT));
    t.insert(def("current-date", K::DateTime(DateTimeOp::CurrentDate), DATE));
    t.insert(def("current-dateTime", K::DateTime(DateTimeOp::CurrentDateTime), DT));
    t.insert(def("current-time", K::DateTime(DateTimeOp::CurrentTime), TIME));
    t.insert(def("implicit-timezone", K::DateTime(DateTimeOp::ImplicitTimezone), DTD));
    t.insert(def("dateTime", K::DateTime(DateTimeOp::DateTimeConstructor), DT_OPT).arg(DATE_OPT).arg(TIME_OPT));
    let components: [(&'static str, ComponentOp, SequenceType, SequenceType); 21] = [
        ("year-from-date", C::Year, INT_OPT, DATE_OPT),
        ("year-from-dateTime", C::Year, INT_OPT, DT_OPT),
        ("years-from-duration", C::Year, INT_OPT, DUR_OPT),
        ("month-from-date", C::Month, INT_OPT, DATE_OPT),
        ("month-from-dateTime", C::Month, INT_OPT, DT_OPT),
        ("months-from-duration", C::Month, INT_OPT, DUR_OPT),
        ("day-from-date", C::Day, INT_OPT, DATE_OPT),
        ("day-from-dateTime", C::Day, INT_OPT, DT_OPT),
        ("days-from-duration", C::Day, INT_OPT, DUR_OPT),
        ("hours-from-dateTime", C::Hours, INT_OPT, DT_OPT),
        ("hours-from-duration", C::Hours, INT_OPT, DUR_OPT),
        ("hours-from-time", C::Hours, INT_OPT, TIME_OPT),
        ("minutes-from-dateTime", C::Minutes, INT_OPT, DT_OPT),
        ("minutes-from-duration", C::Minutes, INT_OPT, DUR_OPT),
        ("minutes-from-time", C::Minutes, INT_OPT, TIME_OPT),
        ("seconds-from-dateTime", C::Seconds, DEC_OPT, DT_OPT),
        ("seconds-from-duration", C::Seconds, DEC_OPT, DUR_OPT),
        ("seconds-from-time", C::Seconds, DEC_OPT, TIME_OPT),
        ("timezone-from-date", C::Timezone, DTD_OPT, DATE_OPT),
        ("timezone-from-dateTime", C::Timezone, DTD_OPT, DT_OPT),
        ("timezone-from-time", C::Timezone, DTD_OPT, TIME_OPT),
    ];
    for (name, op, result, arg) in components {
        t.insert(def(name, K::Component(op), result).arg(arg));
    }
    t.insert(def("local-name-from-QName", K::Component(C::LocalName), STR_OPT).arg(QNAME_OPT));
    t.insert(def("namespace-uri-from-QName", K::Component(C::Namespace), URI_OPT).arg(QNAME_OPT));
    t.insert(def("prefix-from-QName", K::Component(C::Prefix), STR_OPT).arg(QNAME_OPT));

    // ===== Formatting (XSLT) =====
    for (name, arg) in [("format-date", DATE_OPT), ("format-dateTime", DT_OPT), ("format-time", TIME_OPT)] {
        t.insert(
            def(name, K::FormatDate, STR_OPT)
                .arg(arg)
                .arg(STR)
                .optional(STR_OPT)
                .optional(STR_OPT)
                .optional(STR_OPT)
                .xslt(),
        );
    }
    t.insert(def("format-number", K::FormatNumber, STR).arg(NUM_OPT).arg(STR).optional(STR).xslt());

    // ===== Nodes and names =====
    t.insert(def("base-uri", K::NamePart(NamePartOp::BaseUri), URI_OPT).arg(NODE_OPT).context_item());
    t.insert(def("document-uri", K::NamePart(NamePartOp::DocumentUri), URI_OPT).arg(NODE_STAR));
    t.insert(def("generate-id", K::NamePart(NamePartOp::GenerateId), STR).arg(NODE_OPT).context_item().xslt());
    t.insert(def("local-name", K::NamePart(NamePartOp::LocalName), STR).arg(NODE_OPT).context_item());
    t.insert(def("name", K::NamePart(NamePartOp::Name), STR).arg(NODE_OPT).context_item());
    t.insert(def("namespace-uri", K::NamePart(NamePartOp::NamespaceUri), URI).arg(NODE_OPT).context_item());
    t.insert(def("node-name", K::NamePart(NamePartOp::NodeName), QNAME_OPT).arg(NODE_OPT));
    t.insert(def("root", K::Nodes(NodeOp::Root), NODE_OPT).arg(NODE_OPT).context_item());
    t.insert(def("lang", K::Nodes(NodeOp::Lang), BOOL).arg(STR_OPT).optional(SequenceType::node(ONE)));
    t.insert(def("in-scope-prefixes", K::Nodes(NodeOp::InScopePrefixes), STR_STAR).arg(ELEM));
    t.insert(def("namespace-uri-for-prefix", K::Nodes(NodeOp::NamespaceForPrefix), URI_OPT).arg(STR_OPT).arg(ELEM));
    t.insert(def("nilled", K::Nodes(NodeOp::Nilled), BOOL_OPT).arg(NODE_OPT));
    t.insert(def("id", K::Ids(IdOp::Id), ELEM_STAR).arg(STR_STAR).optional(SequenceType::node(ONE)));
    t.insert(def("element-with-id", K::Ids(IdOp::ElementWithId), ELEM_STAR).arg(STR_STAR).optional(SequenceType::node(ONE)));
    t.insert(def("idref", K::Ids(IdOp::Idref), NODE_STAR).arg(STR_STAR).optional(SequenceType::node(ONE)));
    t.insert(def("key", K::Ids(IdOp::Key), NODE_STAR).arg(STR).arg(ATOM_STAR).optional(SequenceType::node(ONE)).xslt());

    // ===== QNames and URIs =====
    t.insert(def("QName", K::QNames(QNameOp::QName), QNAME).arg(STR_OPT).arg(STR));
    t.insert(def("resolve-QName", K::QNames(QNameOp::ResolveQName), QNAME_OPT).arg(STR_OPT).arg(ELEM));
    t.insert(def("encode-for-uri", K::Uri(UriOp::EncodeForUri), STR).arg(STR_OPT));
    t.insert(def("iri-to-uri", K::Uri(UriOp::IriToUri), STR).arg(STR_OPT));
    t.insert(def("escape-html-uri", K::Uri(UriOp::EscapeHtmlUri), STR).arg(STR_OPT));
    t.insert(def("resolve-uri", K::Uri(UriOp::ResolveUri), URI_OPT).arg(STR_OPT).optional(STR));

    // ===== Context and environment =====
    t.insert(def("position", K::Environment(EnvOp::Position), INT));
    t.insert(def("last", K::Environment(EnvOp::Last), INT));
    t.insert(def("current", K::Environment(EnvOp::Current), ITEM).xslt());
    t.insert(def("current-group", K::Environment(EnvOp::CurrentGroup), ANY).xslt());
    t.insert(def("current-grouping-key", K::Environment(EnvOp::CurrentGroupingKey), ATOM_OPT).xslt());
    t.insert(def("system-property", K::Environment(EnvOp::SystemProperty), STR).arg(STR).use_when());
    t.insert(def("static-base-uri", K::Environment(EnvOp::StaticBaseUri), URI_OPT));
    t.insert(def("default-collation", K::Environment(EnvOp::DefaultCollation), STR));
    t.insert(def("element-available", K::Available(AvailableOp::Element), BOOL).arg(STR).use_when());
    t.insert(def("function-available", K::Available(AvailableOp::Function), BOOL).arg(STR).optional(INT).use_when());
    t.insert(def("type-available", K::Available(AvailableOp::Type), BOOL).arg(STR).use_when());

    // ===== Resources =====
    t.insert(def("doc", K::Resources(ResourceOp::Doc), DOC_OPT).arg(STR_OPT));
    t.insert(def("doc-available", K::Resources(ResourceOp::DocAvailable), BOOL).arg(STR_OPT));
    t.insert(def("document", K::Resources(ResourceOp::Document), NODE_STAR).arg(ANY).optional(SequenceType::node(ONE)).xslt());
    t.insert(def("collection", K::Resources(ResourceOp::Collection), NODE_STAR).optional(STR_OPT));
    t.insert(def("unparsed-text", K::Resources(ResourceOp::UnparsedText), STR_OPT).arg(STR_OPT).optional(STR).xslt());
    t.insert(
        def("unparsed-text-available", K::Resources(ResourceOp::UnparsedTextAvailable), BOOL).arg(STR_OPT).optional(STR).xslt(),
    );

    // ===== Diagnostics =====
    t.insert(def("error", K::Diagnostics(DiagnosticOp::Error), SequenceType::new(ItemType::AnyItem, OPT))
        .optional(QNAME_OPT)
        .optional(STR)
        .optional(ANY));
    t.insert(def("trace", K::Diagnostics(DiagnosticOp::Trace), ANY).arg(ANY).arg(STR));

    t
}
