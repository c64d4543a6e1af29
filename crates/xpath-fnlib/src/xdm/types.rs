use crate::model::NodeKind;
use core::fmt;

/// Built-in atomic types known to the function library.
///
/// The lattice is the XPath 2.0 one restricted to the primitive types plus the two
/// duration subtypes and `xs:integer`; abstract members (`AnyAtomic`, `Numeric`) only
/// appear in signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomic,
    Numeric,
    String,
    Boolean,
    Decimal,
    Integer,
    Float,
    Double,
    Duration,
    DayTimeDuration,
    YearMonthDuration,
    DateTime,
    Date,
    Time,
    AnyUri,
    QName,
    UntypedAtomic,
}

impl AtomicType {
    /// The primitive type this type derives from. `xs:integer` reports `xs:decimal`,
    /// the duration subtypes report `xs:duration`.
    pub fn primitive(self) -> AtomicType {
        match self {
            AtomicType::Integer => AtomicType::Decimal,
            AtomicType::DayTimeDuration | AtomicType::YearMonthDuration => AtomicType::Duration,
            other => other,
        }
    }

    pub fn is_primitive_numeric(self) -> bool {
        matches!(
            self,
            AtomicType::Integer | AtomicType::Decimal | AtomicType::Float | AtomicType::Double | AtomicType::Numeric
        )
    }

    /// Whether values of this type support `lt`/`gt` ordering. Plain `xs:duration`
    /// and `xs:QName` only support equality.
    pub fn is_ordered(self) -> bool {
        !matches!(self, AtomicType::Duration | AtomicType::QName | AtomicType::AnyAtomic)
    }

    pub fn is_string_like(self) -> bool {
        matches!(self, AtomicType::String | AtomicType::AnyUri | AtomicType::UntypedAtomic)
    }

    pub fn is_calendar(self) -> bool {
        matches!(self, AtomicType::DateTime | AtomicType::Date | AtomicType::Time)
    }

    pub fn is_duration(self) -> bool {
        matches!(self, AtomicType::Duration | AtomicType::DayTimeDuration | AtomicType::YearMonthDuration)
    }

    /// Subtype test in the restricted lattice (reflexive).
    pub fn is_subtype_of(self, other: AtomicType) -> bool {
        if self == other || other == AtomicType::AnyAtomic {
            return true;
        }
        match other {
            AtomicType::Numeric => self.is_primitive_numeric(),
            AtomicType::Decimal => self == AtomicType::Integer,
            AtomicType::Duration => self.is_duration(),
            _ => false,
        }
    }

    /// Two values can be compared with `eq` when their primitive types agree, both are
    /// numeric, or both are string-like.
    pub fn is_comparable_with(self, other: AtomicType) -> bool {
        let (a, b) = (self.primitive(), other.primitive());
        a == b
            || (a.is_primitive_numeric() && b.is_primitive_numeric())
            || (a.is_string_like() && b.is_string_like())
    }

    pub fn local_name(self) -> &'static str {
        match self {
            AtomicType::AnyAtomic => "anyAtomicType",
            AtomicType::Numeric => "numeric",
            AtomicType::String => "string",
            AtomicType::Boolean => "boolean",
            AtomicType::Decimal => "decimal",
            AtomicType::Integer => "integer",
            AtomicType::Float => "float",
            AtomicType::Double => "double",
            AtomicType::Duration => "duration",
            AtomicType::DayTimeDuration => "dayTimeDuration",
            AtomicType::YearMonthDuration => "yearMonthDuration",
            AtomicType::DateTime => "dateTime",
            AtomicType::Date => "date",
            AtomicType::Time => "time",
            AtomicType::AnyUri => "anyURI",
            AtomicType::QName => "QName",
            AtomicType::UntypedAtomic => "untypedAtomic",
        }
    }

    /// Resolve a local name in the XML Schema namespace. Abstract types are excluded
    /// because they cannot be used as cast targets.
    pub fn from_local_name(local: &str) -> Option<AtomicType> {
        Some(match local {
            "string" => AtomicType::String,
            "boolean" => AtomicType::Boolean,
            "decimal" => AtomicType::Decimal,
            "integer" => AtomicType::Integer,
            "float" => AtomicType::Float,
            "double" => AtomicType::Double,
            "duration" => AtomicType::Duration,
            "dayTimeDuration" => AtomicType::DayTimeDuration,
            "yearMonthDuration" => AtomicType::YearMonthDuration,
            "dateTime" => AtomicType::DateTime,
            "date" => AtomicType::Date,
            "time" => AtomicType::Time,
            "anyURI" => AtomicType::AnyUri,
            "QName" => AtomicType::QName,
            "untypedAtomic" => AtomicType::UntypedAtomic,
            _ => return None,
        })
    }

    /// Every concrete type, in declaration order. Used for constructor registration and
    /// `type-available`.
    pub const CONCRETE: [AtomicType; 15] = [
        AtomicType::String,
        AtomicType::Boolean,
        AtomicType::Decimal,
        AtomicType::Integer,
        AtomicType::Float,
        AtomicType::Double,
        AtomicType::Duration,
        AtomicType::DayTimeDuration,
        AtomicType::YearMonthDuration,
        AtomicType::DateTime,
        AtomicType::Date,
        AtomicType::Time,
        AtomicType::AnyUri,
        AtomicType::QName,
        AtomicType::UntypedAtomic,
    ];
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    AnyItem,
    AnyNode,
    Node(NodeKind),
    Atomic(AtomicType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn allows_many(self) -> bool {
        matches!(self, Occurrence::ZeroOrMore | Occurrence::OneOrMore)
    }
    pub fn allows_zero(self) -> bool {
        matches!(self, Occurrence::ZeroOrOne | Occurrence::ZeroOrMore)
    }
}

/// An item type plus an occurrence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceType {
    pub item: ItemType,
    pub occurrence: Occurrence,
}

impl SequenceType {
    pub const ANY_SEQUENCE: SequenceType = SequenceType { item: ItemType::AnyItem, occurrence: Occurrence::ZeroOrMore };

    pub const fn new(item: ItemType, occurrence: Occurrence) -> Self {
        Self { item, occurrence }
    }
    pub const fn atomic(t: AtomicType, occurrence: Occurrence) -> Self {
        Self { item: ItemType::Atomic(t), occurrence }
    }
    pub const fn node(occurrence: Occurrence) -> Self {
        Self { item: ItemType::AnyNode, occurrence }
    }
    pub const fn item(occurrence: Occurrence) -> Self {
        Self { item: ItemType::AnyItem, occurrence }
    }
    pub fn atomic_type(&self) -> Option<AtomicType> {
        match self.item {
            ItemType::Atomic(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            ItemType::AnyItem => write!(f, "item()")?,
            ItemType::AnyNode => write!(f, "node()")?,
            ItemType::Node(NodeKind::Document) => write!(f, "document-node()")?,
            ItemType::Node(NodeKind::Element) => write!(f, "element()")?,
            ItemType::Node(NodeKind::Attribute) => write!(f, "attribute()")?,
            ItemType::Node(_) => write!(f, "node()")?,
            ItemType::Atomic(t) => write!(f, "{t}")?,
        }
        match self.occurrence {
            Occurrence::ExactlyOne => Ok(()),
            Occurrence::ZeroOrOne => write!(f, "?"),
            Occurrence::ZeroOrMore => write!(f, "*"),
            Occurrence::OneOrMore => write!(f, "+"),
        }
    }
}
