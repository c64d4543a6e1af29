use crate::consts::{CODEPOINT_URI, ERR_NS, FNS, XML_URI};
use crate::engine::collation::{Collation, CollationRegistry};
use crate::engine::comparer::{AtomicComparer, ComparisonKey, GenericAtomicComparer, mask_incomparable};
use crate::engine::functions::format_number::DecimalFormatManager;
use crate::engine::library::FunctionLibraryList;
use crate::model::{NodeKind, XdmNode};
use crate::xdm::temporal::MAX_TZ_MINUTES;
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmItem, XdmSequence};
use core::fmt;
use core::num::NonZeroUsize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// No library knows the name.
    Unknown(ExpandedName),
    /// The name is known, but not for the requested arity.
    WrongArity { name: ExpandedName, arity: Arity },
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unknown(name) => Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}")),
            ResolveError::WrongArity { name, arity } => Error::from_code(
                ErrorCode::XPST0017,
                format!("function {name} cannot be called with {}", plural_arguments(arity)),
            ),
        }
    }
}

fn plural_arguments(n: Arity) -> String {
    match n {
        0 => "no arguments".to_string(),
        1 => "one argument".to_string(),
        n => format!("{n} arguments"),
    }
}

/// Everything a function implementation may consult at call time.
pub struct CallCtx<'a, N> {
    pub dyn_ctx: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
}

impl<'a, N: XdmNode> CallCtx<'a, N> {
    pub fn new(dyn_ctx: &'a DynamicContext<N>, static_ctx: &'a StaticContext) -> Self {
        Self { dyn_ctx, static_ctx }
    }

    pub fn context_item(&self) -> Result<&XdmItem<N>, Error> {
        self.dyn_ctx
            .context_item
            .as_ref()
            .ok_or_else(|| Error::from_code(ErrorCode::XPDY0002, "context item is undefined"))
    }

    /// The context item, which must be a node.
    pub fn context_node(&self) -> Result<&N, Error> {
        match self.context_item()? {
            XdmItem::Node(n) => Ok(n),
            XdmItem::Atomic(_) => Err(Error::from_code(ErrorCode::XPTY0004, "context item is not a node")),
        }
    }

    pub fn implicit_timezone(&self) -> i16 {
        self.dyn_ctx.implicit_timezone
    }

    pub fn regex(&self) -> &dyn RegexProvider {
        self.dyn_ctx.regex.as_ref()
    }

    /// Resolve a collation URI (relative URIs against the static base URI). `None` selects
    /// the default collation.
    pub fn collation(&self, uri: Option<&str>) -> Result<Arc<dyn Collation>, Error> {
        let uri = uri.or(self.static_ctx.default_collation.as_deref()).unwrap_or(CODEPOINT_URI);
        crate::engine::collation::resolve_collation(
            &self.dyn_ctx.collations,
            uri,
            self.static_ctx.base_uri.as_deref(),
        )
    }

    pub fn comparer(&self, collation: Arc<dyn Collation>) -> GenericAtomicComparer {
        GenericAtomicComparer::new(collation, self.implicit_timezone())
    }

    /// Resolve a prefix against the static in-scope namespaces. The empty prefix maps to no
    /// namespace.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        self.static_ctx.namespaces.by_prefix.get(prefix).cloned()
    }
}

// Node-producing resolver for host adapters that can construct N directly
pub trait NodeResolver<N>: Send + Sync {
    fn doc_node(&self, _uri: &str) -> Result<Option<N>, Error> {
        Ok(None)
    }
    fn collection_nodes(&self, _uri: Option<&str>) -> Result<Vec<N>, Error> {
        Ok(vec![])
    }
}

/// Loads text resources for `unparsed-text`.
pub trait TextResolver: Send + Sync {
    fn load_text(&self, uri: &str, encoding: Option<&str>) -> Result<String, Error>;
}

/// Receives `fn:trace` events when installed on the dynamic context.
pub trait TraceListener<N>: Send + Sync {
    fn trace(&self, label: &str, value: &[XdmItem<N>]);
}

pub trait RegexProvider: Send + Sync {
    fn matches(&self, pattern: &str, flags: &str, text: &str) -> Result<bool, Error>;
    fn replace(&self, pattern: &str, flags: &str, text: &str, replacement: &str) -> Result<String, Error>;
    fn tokenize(&self, pattern: &str, flags: &str, text: &str) -> Result<Vec<String>, Error>;
}

const REGEX_CACHE_SIZE: usize = 64;

/// Backreference-capable regex provider based on fancy-regex (backtracking engine).
/// Compiled patterns are kept in a small LRU cache keyed by pattern and flags.
pub struct FancyRegexProvider {
    cache: Mutex<lru::LruCache<(String, String), Arc<fancy_regex::Regex>>>,
}

impl Default for FancyRegexProvider {
    fn default() -> Self {
        let cap = NonZeroUsize::new(REGEX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self { cache: Mutex::new(lru::LruCache::new(cap)) }
    }
}

impl FancyRegexProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, pattern: &str, flags: &str) -> Result<Arc<fancy_regex::Regex>, Error> {
        let key = (pattern.to_string(), flags.to_string());
        if let Ok(mut cache) = self.cache.lock()
            && let Some(re) = cache.get(&key)
        {
            return Ok(re.clone());
        }
        let re = Arc::new(Self::build_with_flags(pattern, flags)?);
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, re.clone());
        }
        Ok(re)
    }

    fn build_with_flags(pattern: &str, flags: &str) -> Result<fancy_regex::Regex, Error> {
        let mut builder = fancy_regex::RegexBuilder::new(pattern);
        for ch in flags.chars() {
            match ch {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.verbose_mode(true);
                }
                _ => {
                    return Err(Error::from_code(ErrorCode::FORX0001, format!("invalid regex flag: {ch}")));
                }
            }
        }
        builder.build().map_err(|e| {
            Error::from_code(ErrorCode::FORX0002, format!("invalid regex pattern '{pattern}'"))
                .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
        })
    }

    fn reject_empty_match(re: &fancy_regex::Regex, function: &str) -> Result<(), Error> {
        if re.is_match("")? {
            return Err(Error::from_code(
                ErrorCode::FORX0003,
                format!("the pattern passed to {function}() matches a zero-length string"),
            ));
        }
        Ok(())
    }
}

enum ReplacementPart {
    Literal(String),
    Group(usize),
}

/// Parse an XPath replacement string: `\\`, `\$` and `$N` are the only escapes.
fn parse_replacement(replacement: &str, groups: usize) -> Result<Vec<ReplacementPart>, Error> {
    let invalid = |msg: &str| Error::from_code(ErrorCode::FORX0004, format!("invalid replacement string: {msg}"));
    let mut parts = Vec::new();
    let mut lit = String::new();
    let chars: Vec<char> = replacement.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => match chars.get(i + 1) {
                Some(c @ ('\\' | '$')) => {
                    lit.push(*c);
                    i += 2;
                }
                _ => return Err(invalid("'\\' must be followed by '\\' or '$'")),
            },
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start {
                    return Err(invalid("'$' must be followed by a digit"));
                }
                // Take the longest digit prefix that names an existing group.
                let mut n = 0usize;
                let mut used = start;
                for (k, c) in chars[start..end].iter().enumerate() {
                    let candidate = n * 10 + c.to_digit(10).map_or(0, |d| d as usize);
                    if k > 0 && candidate > groups {
                        break;
                    }
                    n = candidate;
                    used = start + k + 1;
                }
                if !lit.is_empty() {
                    parts.push(ReplacementPart::Literal(core::mem::take(&mut lit)));
                }
                parts.push(ReplacementPart::Group(n));
                i = used;
            }
            c => {
                lit.push(c);
                i += 1;
            }
        }
    }
    if !lit.is_empty() {
        parts.push(ReplacementPart::Literal(lit));
    }
    Ok(parts)
}

impl RegexProvider for FancyRegexProvider {
    fn matches(&self, pattern: &str, flags: &str, text: &str) -> Result<bool, Error> {
        let re = self.compile(pattern, flags)?;
        Ok(re.is_match(text)?)
    }

    fn replace(&self, pattern: &str, flags: &str, text: &str, replacement: &str) -> Result<String, Error> {
        let re = self.compile(pattern, flags)?;
        Self::reject_empty_match(&re, "replace")?;
        let parts = parse_replacement(replacement, re.captures_len().saturating_sub(1))?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let caps = caps?;
            let Some(m) = caps.get(0) else { continue };
            out.push_str(&text[last..m.start()]);
            for part in &parts {
                match part {
                    ReplacementPart::Literal(s) => out.push_str(s),
                    ReplacementPart::Group(g) => {
                        if let Some(gm) = caps.get(*g) {
                            out.push_str(gm.as_str());
                        }
                    }
                }
            }
            last = m.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn tokenize(&self, pattern: &str, flags: &str, text: &str) -> Result<Vec<String>, Error> {
        let re = self.compile(pattern, flags)?;
        Self::reject_empty_match(&re, "tokenize")?;
        let mut tokens = Vec::new();
        for part in re.split(text) {
            tokens.push(part?.to_string());
        }
        Ok(tokens)
    }
}

macro_rules! error_codes {
    ($($code:ident),* $(,)?) => {
        /// Error codes raised by the library, all in the `err:` namespace.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($code,)*
            /// Any code outside the set above (user codes from `fn:error`, host codes).
            Unknown,
        }

        impl ErrorCode {
            pub fn local_name(&self) -> &'static str {
                match self {
                    $(ErrorCode::$code => stringify!($code),)*
                    ErrorCode::Unknown => "UNKNOWN",
                }
            }

            pub fn from_code(s: &str) -> Self {
                let local = s.strip_prefix("err:").unwrap_or(s);
                match local {
                    $(stringify!($code) => ErrorCode::$code,)*
                    _ => ErrorCode::Unknown,
                }
            }
        }
    };
}

error_codes!(
    FOAR0001, FOAR0002, FOCA0002, FOCH0001, FOCH0002, FOCH0003, FOCH0004, FODC0001, FODC0002, FODC0004, FODC0005,
    FODT0001, FODT0002, FODT0003, FOER0000, FONS0004, FONS0005, FORG0001, FORG0002, FORG0003, FORG0004,
    FORG0005, FORG0006, FORG0008, FORG0009, FORX0001, FORX0002, FORX0003, FORX0004, FOTY0012, FOTY0015,
    XPDY0002, XPST0017, XPTY0004, XTDE0640, XTDE1170, XTDE1190, XTDE1260, XTDE1270, XTDE1280, XTDE1310,
    XTDE1340, XTDE1350, XTDE1360, XTDE1390, XTDE1400, XTDE1425, XTDE1428, XTDE1440, XTSE1290, XTSE1295,
    XTSE1300,
);

impl ErrorCode {
    /// Returns the QName (ExpandedName) for this error code.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName { ns_uri: Some(ERR_NS.to_string()), local: self.local_name().to_string() }
    }
}

/// Error category, derived from the code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Static,
    Dynamic,
    Type,
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new_qname(code.qname(), msg)
    }

    pub fn code_enum(&self) -> ErrorCode {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&self.code.local)
        } else {
            ErrorCode::Unknown
        }
    }

    pub fn kind(&self) -> ErrorKind {
        let local = self.code.local.as_str();
        if local.starts_with("XPST") || local.starts_with("XTSE") {
            ErrorKind::Static
        } else if local.starts_with("XPTY") || local.starts_with("FOTY") {
            ErrorKind::Type
        } else {
            ErrorKind::Dynamic
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    /// Format the code as `err:LOCAL` or `Q{ns}local`.
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else if let Some(ns) = &self.code.ns_uri {
            format!("Q{{{}}}{}", ns, self.code.local)
        } else {
            self.code.local.clone()
        }
    }

    /// Compose an error with a source cause.
    pub fn with_source(mut self, source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>) -> Self {
        self.source = source.into();
        self
    }

    /// Parse an error code string (`err:FOER0000` or `Q{ns}local`) into an ExpandedName.
    pub fn parse_code(s: &str) -> ExpandedName {
        if let Some(rest) = s.strip_prefix("err:") {
            return ExpandedName { ns_uri: Some(ERR_NS.to_string()), local: rest.to_string() };
        }
        if let Some((ns, local)) = s.strip_prefix("Q{").and_then(|t| t.split_once('}')) {
            return ExpandedName { ns_uri: Some(ns.to_string()), local: local.to_string() };
        }
        ExpandedName { ns_uri: None, local: s.to_string() }
    }
}

impl From<fancy_regex::Error> for Error {
    fn from(e: fancy_regex::Error) -> Self {
        Error::from_code(ErrorCode::FORX0002, "regex error")
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::from_code(ErrorCode::FORG0002, format!("invalid URI: {e}"))
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::from_code(ErrorCode::FODC0005, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostLanguage {
    #[default]
    XPath,
    Xslt,
}

#[derive(Debug, Clone)]
pub struct StaticContext {
    pub base_uri: Option<String>,
    pub default_function_namespace: Option<String>,
    pub default_collation: Option<String>,
    pub namespaces: NamespaceBindings,
    pub host_language: HostLanguage,
    /// Compiling a `use-when` expression: only functions marked for use-when are available.
    pub use_when: bool,
    pub decimal_formats: DecimalFormatManager,
    pub key_names: HashSet<ExpandedName>,
    /// Collations known at compile time, used to resolve literal collation arguments.
    pub collations: Arc<CollationRegistry>,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        ns.by_prefix.insert("xml".to_string(), XML_URI.to_string());
        Self {
            base_uri: None,
            default_function_namespace: Some(FNS.to_string()),
            default_collation: Some(CODEPOINT_URI.to_string()),
            namespaces: ns,
            host_language: HostLanguage::XPath,
            use_when: false,
            decimal_formats: DecimalFormatManager::default(),
            key_names: HashSet::new(),
            collations: Arc::new(CollationRegistry::default()),
        }
    }
}

/// Builder for `StaticContext`. The `xml` prefix binding cannot be overridden.
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self { ctx: StaticContext::default() }
    }

    pub fn with_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.ctx.base_uri = Some(uri.into());
        self
    }

    pub fn with_default_function_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_function_namespace = Some(uri.into());
        self
    }

    pub fn with_default_collation(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_collation = Some(uri.into());
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn with_host_language(mut self, lang: HostLanguage) -> Self {
        self.ctx.host_language = lang;
        self
    }

    pub fn with_use_when(mut self, use_when: bool) -> Self {
        self.ctx.use_when = use_when;
        self
    }

    pub fn with_decimal_formats(mut self, formats: DecimalFormatManager) -> Self {
        self.ctx.decimal_formats = formats;
        self
    }

    pub fn with_key_name(mut self, name: ExpandedName) -> Self {
        self.ctx.key_names.insert(name);
        self
    }

    pub fn with_collations(mut self, reg: Arc<CollationRegistry>) -> Self {
        self.ctx.collations = reg;
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Predicate deciding which nodes a key indexes.
pub type KeyMatch<N> = Arc<dyn Fn(&N) -> bool + Send + Sync>;
/// Computes the key values of a matched node.
pub type KeyUse<N> = Arc<dyn Fn(&N) -> Result<Vec<XdmAtomicValue>, Error> + Send + Sync>;

/// One `xsl:key` declaration. Several definitions may share a name.
#[derive(Clone)]
pub struct KeyDefinition<N> {
    pub matches: KeyMatch<N>,
    pub use_values: KeyUse<N>,
    pub collation: Option<String>,
}

impl<N> KeyDefinition<N> {
    pub fn new(
        matches: impl Fn(&N) -> bool + Send + Sync + 'static,
        use_values: impl Fn(&N) -> Result<Vec<XdmAtomicValue>, Error> + Send + Sync + 'static,
    ) -> Self {
        Self { matches: Arc::new(matches), use_values: Arc::new(use_values), collation: None }
    }

    pub fn with_collation(mut self, uri: impl Into<String>) -> Self {
        self.collation = Some(uri.into());
        self
    }
}

/// Key values bucketed by [`ComparisonKey`], each with the node it came from.
type KeyIndex<N> = HashMap<ComparisonKey, Vec<(XdmAtomicValue, N)>>;

/// Key definitions plus lazily built per-document indexes.
pub struct KeyManager<N> {
    keys: HashMap<ExpandedName, Vec<KeyDefinition<N>>>,
    indexes: Mutex<Vec<(ExpandedName, N, Arc<KeyIndex<N>>)>>,
}

impl<N> Default for KeyManager<N> {
    fn default() -> Self {
        Self { keys: HashMap::new(), indexes: Mutex::new(Vec::new()) }
    }
}

impl<N: XdmNode> KeyManager<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: ExpandedName, def: KeyDefinition<N>) {
        self.keys.entry(name).or_default().push(def);
    }

    pub fn is_defined(&self, name: &ExpandedName) -> bool {
        self.keys.contains_key(name)
    }

    pub fn collation_uri(&self, name: &ExpandedName) -> Option<&str> {
        self.keys.get(name).and_then(|defs| defs.iter().find_map(|d| d.collation.as_deref()))
    }

    /// Nodes of the document `root` whose key value equals `value`, in document order.
    pub fn lookup(
        &self,
        name: &ExpandedName,
        root: &N,
        value: &XdmAtomicValue,
        comparer: &GenericAtomicComparer,
    ) -> Result<Vec<N>, Error> {
        let index = self.index_for(name, root, comparer)?;
        let probe = if value.is_untyped() { XdmAtomicValue::String(value.string_value()) } else { value.clone() };
        let mut found: Vec<N> = Vec::new();
        for (v, node) in index.get(&comparer.comparison_key(&probe)).into_iter().flatten() {
            if mask_incomparable(comparer.equals(v, &probe))? && !found.contains(node) {
                found.push(node.clone());
            }
        }
        Ok(found)
    }

    fn index_for(&self, name: &ExpandedName, root: &N, comparer: &GenericAtomicComparer) -> Result<Arc<KeyIndex<N>>, Error> {
        if let Ok(cache) = self.indexes.lock()
            && let Some((_, _, idx)) = cache.iter().find(|(n, r, _)| n == name && r == root)
        {
            return Ok(idx.clone());
        }
        let defs = self
            .keys
            .get(name)
            .ok_or_else(|| Error::from_code(ErrorCode::XTDE1260, format!("key {name} has not been defined")))?;
        let mut index: KeyIndex<N> = HashMap::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let mut visit = vec![node.clone()];
            if node.kind() == NodeKind::Element {
                visit.extend(node.attributes());
            }
            for candidate in visit {
                for def in defs.iter().filter(|d| (d.matches)(&candidate)) {
                    for v in (def.use_values)(&candidate)? {
                        let v = if v.is_untyped() { XdmAtomicValue::String(v.string_value()) } else { v };
                        index.entry(comparer.comparison_key(&v)).or_default().push((v, candidate.clone()));
                    }
                }
            }
            let mut children = node.children();
            children.reverse();
            stack.extend(children);
        }
        let index = Arc::new(index);
        if let Ok(mut cache) = self.indexes.lock() {
            cache.push((name.clone(), root.clone(), index.clone()));
        }
        Ok(index)
    }
}

#[derive(Clone)]
pub struct DynamicContext<N> {
    pub context_item: Option<XdmItem<N>>,
    pub context_position: Option<usize>,
    pub context_size: Option<usize>,
    pub current_node: Option<N>,
    pub current_group: Option<XdmSequence<N>>,
    pub current_grouping_key: Option<XdmAtomicValue>,
    pub regex_groups: Option<Vec<String>>,
    /// Implicit timezone, minutes east of UTC.
    pub implicit_timezone: i16,
    pub now: chrono::DateTime<chrono::FixedOffset>,
    pub functions: Arc<FunctionLibraryList<N>>,
    pub collations: Arc<CollationRegistry>,
    pub node_resolver: Option<Arc<dyn NodeResolver<N>>>,
    pub text_resolver: Option<Arc<dyn TextResolver>>,
    pub regex: Arc<dyn RegexProvider>,
    pub keys: Arc<KeyManager<N>>,
    pub system_properties: HashMap<ExpandedName, String>,
    pub trace_listener: Option<Arc<dyn TraceListener<N>>>,
}

impl<N: XdmNode> Default for DynamicContext<N> {
    fn default() -> Self {
        DynamicContextBuilder::new().build()
    }
}

pub struct DynamicContextBuilder<N> {
    ctx: DynamicContext<N>,
    now: Option<chrono::DateTime<chrono::FixedOffset>>,
    timezone: Option<i16>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        let now = chrono::Local::now().fixed_offset();
        Self {
            ctx: DynamicContext {
                context_item: None,
                context_position: None,
                context_size: None,
                current_node: None,
                current_group: None,
                current_grouping_key: None,
                regex_groups: None,
                implicit_timezone: 0,
                now,
                functions: Arc::new(FunctionLibraryList::standard()),
                collations: Arc::new(CollationRegistry::default()),
                node_resolver: None,
                text_resolver: None,
                regex: Arc::new(FancyRegexProvider::default()),
                keys: Arc::new(KeyManager::default()),
                system_properties: HashMap::new(),
                trace_listener: None,
            },
            now: None,
            timezone: None,
        }
    }

    pub fn with_context_item(mut self, item: impl Into<XdmItem<N>>) -> Self {
        self.ctx.context_item = Some(item.into());
        self
    }

    /// Focus position and size (`position()` / `last()`).
    pub fn with_focus(mut self, position: usize, size: usize) -> Self {
        self.ctx.context_position = Some(position);
        self.ctx.context_size = Some(size);
        self
    }

    pub fn with_current_node(mut self, node: N) -> Self {
        self.ctx.current_node = Some(node);
        self
    }

    pub fn with_current_group(mut self, items: XdmSequence<N>, key: Option<XdmAtomicValue>) -> Self {
        self.ctx.current_group = Some(items);
        self.ctx.current_grouping_key = key;
        self
    }

    pub fn with_regex_groups(mut self, groups: Vec<String>) -> Self {
        self.ctx.regex_groups = Some(groups);
        self
    }

    pub fn with_functions(mut self, libs: Arc<FunctionLibraryList<N>>) -> Self {
        self.ctx.functions = libs;
        self
    }

    pub fn with_collations(mut self, reg: Arc<CollationRegistry>) -> Self {
        self.ctx.collations = reg;
        self
    }

    pub fn with_node_resolver(mut self, res: Arc<dyn NodeResolver<N>>) -> Self {
        self.ctx.node_resolver = Some(res);
        self
    }

    pub fn with_text_resolver(mut self, res: Arc<dyn TextResolver>) -> Self {
        self.ctx.text_resolver = Some(res);
        self
    }

    pub fn with_regex(mut self, provider: Arc<dyn RegexProvider>) -> Self {
        self.ctx.regex = provider;
        self
    }

    pub fn with_keys(mut self, keys: KeyManager<N>) -> Self {
        self.ctx.keys = Arc::new(keys);
        self
    }

    pub fn with_system_property(mut self, name: ExpandedName, value: impl Into<String>) -> Self {
        self.ctx.system_properties.insert(name, value.into());
        self
    }

    pub fn with_trace_listener(mut self, listener: Arc<dyn TraceListener<N>>) -> Self {
        self.ctx.trace_listener = Some(listener);
        self
    }

    // Set a fixed 'now' instant for deterministic date/time functions
    pub fn with_now(mut self, now: chrono::DateTime<chrono::FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    /// Implicit timezone in minutes. Defaults to the offset of `now`. Offsets beyond
    /// -14:00..+14:00 are clamped to that range.
    pub fn with_timezone(mut self, offset_minutes: i16) -> Self {
        self.timezone = Some(clamp_timezone(i32::from(offset_minutes)));
        self
    }

    pub fn build(mut self) -> DynamicContext<N> {
        if let Some(now) = self.now {
            self.ctx.now = now;
        }
        let offset = self.ctx.now.offset().local_minus_utc() / 60;
        self.ctx.implicit_timezone = self.timezone.unwrap_or_else(|| clamp_timezone(offset));
        self.ctx
    }
}

fn clamp_timezone(minutes: i32) -> i16 {
    let max = i32::from(MAX_TZ_MINUTES);
    if minutes.abs() > max {
        tracing::warn!(minutes, "implicit timezone outside -14:00..+14:00, clamping");
    }
    i16::try_from(minutes.clamp(-max, max)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;

    #[test]
    fn replacement_groups_take_longest_valid_number() {
        let p = FancyRegexProvider::new();
        assert_eq!(p.replace("(a)(b)", "", "ab", "$2$1").unwrap(), "ba");
        assert_eq!(p.replace("(a)", "", "a", "$10").unwrap(), "a0");
        assert_eq!(p.replace("a", "", "banana", "\\$").unwrap(), "b$n$n$");
        assert_eq!(p.replace("a", "", "a", "$").unwrap_err().code_enum(), ErrorCode::FORX0004);
    }

    #[test]
    fn zero_length_matches_are_rejected() {
        let p = FancyRegexProvider::new();
        assert_eq!(p.replace("a*", "", "b", "x").unwrap_err().code_enum(), ErrorCode::FORX0003);
        assert_eq!(p.tokenize("x?", "", "b").unwrap_err().code_enum(), ErrorCode::FORX0003);
        assert_eq!(p.matches("a", "q", "a").unwrap_err().code_enum(), ErrorCode::FORX0001);
    }

    #[test]
    fn implicit_timezone_stays_within_fourteen_hours() {
        let east = DynamicContextBuilder::<SimpleNode>::new().with_timezone(15 * 60).build();
        assert_eq!(east.implicit_timezone, 840);
        let west = DynamicContextBuilder::<SimpleNode>::new().with_timezone(i16::MIN).build();
        assert_eq!(west.implicit_timezone, -840);
        let ok = DynamicContextBuilder::<SimpleNode>::new().with_timezone(-300).build();
        assert_eq!(ok.implicit_timezone, -300);
    }

    #[test]
    fn error_kind_follows_code_prefix() {
        assert_eq!(Error::from_code(ErrorCode::XPST0017, "x").kind(), ErrorKind::Static);
        assert_eq!(Error::from_code(ErrorCode::XPTY0004, "x").kind(), ErrorKind::Type);
        assert_eq!(Error::from_code(ErrorCode::FORG0006, "x").kind(), ErrorKind::Dynamic);
        assert_eq!(Error::parse_code("err:FOER0000"), ErrorCode::FOER0000.qname());
    }
}
