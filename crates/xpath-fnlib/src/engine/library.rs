//! Function libraries and the chain the compiler binds calls through.
//!
//! A [`FunctionLibraryList`] asks each library in registration order. The first library
//! that knows a name owns it: if that library cannot bind the requested arity the call
//! fails with "wrong number of arguments" instead of falling through to later libraries.

use crate::consts::{FNS, XS};
use crate::engine::functions::{
    Applicability, BindContext, BoundCall, CallTarget, ExecutableFn, StaticArg, standard_functions,
};
use crate::engine::runtime::{Arity, CallCtx, Error, ResolveError, StaticContext};
use crate::engine::iter::SequenceIter;
use crate::model::XdmNode;
use crate::xdm::{AtomicType, ExpandedName};
use std::collections::HashMap;
use std::sync::Arc;

pub trait FunctionLibrary<N>: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &'static str;

    /// Whether a function `name` exists with `arity` arguments. `None` asks for any arity.
    fn has_function_signature(&self, name: &ExpandedName, arity: Option<Arity>) -> bool;

    /// Whether this library knows `name` under any arity.
    fn is_known_name(&self, name: &ExpandedName) -> bool {
        self.has_function_signature(name, None)
    }

    /// Bind a call with the given arguments. `Ok(None)` means this library cannot bind it.
    fn bind(
        &self,
        name: &ExpandedName,
        args: &[StaticArg],
        static_ctx: &StaticContext,
    ) -> Result<Option<BoundCall<N>>, Error>;
}

/// The standard `fn:` functions, filtered by host language.
pub struct SystemFunctionLibrary {
    /// Applicability assumed by `has_function_signature`, which has no static context.
    applicability: Applicability,
}

impl Default for SystemFunctionLibrary {
    fn default() -> Self {
        Self { applicability: Applicability::ALL }
    }
}

impl SystemFunctionLibrary {
    pub fn new(applicability: Applicability) -> Self {
        Self { applicability }
    }
}

fn in_fn_namespace(name: &ExpandedName) -> bool {
    name.ns_uri.as_deref() == Some(FNS)
}

impl<N: XdmNode> FunctionLibrary<N> for SystemFunctionLibrary {
    fn label(&self) -> &'static str {
        "system"
    }

    fn has_function_signature(&self, name: &ExpandedName, arity: Option<Arity>) -> bool {
        if !in_fn_namespace(name) {
            return false;
        }
        let visible = |e: &crate::engine::functions::Entry| e.applicability.intersects(self.applicability);
        match arity {
            None => standard_functions().iter().any(|e| e.name == name.local && visible(e)),
            Some(a) => standard_functions().lookup(&name.local, a).is_some_and(|e| {
                visible(e)
                    && (e.accepts_arity(a) || (e.context_item_as_first_argument && a + 1 == e.min_arity))
            }),
        }
    }

    fn is_known_name(&self, name: &ExpandedName) -> bool {
        in_fn_namespace(name) && standard_functions().is_known_name(&name.local)
    }

    fn bind(
        &self,
        name: &ExpandedName,
        args: &[StaticArg],
        static_ctx: &StaticContext,
    ) -> Result<Option<BoundCall<N>>, Error> {
        if !in_fn_namespace(name) {
            return Ok(None);
        }
        let arity = args.len();
        let Some(entry) = standard_functions().lookup(&name.local, arity) else {
            return Ok(None);
        };
        if !entry.applicability.intersects(Applicability::for_context(static_ctx)) {
            tracing::trace!(function = %name, "not available in this host language");
            return Ok(None);
        }
        if entry.accepts_arity(arity) {
            let function = entry.kind.bind(&BindContext { static_ctx, args, entry })?;
            return Ok(Some(BoundCall::new(name.clone(), arity, CallTarget::System { entry, function })));
        }
        if entry.context_item_as_first_argument && arity + 1 == entry.min_arity {
            let mut full = Vec::with_capacity(arity + 1);
            full.push(StaticArg::Dynamic);
            full.extend_from_slice(args);
            let function = entry.kind.bind(&BindContext { static_ctx, args: &full, entry })?;
            let call = BoundCall::new(name.clone(), arity, CallTarget::System { entry, function });
            return Ok(Some(call.with_context_item_argument()));
        }
        Ok(None)
    }
}

/// `xs:TYPE#1` constructor functions for the castable atomic types.
#[derive(Default)]
pub struct ConstructorFunctionLibrary;

fn constructor_type(name: &ExpandedName) -> Option<AtomicType> {
    if name.ns_uri.as_deref() != Some(XS) {
        return None;
    }
    AtomicType::from_local_name(&name.local)
}

impl<N: XdmNode> FunctionLibrary<N> for ConstructorFunctionLibrary {
    fn label(&self) -> &'static str {
        "constructor"
    }

    fn has_function_signature(&self, name: &ExpandedName, arity: Option<Arity>) -> bool {
        constructor_type(name).is_some() && arity.is_none_or(|a| a == 1)
    }

    fn bind(
        &self,
        name: &ExpandedName,
        args: &[StaticArg],
        _static_ctx: &StaticContext,
    ) -> Result<Option<BoundCall<N>>, Error> {
        Ok(constructor_type(name)
            .filter(|_| args.len() == 1)
            .map(|t| BoundCall::new(name.clone(), 1, CallTarget::Constructor(t))))
    }
}

/// Host-defined functions, registered by name and fixed arity.
pub struct ExecutableFunctionLibrary<N> {
    functions: HashMap<ExpandedName, Vec<(Arity, ExecutableFn<N>)>>,
}

impl<N> Default for ExecutableFunctionLibrary<N> {
    fn default() -> Self {
        Self { functions: HashMap::new() }
    }
}

impl<N: XdmNode> ExecutableFunctionLibrary<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` as `name#arity`, replacing an earlier registration of the same signature.
    pub fn register<F>(&mut self, name: ExpandedName, arity: Arity, f: F)
    where
        F: Fn(&CallCtx<N>, Vec<SequenceIter<N>>) -> Result<SequenceIter<N>, Error> + Send + Sync + 'static,
    {
        let overloads = self.functions.entry(name).or_default();
        overloads.retain(|(a, _)| *a != arity);
        overloads.push((arity, Arc::new(f)));
    }
}

impl<N: XdmNode> FunctionLibrary<N> for ExecutableFunctionLibrary<N> {
    fn label(&self) -> &'static str {
        "executable"
    }

    fn has_function_signature(&self, name: &ExpandedName, arity: Option<Arity>) -> bool {
        self.functions
            .get(name)
            .is_some_and(|overloads| overloads.iter().any(|(a, _)| arity.is_none_or(|want| *a == want)))
    }

    fn bind(
        &self,
        name: &ExpandedName,
        args: &[StaticArg],
        _static_ctx: &StaticContext,
    ) -> Result<Option<BoundCall<N>>, Error> {
        let arity = args.len();
        Ok(self
            .functions
            .get(name)
            .and_then(|overloads| overloads.iter().find(|(a, _)| *a == arity))
            .map(|(_, f)| BoundCall::new(name.clone(), arity, CallTarget::Executable(f.clone()))))
    }
}

/// Libraries consulted in registration order.
pub struct FunctionLibraryList<N> {
    libraries: Vec<Arc<dyn FunctionLibrary<N>>>,
}

impl<N> Default for FunctionLibraryList<N> {
    fn default() -> Self {
        Self { libraries: Vec::new() }
    }
}

impl<N: XdmNode> FunctionLibraryList<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// System functions followed by the `xs:` constructors.
    pub fn standard() -> Self {
        Self::new().with(SystemFunctionLibrary::default()).with(ConstructorFunctionLibrary)
    }

    pub fn with(mut self, library: impl FunctionLibrary<N> + 'static) -> Self {
        self.push(Arc::new(library));
        self
    }

    pub fn push(&mut self, library: Arc<dyn FunctionLibrary<N>>) {
        self.libraries.push(library);
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn has_function_signature(&self, name: &ExpandedName, arity: Option<Arity>) -> bool {
        self.libraries.iter().any(|l| l.has_function_signature(name, arity))
    }

    pub fn is_known_name(&self, name: &ExpandedName) -> bool {
        self.libraries.iter().any(|l| l.is_known_name(name))
    }

    /// Bind `name(args…)`. An unprefixed name is taken to be in the static context's default
    /// function namespace.
    pub fn bind(
        &self,
        name: &ExpandedName,
        args: &[StaticArg],
        static_ctx: &StaticContext,
    ) -> Result<BoundCall<N>, Error> {
        let name = match (&name.ns_uri, &static_ctx.default_function_namespace) {
            (None, Some(ns)) => ExpandedName::ns(ns, name.local.clone()),
            _ => name.clone(),
        };
        let arity = args.len();
        let Some(owner) = self.libraries.iter().find(|l| l.is_known_name(&name)) else {
            tracing::trace!(function = %name, arity, "no library knows this function");
            return Err(ResolveError::Unknown(name).into());
        };
        match owner.bind(&name, args, static_ctx)? {
            Some(call) => {
                tracing::trace!(function = %name, arity, library = owner.label(), "bound");
                Ok(call)
            }
            None => {
                tracing::trace!(function = %name, arity, library = owner.label(), "known name, cannot bind");
                Err(ResolveError::WrongArity { name, arity }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter;
    use crate::engine::runtime::{ErrorCode, HostLanguage, StaticContextBuilder};
    use crate::simple_node::SimpleNode;
    use crate::xdm::XdmAtomicValue;

    fn fn_name(local: &str) -> ExpandedName {
        ExpandedName::ns(FNS, local)
    }

    #[test]
    fn unknown_and_wrong_arity_are_distinguished() {
        let libs = FunctionLibraryList::<SimpleNode>::standard();
        let sc = StaticContext::default();
        let unknown = libs.bind(&fn_name("no-such-function"), &[], &sc).unwrap_err();
        assert_eq!(unknown.code_enum(), ErrorCode::XPST0017);
        assert!(unknown.message.contains("unknown function"));
        let wrong = libs.bind(&fn_name("abs"), &[StaticArg::Dynamic, StaticArg::Dynamic], &sc).unwrap_err();
        assert!(wrong.message.contains("2 arguments"));
    }

    #[test]
    fn xslt_functions_need_an_xslt_host() {
        let libs = FunctionLibraryList::<SimpleNode>::standard();
        let xpath = StaticContext::default();
        let xslt = StaticContextBuilder::new().with_host_language(HostLanguage::Xslt).build();
        let args = [StaticArg::Dynamic];
        assert!(libs.bind(&fn_name("generate-id"), &args, &xpath).is_err());
        assert!(libs.bind(&fn_name("generate-id"), &args, &xslt).is_ok());
        let use_when = StaticContextBuilder::new().with_host_language(HostLanguage::Xslt).with_use_when(true).build();
        assert!(libs.bind(&fn_name("current"), &[], &use_when).is_err());
        assert!(libs.bind(&fn_name("system-property"), &args, &use_when).is_ok());
    }

    #[test]
    fn unprefixed_names_use_the_default_function_namespace() {
        let libs = FunctionLibraryList::<SimpleNode>::standard();
        let call = libs.bind(&ExpandedName::local("count"), &[StaticArg::Dynamic], &StaticContext::default()).unwrap();
        assert_eq!(call.name, fn_name("count"));
    }

    #[test]
    fn omitted_first_argument_binds_to_context_item() {
        let libs = FunctionLibraryList::<SimpleNode>::standard();
        let call = libs.bind(&fn_name("name"), &[], &StaticContext::default()).unwrap();
        assert_eq!(call.arity, 0);
        assert!(libs.has_function_signature(&fn_name("name"), Some(0)));
        assert!(libs.has_function_signature(&fn_name("name"), Some(1)));
        assert!(!libs.has_function_signature(&fn_name("name"), Some(2)));
    }

    #[test]
    fn constructors_and_host_functions() {
        let mut host = ExecutableFunctionLibrary::<SimpleNode>::new();
        host.register(ExpandedName::ns("urn:app", "answer"), 0, |_ctx, _args| {
            Ok(iter::singleton(XdmAtomicValue::Integer(42)))
        });
        let libs = FunctionLibraryList::standard().with(host);
        let sc = StaticContext::default();
        assert!(libs.has_function_signature(&ExpandedName::ns(XS, "date"), Some(1)));
        assert!(!libs.has_function_signature(&ExpandedName::ns(XS, "date"), Some(2)));
        let ctor = libs.bind(&ExpandedName::ns(XS, "integer"), &[StaticArg::Dynamic], &sc).unwrap();
        assert!(matches!(ctor.target(), CallTarget::Constructor(AtomicType::Integer)));
        let answer = libs.bind(&ExpandedName::ns("urn:app", "answer"), &[], &sc).unwrap();
        assert!(matches!(answer.target(), CallTarget::Executable(_)));
        let err = libs.bind(&ExpandedName::ns("urn:app", "answer"), &[StaticArg::Dynamic], &sc).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPST0017);
    }
}
