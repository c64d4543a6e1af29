//! XPath 2.0 standard functions over a pluggable node model.
//!
//! Calls are bound once through a [`FunctionLibraryList`] and evaluated lazily: every
//! argument and result is a [`SequenceIter`].

pub mod consts;
pub mod engine;
pub mod model;
pub mod simple_node;
pub mod xdm;

pub use engine::collation::{Collation, CollationRegistry};
pub use engine::comparer::GenericAtomicComparer;
pub use engine::functions::{BoundCall, StaticArg, standard_functions};
pub use engine::iter::{SequenceIter, SequenceIterator};
pub use engine::library::{
    ConstructorFunctionLibrary, ExecutableFunctionLibrary, FunctionLibrary, FunctionLibraryList, SystemFunctionLibrary,
};
pub use engine::runtime::{
    CallCtx, DynamicContext, DynamicContextBuilder, Error, ErrorCode, StaticContext, StaticContextBuilder,
};
pub use model::{NodeKind, QName, XdmNode};
pub use simple_node::{SimpleNode, SimpleNodeBuilder, attr, doc as simple_doc, elem, ns, text};
pub use xdm::{ExpandedName, XdmAtomicValue, XdmItem, XdmSequence};
