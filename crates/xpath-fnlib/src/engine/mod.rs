pub mod collation;
pub mod comparer;
pub mod functions;
pub mod iter;
pub mod library;
pub mod runtime;
