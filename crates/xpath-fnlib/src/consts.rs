//! Well-known namespace and collation URIs.

/// Namespace of the standard function library (`fn:`).
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
/// XML Schema namespace (`xs:`), used for constructor functions and type names.
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace of W3C error codes (`err:`).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// The reserved `xml` namespace.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// XSLT namespace, used for `system-property` names and `element-available`.
pub const XSLT_NS: &str = "http://www.w3.org/1999/XSL/Transform";

pub const CODEPOINT_URI: &str = "http://www.w3.org/2005/xpath-functions/collation/codepoint";
pub const SIMPLE_CASE_URI: &str = "urn:xpath-fnlib:collation:simple-case";
pub const SIMPLE_ACCENT_URI: &str = "urn:xpath-fnlib:collation:simple-accent";
pub const SIMPLE_CASE_ACCENT_URI: &str = "urn:xpath-fnlib:collation:simple-case-accent";
