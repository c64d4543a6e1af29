use super::UriOp;
use super::call::{Args, one, opt};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use std::fmt::Write as _;
use url::Url;

pub(super) fn call<N: XdmNode>(op: UriOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        UriOp::EncodeForUri => one(encode_for_uri(&args.string(0)?)),
        UriOp::IriToUri => one(iri_to_uri(&args.string(0)?)),
        UriOp::EscapeHtmlUri => one(escape_html_uri(&args.string(0)?)),
        UriOp::ResolveUri => {
            let Some(relative) = args.opt_string(0)? else {
                return opt(None::<XdmAtomicValue>);
            };
            let base = if args.has(1) { Some(args.string(1)?) } else { ctx.static_ctx.base_uri.clone() };
            let Some(base) = base else {
                return Err(Error::from_code(
                    ErrorCode::FONS0005,
                    "base URI in static context of resolve-uri() is unknown",
                ));
            };
            one(XdmAtomicValue::AnyUri(resolve_uri(&relative, &base)?))
        }
    }
}

fn escape_byte(b: u8, out: &mut String) {
    let _ = write!(out, "%{b:02X}");
}

fn escape_where(s: &str, escape: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if escape(c) {
            let mut buf = [0u8; 4];
            c.encode_utf8(&mut buf).bytes().for_each(|b| escape_byte(b, &mut out));
        } else {
            out.push(c);
        }
    }
    out
}

/// Everything except ASCII letters, digits and `-_.~` is percent-encoded.
pub fn encode_for_uri(s: &str) -> String {
    escape_where(s, |c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
}

/// Non-ASCII characters, controls, space and `"<>\^`{|}` are percent-encoded.
pub fn iri_to_uri(s: &str) -> String {
    escape_where(s, |c| !c.is_ascii_graphic() || matches!(c, '"' | '<' | '>' | '\\' | '^' | '`' | '{' | '|' | '}'))
}

/// Only characters outside printable ASCII are percent-encoded.
pub fn escape_html_uri(s: &str) -> String {
    escape_where(s, |c| !(' '..='~').contains(&c))
}

fn invalid(msg: String) -> Error {
    Error::from_code(ErrorCode::FORG0002, msg)
}

/// Resolve `relative` against `base`. An absolute `relative` is returned unchanged.
pub fn resolve_uri(relative: &str, base: &str) -> Result<String, Error> {
    let relative = relative.replace(' ', "%20");
    if Url::parse(&relative).is_ok() {
        return Ok(relative);
    }
    let base_url = Url::parse(&base.replace(' ', "%20"))
        .map_err(|e| invalid(format!("base URI '{base}' of resolve-uri() is not a valid absolute URI: {e}")))?;
    let resolved = base_url
        .join(&relative)
        .map_err(|e| invalid(format!("cannot resolve '{relative}' against '{base}': {e}")))?;
    tracing::trace!(%relative, %base, %resolved, "resolve-uri");
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_use_their_own_allowed_sets() {
        assert_eq!(encode_for_uri("a b/β~"), "a%20b%2F%CE%B2~");
        assert_eq!(iri_to_uri("http://x/a b?q={1}"), "http://x/a%20b?q=%7B1%7D");
        assert_eq!(escape_html_uri("http://x/a b/é"), "http://x/a b/%C3%A9");
    }

    #[test]
    fn resolve_against_base() {
        assert_eq!(resolve_uri("c/d.xml", "http://example.com/a/b.xml").unwrap(), "http://example.com/a/c/d.xml");
        assert_eq!(resolve_uri("../x", "http://example.com/a/b/").unwrap(), "http://example.com/a/x");
        assert_eq!(resolve_uri("urn:isbn:1", "not a base").unwrap(), "urn:isbn:1");
        assert_eq!(resolve_uri("x", "relative/base").unwrap_err().code_enum(), ErrorCode::FORG0002);
    }
}
