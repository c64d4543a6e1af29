use super::StringOp;
use super::call::{Args, atomics, one, opt};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use itertools::Itertools;
use unicode_normalization::UnicodeNormalization;

pub(super) fn call<N: XdmNode>(op: StringOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        StringOp::Concat => {
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(&args.string(i)?);
            }
            one(out)
        }
        StringOp::String => one(args.item(0)?.map(|i| i.string_value()).unwrap_or_default()),
        StringOp::StringLength => {
            let s = string_or_context(&mut args, ctx)?;
            one(i64::try_from(s.chars().count()).unwrap_or(i64::MAX))
        }
        StringOp::NormalizeSpace => one(normalize_space(&string_or_context(&mut args, ctx)?)),
        StringOp::UpperCase => one(args.string(0)?.to_uppercase()),
        StringOp::LowerCase => one(args.string(0)?.to_lowercase()),
        StringOp::Substring => {
            let s = args.string(0)?;
            let start = args.double(1)?.unwrap_or(f64::NAN);
            let length = if args.has(2) { Some(args.double(2)?.unwrap_or(f64::NAN)) } else { None };
            one(substring(&s, start, length))
        }
        StringOp::Translate => {
            let (s, from, to) = (args.string(0)?, args.string(1)?, args.string(2)?);
            one(translate(&s, &from, &to))
        }
        StringOp::StringJoin => {
            let parts = args.atomics(0)?;
            let sep = args.string(1)?;
            one(parts.iter().map(XdmAtomicValue::string_value).join(&sep))
        }
        StringOp::StringToCodepoints => {
            let s = args.string(0)?;
            atomics(s.chars().map(|c| XdmAtomicValue::Integer(i64::from(u32::from(c)))).collect())
        }
        StringOp::CodepointsToString => {
            let mut out = String::new();
            for v in args.atomics(0)? {
                let XdmAtomicValue::Integer(cp) = v else { continue };
                out.push(xml_char(cp)?);
            }
            one(out)
        }
        StringOp::CodepointEqual => {
            let (a, b) = (args.opt_string(0)?, args.opt_string(1)?);
            opt(a.zip(b).map(|(a, b)| a == b))
        }
        StringOp::NormalizeUnicode => {
            let s = args.string(0)?;
            let form = if args.has(1) { args.string(1)?.trim().to_uppercase() } else { "NFC".to_string() };
            one(normalize_unicode(&s, &form)?)
        }
        // Trees carry no unparsed entity declarations.
        StringOp::UnparsedEntity => one(String::new()),
    }
}

/// The string argument, or the string value of the context item when it was omitted.
fn string_or_context<N: XdmNode>(args: &mut Args<N>, ctx: &CallCtx<N>) -> Result<String, Error> {
    if args.has(0) {
        args.string(0)
    } else {
        Ok(ctx.context_item()?.string_value())
    }
}

pub(crate) fn normalize_space(s: &str) -> String {
    s.split([' ', '\t', '\n', '\r']).filter(|p| !p.is_empty()).join(" ")
}

/// XPath `round` on a double: halves go towards positive infinity.
fn xpath_round(d: f64) -> f64 {
    if d.is_nan() || d.is_infinite() { d } else { (d + 0.5).floor() }
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`.
/// Comparisons are done on doubles, so NaN and infinite bounds select nothing or everything
/// exactly as the rule says.
pub(crate) fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = xpath_round(start);
    let end = match length {
        Some(len) => first + xpath_round(len),
        None => f64::INFINITY,
    };
    if first.is_nan() || end.is_nan() {
        return String::new();
    }
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            #[allow(clippy::cast_precision_loss)]
            let p = (*i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// Replace each character found in `from` by the character at the same position in `to`;
/// characters beyond the end of `to` are deleted. Works per code point.
pub(crate) fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

fn xml_char(cp: i64) -> Result<char, Error> {
    let valid = matches!(cp, 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x1_0000..=0x10_FFFF);
    u32::try_from(cp)
        .ok()
        .filter(|_| valid)
        .and_then(char::from_u32)
        .ok_or_else(|| Error::from_code(ErrorCode::FOCH0001, format!("invalid XML character [x{cp:X}]")))
}

fn normalize_unicode(s: &str, form: &str) -> Result<String, Error> {
    Ok(match form {
        "" => s.to_string(),
        "NFC" => s.nfc().collect(),
        "NFD" => s.nfd().collect(),
        "NFKC" => s.nfkc().collect(),
        "NFKD" => s.nfkd().collect(),
        other => {
            return Err(Error::from_code(
                ErrorCode::FOCH0003,
                format!("normalization form {other} is not supported"),
            ));
        }
    })
}
