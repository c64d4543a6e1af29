//! `format-number` and the decimal formats it draws its symbols from.
//!
//! A picture is split into one or two sub-pictures (positive and negative). Each
//! sub-picture is parsed once into a [`SubPicture`]; formatting then works on the plain
//! decimal digits of the value, so integers, decimals, floats and doubles share one path.

use super::call::{Args, one};
use super::numberer::ZERO_DIGITS;
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode, StaticContext};
use crate::model::XdmNode;
use crate::xdm::convert::parse_lexical_qname;
use crate::xdm::{ExpandedName, Numeric};
use smallvec::SmallVec;
use std::collections::HashMap;

/// The characters and strings a decimal format uses, as declared by `xsl:decimal-format`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalSymbols {
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub digit: char,
    pub minus_sign: char,
    pub percent: char,
    pub per_mille: char,
    pub zero_digit: char,
    pub pattern_separator: char,
    pub infinity: String,
    pub nan: String,
}

impl Default for DecimalSymbols {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            grouping_separator: ',',
            digit: '#',
            minus_sign: '-',
            percent: '%',
            per_mille: '\u{2030}',
            zero_digit: '0',
            pattern_separator: ';',
            infinity: "Infinity".to_string(),
            nan: "NaN".to_string(),
        }
    }
}

impl DecimalSymbols {
    /// The picture-string characters must play distinct roles, and the zero digit must be
    /// the first of a run of ten Unicode digits.
    pub fn validate(&self) -> Result<(), Error> {
        let roles = [
            (self.decimal_separator, "decimal-separator"),
            (self.grouping_separator, "grouping-separator"),
            (self.percent, "percent"),
            (self.per_mille, "per-mille"),
            (self.zero_digit, "zero-digit"),
            (self.digit, "digit"),
            (self.pattern_separator, "pattern-separator"),
        ];
        for (i, (c, role)) in roles.iter().enumerate() {
            if let Some((_, other)) = roles[..i].iter().find(|(d, _)| d == c) {
                return Err(Error::from_code(
                    ErrorCode::XTSE1300,
                    format!("the same character is used as the {role} and as the {other}"),
                ));
            }
        }
        if ZERO_DIGITS.binary_search(&u32::from(self.zero_digit)).is_err() {
            return Err(Error::from_code(
                ErrorCode::XTSE1295,
                format!("the zero-digit character U+{:04X} is not a Unicode zero digit", u32::from(self.zero_digit)),
            ));
        }
        Ok(())
    }

    fn localize_digit(&self, d: u8) -> char {
        char::from_u32(u32::from(self.zero_digit) + u32::from(d)).unwrap_or(char::from(b'0' + d))
    }
}

/// The default and named decimal formats of a stylesheet.
///
/// Definitions carry an import precedence; a lower precedence never replaces a higher one,
/// and two different definitions at the same precedence conflict.
#[derive(Debug, Clone, Default)]
pub struct DecimalFormatManager {
    default: Option<(DecimalSymbols, i32)>,
    named: HashMap<ExpandedName, (DecimalSymbols, i32)>,
}

impl DecimalFormatManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_symbols(&self) -> &DecimalSymbols {
        static STANDARD: std::sync::OnceLock<DecimalSymbols> = std::sync::OnceLock::new();
        match &self.default {
            Some((dfs, _)) => dfs,
            None => STANDARD.get_or_init(DecimalSymbols::default),
        }
    }

    pub fn set_default(&mut self, dfs: DecimalSymbols, precedence: i32) -> Result<(), Error> {
        dfs.validate()?;
        let slot = &mut self.default;
        Self::store(slot, dfs, precedence, "the default decimal format")
    }

    pub fn set_named(&mut self, name: ExpandedName, dfs: DecimalSymbols, precedence: i32) -> Result<(), Error> {
        dfs.validate()?;
        let what = format!("decimal format {name}");
        let mut slot = self.named.remove(&name);
        let result = Self::store(&mut slot, dfs, precedence, &what);
        if let Some(entry) = slot {
            self.named.insert(name, entry);
        }
        result
    }

    fn store(
        slot: &mut Option<(DecimalSymbols, i32)>,
        dfs: DecimalSymbols,
        precedence: i32,
        what: &str,
    ) -> Result<(), Error> {
        if let Some((old, old_precedence)) = slot.as_ref() {
            if precedence < *old_precedence {
                return Ok(());
            }
            if precedence == *old_precedence && *old != dfs {
                return Err(Error::from_code(
                    ErrorCode::XTSE1290,
                    format!("there are two conflicting definitions of {what}"),
                ));
            }
        }
        *slot = Some((dfs, precedence));
        Ok(())
    }

    pub fn named(&self, name: &ExpandedName) -> Option<&DecimalSymbols> {
        self.named.get(name).map(|(dfs, _)| dfs)
    }
}

/// Resolve the lexical decimal-format name used as the third argument of `format-number`.
pub fn resolve_format_name(sc: &StaticContext, lexical: &str) -> Result<DecimalSymbols, Error> {
    let lexical = lexical.trim();
    let (prefix, local) = parse_lexical_qname(lexical).ok_or_else(|| {
        Error::from_code(ErrorCode::XTDE1280, format!("invalid decimal format name '{lexical}'"))
    })?;
    let ns = match prefix {
        Some(p) => Some(sc.namespaces.by_prefix.get(p).cloned().ok_or_else(|| {
            Error::from_code(ErrorCode::XTDE1280, format!("undeclared prefix in decimal format name '{lexical}'"))
        })?),
        None => None,
    };
    let name = ExpandedName::new(ns, local);
    sc.decimal_formats
        .named(&name)
        .cloned()
        .ok_or_else(|| Error::from_code(ErrorCode::XTDE1280, format!("decimal-format '{lexical}' is not defined")))
}

pub(super) fn call<N: XdmNode>(
    symbols: Option<&DecimalSymbols>,
    ctx: &CallCtx<N>,
    mut args: Args<N>,
) -> Result<SequenceIter<N>, Error> {
    let number = args.atomic(0)?.and_then(|v| v.as_numeric()).unwrap_or(Numeric::Double(f64::NAN));
    let picture = args.string(1)?;
    let resolved;
    let dfs = match symbols {
        Some(s) => s,
        None if args.has(2) => {
            resolved = resolve_format_name(ctx.static_ctx, &args.string(2)?)?;
            &resolved
        }
        None => ctx.static_ctx.decimal_formats.default_symbols(),
    };
    one(format_number(&number, &picture, dfs)?)
}

/// Format `number` with `picture` under `dfs`.
pub fn format_number(number: &Numeric, picture: &str, dfs: &DecimalSymbols) -> Result<String, Error> {
    let (positive, negative) = sub_pictures(picture, dfs)?;
    if is_negative(number) {
        return Ok(match negative {
            Some(pic) => pic.format(number, dfs, None),
            None => positive.format(number, dfs, Some(dfs.minus_sign)),
        });
    }
    Ok(positive.format(number, dfs, None))
}

fn grumble(msg: &str) -> Error {
    Error::from_code(ErrorCode::XTDE1310, format!("format-number picture: {msg}"))
}

fn sub_pictures(picture: &str, dfs: &DecimalSymbols) -> Result<(SubPicture, Option<SubPicture>), Error> {
    let chars: Vec<char> = picture.chars().collect();
    if chars.is_empty() {
        return Err(grumble("picture is zero-length"));
    }
    let mut separators = chars.iter().enumerate().filter(|(_, c)| **c == dfs.pattern_separator).map(|(i, _)| i);
    match (separators.next(), separators.next()) {
        (None, _) => Ok((SubPicture::parse(&chars, dfs)?, None)),
        (Some(_), Some(_)) => Err(grumble("more than one pattern separator")),
        (Some(0), None) => Err(grumble("first subpicture is zero-length")),
        (Some(i), None) if i == chars.len() - 1 => Err(grumble("second subpicture is zero-length")),
        (Some(i), None) => Ok((SubPicture::parse(&chars[..i], dfs)?, Some(SubPicture::parse(&chars[i + 1..], dfs)?))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prefix,
    WholeOptional,
    WholeMandatory,
    FractionMandatory,
    FractionOptional,
    Suffix,
}

/// One parsed sub-picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SubPicture {
    min_whole: usize,
    max_whole: usize,
    min_fraction: usize,
    max_fraction: usize,
    /// Power of ten the value is scaled by: 2 for percent, 3 for per-mille.
    scale: usize,
    prefix: String,
    suffix: String,
    /// Distances of the grouping separators from the decimal point. A single entry means
    /// the grouping repeats at that interval.
    whole_grouping: SmallVec<[usize; 4]>,
    fraction_grouping: SmallVec<[usize; 4]>,
}

impl SubPicture {
    fn parse(pic: &[char], dfs: &DecimalSymbols) -> Result<Self, Error> {
        if !pic.iter().any(|c| *c == dfs.digit || *c == dfs.zero_digit) {
            return Err(grumble("subpicture contains no digit or zero-digit sign"));
        }
        let mut sp = SubPicture::default();
        let mut phase = Phase::Prefix;
        let mut found_decimal_separator = false;
        let mut whole_marks: SmallVec<[usize; 4]> = SmallVec::new();

        for &c in pic {
            if c == dfs.percent || c == dfs.per_mille {
                if sp.scale != 0 {
                    return Err(grumble("cannot have more than one percent or per-mille character in a sub-picture"));
                }
                sp.scale = if c == dfs.percent { 2 } else { 3 };
                if phase == Phase::Prefix {
                    sp.prefix.push(c);
                } else {
                    phase = Phase::Suffix;
                    sp.suffix.push(c);
                }
            } else if c == dfs.digit {
                match phase {
                    Phase::Prefix | Phase::WholeOptional => {
                        phase = Phase::WholeOptional;
                        sp.max_whole += 1;
                    }
                    Phase::WholeMandatory => {
                        return Err(grumble(
                            "digit sign must not appear after a zero-digit sign in the integer part of a sub-picture",
                        ));
                    }
                    Phase::FractionMandatory | Phase::FractionOptional => {
                        phase = Phase::FractionOptional;
                        sp.max_fraction += 1;
                    }
                    Phase::Suffix => {
                        return Err(grumble("passive character must not appear between active characters"));
                    }
                }
            } else if c == dfs.zero_digit {
                match phase {
                    Phase::Prefix | Phase::WholeOptional | Phase::WholeMandatory => {
                        phase = Phase::WholeMandatory;
                        sp.min_whole += 1;
                        sp.max_whole += 1;
                    }
                    Phase::FractionMandatory => {
                        sp.min_fraction += 1;
                        sp.max_fraction += 1;
                    }
                    Phase::FractionOptional => {
                        return Err(grumble(
                            "zero-digit sign must not appear after a digit sign in the fractional part of a sub-picture",
                        ));
                    }
                    Phase::Suffix => {
                        return Err(grumble("passive character must not appear between active characters"));
                    }
                }
            } else if c == dfs.decimal_separator {
                match phase {
                    Phase::Prefix | Phase::WholeOptional | Phase::WholeMandatory => {
                        phase = Phase::FractionMandatory;
                        found_decimal_separator = true;
                    }
                    _ if found_decimal_separator => {
                        return Err(grumble("there must only be one decimal separator in a sub-picture"));
                    }
                    _ => return Err(grumble("decimal separator cannot come after a character in the suffix")),
                }
            } else if c == dfs.grouping_separator {
                match phase {
                    Phase::Prefix | Phase::WholeOptional | Phase::WholeMandatory => whole_marks.push(sp.max_whole),
                    Phase::FractionMandatory | Phase::FractionOptional => {
                        if sp.max_fraction == 0 {
                            return Err(grumble("grouping separator cannot be adjacent to decimal separator"));
                        }
                        sp.fraction_grouping.push(sp.max_fraction);
                    }
                    Phase::Suffix => return Err(grumble("grouping separator found in suffix of sub-picture")),
                }
            } else if phase == Phase::Prefix {
                sp.prefix.push(c);
            } else {
                phase = Phase::Suffix;
                sp.suffix.push(c);
            }
        }

        if sp.min_whole == 0 && !found_decimal_separator {
            sp.min_whole = 1;
        }
        if !whole_marks.is_empty() {
            let positions: SmallVec<[usize; 4]> = whole_marks.iter().rev().map(|m| sp.max_whole - m).collect();
            if positions[0] == 0 {
                return Err(grumble("cannot have a grouping separator adjacent to the decimal separator"));
            }
            let first = positions[0];
            let regular = positions.iter().enumerate().all(|(i, p)| *p == (i + 1) * first);
            sp.whole_grouping = if regular { SmallVec::from_slice(&[first]) } else { positions };
        }
        Ok(sp)
    }

    /// Format the absolute value of `value`, prefixed by `minus` if given.
    fn format(&self, value: &Numeric, dfs: &DecimalSymbols, minus: Option<char>) -> String {
        if value.is_nan() {
            return dfs.nan.clone();
        }
        let mut out = String::new();
        out.extend(minus);
        out.push_str(&self.prefix);
        if is_infinite(value) {
            out.push_str(&dfs.infinity);
            out.push_str(&self.suffix);
            return out;
        }

        let mut digits = Digits::parse(&plain_digits(value));
        digits.shift_left(self.scale);
        digits.round_half_even(self.max_fraction);
        while digits.fraction.len() > self.min_fraction && digits.fraction.last() == Some(&0) {
            digits.fraction.pop();
        }
        digits.fraction.resize(digits.fraction.len().max(self.min_fraction), 0);
        let first_significant = digits.whole.iter().position(|d| *d != 0).unwrap_or(digits.whole.len());
        digits.whole.drain(..first_significant);
        if digits.whole.len() < self.min_whole {
            let pad = self.min_whole - digits.whole.len();
            digits.whole.splice(0..0, core::iter::repeat_n(0, pad));
        }

        let mut whole: Vec<char> = digits.whole.iter().map(|d| dfs.localize_digit(*d)).collect();
        match self.whole_grouping.as_slice() {
            [] => {}
            [g] => {
                let mut p = whole.len().saturating_sub(*g);
                while p > 0 {
                    whole.insert(p, dfs.grouping_separator);
                    p = p.saturating_sub(*g);
                }
            }
            positions => {
                let len = whole.len();
                for pos in positions {
                    if *pos < len {
                        whole.insert(len - pos, dfs.grouping_separator);
                    }
                }
            }
        }
        out.extend(whole);

        if !digits.fraction.is_empty() {
            out.push(dfs.decimal_separator);
            let mut fraction: Vec<char> = digits.fraction.iter().map(|d| dfs.localize_digit(*d)).collect();
            for (i, pos) in self.fraction_grouping.iter().enumerate() {
                let p = pos + i;
                if p >= fraction.len() {
                    break;
                }
                fraction.insert(p, dfs.grouping_separator);
            }
            out.extend(fraction);
        }
        out.push_str(&self.suffix);
        out
    }
}

fn is_negative(n: &Numeric) -> bool {
    match n {
        Numeric::Integer(i) => *i < 0,
        Numeric::Decimal(d) => d.is_sign_negative() && !d.is_zero(),
        Numeric::Float(f) => *f < 0.0,
        Numeric::Double(d) => *d < 0.0,
    }
}

fn is_infinite(n: &Numeric) -> bool {
    match n {
        Numeric::Float(f) => f.is_infinite(),
        Numeric::Double(d) => d.is_infinite(),
        _ => false,
    }
}

/// Plain decimal notation of the absolute value. Floating-point values use the shortest
/// digit string that reads back as the same value, at the precision of their own type.
fn plain_digits(n: &Numeric) -> String {
    match n {
        Numeric::Integer(i) => i.unsigned_abs().to_string(),
        Numeric::Decimal(d) => d.abs().to_string(),
        Numeric::Float(f) => format!("{}", f.abs()),
        Numeric::Double(d) => format!("{}", d.abs()),
    }
}

/// Decimal digits (values 0..=9) either side of the point.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits {
    whole: Vec<u8>,
    fraction: Vec<u8>,
}

impl Digits {
    fn parse(plain: &str) -> Self {
        let (w, f) = plain.split_once('.').unwrap_or((plain, ""));
        let digits = |s: &str| s.bytes().filter(u8::is_ascii_digit).map(|b| b - b'0').collect::<Vec<u8>>();
        Digits { whole: digits(w), fraction: digits(f) }
    }

    /// Multiply by `10^n`.
    fn shift_left(&mut self, n: usize) {
        for _ in 0..n {
            let d = if self.fraction.is_empty() { 0 } else { self.fraction.remove(0) };
            self.whole.push(d);
        }
    }

    fn round_half_even(&mut self, places: usize) {
        if self.fraction.len() <= places {
            return;
        }
        let dropped = self.fraction.split_off(places);
        let first = dropped[0];
        let rest_nonzero = dropped[1..].iter().any(|d| *d != 0);
        let last_kept = if places > 0 { self.fraction[places - 1] } else { self.whole.last().copied().unwrap_or(0) };
        let round_up = first > 5 || (first == 5 && (rest_nonzero || last_kept % 2 == 1));
        if !round_up {
            return;
        }
        for d in self.fraction.iter_mut().rev().chain(self.whole.iter_mut().rev()) {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                return;
            }
        }
        self.whole.insert(0, 1);
    }
}
