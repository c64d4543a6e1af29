//! Numbering in words, letters, roman numerals and digits, as used by the date formatting
//! functions. [`EnglishNumberer`] is the only built-in language.

/// Unicode characters with digit value zero that start a run of ten decimal digits.
pub(crate) const ZERO_DIGITS: [u32; 27] = [
    0x0030, 0x0660, 0x06f0, 0x0966, 0x09e6, 0x0a66, 0x0ae6, 0x0b66, 0x0be6, 0x0c66, 0x0ce6, 0x0d66, 0x0e50, 0x0ed0,
    0x0f20, 0x1040, 0x17e0, 0x1810, 0x1946, 0x19d0, 0xff10, 0x104a0, 0x1d7ce, 0x1d7d8, 0x1d7e2, 0x1d7ec, 0x1d7f6,
];

/// The zero of the decimal digit family `c` belongs to, if it is a digit.
pub(crate) fn digit_zero(c: char) -> Option<u32> {
    let cp = u32::from(c);
    ZERO_DIGITS.iter().copied().find(|z| (*z..=*z + 9).contains(&cp))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCase {
    Upper,
    Lower,
    Title,
}

impl WordCase {
    fn apply(self, s: String) -> String {
        match self {
            WordCase::Upper => s.to_uppercase(),
            WordCase::Lower => s.to_lowercase(),
            WordCase::Title => s,
        }
    }
}

const LATIN_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LATIN_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const GREEK_UPPER: &str = "\u{391}\u{392}\u{393}\u{394}\u{395}\u{396}\u{397}\u{398}\u{399}\u{39a}\u{39b}\u{39c}\u{39d}\u{39e}\u{39f}\u{3a0}\u{3a1}\u{3a2}\u{3a3}\u{3a4}\u{3a5}\u{3a6}\u{3a7}\u{3a8}\u{3a9}";
const GREEK_LOWER: &str = "\u{3b1}\u{3b2}\u{3b3}\u{3b4}\u{3b5}\u{3b6}\u{3b7}\u{3b8}\u{3b9}\u{3ba}\u{3bb}\u{3bc}\u{3bd}\u{3be}\u{3bf}\u{3c0}\u{3c1}\u{3c2}\u{3c3}\u{3c4}\u{3c5}\u{3c6}\u{3c7}\u{3c8}\u{3c9}";

/// Language-specific numbering. The provided methods cover the language-neutral formats.
pub trait Numberer: Send + Sync {
    /// Cardinal number in words, title case, e.g. "Twenty One".
    fn to_words(&self, number: i64) -> String;
    fn to_ordinal_words(&self, number: i64, case: WordCase) -> String;
    fn ordinal_suffix(&self, number: i64) -> &'static str;
    /// Month name (1-based) fitted to the width range.
    fn month_name(&self, month: u32, min_width: usize, max_width: Option<usize>) -> String;
    /// Day name (1 = Monday) fitted to the width range.
    fn day_name(&self, day: u32, min_width: usize, max_width: Option<usize>) -> String;

    fn half_day_name(&self, minute_of_day: u32, max_width: Option<usize>) -> String {
        let wide = max_width.is_none_or(|m| m >= 8);
        let short = |am: bool| {
            let s = match (max_width, am) {
                (Some(1), true) => "A",
                (Some(1), false) => "P",
                (Some(2 | 3), true) => "Am",
                (Some(2 | 3), false) => "Pm",
                (_, true) => "A.M.",
                (_, false) => "P.M.",
            };
            s.to_string()
        };
        if minute_of_day == 0 && wide {
            "Midnight".to_string()
        } else if minute_of_day < 12 * 60 {
            short(true)
        } else if minute_of_day == 12 * 60 && wide {
            "Noon".to_string()
        } else {
            short(false)
        }
    }

    fn era_name(&self, astronomical_year: i32) -> String {
        if astronomical_year > 0 { "AD" } else { "BC" }.to_string()
    }

    fn calendar_name(&self, code: &str) -> String {
        if code == "AD" { "Gregorian".to_string() } else { code.to_string() }
    }

    /// Format `number` with a primary format token such as `1`, `01`, `a`, `I`, `W` or `Ww`.
    /// `ordinal` asks for ordinal output; `traditional` selects roman numerals for `i`/`I`.
    fn format(&self, number: i64, picture: &str, traditional: bool, ordinal: bool) -> String {
        let Some(first) = picture.chars().next() else {
            return number.to_string();
        };
        if number < 0 {
            return number.to_string();
        }
        let width = picture.chars().count();
        match first {
            '0' | '1' => {
                let mut s = to_radical(number, '0', width);
                if ordinal {
                    s.push_str(self.ordinal_suffix(number));
                }
                s
            }
            'A' | 'a' | '\u{391}' | '\u{3b1}' if number == 0 && first.is_ascii() => "0".to_string(),
            'A' => to_alpha_sequence(number, LATIN_UPPER),
            'a' => to_alpha_sequence(number, LATIN_LOWER),
            '\u{391}' => to_alpha_sequence(number, GREEK_UPPER),
            '\u{3b1}' => to_alpha_sequence(number, GREEK_LOWER),
            'w' | 'W' => {
                let case = match picture {
                    "W" => WordCase::Upper,
                    "w" => WordCase::Lower,
                    _ => WordCase::Title,
                };
                if ordinal {
                    self.to_ordinal_words(number, case)
                } else if number == 0 {
                    case.apply("Zero".to_string())
                } else {
                    case.apply(self.to_words(number))
                }
            }
            'i' if traditional || picture.len() == 1 => to_roman(number),
            'I' if traditional || picture.len() == 1 => to_roman(number).to_uppercase(),
            '\u{2460}' | '\u{2474}' | '\u{2488}' => {
                if number == 0 || number > 20 {
                    return number.to_string();
                }
                u32::try_from(number - 1)
                    .ok()
                    .and_then(|n| char::from_u32(u32::from(first) + n))
                    .map_or_else(|| number.to_string(), String::from)
            }
            c => match digit_zero(c).and_then(char::from_u32) {
                Some(zero) => to_radical(number, zero, width),
                None if number == 0 => "0".to_string(),
                None => to_radical(number, '0', width),
            },
        }
    }
}

/// Decimal digits of `number` in the family starting at `zero`, left-padded to `width`.
fn to_radical(number: i64, zero: char, width: usize) -> String {
    let digit = |d: u8| char::from_u32(u32::from(zero) + u32::from(d)).unwrap_or('?');
    let plain = number.to_string();
    let mut out: String = core::iter::repeat_n(digit(0), width.saturating_sub(plain.len())).collect();
    out.extend(plain.bytes().map(|b| digit(b - b'0')));
    out
}

/// Bijective base-n numbering over `alphabet`: a, b, .., z, aa, ab, ..
fn to_alpha_sequence(number: i64, alphabet: &str) -> String {
    if number <= 0 {
        return number.to_string();
    }
    let letters: Vec<char> = alphabet.chars().collect();
    let range = letters.len() as u64;
    let mut n = number.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        let idx = usize::try_from((n - 1) % range).unwrap_or(0);
        out.push(letters[idx]);
        n = (n - 1) / range;
    }
    out.iter().rev().collect()
}

/// Lower-case roman numerals for 1..=9999; other values are written in digits.
pub fn to_roman(n: i64) -> String {
    const THOUSANDS: [&str; 10] = ["", "m", "mm", "mmm", "mmmm", "mmmmm", "mmmmmm", "mmmmmmm", "mmmmmmmm", "mmmmmmmmm"];
    const HUNDREDS: [&str; 10] = ["", "c", "cc", "ccc", "cd", "d", "dc", "dcc", "dccc", "cm"];
    const TENS: [&str; 10] = ["", "x", "xx", "xxx", "xl", "l", "lx", "lxx", "lxxx", "xc"];
    const UNITS: [&str; 10] = ["", "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix"];
    if !(1..=9999).contains(&n) {
        return n.to_string();
    }
    let digit = |div: i64| usize::try_from((n / div) % 10).unwrap_or(0);
    [THOUSANDS[digit(1000)], HUNDREDS[digit(100)], TENS[digit(10)], UNITS[digit(1)]].concat()
}

const UNITS: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven", "Twelve", "Thirteen",
    "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];
const TENS: [&str; 10] = ["", "Ten", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety"];
const ORDINAL_UNITS: [&str; 20] = [
    "", "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth", "Tenth", "Eleventh",
    "Twelfth", "Thirteenth", "Fourteenth", "Fifteenth", "Sixteenth", "Seventeenth", "Eighteenth", "Nineteenth",
];
const ORDINAL_TENS: [&str; 10] = [
    "", "Tenth", "Twentieth", "Thirtieth", "Fortieth", "Fiftieth", "Sixtieth", "Seventieth", "Eightieth", "Ninetieth",
];
const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October", "November",
    "December",
];
const DAYS: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];
const DAY_ABBREVIATIONS: [&str; 7] = ["Mon", "Tues", "Weds", "Thurs", "Fri", "Sat", "Sun"];
const MIN_UNIQUE_DAY_LENGTH: [usize; 7] = [1, 2, 1, 2, 1, 2, 2];

const SCALES: [(i64, &str); 4] =
    [(1_000_000_000, " Billion"), (1_000_000, " Million"), (1_000, " Thousand"), (100, " Hundred")];

fn small(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn fit(name: &str, min_width: usize, max_width: usize) -> String {
    let mut s: String = name.chars().take(max_width).collect();
    while s.chars().count() < min_width {
        s.push(' ');
    }
    s
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishNumberer;

impl Numberer for EnglishNumberer {
    fn to_words(&self, number: i64) -> String {
        for (scale, word) in SCALES {
            if number >= scale {
                let rem = number % scale;
                let joiner = if rem < 100 || scale == 100 { " and " } else { " " };
                let tail = if rem == 0 { String::new() } else { format!("{joiner}{}", self.to_words(rem)) };
                return format!("{}{word}{tail}", self.to_words(number / scale));
            }
        }
        if number < 20 {
            return UNITS[small(number)].to_string();
        }
        let rem = number % 10;
        let tens = TENS[small(number / 10)];
        if rem == 0 { tens.to_string() } else { format!("{tens} {}", UNITS[small(rem)]) }
    }

    fn to_ordinal_words(&self, number: i64, case: WordCase) -> String {
        let s = SCALES
            .iter()
            .find(|(scale, _)| number >= *scale)
            .map(|&(scale, word)| {
                let rem = number % scale;
                let head = format!("{}{word}", self.to_words(number / scale));
                if rem == 0 {
                    format!("{head}th")
                } else {
                    let joiner = if rem < 100 || scale == 100 { " and " } else { " " };
                    format!("{head}{joiner}{}", self.to_ordinal_words(rem, WordCase::Title))
                }
            })
            .unwrap_or_else(|| {
                if number < 20 {
                    ORDINAL_UNITS[small(number)].to_string()
                } else if number % 10 == 0 {
                    ORDINAL_TENS[small(number / 10)].to_string()
                } else {
                    format!("{}-{}", TENS[small(number / 10)], ORDINAL_UNITS[small(number % 10)])
                }
            });
        case.apply(s)
    }

    fn ordinal_suffix(&self, number: i64) -> &'static str {
        match (number % 100 / 10, number % 10) {
            (1, _) => "th",
            (_, 1) => "st",
            (_, 2) => "nd",
            (_, 3) => "rd",
            _ => "th",
        }
    }

    fn month_name(&self, month: u32, min_width: usize, max_width: Option<usize>) -> String {
        let name = MONTHS.get(month.saturating_sub(1) as usize).copied().unwrap_or_default();
        fit(name, min_width, max_width.unwrap_or(usize::MAX).max(3))
    }

    fn day_name(&self, day: u32, min_width: usize, max_width: Option<usize>) -> String {
        let i = (day.saturating_sub(1) as usize).min(6);
        let max = max_width.unwrap_or(usize::MAX).max(2);
        let full = DAYS[i];
        let name = if full.len() > max { fit(DAY_ABBREVIATIONS[i], min_width, max) } else { fit(full, min_width, max) };
        if min_width == 1 && max == 2 {
            return name.chars().take(MIN_UNIQUE_DAY_LENGTH[i]).collect();
        }
        name
    }
}
