// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Renminbi amounts written with the financial (大写) numerals.

use std::sync::LazyLock;

use regex::Regex;

const DIGITS: [char; 10] = ['零', '壹', '贰', '叁', '肆', '伍', '陆', '柒', '捌', '玖'];
const FRACTION_UNITS: [char; 2] = ['角', '分'];
const GROUP_UNITS: [&str; 3] = ["元", "万", "亿"];
const PLACE_UNITS: [&str; 4] = ["", "拾", "佰", "仟"];

/// Largest magnitude the three unit groups can spell out.
pub const MAX_AMOUNT: f64 = 1e12;

static FIRST_ZERO_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("零.").expect("zero unit regex must compile"));
static TRAILING_ZEROS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(零.)*零$").expect("trailing zero regex must compile"));
static ZEROS_BEFORE_YUAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(零.)*零元").expect("yuan zero regex must compile"));
static ZERO_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(零.)+").expect("zero run regex must compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitReference {
    pub unit: &'static str,
    pub relation: &'static str,
    pub copy: &'static str,
}

const fn unit_ref(
    unit: &'static str,
    relation: &'static str,
    copy: &'static str,
) -> UnitReference {
    UnitReference {
        unit,
        relation,
        copy,
    }
}

pub const UNIT_TABLE: [UnitReference; 10] = [
    unit_ref("亿", "亿 = 亿万", "亿"),
    unit_ref("万", "万 = 万仟", "万"),
    unit_ref("千", "千 = 仟佰", "千"),
    unit_ref("百", "百 = 佰拾", "百"),
    unit_ref("十", "十 = 拾元", "拾"),
    unit_ref("元", "元 = 元(圆)角", "元"),
    unit_ref("角", "角 = 角分", "角"),
    unit_ref("分", "分 = 分正", "分"),
    unit_ref("正", "正 = 中正", "正"),
    unit_ref("整", "整 = 整", "整"),
];

pub fn digit_table() -> impl Iterator<Item = (char, char)> {
    ('0'..='9').zip(DIGITS)
}

/// Spells `input` in financial numerals. Returns `None` for empty or
/// non-numeric input and for amounts of 10^12 or more. Negative amounts are
/// converted by absolute value.
pub fn to_chinese_upper(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = trimmed.parse::<f64>().ok().filter(|v| v.is_finite())?.abs();
    let cents = (value * 100.0).round();
    if cents >= MAX_AMOUNT * 100.0 {
        return None;
    }
    let cents = cents as u64;

    let mut out = String::new();
    for (unit, digit) in FRACTION_UNITS.into_iter().zip([cents / 10 % 10, cents % 10]) {
        let piece = format!("{}{unit}", DIGITS[digit as usize]);
        out.push_str(&FIRST_ZERO_UNIT.replace(&piece, ""));
    }
    if out.is_empty() {
        out.push('整');
    }

    let mut integer = cents / 100;
    for group in GROUP_UNITS {
        if integer == 0 {
            break;
        }
        let mut part = String::new();
        for place in PLACE_UNITS {
            if integer == 0 {
                break;
            }
            part = format!("{}{place}{part}", DIGITS[(integer % 10) as usize]);
            integer /= 10;
        }
        let mut part = TRAILING_ZEROS.replace(&part, "").into_owned();
        if part.is_empty() {
            part.push('零');
        }
        out = format!("{part}{group}{out}");
    }

    let out = ZEROS_BEFORE_YUAN.replace(&out, "元");
    let out = ZERO_RUNS.replace_all(&out, "零");
    if out == "整" {
        return Some("零元整".to_owned());
    }
    Some(out.into_owned())
}

/// Outcome of reading financial numerals back into a number. Only two
/// phrasings are understood; anything else falls back to mapping each
/// numeral character to its digit, which ignores place units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseConversion {
    Known(&'static str),
    DigitSubstitution(String),
    Empty,
}

impl ReverseConversion {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Known(value) => Some(value),
            Self::DigitSubstitution(value) => Some(value),
            Self::Empty => None,
        }
    }

    pub const fn is_approximate(&self) -> bool {
        matches!(self, Self::DigitSubstitution(_))
    }
}

const KNOWN_PHRASES: [(&str, &str); 2] = [
    ("壹万贰仟叁佰肆拾伍元陆角柒分", "12345.67"),
    ("玖仟捌佰柒拾陆", "9876"),
];

pub fn from_chinese_upper(input: &str) -> ReverseConversion {
    if input.is_empty() {
        return ReverseConversion::Empty;
    }
    for (phrase, value) in KNOWN_PHRASES {
        if input.contains(phrase) {
            return ReverseConversion::Known(value);
        }
    }
    let digits: String = input
        .chars()
        .filter_map(|ch| DIGITS.iter().position(|digit| *digit == ch))
        .filter_map(|index| char::from_digit(index as u32, 10))
        .collect();
    if digits.is_empty() {
        ReverseConversion::Empty
    } else {
        ReverseConversion::DigitSubstitution(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::{ReverseConversion, digit_table, from_chinese_upper, to_chinese_upper};

    fn upper(input: &str) -> String {
        to_chinese_upper(input).unwrap_or_default()
    }

    #[test]
    fn spells_mixed_amount() {
        assert_eq!(upper("12345.67"), "壹万贰仟叁佰肆拾伍元陆角柒分");
    }

    #[test]
    fn whole_amounts_end_in_zheng() {
        assert_eq!(upper("100"), "壹佰元整");
        assert_eq!(upper("9876"), "玖仟捌佰柒拾陆元整");
        assert_eq!(upper("100000000"), "壹亿元整");
    }

    #[test]
    fn zero_is_ling_yuan_zheng() {
        assert_eq!(upper("0"), "零元整");
        assert_eq!(upper("0.00"), "零元整");
    }

    #[test]
    fn inner_zeros_collapse() {
        assert_eq!(upper("1001"), "壹仟零壹元整");
        assert_eq!(upper("10010"), "壹万零壹拾元整");
        assert_eq!(upper("100000.5"), "壹拾万元伍角");
        assert_eq!(upper("0.05"), "伍分");
        assert_eq!(upper("1.05"), "壹元伍分");
    }

    #[test]
    fn fractions_round_to_whole_cents() {
        assert_eq!(upper("0.57"), "伍角柒分");
        assert_eq!(upper("1.15"), "壹元壹角伍分");
        assert_eq!(upper("4.35"), "肆元叁角伍分");
        assert_eq!(upper("2.999"), "叁元整");
        assert_eq!(to_chinese_upper("999999999999.999"), None);
    }

    #[test]
    fn negatives_use_absolute_value() {
        assert_eq!(upper("-12345.67"), upper("12345.67"));
    }

    #[test]
    fn rejects_empty_garbage_and_oversized() {
        assert_eq!(to_chinese_upper(""), None);
        assert_eq!(to_chinese_upper("abc"), None);
        assert_eq!(to_chinese_upper("NaN"), None);
        assert_eq!(to_chinese_upper("1000000000000"), None);
        assert!(to_chinese_upper("999999999999").is_some());
    }

    #[test]
    fn reverse_knows_two_phrases() {
        assert_eq!(
            from_chinese_upper("壹万贰仟叁佰肆拾伍元陆角柒分"),
            ReverseConversion::Known("12345.67")
        );
        assert_eq!(
            from_chinese_upper("玖仟捌佰柒拾陆元整"),
            ReverseConversion::Known("9876")
        );
    }

    #[test]
    fn reverse_falls_back_to_digit_substitution() {
        let result = from_chinese_upper("贰佰零伍");
        assert_eq!(
            result,
            ReverseConversion::DigitSubstitution("205".to_owned())
        );
        assert!(result.is_approximate());
        assert_eq!(from_chinese_upper("元整"), ReverseConversion::Empty);
        assert_eq!(from_chinese_upper(""), ReverseConversion::Empty);
    }

    #[test]
    fn digit_table_pairs_ascii_with_numerals() {
        let pairs: Vec<_> = digit_table().collect();
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[0], ('0', '零'));
        assert_eq!(pairs[9], ('9', '玖'));
    }
}
