// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent};
use huizaojia_app::AppState;
use huizaojia_app::datecalc::{
    DEFAULT_PROJECTION_OFFSET, Direction, DurationSummary, duration_days, format_date,
    format_zh_date, parse_date, project_date,
};
use huizaojia_app::numeral::{
    ReverseConversion, UNIT_TABLE, digit_table, from_chinese_upper, to_chinese_upper,
};
use huizaojia_app::tax::{
    COMMON_TAX_RATES, DEFAULT_GROSS_INPUT, DEFAULT_NET_INPUT, DEFAULT_TAX_RATE,
    FormattedBreakdown, Precision, TaxBreakdown, format_rate, parse_amount,
};
use std::sync::mpsc::Sender;
use time::Date;

use crate::{
    AppRuntime, InternalEvent, ViewData, cursor_prefix, edit_text, emit_status, is_ctrl,
    move_cursor,
};

// Date calculator

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateField {
    Start,
    End,
    IncludeEnd,
    ProjectionStart,
    Offset,
    Direction,
}

const DATE_FIELDS: [DateField; 6] = [
    DateField::Start,
    DateField::End,
    DateField::IncludeEnd,
    DateField::ProjectionStart,
    DateField::Offset,
    DateField::Direction,
];

/// Results are only replaced when the inputs parse, so a half-typed date
/// keeps the last good answer on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DateUiState {
    pub(crate) start: String,
    pub(crate) end: String,
    pub(crate) include_end: bool,
    pub(crate) projection_start: String,
    pub(crate) offset: String,
    pub(crate) direction: Direction,
    pub(crate) field: usize,
    pub(crate) duration: Option<DurationSummary>,
    pub(crate) projected: Option<Date>,
}

impl DateUiState {
    pub(crate) fn new(today: Date) -> Self {
        let today = format_date(today);
        let mut date = Self {
            start: today.clone(),
            end: today.clone(),
            include_end: true,
            projection_start: today,
            offset: DEFAULT_PROJECTION_OFFSET.to_string(),
            direction: Direction::Forward,
            field: 0,
            duration: None,
            projected: None,
        };
        date.refresh();
        date
    }

    fn refresh(&mut self) {
        if let (Some(start), Some(end)) = (parse_date(&self.start), parse_date(&self.end)) {
            self.duration = Some(duration_days(start, end, self.include_end));
        }
        if let (Some(start), Ok(offset)) = (
            parse_date(&self.projection_start),
            self.offset.trim().parse::<i64>(),
        ) && let Some(projected) = project_date(start, offset, self.direction)
        {
            self.projected = Some(projected);
        }
    }

    fn current_field(&self) -> DateField {
        DATE_FIELDS[self.field.min(DATE_FIELDS.len() - 1)]
    }

    fn text_mut(&mut self, field: DateField) -> Option<&mut String> {
        match field {
            DateField::Start => Some(&mut self.start),
            DateField::End => Some(&mut self.end),
            DateField::ProjectionStart => Some(&mut self.projection_start),
            DateField::Offset => Some(&mut self.offset),
            DateField::IncludeEnd | DateField::Direction => None,
        }
    }
}

pub(crate) fn handle_date_key(view_data: &mut ViewData, key: KeyEvent) -> bool {
    let date = &mut view_data.date;
    match key.code {
        KeyCode::Up => {
            move_cursor(&mut date.field, DATE_FIELDS.len(), -1);
            return true;
        }
        KeyCode::Down | KeyCode::Enter => {
            move_cursor(&mut date.field, DATE_FIELDS.len(), 1);
            return true;
        }
        _ => {}
    }

    let field = date.current_field();
    let consumed = match (field, key.code) {
        (DateField::IncludeEnd, KeyCode::Char(' ')) => {
            date.include_end = !date.include_end;
            true
        }
        (DateField::Direction, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) => {
            date.direction = date.direction.flip();
            true
        }
        _ => date
            .text_mut(field)
            .is_some_and(|buffer| edit_text(buffer, key)),
    };
    if consumed {
        date.refresh();
    }
    consumed
}

pub(crate) fn render_date_text(date: &DateUiState) -> String {
    let field = date.current_field();
    let line = |target: DateField, label: &str, value: String| {
        format!("{} {label}: {value}", cursor_prefix(field == target))
    };
    let checkbox = if date.include_end { "[x]" } else { "[ ]" };

    let mut lines = vec![
        "日期间隔".to_owned(),
        line(DateField::Start, "开始日期", date.start.clone()),
        line(DateField::End, "结束日期", date.end.clone()),
        line(DateField::IncludeEnd, "包含结束日期", checkbox.to_owned()),
        String::new(),
    ];
    match &date.duration {
        Some(summary) => {
            lines.push(format!(
                "  总天数 {} 天   工作日 {} 天   休息日 {} 天",
                summary.total_days, summary.work_days, summary.rest_days
            ));
            lines.push(format!("  {}", summary.breakdown));
        }
        None => lines.push("  请输入有效日期 (YYYY-MM-DD)".to_owned()),
    }

    lines.extend([
        String::new(),
        "日期推算".to_owned(),
        line(
            DateField::ProjectionStart,
            "起始日期",
            date.projection_start.clone(),
        ),
        line(DateField::Offset, "间隔天数", date.offset.clone()),
        line(
            DateField::Direction,
            "方向",
            date.direction.label().to_owned(),
        ),
        String::new(),
    ]);
    match date.projected {
        Some(projected) => lines.push(format!("  推算结果: {}", format_zh_date(projected))),
        None => lines.push("  请输入有效日期与天数".to_owned()),
    }
    lines.join("\n")
}

// Tax calculator

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaxField {
    GrossAmount,
    GrossRate,
    NetAmount,
    NetRate,
}

const TAX_FIELDS: [TaxField; 4] = [
    TaxField::GrossAmount,
    TaxField::GrossRate,
    TaxField::NetAmount,
    TaxField::NetRate,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaxUiState {
    pub(crate) gross_input: String,
    pub(crate) gross_rate: String,
    pub(crate) net_input: String,
    pub(crate) net_rate: String,
    pub(crate) precision: Precision,
    pub(crate) field: usize,
}

impl Default for TaxUiState {
    fn default() -> Self {
        Self {
            gross_input: DEFAULT_GROSS_INPUT.to_owned(),
            gross_rate: format_rate(DEFAULT_TAX_RATE),
            net_input: DEFAULT_NET_INPUT.to_owned(),
            net_rate: format_rate(DEFAULT_TAX_RATE),
            precision: Precision::default(),
            field: 0,
        }
    }
}

impl TaxUiState {
    fn current_field(&self) -> TaxField {
        TAX_FIELDS[self.field.min(TAX_FIELDS.len() - 1)]
    }

    pub(crate) fn gross_breakdown(&self) -> TaxBreakdown {
        TaxBreakdown::from_gross(
            parse_amount(&self.gross_input),
            parse_amount(&self.gross_rate),
        )
    }

    pub(crate) fn net_breakdown(&self) -> TaxBreakdown {
        TaxBreakdown::from_net(parse_amount(&self.net_input), parse_amount(&self.net_rate))
    }

    fn focused_breakdown(&self) -> TaxBreakdown {
        match self.current_field() {
            TaxField::GrossAmount | TaxField::GrossRate => self.gross_breakdown(),
            TaxField::NetAmount | TaxField::NetRate => self.net_breakdown(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaxFigure {
    Tax,
    Net,
    Gross,
}

impl TaxFigure {
    const fn label(self) -> &'static str {
        match self {
            Self::Tax => "税额",
            Self::Net => "不含税金额",
            Self::Gross => "含税金额",
        }
    }

    fn pick(self, formatted: &FormattedBreakdown) -> &str {
        match self {
            Self::Tax => &formatted.tax,
            Self::Net => &formatted.net,
            Self::Gross => &formatted.gross,
        }
    }
}

/// Steps to the neighbouring preset. A typed rate between presets moves to
/// the nearest preset in that direction; the ends wrap.
fn cycle_rate(rate: &mut String, forward: bool) {
    let current = parse_amount(rate);
    let next = if forward {
        COMMON_TAX_RATES
            .iter()
            .copied()
            .find(|preset| *preset > current)
            .unwrap_or(COMMON_TAX_RATES[0])
    } else {
        COMMON_TAX_RATES
            .iter()
            .copied()
            .rev()
            .find(|preset| *preset < current)
            .unwrap_or(COMMON_TAX_RATES[COMMON_TAX_RATES.len() - 1])
    };
    *rate = format_rate(next);
}

pub(crate) fn handle_tax_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if is_ctrl(key, 'p') {
        view_data.tax.precision = view_data.tax.precision.next();
        let message = format!("保留 {} 位小数", view_data.tax.precision.digits());
        emit_status(state, view_data, internal_tx, message);
        return true;
    }

    let figure = if is_ctrl(key, 't') {
        Some(TaxFigure::Tax)
    } else if is_ctrl(key, 'n') {
        Some(TaxFigure::Net)
    } else if is_ctrl(key, 'g') {
        Some(TaxFigure::Gross)
    } else {
        None
    };
    if let Some(figure) = figure {
        let formatted = view_data
            .tax
            .focused_breakdown()
            .formatted(view_data.tax.precision);
        let value = figure.pick(&formatted).to_owned();
        copy_value(
            state,
            runtime,
            view_data,
            internal_tx,
            figure.label(),
            &value,
        );
        return true;
    }

    let tax = &mut view_data.tax;
    match (tax.current_field(), key.code) {
        (_, KeyCode::Up) => move_cursor(&mut tax.field, TAX_FIELDS.len(), -1),
        (_, KeyCode::Down | KeyCode::Enter) => move_cursor(&mut tax.field, TAX_FIELDS.len(), 1),
        (TaxField::GrossRate, KeyCode::Left) => cycle_rate(&mut tax.gross_rate, false),
        (TaxField::GrossRate, KeyCode::Right) => cycle_rate(&mut tax.gross_rate, true),
        (TaxField::NetRate, KeyCode::Left) => cycle_rate(&mut tax.net_rate, false),
        (TaxField::NetRate, KeyCode::Right) => cycle_rate(&mut tax.net_rate, true),
        (TaxField::GrossAmount, _) => return edit_text(&mut tax.gross_input, key),
        (TaxField::GrossRate, _) => return edit_text(&mut tax.gross_rate, key),
        (TaxField::NetAmount, _) => return edit_text(&mut tax.net_input, key),
        (TaxField::NetRate, _) => return edit_text(&mut tax.net_rate, key),
    }
    true
}

fn copy_value<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    label: &str,
    value: &str,
) {
    let message = match runtime.copy_to_clipboard(value) {
        Ok(()) => format!("已复制{label}: {value}"),
        Err(error) => format!("复制失败: {error:#}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

pub(crate) fn render_tax_text(tax: &TaxUiState) -> String {
    let field = tax.current_field();
    let gross = tax.gross_breakdown().formatted(tax.precision);
    let net = tax.net_breakdown().formatted(tax.precision);
    let rates = |input: &str| {
        let selected = parse_amount(input);
        let presets = COMMON_TAX_RATES
            .iter()
            .map(|rate| {
                let rate_text = format_rate(*rate);
                if *rate == selected {
                    format!("[{rate_text}%]")
                } else {
                    format!(" {rate_text}% ")
                }
            })
            .collect::<Vec<_>>()
            .join("");
        format!("{input}%   {presets}")
    };

    [
        format!("精度: 保留 {} 位小数", tax.precision.digits()),
        String::new(),
        "含税金额 → 不含税金额".to_owned(),
        format!(
            "{} 含税金额: ¥{}",
            cursor_prefix(field == TaxField::GrossAmount),
            tax.gross_input
        ),
        format!(
            "{} 税率: {}",
            cursor_prefix(field == TaxField::GrossRate),
            rates(&tax.gross_rate)
        ),
        format!("  不含税金额 ¥{}   税额 ¥{}", gross.net, gross.tax),
        String::new(),
        "不含税金额 → 含税金额".to_owned(),
        format!(
            "{} 不含税金额: ¥{}",
            cursor_prefix(field == TaxField::NetAmount),
            tax.net_input
        ),
        format!(
            "{} 税率: {}",
            cursor_prefix(field == TaxField::NetRate),
            rates(&tax.net_rate)
        ),
        format!("  含税金额 ¥{}   税额 ¥{}", net.gross, net.tax),
    ]
    .join("\n")
}

// Amount converter

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ConverterField {
    #[default]
    Number,
    Chinese,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ConverterUiState {
    pub(crate) number: String,
    pub(crate) chinese: String,
    pub(crate) field: ConverterField,
    pub(crate) approximate: bool,
    pub(crate) error: Option<String>,
}

impl ConverterUiState {
    fn number_edited(&mut self) {
        self.approximate = false;
        if self.number.trim().is_empty() {
            self.chinese.clear();
            self.error = None;
            return;
        }
        match to_chinese_upper(&self.number) {
            Some(text) => {
                self.chinese = text;
                self.error = None;
            }
            None => {
                self.chinese.clear();
                self.error = Some("请输入有效金额（小于一万亿）".to_owned());
            }
        }
    }

    fn chinese_edited(&mut self) {
        self.error = None;
        let conversion = from_chinese_upper(&self.chinese);
        self.approximate = conversion.is_approximate();
        match conversion {
            ReverseConversion::Known(value) => self.number = value.to_owned(),
            ReverseConversion::DigitSubstitution(value) => self.number = value,
            ReverseConversion::Empty => self.number.clear(),
        }
    }

    fn clear(&mut self) {
        *self = Self {
            field: self.field,
            ..Self::default()
        };
    }
}

pub(crate) fn handle_converter_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if is_ctrl(key, 'y') {
        let (label, value) = match view_data.converter.field {
            ConverterField::Number => ("大写金额", view_data.converter.chinese.clone()),
            ConverterField::Chinese => ("小写金额", view_data.converter.number.clone()),
        };
        if value.is_empty() {
            emit_status(state, view_data, internal_tx, "没有可复制的结果");
        } else {
            copy_value(state, runtime, view_data, internal_tx, label, &value);
        }
        return true;
    }
    if is_ctrl(key, 'l') {
        view_data.converter.clear();
        return true;
    }

    let converter = &mut view_data.converter;
    match key.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Enter => {
            converter.field = match converter.field {
                ConverterField::Number => ConverterField::Chinese,
                ConverterField::Chinese => ConverterField::Number,
            };
            true
        }
        _ => match converter.field {
            ConverterField::Number => {
                let edited = edit_text(&mut converter.number, key);
                if edited {
                    converter.number_edited();
                }
                edited
            }
            ConverterField::Chinese => {
                let edited = edit_text(&mut converter.chinese, key);
                if edited {
                    converter.chinese_edited();
                }
                edited
            }
        },
    }
}

pub(crate) fn render_converter_text(converter: &ConverterUiState) -> String {
    let mut lines = vec![
        format!(
            "{} 小写金额: {}",
            cursor_prefix(converter.field == ConverterField::Number),
            converter.number
        ),
        format!(
            "{} 大写金额: {}",
            cursor_prefix(converter.field == ConverterField::Chinese),
            converter.chinese
        ),
    ];
    if let Some(error) = &converter.error {
        lines.push(format!("  {error}"));
    }
    if converter.approximate {
        lines.push("  注意: 仅按字符替换数字，未解析数位单位，结果仅供参考".to_owned());
    }

    lines.push(String::new());
    lines.push("数字对照".to_owned());
    let digits = digit_table()
        .map(|(arabic, upper)| format!("{arabic}={upper}"))
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(format!("  {digits}"));

    lines.push(String::new());
    lines.push("单位对照".to_owned());
    for unit in &UNIT_TABLE {
        lines.push(format!("  {}  {}  ({})", unit.unit, unit.relation, unit.copy));
    }
    lines.join("\n")
}
