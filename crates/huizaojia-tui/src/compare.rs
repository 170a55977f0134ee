// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent};
use huizaojia_app::compare::{CellKey, ComparisonTable, CostSide, FeeField, MarkColor, differs};
use huizaojia_app::workflow::{CompareWorkflow, Stage};
use huizaojia_app::{AppState, FileId};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::{
    AnalysisTask, AppRuntime, InternalEvent, ViewData, centered_rect, cursor_prefix, emit_status,
    move_cursor, schedule_analysis,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct CompareUiState {
    pub(crate) workflow: CompareWorkflow,
    pub(crate) file_cursor: usize,
    pub(crate) sheet_cursor: usize,
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) edit: Option<String>,
    pub(crate) menu_cursor: usize,
}

impl CompareUiState {
    /// Numeric columns of the comparison table: each visible field once per
    /// side.
    pub(crate) fn columns(&self) -> Vec<(FeeField, CostSide)> {
        self.workflow
            .table
            .visible_fields()
            .into_iter()
            .flat_map(|field| CostSide::ALL.into_iter().map(move |side| (field, side)))
            .collect()
    }

    pub(crate) fn current_cell(&self) -> Option<CellKey> {
        let row = self.workflow.table.rows.get(self.row)?;
        let (field, side) = self.columns().get(self.column).copied()?;
        Some(CellKey::new(row.id, field, side))
    }

    fn clamp_column(&mut self) {
        let len = self.columns().len();
        self.column = self.column.min(len.saturating_sub(1));
    }
}

pub(crate) fn handle_compare_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match view_data.compare.workflow.stage {
        Stage::Upload => handle_upload_key(state, runtime, view_data, internal_tx, key),
        Stage::Pairing => handle_pairing_key(state, runtime, view_data, internal_tx, key),
        Stage::Analyzing { .. } => {
            if key.code == KeyCode::Esc {
                view_data.compare.workflow.cancel_analysis();
                emit_status(state, view_data, internal_tx, "已取消识别");
            }
            true
        }
        Stage::Results => handle_results_key(state, view_data, internal_tx, key),
        Stage::Detail(_) => match key.code {
            KeyCode::Esc | KeyCode::Backspace => {
                view_data.compare.workflow.show_results();
                true
            }
            _ => false,
        },
        Stage::Comparison => handle_comparison_key(state, view_data, internal_tx, key),
    }
}

fn handle_upload_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let compare = &mut view_data.compare;
    match key.code {
        KeyCode::Char('u') => {
            let file = compare.workflow.upload(runtime.now());
            let message = format!("已上传: {}", file.name);
            debug!(file = %file.id, "mock file uploaded");
            compare.file_cursor = compare.workflow.files.len().saturating_sub(1);
            emit_status(state, view_data, internal_tx, message);
            true
        }
        KeyCode::Char('x') | KeyCode::Delete => {
            let Some(id) = compare.workflow.files.get(compare.file_cursor).map(|f| f.id) else {
                return true;
            };
            let message = match compare.workflow.remove_file(id) {
                Ok(file) => format!("已删除: {}", file.name),
                Err(error) => format!("{error:#}"),
            };
            let len = compare.workflow.files.len();
            compare.file_cursor = compare.file_cursor.min(len.saturating_sub(1));
            emit_status(state, view_data, internal_tx, message);
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut compare.file_cursor, compare.workflow.files.len(), 1);
            true
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut compare.file_cursor, compare.workflow.files.len(), -1);
            true
        }
        KeyCode::Enter | KeyCode::Char('p') => {
            if let Err(error) = compare.workflow.open_pairing() {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
            true
        }
        _ => false,
    }
}

fn handle_pairing_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let workflow = &mut view_data.compare.workflow;
    match key.code {
        KeyCode::Char('b') => workflow.pairing.cycle_baseline(),
        KeyCode::Char('m') => workflow.pairing.cycle_match_mode(),
        KeyCode::Enter => match workflow.start_analysis() {
            Ok(token) => {
                schedule_analysis(
                    internal_tx,
                    AnalysisTask::Compare,
                    token,
                    runtime.analysis_delay(),
                );
                emit_status(state, view_data, internal_tx, "正在智能识别清单...");
            }
            Err(error) => {
                warn!(error = %error, "analysis could not start");
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        },
        KeyCode::Esc => workflow.close_pairing(),
        _ => {}
    }
    true
}

fn handle_results_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let compare = &mut view_data.compare;
    let sheet_id = compare
        .workflow
        .sheets
        .get(compare.sheet_cursor)
        .map(|sheet| sheet.id);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut compare.sheet_cursor, compare.workflow.sheets.len(), 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut compare.sheet_cursor, compare.workflow.sheets.len(), -1);
        }
        KeyCode::Char(' ') => {
            if let Some(id) = sheet_id
                && let Some(is_list) = compare.workflow.toggle_is_list(id)
            {
                let message = if is_list {
                    "已标记为清单"
                } else {
                    "已取消清单标记"
                };
                emit_status(state, view_data, internal_tx, message);
            }
        }
        KeyCode::Char('p') => {
            if let Some(id) = sheet_id {
                compare.workflow.toggle_preview(id);
            }
        }
        KeyCode::Enter => {
            if let Some(id) = sheet_id {
                compare.workflow.open_sheet(id);
            }
        }
        KeyCode::Char('o') => {
            if let Some(id) = compare.workflow.active_file {
                compare.workflow.toggle_file_expanded(id);
            }
        }
        KeyCode::Char('[') => switch_file(compare, -1),
        KeyCode::Char(']') => switch_file(compare, 1),
        KeyCode::Char('c') => {
            compare.workflow.open_comparison();
            compare.clamp_column();
        }
        KeyCode::Char('u') | KeyCode::Backspace => compare.workflow.back_to_upload(),
        _ => return false,
    }
    true
}

fn switch_file(compare: &mut CompareUiState, delta: isize) {
    let files: Vec<FileId> = compare.workflow.files.iter().map(|file| file.id).collect();
    let current = compare
        .workflow
        .active_file
        .and_then(|id| files.iter().position(|file| *file == id))
        .unwrap_or(0);
    let mut next = current;
    move_cursor(&mut next, files.len(), delta);
    if let Some(id) = files.get(next) {
        compare.workflow.view_file(*id);
        compare.sheet_cursor = 0;
    }
}

fn handle_comparison_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.compare.edit.is_some() {
        handle_edit_key(state, view_data, internal_tx, key);
        return true;
    }
    if view_data.compare.workflow.table.context_menu.is_some() {
        handle_menu_key(state, view_data, internal_tx, key);
        return true;
    }

    let compare = &mut view_data.compare;
    let rows = compare.workflow.table.rows.len();
    let columns = compare.columns().len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => move_cursor(&mut compare.row, rows, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(&mut compare.row, rows, -1),
        KeyCode::Char('l') | KeyCode::Right => move_cursor(&mut compare.column, columns, 1),
        KeyCode::Char('h') | KeyCode::Left => move_cursor(&mut compare.column, columns, -1),
        KeyCode::Char('v') => {
            if compare.workflow.table.dragging {
                compare.workflow.table.end_drag();
            } else if let Some(cell) = compare.current_cell() {
                compare.workflow.table.begin_drag(cell);
            }
        }
        KeyCode::Char('m') => {
            if let Some(cell) = compare.current_cell() {
                let x = u16::try_from(compare.column).unwrap_or(u16::MAX);
                let y = u16::try_from(compare.row).unwrap_or(u16::MAX);
                compare
                    .workflow
                    .table
                    .open_context_menu(x, y, cell.row_id, cell);
                compare.menu_cursor = 0;
            }
        }
        KeyCode::Char('x') => {
            if let Some(cell) = compare.current_cell()
                && compare.workflow.table.clear_mark(cell)
            {
                emit_status(state, view_data, internal_tx, "已清除标记");
            }
        }
        KeyCode::Char('X') => {
            compare.workflow.table.clear_all_marks();
            emit_status(state, view_data, internal_tx, "已清除全部标记");
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            let Some(cell) = compare.current_cell() else {
                return true;
            };
            if !cell.field.is_editable() {
                let message = format!("{}由各项费用计算得出，不能直接修改", cell.field.label());
                emit_status(state, view_data, internal_tx, message);
                return true;
            }
            let value = compare.workflow.table.cell_value(cell).unwrap_or_default();
            compare.edit = Some(format_amount(value));
        }
        KeyCode::Char('n') => jump_to_next_difference(state, view_data, internal_tx),
        KeyCode::Char(digit @ '1'..='5') => {
            let index = digit as usize - '1' as usize;
            if let Some(field) = FeeField::FEES.get(index).copied() {
                let shown = compare.workflow.table.toggle_fee_column(field);
                compare.clamp_column();
                let verb = if shown { "显示" } else { "隐藏" };
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("{verb}{}列", field.label()),
                );
            }
        }
        KeyCode::Esc => {
            if compare.workflow.table.selection.is_empty() {
                compare.workflow.show_results();
            } else {
                compare.workflow.table.clear_selection();
            }
        }
        _ => return false,
    }

    if compare_moved(key)
        && let Some(cell) = view_data.compare.current_cell()
    {
        view_data.compare.workflow.table.hover(cell);
    }
    true
}

fn compare_moved(key: KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Char('h' | 'j' | 'k' | 'l')
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
    )
}

fn handle_menu_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let compare = &mut view_data.compare;
    let color = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut compare.menu_cursor, MarkColor::ALL.len(), 1);
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut compare.menu_cursor, MarkColor::ALL.len(), -1);
            None
        }
        KeyCode::Char(digit @ '1'..='4') => {
            MarkColor::ALL.get(digit as usize - '1' as usize).copied()
        }
        KeyCode::Enter => MarkColor::ALL.get(compare.menu_cursor).copied(),
        KeyCode::Char('x') => {
            if let Some(menu) = compare.workflow.table.context_menu {
                compare.workflow.table.clear_mark(menu.cell);
            }
            compare.workflow.table.close_context_menu();
            None
        }
        KeyCode::Esc => {
            compare.workflow.table.close_context_menu();
            None
        }
        _ => None,
    };
    if let Some(color) = color
        && compare.workflow.table.apply_mark(color).is_some()
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("已标记为{}", color.label()),
        );
    }
}

fn handle_edit_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let compare = &mut view_data.compare;
    let Some(buffer) = compare.edit.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => compare.edit = None,
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '.' || ch == '-' => buffer.push(ch),
        KeyCode::Enter => {
            let text = buffer.trim().to_owned();
            let Some(cell) = compare.current_cell() else {
                compare.edit = None;
                return;
            };
            let result = text
                .parse::<f64>()
                .map_err(anyhow::Error::from)
                .and_then(|value| compare.workflow.table.edit_cell(cell, value));
            let message = match result {
                Ok(()) => {
                    compare.edit = None;
                    debug!(cell = %cell, "comparison cell edited");
                    format!("已修改{}", cell.field.label())
                }
                Err(error) => format!("修改失败: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        _ => {}
    }
}

fn jump_to_next_difference(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let compare = &mut view_data.compare;
    let rows = &compare.workflow.table.rows;
    let count = rows.len();
    let next = (1..=count)
        .map(|offset| (compare.row + offset) % count.max(1))
        .find(|index| rows[*index].difference_count() > 0)
        .map(|index| rows[index].id);
    match next {
        Some(row_id) => {
            if let Some(position) = compare.workflow.table.highlight_row(row_id) {
                compare.row = position;
            }
        }
        None => emit_status(state, view_data, internal_tx, "没有发现差异"),
    }
}

fn format_amount(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

pub(crate) fn status_hint(compare: &CompareUiState) -> &'static str {
    match compare.workflow.stage {
        Stage::Upload => "u 上传 | x 删除 | enter 配对分析",
        Stage::Pairing => "b 对比基准 | m 匹配方式 | enter 开始 | esc 取消",
        Stage::Analyzing { .. } => "esc 取消识别",
        Stage::Results => "j/k 选择 | space 清单标记 | p 预览 | enter 详情 | o 展开文件 | [/] 切换文件 | c 对比表",
        Stage::Detail(_) => "esc 返回识别结果",
        Stage::Comparison if compare.edit.is_some() => "输入数值 | enter 确认 | esc 取消",
        Stage::Comparison if compare.workflow.table.context_menu.is_some() => {
            "1-4 选择颜色 | x 清除 | esc 关闭"
        }
        Stage::Comparison => "hjkl 移动 | v 拖选 | m 标记 | e 编辑 | n 下一处差异 | 1-5 列",
    }
}

pub(crate) fn render_compare(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    compare: &CompareUiState,
) {
    match compare.workflow.stage {
        Stage::Comparison => render_comparison_table(frame, area, block, compare),
        _ => {
            let body = Paragraph::new(render_workflow_text(compare)).block(block);
            frame.render_widget(body, area);
        }
    }

    if compare.workflow.stage == Stage::Pairing {
        let popup = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup);
        let pairing = compare.workflow.pairing;
        let text = format!(
            "对比基准 (b): {}\n匹配方式 (m): {}\n\nenter 开始分析 | esc 取消",
            pairing.baseline_label(),
            pairing.match_mode_label()
        );
        let dialog =
            Paragraph::new(text).block(Block::default().title("配对设置").borders(Borders::ALL));
        frame.render_widget(dialog, popup);
    }
}

pub(crate) fn render_workflow_text(compare: &CompareUiState) -> String {
    let workflow = &compare.workflow;
    match workflow.stage {
        Stage::Upload | Stage::Pairing => {
            let mut lines = vec!["上传清单文件 (u)".to_owned(), String::new()];
            if workflow.files.is_empty() {
                lines.push("尚未上传文件".to_owned());
            }
            for (index, file) in workflow.files.iter().enumerate() {
                lines.push(format!(
                    "{} [{}] {}  {}  {} 个工作表",
                    cursor_prefix(index == compare.file_cursor),
                    file.role.label(),
                    file.name,
                    file.uploaded_at,
                    file.sheet_count
                ));
            }
            lines.join("\n")
        }
        Stage::Analyzing { .. } => {
            let names: Vec<&str> = workflow.files.iter().map(|file| file.name.as_str()).collect();
            format!(
                "正在智能识别清单，请稍候...\n\n{}\n\nesc 取消",
                names.join("\n")
            )
        }
        Stage::Results => {
            let file = workflow
                .active_file()
                .map(|file| format!("{} ({})", file.name, file.role.label()))
                .unwrap_or_default();
            let mut lines = vec![
                format!("识别结果: {file}"),
                format!(
                    "共 {} 个工作表，其中清单 {} 个",
                    workflow.sheets.len(),
                    workflow.list_sheet_count()
                ),
                String::new(),
            ];
            for file in &workflow.files {
                let expanded = workflow.expanded_files.contains(&file.id);
                let active = if workflow.active_file == Some(file.id) {
                    "*"
                } else {
                    " "
                };
                let arrow = if expanded { "▾" } else { "▸" };
                lines.push(format!("{active}{arrow} [{}] {}", file.role.label(), file.name));
                if expanded {
                    let selected = workflow
                        .selected_sheets
                        .iter()
                        .filter(|(file_id, _)| *file_id == file.id)
                        .count();
                    lines.push(format!("     已选 {selected} 个工作表参与对比"));
                }
            }
            lines.push(String::new());
            for (index, sheet) in workflow.sheets.iter().enumerate() {
                let kind = if sheet.is_list { "清单" } else { "非清单" };
                lines.push(format!(
                    "{} [{kind}] {}  {} 行  置信度 {}%  匹配: {}",
                    cursor_prefix(index == compare.sheet_cursor),
                    sheet.name,
                    sheet.row_count,
                    sheet.confidence,
                    sheet.matched_fields.join("、")
                ));
                if workflow.expanded_previews.contains(&sheet.id) {
                    for preview in sheet.preview {
                        lines.push(format!("      {}", preview.join(" | ")));
                    }
                }
            }
            lines.join("\n")
        }
        Stage::Detail(id) => match workflow.sheet(id) {
            Some(sheet) => {
                let mut lines = vec![sheet.name.to_owned(), String::new()];
                lines.push(sheet.header_fields.join(" | "));
                for preview in sheet.preview {
                    lines.push(preview.join(" | "));
                }
                lines.join("\n")
            }
            None => "工作表不存在".to_owned(),
        },
        Stage::Comparison => String::new(),
    }
}

fn render_comparison_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    compare: &CompareUiState,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(inner);

    let table = &compare.workflow.table;
    let columns = compare.columns();
    let mut header = vec![
        Cell::from("序号"),
        Cell::from("项目编码"),
        Cell::from("项目名称"),
    ];
    header.extend(
        columns
            .iter()
            .map(|(field, side)| Cell::from(format!("{}{}", field.label(), side.label()))),
    );

    let rows: Vec<Row> = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut cells = vec![
                Cell::from(row.index.to_string()),
                Cell::from(row.code.clone()),
                Cell::from(row.name.clone()),
            ];
            for (column_index, (field, side)) in columns.iter().enumerate() {
                let key = CellKey::new(row.id, *field, *side);
                let cursor = row_index == compare.row && column_index == compare.column;
                let style = cell_style(table, key, differs(row, *field), cursor);
                cells.push(
                    Cell::from(format!("{:.2}", row.side(*side).get(*field))).style(style),
                );
            }
            let mut row_style = Style::default();
            if table.highlighted_row == Some(row.id) {
                row_style = row_style.add_modifier(Modifier::BOLD);
            }
            Row::new(cells).style(row_style)
        })
        .collect();

    let mut widths = vec![
        Constraint::Length(4),
        Constraint::Length(13),
        Constraint::Length(18),
    ];
    widths.extend(columns.iter().map(|_| Constraint::Length(12)));
    let widget = Table::new(rows, widths).header(
        Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(widget, layout[0]);

    frame.render_widget(Paragraph::new(render_footer_text(compare)), layout[1]);

    if let Some(menu) = table.context_menu {
        let popup = centered_rect(30, 40, area);
        frame.render_widget(Clear, popup);
        let mut lines: Vec<String> = MarkColor::ALL
            .iter()
            .enumerate()
            .map(|(index, color)| {
                format!(
                    "{} {} {}",
                    cursor_prefix(index == compare.menu_cursor),
                    index + 1,
                    color.label()
                )
            })
            .collect();
        lines.push("  x 清除标记".to_owned());
        let dialog = Paragraph::new(lines.join("\n")).block(
            Block::default()
                .title(format!("标记 {}", menu.cell))
                .borders(Borders::ALL),
        );
        frame.render_widget(dialog, popup);
    }

    if let Some(buffer) = &compare.edit {
        let popup = centered_rect(40, 20, area);
        frame.render_widget(Clear, popup);
        let title = compare
            .current_cell()
            .map(|cell| format!("编辑{}{}", cell.field.label(), cell.side.label()))
            .unwrap_or_default();
        let dialog = Paragraph::new(format!("{buffer}_"))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(dialog, popup);
    }
}

fn cell_style(table: &ComparisonTable, key: CellKey, differs: bool, cursor: bool) -> Style {
    let mut style = Style::default();
    if differs {
        style = style.fg(Color::Red);
    }
    if let Some(mark) = table
        .row(key.row_id)
        .and_then(|row| row.mark(key.field, key.side))
    {
        style = style.bg(mark_color(mark)).fg(Color::Black);
    }
    if table.selection.contains(&key) {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

const fn mark_color(mark: MarkColor) -> Color {
    match mark {
        MarkColor::Red => Color::LightRed,
        MarkColor::Yellow => Color::LightYellow,
        MarkColor::Green => Color::LightGreen,
        MarkColor::Blue => Color::LightBlue,
    }
}

pub(crate) fn render_footer_text(compare: &CompareUiState) -> String {
    let table = &compare.workflow.table;
    let summary = table.selection_summary();
    let mut parts = Vec::new();
    if summary.count > 0 {
        parts.push(format!("已选 {} 格，合计 {:.2}", summary.count, summary.sum));
    }
    for side in CostSide::ALL {
        parts.push(format!("{}合计 {:.2}", side.label(), table.totals(side)));
    }
    if table.file_changed {
        parts.push("文件已修改".to_owned());
    }
    parts.join(" | ")
}
