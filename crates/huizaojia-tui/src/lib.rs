// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod admin;
mod calc;
mod chat;
mod compare;
mod home;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use huizaojia_app::{
    AppCommand, AppEvent, AppState, Focus, MenuItem, NAVIGATION_MENU, SubMenuItem, View,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, OffsetDateTime};
use tracing::info;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const SIDEBAR_WIDTH: u16 = 28;
const CURSOR_MARK: &str = "›";

pub trait AppRuntime {
    /// Answers one consultation turn. Failures come back as displayable
    /// text, never as an error.
    fn ask_assistant(&mut self, category: &str, question: &str) -> String;
    fn spawn_assistant(
        &mut self,
        request_id: u64,
        category: &str,
        question: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let reply = self.ask_assistant(category, question);
        tx.send(InternalEvent::AssistantReply { request_id, reply })
            .map_err(|_| anyhow::anyhow!("chat event channel closed"))?;
        Ok(())
    }
    fn copy_to_clipboard(&mut self, text: &str) -> Result<()>;
    /// Reads a local image into a `data:` URL for preview.
    fn load_avatar(&mut self, path: &str) -> Result<String>;
    fn analysis_delay(&self) -> Duration;
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTask {
    Compare,
    Vision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    DeferredStatus { message: String },
    AssistantReply { request_id: u64, reply: String },
    AnalysisDone { task: AnalysisTask, token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SidebarEntry {
    Menu(&'static MenuItem),
    Sub(&'static SubMenuItem),
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    sidebar_cursor: usize,
    help_visible: bool,
    status_token: u64,
    home: home::HomeUiState,
    vision: home::VisionUiState,
    date: calc::DateUiState,
    tax: calc::TaxUiState,
    converter: calc::ConverterUiState,
    chat: chat::ChatUiState,
    compare: compare::CompareUiState,
    profile: admin::ProfileUiState,
    users: admin::UserAdminUiState,
    roles: admin::RoleAdminUiState,
    menus: admin::MenuAdminUiState,
}

impl ViewData {
    fn new(today: Date) -> Self {
        Self {
            sidebar_cursor: 0,
            help_visible: false,
            status_token: 0,
            home: home::HomeUiState::default(),
            vision: home::VisionUiState::default(),
            date: calc::DateUiState::new(today),
            tax: calc::TaxUiState::default(),
            converter: calc::ConverterUiState::default(),
            chat: chat::ChatUiState::default(),
            compare: compare::CompareUiState::default(),
            profile: admin::ProfileUiState::default(),
            users: admin::UserAdminUiState::default(),
            roles: admin::RoleAdminUiState::default(),
            menus: admin::MenuAdminUiState::default(),
        }
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(runtime.now().date());
    let (internal_tx, internal_rx) = mpsc::channel();
    sync_sidebar_cursor(state, &mut view_data);
    info!(view = %state.view().title(), "tui started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::DeferredStatus { message } => {
                emit_status(state, view_data, tx, message);
            }
            InternalEvent::AssistantReply { request_id, reply } => {
                chat::handle_reply(&mut view_data.chat, request_id, reply);
            }
            InternalEvent::AnalysisDone {
                task: AnalysisTask::Compare,
                token,
            } => {
                if view_data.compare.workflow.finish_analysis(token) {
                    emit_status(state, view_data, tx, "识别完成");
                }
            }
            InternalEvent::AnalysisDone {
                task: AnalysisTask::Vision,
                token,
            } => {
                if view_data.vision.finish(token) {
                    emit_status(state, view_data, tx, "识图完成");
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn schedule_deferred_status(
    internal_tx: &Sender<InternalEvent>,
    delay: Duration,
    message: impl Into<String>,
) {
    let sender = internal_tx.clone();
    let message = message.into();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(InternalEvent::DeferredStatus { message });
    });
}

/// Runs a simulated analysis in the background. Completion is reported by
/// token; a token that is no longer current is ignored on arrival.
fn schedule_analysis(
    internal_tx: &Sender<InternalEvent>,
    task: AnalysisTask,
    token: u64,
    delay: Duration,
) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(InternalEvent::AnalysisDone { task, token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_command(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let previous = state.view();
    for event in state.dispatch(command) {
        match event {
            AppEvent::ViewChanged(view) => {
                info!(from = %previous.title(), to = %view.title(), "view changed");
                leave_view(view_data, &previous);
                sync_sidebar_cursor(state, view_data);
            }
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::MenuToggled { .. }
            | AppEvent::FavoriteToggled { .. }
            | AppEvent::FocusChanged(_)
            | AppEvent::StatusCleared => {}
        }
    }
}

/// Drops the transient state of a view that is no longer shown. Background
/// work it started is invalidated, so late results are discarded.
fn leave_view(view_data: &mut ViewData, previous: &View) {
    match previous {
        View::AiChat { .. } => view_data.chat.reset(),
        View::ContractCompare => view_data.compare.workflow.cancel_analysis(),
        View::AiVision => view_data.vision.cancel(),
        _ => {}
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if is_ctrl(key, 'q') {
        return true;
    }

    if key.code == KeyCode::F(1) {
        view_data.help_visible = !view_data.help_visible;
        return false;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if key.code == KeyCode::Tab {
        let command = match state.focus {
            Focus::Sidebar => AppCommand::FocusContent,
            Focus::Content => AppCommand::FocusSidebar,
        };
        dispatch_command(state, view_data, internal_tx, command);
        return false;
    }

    match state.focus {
        Focus::Sidebar => handle_sidebar_key(state, view_data, internal_tx, key),
        Focus::Content => {
            let consumed = handle_content_key(state, runtime, view_data, internal_tx, key);
            if !consumed && key.code == KeyCode::Esc {
                dispatch_command(state, view_data, internal_tx, AppCommand::FocusSidebar);
            }
        }
    }
    false
}

fn handle_content_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match state.view() {
        View::Home => home::handle_home_key(state, view_data, internal_tx, key),
        View::AiVision => home::handle_vision_key(state, runtime, view_data, internal_tx, key),
        View::DateCalculator => calc::handle_date_key(view_data, key),
        View::TaxCalculator => calc::handle_tax_key(state, runtime, view_data, internal_tx, key),
        View::AmountConverter => {
            calc::handle_converter_key(state, runtime, view_data, internal_tx, key)
        }
        View::AiChat { category } => {
            chat::handle_chat_key(state, runtime, view_data, internal_tx, category, key)
        }
        View::ContractCompare => {
            compare::handle_compare_key(state, runtime, view_data, internal_tx, key)
        }
        View::Profile => admin::handle_profile_key(state, runtime, view_data, internal_tx, key),
        View::UserAdmin => admin::handle_user_key(state, runtime, view_data, internal_tx, key),
        View::RoleAdmin => admin::handle_role_key(state, view_data, internal_tx, key),
        View::MenuAdmin => admin::handle_menu_key(state, view_data, internal_tx, key),
        View::ComingSoon { .. } => false,
    }
}

fn sidebar_entries(state: &AppState) -> Vec<SidebarEntry> {
    let mut entries = Vec::new();
    for menu in &NAVIGATION_MENU {
        entries.push(SidebarEntry::Menu(menu));
        if state.expanded_menus.contains(menu.id) {
            entries.extend(menu.children.iter().map(SidebarEntry::Sub));
        }
    }
    entries
}

fn sync_sidebar_cursor(state: &AppState, view_data: &mut ViewData) {
    let entries = sidebar_entries(state);
    let active = entries.iter().position(|entry| match entry {
        SidebarEntry::Sub(sub) => {
            sub.parent_id == state.active_id && sub.id == state.active_sub_id
        }
        SidebarEntry::Menu(menu) => menu.id == state.active_id && state.active_sub_id.is_empty(),
    });
    if let Some(index) = active {
        view_data.sidebar_cursor = index;
    } else {
        view_data.sidebar_cursor = view_data
            .sidebar_cursor
            .min(entries.len().saturating_sub(1));
    }
}

fn handle_sidebar_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let entries = sidebar_entries(state);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut view_data.sidebar_cursor, entries.len(), 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut view_data.sidebar_cursor, entries.len(), -1);
        }
        KeyCode::Char('g') | KeyCode::Home => {
            dispatch_command(state, view_data, internal_tx, AppCommand::GoHome);
        }
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            let Some(entry) = entries.get(view_data.sidebar_cursor).copied() else {
                return;
            };
            match entry {
                SidebarEntry::Menu(menu) if menu.has_children() => {
                    dispatch_command(
                        state,
                        view_data,
                        internal_tx,
                        AppCommand::ToggleMenu(menu.id.to_owned()),
                    );
                }
                SidebarEntry::Menu(menu) => {
                    select_and_focus(state, view_data, internal_tx, menu.id, "");
                }
                SidebarEntry::Sub(sub) => {
                    select_and_focus(state, view_data, internal_tx, sub.parent_id, sub.id);
                }
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            let Some(entry) = entries.get(view_data.sidebar_cursor).copied() else {
                return;
            };
            let parent = match entry {
                SidebarEntry::Menu(menu) => menu.id,
                SidebarEntry::Sub(sub) => sub.parent_id,
            };
            if state.expanded_menus.contains(parent) {
                dispatch_command(
                    state,
                    view_data,
                    internal_tx,
                    AppCommand::ToggleMenu(parent.to_owned()),
                );
                if let Some(index) = sidebar_entries(state)
                    .iter()
                    .position(|entry| matches!(entry, SidebarEntry::Menu(menu) if menu.id == parent))
                {
                    view_data.sidebar_cursor = index;
                }
            }
        }
        _ => {}
    }
}

fn select_and_focus(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: &str,
    sub_id: &str,
) {
    dispatch_command(
        state,
        view_data,
        internal_tx,
        AppCommand::Select {
            id: id.to_owned(),
            sub_id: sub_id.to_owned(),
        },
    );
    dispatch_command(state, view_data, internal_tx, AppCommand::FocusContent);
}

fn is_ctrl(key: KeyEvent, ch: char) -> bool {
    key.code == KeyCode::Char(ch) && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Applies a printable character or backspace to `buffer`.
fn edit_text(buffer: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            buffer.push(ch);
            true
        }
        KeyCode::Backspace => {
            buffer.pop();
            true
        }
        _ => false,
    }
}

fn move_cursor(cursor: &mut usize, len: usize, delta: isize) {
    if len == 0 {
        *cursor = 0;
        return;
    }
    let next = cursor.saturating_add_signed(delta);
    *cursor = next.min(len - 1);
}

fn cursor_prefix(selected: bool) -> &'static str {
    if selected { CURSOR_MARK } else { " " }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(format!("汇造价 | {}", state.view().title()))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().title("huizaojia").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(layout[1]);

    let sidebar = Paragraph::new(render_sidebar_lines(state, view_data))
        .block(pane_block("导航", state.focus == Focus::Sidebar));
    frame.render_widget(sidebar, body[0]);

    render_content(frame, body[1], state, view_data);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("帮助").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_content(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let view = state.view();
    let block = pane_block(&view.title(), state.focus == Focus::Content);
    match view {
        View::Home => {
            let body = Paragraph::new(home::render_home_text(state, &view_data.home)).block(block);
            frame.render_widget(body, area);
        }
        View::AiVision => {
            let body =
                Paragraph::new(home::render_vision_text(&view_data.vision)).block(block);
            frame.render_widget(body, area);
        }
        View::DateCalculator => {
            let body = Paragraph::new(calc::render_date_text(&view_data.date)).block(block);
            frame.render_widget(body, area);
        }
        View::TaxCalculator => {
            let body = Paragraph::new(calc::render_tax_text(&view_data.tax)).block(block);
            frame.render_widget(body, area);
        }
        View::AmountConverter => {
            let body =
                Paragraph::new(calc::render_converter_text(&view_data.converter)).block(block);
            frame.render_widget(body, area);
        }
        View::AiChat { category } => {
            chat::render_chat(frame, area, block, category, &view_data.chat);
        }
        View::ContractCompare => {
            compare::render_compare(frame, area, block, &view_data.compare);
        }
        View::Profile => {
            let body =
                Paragraph::new(admin::render_profile_text(&view_data.profile)).block(block);
            frame.render_widget(body, area);
        }
        View::UserAdmin => admin::render_users(frame, area, block, &view_data.users),
        View::RoleAdmin => admin::render_roles(frame, area, block, &view_data.roles),
        View::MenuAdmin => admin::render_menus(frame, area, block, &view_data.menus),
        View::ComingSoon { label } => {
            let body = Paragraph::new(format!(
                "{label} 功能模块正在开发中，敬请期待。\n\nTab 返回导航"
            ))
            .block(block);
            frame.render_widget(body, area);
        }
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title.to_owned())
        .borders(Borders::ALL)
        .border_style(style)
}

fn render_sidebar_lines(state: &AppState, view_data: &ViewData) -> Vec<Line<'static>> {
    sidebar_entries(state)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let selected = index == view_data.sidebar_cursor && state.focus == Focus::Sidebar;
            let (text, active) = match entry {
                SidebarEntry::Menu(menu) => {
                    let arrow = if !menu.has_children() {
                        " "
                    } else if state.expanded_menus.contains(menu.id) {
                        "▾"
                    } else {
                        "▸"
                    };
                    (
                        format!(
                            "{} {} {} {arrow}",
                            cursor_prefix(selected),
                            menu.icon.glyph(),
                            menu.label
                        ),
                        menu.id == state.active_id && state.active_sub_id.is_empty(),
                    )
                }
                SidebarEntry::Sub(sub) => (
                    format!("{}    {}", cursor_prefix(selected), sub.label),
                    sub.parent_id == state.active_id && sub.id == state.active_sub_id,
                ),
            };
            let mut style = Style::default();
            if active {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(text, style))
        })
        .collect()
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    if view_data.help_visible {
        return String::new();
    }
    let hints = match (state.focus, state.view()) {
        (Focus::Sidebar, _) => "j/k 移动 | enter 打开 | h 收起 | g 首页",
        (Focus::Content, View::Home) => "/ 搜索 | j/k 选择 | enter 启动 | s 收藏",
        (Focus::Content, View::AiVision) => "j/k 选择 | enter 开始识图 | esc 返回",
        (Focus::Content, View::DateCalculator) => "↑/↓ 字段 | 输入日期 | space 切换",
        (Focus::Content, View::TaxCalculator) => {
            "↑/↓ 字段 | 输入或 ←/→ 切换税率 | ^p 精度 | ^t/^n/^g 复制税额/不含税/含税"
        }
        (Focus::Content, View::AmountConverter) => "↑/↓ 切换输入 | ^y 复制结果 | ^l 清空",
        (Focus::Content, View::AiChat { .. }) => "输入问题 | enter 发送",
        (Focus::Content, View::ContractCompare) => compare::status_hint(&view_data.compare),
        (Focus::Content, View::Profile) => "↑/↓ 字段 | ^n 切换标签 | ^s 更新",
        (Focus::Content, View::UserAdmin) => "/ 搜索 | a 新增 | e 编辑 | d 删除",
        (Focus::Content, View::RoleAdmin) => "^n 切换面板 | space 勾选 | enter 展开 | ^s 保存",
        (Focus::Content, View::MenuAdmin) => "/ 搜索 | enter 展开 | a 新增 | e 编辑 | d 删除",
        (Focus::Content, View::ComingSoon { .. }) => "",
    };
    format!("{hints} | tab 切换焦点 | F1 帮助 | ^q 退出")
}

fn help_overlay_text() -> &'static str {
    "tab        侧边栏 / 内容区切换焦点\n\
     j/k ↑/↓    移动光标\n\
     enter      打开菜单或执行当前项\n\
     esc        关闭弹窗，或回到侧边栏\n\
     g / home   回到首页\n\
     F1 / ?     显示或隐藏帮助\n\
     ctrl+q     退出\n\
     \n\
     合同价对比: u 上传, enter 配对分析, c 进入对比表,\n\
     v 开始/结束拖选, m 标记颜色, e 编辑单元格, n 下一处差异"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests;
