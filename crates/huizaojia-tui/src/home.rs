// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent};
use huizaojia_app::{
    AppCommand, AppState, MOCK_ROOMS, ToolAction, ToolCategory, ToolItem, VISION_TOOLS,
    room_totals, search_tools, tool_action,
};
use std::sync::mpsc::Sender;

use crate::{
    AnalysisTask, AppRuntime, InternalEvent, ViewData, cursor_prefix, dispatch_command,
    edit_text, emit_status, move_cursor, schedule_analysis,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct HomeUiState {
    pub(crate) query: String,
    pub(crate) searching: bool,
    pub(crate) cursor: usize,
}

pub(crate) fn handle_home_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.home.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => view_data.home.searching = false,
            _ => {
                if edit_text(&mut view_data.home.query, key) {
                    view_data.home.cursor = 0;
                }
            }
        }
        return true;
    }

    let tools = search_tools(&view_data.home.query);
    match key.code {
        KeyCode::Char('/') => {
            view_data.home.searching = true;
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut view_data.home.cursor, tools.len(), 1);
            true
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut view_data.home.cursor, tools.len(), -1);
            true
        }
        KeyCode::Char('s') => {
            if let Some(tool) = tools.get(view_data.home.cursor) {
                dispatch_command(
                    state,
                    view_data,
                    internal_tx,
                    AppCommand::ToggleFavorite(tool.id.to_owned()),
                );
            }
            true
        }
        KeyCode::Enter => {
            if let Some(tool) = tools.get(view_data.home.cursor).copied() {
                activate_tool(state, view_data, internal_tx, tool);
            }
            true
        }
        KeyCode::Esc if !view_data.home.query.is_empty() => {
            view_data.home.query.clear();
            view_data.home.cursor = 0;
            true
        }
        _ => false,
    }
}

fn activate_tool(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    tool: &ToolItem,
) {
    match tool_action(tool) {
        ToolAction::Navigate { id, sub_id } => {
            dispatch_command(
                state,
                view_data,
                internal_tx,
                AppCommand::Select {
                    id: id.to_owned(),
                    sub_id: sub_id.to_owned(),
                },
            );
        }
        ToolAction::Launch(name) => {
            emit_status(state, view_data, internal_tx, format!("启动工具: {name}"));
        }
    }
}

pub(crate) fn render_home_text(state: &AppState, home: &HomeUiState) -> String {
    let caret = if home.searching { "_" } else { "" };
    let mut lines = vec![format!("搜索工具: {}{caret}", home.query), String::new()];

    let tools = search_tools(&home.query);
    if tools.is_empty() {
        lines.push("没有匹配的工具".to_owned());
        return lines.join("\n");
    }

    for category in [ToolCategory::Hot, ToolCategory::Mine] {
        let section: Vec<(usize, &ToolItem)> = tools
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, tool)| tool.category == category)
            .collect();
        if section.is_empty() {
            continue;
        }
        lines.push(category.label().to_owned());
        for (index, tool) in section {
            let pricing = tool
                .pricing
                .map(|pricing| format!(" [{}]", pricing.label()))
                .unwrap_or_default();
            let hot = if tool.is_hot { " 🔥" } else { "" };
            let favorite = if state.favorites.contains(tool.id) {
                " ★"
            } else {
                ""
            };
            lines.push(format!(
                "{} {} {}{pricing}{hot}{favorite}",
                cursor_prefix(index == home.cursor),
                tool.icon.glyph(),
                tool.name
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum VisionStage {
    #[default]
    Select,
    Analyzing {
        token: u64,
    },
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct VisionUiState {
    pub(crate) cursor: usize,
    pub(crate) selected: Option<usize>,
    pub(crate) stage: VisionStage,
    token: u64,
}

impl VisionUiState {
    fn start(&mut self) -> u64 {
        self.token += 1;
        self.selected = Some(self.cursor);
        self.stage = VisionStage::Analyzing { token: self.token };
        self.token
    }

    pub(crate) fn finish(&mut self, token: u64) -> bool {
        if self.stage != (VisionStage::Analyzing { token }) {
            return false;
        }
        self.stage = VisionStage::Results;
        true
    }

    pub(crate) fn cancel(&mut self) {
        self.token += 1;
        if matches!(self.stage, VisionStage::Analyzing { .. }) {
            self.stage = VisionStage::Select;
        }
    }

    fn reset(&mut self) {
        self.cancel();
        self.stage = VisionStage::Select;
        self.selected = None;
    }
}

pub(crate) fn handle_vision_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match view_data.vision.stage {
        VisionStage::Select => match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                move_cursor(&mut view_data.vision.cursor, VISION_TOOLS.len(), 1);
                true
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_cursor(&mut view_data.vision.cursor, VISION_TOOLS.len(), -1);
                true
            }
            KeyCode::Enter => {
                let Some(tool) = VISION_TOOLS.get(view_data.vision.cursor) else {
                    return true;
                };
                let token = view_data.vision.start();
                schedule_analysis(
                    internal_tx,
                    AnalysisTask::Vision,
                    token,
                    runtime.analysis_delay(),
                );
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("开始识图: {}", tool.name),
                );
                true
            }
            _ => false,
        },
        VisionStage::Analyzing { .. } => {
            if key.code == KeyCode::Esc {
                view_data.vision.cancel();
                emit_status(state, view_data, internal_tx, "已取消识图");
            }
            true
        }
        VisionStage::Results => match key.code {
            KeyCode::Esc | KeyCode::Char('r') => {
                view_data.vision.reset();
                true
            }
            _ => false,
        },
    }
}

pub(crate) fn render_vision_text(vision: &VisionUiState) -> String {
    match vision.stage {
        VisionStage::Select => {
            let mut lines = vec!["第一步：请选择识图类型".to_owned(), String::new()];
            for (index, tool) in VISION_TOOLS.iter().enumerate() {
                lines.push(format!(
                    "{} {} {}  {}",
                    cursor_prefix(index == vision.cursor),
                    tool.icon.glyph(),
                    tool.name,
                    tool.description
                ));
            }
            lines.join("\n")
        }
        VisionStage::Analyzing { .. } => {
            let name = selected_tool_name(vision);
            format!("{name}: AI 正在识别图纸，请稍候...\n\nesc 取消")
        }
        VisionStage::Results => {
            let mut lines = vec![
                format!("{}: 识别结果", selected_tool_name(vision)),
                String::new(),
                format!(
                    "{:<8}{:>10}{:>10}{:>10}{:>10}",
                    "房间", "地面积", "墙面积", "天棚面积", "周长"
                ),
            ];
            let totals = room_totals(&MOCK_ROOMS);
            for room in MOCK_ROOMS.iter().chain(std::iter::once(&totals)) {
                lines.push(format!(
                    "{:<8}{:>10.2}{:>10.2}{:>10.2}{:>10.2}",
                    room.name, room.floor_area, room.wall_area, room.ceiling_area, room.perimeter
                ));
            }
            lines.push(String::new());
            lines.push("r 重新选择".to_owned());
            lines.join("\n")
        }
    }
}

fn selected_tool_name(vision: &VisionUiState) -> &'static str {
    vision
        .selected
        .and_then(|index| VISION_TOOLS.get(index))
        .map(|tool| tool.name)
        .unwrap_or("AI识图算量")
}
