// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent};
use huizaojia_app::AppState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::sync::mpsc::Sender;
use tracing::debug;

use crate::{AppRuntime, InternalEvent, ViewData, edit_text, emit_status};

const PENDING_REPLY: &str = "正在思考...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatMessage {
    pub(crate) role: ChatRole,
    pub(crate) body: String,
}

/// Transcript of the open chat view. At most one request is outstanding;
/// replies are matched to it by request id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ChatUiState {
    pub(crate) input: String,
    pub(crate) transcript: Vec<ChatMessage>,
    pub(crate) in_flight: Option<u64>,
    next_request_id: u64,
}

impl ChatUiState {
    /// Forgets the conversation. Request ids keep counting so a reply to a
    /// discarded request can never match a later one.
    pub(crate) fn reset(&mut self) {
        self.input.clear();
        self.transcript.clear();
        self.in_flight = None;
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_request_id = self.next_request_id.saturating_add(1);
        if self.next_request_id == 0 {
            self.next_request_id = 1;
        }
        self.next_request_id
    }
}

pub(crate) fn handle_chat_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    category: &str,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Enter => {
            submit_question(state, runtime, view_data, internal_tx, category);
            true
        }
        _ => edit_text(&mut view_data.chat.input, key),
    }
}

fn submit_question<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    category: &str,
) {
    let question = view_data.chat.input.trim().to_owned();
    if question.is_empty() {
        return;
    }
    if view_data.chat.in_flight.is_some() {
        emit_status(state, view_data, internal_tx, "请等待当前回答完成");
        return;
    }

    view_data.chat.input.clear();
    view_data.chat.transcript.push(ChatMessage {
        role: ChatRole::User,
        body: question.clone(),
    });
    let request_id = view_data.chat.next_request_id();
    view_data.chat.in_flight = Some(request_id);
    debug!(request_id, category, "chat question submitted");

    if let Err(error) =
        runtime.spawn_assistant(request_id, category, &question, internal_tx.clone())
    {
        view_data.chat.in_flight = None;
        let message = format!("chat request failed: {error:#}");
        view_data.chat.transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            body: message.clone(),
        });
        emit_status(state, view_data, internal_tx, message);
    }
}

/// Appends the reply for the outstanding request. Anything else is stale
/// and dropped.
pub(crate) fn handle_reply(chat: &mut ChatUiState, request_id: u64, reply: String) -> bool {
    if chat.in_flight != Some(request_id) {
        debug!(request_id, "dropping stale chat reply");
        return false;
    }
    chat.in_flight = None;
    chat.transcript.push(ChatMessage {
        role: ChatRole::Assistant,
        body: reply,
    });
    true
}

pub(crate) fn render_chat_text(category: &str, chat: &ChatUiState) -> String {
    let mut lines = Vec::new();
    if chat.transcript.is_empty() {
        lines.push(format!(
            "您好！我是汇造价智能助手，可以为您解答{category}相关的问题。"
        ));
    }
    for message in &chat.transcript {
        let speaker = match message.role {
            ChatRole::User => "我",
            ChatRole::Assistant => "助手",
        };
        lines.push(format!("{speaker}: {}", message.body));
        lines.push(String::new());
    }
    if chat.in_flight.is_some() {
        lines.push(format!("助手: {PENDING_REPLY}"));
    }
    lines.join("\n")
}

pub(crate) fn render_chat(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    category: &str,
    chat: &ChatUiState,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(inner);

    let text = render_chat_text(category, chat);
    let line_count = u16::try_from(text.lines().count()).unwrap_or(u16::MAX);
    let scroll = line_count.saturating_sub(layout[0].height);
    let transcript = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(transcript, layout[0]);

    let input_style = if chat.in_flight.is_some() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let input = Paragraph::new(format!("> {}", chat.input))
        .style(input_style)
        .block(Block::default().title("提问").borders(Borders::ALL));
    frame.render_widget(input, layout[1]);
}
