// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use super::{
    AnalysisTask, AppRuntime, InternalEvent, ViewData, dispatch_command, handle_key_event,
    process_internal_events, status_text,
};
use crate::admin::{render_menu_sidebar_text, render_profile_text};
use crate::calc::render_tax_text;
use crate::chat::ChatRole;
use crate::home::VisionStage;
use anyhow::{Result, anyhow};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use huizaojia_app::admin::{Avatar, CheckState, PERMISSION_TREE, find_permission};
use huizaojia_app::compare::{CostSide, FeeField, MarkColor};
use huizaojia_app::forms::{PROCESSING_MESSAGE, SUCCESS_MESSAGE};
use huizaojia_app::workflow::Stage;
use huizaojia_app::{AppCommand, AppState, Focus, RowId, View};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use time::macros::{date, datetime};

#[derive(Debug, Default)]
struct TestRuntime {
    reply: String,
    defer_replies: bool,
    questions: Vec<(String, String)>,
    copied: Vec<String>,
    avatar: Option<String>,
}

impl AppRuntime for TestRuntime {
    fn ask_assistant(&mut self, category: &str, question: &str) -> String {
        self.questions
            .push((category.to_owned(), question.to_owned()));
        self.reply.clone()
    }

    fn spawn_assistant(
        &mut self,
        request_id: u64,
        category: &str,
        question: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let reply = self.ask_assistant(category, question);
        if !self.defer_replies {
            tx.send(InternalEvent::AssistantReply { request_id, reply })
                .map_err(|_| anyhow!("channel closed"))?;
        }
        Ok(())
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
        self.copied.push(text.to_owned());
        Ok(())
    }

    fn load_avatar(&mut self, path: &str) -> Result<String> {
        self.avatar
            .clone()
            .ok_or_else(|| anyhow!("cannot read {path}"))
    }

    fn analysis_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn now(&self) -> OffsetDateTime {
        datetime!(2024-01-01 09:30 UTC)
    }
}

fn view_data_for_test() -> ViewData {
    ViewData::new(date!(2024-01-01))
}

fn internal_tx() -> Sender<InternalEvent> {
    let (tx, _rx) = mpsc::channel();
    tx
}

fn internal_channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
    mpsc::channel()
}

fn state_at(id: &str, sub_id: &str) -> AppState {
    AppState {
        active_id: id.to_owned(),
        active_sub_id: sub_id.to_owned(),
        focus: Focus::Content,
        ..AppState::default()
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
}

fn press(
    state: &mut AppState,
    runtime: &mut TestRuntime,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: KeyEvent,
) -> bool {
    handle_key_event(state, runtime, view_data, tx, event)
}

fn type_text(
    state: &mut AppState,
    runtime: &mut TestRuntime,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    text: &str,
) {
    for ch in text.chars() {
        press(state, runtime, view_data, tx, key(KeyCode::Char(ch)));
    }
}

/// Waits for the first event matching `wanted`, feeds it back through the
/// channel and drains it the way the event loop does.
fn pump_until(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
    wanted: impl Fn(&InternalEvent) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(event) = rx.recv_timeout(Duration::from_millis(50))
            && wanted(&event)
        {
            tx.send(event).expect("channel stays open");
            process_internal_events(state, view_data, tx, rx);
            return;
        }
    }
    panic!("expected internal event never arrived");
}

#[test]
fn ctrl_q_quits() {
    let mut state = AppState::default();
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    assert!(!press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('q'))));
    assert!(press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('q')));
}

#[test]
fn sidebar_expands_menu_and_opens_chat_category() {
    let mut state = AppState::default();
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));
    assert_eq!(view_data.sidebar_cursor, 1);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(state.expanded_menus.contains("ai-qa"));
    assert_eq!(state.view(), View::Home);

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(
        state.view(),
        View::AiChat {
            category: "2024清单咨询"
        }
    );
    assert_eq!(state.focus, Focus::Content);

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Tab));
    assert_eq!(state.focus, Focus::Sidebar);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('h')));
    assert!(!state.expanded_menus.contains("ai-qa"));
    assert_eq!(view_data.sidebar_cursor, 1);

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('g')));
    assert_eq!(state.view(), View::Home);
    assert_eq!(view_data.sidebar_cursor, 0);
}

#[test]
fn unconsumed_esc_returns_focus_to_sidebar() {
    let mut state = state_at("home", "");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert_eq!(state.focus, Focus::Sidebar);
}

#[test]
fn help_overlay_swallows_keys_until_closed() {
    let mut state = AppState::default();
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::F(1)));
    assert!(view_data.help_visible);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));
    assert_eq!(view_data.sidebar_cursor, 0);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert!(!view_data.help_visible);
}

#[test]
fn home_launches_tools_and_toggles_favorites() {
    let mut state = state_at("home", "");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(state.status_line.as_deref(), Some("启动工具: 2024清单"));

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('s')));
    assert!(state.favorites.contains("h1"));
    assert_eq!(state.status_line.as_deref(), Some("已收藏 2024清单"));
    assert!(crate::home::render_home_text(&state, &view_data.home).contains("★"));

    view_data.home.cursor = 5;
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(state.view(), View::AiVision);
}

#[test]
fn home_search_filters_tools() {
    let mut state = state_at("home", "");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('/')));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "计算器");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

    let text = crate::home::render_home_text(&state, &view_data.home);
    assert!(text.contains("工程量计算器"));
    assert!(text.contains("五金计算器"));
    assert!(!text.contains("定额"));
}

#[test]
fn date_calculator_counts_work_days() {
    let mut state = state_at("general", "ok-date-calc");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "10");

    let summary = view_data.date.duration.clone().expect("dates parse");
    assert_eq!(summary.total_days, 10);
    assert_eq!(summary.work_days, 8);

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    assert_eq!(view_data.date.duration, Some(summary));
}

#[test]
fn tax_calculator_defaults_and_copy() {
    let mut state = state_at("general", "ok-tax-calc");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    let text = render_tax_text(&view_data.tax);
    assert!(text.contains("不含税金额 ¥98.23   税额 ¥12.77"));
    assert!(text.contains("含税金额 ¥113.00   税额 ¥13.00"));

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('t'));
    assert_eq!(runtime.copied, vec!["12.77".to_owned()]);
    assert_eq!(state.status_line.as_deref(), Some("已复制税额: 12.77"));

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('p'));
    assert_eq!(state.status_line.as_deref(), Some("保留 4 位小数"));
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('n'));
    assert_eq!(runtime.copied.last().map(String::as_str), Some("98.2301"));
}

#[test]
fn date_projection_ignores_offsets_past_the_calendar() {
    let mut state = state_at("general", "ok-date-calc");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    let before = view_data.date.projected;
    assert!(before.is_some());

    for _ in 0..4 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    }
    for _ in 0..3 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    }
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "999999999999999");
    assert_eq!(view_data.date.offset, "999999999999999");
    assert_eq!(view_data.date.projected, before);
}

#[test]
fn tax_rate_accepts_typed_and_preset_values() {
    let mut state = state_at("general", "ok-tax-calc");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('0')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "10");
    assert_eq!(view_data.tax.gross_input, "111.000");
    assert_eq!(view_data.tax.gross_rate, "10");

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "5.5");
    let text = render_tax_text(&view_data.tax);
    assert!(text.contains("税率: 5.5%"));

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Right));
    assert_eq!(view_data.tax.gross_rate, "6");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Left));
    assert_eq!(view_data.tax.gross_rate, "3");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Left));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Left));
    assert_eq!(view_data.tax.gross_rate, "13");
    assert!(render_tax_text(&view_data.tax).contains("[13%]"));

    for _ in 0..2 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    }
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "10");
    view_data.tax.gross_input = "110".to_owned();
    let text = render_tax_text(&view_data.tax);
    assert!(text.contains("不含税金额 ¥100.00   税额 ¥10.00"));
}

#[test]
fn converter_writes_chinese_uppercase() {
    let mut state = state_at("general", "amount-converter");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    type_text(&mut state, &mut runtime, &mut view_data, &tx, "12345.67");
    assert_eq!(view_data.converter.chinese, "壹万贰仟叁佰肆拾伍元陆角柒分");

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('y'));
    assert_eq!(runtime.copied, vec!["壹万贰仟叁佰肆拾伍元陆角柒分".to_owned()]);

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('l'));
    assert!(view_data.converter.number.is_empty());
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('y'));
    assert_eq!(state.status_line.as_deref(), Some("没有可复制的结果"));
}

#[test]
fn chat_question_gets_reply_with_category() {
    let mut state = state_at("ai-qa", "qa-quota");
    let mut runtime = TestRuntime {
        reply: "请参考定额说明。".to_owned(),
        ..TestRuntime::default()
    };
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    type_text(&mut state, &mut runtime, &mut view_data, &tx, "how");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(view_data.chat.input.is_empty());
    assert_eq!(
        runtime.questions,
        vec![("定额解释".to_owned(), "how".to_owned())]
    );

    process_internal_events(&mut state, &mut view_data, &tx, &rx);
    let transcript = &view_data.chat.transcript;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, ChatRole::User);
    assert_eq!(transcript[1].role, ChatRole::Assistant);
    assert_eq!(transcript[1].body, "请参考定额说明。");
    assert!(view_data.chat.in_flight.is_none());
}

#[test]
fn chat_refuses_second_question_while_waiting() {
    let mut state = state_at("ai-qa", "qa-policy");
    let mut runtime = TestRuntime {
        defer_replies: true,
        ..TestRuntime::default()
    };
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    type_text(&mut state, &mut runtime, &mut view_data, &tx, "a");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "b");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

    assert_eq!(runtime.questions.len(), 1);
    assert_eq!(view_data.chat.transcript.len(), 1);
    assert_eq!(view_data.chat.input, "b");
    assert_eq!(state.status_line.as_deref(), Some("请等待当前回答完成"));
}

#[test]
fn reply_arriving_after_leaving_chat_is_dropped() {
    let mut state = state_at("ai-qa", "qa-policy");
    let mut runtime = TestRuntime {
        defer_replies: true,
        ..TestRuntime::default()
    };
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    type_text(&mut state, &mut runtime, &mut view_data, &tx, "a");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    let request_id = view_data.chat.in_flight.expect("request outstanding");

    dispatch_command(&mut state, &mut view_data, &tx, AppCommand::GoHome);
    assert!(view_data.chat.transcript.is_empty());

    dispatch_command(
        &mut state,
        &mut view_data,
        &tx,
        AppCommand::Select {
            id: "ai-qa".to_owned(),
            sub_id: "qa-policy".to_owned(),
        },
    );
    tx.send(InternalEvent::AssistantReply {
        request_id,
        reply: "late".to_owned(),
    })
    .expect("channel open");
    process_internal_events(&mut state, &mut view_data, &tx, &rx);
    assert!(view_data.chat.transcript.is_empty());

    state.focus = Focus::Content;
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "c");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(view_data.chat.in_flight.is_some_and(|id| id > request_id));
}

#[test]
fn compare_upload_pair_and_analyse() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(view_data.compare.workflow.stage, Stage::Upload);
    assert_eq!(
        state.status_line.as_deref(),
        Some("请先上传至少一个清单文件")
    );

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('u')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('u')));
    let files = &view_data.compare.workflow.files;
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].uploaded_at, "2024/1/1 09:30:00");

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(view_data.compare.workflow.stage, Stage::Pairing);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('m')));
    assert_eq!(view_data.compare.workflow.pairing.match_mode, 1);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(view_data.compare.workflow.is_analyzing());
    assert_eq!(state.status_line.as_deref(), Some("正在智能识别清单..."));

    pump_until(&mut state, &mut view_data, &tx, &rx, |event| {
        matches!(
            event,
            InternalEvent::AnalysisDone {
                task: AnalysisTask::Compare,
                ..
            }
        )
    });
    assert_eq!(view_data.compare.workflow.stage, Stage::Results);
    assert_eq!(state.status_line.as_deref(), Some("识别完成"));
    assert_eq!(view_data.compare.workflow.expanded_files.len(), 2);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('o')));
    assert_eq!(view_data.compare.workflow.expanded_files.len(), 1);

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(' ')));
    assert!(view_data.compare.workflow.sheets[0].is_list);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(matches!(view_data.compare.workflow.stage, Stage::Detail(_)));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert_eq!(view_data.compare.workflow.stage, Stage::Results);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('c')));
    assert_eq!(view_data.compare.workflow.stage, Stage::Comparison);
}

#[test]
fn cancelled_analysis_ignores_late_completion() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('u')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert_eq!(view_data.compare.workflow.stage, Stage::Upload);
    assert_eq!(state.status_line.as_deref(), Some("已取消识别"));

    pump_until(&mut state, &mut view_data, &tx, &rx, |event| {
        matches!(event, InternalEvent::AnalysisDone { .. })
    });
    assert_eq!(view_data.compare.workflow.stage, Stage::Upload);
}

#[test]
fn comparison_cell_edit_recomputes_totals() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    view_data.compare.workflow.open_comparison();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('e')));
    assert_eq!(view_data.compare.edit.as_deref(), Some("28.5"));
    for _ in 0..4 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    }
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "30");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

    assert!(view_data.compare.edit.is_none());
    let table = &view_data.compare.workflow.table;
    let row = table.row(RowId::new(1)).expect("row 1");
    assert_eq!(row.contract.labor, 30.0);
    let subtotal = 30.0 + 45.2 + 12.8 + 6.4 + 3.2;
    assert_eq!(row.contract.subtotal, subtotal);
    assert_eq!(row.contract.total, (subtotal * 698.0).round());
    assert!(table.file_changed);
    assert!(render_footer_contains(&view_data, "文件已修改"));
}

fn render_footer_contains(view_data: &ViewData, needle: &str) -> bool {
    crate::compare::render_footer_text(&view_data.compare).contains(needle)
}

#[test]
fn derived_columns_refuse_editing() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    view_data.compare.workflow.open_comparison();

    let subtotal_column = view_data
        .compare
        .columns()
        .iter()
        .position(|column| *column == (FeeField::Subtotal, CostSide::Contract))
        .expect("subtotal column visible");
    view_data.compare.column = subtotal_column;
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('e')));
    assert!(view_data.compare.edit.is_none());
    assert!(
        state
            .status_line
            .as_deref()
            .is_some_and(|status| status.contains("不能直接修改"))
    );
}

#[test]
fn drag_selection_sums_cells_and_marks_apply() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    view_data.compare.workflow.open_comparison();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('v')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('l')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('v')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));

    let summary = view_data.compare.workflow.table.selection_summary();
    assert_eq!(summary.count, 2);
    assert!((summary.sum - 54.5).abs() < 1e-9);
    assert!(render_footer_contains(&view_data, "已选 2 格，合计 54.50"));

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('m')));
    assert!(view_data.compare.workflow.table.context_menu.is_some());
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('2')));
    assert!(view_data.compare.workflow.table.context_menu.is_none());
    let row = view_data
        .compare
        .workflow
        .table
        .row(RowId::new(2))
        .expect("row 2");
    assert_eq!(
        row.mark(FeeField::Labor, CostSide::Audit),
        Some(MarkColor::Yellow)
    );
    assert_eq!(state.status_line.as_deref(), Some("已标记为黄色"));

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert!(view_data.compare.workflow.table.selection.is_empty());
    assert_eq!(view_data.compare.workflow.stage, Stage::Comparison);
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
    assert_eq!(view_data.compare.workflow.stage, Stage::Results);
}

#[test]
fn next_difference_and_column_toggles() {
    let mut state = state_at("pricing", "ok-contract");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    view_data.compare.workflow.open_comparison();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('n')));
    assert_eq!(view_data.compare.row, 1);
    assert_eq!(
        view_data.compare.workflow.table.highlighted_row,
        Some(RowId::new(2))
    );

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('3')));
    assert_eq!(view_data.compare.columns().len(), 12);
    assert_eq!(state.status_line.as_deref(), Some("隐藏机械费列"));
}

#[test]
fn vision_analysis_completes_by_token() {
    let mut state = state_at("quantity", "ai-vision");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(matches!(view_data.vision.stage, VisionStage::Analyzing { .. }));
    assert_eq!(state.status_line.as_deref(), Some("开始识图: 精装修识图"));

    pump_until(&mut state, &mut view_data, &tx, &rx, |event| {
        matches!(
            event,
            InternalEvent::AnalysisDone {
                task: AnalysisTask::Vision,
                ..
            }
        )
    });
    assert_eq!(view_data.vision.stage, VisionStage::Results);
    assert!(crate::home::render_vision_text(&view_data.vision).contains("合计"));
}

#[test]
fn profile_password_validation_and_deferred_success() {
    let mut state = state_at("settings", "profile");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('n'));
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some("请输入旧密码"));

    type_text(&mut state, &mut runtime, &mut view_data, &tx, "old123");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "secret1");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "secret2");
    assert!(render_profile_text(&view_data.profile).contains("*******"));
    assert!(!render_profile_text(&view_data.profile).contains("secret"));

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(
        state.status_line.as_deref(),
        Some("两次输入的新密码不一致")
    );

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "1");
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some(PROCESSING_MESSAGE));
    assert!(view_data.profile.password.old_password.is_empty());

    pump_until(&mut state, &mut view_data, &tx, &rx, |event| {
        matches!(event, InternalEvent::DeferredStatus { .. })
    });
    assert_eq!(state.status_line.as_deref(), Some(SUCCESS_MESSAGE));
}

#[test]
fn profile_gender_flips_and_avatar_loads() {
    let mut state = state_at("settings", "profile");
    let mut runtime = TestRuntime {
        avatar: Some("data:image/png;base64,AAAA".to_owned()),
        ..TestRuntime::default()
    };
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(' ')));
    assert_eq!(view_data.profile.info.gender.label(), "女");

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "me.png");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert_eq!(
        view_data.profile.info.avatar,
        Avatar::DataUrl("data:image/png;base64,AAAA".to_owned())
    );
}

#[test]
fn user_dialog_validates_and_reports_avatar_errors() {
    let mut state = state_at("settings", "user-admin");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some("用户名不能为空"));
    assert!(view_data.users.dialog.is_some());

    for _ in 0..4 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    }
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "x.png");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(
        state
            .status_line
            .as_deref()
            .is_some_and(|status| status.starts_with("头像加载失败"))
    );

    for _ in 0..4 {
        press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Up));
    }
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "zhang");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "张三");
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some("保存成功"));
    assert!(view_data.users.dialog.is_none());
    assert_eq!(view_data.users.users.len(), 3);
}

#[test]
fn user_search_narrows_the_table() {
    let mut state = state_at("settings", "user-admin");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('/')));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "test1");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('e')));
    let dialog = view_data.users.dialog.as_ref().expect("dialog open");
    assert_eq!(dialog.form.username, "test1");
    assert_eq!(dialog.form.roles, vec!["普通用户".to_owned()]);
}

#[test]
fn role_permissions_toggle_whole_subtree() {
    let mut state = state_at("settings", "role-admin");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();
    let system = find_permission(&PERMISSION_TREE, "system").expect("system node");

    assert_eq!(
        view_data.roles.permissions.node_state(system),
        CheckState::Indeterminate
    );
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('n'));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('j')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(' ')));
    assert_eq!(
        view_data.roles.permissions.node_state(system),
        CheckState::Checked
    );
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(' ')));
    assert_eq!(
        view_data.roles.permissions.node_state(system),
        CheckState::Unchecked
    );

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));
    assert!(!view_data.roles.permissions.expanded.contains("system"));

    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some("角色权限更新成功"));
}

#[test]
fn menu_search_keeps_matching_branches() {
    let mut state = state_at("settings", "menu-admin");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('/')));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "角色");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

    let text = render_menu_sidebar_text(&view_data.menus);
    assert!(text.contains("系统管理"));
    assert!(text.contains("角色管理"));
    assert!(!text.contains("个人中心"));
}

#[test]
fn menu_dialog_rejects_non_numeric_order() {
    let mut state = state_at("settings", "menu-admin");
    let mut runtime = TestRuntime::default();
    let mut view_data = view_data_for_test();
    let tx = internal_tx();

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "报表");
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Down));
    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "x");
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(
        state.status_line.as_deref(),
        Some("显示排序必须是非负整数")
    );

    press(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Backspace));
    type_text(&mut state, &mut runtime, &mut view_data, &tx, "4");
    press(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));
    assert_eq!(state.status_line.as_deref(), Some("保存成功"));
    assert!(view_data.menus.dialog.is_none());
}

#[test]
fn status_clear_ignores_stale_tokens() {
    let mut state = AppState::default();
    let mut view_data = view_data_for_test();
    let (tx, rx) = internal_channel();

    dispatch_command(
        &mut state,
        &mut view_data,
        &tx,
        AppCommand::SetStatus("first".to_owned()),
    );
    dispatch_command(
        &mut state,
        &mut view_data,
        &tx,
        AppCommand::SetStatus("second".to_owned()),
    );
    tx.send(InternalEvent::ClearStatus {
        token: view_data.status_token - 1,
    })
    .expect("channel open");
    process_internal_events(&mut state, &mut view_data, &tx, &rx);
    assert_eq!(status_text(&state, &view_data), "second");

    tx.send(InternalEvent::ClearStatus {
        token: view_data.status_token,
    })
    .expect("channel open");
    process_internal_events(&mut state, &mut view_data, &tx, &rx);
    assert!(state.status_line.is_none());
    assert!(status_text(&state, &view_data).contains("^q 退出"));
}
