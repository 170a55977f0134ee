// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::catalog::{chat_category_label, find_menu, find_sub_menu, find_tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Content,
}

/// The screen a `(active_id, active_sub_id)` pair resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home,
    DateCalculator,
    TaxCalculator,
    AmountConverter,
    AiVision,
    ContractCompare,
    Profile,
    UserAdmin,
    RoleAdmin,
    MenuAdmin,
    AiChat { category: &'static str },
    ComingSoon { label: String },
}

impl View {
    pub fn title(&self) -> String {
        match self {
            Self::Home => "智能造价工具箱".to_owned(),
            Self::DateCalculator => "日期计算器".to_owned(),
            Self::TaxCalculator => "OK税费计算".to_owned(),
            Self::AmountConverter => "金额大小写转换".to_owned(),
            Self::AiVision => "AI识图算量".to_owned(),
            Self::ContractCompare => "ok合同价对比".to_owned(),
            Self::Profile => "个人中心".to_owned(),
            Self::UserAdmin => "用户管理".to_owned(),
            Self::RoleAdmin => "角色管理".to_owned(),
            Self::MenuAdmin => "菜单管理".to_owned(),
            Self::AiChat { category } => format!("AI 智能问答 | {category}"),
            Self::ComingSoon { label } => format!("{label} 功能模块"),
        }
    }
}

pub fn route(active_id: &str, active_sub_id: &str) -> View {
    match active_sub_id {
        "ok-date-calc" => return View::DateCalculator,
        "ok-tax-calc" => return View::TaxCalculator,
        "amount-converter" => return View::AmountConverter,
        "ai-vision" => return View::AiVision,
        "ok-contract" => return View::ContractCompare,
        "profile" => return View::Profile,
        "user-admin" => return View::UserAdmin,
        "role-admin" => return View::RoleAdmin,
        "menu-admin" => return View::MenuAdmin,
        _ => {}
    }

    if active_id == "ai-qa" && !active_sub_id.is_empty() {
        return View::AiChat {
            category: chat_category_label(active_sub_id),
        };
    }

    if active_id == "home" {
        return View::Home;
    }

    let label = if active_sub_id.is_empty() {
        find_menu(active_id)
            .map(|menu| menu.label.to_owned())
            .unwrap_or_else(|| active_id.to_owned())
    } else {
        find_sub_menu(active_sub_id)
            .map(|sub| sub.label.to_owned())
            .unwrap_or_else(|| active_sub_id.to_owned())
    };
    View::ComingSoon { label }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub active_id: String,
    pub active_sub_id: String,
    pub expanded_menus: BTreeSet<String>,
    pub favorites: BTreeSet<String>,
    pub focus: Focus,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            active_id: "home".to_owned(),
            active_sub_id: String::new(),
            expanded_menus: BTreeSet::new(),
            favorites: BTreeSet::new(),
            focus: Focus::Sidebar,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Select { id: String, sub_id: String },
    GoHome,
    ToggleMenu(String),
    ToggleFavorite(String),
    FocusSidebar,
    FocusContent,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ViewChanged(View),
    MenuToggled { id: String, expanded: bool },
    FavoriteToggled { tool_id: String, favorite: bool },
    FocusChanged(Focus),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn view(&self) -> View {
        route(&self.active_id, &self.active_sub_id)
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Select { id, sub_id } => self.select(id, sub_id),
            AppCommand::GoHome => self.select("home".to_owned(), String::new()),
            AppCommand::ToggleMenu(id) => {
                let expanded = if self.expanded_menus.remove(&id) {
                    false
                } else {
                    self.expanded_menus.insert(id.clone());
                    true
                };
                vec![AppEvent::MenuToggled { id, expanded }]
            }
            AppCommand::ToggleFavorite(tool_id) => {
                let Some(tool) = find_tool(&tool_id) else {
                    return vec![self.set_status(&format!("unknown tool {tool_id}"))];
                };
                let favorite = if self.favorites.remove(&tool_id) {
                    false
                } else {
                    self.favorites.insert(tool_id.clone());
                    true
                };
                let label = if favorite {
                    format!("已收藏 {}", tool.name)
                } else {
                    format!("已取消收藏 {}", tool.name)
                };
                vec![
                    AppEvent::FavoriteToggled { tool_id, favorite },
                    self.set_status(&label),
                ]
            }
            AppCommand::FocusSidebar => {
                self.focus = Focus::Sidebar;
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::FocusContent => {
                self.focus = Focus::Content;
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn select(&mut self, id: String, sub_id: String) -> Vec<AppEvent> {
        if self.active_id == id && self.active_sub_id == sub_id {
            return Vec::new();
        }
        if !sub_id.is_empty() {
            self.expanded_menus.insert(id.clone());
        }
        self.active_id = id;
        self.active_sub_id = sub_id;
        vec![AppEvent::ViewChanged(self.view())]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
