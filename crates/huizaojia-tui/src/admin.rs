// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent};
use huizaojia_app::admin::{
    Avatar, MenuKind, MenuTreeState, PermissionState, ROLE_OPTIONS, Role, User, search_roles,
    search_users, seed_roles, seed_users,
};
use huizaojia_app::forms::{
    Gender, MenuFormInput, PROCESSING_MESSAGE, PasswordFormInput, ProfileFormInput,
    RoleFormInput, SUCCESS_MESSAGE, UserFormInput,
};
use huizaojia_app::{AppState, RoleId, UserId};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::sync::mpsc::Sender;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    AppRuntime, InternalEvent, ViewData, centered_rect, cursor_prefix, edit_text, emit_status,
    is_ctrl, move_cursor, schedule_deferred_status,
};

const PROFILE_CONFIRM_DELAY: Duration = Duration::from_secs(1);
const SAVED_MESSAGE: &str = "保存成功";

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

fn load_avatar<R: AppRuntime>(runtime: &mut R, path: &str) -> Result<Avatar, String> {
    let path = path.trim();
    if path.is_empty() {
        return Err("请输入头像图片路径".to_owned());
    }
    match runtime.load_avatar(path) {
        Ok(url) => {
            debug!(path, bytes = url.len(), "avatar preview loaded");
            Ok(Avatar::DataUrl(url))
        }
        Err(error) => {
            warn!(path, error = %error, "avatar preview failed");
            Err(format!("头像加载失败: {error:#}"))
        }
    }
}

// Profile

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ProfileTab {
    #[default]
    Info,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoField {
    Nickname,
    Phone,
    Gender,
    AvatarPath,
}

const INFO_FIELDS: [InfoField; 4] = [
    InfoField::Nickname,
    InfoField::Phone,
    InfoField::Gender,
    InfoField::AvatarPath,
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ProfileUiState {
    pub(crate) tab: ProfileTab,
    pub(crate) field: usize,
    pub(crate) info: ProfileFormInput,
    pub(crate) avatar_path: String,
    pub(crate) password: PasswordFormInput,
}

impl ProfileUiState {
    fn field_count(&self) -> usize {
        match self.tab {
            ProfileTab::Info => INFO_FIELDS.len(),
            ProfileTab::Password => 3,
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.tab {
            ProfileTab::Info => match INFO_FIELDS.get(self.field)? {
                InfoField::Nickname => Some(&mut self.info.nickname),
                InfoField::Phone => Some(&mut self.info.phone),
                InfoField::Gender => None,
                InfoField::AvatarPath => Some(&mut self.avatar_path),
            },
            ProfileTab::Password => match self.field {
                0 => Some(&mut self.password.old_password),
                1 => Some(&mut self.password.new_password),
                2 => Some(&mut self.password.confirm_password),
                _ => None,
            },
        }
    }

    fn info_field(&self) -> Option<InfoField> {
        match self.tab {
            ProfileTab::Info => INFO_FIELDS.get(self.field).copied(),
            ProfileTab::Password => None,
        }
    }
}

pub(crate) fn handle_profile_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let profile = &mut view_data.profile;
    if is_ctrl(key, 'n') {
        profile.tab = match profile.tab {
            ProfileTab::Info => ProfileTab::Password,
            ProfileTab::Password => ProfileTab::Info,
        };
        profile.field = 0;
        return true;
    }
    if is_ctrl(key, 's') {
        let result = match profile.tab {
            ProfileTab::Info => profile.info.validate(),
            ProfileTab::Password => profile.password.validate(),
        };
        match result {
            Ok(()) => {
                if profile.tab == ProfileTab::Password {
                    profile.password.clear();
                }
                emit_status(state, view_data, internal_tx, PROCESSING_MESSAGE);
                schedule_deferred_status(internal_tx, PROFILE_CONFIRM_DELAY, SUCCESS_MESSAGE);
            }
            Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
        }
        return true;
    }

    let count = profile.field_count();
    match key.code {
        KeyCode::Up => move_cursor(&mut profile.field, count, -1),
        KeyCode::Enter if profile.info_field() == Some(InfoField::AvatarPath) => {
            let message = match load_avatar(runtime, &profile.avatar_path) {
                Ok(avatar) => {
                    profile.info.avatar = avatar;
                    "头像已更新预览".to_owned()
                }
                Err(message) => message,
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Down | KeyCode::Enter => move_cursor(&mut profile.field, count, 1),
        KeyCode::Char(' ') if profile.info_field() == Some(InfoField::Gender) => {
            profile.info.gender = profile.info.gender.flip();
        }
        _ => {
            return profile
                .text_mut()
                .is_some_and(|buffer| edit_text(buffer, key));
        }
    }
    true
}

pub(crate) fn render_profile_text(profile: &ProfileUiState) -> String {
    let tab = |tab: ProfileTab, label: &str| {
        if profile.tab == tab {
            format!("[{label}]")
        } else {
            format!(" {label} ")
        }
    };
    let mut lines = vec![
        format!(
            "{} {}",
            tab(ProfileTab::Info, "基本资料"),
            tab(ProfileTab::Password, "修改密码")
        ),
        String::new(),
    ];
    let marker = |index: usize| cursor_prefix(index == profile.field);
    match profile.tab {
        ProfileTab::Info => {
            let info = &profile.info;
            lines.push(format!("{} 用户昵称: {}", marker(0), info.nickname));
            lines.push(format!("{} 手机号码: {}", marker(1), info.phone));
            lines.push(format!("{} 性别: {}", marker(2), info.gender.label()));
            lines.push(format!(
                "{} 头像: {} {}",
                marker(3),
                info.avatar.label(),
                profile.avatar_path
            ));
        }
        ProfileTab::Password => {
            let password = &profile.password;
            lines.push(format!("{} 旧密码: {}", marker(0), mask(&password.old_password)));
            lines.push(format!("{} 新密码: {}", marker(1), mask(&password.new_password)));
            lines.push(format!(
                "{} 确认密码: {}",
                marker(2),
                mask(&password.confirm_password)
            ));
        }
    }
    lines.push(String::new());
    lines.push("^s 更新".to_owned());
    lines.join("\n")
}

// Users

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserField {
    Username,
    Nickname,
    Roles,
    Gender,
    Avatar,
}

const USER_FIELDS: [UserField; 5] = [
    UserField::Username,
    UserField::Nickname,
    UserField::Roles,
    UserField::Gender,
    UserField::Avatar,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserDialog {
    pub(crate) editing: Option<UserId>,
    pub(crate) form: UserFormInput,
    pub(crate) field: usize,
    pub(crate) role_cursor: usize,
    pub(crate) avatar_path: String,
}

impl UserDialog {
    fn new_user() -> Self {
        Self {
            editing: None,
            form: UserFormInput {
                username: String::new(),
                nickname: String::new(),
                roles: Vec::new(),
                gender: Gender::default(),
                avatar: Avatar::Placeholder,
            },
            field: 0,
            role_cursor: 0,
            avatar_path: String::new(),
        }
    }

    fn edit_user(user: &User) -> Self {
        Self {
            editing: Some(user.id),
            form: UserFormInput::from_user(user),
            ..Self::new_user()
        }
    }

    fn current(&self) -> UserField {
        USER_FIELDS
            .get(self.field)
            .copied()
            .unwrap_or(UserField::Username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserAdminUiState {
    pub(crate) users: Vec<User>,
    pub(crate) query: String,
    pub(crate) searching: bool,
    pub(crate) cursor: usize,
    pub(crate) dialog: Option<UserDialog>,
}

impl Default for UserAdminUiState {
    fn default() -> Self {
        Self {
            users: seed_users(),
            query: String::new(),
            searching: false,
            cursor: 0,
            dialog: None,
        }
    }
}

pub(crate) fn handle_user_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.users.dialog.is_some() {
        handle_user_dialog_key(state, runtime, view_data, internal_tx, key);
        return true;
    }

    let users = &mut view_data.users;
    if users.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => users.searching = false,
            _ => {
                if edit_text(&mut users.query, key) {
                    users.cursor = 0;
                }
            }
        }
        return true;
    }

    let visible: Vec<User> = search_users(&users.users, &users.query)
        .into_iter()
        .cloned()
        .collect();
    match key.code {
        KeyCode::Char('/') => users.searching = true,
        KeyCode::Char('j') | KeyCode::Down => move_cursor(&mut users.cursor, visible.len(), 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(&mut users.cursor, visible.len(), -1),
        KeyCode::Char('a') => users.dialog = Some(UserDialog::new_user()),
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(user) = visible.get(users.cursor) {
                users.dialog = Some(UserDialog::edit_user(user));
            }
        }
        KeyCode::Char('d') => {
            if let Some(user) = visible.get(users.cursor) {
                let message = format!("删除用户: {}", user.username);
                emit_status(state, view_data, internal_tx, message);
            }
        }
        KeyCode::Esc if !users.query.is_empty() => {
            users.query.clear();
            users.cursor = 0;
        }
        _ => return false,
    }
    true
}

fn handle_user_dialog_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(dialog) = view_data.users.dialog.as_mut() else {
        return;
    };
    if is_ctrl(key, 's') {
        let message = match dialog.form.validate() {
            Ok(()) => {
                debug!(user = ?dialog.editing, "user form saved");
                view_data.users.dialog = None;
                SAVED_MESSAGE.to_owned()
            }
            Err(error) => format!("{error:#}"),
        };
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    let field = dialog.current();
    let mut message = None;
    match (key.code, field) {
        (KeyCode::Esc, _) => view_data.users.dialog = None,
        (KeyCode::Up, _) => move_cursor(&mut dialog.field, USER_FIELDS.len(), -1),
        (KeyCode::Down, _) => move_cursor(&mut dialog.field, USER_FIELDS.len(), 1),
        (KeyCode::Left, UserField::Roles) => {
            move_cursor(&mut dialog.role_cursor, ROLE_OPTIONS.len(), -1);
        }
        (KeyCode::Right, UserField::Roles) => {
            move_cursor(&mut dialog.role_cursor, ROLE_OPTIONS.len(), 1);
        }
        (KeyCode::Char(' '), UserField::Roles) => {
            if let Some(role) = ROLE_OPTIONS.get(dialog.role_cursor) {
                dialog.form.toggle_role(role);
            }
        }
        (KeyCode::Char(' '), UserField::Gender) => {
            dialog.form.gender = dialog.form.gender.flip();
        }
        (KeyCode::Enter, UserField::Avatar) => {
            message = Some(match load_avatar(runtime, &dialog.avatar_path) {
                Ok(avatar) => {
                    dialog.form.avatar = avatar;
                    "头像已更新预览".to_owned()
                }
                Err(message) => message,
            });
        }
        (KeyCode::Enter, _) => move_cursor(&mut dialog.field, USER_FIELDS.len(), 1),
        (_, UserField::Username) => {
            edit_text(&mut dialog.form.username, key);
        }
        (_, UserField::Nickname) => {
            edit_text(&mut dialog.form.nickname, key);
        }
        (_, UserField::Avatar) => {
            edit_text(&mut dialog.avatar_path, key);
        }
        _ => {}
    }
    if let Some(message) = message {
        emit_status(state, view_data, internal_tx, message);
    }
}

pub(crate) fn render_users(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    users: &UserAdminUiState,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let caret = if users.searching { "_" } else { "" };
    frame.render_widget(
        Paragraph::new(format!("用户名: {}{caret}", users.query)),
        layout[0],
    );

    let rows: Vec<Row> = search_users(&users.users, &users.query)
        .into_iter()
        .enumerate()
        .map(|(index, user)| {
            let style = if index == users.cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(user.id.to_string()),
                Cell::from(user.username.clone()),
                Cell::from(user.nickname.clone()),
                Cell::from(user.roles.clone()),
                Cell::from(user.gender.clone()),
                Cell::from(user.avatar.label().to_owned()),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Min(12),
            Constraint::Length(4),
            Constraint::Length(4),
        ],
    )
    .header(
        Row::new(vec!["序号", "用户名", "昵称", "角色", "性别", "头像"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(table, layout[1]);

    if let Some(dialog) = &users.dialog {
        let popup = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup);
        let title = if dialog.editing.is_some() {
            "编辑用户"
        } else {
            "新增用户"
        };
        let body = Paragraph::new(render_user_dialog_text(dialog))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(body, popup);
    }
}

fn render_user_dialog_text(dialog: &UserDialog) -> String {
    let marker = |index: usize| cursor_prefix(index == dialog.field);
    let roles: Vec<String> = ROLE_OPTIONS
        .iter()
        .enumerate()
        .map(|(index, role)| {
            let checked = if dialog.form.roles.iter().any(|owned| owned == role) {
                "[x]"
            } else {
                "[ ]"
            };
            let focus = if index == dialog.role_cursor { ">" } else { "" };
            format!("{focus}{checked}{role}")
        })
        .collect();
    [
        format!("{} 用户名: {}", marker(0), dialog.form.username),
        format!("{} 昵称: {}", marker(1), dialog.form.nickname),
        format!("{} 角色: {}", marker(2), roles.join(" ")),
        format!("{} 性别: {}", marker(3), dialog.form.gender.label()),
        format!(
            "{} 头像: {} {}",
            marker(4),
            dialog.form.avatar.label(),
            dialog.avatar_path
        ),
        String::new(),
        "^s 保存 | esc 取消".to_owned(),
    ]
    .join("\n")
}

// Roles

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RolePane {
    #[default]
    Roles,
    Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoleDialog {
    pub(crate) editing: Option<RoleId>,
    pub(crate) form: RoleFormInput,
    pub(crate) field: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoleAdminUiState {
    pub(crate) roles: Vec<Role>,
    pub(crate) query: String,
    pub(crate) searching: bool,
    pub(crate) cursor: usize,
    pub(crate) pane: RolePane,
    pub(crate) permissions: PermissionState,
    pub(crate) permission_cursor: usize,
    pub(crate) dialog: Option<RoleDialog>,
}

impl Default for RoleAdminUiState {
    fn default() -> Self {
        Self {
            roles: seed_roles(),
            query: String::new(),
            searching: false,
            cursor: 0,
            pane: RolePane::default(),
            permissions: PermissionState::default(),
            permission_cursor: 0,
            dialog: None,
        }
    }
}

pub(crate) fn handle_role_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.roles.dialog.is_some() {
        handle_role_dialog_key(state, view_data, internal_tx, key);
        return true;
    }

    let roles = &mut view_data.roles;
    if roles.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => roles.searching = false,
            _ => {
                if edit_text(&mut roles.query, key) {
                    roles.cursor = 0;
                }
            }
        }
        return true;
    }
    if is_ctrl(key, 'n') {
        roles.pane = match roles.pane {
            RolePane::Roles => RolePane::Permissions,
            RolePane::Permissions => RolePane::Roles,
        };
        return true;
    }
    if is_ctrl(key, 's') {
        emit_status(state, view_data, internal_tx, "角色权限更新成功");
        return true;
    }

    match roles.pane {
        RolePane::Roles => {
            let visible: Vec<Role> = search_roles(&roles.roles, &roles.query)
                .into_iter()
                .cloned()
                .collect();
            match key.code {
                KeyCode::Char('/') => roles.searching = true,
                KeyCode::Char('j') | KeyCode::Down => {
                    move_cursor(&mut roles.cursor, visible.len(), 1);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    move_cursor(&mut roles.cursor, visible.len(), -1);
                }
                KeyCode::Char('a') => {
                    roles.dialog = Some(RoleDialog {
                        editing: None,
                        form: RoleFormInput::default(),
                        field: 0,
                    });
                }
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(role) = visible.get(roles.cursor) {
                        roles.dialog = Some(RoleDialog {
                            editing: Some(role.id),
                            form: RoleFormInput {
                                name: role.name.clone(),
                                code: role.code.clone(),
                            },
                            field: 0,
                        });
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(role) = visible.get(roles.cursor) {
                        let message = format!("删除角色: {}", role.name);
                        emit_status(state, view_data, internal_tx, message);
                    }
                }
                _ => return false,
            }
        }
        RolePane::Permissions => {
            let rows = roles.permissions.visible_rows();
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    move_cursor(&mut roles.permission_cursor, rows.len(), 1);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    move_cursor(&mut roles.permission_cursor, rows.len(), -1);
                }
                KeyCode::Char(' ') => {
                    if let Some(row) = rows.get(roles.permission_cursor) {
                        let check = roles.permissions.toggle(row.node);
                        debug!(permission = row.node.id, ?check, "permission toggled");
                    }
                }
                KeyCode::Enter | KeyCode::Char('l') | KeyCode::Char('h') => {
                    if let Some(row) = rows.get(roles.permission_cursor)
                        && !row.node.children.is_empty()
                    {
                        roles.permissions.toggle_expanded(row.node.id);
                    }
                }
                _ => return false,
            }
        }
    }
    true
}

fn handle_role_dialog_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(dialog) = view_data.roles.dialog.as_mut() else {
        return;
    };
    if is_ctrl(key, 's') {
        let message = match dialog.form.validate() {
            Ok(()) => {
                debug!(role = ?dialog.editing, "role form saved");
                view_data.roles.dialog = None;
                SAVED_MESSAGE.to_owned()
            }
            Err(error) => format!("{error:#}"),
        };
        emit_status(state, view_data, internal_tx, message);
        return;
    }
    match key.code {
        KeyCode::Esc => view_data.roles.dialog = None,
        KeyCode::Up => move_cursor(&mut dialog.field, 2, -1),
        KeyCode::Down | KeyCode::Enter => move_cursor(&mut dialog.field, 2, 1),
        _ => {
            let buffer = if dialog.field == 0 {
                &mut dialog.form.name
            } else {
                &mut dialog.form.code
            };
            edit_text(buffer, key);
        }
    }
}

pub(crate) fn render_roles(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    roles: &RoleAdminUiState,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let pane_title = |title: &str, pane: RolePane| {
        if roles.pane == pane {
            format!("[{title}]")
        } else {
            title.to_owned()
        }
    };

    frame.render_widget(
        Paragraph::new(render_role_list_text(roles)).block(
            Block::default()
                .title(pane_title("角色列表", RolePane::Roles))
                .borders(Borders::ALL),
        ),
        columns[0],
    );
    frame.render_widget(
        Paragraph::new(render_permission_text(roles)).block(
            Block::default()
                .title(pane_title("菜单权限", RolePane::Permissions))
                .borders(Borders::ALL),
        ),
        columns[1],
    );

    if let Some(dialog) = &roles.dialog {
        let popup = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup);
        let title = if dialog.editing.is_some() {
            "编辑角色"
        } else {
            "新增角色"
        };
        let text = format!(
            "{} 角色名称: {}\n{} 权限字符: {}\n\n^s 保存 | esc 取消",
            cursor_prefix(dialog.field == 0),
            dialog.form.name,
            cursor_prefix(dialog.field == 1),
            dialog.form.code
        );
        frame.render_widget(
            Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL)),
            popup,
        );
    }
}

fn render_role_list_text(roles: &RoleAdminUiState) -> String {
    let caret = if roles.searching { "_" } else { "" };
    let mut lines = vec![format!("角色名称: {}{caret}", roles.query), String::new()];
    for (index, role) in search_roles(&roles.roles, &roles.query)
        .into_iter()
        .enumerate()
    {
        let selected = roles.pane == RolePane::Roles && index == roles.cursor;
        lines.push(format!(
            "{} {}  {}  {}",
            cursor_prefix(selected),
            role.name,
            role.code,
            role.created_at
        ));
    }
    lines.join("\n")
}

pub(crate) fn render_permission_text(roles: &RoleAdminUiState) -> String {
    roles
        .permissions
        .visible_rows()
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let selected = roles.pane == RolePane::Permissions && index == roles.permission_cursor;
            let arrow = if row.node.children.is_empty() {
                " "
            } else if roles.permissions.expanded.contains(row.node.id) {
                "▾"
            } else {
                "▸"
            };
            format!(
                "{}{}{arrow} {} {}",
                cursor_prefix(selected),
                "  ".repeat(row.depth),
                roles.permissions.node_state(row.node).glyph(),
                row.node.label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Menus

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MenuDialog {
    pub(crate) editing: Option<&'static str>,
    pub(crate) form: MenuFormInput,
    pub(crate) order: String,
    pub(crate) field: usize,
}

const MENU_DIALOG_FIELDS: usize = 5;

impl MenuDialog {
    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            1 => Some(&mut self.form.name),
            2 => Some(&mut self.order),
            3 => Some(&mut self.form.perm_key),
            4 => Some(&mut self.form.path),
            _ => None,
        }
    }

    /// Copies the order buffer into the form. Only non-negative integers are
    /// accepted.
    fn commit_order(&mut self) -> Result<(), String> {
        self.form.order = self
            .order
            .trim()
            .parse::<u32>()
            .map_err(|_| "显示排序必须是非负整数".to_owned())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct MenuAdminUiState {
    pub(crate) tree: MenuTreeState,
    pub(crate) searching: bool,
    pub(crate) cursor: usize,
    pub(crate) dialog: Option<MenuDialog>,
}

pub(crate) fn handle_menu_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.menus.dialog.is_some() {
        handle_menu_dialog_key(state, view_data, internal_tx, key);
        return true;
    }

    let menus = &mut view_data.menus;
    if menus.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => menus.searching = false,
            _ => {
                edit_text(&mut menus.tree.query, key);
            }
        }
        return true;
    }

    let rows = menus.tree.table_rows();
    let current = rows.get(menus.cursor).map(|row| row.node);
    match key.code {
        KeyCode::Char('/') => menus.searching = true,
        KeyCode::Char('j') | KeyCode::Down => move_cursor(&mut menus.cursor, rows.len(), 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(&mut menus.cursor, rows.len(), -1),
        KeyCode::Enter => {
            if let Some(node) = current {
                menus.tree.selected = node.id.to_owned();
                if node.has_children() {
                    menus.tree.toggle(node.id);
                }
            }
        }
        KeyCode::Char('a') => {
            menus.dialog = Some(MenuDialog {
                editing: None,
                form: MenuFormInput::default(),
                order: MenuFormInput::default().order.to_string(),
                field: 0,
            });
        }
        KeyCode::Char('e') => {
            if let Some(node) = current {
                let kind = if node.has_children() {
                    MenuKind::Catalog
                } else {
                    MenuKind::Menu
                };
                menus.dialog = Some(MenuDialog {
                    editing: Some(node.id),
                    form: MenuFormInput {
                        kind,
                        name: node.name.to_owned(),
                        order: node.order,
                        perm_key: node.perm_key.to_owned(),
                        path: node.path.to_owned(),
                    },
                    order: node.order.to_string(),
                    field: 0,
                });
            }
        }
        KeyCode::Char('d') => {
            if let Some(node) = current {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("删除菜单: {}", node.name),
                );
            }
        }
        KeyCode::Esc if !menus.tree.query.is_empty() => menus.tree.query.clear(),
        _ => return false,
    }
    true
}

fn handle_menu_dialog_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(dialog) = view_data.menus.dialog.as_mut() else {
        return;
    };
    if is_ctrl(key, 's') {
        let result = dialog
            .commit_order()
            .and_then(|()| dialog.form.validate().map_err(|error| format!("{error:#}")));
        let message = match result {
            Ok(()) => {
                debug!(menu = ?dialog.editing, kind = dialog.form.kind.label(), "menu form saved");
                view_data.menus.dialog = None;
                SAVED_MESSAGE.to_owned()
            }
            Err(message) => message,
        };
        emit_status(state, view_data, internal_tx, message);
        return;
    }
    match key.code {
        KeyCode::Esc => view_data.menus.dialog = None,
        KeyCode::Up => move_cursor(&mut dialog.field, MENU_DIALOG_FIELDS, -1),
        KeyCode::Down | KeyCode::Enter => move_cursor(&mut dialog.field, MENU_DIALOG_FIELDS, 1),
        KeyCode::Char(' ') if dialog.field == 0 => {
            let index = MenuKind::ALL
                .iter()
                .position(|kind| *kind == dialog.form.kind)
                .unwrap_or(0);
            dialog.form.kind = MenuKind::ALL[(index + 1) % MenuKind::ALL.len()];
        }
        _ => {
            if let Some(buffer) = dialog.text_mut() {
                edit_text(buffer, key);
            }
        }
    }
}

pub(crate) fn render_menus(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'static>,
    menus: &MenuAdminUiState,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(1)])
        .split(inner);

    frame.render_widget(
        Paragraph::new(render_menu_sidebar_text(menus))
            .block(Block::default().title("菜单").borders(Borders::ALL)),
        columns[0],
    );

    let rows: Vec<Row> = menus
        .tree
        .table_rows()
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let arrow = if !row.node.has_children() {
                " "
            } else if menus.tree.expanded.contains(row.node.id) {
                "▾"
            } else {
                "▸"
            };
            let style = if index == menus.cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}{arrow} {}", "  ".repeat(row.depth), row.node.name)),
                Cell::from(row.node.icon),
                Cell::from(row.node.order.to_string()),
                Cell::from(row.node.perm_key),
                Cell::from(row.node.path),
                Cell::from(row.node.status.label()),
                Cell::from(row.node.created_at),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(18),
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Length(19),
        ],
    )
    .header(
        Row::new(vec!["菜单名称", "图标", "排序", "权限标识", "路由", "状态", "创建时间"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(table, columns[1]);

    if let Some(dialog) = &menus.dialog {
        let popup = centered_rect(50, 50, area);
        frame.render_widget(Clear, popup);
        let title = if dialog.editing.is_some() {
            "修改菜单"
        } else {
            "添加菜单"
        };
        let marker = |index: usize| cursor_prefix(index == dialog.field);
        let text = [
            format!("{} 菜单类型: {}", marker(0), dialog.form.kind.label()),
            format!("{} 菜单名称: {}", marker(1), dialog.form.name),
            format!("{} 显示排序: {}", marker(2), dialog.order),
            format!("{} 权限标识: {}", marker(3), dialog.form.perm_key),
            format!("{} 路由地址: {}", marker(4), dialog.form.path),
            String::new(),
            "^s 保存 | esc 取消".to_owned(),
        ]
        .join("\n");
        frame.render_widget(
            Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL)),
            popup,
        );
    }
}

pub(crate) fn render_menu_sidebar_text(menus: &MenuAdminUiState) -> String {
    let caret = if menus.searching { "_" } else { "" };
    let mut lines = vec![format!("搜索: {}{caret}", menus.tree.query), String::new()];
    for row in menus.tree.sidebar_rows() {
        let selected = if row.node.id == menus.tree.selected {
            "*"
        } else {
            " "
        };
        lines.push(format!(
            "{selected}{}{}",
            "  ".repeat(row.depth),
            row.node.name
        ));
    }
    lines.join("\n")
}
