// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::{RoleId, UserId};

// Menus

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStatus {
    Normal,
    Disabled,
}

impl MenuStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "正常",
            Self::Disabled => "停用",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Catalog,
    Menu,
    Button,
}

impl MenuKind {
    pub const ALL: [Self; 3] = [Self::Catalog, Self::Menu, Self::Button];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Catalog => "目录",
            Self::Menu => "菜单",
            Self::Button => "按钮",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuNode {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub order: u32,
    pub perm_key: &'static str,
    pub path: &'static str,
    pub status: MenuStatus,
    pub created_at: &'static str,
    pub children: &'static [MenuNode],
}

impl MenuNode {
    const fn leaf(
        id: &'static str,
        name: &'static str,
        order: u32,
        perm_key: &'static str,
        path: &'static str,
        created_at: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            icon: "#",
            order,
            perm_key,
            path,
            status: MenuStatus::Normal,
            created_at,
            children: &[],
        }
    }

    const fn with_children(self, children: &'static [MenuNode]) -> Self {
        Self { children, ..self }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// True when this node or any descendant has `query` in its name.
    pub fn matches(&self, query: &str) -> bool {
        self.name.contains(query) || self.children.iter().any(|child| child.matches(query))
    }
}

const USER_MENU_CHILDREN: [MenuNode; 2] = [
    MenuNode::leaf("211", "修改权限", 1, "user:edit", "", "2026-01-08 10:05:00"),
    MenuNode::leaf("212", "新增权限", 2, "user:add", "", "2026-01-08 10:06:00"),
];

const SYSTEM_MENU_CHILDREN: [MenuNode; 3] = [
    MenuNode::leaf(
        "21",
        "用户管理",
        1,
        "system:user:list",
        "user",
        "2026-01-08 10:00:00",
    )
    .with_children(&USER_MENU_CHILDREN),
    MenuNode::leaf(
        "22",
        "角色管理",
        2,
        "system:role:list",
        "role",
        "2026-01-08 11:00:00",
    ),
    MenuNode::leaf(
        "23",
        "菜单管理",
        3,
        "system:menu:list",
        "menu",
        "2026-01-08 11:30:00",
    ),
];

const GENERAL_APP_CHILDREN: [MenuNode; 2] = [
    MenuNode::leaf(
        "311",
        "工期计算器",
        1,
        "app:calc:duration",
        "",
        "2026-01-12 09:35:00",
    ),
    MenuNode::leaf(
        "312",
        "节假日信息维护",
        2,
        "app:holiday:mgt",
        "",
        "2026-01-12 09:36:00",
    ),
];

const APP_MENU_CHILDREN: [MenuNode; 1] = [MenuNode::leaf(
    "31",
    "汇通用",
    1,
    "",
    "",
    "2026-01-12 09:30:00",
)
.with_children(&GENERAL_APP_CHILDREN)];

pub const MENU_TREE: [MenuNode; 3] = [
    MenuNode::leaf("1", "个人中心", 1, "", "/index", "2026-01-08 08:25:35"),
    MenuNode::leaf("2", "系统管理", 2, "", "", "2026-01-08 06:31:29")
        .with_children(&SYSTEM_MENU_CHILDREN),
    MenuNode::leaf("3", "应用管理", 3, "", "", "2026-01-12 09:27:37")
        .with_children(&APP_MENU_CHILDREN),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow<T: 'static> {
    pub depth: usize,
    pub node: &'static T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuTreeState {
    pub expanded: BTreeSet<String>,
    pub query: String,
    pub selected: String,
}

impl Default for MenuTreeState {
    fn default() -> Self {
        Self {
            expanded: ["2", "21", "3", "31"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            query: String::new(),
            selected: "211".to_owned(),
        }
    }
}

impl MenuTreeState {
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_owned());
            true
        }
    }

    /// Rows of the menu table: every node under an expanded parent.
    pub fn table_rows(&self) -> Vec<TreeRow<MenuNode>> {
        let mut rows = Vec::new();
        self.walk(&MENU_TREE, 0, "", &mut rows);
        rows
    }

    /// Rows of the sidebar tree, filtered by the search query.
    pub fn sidebar_rows(&self) -> Vec<TreeRow<MenuNode>> {
        let mut rows = Vec::new();
        self.walk(&MENU_TREE, 0, self.query.trim(), &mut rows);
        rows
    }

    fn walk(
        &self,
        nodes: &'static [MenuNode],
        depth: usize,
        query: &str,
        rows: &mut Vec<TreeRow<MenuNode>>,
    ) {
        for node in nodes {
            if !query.is_empty() && !node.matches(query) {
                continue;
            }
            rows.push(TreeRow { depth, node });
            if node.has_children() && self.expanded.contains(node.id) {
                self.walk(node.children, depth + 1, query, rows);
            }
        }
    }

    pub fn selected_node(&self) -> Option<&'static MenuNode> {
        find_menu_node(&MENU_TREE, &self.selected)
    }
}

pub fn find_menu_node(nodes: &'static [MenuNode], id: &str) -> Option<&'static MenuNode> {
    nodes.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_menu_node(node.children, id)
        }
    })
}

// Roles and permissions

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionNode {
    pub id: &'static str,
    pub label: &'static str,
    pub children: &'static [PermissionNode],
}

const fn perm(id: &'static str, label: &'static str) -> PermissionNode {
    PermissionNode {
        id,
        label,
        children: &[],
    }
}

const fn perm_group(
    id: &'static str,
    label: &'static str,
    children: &'static [PermissionNode],
) -> PermissionNode {
    PermissionNode {
        id,
        label,
        children,
    }
}

const USER_PERMISSIONS: [PermissionNode; 3] = [
    perm("user-edit", "修改权限"),
    perm("user-add", "新增权限"),
    perm("user-delete", "删除权限"),
];

const SYSTEM_PERMISSIONS: [PermissionNode; 3] = [
    perm_group("user-mgt", "用户管理", &USER_PERMISSIONS),
    perm("role-mgt", "角色管理"),
    perm("menu-mgt", "菜单管理"),
];

const APP_PERMISSIONS: [PermissionNode; 2] =
    [perm("app-list", "应用列表"), perm("app-audit", "审批流配置")];

pub const PERMISSION_TREE: [PermissionNode; 3] = [
    perm("profile", "个人中心"),
    perm_group("system", "系统管理", &SYSTEM_PERMISSIONS),
    perm_group("app-mgt", "应用管理", &APP_PERMISSIONS),
];

pub fn find_permission(
    nodes: &'static [PermissionNode],
    id: &str,
) -> Option<&'static PermissionNode> {
    nodes.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_permission(node.children, id)
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Unchecked,
    Indeterminate,
}

impl CheckState {
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Checked => "[x]",
            Self::Unchecked => "[ ]",
            Self::Indeterminate => "[-]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionState {
    pub expanded: BTreeSet<String>,
    pub checked: BTreeSet<String>,
}

impl Default for PermissionState {
    fn default() -> Self {
        Self {
            expanded: ["system", "user-mgt"].into_iter().map(str::to_owned).collect(),
            checked: ["profile", "role-mgt", "menu-mgt"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl PermissionState {
    /// A leaf is checked when its id is in the set. A parent is checked when
    /// every child is checked; when every child is unchecked it is
    /// indeterminate only if its own id is in the set.
    pub fn node_state(&self, node: &PermissionNode) -> CheckState {
        if node.children.is_empty() {
            return if self.checked.contains(node.id) {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
        }
        let states: Vec<CheckState> = node
            .children
            .iter()
            .map(|child| self.node_state(child))
            .collect();
        if states.iter().all(|state| *state == CheckState::Checked) {
            CheckState::Checked
        } else if states.iter().all(|state| *state == CheckState::Unchecked) {
            if self.checked.contains(node.id) {
                CheckState::Indeterminate
            } else {
                CheckState::Unchecked
            }
        } else {
            CheckState::Indeterminate
        }
    }

    /// Clears the whole subtree of a checked node; checks it otherwise.
    pub fn toggle(&mut self, node: &PermissionNode) -> CheckState {
        let clear = self.node_state(node) == CheckState::Checked;
        for id in subtree_ids(node) {
            if clear {
                self.checked.remove(id);
            } else {
                self.checked.insert(id.to_owned());
            }
        }
        self.node_state(node)
    }

    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_owned());
            true
        }
    }

    pub fn visible_rows(&self) -> Vec<TreeRow<PermissionNode>> {
        let mut rows = Vec::new();
        self.walk(&PERMISSION_TREE, 0, &mut rows);
        rows
    }

    fn walk(
        &self,
        nodes: &'static [PermissionNode],
        depth: usize,
        rows: &mut Vec<TreeRow<PermissionNode>>,
    ) {
        for node in nodes {
            rows.push(TreeRow { depth, node });
            if !node.children.is_empty() && self.expanded.contains(node.id) {
                self.walk(node.children, depth + 1, rows);
            }
        }
    }
}

pub fn subtree_ids(node: &PermissionNode) -> Vec<&'static str> {
    let mut ids = vec![node.id];
    for child in node.children {
        ids.extend(subtree_ids(child));
    }
    ids
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: String,
    pub created_at: String,
}

pub fn seed_roles() -> Vec<Role> {
    vec![
        Role {
            id: RoleId::new(1),
            name: "管理员".to_owned(),
            code: "admin".to_owned(),
            created_at: "2024-05-20 10:00:00".to_owned(),
        },
        Role {
            id: RoleId::new(2),
            name: "测试".to_owned(),
            code: "test".to_owned(),
            created_at: "2024-05-20 11:30:00".to_owned(),
        },
    ]
}

pub fn search_roles<'a>(roles: &'a [Role], query: &str) -> Vec<&'a Role> {
    let query = query.trim();
    roles
        .iter()
        .filter(|role| query.is_empty() || role.name.contains(query))
        .collect()
}

// Users

pub const ROLE_OPTIONS: [&str; 5] = ["管理员", "测试1", "测试2", "普通用户", "访客"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Black,
    Placeholder,
    DataUrl(String),
}

impl Avatar {
    pub fn label(&self) -> &str {
        match self {
            Self::Black => "●",
            Self::Placeholder => "○",
            Self::DataUrl(_) => "◉",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub nickname: String,
    pub roles: String,
    pub gender: String,
    pub avatar: Avatar,
}

pub fn seed_users() -> Vec<User> {
    let user = |id, username: &str, nickname: &str, roles: &str, avatar| User {
        id: UserId::new(id),
        username: username.to_owned(),
        nickname: nickname.to_owned(),
        roles: roles.to_owned(),
        gender: "男".to_owned(),
        avatar,
    };
    vec![
        user(1, "admin", "管理员", "管理员,测试1", Avatar::Black),
        user(2, "test", "测试1", "测试2", Avatar::Placeholder),
        user(3, "test1", "测试1", "普通用户", Avatar::Placeholder),
    ]
}

pub fn search_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let query = query.trim().to_lowercase();
    users
        .iter()
        .filter(|user| query.is_empty() || user.username.to_lowercase().contains(&query))
        .collect()
}
