// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::admin::{Avatar, MenuKind, ROLE_OPTIONS, User};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const PROCESSING_MESSAGE: &str = "正在处理...";
pub const SUCCESS_MESSAGE: &str = "操作成功";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "男",
            Self::Female => "女",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "男" => Some(Self::Male),
            "女" => Some(Self::Female),
            _ => None,
        }
    }

    pub const fn flip(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFormInput {
    pub nickname: String,
    pub phone: String,
    pub gender: Gender,
    pub avatar: Avatar,
}

impl Default for ProfileFormInput {
    fn default() -> Self {
        Self {
            nickname: "管理员".to_owned(),
            phone: "18888888888".to_owned(),
            gender: Gender::Male,
            avatar: Avatar::Placeholder,
        }
    }
}

impl ProfileFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.nickname.trim().is_empty() {
            bail!("昵称不能为空");
        }
        let phone = self.phone.trim();
        if !phone.is_empty() && !phone.chars().all(|ch| ch.is_ascii_digit()) {
            bail!("手机号码只能包含数字");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasswordFormInput {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.old_password.is_empty() {
            bail!("请输入旧密码");
        }
        if self.new_password.is_empty() {
            bail!("请输入新密码");
        }
        if self.confirm_password.is_empty() {
            bail!("请确认新密码");
        }
        if self.new_password != self.confirm_password {
            bail!("两次输入的新密码不一致");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            bail!("新密码长度不能少于 {MIN_PASSWORD_LEN} 位");
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormInput {
    pub username: String,
    pub nickname: String,
    pub roles: Vec<String>,
    pub gender: Gender,
    pub avatar: Avatar,
}

impl UserFormInput {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            roles: user
                .roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_owned)
                .collect(),
            gender: Gender::parse(&user.gender).unwrap_or_default(),
            avatar: user.avatar.clone(),
        }
    }

    pub fn toggle_role(&mut self, role: &str) {
        if let Some(position) = self.roles.iter().position(|existing| existing == role) {
            self.roles.remove(position);
        } else {
            self.roles.push(role.to_owned());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("用户名不能为空");
        }
        if self.nickname.trim().is_empty() {
            bail!("昵称不能为空");
        }
        if let Some(unknown) = self
            .roles
            .iter()
            .find(|role| !ROLE_OPTIONS.contains(&role.as_str()))
        {
            bail!("未知角色 {unknown}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleFormInput {
    pub name: String,
    pub code: String,
}

impl RoleFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("角色名称不能为空");
        }
        if self.code.trim().is_empty() {
            bail!("权限字符不能为空");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuFormInput {
    pub kind: MenuKind,
    pub name: String,
    pub order: u32,
    pub perm_key: String,
    pub path: String,
}

impl Default for MenuFormInput {
    fn default() -> Self {
        Self {
            kind: MenuKind::Catalog,
            name: String::new(),
            order: 1,
            perm_key: String::new(),
            path: String::new(),
        }
    }
}

impl MenuFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("菜单名称不能为空");
        }
        if self.kind == MenuKind::Menu && self.path.trim().is_empty() {
            bail!("菜单类型需要填写路由地址");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Gender, MenuFormInput, PasswordFormInput, ProfileFormInput, RoleFormInput, UserFormInput,
    };
    use crate::admin::{MenuKind, seed_users};

    fn password(old: &str, new: &str, confirm: &str) -> PasswordFormInput {
        PasswordFormInput {
            old_password: old.to_owned(),
            new_password: new.to_owned(),
            confirm_password: confirm.to_owned(),
        }
    }

    #[test]
    fn password_requires_every_field() {
        assert!(password("", "secret1", "secret1").validate().is_err());
        assert!(password("old", "", "secret1").validate().is_err());
        assert!(password("old", "secret1", "").validate().is_err());
    }

    #[test]
    fn password_must_match_and_be_long_enough() {
        let err = password("old", "secret1", "secret2")
            .validate()
            .expect_err("mismatch rejected");
        assert!(err.to_string().contains("不一致"));
        let err = password("old", "abc", "abc")
            .validate()
            .expect_err("short rejected");
        assert!(err.to_string().contains('6'));
        password("old", "abcdef", "abcdef")
            .validate()
            .expect("six chars accepted");
        password("old", "六个汉字密码", "六个汉字密码")
            .validate()
            .expect("length counts characters");
    }

    #[test]
    fn clearing_password_resets_fields() {
        let mut form = password("a", "b", "c");
        form.clear();
        assert_eq!(form, PasswordFormInput::default());
    }

    #[test]
    fn profile_defaults_validate() {
        let mut form = ProfileFormInput::default();
        form.validate().expect("defaults valid");
        assert_eq!(form.phone, "18888888888");
        form.phone = "188-8888".to_owned();
        assert!(form.validate().is_err());
        form.phone.clear();
        form.nickname = "  ".to_owned();
        assert!(form.validate().is_err());
    }

    #[test]
    fn user_form_splits_roles_and_validates() {
        let users = seed_users();
        let mut form = UserFormInput::from_user(&users[0]);
        assert_eq!(form.roles, vec!["管理员".to_owned(), "测试1".to_owned()]);
        assert_eq!(form.gender, Gender::Male);
        form.validate().expect("seed user valid");

        form.toggle_role("管理员");
        assert_eq!(form.roles, vec!["测试1".to_owned()]);
        form.toggle_role("访客");
        assert_eq!(form.roles.len(), 2);

        form.roles.push("超级管理员".to_owned());
        assert!(form.validate().is_err());
    }

    #[test]
    fn role_and_menu_forms_need_names() {
        assert!(RoleFormInput::default().validate().is_err());
        RoleFormInput {
            name: "审计".to_owned(),
            code: "audit".to_owned(),
        }
        .validate()
        .expect("complete role valid");

        let mut menu = MenuFormInput {
            name: "日志".to_owned(),
            ..MenuFormInput::default()
        };
        menu.validate().expect("catalog needs no path");
        menu.kind = MenuKind::Menu;
        assert!(menu.validate().is_err());
        menu.path = "log".to_owned();
        menu.validate().expect("menu with path valid");
    }

    #[test]
    fn gender_round_trips_labels() {
        assert_eq!(Gender::parse(Gender::Female.label()), Some(Gender::Female));
        assert_eq!(Gender::Male.flip(), Gender::Female);
        assert_eq!(Gender::parse("?"), None);
    }
}
