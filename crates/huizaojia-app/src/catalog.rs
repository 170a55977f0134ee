// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKind {
    LayoutGrid,
    BrainCircuit,
    Ruler,
    Calculator,
    Settings,
    UserCog,
    FileText,
    Database,
    BarChart,
    Scroll,
    FileJson,
    ScanSearch,
    Layers,
    Divide,
    Function,
    Anvil,
    TrendingUp,
    Library,
    Sprout,
    FileDiff,
    Calendar,
    Building,
    Paintbrush,
    Grid,
    Trees,
    Navigation,
    Wrench,
    Help,
}

impl IconKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "LayoutGrid" => Self::LayoutGrid,
            "BrainCircuit" => Self::BrainCircuit,
            "Ruler" => Self::Ruler,
            "Calculator" => Self::Calculator,
            "Settings2" | "Settings" => Self::Settings,
            "UserCog" => Self::UserCog,
            "FileText" => Self::FileText,
            "Database" => Self::Database,
            "BarChart3" => Self::BarChart,
            "ScrollText" => Self::Scroll,
            "FileJson" => Self::FileJson,
            "ScanSearch" => Self::ScanSearch,
            "Layers" => Self::Layers,
            "Divide" => Self::Divide,
            "FunctionSquare" => Self::Function,
            "Anvil" => Self::Anvil,
            "TrendingUp" => Self::TrendingUp,
            "LibraryBig" => Self::Library,
            "Sprout" => Self::Sprout,
            "FileDiff" => Self::FileDiff,
            "CalendarDays" => Self::Calendar,
            "Building2" => Self::Building,
            "Paintbrush" => Self::Paintbrush,
            "Grid3X3" => Self::Grid,
            "Trees" => Self::Trees,
            "Navigation" => Self::Navigation,
            "Wrench" => Self::Wrench,
            _ => Self::Help,
        }
    }

    /// Single-column glyph drawn in place of the icon.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::LayoutGrid => "▦",
            Self::BrainCircuit => "◎",
            Self::Ruler => "⊢",
            Self::Calculator => "∑",
            Self::Settings => "⚙",
            Self::UserCog => "☺",
            Self::FileText => "≡",
            Self::Database => "⛁",
            Self::BarChart => "▮",
            Self::Scroll => "§",
            Self::FileJson => "¶",
            Self::ScanSearch => "⌕",
            Self::Layers => "☰",
            Self::Divide => "÷",
            Self::Function => "ƒ",
            Self::Anvil => "⚒",
            Self::TrendingUp => "↗",
            Self::Library => "▥",
            Self::Sprout => "♣",
            Self::FileDiff => "±",
            Self::Calendar => "▤",
            Self::Building => "▙",
            Self::Paintbrush => "✎",
            Self::Grid => "▩",
            Self::Trees => "♠",
            Self::Navigation => "➤",
            Self::Wrench => "✚",
            Self::Help => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Hot,
    Mine,
}

impl ToolCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hot => "热门工具",
            Self::Mine => "我的工具",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingType {
    Free,
    Paid,
}

impl PricingType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "免费",
            Self::Paid => "付费",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolItem {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: IconKind,
    pub category: ToolCategory,
    pub is_hot: bool,
    pub pricing: Option<PricingType>,
    pub activated: bool,
}

impl ToolItem {
    const fn hot(id: &'static str, name: &'static str, icon: IconKind) -> Self {
        Self {
            id,
            name,
            icon,
            category: ToolCategory::Hot,
            is_hot: true,
            pricing: None,
            activated: true,
        }
    }

    const fn mine(id: &'static str, name: &'static str, icon: IconKind) -> Self {
        Self {
            id,
            name,
            icon,
            category: ToolCategory::Mine,
            is_hot: false,
            pricing: Some(PricingType::Free),
            activated: true,
        }
    }

    const fn paid(self) -> Self {
        Self {
            pricing: Some(PricingType::Paid),
            activated: false,
            ..self
        }
    }
}

pub const HOT_TOOLS: [ToolItem; 7] = [
    ToolItem::hot("h1", "2024清单", IconKind::FileText),
    ToolItem::hot("h2", "定额", IconKind::Database),
    ToolItem::hot("h3", "指标数据", IconKind::BarChart),
    ToolItem::hot("h4", "zc文件", IconKind::Scroll),
    ToolItem::hot("h5", "AI文本统计", IconKind::FileJson),
    ToolItem::hot("h6", "AI识图算量", IconKind::ScanSearch).paid(),
    ToolItem::hot("h7", "AI批量提取CAD表", IconKind::Layers).paid(),
];

pub const MY_TOOLS: [ToolItem; 7] = [
    ToolItem::mine("m1", "工程量计算器", IconKind::Divide),
    ToolItem::mine("m2", "公式大全", IconKind::Function),
    ToolItem::mine("m3", "五金计算器", IconKind::Anvil),
    ToolItem::mine("m4", "材料调差", IconKind::TrendingUp),
    ToolItem::mine("m5", "前后期收费标准库", IconKind::Library),
    ToolItem::mine("m6", "AI苗木表编清单", IconKind::Sprout),
    ToolItem::mine("m7", "ok合同价对比", IconKind::FileDiff),
];

pub fn all_tools() -> impl Iterator<Item = &'static ToolItem> {
    HOT_TOOLS.iter().chain(MY_TOOLS.iter())
}

pub fn find_tool(id: &str) -> Option<&'static ToolItem> {
    all_tools().find(|tool| tool.id == id)
}

/// Tools whose name contains `query`; an empty query keeps everything.
pub fn search_tools(query: &str) -> Vec<&'static ToolItem> {
    let query = query.trim().to_lowercase();
    all_tools()
        .filter(|tool| query.is_empty() || tool.name.to_lowercase().contains(&query))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    Navigate {
        id: &'static str,
        sub_id: &'static str,
    },
    Launch(&'static str),
}

pub fn tool_action(tool: &ToolItem) -> ToolAction {
    match tool.id {
        "h6" => ToolAction::Navigate {
            id: "quantity",
            sub_id: "ai-vision",
        },
        "m7" => ToolAction::Navigate {
            id: "pricing",
            sub_id: "ok-contract",
        },
        _ => ToolAction::Launch(tool.name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMenuItem {
    pub id: &'static str,
    pub label: &'static str,
    pub parent_id: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: IconKind,
    pub children: &'static [SubMenuItem],
}

impl MenuItem {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

macro_rules! sub {
    ($parent:literal, $id:literal, $label:literal) => {
        SubMenuItem {
            id: $id,
            label: $label,
            parent_id: $parent,
        }
    };
}

pub const NAVIGATION_MENU: [MenuItem; 6] = [
    MenuItem {
        id: "home",
        label: "汇造价",
        icon: IconKind::LayoutGrid,
        children: &[],
    },
    MenuItem {
        id: "ai-qa",
        label: "AI问答",
        icon: IconKind::BrainCircuit,
        children: &[
            sub!("ai-qa", "qa-2024-list", "2024清单"),
            sub!("ai-qa", "qa-quota", "定额"),
            sub!("ai-qa", "qa-indicators", "指标数据"),
            sub!("ai-qa", "qa-policy", "政策文件"),
        ],
    },
    MenuItem {
        id: "quantity",
        label: "汇计量",
        icon: IconKind::Ruler,
        children: &[
            sub!("quantity", "ai-vision", "AI识图算量"),
            sub!("quantity", "ai-cad", "AI批量提取CAD表"),
            sub!("quantity", "list-compare", "清单工程量对比"),
            sub!("quantity", "calc-tool", "工程量计算器"),
            sub!("quantity", "formula", "公式大全"),
            sub!("quantity", "hardware-calc", "五金计算器"),
        ],
    },
    MenuItem {
        id: "pricing",
        label: "汇计价",
        icon: IconKind::Calculator,
        children: &[
            sub!("pricing", "material-diff", "材料调差"),
            sub!("pricing", "fee-standards", "前后期收费标准库"),
            sub!("pricing", "ai-plant-list", "AI苗木表编清单"),
            sub!("pricing", "ok-contract", "ok合同价对比"),
            sub!("pricing", "price-file-compare", "计价文件对比"),
        ],
    },
    MenuItem {
        id: "general",
        label: "汇通用",
        icon: IconKind::Settings,
        children: &[
            sub!("general", "ok-date-calc", "ok日期计算器"),
            sub!("general", "duration-quota", "工期定额"),
            sub!("general", "fee-calc", "收费计算器"),
            sub!("general", "excel-tools", "表格处理功能"),
            sub!("general", "ok-dwg-compare", "okAI图纸对比"),
            sub!("general", "amount-converter", "金额大小写转换"),
            sub!("general", "ok-tax-calc", "OK税费计算"),
            sub!("general", "simple-calc", "计算器"),
            sub!("general", "general-data", "通用数据"),
            sub!("general", "camera-watermark", "工程水印相机"),
        ],
    },
    MenuItem {
        id: "settings",
        label: "系统设置",
        icon: IconKind::UserCog,
        children: &[
            sub!("settings", "survey", "问卷功能"),
            sub!("settings", "register", "用户注册"),
            sub!("settings", "profile", "个人中心"),
            sub!("settings", "user-admin", "用户管理"),
            sub!("settings", "role-admin", "角色管理"),
            sub!("settings", "menu-admin", "菜单管理"),
            sub!("settings", "payment", "支付管理"),
            sub!("settings", "points", "积分管理"),
            sub!("settings", "legal", "法律条款"),
            sub!("settings", "customer-service", "客户服务"),
        ],
    },
];

pub fn find_menu(id: &str) -> Option<&'static MenuItem> {
    NAVIGATION_MENU.iter().find(|item| item.id == id)
}

pub fn find_sub_menu(sub_id: &str) -> Option<&'static SubMenuItem> {
    NAVIGATION_MENU
        .iter()
        .flat_map(|item| item.children.iter())
        .find(|sub| sub.id == sub_id)
}

pub const DEFAULT_CHAT_CATEGORY: &str = "造价咨询";

pub fn chat_category_label(sub_id: &str) -> &'static str {
    match sub_id {
        "qa-2024-list" => "2024清单咨询",
        "qa-quota" => "定额解释",
        "qa-indicators" => "指标数据",
        "qa-policy" => "政策文件",
        _ => DEFAULT_CHAT_CATEGORY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionTool {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: IconKind,
}

pub const VISION_TOOLS: [VisionTool; 6] = [
    VisionTool {
        id: "civil",
        name: "土建识图",
        description: "智能识别基础、柱、梁、板、墙等主体结构工程量",
        icon: IconKind::Building,
    },
    VisionTool {
        id: "interior",
        name: "精装修识图",
        description: "快速提取房间面积、天棚、墙面、地面铺装数据",
        icon: IconKind::Paintbrush,
    },
    VisionTool {
        id: "facade",
        name: "门窗幕墙栏杆",
        description: "专项识别各类门窗、幕墙构件及栏杆扶手长度数量",
        icon: IconKind::Grid,
    },
    VisionTool {
        id: "landscape",
        name: "景观识图",
        description: "针对园林绿化、铺装、景观构筑物的专项算量模型",
        icon: IconKind::Trees,
    },
    VisionTool {
        id: "municipal",
        name: "市政识图",
        description: "道路、管网、桥梁等市政基础设施的自动化算量",
        icon: IconKind::Navigation,
    },
    VisionTool {
        id: "installation",
        name: "安装识图",
        description: "强弱电、给排水、暖通空调及工艺管路综合识别",
        icon: IconKind::Wrench,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomTakeoff {
    pub id: i64,
    pub name: &'static str,
    pub floor_area: f64,
    pub wall_area: f64,
    pub ceiling_area: f64,
    pub perimeter: f64,
}

pub const MOCK_ROOMS: [RoomTakeoff; 6] = [
    RoomTakeoff {
        id: 1,
        name: "客厅",
        floor_area: 32.5,
        wall_area: 58.2,
        ceiling_area: 32.5,
        perimeter: 22.4,
    },
    RoomTakeoff {
        id: 2,
        name: "主卧",
        floor_area: 18.2,
        wall_area: 42.6,
        ceiling_area: 18.2,
        perimeter: 17.2,
    },
    RoomTakeoff {
        id: 3,
        name: "次卧",
        floor_area: 14.5,
        wall_area: 38.4,
        ceiling_area: 14.5,
        perimeter: 15.4,
    },
    RoomTakeoff {
        id: 4,
        name: "厨房",
        floor_area: 8.4,
        wall_area: 26.8,
        ceiling_area: 8.4,
        perimeter: 11.6,
    },
    RoomTakeoff {
        id: 5,
        name: "卫生间",
        floor_area: 6.2,
        wall_area: 22.4,
        ceiling_area: 6.2,
        perimeter: 10.0,
    },
    RoomTakeoff {
        id: 6,
        name: "玄关",
        floor_area: 4.8,
        wall_area: 18.5,
        ceiling_area: 4.8,
        perimeter: 8.8,
    },
];

/// Column sums over the mock takeoff, reported under the room table.
pub fn room_totals(rooms: &[RoomTakeoff]) -> RoomTakeoff {
    rooms.iter().fold(
        RoomTakeoff {
            id: 0,
            name: "合计",
            floor_area: 0.0,
            wall_area: 0.0,
            ceiling_area: 0.0,
            perimeter: 0.0,
        },
        |acc, room| RoomTakeoff {
            floor_area: acc.floor_area + room.floor_area,
            wall_area: acc.wall_area + room.wall_area,
            ceiling_area: acc.ceiling_area + room.ceiling_area,
            perimeter: acc.perimeter + room.perimeter,
            ..acc
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{
        IconKind, MOCK_ROOMS, NAVIGATION_MENU, ToolAction, chat_category_label, find_sub_menu,
        find_tool, room_totals, search_tools, tool_action,
    };

    #[test]
    fn unknown_icon_names_fall_back_to_help() {
        assert_eq!(IconKind::from_name("LayoutGrid"), IconKind::LayoutGrid);
        assert_eq!(IconKind::from_name("#"), IconKind::Help);
        assert_eq!(IconKind::Help.glyph(), "?");
    }

    #[test]
    fn sub_menu_parents_match_their_section() {
        for item in &NAVIGATION_MENU {
            for sub in item.children {
                assert_eq!(sub.parent_id, item.id, "sub menu {}", sub.id);
            }
        }
        assert_eq!(
            find_sub_menu("ok-tax-calc").map(|sub| sub.parent_id),
            Some("general")
        );
    }

    #[test]
    fn vision_and_contract_tools_navigate_others_launch() {
        let vision = find_tool("h6").expect("h6 tool");
        assert_eq!(
            tool_action(vision),
            ToolAction::Navigate {
                id: "quantity",
                sub_id: "ai-vision"
            }
        );

        let contract = find_tool("m7").expect("m7 tool");
        assert_eq!(
            tool_action(contract),
            ToolAction::Navigate {
                id: "pricing",
                sub_id: "ok-contract"
            }
        );

        let quota = find_tool("h2").expect("h2 tool");
        assert_eq!(tool_action(quota), ToolAction::Launch("定额"));
    }

    #[test]
    fn search_matches_substrings_and_empty_query_keeps_all() {
        assert_eq!(search_tools("").len(), 14);
        let hits = search_tools("计算器");
        let names = hits.iter().map(|tool| tool.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["工程量计算器", "五金计算器"]);
        assert_eq!(search_tools("cad").len(), 1);
    }

    #[test]
    fn chat_categories_default_for_unknown_sub_ids() {
        assert_eq!(chat_category_label("qa-quota"), "定额解释");
        assert_eq!(chat_category_label("nope"), "造价咨询");
    }

    #[test]
    fn room_totals_sum_every_column() {
        let totals = room_totals(&MOCK_ROOMS);
        assert!((totals.floor_area - 84.6).abs() < 1e-9);
        assert!((totals.perimeter - 85.4).abs() < 1e-9);
        assert_eq!(totals.name, "合计");
    }
}
