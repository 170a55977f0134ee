// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use anyhow::{Result, anyhow, bail};
use time::OffsetDateTime;

use crate::compare::ComparisonTable;
use crate::ids::{FileId, SheetId};

pub const CONTRACT_FILE_NAME: &str = "测试用例-清单-合同价.xlsx";
pub const AUDIT_FILE_NAME: &str = "测试用例-清单-送审价.xlsx";
const SHEETS_PER_FILE: u32 = 6;
const LISTS_PER_FILE: u32 = 1242;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Original,
    Audit,
}

impl FileRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Original => "合同价",
            Self::Audit => "送审价",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub uploaded_at: String,
    pub role: FileRole,
    pub sheet_count: u32,
    pub list_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetIdentification {
    pub id: SheetId,
    pub name: &'static str,
    pub is_list: bool,
    pub row_count: u32,
    pub matched_fields: &'static [&'static str],
    pub confidence: u8,
    pub header_fields: &'static [&'static str],
    pub preview: &'static [&'static [&'static str]],
}

const LIST_HEADERS: &[&str] = &[
    "序号",
    "项目编码",
    "项目名称",
    "项目特征",
    "计量单位",
    "工程量",
    "金额（元）",
    "备注",
];

pub fn seed_sheets() -> Vec<SheetIdentification> {
    vec![
        SheetIdentification {
            id: SheetId::new(1),
            name: "清单封面",
            is_list: false,
            row_count: 12,
            matched_fields: &["建设单位："],
            confidence: 5,
            header_fields: &["建设单位", "工程名称", "编制日期"],
            preview: &[&["建设单位：XXX公司", "", ""]],
        },
        SheetIdentification {
            id: SheetId::new(2),
            name: "单位工程费汇总表",
            is_list: false,
            row_count: 12,
            matched_fields: &["项目名称", "单位工程费汇总表"],
            confidence: 45,
            header_fields: &["序号", "项目名称", "金额(元)", "备注"],
            preview: &[
                &["1", "分部分项工程费", "1,200,300.00", ""],
                &["2", "措施项目费", "85,000.00", ""],
            ],
        },
        SheetIdentification {
            id: SheetId::new(3),
            name: "表10.2.2-16 分部分项工程清单与计价表【2标地下室",
            is_list: true,
            row_count: 49,
            matched_fields: &["项目编码", "项目特征", "计量单位", "工程量"],
            confidence: 60,
            header_fields: LIST_HEADERS,
            preview: &[
                &["", "", "0103 桩基工程", "", "", "", "", ""],
                &[
                    "1",
                    "010302001001",
                    "泥浆护壁成孔灌注桩",
                    "桩径Φ600 钢护筒埋设...",
                    "m",
                    "698",
                    "90",
                    "",
                ],
            ],
        },
        SheetIdentification {
            id: SheetId::new(4),
            name: "±0.00以上分部分项工程量清单",
            is_list: true,
            row_count: 82,
            matched_fields: &["编码", "综合单价", "项目特征", "计量单位"],
            confidence: 100,
            header_fields: LIST_HEADERS,
            preview: &[&[
                "1",
                "010302001001",
                "泥浆护壁成孔灌注桩",
                "桩径Φ600 钢护筒埋设...",
                "m",
                "698",
                "90",
                "",
            ]],
        },
    ]
}

pub const PAIRING_BASELINES: [&str; 2] = ["以送审价为基准", "以合同价为基准"];
pub const PAIRING_MATCH_MODES: [&str; 3] = ["按项目编码匹配", "按名称+特征匹配", "按序号匹配"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairingConfig {
    pub baseline: usize,
    pub match_mode: usize,
}

impl PairingConfig {
    pub fn cycle_baseline(&mut self) {
        self.baseline = (self.baseline + 1) % PAIRING_BASELINES.len();
    }

    pub fn cycle_match_mode(&mut self) {
        self.match_mode = (self.match_mode + 1) % PAIRING_MATCH_MODES.len();
    }

    pub fn baseline_label(self) -> &'static str {
        PAIRING_BASELINES[self.baseline % PAIRING_BASELINES.len()]
    }

    pub fn match_mode_label(self) -> &'static str {
        PAIRING_MATCH_MODES[self.match_mode % PAIRING_MATCH_MODES.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Pairing,
    Analyzing { token: u64 },
    Results,
    Detail(SheetId),
    Comparison,
}

/// Upload, pair, analyse, review, compare. The analysis step is a simulated
/// delay run elsewhere; it completes only if its token is still current.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareWorkflow {
    pub stage: Stage,
    pub files: Vec<UploadedFile>,
    pub sheets: Vec<SheetIdentification>,
    pub active_file: Option<FileId>,
    pub expanded_files: BTreeSet<FileId>,
    pub selected_sheets: BTreeSet<(FileId, u32)>,
    pub expanded_previews: BTreeSet<SheetId>,
    pub pairing: PairingConfig,
    pub table: ComparisonTable,
    analysis_token: u64,
    next_file_id: i64,
}

impl Default for CompareWorkflow {
    fn default() -> Self {
        Self {
            stage: Stage::Upload,
            files: Vec::new(),
            sheets: seed_sheets(),
            active_file: None,
            expanded_files: BTreeSet::new(),
            selected_sheets: BTreeSet::new(),
            expanded_previews: BTreeSet::new(),
            pairing: PairingConfig::default(),
            table: ComparisonTable::default(),
            analysis_token: 0,
            next_file_id: 1,
        }
    }
}

impl CompareWorkflow {
    /// Adds a mock file. The first upload is the contract file, every later
    /// one an audit file.
    pub fn upload(&mut self, at: OffsetDateTime) -> &UploadedFile {
        let role = if self.files.is_empty() {
            FileRole::Original
        } else {
            FileRole::Audit
        };
        let name = match role {
            FileRole::Original => CONTRACT_FILE_NAME,
            FileRole::Audit => AUDIT_FILE_NAME,
        };
        let id = FileId::new(self.next_file_id);
        self.next_file_id += 1;
        let index = self.files.len();
        self.files.push(UploadedFile {
            id,
            name: name.to_owned(),
            uploaded_at: format_upload_time(at),
            role,
            sheet_count: SHEETS_PER_FILE,
            list_count: LISTS_PER_FILE,
        });
        &self.files[index]
    }

    pub fn remove_file(&mut self, id: FileId) -> Result<UploadedFile> {
        let position = self
            .files
            .iter()
            .position(|file| file.id == id)
            .ok_or_else(|| anyhow!("file {id} is not in the upload list"))?;
        self.expanded_files.remove(&id);
        self.selected_sheets.retain(|(file_id, _)| *file_id != id);
        if self.active_file == Some(id) {
            self.active_file = None;
        }
        Ok(self.files.remove(position))
    }

    pub fn open_pairing(&mut self) -> Result<()> {
        if self.files.is_empty() {
            bail!("请先上传至少一个清单文件");
        }
        if self.is_analyzing() {
            bail!("分析进行中，请稍候");
        }
        self.stage = Stage::Pairing;
        Ok(())
    }

    pub fn close_pairing(&mut self) {
        if self.stage == Stage::Pairing {
            self.stage = Stage::Upload;
        }
    }

    /// Confirms the pairing and enters the analysis stage. The returned
    /// token must be handed back to [`CompareWorkflow::finish_analysis`].
    pub fn start_analysis(&mut self) -> Result<u64> {
        if self.files.is_empty() {
            bail!("请先上传至少一个清单文件");
        }
        self.analysis_token += 1;
        let token = self.analysis_token;
        self.selected_sheets = self
            .files
            .iter()
            .flat_map(|file| (1..=file.sheet_count).map(move |sheet| (file.id, sheet)))
            .collect();
        self.expanded_files = self.files.iter().map(|file| file.id).collect();
        self.stage = Stage::Analyzing { token };
        Ok(token)
    }

    /// Completes the analysis identified by `token`. Stale tokens are
    /// ignored and return `false`.
    pub fn finish_analysis(&mut self, token: u64) -> bool {
        if self.stage != (Stage::Analyzing { token }) {
            return false;
        }
        self.active_file = self.files.last().map(|file| file.id);
        self.stage = Stage::Results;
        true
    }

    pub fn cancel_analysis(&mut self) {
        self.analysis_token += 1;
        if self.is_analyzing() {
            self.stage = Stage::Upload;
        }
    }

    pub const fn is_analyzing(&self) -> bool {
        matches!(self.stage, Stage::Analyzing { .. })
    }

    pub fn back_to_upload(&mut self) {
        self.cancel_analysis();
        self.stage = Stage::Upload;
    }

    pub fn show_results(&mut self) {
        self.stage = Stage::Results;
    }

    pub fn view_file(&mut self, id: FileId) -> bool {
        if !self.files.iter().any(|file| file.id == id) {
            return false;
        }
        self.active_file = Some(id);
        self.stage = Stage::Results;
        true
    }

    pub fn active_file(&self) -> Option<&UploadedFile> {
        let id = self.active_file?;
        self.files.iter().find(|file| file.id == id)
    }

    pub fn open_sheet(&mut self, id: SheetId) -> bool {
        if self.sheet(id).is_none() {
            return false;
        }
        self.stage = Stage::Detail(id);
        true
    }

    pub fn open_comparison(&mut self) {
        self.stage = Stage::Comparison;
    }

    pub fn sheet(&self, id: SheetId) -> Option<&SheetIdentification> {
        self.sheets.iter().find(|sheet| sheet.id == id)
    }

    pub fn toggle_is_list(&mut self, id: SheetId) -> Option<bool> {
        let sheet = self.sheets.iter_mut().find(|sheet| sheet.id == id)?;
        sheet.is_list = !sheet.is_list;
        Some(sheet.is_list)
    }

    pub fn toggle_preview(&mut self, id: SheetId) -> bool {
        if self.expanded_previews.remove(&id) {
            false
        } else {
            self.expanded_previews.insert(id);
            true
        }
    }

    pub fn toggle_file_expanded(&mut self, id: FileId) -> bool {
        if self.expanded_files.remove(&id) {
            false
        } else {
            self.expanded_files.insert(id);
            true
        }
    }

    pub fn list_sheet_count(&self) -> usize {
        self.sheets.iter().filter(|sheet| sheet.is_list).count()
    }
}

fn format_upload_time(at: OffsetDateTime) -> String {
    format!(
        "{}/{}/{} {:02}:{:02}:{:02}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}
