// ==========================================
// 能力框架导入系统 - 行分类与记录构建
// ==========================================
// 职责: 原始行 + 列映射 → 框架记录 / 能力记录
// 红线: 纯内存操作,不做 I/O; 短行按空值处理,绝不越界
// ==========================================

use crate::domain::{CompetencyRecord, FrameworkRecord, ImportField};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::field_mapper::ColumnMapping;
use std::collections::HashMap;
use tracing::{debug, warn};

// ==========================================
// ParsedRow - 行分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Framework(FrameworkRecord),
    Competency(CompetencyRecord),
}

// ==========================================
// FlatRecordMap - idnumber → 能力记录
// ==========================================
// 保留首次出现的位置,后写覆盖内容
#[derive(Debug, Clone, Default)]
pub struct FlatRecordMap {
    records: Vec<CompetencyRecord>,
    index: HashMap<String, usize>,
    overwritten: usize,
}

impl FlatRecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入记录
    ///
    /// # 返回
    /// - true: 覆盖了同编号的旧记录
    pub fn insert(&mut self, record: CompetencyRecord) -> bool {
        match self.index.get(&record.idnumber) {
            Some(&pos) => {
                warn!(
                    idnumber = %record.idnumber,
                    previous_row = self.records[pos].row_number,
                    row = record.row_number,
                    "能力编号重复,后出现的行覆盖先前记录"
                );
                self.records[pos] = record;
                self.overwritten += 1;
                true
            }
            None => {
                self.index.insert(record.idnumber.clone(), self.records.len());
                self.records.push(record);
                false
            }
        }
    }

    pub fn get(&self, idnumber: &str) -> Option<&CompetencyRecord> {
        self.index.get(idnumber).map(|&pos| &self.records[pos])
    }

    /// 记录在表中的位置（即构建树时的下标）
    pub fn position(&self, idnumber: &str) -> Option<usize> {
        self.index.get(idnumber).copied()
    }

    pub fn contains(&self, idnumber: &str) -> bool {
        self.index.contains_key(idnumber)
    }

    /// 按首次出现顺序遍历
    pub fn records(&self) -> &[CompetencyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 被覆盖的重复编号次数
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}

// ==========================================
// RecordBuilder - 行分类器
// ==========================================
pub struct RecordBuilder {
    mapping: ColumnMapping,
    cleaner: DataCleaner,
}

impl RecordBuilder {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self {
            mapping,
            cleaner: DataCleaner,
        }
    }

    /// 分类并构建记录
    ///
    /// # 参数
    /// - row: 原始单元格（可能短于映射列数）
    /// - row_number: 源文件行号（表头为第 1 行）
    pub fn build(&self, row: &[String], row_number: usize) -> ParsedRow {
        let cell = |field: ImportField| self.mapping.cell(row, field);

        let idnumber = self.cleaner.clean_identifier(cell(ImportField::IdNumber));
        let shortname = self.cleaner.clean_identifier(cell(ImportField::ShortName));
        let description = self.cleaner.clean_raw(cell(ImportField::Description));
        let descriptionformat = self.cleaner.clean_int(cell(ImportField::DescriptionFormat));
        let scalevalues = cell(ImportField::ScaleValues).to_string();
        let scaleconfiguration = cell(ImportField::ScaleConfiguration).to_string();

        if self.cleaner.is_truthy(cell(ImportField::IsFramework)) {
            debug!(row = row_number, idnumber = %idnumber, "识别为框架行");
            return ParsedRow::Framework(FrameworkRecord {
                idnumber,
                shortname,
                description,
                descriptionformat,
                scalevalues,
                scaleconfiguration,
                taxonomies: cell(ImportField::Taxonomies).to_string(),
                row_number,
            });
        }

        ParsedRow::Competency(CompetencyRecord {
            // 父编号不清洗,按原文与 idnumber 比较
            parentidnumber: self.cleaner.clean_raw(cell(ImportField::ParentIdNumber)),
            idnumber,
            shortname,
            description,
            descriptionformat,
            ruletype: cell(ImportField::RuleType).to_string(),
            ruleoutcome: self.cleaner.clean_int(cell(ImportField::RuleOutcome)),
            ruleconfig: cell(ImportField::RuleConfig).to_string(),
            relatedidnumbers: cell(ImportField::RelatedIdNumbers).to_string(),
            exportid: cell(ImportField::ExportId).to_string(),
            scalevalues,
            scaleconfiguration,
            row_number,
        })
    }
}

// ==========================================
// ParsedImport - 整个文件的解析结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub framework: Option<FrameworkRecord>,
    pub records: FlatRecordMap,
    pub framework_rows: usize,
}

impl ParsedImport {
    /// 收纳一行（框架行后写覆盖,能力行进入扁平表）
    pub fn accept(&mut self, parsed: ParsedRow) {
        match parsed {
            ParsedRow::Framework(framework) => {
                if let Some(previous) = &self.framework {
                    warn!(
                        previous_row = previous.row_number,
                        row = framework.row_number,
                        "存在多个框架行,以最后一行为准"
                    );
                }
                self.framework_rows += 1;
                self.framework = Some(framework);
            }
            ParsedRow::Competency(record) => {
                self.records.insert(record);
            }
        }
    }
}
