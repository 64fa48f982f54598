// ==========================================
// 能力框架导入系统 - 导入会话
// ==========================================
// 流程: 载入 → 读取表头 → 逐行分类 → 构建树 (构造时完成)
//       → 创建框架/能力 → 规则迁移/关联建立 (import 时完成)
// 红线: 输入错误在持久化之前终止; 暂存内容在 import 的每条退出路径上释放
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{Delimiter, FrameworkRecord, ImportSummary};
use crate::i18n::{t, t_with_args};
use crate::importer::creation::CreationOrchestrator;
use crate::importer::csv_reader::{CsvImportReader, TabularReader};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{ColumnMapping, MappingData};
use crate::importer::linker::Linker;
use crate::importer::record_builder::{ParsedImport, RecordBuilder};
use crate::importer::rule_registry::RuleRegistry;
use crate::importer::scale_resolver::ScaleResolver;
use crate::importer::tree_builder::{FrameworkTree, TreeBuilder};
use crate::repository::{CompetencyApi, ScaleCatalog};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 上传内容（首次导入时提供）
#[derive(Debug, Clone, Copy)]
pub struct UploadedContent<'a> {
    pub content: &'a [u8],
    pub encoding: &'a str,
    pub delimiter: Delimiter,
}

// ==========================================
// ImportSession - 单次导入会话
// ==========================================
pub struct ImportSession<R: TabularReader = CsvImportReader> {
    reader: R,
    config: ImportConfig,
    mapping: ColumnMapping,
    registry: RuleRegistry,
    found_headers: Vec<String>,
    record_count: usize,
    tree: Option<FrameworkTree>,
    error: Option<String>,
}

impl ImportSession<CsvImportReader> {
    /// 从上传内容创建会话（生成新的导入 ID）
    ///
    /// # 参数
    /// - mapping: None = 位置默认映射
    pub fn from_content(
        upload: UploadedContent<'_>,
        mapping: Option<&MappingData>,
        config: ImportConfig,
    ) -> Self {
        let reader = CsvImportReader::new(CsvImportReader::new_import_id(), &config.storage_dir);
        Self::with_reader(reader, Some(upload), mapping, config)
    }

    /// 按已有导入 ID 重新打开会话（两阶段导入的第二阶段）
    pub fn from_import_id(
        import_id: &str,
        mapping: Option<&MappingData>,
        config: ImportConfig,
    ) -> Self {
        let reader = CsvImportReader::new(import_id, &config.storage_dir);
        Self::with_reader(reader, None, mapping, config)
    }
}

impl<R: TabularReader> ImportSession<R> {
    /// 使用指定读取器创建会话
    ///
    /// 载入/解析失败不会返回 Err,而是记录在会话上（见 get_error）
    pub fn with_reader(
        reader: R,
        upload: Option<UploadedContent<'_>>,
        mapping: Option<&MappingData>,
        config: ImportConfig,
    ) -> Self {
        let mapping = mapping
            .map(ColumnMapping::from_mapping_data)
            .unwrap_or_default();

        let mut session = Self {
            reader,
            config,
            mapping,
            registry: RuleRegistry::default(),
            found_headers: Vec::new(),
            record_count: 0,
            tree: None,
            error: None,
        };

        if let Err(err) = session.open(upload) {
            warn!(import_id = %session.reader.import_id(), error = %err, "导入文件无效");
            session.error = Some(describe_input_error(&err));
            if let Err(cleanup_err) = session.reader.cleanup() {
                warn!(error = %cleanup_err, "清理暂存内容失败");
            }
            return session;
        }

        if let Err(err) = session.parse() {
            warn!(import_id = %session.reader.import_id(), error = %err, "导入内容解析失败");
            session.error = Some(describe_input_error(&err));
        }
        session
    }

    /// 替换规则注册表
    pub fn with_rule_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn import_id(&self) -> &str {
        self.reader.import_id()
    }

    /// 输入错误（None = 可以导入）
    pub fn get_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 期望的 14 个表头名
    pub fn list_required_headers(&self) -> Vec<String> {
        self.config.header_names.clone()
    }

    /// 文件中实际的表头
    pub fn list_found_headers(&self) -> &[String] {
        &self.found_headers
    }

    pub fn framework(&self) -> Option<&FrameworkRecord> {
        self.tree.as_ref().map(|tree| &tree.framework)
    }

    pub fn tree(&self) -> Option<&FrameworkTree> {
        self.tree.as_ref()
    }

    /// 解析出的能力记录数（扁平表,去重后）
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// 执行导入
    ///
    /// 无论成功与否都会释放暂存内容; 每个会话只能导入一次
    #[instrument(skip(self, api, catalog), fields(import_id = %self.reader.import_id()))]
    pub fn import(
        &mut self,
        api: &dyn CompetencyApi,
        catalog: &dyn ScaleCatalog,
    ) -> ImportResult<ImportSummary> {
        let tree = self.tree.take();
        let result = self.run_import(tree.as_ref(), api, catalog);
        if let Err(err) = self.reader.cleanup() {
            warn!(error = %err, "清理暂存内容失败");
        }
        result
    }

    /// 放弃导入并释放暂存内容
    pub fn discard(&mut self) -> ImportResult<()> {
        self.reader.cleanup()
    }

    fn open(&mut self, upload: Option<UploadedContent<'_>>) -> ImportResult<()> {
        if let Some(upload) = upload {
            let rows = self
                .reader
                .load(upload.content, upload.encoding, upload.delimiter)?;
            debug!(rows = rows, "上传内容已载入");
        }
        self.reader.init()?;
        self.found_headers = self.reader.columns().to_vec();
        Ok(())
    }

    fn parse(&mut self) -> ImportResult<()> {
        let builder = RecordBuilder::new(self.mapping.clone());
        let mut parsed = ParsedImport::default();

        // 表头为第 1 行
        let mut row_number = 1;
        while let Some(row) = self.reader.next_row()? {
            row_number += 1;
            parsed.accept(builder.build(&row, row_number));
        }
        self.reader.close();

        self.record_count = parsed.records.len();
        let framework = parsed
            .framework
            .ok_or_else(|| ImportError::InvalidImportFile(t("import.missing_framework")))?;

        let tree = TreeBuilder::build(framework, &parsed.records)?;
        info!(
            records = self.record_count,
            members = tree.len(),
            orphans = tree.omitted.len(),
            duplicates = parsed.records.overwritten(),
            "导入内容解析完成"
        );
        self.tree = Some(tree);
        Ok(())
    }

    fn run_import(
        &self,
        tree: Option<&FrameworkTree>,
        api: &dyn CompetencyApi,
        catalog: &dyn ScaleCatalog,
    ) -> ImportResult<ImportSummary> {
        if let Some(reason) = &self.error {
            return Err(ImportError::InvalidImportFile(t_with_args(
                "import.already_failed",
                &[("reason", reason)],
            )));
        }
        let tree =
            tree.ok_or_else(|| ImportError::InvalidImportFile(t("import.already_imported")))?;

        let start_time = Instant::now();
        info!(competencies = tree.len(), "开始导入能力框架");

        let mut scales = ScaleResolver::new();
        let outcome = CreationOrchestrator::new(api, catalog, &self.config).run(tree, &mut scales)?;
        let stats = Linker::new(api, &self.registry).run(tree, &outcome)?;

        let summary = ImportSummary {
            import_id: self.reader.import_id().to_string(),
            competencies_created: outcome.created_count(),
            competencies_skipped: outcome.skipped,
            orphans_omitted: tree.omitted.len(),
            scales_created: scales.created(),
            scales_reused: scales.reused(),
            rules_migrated: stats.rules_migrated,
            rules_skipped: stats.rules_skipped,
            relations_linked: stats.relations_linked,
            relations_skipped: stats.relations_skipped,
            export_mappings: outcome.export_mapping.len(),
            framework: outcome.framework,
            elapsed: start_time.elapsed(),
        };

        info!(
            framework_id = summary.framework.id,
            created = summary.competencies_created,
            skipped = summary.competencies_skipped,
            scales_created = summary.scales_created,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "能力框架导入完成"
        );
        Ok(summary)
    }
}

/// 输入错误 → 面向用户的单条消息
fn describe_input_error(err: &ImportError) -> String {
    match err {
        ImportError::InvalidImportFile(message) => message.clone(),
        ImportError::CycleDetected { idnumber } => {
            t_with_args("import.cycle_detected", &[("idnumber", idnumber)])
        }
        other => t_with_args("import.invalid_file_reason", &[("reason", &other.to_string())]),
    }
}
