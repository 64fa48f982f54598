// ==========================================
// 能力框架导入系统 - 命令行入口
// ==========================================
// 用法:
//   competency-import framework.csv --db ./competency.db --encoding auto --delimiter comma
//   competency-import framework.csv --match-headers --save-mapping default
//   competency-import framework.csv --mapping default --locale en
// ==========================================

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use competency_import::config::ConfigManager;
use competency_import::db::{init_schema, open_sqlite_connection};
use competency_import::i18n::{set_locale, t_with_args};
use competency_import::importer::{ImportSession, MappingData, UploadedContent};
use competency_import::repository::{CompetencyRepository, ScaleRepository};
use competency_import::{logging, Delimiter, ImportConfigReader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 从 CSV 表格导入能力框架
#[derive(Parser, Debug)]
#[command(name = "competency-import")]
#[command(version, about = "Import a competency framework from a CSV file")]
struct Args {
    /// 待导入的 CSV 文件
    file: PathBuf,

    /// SQLite 数据库路径
    #[arg(long, env = "COMPETENCY_IMPORT_DB_PATH")]
    db: Option<String>,

    /// 字符编码（encoding_rs 标签,auto = 自动识别）
    #[arg(long, default_value = "auto")]
    encoding: String,

    /// 分隔符: comma / semicolon / colon / tab
    #[arg(long, default_value = "comma")]
    delimiter: String,

    /// 界面语言: zh-CN / en
    #[arg(long, default_value = "zh-CN")]
    locale: String,

    /// 使用已保存的列映射
    #[arg(long, conflicts_with = "match_headers")]
    mapping: Option<String>,

    /// 按表头名匹配列（忽略大小写）
    #[arg(long)]
    match_headers: bool,

    /// 保存本次使用的列映射（未指定映射时保存位置默认映射）
    #[arg(long)]
    save_mapping: Option<String>,

    /// 导入前初始化默认配置（只写入缺失项）
    #[arg(long)]
    seed_config: bool,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    set_locale(&args.locale);
    logging::init(args.log_json);

    let db_path = args.db.clone().unwrap_or_else(get_default_db_path);
    info!(db_path = %db_path, version = competency_import::VERSION, "使用数据库");

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("数据库初始化失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = ConfigManager::from_connection(conn.clone())?;
    if args.seed_config {
        config_manager.seed_defaults()?;
    }
    let config = config_manager.load_import_config()?;

    let delimiter = Delimiter::from_name(&args.delimiter).ok_or_else(|| {
        anyhow!(t_with_args(
            "import.unknown_delimiter",
            &[("delimiter", &args.delimiter)]
        ))
    })?;
    let content = std::fs::read(&args.file)
        .with_context(|| format!("无法读取文件: {}", args.file.display()))?;

    let saved_mapping = match &args.mapping {
        Some(name) => Some(
            config_manager
                .load_mapping(name)?
                .ok_or_else(|| anyhow!("未找到已保存的列映射: {}", name))?,
        ),
        None => None,
    };

    let upload = UploadedContent {
        content: &content,
        encoding: &args.encoding,
        delimiter,
    };
    let mut session = ImportSession::from_content(upload, saved_mapping.as_ref(), config.clone());

    // 按表头名匹配: 先预览表头,再以同一导入 ID 重新解析
    let mut mapping = saved_mapping;
    if args.match_headers && !session.list_found_headers().is_empty() {
        let matched = MappingData::from_header_names(session.list_found_headers(), &config);
        session = ImportSession::from_import_id(session.import_id(), Some(&matched), config);
        mapping = Some(matched);
    }

    if let Some(error) = session.get_error() {
        let error = error.to_string();
        session.discard()?;
        bail!(error);
    }

    if let Some(name) = &args.save_mapping {
        config_manager.save_mapping(name, &mapping_to_save(mapping))?;
    }

    let competency_repo = CompetencyRepository::from_connection(conn.clone());
    let scale_repo = ScaleRepository::from_connection(conn);
    let summary = session.import(&competency_repo, &scale_repo)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// 本次导入实际使用的列映射（None = 位置默认映射）
fn mapping_to_save(selected: Option<MappingData>) -> MappingData {
    selected.unwrap_or_else(MappingData::positional)
}

/// 默认数据库路径: 用户数据目录下的 competency-import/competency_import.db
fn get_default_db_path() -> String {
    let mut path = PathBuf::from("./competency_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("competency-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("competency_import.db");
        }
    }
    path.to_string_lossy().to_string()
}
