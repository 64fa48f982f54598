// ==========================================
// 能力框架导入系统 - 评分标准解析器
// ==========================================
// 职责: 按取值序列去重评分标准（命中复用,未命中新建）
//       并把评分标准配置中的 scaleid 改写为解析结果
// 注意: 目录读取与新建不是原子操作,并发导入可能产生重复评分标准
// ==========================================

use crate::domain::NewScale;
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::ScaleCatalog;
use serde_json::Value;
use tracing::{debug, info};

/// 解析后的评分标准（ID + 改写后的配置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScale {
    pub scale_id: i64,
    pub configuration: String,
}

/// 取值字符串 → 标签序列（逗号分隔,去空白,丢弃空标签）
pub fn parse_scale_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

// ==========================================
// ScaleResolver - 会话级评分标准缓存
// ==========================================
#[derive(Debug, Default)]
pub struct ScaleResolver {
    /// 首次使用时从目录加载: (标签序列, 评分标准 ID)
    known: Option<Vec<(Vec<String>, i64)>>,
    created: usize,
    reused: usize,
}

impl ScaleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新建的评分标准数
    pub fn created(&self) -> usize {
        self.created
    }

    /// 复用已有评分标准的次数
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// 按取值序列解析评分标准 ID
    ///
    /// # 参数
    /// - raw_values: 原始取值字符串
    /// - display_name: 未命中时用于命名新评分标准
    /// - user_id: 新评分标准的所有者
    ///
    /// # 返回
    /// - Ok(None): 取值为空,无需评分标准
    pub fn resolve_id(
        &mut self,
        catalog: &dyn ScaleCatalog,
        raw_values: &str,
        display_name: &str,
        user_id: i64,
    ) -> ImportResult<Option<i64>> {
        let values = parse_scale_values(raw_values);
        if values.is_empty() {
            return Ok(None);
        }

        if self.known.is_none() {
            let scales = catalog.fetch_all_scales()?;
            debug!(count = scales.len(), "已加载评分标准目录");
            self.known = Some(scales.into_iter().map(|s| (s.values, s.id)).collect());
        }
        let known = self.known.get_or_insert_with(Vec::new);

        if let Some((_, id)) = known.iter().find(|(existing, _)| *existing == values) {
            self.reused += 1;
            return Ok(Some(*id));
        }

        let handle = catalog.create_scale(&NewScale {
            name: t_with_args("scale.name", &[("name", display_name)]),
            user_id,
            values: values.clone(),
            description: t("scale.description"),
        })?;
        info!(scale_id = handle.id, labels = values.len(), "已新建评分标准");

        known.push((values, handle.id));
        self.created += 1;
        Ok(Some(handle.id))
    }

    /// 解析评分标准并改写配置
    ///
    /// # 返回
    /// - Ok(None): 取值为空
    /// - Err(ScaleConfiguration): 取值非空但配置无效
    pub fn resolve(
        &mut self,
        catalog: &dyn ScaleCatalog,
        raw_values: &str,
        raw_configuration: &str,
        display_name: &str,
        user_id: i64,
    ) -> ImportResult<Option<ResolvedScale>> {
        match self.resolve_id(catalog, raw_values, display_name, user_id)? {
            Some(scale_id) => Ok(Some(ResolvedScale {
                scale_id,
                configuration: rewrite_configuration(raw_configuration, scale_id)?,
            })),
            None => Ok(None),
        }
    }
}

/// 改写评分标准配置: 第一个元素的 scaleid ← 解析结果
///
/// 配置形如 `[{"scaleid":"3"},{"id":1,"scaledefault":1,"proficient":1}]`
pub fn rewrite_configuration(raw: &str, scale_id: i64) -> ImportResult<String> {
    let mut config: Value = serde_json::from_str(raw)
        .map_err(|e| ImportError::ScaleConfiguration(format!("{} ({})", raw, e)))?;

    let first = config
        .as_array_mut()
        .and_then(|items| items.first_mut())
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            ImportError::ScaleConfiguration(format!("首元素必须为对象: {}", raw))
        })?;
    first.insert("scaleid".to_string(), Value::String(scale_id.to_string()));

    serde_json::to_string(&config).map_err(|e| ImportError::ScaleConfiguration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScaleHandle;
    use crate::repository::RepositoryResult;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeCatalog {
        scales: RefCell<Vec<ScaleHandle>>,
        fetches: RefCell<usize>,
        creates: RefCell<usize>,
    }

    impl ScaleCatalog for FakeCatalog {
        fn fetch_all_scales(&self) -> RepositoryResult<Vec<ScaleHandle>> {
            *self.fetches.borrow_mut() += 1;
            Ok(self.scales.borrow().clone())
        }

        fn create_scale(&self, scale: &NewScale) -> RepositoryResult<ScaleHandle> {
            *self.creates.borrow_mut() += 1;
            let handle = ScaleHandle {
                id: 100 + self.scales.borrow().len() as i64,
                name: scale.name.clone(),
                values: scale.values.clone(),
            };
            self.scales.borrow_mut().push(handle.clone());
            Ok(handle)
        }
    }

    #[test]
    fn test_parse_scale_values() {
        assert_eq!(parse_scale_values(" A , B,,C "), vec!["A", "B", "C"]);
        assert!(parse_scale_values(" , ").is_empty());
    }

    #[test]
    fn test_same_values_created_once() {
        let catalog = FakeCatalog::default();
        let mut resolver = ScaleResolver::new();
        let first = resolver.resolve_id(&catalog, "A,B", "One", 2).unwrap();
        let second = resolver.resolve_id(&catalog, "A, B", "Two", 2).unwrap();

        assert_eq!(first, second);
        assert_eq!(*catalog.creates.borrow(), 1);
        assert_eq!(*catalog.fetches.borrow(), 1);
        assert_eq!(resolver.created(), 1);
        assert_eq!(resolver.reused(), 1);
    }

    #[test]
    fn test_existing_scale_reused_in_order() {
        let catalog = FakeCatalog::default();
        catalog.scales.borrow_mut().push(ScaleHandle {
            id: 7,
            name: "Existing".to_string(),
            values: vec!["B".to_string(), "A".to_string()],
        });
        let mut resolver = ScaleResolver::new();

        assert_eq!(resolver.resolve_id(&catalog, "B,A", "x", 2).unwrap(), Some(7));
        // 顺序不同视为不同评分标准
        assert_ne!(resolver.resolve_id(&catalog, "A,B", "x", 2).unwrap(), Some(7));
    }

    #[test]
    fn test_empty_values_need_no_scale() {
        let catalog = FakeCatalog::default();
        let mut resolver = ScaleResolver::new();
        assert_eq!(resolver.resolve(&catalog, "", "not json", "x", 2).unwrap(), None);
        assert_eq!(*catalog.fetches.borrow(), 0);
    }

    #[test]
    fn test_rewrite_configuration() {
        let raw = r#"[{"scaleid":"3"},{"id":1,"scaledefault":1,"proficient":1}]"#;
        let rewritten = rewrite_configuration(raw, 42).unwrap();
        let value: Value = serde_json::from_str(&rewritten).unwrap();
        assert_eq!(value[0]["scaleid"], "42");
        assert_eq!(value[1]["proficient"], 1);
    }

    #[test]
    fn test_rewrite_configuration_rejects_bad_shape() {
        assert!(matches!(
            rewrite_configuration("not json", 1),
            Err(ImportError::ScaleConfiguration(_))
        ));
        assert!(matches!(
            rewrite_configuration("[]", 1),
            Err(ImportError::ScaleConfiguration(_))
        ));
        assert!(matches!(
            rewrite_configuration("{\"scaleid\":1}", 1),
            Err(ImportError::ScaleConfiguration(_))
        ));
    }
}
