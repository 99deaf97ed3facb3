// ==========================================
// 管道工厂订单管理系统 - 基础资料 API
// ==========================================
// 职责: 按类别维护下拉选项（只增不删）
// 语义: 精确匹配、区分大小写、保持插入顺序、幂等
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::MasterDataCategory;
use crate::repository::master_data_repo::MasterDataRepository;

pub struct MasterDataApi {
    master_data_repo: Arc<MasterDataRepository>,
}

impl MasterDataApi {
    pub fn new(master_data_repo: Arc<MasterDataRepository>) -> Self {
        Self { master_data_repo }
    }

    /// 解析类别字符串,未知类别 → ValidationError
    pub fn parse_category(raw: &str) -> ApiResult<MasterDataCategory> {
        MasterDataCategory::parse(raw)
            .ok_or_else(|| ApiError::ValidationError(format!("未知的基础资料类别: {}", raw)))
    }

    /// 若不存在则追加
    ///
    /// # 返回
    /// - Ok(true): 新增
    /// - Ok(false): 已存在或值为空白（忽略）
    pub fn add_if_absent(&self, category: &str, value: &str) -> ApiResult<bool> {
        let category = Self::parse_category(category)?;
        // 仅判空时忽略首尾空白,入库值保持原样
        if value.trim().is_empty() {
            debug!(category = %category, "空白基础资料值已忽略");
            return Ok(false);
        }
        Ok(self.master_data_repo.add_if_absent(category, value)?)
    }

    /// 按类别列出（插入顺序）
    pub fn list(&self, category: &str) -> ApiResult<Vec<String>> {
        let category = Self::parse_category(category)?;
        let values = self
            .master_data_repo
            .list_by_category(category)?
            .into_iter()
            .map(|e| e.value)
            .collect();
        Ok(values)
    }

    /// 全部类别（包含空类别）
    pub fn list_all(&self) -> ApiResult<BTreeMap<String, Vec<String>>> {
        let mut all: BTreeMap<String, Vec<String>> = MasterDataCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), Vec::new()))
            .collect();

        for entry in self.master_data_repo.list_all()? {
            all.entry(entry.category.as_str().to_string())
                .or_default()
                .push(entry.value);
        }
        Ok(all)
    }
}
