// ==========================================
// 管道工厂订单管理系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 单个文件允许的最大数据行数
    ///
    /// # 默认值
    /// - 5000
    async fn get_max_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 文件未给出车间时使用的默认车间
    ///
    /// # 返回
    /// - None: 未配置（保持为空）
    async fn get_default_workshop(&self) -> Result<Option<String>, Box<dyn Error>>;

    /// 导入时的操作人标识
    ///
    /// # 默认值
    /// - "importer"
    async fn get_import_actor(&self) -> Result<String, Box<dyn Error>>;
}
