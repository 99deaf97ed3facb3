// ==========================================
// Mock 导入配置 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use pipe_factory_oms::config::ImportConfigReader;
use std::error::Error;

/// Mock 导入配置
#[derive(Debug, Clone)]
pub struct MockImportConfig {
    pub max_rows: usize,
    pub default_workshop: Option<String>,
    pub actor: String,
}

impl Default for MockImportConfig {
    fn default() -> Self {
        Self {
            max_rows: 5000,
            default_workshop: None,
            actor: "mock-importer".to_string(),
        }
    }
}

impl MockImportConfig {
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImportConfigReader for MockImportConfig {
    async fn get_max_rows(&self) -> Result<usize, Box<dyn Error>> {
        Ok(self.max_rows)
    }

    async fn get_default_workshop(&self) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self.default_workshop.clone())
    }

    async fn get_import_actor(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.actor.clone())
    }
}
