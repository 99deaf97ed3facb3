// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库,支持中文（默认）和英文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::domain::types::{OrderStatus, PlanStatus, ProcessTag, SubOrderStatus};

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use pipe_factory_oms::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数,占位符形如 %{name}）
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

// ==========================================
// 状态/工序显示名
// ==========================================

pub fn sub_order_status_label(status: SubOrderStatus) -> String {
    t(&format!("sub_order_status.{}", status.as_str()))
}

pub fn order_status_label(status: OrderStatus) -> String {
    t(&format!("order_status.{}", status.as_str()))
}

pub fn process_label(process: ProcessTag) -> String {
    t(&format!("process.{}", process.as_str()))
}

pub fn plan_status_label(status: PlanStatus) -> String {
    t(&format!("plan_status.{}", status.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态,测试并行执行时需串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        let msg = t_with_args("import.file_not_found", &[("path", "/tmp/orders.csv")]);
        assert!(msg.contains("/tmp/orders.csv"));
        assert!(msg.contains("文件不存在"));

        set_locale("en");
        let msg = t_with_args("import.file_not_found", &[("path", "/tmp/orders.csv")]);
        assert!(msg.contains("File not found"));

        set_locale("zh-CN");
    }

    #[test]
    fn test_every_status_has_label() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(sub_order_status_label(SubOrderStatus::ProductionPartial), "部分生产");
        assert_eq!(order_status_label(OrderStatus::InProduction), "生产中");
        assert_eq!(process_label(ProcessTag::Hydrostatic), "水压");

        for status in SubOrderStatus::ALL {
            let label = sub_order_status_label(status);
            assert!(!label.starts_with("sub_order_status."), "缺少标签: {}", label);
        }

        set_locale("en");
        assert_eq!(plan_status_label(PlanStatus::Pending), "Pending");
        assert_eq!(order_status_label(OrderStatus::Completed), "Completed");
        set_locale("zh-CN");
    }
}
