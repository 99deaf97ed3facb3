// ==========================================
// 管道工厂订单管理系统 - 输入校验器
// ==========================================
// 职责: 写入前的入参校验,失败统一返回 ValidationError
// 红线: 校验不访问数据库,存在性检查交给仓储
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::{NewOrder, NewSubOrder, OrderHeaderPatch};
use crate::domain::plan::NewProductionPlan;

/// 输入校验器（无状态）
pub struct InputValidator;

impl InputValidator {
    /// 台账数量必须为正整数
    pub fn validate_quantity(quantity: i64) -> ApiResult<()> {
        if quantity <= 0 {
            return Err(ApiError::ValidationError(format!(
                "数量必须为正整数: {}",
                quantity
            )));
        }
        Ok(())
    }

    /// 校验新建订单
    ///
    /// # 规则
    /// - order_no / customer_name 非空
    /// - 至少一个子订单
    /// - 每个子订单 spec 非空,planned_quantity > 0,重量非负
    pub fn validate_new_order(order: &NewOrder) -> ApiResult<()> {
        if order.order_no.trim().is_empty() {
            return Err(ApiError::ValidationError("订单号不能为空".to_string()));
        }
        if order.customer_name.trim().is_empty() {
            return Err(ApiError::ValidationError("客户名称不能为空".to_string()));
        }
        if order.sub_orders.is_empty() {
            return Err(ApiError::ValidationError(format!(
                "订单{}至少需要一个子订单",
                order.order_no.trim()
            )));
        }

        for (idx, sub) in order.sub_orders.iter().enumerate() {
            Self::validate_new_sub_order(idx, sub)?;
        }
        Ok(())
    }

    fn validate_new_sub_order(idx: usize, sub: &NewSubOrder) -> ApiResult<()> {
        if sub.spec.trim().is_empty() {
            return Err(ApiError::ValidationError(format!(
                "第{}个子订单规格不能为空",
                idx + 1
            )));
        }
        if sub.planned_quantity <= 0 {
            return Err(ApiError::ValidationError(format!(
                "第{}个子订单计划数量必须大于0: {}",
                idx + 1,
                sub.planned_quantity
            )));
        }
        for (field, value) in [("unit_weight", sub.unit_weight), ("total_weight", sub.total_weight)] {
            if let Some(w) = value {
                if !w.is_finite() || w < 0.0 {
                    return Err(ApiError::ValidationError(format!(
                        "第{}个子订单{}无效: {}",
                        idx + 1,
                        field,
                        w
                    )));
                }
            }
        }
        Ok(())
    }

    /// 校验订单头修改
    pub fn validate_header_patch(patch: &OrderHeaderPatch) -> ApiResult<()> {
        if patch.is_empty() {
            return Err(ApiError::ValidationError("没有需要修改的字段".to_string()));
        }
        if let Some(name) = &patch.customer_name {
            if name.trim().is_empty() {
                return Err(ApiError::ValidationError("客户名称不能为空".to_string()));
            }
        }
        Ok(())
    }

    /// 校验派工计划
    pub fn validate_plan(plan: &NewProductionPlan) -> ApiResult<()> {
        if plan.order_id.trim().is_empty() {
            return Err(ApiError::ValidationError("派工计划缺少订单ID".to_string()));
        }
        if plan.workshop.trim().is_empty() {
            return Err(ApiError::ValidationError("派工计划缺少车间".to_string()));
        }
        Self::validate_quantity(plan.quantity)
    }
}

/// 去除首尾空白,空串视为 None
pub(crate) fn normalize_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with(sub_orders: Vec<NewSubOrder>) -> NewOrder {
        NewOrder {
            order_no: "ORD-1".to_string(),
            customer_name: "客户A".to_string(),
            sub_orders,
            ..Default::default()
        }
    }

    fn sub(spec: &str, planned: i64) -> NewSubOrder {
        NewSubOrder {
            spec: spec.to_string(),
            planned_quantity: planned,
            ..Default::default()
        }
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(InputValidator::validate_quantity(1).is_ok());
        assert!(matches!(
            InputValidator::validate_quantity(0),
            Err(ApiError::ValidationError(_))
        ));
        assert!(InputValidator::validate_quantity(-5).is_err());
    }

    #[test]
    fn test_new_order_rules() {
        assert!(InputValidator::validate_new_order(&order_with(vec![sub("DN100", 100)])).is_ok());
        assert!(InputValidator::validate_new_order(&order_with(vec![])).is_err());
        assert!(InputValidator::validate_new_order(&order_with(vec![sub(" ", 1)])).is_err());
        assert!(InputValidator::validate_new_order(&order_with(vec![sub("DN100", 0)])).is_err());

        let mut heavy = sub("DN100", 1);
        heavy.unit_weight = Some(f64::NAN);
        assert!(InputValidator::validate_new_order(&order_with(vec![heavy])).is_err());

        let mut blank_no = order_with(vec![sub("DN100", 1)]);
        blank_no.order_no = "  ".to_string();
        assert!(InputValidator::validate_new_order(&blank_no).is_err());
    }

    #[test]
    fn test_header_patch_rules() {
        assert!(InputValidator::validate_header_patch(&OrderHeaderPatch::default()).is_err());
        let patch = OrderHeaderPatch {
            customer_name: Some("".to_string()),
            ..Default::default()
        };
        assert!(InputValidator::validate_header_patch(&patch).is_err());
        let patch = OrderHeaderPatch {
            remarks: Some("加急".to_string()),
            ..Default::default()
        };
        assert!(InputValidator::validate_header_patch(&patch).is_ok());
    }

    #[test]
    fn test_normalize_opt() {
        assert_eq!(normalize_opt(&Some("  a ".to_string())), Some("a".to_string()));
        assert_eq!(normalize_opt(&Some("   ".to_string())), None);
        assert_eq!(normalize_opt(&None), None);
    }
}
