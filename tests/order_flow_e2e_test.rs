// ==========================================
// 订单全流程端到端测试
// ==========================================
// 覆盖: 建单 → 生产 → 发货 → 完成; 汇总状态; 软删除; 订单头修改
// ==========================================


#[cfg(test)]
mod order_flow_e2e_test {
    use chrono::NaiveDate;
    use pipe_factory_oms::api::ApiError;
    use pipe_factory_oms::domain::ledger::{ProductionMeta, ShippingMeta};
    use pipe_factory_oms::domain::order::OrderHeaderPatch;
    use pipe_factory_oms::domain::types::{OrderStatus, ProcessTag, SubOrderStatus};

    use crate::test_helpers::{create_test_app, sample_order};

    #[test]
    fn test_single_sub_order_lifecycle() {
        let (_tmp, app) = create_test_app();

        let order_id = app
            .order_api
            .create_order(sample_order("ORD-1", &[("DN100", 100)]), "tester")
            .unwrap();

        let order = app.order_api.get_order(&order_id).unwrap();
        assert_eq!(order.order.status, OrderStatus::New);
        assert_eq!(order.sub_orders.len(), 1);
        let sub = &order.sub_orders[0];
        assert_eq!(sub.status, SubOrderStatus::New);
        assert_eq!(sub.produced_quantity, 0);

        let produced = app
            .ledger_api
            .append_production(&sub.id, 100, None, ProductionMeta::default(), "tester")
            .unwrap();
        assert!(!produced.record_id.is_empty());
        assert_eq!(produced.sub_order.status, SubOrderStatus::ProductionCompleted);
        assert_eq!(produced.sub_order.produced_quantity, 100);
        assert_eq!(produced.order_status, OrderStatus::ProductionCompleted);

        let shipped = app
            .ledger_api
            .append_shipping(&sub.id, 100, ShippingMeta::default(), "tester")
            .unwrap();
        assert_eq!(shipped.sub_order.status, SubOrderStatus::Completed);
        assert_eq!(shipped.sub_order.shipped_quantity, 100);
        assert_eq!(shipped.order_status, OrderStatus::Completed);

        let reloaded = app.order_api.get_order_by_no("ORD-1").unwrap();
        assert_eq!(reloaded.order.status, OrderStatus::Completed);
        assert_eq!(reloaded.sub_orders[0].shipped_quantity, 100);
    }

    #[test]
    fn test_five_plus_five_then_ship() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-2", &[("DN200", 10)]), "tester")
            .unwrap();
        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();

        let first = app
            .ledger_api
            .append_production(&sub_id, 5, Some(ProcessTag::Packaging), ProductionMeta::default(), "tester")
            .unwrap();
        assert_eq!(first.sub_order.status, SubOrderStatus::ProductionPartial);
        assert_eq!(first.order_status, OrderStatus::InProduction);

        let second = app
            .ledger_api
            .append_production(&sub_id, 5, None, ProductionMeta::default(), "tester")
            .unwrap();
        assert_eq!(second.sub_order.status, SubOrderStatus::ProductionCompleted);

        let shipped = app
            .ledger_api
            .append_shipping(&sub_id, 10, ShippingMeta::default(), "tester")
            .unwrap();
        assert_eq!(shipped.sub_order.status, SubOrderStatus::Completed);

        let records = app.ledger_api.list_production_records(&sub_id).unwrap();
        assert_eq!(records.iter().map(|r| r.quantity).sum::<i64>(), 10);
    }

    #[test]
    fn test_full_shipment_completes_even_if_production_short() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-3", &[("DN300", 10)]), "tester")
            .unwrap();
        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();

        app.ledger_api
            .append_production(&sub_id, 5, None, ProductionMeta::default(), "tester")
            .unwrap();
        let shipped = app
            .ledger_api
            .append_shipping(&sub_id, 10, ShippingMeta::default(), "tester")
            .unwrap();

        assert_eq!(shipped.sub_order.status, SubOrderStatus::Completed);
        // 发货超出库存只给警告
        assert!(!shipped.warnings.is_empty());
    }

    #[test]
    fn test_order_status_follows_least_advanced_child() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-4", &[("DN100", 10), ("DN200", 10)]), "tester")
            .unwrap();
        let subs = app.order_api.get_order(&order_id).unwrap().sub_orders;

        app.ledger_api
            .append_production(&subs[0].id, 10, None, ProductionMeta::default(), "tester")
            .unwrap();
        app.ledger_api
            .append_shipping(&subs[0].id, 10, ShippingMeta::default(), "tester")
            .unwrap();

        // 一个已完成,一个仍为 new
        let order = app.order_api.get_order(&order_id).unwrap();
        assert_eq!(order.order.status, OrderStatus::InProduction);

        app.ledger_api
            .append_production(&subs[1].id, 10, None, ProductionMeta::default(), "tester")
            .unwrap();
        let order = app.order_api.get_order(&order_id).unwrap();
        assert_eq!(order.order.status, OrderStatus::ProductionCompleted);

        app.ledger_api
            .append_shipping(&subs[1].id, 10, ShippingMeta::default(), "tester")
            .unwrap();
        let order = app.order_api.get_order(&order_id).unwrap();
        assert_eq!(order.order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_intermediate_process_tags_do_not_count_as_produced() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-5", &[("DN100", 10)]), "tester")
            .unwrap();
        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();

        for process in [ProcessTag::Pulling, ProcessTag::Hydrostatic, ProcessTag::Lining] {
            app.ledger_api
                .append_production(&sub_id, 10, Some(process), ProductionMeta::default(), "tester")
                .unwrap();
        }

        let sub = &app.order_api.get_order(&order_id).unwrap().sub_orders[0];
        assert_eq!(sub.pulling_quantity, 10);
        assert_eq!(sub.hydrostatic_quantity, 10);
        assert_eq!(sub.lining_quantity, 10);
        assert_eq!(sub.produced_quantity, 0);
        assert_eq!(sub.status, SubOrderStatus::New);
    }

    #[test]
    fn test_invalid_appends_rejected_without_state_change() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-6", &[("DN100", 10)]), "tester")
            .unwrap();
        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();

        for qty in [0, -3] {
            let err = app
                .ledger_api
                .append_shipping(&sub_id, qty, ShippingMeta::default(), "tester")
                .unwrap_err();
            assert!(matches!(err, ApiError::ValidationError(_)));
        }
        let err = app
            .ledger_api
            .append_production("no-such-sub", 1, None, ProductionMeta::default(), "tester")
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        assert!(app.ledger_api.list_shipping_records(&sub_id).unwrap().is_empty());
        let sub = &app.order_api.get_order(&order_id).unwrap().sub_orders[0];
        assert_eq!(sub.shipped_quantity, 0);
    }

    #[test]
    fn test_list_newest_first_and_soft_delete() {
        let (_tmp, app) = create_test_app();
        let first = app
            .order_api
            .create_order(sample_order("ORD-A", &[("DN100", 1)]), "tester")
            .unwrap();
        let second = app
            .order_api
            .create_order(sample_order("ORD-B", &[("DN100", 1)]), "tester")
            .unwrap();

        let listed = app.order_api.list_orders().unwrap();
        let ids: Vec<&str> = listed.iter().map(|o| o.order.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        app.order_api.soft_delete_order(&first, "tester").unwrap();
        let listed = app.order_api.list_orders().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(matches!(
            app.order_api.get_order(&first),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            app.order_api.soft_delete_order(&first, "tester"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_header_patch_and_duplicate_order_no() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-7", &[("DN100", 1)]), "tester")
            .unwrap();

        let updated = app
            .order_api
            .update_order_header(
                &order_id,
                OrderHeaderPatch {
                    customer_name: Some("乙公司".to_string()),
                    delivery_date: NaiveDate::from_ymd_opt(2026, 12, 1),
                    ..Default::default()
                },
                "tester",
            )
            .unwrap();
        assert_eq!(updated.order.customer_name, "乙公司");
        assert_eq!(updated.order.order_no, "ORD-7");
        assert_eq!(updated.order.workshop.as_deref(), Some("一车间"));

        let dup = app
            .order_api
            .create_order(sample_order("ORD-7", &[("DN100", 1)]), "tester");
        assert!(matches!(dup, Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_progress_report_and_overview() {
        let (_tmp, app) = create_test_app();
        let order_id = app
            .order_api
            .create_order(sample_order("ORD-8", &[("DN100", 10), ("DN200", 10)]), "tester")
            .unwrap();
        let subs = app.order_api.get_order(&order_id).unwrap().sub_orders;
        app.ledger_api
            .append_production(&subs[0].id, 15, None, ProductionMeta::default(), "tester")
            .unwrap();

        let view = app.report_api.order_progress(&order_id).unwrap();
        assert_eq!(view.total_planned, 20);
        assert_eq!(view.total_produced, 15);
        assert_eq!(view.produced_percent, 75.0);
        // 超产后百分比可超过 100
        assert_eq!(view.sub_orders[0].produced_percent, 150.0);

        let overview = app.report_api.order_status_overview().unwrap();
        assert_eq!(overview.get("in_production"), Some(&1));
    }
}
