// ==========================================
// 配置管理集成测试
// ==========================================
// 职责: 默认值、写入覆盖、配置对台账/订单行为的影响
// ==========================================


#[cfg(test)]
mod config_test {
    use pipe_factory_oms::api::ApiError;
    use pipe_factory_oms::config::{config_keys, ConfigManager, ImportConfigReader};
    use pipe_factory_oms::domain::ledger::{ProductionMeta, ShippingMeta};
    use pipe_factory_oms::domain::types::ProcessTag;

    use crate::test_helpers::{create_test_app, create_test_db, sample_order};

    #[tokio::test]
    async fn test_defaults_on_fresh_database() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let config = ConfigManager::new(&db_path).unwrap();

        assert!(!config.get_enforce_quantity_cap().unwrap());
        assert_eq!(config.get_default_process().unwrap(), ProcessTag::Packaging);
        assert_eq!(config.get_order_list_limit().unwrap(), 500);
        assert_eq!(config.get_max_rows().await.unwrap(), 5000);
        assert_eq!(config.get_default_workshop().await.unwrap(), None);
        assert_eq!(config.get_config_snapshot().unwrap(), "{}");
    }

    #[test]
    fn test_snapshot_reflects_writes() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_global_config_value(config_keys::ORDER_LIST_LIMIT, "2")
            .unwrap();
        config
            .set_global_config_value(config_keys::ORDER_LIST_LIMIT, "3")
            .unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot[config_keys::ORDER_LIST_LIMIT], "3");
        assert!(config.set_global_config_value("  ", "x").is_err());
    }

    #[test]
    fn test_enforced_cap_rejects_over_production() {
        let (_tmp, app) = create_test_app();
        app.config_manager
            .set_global_config_value(config_keys::LEDGER_ENFORCE_QUANTITY_CAP, "true")
            .unwrap();

        let order_id = app
            .order_api
            .create_order(sample_order("ORD-CAP", &[("DN100", 10)]), "tester")
            .unwrap();
        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();

        app.ledger_api
            .append_production(&sub_id, 8, None, ProductionMeta::default(), "tester")
            .unwrap();
        let err = app
            .ledger_api
            .append_production(&sub_id, 3, None, ProductionMeta::default(), "tester")
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::CapacityExceeded {
                planned: 10,
                resulting: 11,
                ..
            }
        ));

        let err = app
            .ledger_api
            .append_shipping(&sub_id, 11, ShippingMeta::default(), "tester")
            .unwrap_err();
        assert!(matches!(err, ApiError::CapacityExceeded { .. }));

        // 被拒绝的追加不落任何记录
        assert_eq!(app.ledger_api.list_production_records(&sub_id).unwrap().len(), 1);
        assert!(app.ledger_api.list_shipping_records(&sub_id).unwrap().is_empty());
        let sub = &app.order_api.get_order(&order_id).unwrap().sub_orders[0];
        assert_eq!(sub.produced_quantity, 8);
    }

    #[test]
    fn test_default_process_and_list_limit() {
        let (_tmp, app) = create_test_app();
        app.config_manager
            .set_global_config_value(config_keys::LEDGER_DEFAULT_PROCESS, "lining")
            .unwrap();
        app.config_manager
            .set_global_config_value(config_keys::ORDER_LIST_LIMIT, "1")
            .unwrap();

        let order_id = app
            .order_api
            .create_order(sample_order("ORD-L1", &[("DN100", 10)]), "tester")
            .unwrap();
        app.order_api
            .create_order(sample_order("ORD-L2", &[("DN100", 10)]), "tester")
            .unwrap();
        assert_eq!(app.order_api.list_orders().unwrap().len(), 1);

        let sub_id = app.order_api.get_order(&order_id).unwrap().sub_orders[0]
            .id
            .clone();
        let result = app
            .ledger_api
            .append_production(&sub_id, 4, None, ProductionMeta::default(), "tester")
            .unwrap();
        assert_eq!(result.sub_order.lining_quantity, 4);
        assert_eq!(result.sub_order.produced_quantity, 0);
    }
}
