//! Unit tests for the datasource reconciler

#[cfg(test)]
mod tests {
    use crate::document::{DatasourceConfig, GrafanaConfigObject, classify};
    use crate::telemetry::{Severity, Tags};
    use crate::test_utils::*;
    use grafana_client::{Datasource, MockCall, MockGrafanaClient, Operation};

    fn config(api_version: i64, ensure: &[&str], delete: &[&str]) -> DatasourceConfig {
        match classify(&datasource_yaml(api_version, ensure, delete)).unwrap() {
            GrafanaConfigObject::Datasources(config) => config,
            GrafanaConfigObject::Dashboard(_) => panic!("expected a datasource document"),
        }
    }

    fn existing(name: &str) -> Datasource {
        Datasource {
            name: name.to_string(),
            kind: "prometheus".to_string(),
            url: Some("http://old:9090".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creates_missing_datasources() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(
                &config(1, &["prom-a", "prom-b"], &[]),
                false,
                &Tags::new("test"),
            )
            .await;

        assert_eq!(mock.call_count(Operation::CreateDatasource), 2);
        assert_eq!(mock.datasource_count(), 2);
        assert_eq!(
            mock.datasource("prom-a").unwrap().url.as_deref(),
            Some("http://prom-a:9090")
        );
        let info = reporter.with_severity(Severity::Info);
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].tags.resource.as_deref(), Some("prom-a"));
        assert_eq!(info[0].tags.operation, "CreateDatasource");
    }

    #[tokio::test]
    async fn test_updates_existing_datasource_with_resolved_id() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let id = mock.add_datasource(existing("prom-a"));
        let (reconciler, _) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(&config(1, &["prom-a"], &[]), false, &Tags::new("test"))
            .await;

        let updates: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::UpdateDatasource { datasource } => Some(datasource),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, id);
        assert_eq!(updates[0].url.as_deref(), Some("http://prom-a:9090"));
        assert_eq!(mock.call_count(Operation::CreateDatasource), 0);
    }

    #[tokio::test]
    async fn test_second_pass_updates_without_changing_fields() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let (reconciler, _) = create_test_reconciler(&mock, default_labels());
        let document = config(1, &["prom-a"], &[]);

        reconciler
            .reconcile_datasources(&document, false, &Tags::new("test"))
            .await;
        let first = mock.datasource("prom-a").unwrap();

        reconciler
            .reconcile_datasources(&document, false, &Tags::new("test"))
            .await;
        let second = mock.datasource("prom-a").unwrap();

        assert_eq!(mock.call_count(Operation::CreateDatasource), 1);
        assert_eq!(mock.call_count(Operation::UpdateDatasource), 1);
        assert_eq!(first, second);
        assert_eq!(mock.datasource_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_list_runs_before_ensure_list() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let old_id = mock.add_datasource(existing("graphite"));
        let (reconciler, _) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(
                &config(1, &["prom-a"], &["graphite"]),
                false,
                &Tags::new("test"),
            )
            .await;

        let operations: Vec<_> = mock.calls().iter().map(MockCall::operation).collect();
        assert_eq!(
            operations,
            vec![
                Operation::GetDatasourceByName,
                Operation::DeleteDatasource,
                Operation::GetDatasourceByName,
                Operation::CreateDatasource,
            ]
        );
        assert!(mock.calls().contains(&MockCall::DeleteDatasource { id: old_id }));
        assert!(mock.datasource("graphite").is_none());
    }

    #[tokio::test]
    async fn test_delete_list_entry_not_found_is_noop() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(&config(1, &[], &["graphite"]), false, &Tags::new("test"))
            .await;

        assert_eq!(mock.call_count(Operation::GetDatasourceByName), 1);
        assert_eq!(mock.call_count(Operation::DeleteDatasource), 0);
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_config_map_deletes_existing_instead_of_updating() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        let id = mock.add_datasource(existing("prom-a"));
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(&config(1, &["prom-a", "prom-b"], &[]), true, &Tags::new("test"))
            .await;

        assert!(mock.calls().contains(&MockCall::DeleteDatasource { id }));
        assert_eq!(mock.call_count(Operation::UpdateDatasource), 0);
        // prom-b never existed: nothing to create, nothing to delete
        assert_eq!(mock.call_count(Operation::CreateDatasource), 0);
        assert_eq!(mock.datasource_count(), 0);

        let info = reporter.with_severity(Severity::Info);
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].tags.operation, "DeleteDatasource");
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_only_that_entry() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        mock.fail_on(Operation::GetDatasourceByName);
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(
                &config(1, &["prom-a", "prom-b"], &[]),
                false,
                &Tags::new("test"),
            )
            .await;

        assert_eq!(mock.call_count(Operation::GetDatasourceByName), 2);
        assert_eq!(mock.call_count(Operation::CreateDatasource), 0);
        let errors = reporter.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].tags.operation, "GetDatasourceByName");
        assert_eq!(errors[1].tags.resource.as_deref(), Some("prom-b"));
    }

    #[tokio::test]
    async fn test_create_failure_does_not_stop_siblings() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        mock.add_datasource(existing("prom-b"));
        mock.fail_on(Operation::CreateDatasource);
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(
                &config(1, &["prom-a", "prom-b"], &[]),
                false,
                &Tags::new("test"),
            )
            .await;

        assert_eq!(mock.call_count(Operation::CreateDatasource), 1);
        assert_eq!(mock.call_count(Operation::UpdateDatasource), 1);

        let errors = reporter.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].tags.operation, "CreateDatasource");
        assert_eq!(errors[0].tags.resource.as_deref(), Some("prom-a"));
    }

    #[tokio::test]
    async fn test_delete_failures_are_reported_per_datasource() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        for name in ["a", "b", "c"] {
            mock.add_datasource(existing(name));
        }
        mock.fail_on(Operation::DeleteDatasource);
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());
        let document = config(1, &["b", "c"], &["a"]);

        reconciler
            .reconcile_datasources(&document, true, &Tags::new("test"))
            .await;

        assert_eq!(mock.call_count(Operation::DeleteDatasource), 3);
        assert_eq!(mock.datasource_count(), 3);
        let errors = reporter.errors();
        let resources: Vec<_> = errors.iter().map(|e| e.tags.resource.as_deref()).collect();
        assert_eq!(resources, vec![Some("a"), Some("b"), Some("c")]);
        assert!(errors.iter().all(|e| e.tags.operation == "DeleteDatasource"));

        // Once Grafana recovers the same document removes everything
        mock.clear_failure(Operation::DeleteDatasource);
        mock.reset_calls();
        reconciler
            .reconcile_datasources(&document, true, &Tags::new("test"))
            .await;

        assert_eq!(mock.call_count(Operation::DeleteDatasource), 3);
        assert_eq!(mock.datasource_count(), 0);
        assert_eq!(reporter.errors().len(), 3);
    }

    #[tokio::test]
    async fn test_update_failure_does_not_stop_next_entry() {
        let mock = MockGrafanaClient::new("http://test-grafana");
        mock.add_datasource(existing("prom-a"));
        mock.fail_on(Operation::UpdateDatasource);
        let (reconciler, reporter) = create_test_reconciler(&mock, default_labels());

        reconciler
            .reconcile_datasources(
                &config(1, &["prom-a", "prom-b"], &[]),
                false,
                &Tags::new("test"),
            )
            .await;

        assert_eq!(mock.call_count(Operation::UpdateDatasource), 1);
        assert_eq!(mock.call_count(Operation::CreateDatasource), 1);
        assert_eq!(
            mock.datasource("prom-a").unwrap().url.as_deref(),
            Some("http://old:9090")
        );
        assert!(mock.datasource("prom-b").is_some());

        let errors = reporter.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].tags.operation, "UpdateDatasource");
        assert_eq!(errors[0].tags.resource.as_deref(), Some("prom-a"));
    }
}
