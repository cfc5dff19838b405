//! Progress Engine Tests
//!
//! End-to-end flows through the dashboard against the in-memory backend:
//! loading a day, recording impulses, focus selection and failure notices.

#[cfg(test)]
mod progress_engine_tests {
    use anyhow::Result;
    use nodes_core::db::{BackendCall, MemoryBackend};
    use nodes_core::models::{
        DailyProgress, DayKey, FixedClock, NewNode, Node, NodeDraft, NodeType,
    };
    use nodes_core::services::{ImpulseLedger, NoticeLevel, RecordingNotifier};
    use nodes_core::{Dashboard, EngineConfig, NodeControl, ProgressBackend};
    use std::sync::Arc;

    fn day(s: &str) -> DayKey {
        s.parse().expect("valid day")
    }

    /// Helper to seed a node row for user `u1`
    fn seed_node(
        backend: &MemoryBackend,
        id: &str,
        node_type: NodeType,
        mass: f64,
        target: Option<f64>,
    ) -> Node {
        let node = Node::from_new(
            id,
            "u1",
            NewNode {
                name: id.to_string(),
                description: None,
                node_type,
                mass,
                target_value: target,
                color: "#8b5cf6".to_string(),
                icon: "Circle".to_string(),
                core_id: None,
                connector_ids: Vec::new(),
            },
        );
        backend.seed_node(node.clone());
        node
    }

    /// Helper to build a dashboard whose "today" is fixed
    fn dashboard(backend: &MemoryBackend, today: &str) -> (Dashboard, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let backend: Arc<dyn ProgressBackend> = Arc::new(backend.clone());
        let dashboard = Dashboard::new(
            backend,
            &EngineConfig::default(),
            notifier.clone(),
            Arc::new(FixedClock::new(day(today))),
        );
        (dashboard, notifier)
    }

    #[tokio::test]
    async fn test_binary_node_marked_done() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let node = seed_node(&backend, "N", NodeType::Binary, 2.0, None);
        let (dashboard, _notifier) = dashboard(&backend, "2024-06-01");

        assert!(dashboard.load_day(day("2024-06-01")).await);
        assert_eq!(
            dashboard.store().read(|s| s.progress(&node.id)),
            DailyProgress {
                completed: false,
                value: 0.0,
                overdrive: 0.0
            }
        );

        let Some(NodeControl::Binary(control)) = dashboard.control_for(&node.id) else {
            panic!("binary node should get a binary control");
        };
        control.toggle().await;

        let rows = backend.impulse_rows(&node.id, day("2024-06-01"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 1.0);
        assert_eq!(
            dashboard.store().read(|s| s.progress(&node.id)),
            DailyProgress {
                completed: true,
                value: 1.0,
                overdrive: 0.0
            }
        );

        // The backend agrees with the published value
        assert_eq!(
            dashboard.refresh_node(&node.id).await,
            Some(DailyProgress {
                completed: true,
                value: 1.0,
                overdrive: 0.0
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_node_crosses_target_into_overdrive() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let date = day("2024-06-01");
        let node = seed_node(&backend, "M", NodeType::Quantity, 1.0, Some(8.0));
        backend.seed_impulse(&node.id, 3.0, date);
        backend.seed_impulse(&node.id, 4.0, date);

        let ledger = ImpulseLedger::new(Arc::new(backend.clone()));
        assert_eq!(
            ledger.read_progress(&node, date).await?,
            DailyProgress {
                completed: false,
                value: 7.0,
                overdrive: 0.0
            }
        );

        ledger.record_increment(&node.id, 2.0, date).await?;
        assert_eq!(
            ledger.read_progress(&node, date).await?,
            DailyProgress {
                completed: true,
                value: 9.0,
                overdrive: 1.0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_focus_mass_and_replace() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let n = seed_node(&backend, "N", NodeType::Binary, 2.0, None);
        let m = seed_node(&backend, "M", NodeType::Quantity, 3.0, Some(8.0));
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(day("2024-06-01")).await;

        let ids = vec![n.id.clone(), m.id.clone()];
        assert!(dashboard.save_focus(&ids).await);
        assert_eq!(dashboard.current_capacity().current_mass, 5.0);
        assert_eq!(notifier.count(NoticeLevel::Warning), 0);

        // Reload from the backend, then clear the whole set
        dashboard.load_day(day("2024-06-01")).await;
        assert_eq!(dashboard.store().read(|s| s.focus_ids.len()), 2);

        assert!(dashboard.save_focus(&[]).await);
        dashboard.load_day(day("2024-06-01")).await;
        assert!(dashboard.store().read(|s| s.focus_ids.is_empty()));
        assert_eq!(dashboard.current_capacity().current_mass, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_over_capacity_warns_but_saves() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let a = seed_node(&backend, "A", NodeType::Binary, 6.0, None);
        let b = seed_node(&backend, "B", NodeType::Binary, 5.0, None);
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(day("2024-06-01")).await;

        let ids = vec![a.id.clone(), b.id.clone()];
        let status = dashboard.capacity(&ids);
        assert!(status.overloaded);
        assert_eq!(status.ratio_percent, 100.0);

        assert!(dashboard.save_focus(&ids).await);
        assert_eq!(notifier.count(NoticeLevel::Warning), 1);
        assert!(backend
            .write_calls()
            .iter()
            .any(|c| matches!(c, BackendCall::ReplaceFocus { node_ids, .. } if node_ids.len() == 2)));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_failure_shows_one_notice() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        seed_node(&backend, "N", NodeType::Binary, 1.0, None);
        backend.set_fail_reads(true);
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");

        assert!(!dashboard.load_day(day("2024-06-01")).await);
        assert_eq!(notifier.count(NoticeLevel::Error), 1);
        assert!(dashboard.store().read(|s| s.nodes.is_empty()));
        Ok(())
    }

    #[tokio::test]
    async fn test_signed_out_day_is_empty_without_error() -> Result<()> {
        let backend = MemoryBackend::signed_out();
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");

        assert!(dashboard.load_day(day("2024-06-01")).await);
        assert!(notifier.notices().is_empty());
        assert!(dashboard.store().read(|s| s.nodes.is_empty()));
        Ok(())
    }

    #[tokio::test]
    async fn test_future_day_cannot_be_selected() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let (dashboard, _notifier) = dashboard(&backend, "2024-06-05");

        assert!(!dashboard.select_date(day("2024-06-06")).await);
        assert_eq!(dashboard.selected_date(), day("2024-06-05"));

        assert!(dashboard.select_date(day("2024-06-03")).await);
        assert_eq!(dashboard.selected_date(), day("2024-06-03"));
        assert!(dashboard.week_view().is_history());
        Ok(())
    }

    #[tokio::test]
    async fn test_impulse_targets_selected_day() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let node = seed_node(&backend, "Read", NodeType::Quantity, 1.0, Some(2.0));
        let (dashboard, notifier) = dashboard(&backend, "2024-06-05");
        dashboard.select_date(day("2024-06-03")).await;

        assert!(dashboard.handle_impulse(&node.id, 1.0).await);
        assert!(dashboard.handle_impulse(&node.id, 1.0).await);

        assert_eq!(backend.impulse_rows(&node.id, day("2024-06-03")).len(), 2);
        assert!(backend.impulse_rows(&node.id, day("2024-06-05")).is_empty());
        assert!(dashboard.store().read(|s| s.progress(&node.id)).completed);
        assert_eq!(notifier.count(NoticeLevel::Success), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_impulse_records_given_value() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let date = day("2024-06-01");
        let node = seed_node(&backend, "Water", NodeType::Quantity, 1.0, Some(8.0));
        let (dashboard, _notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(date).await;

        assert!(dashboard.handle_impulse(&node.id, 3.0).await);
        assert!(dashboard.handle_impulse(&node.id, 2.0).await);

        let values: Vec<f64> = backend
            .impulse_rows(&node.id, date)
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![3.0, 2.0]);
        assert_eq!(dashboard.store().read(|s| s.progress(&node.id)).value, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_node_stays_in_focus() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let date = day("2024-06-01");
        let node = seed_node(&backend, "N", NodeType::Binary, 2.0, None);
        let (dashboard, _notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(date).await;
        assert!(dashboard.save_focus(&[node.id.clone()]).await);

        let Some(NodeControl::Binary(control)) = dashboard.control_for(&node.id) else {
            panic!("binary node should get a binary control");
        };
        control.toggle().await;

        // Completion is progress, not a focus change
        assert!(dashboard.load_day(date).await);
        assert_eq!(
            dashboard.store().read(|s| s.focus_ids.clone()),
            vec![node.id.clone()]
        );
        assert!(dashboard.store().read(|s| s.progress(&node.id)).completed);
        assert_eq!(dashboard.current_capacity().current_mass, 2.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_update_overwrites_day() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let date = day("2024-06-01");
        let node = seed_node(&backend, "Pages", NodeType::Quantity, 1.0, Some(10.0));
        backend.seed_impulse(&node.id, 4.0, date);
        let (dashboard, _notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(date).await;

        assert!(dashboard.handle_quantity_update(&node.id, 12.0).await);
        assert_eq!(backend.impulse_rows(&node.id, date).len(), 1);
        assert_eq!(
            dashboard.store().read(|s| s.progress(&node.id)),
            DailyProgress {
                completed: true,
                value: 12.0,
                overdrive: 2.0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_impulse_for_unknown_node_fails_with_notice() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(day("2024-06-01")).await;

        assert!(!dashboard.handle_impulse("missing", 1.0).await);
        assert!(backend.write_calls().is_empty());
        assert_eq!(notifier.count(NoticeLevel::Error), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_node_lifecycle_updates_store() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");
        dashboard.load_day(day("2024-06-01")).await;

        let created = dashboard
            .create_node(&NodeDraft {
                name: "Meditate".to_string(),
                node_type: NodeType::Duration,
                target_value: Some(15.0),
                connector_ids: vec!["c1".to_string()],
                ..Default::default()
            })
            .await
            .expect("node created");
        assert_eq!(dashboard.store().read(|s| s.nodes.len()), 1);

        // The type is fixed at creation
        let updated = dashboard
            .update_node(
                &created.id,
                &NodeDraft {
                    name: "Meditate longer".to_string(),
                    node_type: NodeType::Binary,
                    target_value: Some(20.0),
                    connector_ids: vec!["c1".to_string()],
                    ..Default::default()
                },
            )
            .await
            .expect("node updated");
        assert_eq!(updated.node_type, NodeType::Duration);
        assert_eq!(
            dashboard.store().read(|s| s.node(&created.id).map(|n| n.name.clone())),
            Some("Meditate longer".to_string())
        );

        assert!(dashboard.delete_node(&created.id).await);
        assert!(dashboard.store().read(|s| s.nodes.is_empty()));
        assert_eq!(notifier.count(NoticeLevel::Error), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_request() -> Result<()> {
        let backend = MemoryBackend::new("u1");
        let (dashboard, notifier) = dashboard(&backend, "2024-06-01");

        let created = dashboard
            .create_node(&NodeDraft {
                name: "   ".to_string(),
                ..Default::default()
            })
            .await;
        assert!(created.is_none());
        assert!(backend.write_calls().is_empty());
        assert_eq!(notifier.count(NoticeLevel::Error), 1);
        Ok(())
    }
}
