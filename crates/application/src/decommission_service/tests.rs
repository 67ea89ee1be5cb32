use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use tokio::sync::Mutex;

use mothball_core::{AppError, AppResult};
use mothball_domain::{AuditRow, LockLevel, ResolvedVm};

use crate::cloud_ports::{AuditTableStore, ComputeLifecycle, ResourceManager};

use super::DecommissionService;

const SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";

type EventLog = Arc<Mutex<Vec<String>>>;

fn canonical_id(resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}"
    )
}

fn request_body(change: &str, days: i64, machines: &[(&str, &str)]) -> String {
    let items: Vec<_> = machines
        .iter()
        .map(|(name, group)| json!({ "name": name, "resourceGroup": group }))
        .collect();
    json!({
        "subscriptionId": SUBSCRIPTION,
        "vmList": items,
        "change": change,
        "days": days,
    })
    .to_string()
}

struct FakeResourceManager {
    machines: HashMap<(String, String), ResolvedVm>,
    fail_lookup_for: Option<String>,
    fail_lookup_with_credential: bool,
    fail_lock_for: Option<String>,
    lookups: Mutex<Vec<String>>,
    locks: Mutex<Vec<(String, LockLevel, String)>>,
    events: EventLog,
}

impl FakeResourceManager {
    fn new(events: EventLog) -> Self {
        Self {
            machines: HashMap::new(),
            fail_lookup_for: None,
            fail_lookup_with_credential: false,
            fail_lock_for: None,
            lookups: Mutex::new(Vec::new()),
            locks: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Registers a machine under the group callers look it up by; its
    /// canonical id may carry a different group.
    fn register(mut self, name: &str, lookup_group: &str, id_group: &str) -> Self {
        let resolved = ResolvedVm {
            id: canonical_id(id_group, name),
            name: name.to_owned(),
        };
        self.machines
            .insert((lookup_group.to_owned(), name.to_owned()), resolved);
        self
    }

    fn fail_lookup_for(mut self, name: &str) -> Self {
        self.fail_lookup_for = Some(name.to_owned());
        self
    }

    fn fail_lookup_with_credential(mut self, name: &str) -> Self {
        self.fail_lookup_for = Some(name.to_owned());
        self.fail_lookup_with_credential = true;
        self
    }

    fn fail_lock_for(mut self, name: &str) -> Self {
        self.fail_lock_for = Some(name.to_owned());
        self
    }
}

#[async_trait]
impl ResourceManager for FakeResourceManager {
    async fn get_virtual_machine(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<ResolvedVm> {
        assert_eq!(subscription_id, SUBSCRIPTION);
        self.lookups.lock().await.push(name.to_owned());
        if self.fail_lookup_for.as_deref() == Some(name) {
            if self.fail_lookup_with_credential {
                return Err(AppError::Credential("token request failed".to_owned()));
            }
            return Err(AppError::Provider(format!(
                "virtual machine '{name}' was not found"
            )));
        }
        self.machines
            .get(&(resource_group.to_owned(), name.to_owned()))
            .cloned()
            .ok_or_else(|| AppError::Provider(format!("virtual machine '{name}' was not found")))
    }

    async fn apply_deletion_lock(
        &self,
        scope: &str,
        level: LockLevel,
        notes: &str,
    ) -> AppResult<()> {
        if let Some(name) = &self.fail_lock_for {
            if scope.ends_with(name.as_str()) {
                return Err(AppError::Provider("lock placement was rejected".to_owned()));
            }
        }
        let vm_name = scope.rsplit('/').next().unwrap_or_default().to_owned();
        self.events.lock().await.push(format!("lock:{vm_name}"));
        self.locks
            .lock()
            .await
            .push((scope.to_owned(), level, notes.to_owned()));
        Ok(())
    }
}

struct FakeComputeLifecycle {
    fail_for: Option<String>,
    deallocations: Mutex<Vec<(String, String)>>,
    events: EventLog,
}

impl FakeComputeLifecycle {
    fn new(events: EventLog) -> Self {
        Self {
            fail_for: None,
            deallocations: Mutex::new(Vec::new()),
            events,
        }
    }

    fn fail_for(mut self, name: &str) -> Self {
        self.fail_for = Some(name.to_owned());
        self
    }
}

#[async_trait]
impl ComputeLifecycle for FakeComputeLifecycle {
    async fn begin_deallocate(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<()> {
        assert_eq!(subscription_id, SUBSCRIPTION);
        if self.fail_for.as_deref() == Some(name) {
            return Err(AppError::Provider(
                "deallocate request returned status 409".to_owned(),
            ));
        }
        self.events.lock().await.push(format!("deallocate:{name}"));
        self.deallocations
            .lock()
            .await
            .push((resource_group.to_owned(), name.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
struct FakeAuditTable {
    fail: bool,
    rows: Mutex<HashMap<(String, String), AuditRow>>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FakeAuditTable {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AuditTableStore for FakeAuditTable {
    async fn upsert_merge(&self, rows: &[AuditRow]) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Provider("table service unavailable".to_owned()));
        }
        self.batch_sizes.lock().await.push(rows.len());
        let mut stored = self.rows.lock().await;
        for row in rows {
            stored.insert((row.change.clone(), row.vm_name.clone()), row.clone());
        }
        Ok(())
    }
}

struct Harness {
    service: DecommissionService,
    resources: Arc<FakeResourceManager>,
    compute: Arc<FakeComputeLifecycle>,
    table: Arc<FakeAuditTable>,
    events: EventLog,
}

impl Harness {
    fn with(
        resources: FakeResourceManager,
        compute: FakeComputeLifecycle,
        table: FakeAuditTable,
        events: EventLog,
    ) -> Self {
        let resources = Arc::new(resources);
        let compute = Arc::new(compute);
        let table = Arc::new(table);
        let service = DecommissionService::new(resources.clone(), compute.clone(), table.clone());
        Self {
            service,
            resources,
            compute,
            table,
            events,
        }
    }

    async fn assert_no_provider_calls(&self) {
        assert!(self.resources.lookups.lock().await.is_empty());
        assert!(self.compute.deallocations.lock().await.is_empty());
        assert!(self.resources.locks.lock().await.is_empty());
        assert!(self.table.batch_sizes.lock().await.is_empty());
    }
}

fn standard_harness() -> Harness {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    Harness::with(
        FakeResourceManager::new(events.clone())
            .register("vm1", "rg1", "rg1")
            .register("vm2", "rg1", "rg1")
            .register("vm3", "rg2", "rg2"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::default(),
        events,
    )
}

#[tokio::test]
async fn malformed_body_is_rejected_without_provider_calls() {
    let harness = standard_harness();

    let result = harness.service.decommission("{not valid json").await;

    match result {
        Err(AppError::MalformedInput(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    harness.assert_no_provider_calls().await;
}

#[tokio::test]
async fn missing_field_is_rejected_without_provider_calls() {
    let harness = standard_harness();

    let result = harness.service.decommission("{}").await;

    match result {
        Err(AppError::MissingField { field, .. }) => assert_eq!(field, "subscriptionId"),
        other => panic!("unexpected result: {other:?}"),
    }
    harness.assert_no_provider_calls().await;
}

#[tokio::test]
async fn empty_vm_list_succeeds_with_zero_provider_calls() {
    let harness = standard_harness();

    let summary = match harness
        .service
        .decommission(&request_body("CHG-100", 30, &[]))
        .await
    {
        Ok(summary) => summary,
        Err(error) => panic!("expected success, got {error}"),
    };

    assert_eq!(summary.marked_for_removal, 0);
    harness.assert_no_provider_calls().await;
}

#[tokio::test]
async fn lookup_failure_stops_the_batch_before_any_destructive_call() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        FakeResourceManager::new(events.clone())
            .register("vm1", "rg1", "rg1")
            .register("vm3", "rg2", "rg2")
            .fail_lookup_for("vm2"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::default(),
        events,
    );

    let body = request_body("CHG-200", 14, &[("vm1", "rg1"), ("vm2", "rg1"), ("vm3", "rg2")]);
    let result = harness.service.decommission(&body).await;

    match result {
        Err(AppError::ResourceLookup { name, .. }) => assert_eq!(name, "vm2"),
        other => panic!("unexpected result: {other:?}"),
    }
    // vm1 and vm2 were looked up, vm3 never was.
    assert_eq!(*harness.resources.lookups.lock().await, vec!["vm1", "vm2"]);
    assert!(harness.compute.deallocations.lock().await.is_empty());
    assert!(harness.resources.locks.lock().await.is_empty());
    assert!(harness.table.batch_sizes.lock().await.is_empty());
}

#[tokio::test]
async fn deallocate_failure_keeps_earlier_machines_processed_and_writes_no_rows() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        FakeResourceManager::new(events.clone())
            .register("vm1", "rg1", "rg1")
            .register("vm2", "rg1", "rg1")
            .register("vm3", "rg2", "rg2"),
        FakeComputeLifecycle::new(events.clone()).fail_for("vm2"),
        FakeAuditTable::default(),
        events,
    );

    let body = request_body("CHG-300", 30, &[("vm1", "rg1"), ("vm2", "rg1"), ("vm3", "rg2")]);
    let result = harness.service.decommission(&body).await;

    match result {
        Err(AppError::DecommissionStep { name, .. }) => assert_eq!(name, "vm2"),
        other => panic!("unexpected result: {other:?}"),
    }
    // vm1 was fully processed exactly once and its effects stay in place.
    assert_eq!(
        *harness.events.lock().await,
        vec!["deallocate:vm1", "lock:vm1"]
    );
    assert!(harness.table.rows.lock().await.is_empty());
    assert!(harness.table.batch_sizes.lock().await.is_empty());
}

#[tokio::test]
async fn lock_failure_aborts_without_audit_rows() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        FakeResourceManager::new(events.clone())
            .register("vm1", "rg1", "rg1")
            .register("vm2", "rg1", "rg1")
            .fail_lock_for("vm2"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::default(),
        events,
    );

    let body = request_body("CHG-400", 30, &[("vm1", "rg1"), ("vm2", "rg1")]);
    let result = harness.service.decommission(&body).await;

    match result {
        Err(AppError::DecommissionStep { name, .. }) => assert_eq!(name, "vm2"),
        other => panic!("unexpected result: {other:?}"),
    }
    // vm2 was deallocated before its lock failed; that effect stays.
    assert_eq!(
        *harness.events.lock().await,
        vec!["deallocate:vm1", "lock:vm1", "deallocate:vm2"]
    );
    assert!(harness.table.rows.lock().await.is_empty());
}

#[tokio::test]
async fn successful_batch_deallocates_locks_and_records_every_machine() {
    let harness = standard_harness();

    let body = request_body("CHG-500", 30, &[("vm1", "rg1"), ("vm3", "rg2")]);
    let summary = match harness.service.decommission(&body).await {
        Ok(summary) => summary,
        Err(error) => panic!("expected success, got {error}"),
    };

    assert_eq!(summary.marked_for_removal, 2);
    // Deallocate precedes the lock for each machine, in request order.
    assert_eq!(
        *harness.events.lock().await,
        vec!["deallocate:vm1", "lock:vm1", "deallocate:vm3", "lock:vm3"]
    );

    let locks = harness.resources.locks.lock().await;
    assert_eq!(locks.len(), 2);
    assert_eq!(locks[0].0, canonical_id("rg1", "vm1"));
    assert_eq!(locks[0].1, LockLevel::CannotDelete);
    assert!(locks[0].2.contains("CHG-500"));

    // One store call carrying the whole batch.
    assert_eq!(*harness.table.batch_sizes.lock().await, vec![2]);
    let rows = harness.table.rows.lock().await;
    let row = match rows.get(&("CHG-500".to_owned(), "vm3".to_owned())) {
        Some(row) => row,
        None => panic!("row for vm3 is missing"),
    };
    assert_eq!(row.subscription_id, SUBSCRIPTION);
    assert_eq!(row.resource_group, "rg2");
    assert_eq!(row.remove_date - row.created_at, Duration::days(30));
}

#[tokio::test]
async fn resource_group_comes_from_the_resolved_id() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        // Lookup succeeds under the submitted group, but the canonical id
        // names a different one.
        FakeResourceManager::new(events.clone()).register("vm1", "rg-submitted", "rg-actual"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::default(),
        events,
    );

    let body = request_body("CHG-600", 7, &[("vm1", "rg-submitted")]);
    if let Err(error) = harness.service.decommission(&body).await {
        panic!("expected success, got {error}");
    }

    assert_eq!(
        *harness.compute.deallocations.lock().await,
        vec![("rg-actual".to_owned(), "vm1".to_owned())]
    );
    let rows = harness.table.rows.lock().await;
    match rows.get(&("CHG-600".to_owned(), "vm1".to_owned())) {
        Some(row) => assert_eq!(row.resource_group, "rg-actual"),
        None => panic!("row for vm1 is missing"),
    }
}

#[tokio::test]
async fn audit_rows_share_one_request_processing_timestamp() {
    let harness = standard_harness();

    let body = request_body("CHG-650", 30, &[("vm1", "rg1"), ("vm2", "rg1"), ("vm3", "rg2")]);
    if let Err(error) = harness.service.decommission(&body).await {
        panic!("expected success, got {error}");
    }

    let rows = harness.table.rows.lock().await;
    let timestamps: Vec<_> = rows.values().map(|row| row.created_at).collect();
    assert_eq!(timestamps.len(), 3);
    assert!(timestamps.iter().all(|stamp| *stamp == timestamps[0]));
}

#[tokio::test]
async fn resubmitting_a_change_merges_rows_instead_of_duplicating() {
    let harness = standard_harness();
    let body = request_body("CHG-700", 30, &[("vm1", "rg1")]);

    for _ in 0..2 {
        if let Err(error) = harness.service.decommission(&body).await {
            panic!("expected success, got {error}");
        }
    }

    assert_eq!(*harness.table.batch_sizes.lock().await, vec![1, 1]);
    assert_eq!(harness.table.rows.lock().await.len(), 1);
}

#[tokio::test]
async fn audit_write_failure_surfaces_as_a_server_error() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        FakeResourceManager::new(events.clone()).register("vm1", "rg1", "rg1"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::failing(),
        events,
    );

    let body = request_body("CHG-800", 30, &[("vm1", "rg1")]);
    let result = harness.service.decommission(&body).await;

    match result {
        Err(error @ AppError::AuditWrite(_)) => assert!(!error.is_client_error()),
        other => panic!("unexpected result: {other:?}"),
    }
    // The machine itself was still deallocated and locked.
    assert_eq!(
        *harness.events.lock().await,
        vec!["deallocate:vm1", "lock:vm1"]
    );
}

#[tokio::test]
async fn credential_failures_keep_their_kind_through_the_pipeline() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(
        FakeResourceManager::new(events.clone()).fail_lookup_with_credential("vm1"),
        FakeComputeLifecycle::new(events.clone()),
        FakeAuditTable::default(),
        events,
    );

    let body = request_body("CHG-900", 30, &[("vm1", "rg1")]);
    let result = harness.service.decommission(&body).await;

    match result {
        Err(AppError::Credential(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}
