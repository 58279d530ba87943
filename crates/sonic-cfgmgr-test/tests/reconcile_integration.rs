//! End-to-end reconciliation tests for ospfvrfmgrd
//!
//! Drives `OspfVrfMgr` over a seeded `MemoryDevice` and checks the call log
//! and resulting device state.

use pretty_assertions::assert_eq;
use sonic_cfgmgr_common::{CfgMgrError, ResourceProvider};
use sonic_cfgmgr_test::{
    desired_fixtures, device_fixtures, key, CallVerifier, DeviceVerifier, PROCESS,
};
use sonic_ospfvrfmgrd::{
    ApplyOutcome, DesiredResource, DeviceCall, Manifest, MemoryDevice, MemoryInstance, OspfVrfMgr,
    PendingAction, Property, PropertyGroup, ResourceState, PROTECTED_VRF,
};
use std::io::Write;

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["green"]));

    let first = mgr
        .reconcile(vec![desired_fixtures::fully_specified("green")])
        .await
        .unwrap();
    assert!(first.is_success());
    assert!(!CallVerifier::from_device(mgr.device()).mutations().is_empty());

    mgr.device().clear_calls();
    let second = mgr
        .reconcile(vec![desired_fixtures::fully_specified("green")])
        .await
        .unwrap();

    assert!(matches!(
        second.outcome(&key("green")),
        Some(Ok(ApplyOutcome::Unchanged))
    ));
    CallVerifier::from_device(mgr.device())
        .assert_no_mutations()
        .unwrap();
}

#[tokio::test]
async fn test_pass_converges_every_property() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["green"]));

    mgr.reconcile(vec![desired_fixtures::fully_specified("green")])
        .await
        .unwrap();

    let green = key("green");
    let verifier = DeviceVerifier::new(mgr.device());
    verifier.assert_property(&green, Property::DefaultMetric, 20u32).unwrap();
    verifier.assert_property(&green, Property::LogAdjacency, "log").unwrap();
    verifier.assert_property(&green, Property::RouterId, "192.168.0.1").unwrap();
    verifier.assert_property(&green, Property::TimerThrottleLsaStart, 10u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleLsaHold, 6000u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleLsaMax, 7000u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleSpfStart, 300u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleSpfHold, 1500u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleSpfMax, 9000u32).unwrap();
    verifier.assert_cost(&green, 45_000, "Mbps").unwrap();

    let calls = CallVerifier::from_device(mgr.device());
    calls.assert_grouped_once(&green, PropertyGroup::LsaThrottle).unwrap();
    calls.assert_grouped_once(&green, PropertyGroup::SpfThrottle).unwrap();
    // 3 plain properties, cost, 2 groups
    calls.assert_mutation_count(6).unwrap();
}

#[tokio::test]
async fn test_single_timer_member_written_as_group() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["green"]));

    mgr.reconcile(vec![desired_fixtures::lsa_hold_only("green", 8000)])
        .await
        .unwrap();

    let calls = CallVerifier::from_device(mgr.device());
    calls.assert_mutation_count(1).unwrap();
    calls
        .assert_called(&DeviceCall::WriteGroupedTimers {
            key: key("green"),
            group: PropertyGroup::LsaThrottle,
            values: [0, 8000, 5000],
        })
        .unwrap();
}

#[tokio::test]
async fn test_device_default_cost_matches_scaled_current() {
    let device = MemoryDevice::new().with_instance(device_fixtures::high_bandwidth_instance("green"));
    let mut mgr = OspfVrfMgr::new(device);

    let report = mgr
        .reconcile(vec![
            DesiredResource::new(key("green")).with_default(Property::AutoCost)
        ])
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(&key("green")),
        Some(Ok(ApplyOutcome::Unchanged))
    ));
    assert_eq!(
        mgr.current(&key("green")).unwrap().defaults.auto_cost,
        200_000
    );
    CallVerifier::from_device(mgr.device())
        .assert_no_mutations()
        .unwrap();
}

#[tokio::test]
async fn test_all_defaults_resets_customized_instance() {
    let device = MemoryDevice::new().with_instance(device_fixtures::customized_instance("green"));
    let mut mgr = OspfVrfMgr::new(device);

    mgr.reconcile(vec![desired_fixtures::all_defaults("green")])
        .await
        .unwrap();

    let green = key("green");
    let verifier = DeviceVerifier::new(mgr.device());
    verifier.assert_property(&green, Property::DefaultMetric, 0u32).unwrap();
    verifier.assert_property(&green, Property::LogAdjacency, "none").unwrap();
    verifier.assert_property(&green, Property::RouterId, "").unwrap();
    verifier.assert_property(&green, Property::TimerThrottleLsaStart, 0u32).unwrap();
    verifier.assert_property(&green, Property::TimerThrottleSpfMax, 5000u32).unwrap();
    verifier.assert_cost(&green, 40_000, "Mbps").unwrap();

    mgr.device().clear_calls();
    mgr.reconcile(vec![desired_fixtures::all_defaults("green")])
        .await
        .unwrap();
    CallVerifier::from_device(mgr.device())
        .assert_no_mutations()
        .unwrap();
}

#[tokio::test]
async fn test_protected_vrf_removal_makes_no_device_calls() {
    let protected = key(PROTECTED_VRF);
    let device = MemoryDevice::new().with_instance(device_fixtures::protected_instance());
    let mut mgr = OspfVrfMgr::new(device);
    mgr.list_managed_resources(vec![desired_fixtures::absent(PROTECTED_VRF)])
        .await
        .unwrap();
    mgr.device().clear_calls();

    let err = mgr.request_destroy(&protected).unwrap_err();

    assert!(matches!(err, CfgMgrError::PolicyViolation { .. }));
    assert!(err.to_string().contains("VRF default cannot be removed"));
    CallVerifier::from_device(mgr.device()).assert_no_calls().unwrap();
    DeviceVerifier::new(mgr.device()).assert_present(&protected).unwrap();
}

#[tokio::test]
async fn test_protected_vrf_removal_fails_only_that_resource() {
    let device = device_fixtures::seeded_device(&["green"])
        .with_instance(device_fixtures::protected_instance());
    let mut mgr = OspfVrfMgr::new(device);

    let report = mgr
        .reconcile(vec![
            desired_fixtures::absent(PROTECTED_VRF),
            desired_fixtures::lsa_hold_only("green", 6000),
        ])
        .await
        .unwrap();

    assert_eq!(report.failures().count(), 1);
    assert!(matches!(
        report.outcome(&key("green")),
        Some(Ok(ApplyOutcome::Updated { mutations: 1 }))
    ));
    CallVerifier::from_device(mgr.device())
        .assert_untouched(&key(PROTECTED_VRF))
        .unwrap();
}

#[tokio::test]
async fn test_unreadable_instance_does_not_block_others() {
    let device = device_fixtures::seeded_device(&["green", "blue", "red"]).fail_reads_for(key("blue"));
    let mut mgr = OspfVrfMgr::new(device);

    let records = mgr
        .list_managed_resources(vec![
            DesiredResource::new(key("green")),
            DesiredResource::new(key("blue")),
            DesiredResource::new(key("red")),
        ])
        .await
        .unwrap();

    let keys: Vec<_> = records.into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![key("green"), key("red")]);
    assert!(!mgr.exists(&key("blue")));
}

#[tokio::test]
async fn test_write_failure_isolated_to_resource() {
    let device = device_fixtures::seeded_device(&["green", "blue"]).fail_writes_for(key("blue"));
    let mut mgr = OspfVrfMgr::new(device);

    let report = mgr
        .reconcile(vec![
            desired_fixtures::fully_specified("blue"),
            desired_fixtures::fully_specified("green"),
        ])
        .await
        .unwrap();

    assert!(!report.is_success());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, &key("blue"));
    assert!(failures[0].1.is_retryable());
    assert_eq!(mgr.state(&key("blue")), Some(ResourceState::PresentDirty));
    assert_eq!(mgr.state(&key("green")), Some(ResourceState::PresentClean));

    // Recover on the next pass once writes succeed again.
    mgr.device_mut().clear_write_failure(&key("blue"));
    let report = mgr
        .reconcile(vec![
            desired_fixtures::fully_specified("blue"),
            desired_fixtures::fully_specified("green"),
        ])
        .await
        .unwrap();
    assert!(report.is_success());
    assert!(matches!(
        report.outcome(&key("green")),
        Some(Ok(ApplyOutcome::Unchanged))
    ));
}

#[tokio::test]
async fn test_undeclared_instances_untouched() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["green", "red"]));

    mgr.reconcile(vec![desired_fixtures::fully_specified("green")])
        .await
        .unwrap();

    let calls = CallVerifier::from_device(mgr.device());
    calls.assert_untouched(&key("red")).unwrap();
    assert!(mgr.state(&key("red")).is_none());
    DeviceVerifier::new(mgr.device())
        .assert_property(&key("red"), Property::DefaultMetric, 0u32)
        .unwrap();
}

#[tokio::test]
async fn test_create_and_destroy() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["old"]));

    let report = mgr
        .reconcile(vec![
            desired_fixtures::fully_specified("new"),
            desired_fixtures::absent("old"),
            desired_fixtures::absent("never"),
        ])
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(matches!(
        report.outcome(&key("new")),
        Some(Ok(ApplyOutcome::Created { mutations: 6 }))
    ));
    assert!(matches!(
        report.outcome(&key("old")),
        Some(Ok(ApplyOutcome::Destroyed))
    ));
    assert!(matches!(
        report.outcome(&key("never")),
        Some(Ok(ApplyOutcome::Unchanged))
    ));

    let verifier = DeviceVerifier::new(mgr.device());
    verifier.assert_present(&key("new")).unwrap();
    verifier.assert_absent(&key("old")).unwrap();
    verifier.assert_cost(&key("new"), 45_000, "Mbps").unwrap();

    let stats = mgr.stats();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.destroyed, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_preview_does_not_touch_device() {
    let mut mgr = OspfVrfMgr::new(device_fixtures::seeded_device(&["green"]));
    mgr.list_managed_resources(vec![
        DesiredResource::new(key("green")).with(Property::AutoCost, 10_000u32)
    ])
    .await
    .unwrap();
    mgr.device().clear_calls();

    let action = mgr.preview(&key("green")).unwrap();

    assert_eq!(action.to_string(), "would set auto_cost = 10000 Mbps");
    assert!(matches!(action, PendingAction::Update(ref calls) if calls.len() == 1));
    CallVerifier::from_device(mgr.device()).assert_no_calls().unwrap();
}

#[tokio::test]
async fn test_manifest_and_device_state_round_trip() {
    let manifest = format!(
        r#"
ospf_vrfs:
  - name: "{process} green"
    auto_cost: 45000
    log_adjacency: detail
    timer_throttle_spf_start: "250"
  - name: "{process} blue"
    router_id: 10.0.0.2
"#,
        process = PROCESS
    );
    let mut manifest_file = tempfile::NamedTempFile::new().unwrap();
    manifest_file.write_all(manifest.as_bytes()).unwrap();
    let state_file = tempfile::NamedTempFile::new().unwrap();
    device_fixtures::seeded_device(&["green"])
        .save(state_file.path())
        .unwrap();

    let desired = Manifest::load(manifest_file.path())
        .unwrap()
        .into_desired()
        .unwrap();
    let mut mgr = OspfVrfMgr::new(MemoryDevice::load(state_file.path()).unwrap());
    let report = mgr.reconcile(desired.clone()).await.unwrap();
    assert!(report.is_success());
    mgr.device().save(state_file.path()).unwrap();

    let reloaded = MemoryDevice::load(state_file.path()).unwrap();
    assert_eq!(reloaded.instances().len(), 2);
    let mut mgr = OspfVrfMgr::new(reloaded);
    mgr.reconcile(desired).await.unwrap();

    CallVerifier::from_device(mgr.device())
        .assert_no_mutations()
        .unwrap();
}

#[tokio::test]
async fn test_unrecognized_cost_unit_fails_resource_without_device_calls() {
    let device = device_fixtures::seeded_device(&["green"])
        .with_instance(MemoryInstance::new(&key("blue")).with_cost(1, "Tbps"))
        .with_instance(MemoryInstance::new(&key("red")).with_cost(2, "Tbps"));
    let mut mgr = OspfVrfMgr::new(device);

    let report = mgr
        .reconcile(vec![
            desired_fixtures::fully_specified("blue"),
            desired_fixtures::absent("red"),
            desired_fixtures::lsa_hold_only("green", 6000),
        ])
        .await
        .unwrap();

    assert_eq!(report.failures().count(), 2);
    for vrf in ["blue", "red"] {
        assert!(matches!(
            report.outcome(&key(vrf)),
            Some(Err(CfgMgrError::UnitConversion { .. }))
        ));
        CallVerifier::from_device(mgr.device())
            .assert_untouched(&key(vrf))
            .unwrap();
        DeviceVerifier::new(mgr.device()).assert_present(&key(vrf)).unwrap();
    }
    assert!(matches!(
        report.outcome(&key("green")),
        Some(Ok(ApplyOutcome::Updated { mutations: 1 }))
    ));
}
