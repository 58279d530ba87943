//! OSPF VRF Manager - lifecycle control and apply phase

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use sonic_cfgmgr_common::{CfgMgr, CfgMgrError, CfgMgrResult, Ensure, ResourceProvider};
use tracing::{debug, info, instrument, warn};

use crate::binder::{self, Binding};
use crate::changeset::{self, ChangeSet};
use crate::device::{mutation_error, OspfVrfDevice};
use crate::discovery::{self, DiscoveredInstance};
use crate::planner::{self, MutationCall};
use crate::types::{DesiredResource, ResourceKey, ResourceRecord, ResourceState};

/// Raised when removal of the protected `default` VRF is requested.
pub const PROTECTED_VRF_MESSAGE: &str = "VRF default cannot be removed by ospf_vrf. \
     Remove the entire OSPF process including the default VRF instead.";

/// Result of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing to do.
    Unchanged,
    /// Instance constructed and initialized with `mutations` calls.
    Created { mutations: usize },
    /// Instance converged with `mutations` calls.
    Updated { mutations: usize },
    /// Instance removed.
    Destroyed,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Unchanged => f.write_str("unchanged"),
            ApplyOutcome::Created { mutations } => write!(f, "created ({} mutations)", mutations),
            ApplyOutcome::Updated { mutations } => write!(f, "updated ({} mutations)", mutations),
            ApplyOutcome::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// What an apply would do, computed without touching the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    None,
    /// Construct the instance and initialize `properties` properties.
    Create { properties: usize },
    Update(Vec<MutationCall>),
    Destroy,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::None => f.write_str("in sync"),
            PendingAction::Create { properties } => {
                write!(f, "would create ({} properties)", properties)
            }
            PendingAction::Update(calls) => {
                let calls: Vec<String> = calls.iter().map(|c| c.to_string()).collect();
                write!(f, "would set {}", calls.join(", "))
            }
            PendingAction::Destroy => f.write_str("would destroy"),
        }
    }
}

/// Statistics for OspfVrfMgr operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfVrfMgrStats {
    /// Number of instances created.
    pub created: u64,
    /// Number of instances destroyed.
    pub destroyed: u64,
    /// Number of instances updated.
    pub updated: u64,
    /// Number of device mutation calls issued successfully.
    pub mutations: u64,
    /// Number of failed resource operations.
    pub failures: u64,
}

/// Per-resource results of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub results: Vec<(ResourceKey, CfgMgrResult<ApplyOutcome>)>,
}

impl ReconcileReport {
    /// Returns true if every resource converged.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    /// Returns the failed resources and their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&ResourceKey, &CfgMgrError)> {
        self.results
            .iter()
            .filter_map(|(key, r)| r.as_ref().err().map(|e| (key, e)))
    }

    /// Returns the result for a resource.
    pub fn outcome(&self, key: &ResourceKey) -> Option<&CfgMgrResult<ApplyOutcome>> {
        self.results.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }
}

/// OSPF VRF Manager
///
/// Reconciles declared OSPF VRF instances against the device: discovers
/// current state, binds it to desired state, diffs, plans grouped timer
/// writes and applies them.
pub struct OspfVrfMgr<D: OspfVrfDevice> {
    /// Device property interface.
    device: D,

    /// Desired resource -> matched instance, from the last discovery.
    bindings: BTreeMap<ResourceKey, Binding<D::Handle>>,

    /// Pending create/destroy requests.
    intents: HashMap<ResourceKey, Ensure>,

    /// Lifecycle state per managed resource.
    states: HashMap<ResourceKey, ResourceState>,

    stats: OspfVrfMgrStats,
}

impl<D: OspfVrfDevice> OspfVrfMgr<D> {
    /// Create a new OspfVrfMgr over a device
    pub fn new(device: D) -> Self {
        Self {
            device,
            bindings: BTreeMap::new(),
            intents: HashMap::new(),
            states: HashMap::new(),
            stats: OspfVrfMgrStats::default(),
        }
    }

    /// Returns the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &OspfVrfMgrStats {
        &self.stats
    }

    /// Returns the lifecycle state of a managed resource.
    pub fn state(&self, key: &ResourceKey) -> Option<ResourceState> {
        self.states.get(key).copied()
    }

    /// Returns the last known current state of a managed resource.
    pub fn current(&self, key: &ResourceKey) -> Option<&ResourceRecord> {
        self.bindings
            .get(key)
            .and_then(|b| b.current.as_ref())
            .map(|c| &c.record)
    }

    fn binding(&self, key: &ResourceKey) -> CfgMgrResult<&Binding<D::Handle>> {
        self.bindings
            .get(key)
            .ok_or_else(|| CfgMgrError::resource_not_found(key.to_string()))
    }

    fn set_state(&mut self, key: &ResourceKey, state: ResourceState) {
        debug!("{} -> {}", key, state.as_str());
        self.states.insert(key.clone(), state);
    }

    fn set_current(&mut self, key: &ResourceKey, current: Option<DiscoveredInstance<D::Handle>>) {
        if let Some(binding) = self.bindings.get_mut(key) {
            binding.current = current;
        }
    }

    fn effective_intent(&self, binding: &Binding<D::Handle>) -> Ensure {
        self.intents
            .get(&binding.desired.key)
            .copied()
            .unwrap_or(binding.desired.ensure)
    }

    /// Computes what `apply` would do without touching the device.
    pub fn preview(&self, key: &ResourceKey) -> CfgMgrResult<PendingAction> {
        let binding = self.binding(key)?;
        if let Some(e) = &binding.failure {
            return Err(e.clone());
        }
        let action = match (self.effective_intent(binding), &binding.current) {
            (Ensure::Absent, None) => PendingAction::None,
            (Ensure::Absent, Some(_)) => {
                check_destroy_allowed(key)?;
                PendingAction::Destroy
            }
            (Ensure::Present, None) => PendingAction::Create {
                properties: binding.desired.properties.len(),
            },
            (Ensure::Present, Some(instance)) => {
                let record = &instance.record;
                let changes = changeset::diff(&binding.desired, Some(record), &record.defaults);
                if changes.is_empty() {
                    PendingAction::None
                } else {
                    PendingAction::Update(planner::plan(&changes, record)?)
                }
            }
        };
        Ok(action)
    }

    /// Runs one full pass over the desired resources.
    ///
    /// Each resource is created, destroyed or updated as declared. A failure
    /// is recorded for that resource and the pass continues with the next.
    #[instrument(skip(self, desired), fields(resources = desired.len()))]
    pub async fn reconcile(&mut self, desired: Vec<DesiredResource>) -> CfgMgrResult<ReconcileReport> {
        let order: Vec<(ResourceKey, Ensure)> =
            desired.iter().map(|d| (d.key.clone(), d.ensure)).collect();

        self.list_managed_resources(desired).await?;

        let mut report = ReconcileReport::default();
        for (key, ensure) in order {
            let result = self.reconcile_one(&key, ensure).await;
            match &result {
                Ok(outcome) => info!("OSPF VRF {}: {}", key, outcome),
                Err(e) => warn!("OSPF VRF {} not converged: {}", key, e),
            }
            report.results.push((key, result));
        }

        Ok(report)
    }

    async fn reconcile_one(&mut self, key: &ResourceKey, ensure: Ensure) -> CfgMgrResult<ApplyOutcome> {
        let requested = match (ensure, self.exists(key)) {
            (Ensure::Present, false) => self.request_create(key),
            (Ensure::Absent, true) => self.request_destroy(key),
            _ => Ok(()),
        };
        if let Err(e) = requested {
            self.stats.failures += 1;
            return Err(e);
        }
        self.apply(key).await
    }

    async fn destroy(&mut self, key: &ResourceKey, handle: &D::Handle) -> CfgMgrResult<ApplyOutcome> {
        check_destroy_allowed(key)?;

        self.device
            .destroy_instance(handle)
            .await
            .map_err(|e| mutation_error(key, "destroy_instance", e))?;
        self.stats.mutations += 1;

        self.set_current(key, None);
        self.set_state(key, ResourceState::Destroyed);
        self.stats.destroyed += 1;
        info!("Vrf={} is absent.", key);

        Ok(ApplyOutcome::Destroyed)
    }

    async fn create(&mut self, desired: &DesiredResource) -> CfgMgrResult<ApplyOutcome> {
        let key = &desired.key;

        let handle = self
            .device
            .create_instance(key)
            .await
            .map_err(|e| mutation_error(key, "create_instance", e))?;
        self.stats.mutations += 1;
        self.stats.created += 1;
        self.set_state(key, ResourceState::PresentDirty);
        info!("Created OSPF VRF {}", key);

        // A fresh instance reads back as all defaults.
        let baseline = discovery::read_instance(&self.device, key, &handle).await?;
        self.set_current(
            key,
            Some(DiscoveredInstance {
                handle: handle.clone(),
                record: baseline.clone(),
            }),
        );

        let changes = changeset::diff(desired, None, &baseline.defaults);
        let mutations = self.flush(key, &handle, &changes, &baseline).await?;
        self.set_state(key, ResourceState::PresentClean);

        Ok(ApplyOutcome::Created { mutations })
    }

    async fn update(
        &mut self,
        desired: &DesiredResource,
        instance: DiscoveredInstance<D::Handle>,
    ) -> CfgMgrResult<ApplyOutcome> {
        let key = &desired.key;
        let record = &instance.record;

        let changes = changeset::diff(desired, Some(record), &record.defaults);
        if changes.is_empty() {
            debug!("OSPF VRF {} already in sync", key);
            return Ok(ApplyOutcome::Unchanged);
        }

        let mutations = self.flush(key, &instance.handle, &changes, record).await?;
        self.stats.updated += 1;

        Ok(ApplyOutcome::Updated { mutations })
    }

    /// Issues the planned calls for `changes`, then re-reads the instance.
    async fn flush(
        &mut self,
        key: &ResourceKey,
        handle: &D::Handle,
        changes: &ChangeSet,
        baseline: &ResourceRecord,
    ) -> CfgMgrResult<usize> {
        let calls = planner::plan(changes, baseline)?;
        if calls.is_empty() {
            return Ok(0);
        }

        self.set_state(key, ResourceState::PresentDirty);
        for call in &calls {
            debug!("{}: {}", key, call);
            self.issue(key, handle, call).await?;
            self.stats.mutations += 1;
        }
        self.set_state(key, ResourceState::PresentClean);

        self.refresh(key, handle, changes, baseline).await;
        Ok(calls.len())
    }

    async fn issue(&mut self, key: &ResourceKey, handle: &D::Handle, call: &MutationCall) -> CfgMgrResult<()> {
        let result = match call {
            MutationCall::SetProperty { property, value } => {
                self.device.write_property(handle, *property, value).await
            }
            MutationCall::SetCost { value, unit } => self.device.write_cost(handle, *value, *unit).await,
            MutationCall::SetTimerGroup { group, values } => {
                self.device.write_grouped_timers(handle, *group, *values).await
            }
        };
        result.map_err(|e| {
            let operation = match call {
                MutationCall::SetProperty { .. } => "write_property",
                MutationCall::SetCost { .. } => "write_cost",
                MutationCall::SetTimerGroup { .. } => "write_grouped_timers",
            };
            mutation_error(key, operation, e)
        })
    }

    /// Re-reads the instance after an apply and logs the snapshot.
    async fn refresh(
        &mut self,
        key: &ResourceKey,
        handle: &D::Handle,
        changes: &ChangeSet,
        baseline: &ResourceRecord,
    ) {
        let record = match discovery::read_instance(&self.device, key, handle).await {
            Ok(record) => {
                log_snapshot(&record);
                record
            }
            Err(e) => {
                warn!("Could not re-read OSPF VRF {} after apply: {}", key, e);
                let mut record = baseline.clone();
                for (property, value) in changes.iter() {
                    record.properties.insert(property, value.clone());
                }
                record
            }
        };
        self.set_current(
            key,
            Some(DiscoveredInstance {
                handle: handle.clone(),
                record,
            }),
        );
    }
}

/// Rejects removal of the protected `default` VRF.
pub fn check_destroy_allowed(key: &ResourceKey) -> CfgMgrResult<()> {
    if key.is_protected() {
        return Err(CfgMgrError::policy_violation(
            key.to_string(),
            PROTECTED_VRF_MESSAGE,
        ));
    }
    Ok(())
}

fn log_snapshot(record: &ResourceRecord) {
    let mut current = String::new();
    for (field, value) in record.field_values() {
        current.push_str(&format!("\n{:>30}: {}", field, value));
    }
    debug!("{}", current);
}

impl<D: OspfVrfDevice> CfgMgr for OspfVrfMgr<D> {
    fn daemon_name(&self) -> &str {
        "ospfvrfmgrd"
    }

    fn resource_type(&self) -> &str {
        "ospf_vrf"
    }
}

#[async_trait]
impl<D: OspfVrfDevice> ResourceProvider for OspfVrfMgr<D> {
    type Key = ResourceKey;
    type Desired = DesiredResource;
    type Record = ResourceRecord;
    type Outcome = ApplyOutcome;

    #[instrument(skip(self, desired))]
    async fn list_managed_resources(
        &mut self,
        desired: Vec<DesiredResource>,
    ) -> CfgMgrResult<Vec<ResourceRecord>> {
        for spec in &desired {
            spec.validate()?;
        }

        let discovered = discovery::discover_all(&self.device).await?;
        let bindings = binder::bind(desired, discovered.instances, discovered.unit_errors)?;

        self.intents.clear();
        self.states.clear();
        let mut records = Vec::new();
        for (key, binding) in bindings.iter().filter(|(_, b)| b.failure.is_none()) {
            match &binding.current {
                Some(instance) => {
                    self.states.insert(key.clone(), ResourceState::PresentClean);
                    records.push(instance.record.clone());
                }
                None => {
                    self.states.insert(key.clone(), ResourceState::Absent);
                }
            }
        }

        info!(
            "Found {} of {} declared OSPF VRF instances",
            records.len(),
            bindings.len()
        );
        self.bindings = bindings;

        Ok(records)
    }

    fn exists(&self, key: &ResourceKey) -> bool {
        self.bindings
            .get(key)
            .map_or(false, |binding| binding.is_bound())
    }

    fn request_create(&mut self, key: &ResourceKey) -> CfgMgrResult<()> {
        self.binding(key)?;
        self.intents.insert(key.clone(), Ensure::Present);
        Ok(())
    }

    fn request_destroy(&mut self, key: &ResourceKey) -> CfgMgrResult<()> {
        check_destroy_allowed(key)?;
        self.binding(key)?;
        self.intents.insert(key.clone(), Ensure::Absent);
        Ok(())
    }

    #[instrument(skip(self, key), fields(resource = %key))]
    async fn apply(&mut self, key: &ResourceKey) -> CfgMgrResult<ApplyOutcome> {
        let binding = self.binding(key)?;
        let intent = self.effective_intent(binding);
        let desired = binding.desired.clone();
        let current = binding.current.clone();
        let failure = binding.failure.clone();
        self.intents.remove(key);

        if let Some(e) = failure {
            self.stats.failures += 1;
            return Err(e);
        }

        let result = match (intent, current) {
            (Ensure::Absent, None) => Ok(ApplyOutcome::Unchanged),
            (Ensure::Absent, Some(instance)) => self.destroy(key, &instance.handle).await,
            (Ensure::Present, None) => self.create(&desired).await,
            (Ensure::Present, Some(instance)) => self.update(&desired, instance).await,
        };

        if result.is_err() {
            self.stats.failures += 1;
        }
        result
    }
}
