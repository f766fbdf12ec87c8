//! Per-resource lifecycle tracking for one provisioning run
//!
//! Every resource the provisioner touches gets a record that follows
//! `Declared → Submitting → Ready | Failed`. Ready records keep the provider
//! handle so dependents can be created against it; failed records keep the
//! provider's rejection reason.

use crate::graph::ResourceRef;
use crate::provider::{ComputeCluster, LoadBalancer, ManagedService, TargetGroup};
use stackline_common::{ResourceKind, ResourceState, ValidationError};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// Provider handle of a ready resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceHandle {
    Cluster(ComputeCluster),
    LoadBalancer(LoadBalancer),
    TargetGroup(TargetGroup),
    Service(ManagedService),
}

impl ResourceHandle {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceHandle::Cluster(_) => ResourceKind::Cluster,
            ResourceHandle::LoadBalancer(_) => ResourceKind::LoadBalancer,
            ResourceHandle::TargetGroup(_) => ResourceKind::TargetGroup,
            ResourceHandle::Service(_) => ResourceKind::Service,
        }
    }

    /// Provider identifier
    pub fn arn(&self) -> &str {
        match self {
            ResourceHandle::Cluster(c) => &c.arn,
            ResourceHandle::LoadBalancer(lb) => &lb.arn,
            ResourceHandle::TargetGroup(tg) => &tg.arn,
            ResourceHandle::Service(s) => &s.arn,
        }
    }
}

/// A provider handle type the ledger can store
pub trait Tracked: Clone + Sized {
    const KIND: ResourceKind;

    fn into_handle(self) -> ResourceHandle;

    fn from_handle(handle: &ResourceHandle) -> Option<Self>;
}

macro_rules! tracked {
    ($ty:ty, $variant:ident) => {
        impl Tracked for $ty {
            const KIND: ResourceKind = ResourceKind::$variant;

            fn into_handle(self) -> ResourceHandle {
                ResourceHandle::$variant(self)
            }

            fn from_handle(handle: &ResourceHandle) -> Option<Self> {
                match handle {
                    ResourceHandle::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

tracked!(ComputeCluster, Cluster);
tracked!(LoadBalancer, LoadBalancer);
tracked!(TargetGroup, TargetGroup);
tracked!(ManagedService, Service);

/// Lifecycle record of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub resource: ResourceRef,
    pub state: ResourceState,
    pub handle: Option<ResourceHandle>,
    /// Provider rejection reason, verbatim
    pub failure: Option<String>,
}

/// Thread-safe map of resource records
#[derive(Debug, Default)]
pub struct ResourceLedger {
    records: Mutex<BTreeMap<ResourceRef, ResourceRecord>>,
    /// (load balancer, listener port) -> target group forwarded to
    listeners: Mutex<BTreeMap<(String, u16), String>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; resources never seen are `Declared`
    pub fn state(&self, kind: ResourceKind, name: &str) -> ResourceState {
        self.with_record(kind, name, |r| r.state)
            .unwrap_or_default()
    }

    /// Handle of a ready resource
    pub fn ready<T: Tracked>(&self, name: &str) -> Option<T> {
        self.with_record(T::KIND, name, |r| match r.state {
            ResourceState::Ready => r.handle.as_ref().and_then(T::from_handle),
            _ => None,
        })
        .flatten()
    }

    /// Failure reason of a failed resource
    pub fn failure(&self, kind: ResourceKind, name: &str) -> Option<String> {
        self.with_record(kind, name, |r| r.failure.clone()).flatten()
    }

    /// Claim a resource for creation.
    ///
    /// Returns `Ok(None)` after moving the resource to `Submitting`; the
    /// caller must then [`complete`](Self::complete) or [`fail`](Self::fail)
    /// it. A ready resource is returned for reuse. Failed resources are
    /// refused and a resource already in flight is reported as not ready.
    pub fn begin<T: Tracked>(&self, name: &str) -> Result<Option<T>, ValidationError> {
        let kind = T::KIND;
        let mut records = self.lock();
        let key = ResourceRef::new(kind, name);
        let record = records.entry(key.clone()).or_insert_with(|| ResourceRecord {
            resource: key,
            state: ResourceState::Declared,
            handle: None,
            failure: None,
        });

        match record.state {
            ResourceState::Declared => {
                record.state = ResourceState::Submitting;
                debug!(kind = %kind, name, "Submitting");
                Ok(None)
            }
            ResourceState::Ready => record
                .handle
                .as_ref()
                .and_then(T::from_handle)
                .map(Some)
                .ok_or_else(|| ValidationError::NotReady {
                    kind,
                    name: name.to_string(),
                    state: record.state,
                }),
            ResourceState::Failed => Err(ValidationError::AlreadyFailed {
                kind,
                name: name.to_string(),
            }),
            ResourceState::Submitting => Err(ValidationError::NotReady {
                kind,
                name: name.to_string(),
                state: record.state,
            }),
        }
    }

    /// Mark a submitting resource ready
    pub fn complete<T: Tracked>(&self, name: &str, value: T) {
        self.transition(T::KIND, name, ResourceState::Ready, |record| {
            record.handle = Some(value.into_handle());
        });
    }

    /// Mark a submitting resource failed, keeping the provider's reason
    pub fn fail(&self, kind: ResourceKind, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        self.transition(kind, name, ResourceState::Failed, |record| {
            record.failure = Some(reason);
        });
    }

    /// Replace the handle of a ready resource (e.g. after scaling)
    pub fn update<T: Tracked>(&self, name: &str, value: T) {
        let mut records = self.lock();
        if let Some(record) = records.get_mut(&ResourceRef::new(T::KIND, name)) {
            if record.state == ResourceState::Ready {
                record.handle = Some(value.into_handle());
            }
        }
    }

    /// Copy of every record, ordered by kind then name
    pub fn snapshot(&self) -> Vec<ResourceRecord> {
        self.lock().values().cloned().collect()
    }

    fn transition(
        &self,
        kind: ResourceKind,
        name: &str,
        next: ResourceState,
        apply: impl FnOnce(&mut ResourceRecord),
    ) {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&ResourceRef::new(kind, name)) else {
            return;
        };
        if record.state.can_transition_to(next) {
            debug!(kind = %kind, name, from = %record.state, to = %next, "State transition");
            record.state = next;
            apply(record);
        }
    }

    /// Reserve `port` on `load_balancer` for `target_group`.
    ///
    /// Claiming the same port again for the same target group is a no-op.
    pub fn claim_listener(
        &self,
        load_balancer: &str,
        port: u16,
        target_group: &str,
    ) -> Result<(), ValidationError> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let existing = listeners
            .entry((load_balancer.to_string(), port))
            .or_insert_with(|| target_group.to_string());
        if existing.as_str() != target_group {
            return Err(ValidationError::DuplicateListener {
                load_balancer: load_balancer.to_string(),
                port,
                target_group: target_group.to_string(),
                existing: existing.clone(),
            });
        }
        Ok(())
    }

    fn with_record<T>(
        &self,
        kind: ResourceKind,
        name: &str,
        f: impl FnOnce(&ResourceRecord) -> T,
    ) -> Option<T> {
        self.lock().get(&ResourceRef::new(kind, name)).map(f)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ResourceRef, ResourceRecord>> {
        // Every mutation is a single assignment; a poisoned map is still consistent
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
