//! The parameter state of one node, shared between the node handle and its
//! parameter service.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, warn};

use crate::pubsub::ZPub;

use super::error::Result;
use super::event::ParameterEvent;
use super::store::{ParameterChange, ParameterStore};
use super::value::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterKind, ParameterType,
    ParameterValue, SetParametersResult,
};
use super::wire::WireParameterEvent;

type SetCallback = Arc<dyn Fn(&[Parameter]) -> SetParametersResult + Send + Sync>;

pub struct SharedParameters {
    node_fqn: String,
    store: RwLock<ParameterStore>,
    on_set: RwLock<Option<SetCallback>>,
    events: ZPub<WireParameterEvent>,
}

impl SharedParameters {
    pub(crate) fn new(
        node_fqn: String,
        store: ParameterStore,
        events: ZPub<WireParameterEvent>,
    ) -> Self {
        Self {
            node_fqn,
            store: RwLock::new(store),
            on_set: RwLock::new(None),
            events,
        }
    }

    pub fn node_fqn(&self) -> &str {
        &self.node_fqn
    }

    /// Install a validator run on every set request after the built-in
    /// checks. It receives the entries that passed them; a failure rejects
    /// the whole request, so nothing is committed.
    ///
    /// The callback runs while the store is held for update: it may read
    /// parameters but must not set them.
    pub fn on_set_parameters<F>(&self, callback: F)
    where
        F: Fn(&[Parameter]) -> SetParametersResult + Send + Sync + 'static,
    {
        *self.on_set.write() = Some(Arc::new(callback));
    }

    pub fn declare(
        &self,
        name: &str,
        default: ParameterValue,
        descriptor: ParameterDescriptor,
    ) -> Result<ParameterValue> {
        let mut store = self.store.write();
        let existed = store.has(name);
        let value = store.declare(name, default, descriptor)?;
        drop(store);

        if !existed && value.is_set() {
            let mut event = ParameterEvent::new(self.node_fqn.clone());
            event.new_parameters.push(Parameter {
                name: name.to_string(),
                value: value.clone(),
            });
            self.publish(event);
        }
        Ok(value)
    }

    pub fn get(&self, name: &str) -> Result<Parameter> {
        self.store.read().get(name)
    }

    pub fn get_as<T: ParameterKind>(&self, name: &str) -> Result<T> {
        self.store.read().get_as(name)
    }

    pub fn get_or<T: ParameterKind>(&self, name: &str, default: T) -> Result<T> {
        self.store.read().get_or(name, default)
    }

    pub fn has(&self, name: &str) -> bool {
        self.store.read().has(name)
    }

    pub fn get_many(&self, names: &[String]) -> Vec<ParameterValue> {
        self.store.read().get_many(names)
    }

    pub fn get_types(&self, names: &[String]) -> Vec<ParameterType> {
        self.store.read().get_types(names)
    }

    pub fn describe(&self, names: &[String]) -> Vec<ParameterDescriptor> {
        self.store.read().describe(names)
    }

    pub fn list(&self, prefixes: &[String], depth: u64) -> ListParametersResult {
        self.store.read().list(prefixes, depth)
    }

    /// Set every parameter independently; one result per input, in order.
    pub fn set(&self, params: &[Parameter]) -> Vec<SetParametersResult> {
        self.apply(params, false)
    }

    /// Set all of `params` or none of them.
    pub fn set_atomically(&self, params: &[Parameter]) -> SetParametersResult {
        self.apply(params, true)
            .into_iter()
            .find(|r| !r.successful)
            .unwrap_or_else(SetParametersResult::success)
    }

    fn apply(&self, params: &[Parameter], atomic: bool) -> Vec<SetParametersResult> {
        let store = self.store.upgradable_read();

        let results: Vec<SetParametersResult> = params
            .iter()
            .map(|param| match store.validate(param) {
                Ok(()) => SetParametersResult::success(),
                Err(reason) => SetParametersResult::failure(reason),
            })
            .collect();

        if atomic && results.iter().any(|r| !r.successful) {
            return results;
        }

        // The callback sees every entry that passed the built-in checks.
        let accepted: Vec<Parameter> = params
            .iter()
            .zip(&results)
            .filter(|(_, r)| r.successful)
            .map(|(p, _)| p.clone())
            .collect();
        let callback = self.on_set.read().clone();
        if let Some(callback) = callback.filter(|_| !accepted.is_empty()) {
            let verdict = callback(&accepted);
            if !verdict.successful {
                debug!("[PARAMS] Set request rejected by callback: {}", verdict.reason);
                return results
                    .into_iter()
                    .map(|r| if r.successful { verdict.clone() } else { r })
                    .collect();
            }
        }

        let mut store = RwLockUpgradableReadGuard::upgrade(store);
        let mut event = ParameterEvent::new(self.node_fqn.clone());
        for (param, result) in params.iter().zip(&results) {
            if !result.successful {
                continue;
            }
            match store.commit(param) {
                ParameterChange::New => event.new_parameters.push(param.clone()),
                ParameterChange::Changed => event.changed_parameters.push(param.clone()),
                ParameterChange::Deleted => event.deleted_parameters.push(param.clone()),
                ParameterChange::Unchanged => {}
            }
        }
        drop(store);

        if !event.is_empty() {
            self.publish(event);
        }
        results
    }

    fn publish(&self, event: ParameterEvent) {
        debug!(
            "[PARAMS] {}: {} new, {} changed, {} deleted",
            event.node,
            event.new_parameters.len(),
            event.changed_parameters.len(),
            event.deleted_parameters.len()
        );
        let wire: WireParameterEvent = event.into();
        if let Err(e) = self.events.publish(&wire) {
            warn!("[PARAMS] Failed to publish parameter event: {}", e);
        }
    }
}
