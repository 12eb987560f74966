use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use zenoh::liveliness::LivelinessToken;
use zenoh::{Result, Session, Wait};

use crate::{
    Builder,
    context::GlobalCounter,
    entity::*,
    msg::{ServiceTypeInfo, WithTypeInfo, ZMessage, ZService},
    parameter::{
        self, ListParametersResult, Parameter, ParameterDescriptor, ParameterKind,
        ParameterServiceBuilder, ParameterStore, ParameterValue, ParametersClientBuilder,
        SetParametersResult, SharedParameters, error::ParameterError,
        event::PARAMETER_EVENTS_TOPIC, wire::WireParameterEvent,
    },
    pubsub::{ZPubBuilder, ZSubBuilder},
    service::{DEFAULT_SERVICE_TIMEOUT, ZClientBuilder, ZServerBuilder},
};

pub struct ZNode {
    pub entity: NodeEntity,
    session: Arc<Session>,
    counter: Arc<GlobalCounter>,
    parameters: Arc<SharedParameters>,
    _lv_token: LivelinessToken,
}

pub struct ZNodeBuilder {
    pub domain_id: usize,
    pub name: String,
    pub namespace: String,
    pub session: Arc<Session>,
    pub counter: Arc<GlobalCounter>,
    parameter_overrides: HashMap<String, ParameterValue>,
    parameter_file: Option<PathBuf>,
}

impl ZNodeBuilder {
    pub(crate) fn new(
        domain_id: usize,
        name: &str,
        session: Arc<Session>,
        counter: Arc<GlobalCounter>,
    ) -> Self {
        Self {
            domain_id,
            name: name.to_owned(),
            namespace: String::new(),
            session,
            counter,
            parameter_overrides: HashMap::new(),
            parameter_file: None,
        }
    }

    pub fn with_namespace<S: AsRef<str>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.as_ref().to_owned();
        self
    }

    /// Initial parameter values. They take precedence over the parameter
    /// file and over defaults given to `declare_parameter`.
    pub fn with_parameter_overrides<I, S, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<ParameterValue>,
    {
        self.parameter_overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Load initial parameter values from a YAML parameter file.
    pub fn with_parameter_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.parameter_file = Some(path.into());
        self
    }
}

impl Builder for ZNodeBuilder {
    type Output = ZNode;

    fn build(self) -> Result<ZNode> {
        let id = self.counter.increment();
        let node = NodeEntity::new(
            self.domain_id,
            self.session.zid(),
            id,
            self.name,
            self.namespace,
        );
        let fqn = node.fqn();

        let mut overrides = match &self.parameter_file {
            Some(path) => parameter::load_parameter_file(path, &fqn)?,
            None => HashMap::new(),
        };
        overrides.extend(self.parameter_overrides);
        debug!("[NOD] {}: {} parameter override(s)", fqn, overrides.len());

        let events = ZPubBuilder::<WireParameterEvent> {
            entity: EndpointEntity {
                id: self.counter.increment(),
                node: node.clone(),
                kind: EntityKind::Publisher,
                topic: PARAMETER_EVENTS_TOPIC.to_string(),
                type_info: Some(WireParameterEvent::type_info()),
            },
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
        .build()?;

        let lv_token = self
            .session
            .liveliness()
            .declare_token(node.lv_token_key_expr()?)
            .wait()?;
        debug!("[NOD] Node up: {}", fqn);

        Ok(ZNode {
            entity: node,
            session: self.session,
            counter: self.counter,
            parameters: Arc::new(SharedParameters::new(
                fqn,
                ParameterStore::with_overrides(overrides),
                events,
            )),
            _lv_token: lv_token,
        })
    }
}

impl ZNode {
    pub fn fqn(&self) -> String {
        self.entity.fqn()
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub(crate) fn counter(&self) -> &Arc<GlobalCounter> {
        &self.counter
    }

    pub fn parameters(&self) -> &Arc<SharedParameters> {
        &self.parameters
    }

    fn endpoint(&self, topic: &str, kind: EntityKind, type_info: TypeInfo) -> EndpointEntity {
        EndpointEntity {
            id: self.counter.increment(),
            node: self.entity.clone(),
            kind,
            topic: topic.to_string(),
            type_info: Some(type_info),
        }
    }

    pub fn create_pub<T>(&self, topic: &str) -> ZPubBuilder<T>
    where
        T: ZMessage + WithTypeInfo,
    {
        ZPubBuilder {
            entity: self.endpoint(topic, EntityKind::Publisher, T::type_info()),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    pub fn create_sub<T>(&self, topic: &str) -> ZSubBuilder<T>
    where
        T: ZMessage + WithTypeInfo,
    {
        ZSubBuilder {
            entity: self.endpoint(topic, EntityKind::Subscription, T::type_info()),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    pub fn create_service<T>(&self, service: &str) -> ZServerBuilder<T>
    where
        T: ZService + ServiceTypeInfo,
    {
        ZServerBuilder {
            entity: self.endpoint(service, EntityKind::Service, T::service_type_info()),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    pub fn create_client<T>(&self, service: &str) -> ZClientBuilder<T>
    where
        T: ZService + ServiceTypeInfo,
    {
        ZClientBuilder {
            entity: self.endpoint(service, EntityKind::Client, T::service_type_info()),
            session: self.session.clone(),
            timeout: DEFAULT_SERVICE_TIMEOUT,
            _phantom_data: Default::default(),
        }
    }

    /// Expose this node's parameters to other nodes.
    pub fn create_parameter_service(&self) -> ParameterServiceBuilder<'_> {
        ParameterServiceBuilder { node: self }
    }

    /// A client for the parameters of this node, or of another node once
    /// [`with_remote_node`](ParametersClientBuilder::with_remote_node) is set.
    pub fn create_parameters_client(&self) -> ParametersClientBuilder<'_> {
        ParametersClientBuilder::new(self)
    }

    /// Declare `name` with a default value and return the effective value.
    pub fn declare_parameter<V: Into<ParameterValue>>(
        &self,
        name: &str,
        default: V,
    ) -> std::result::Result<ParameterValue, ParameterError> {
        self.parameters
            .declare(name, default.into(), ParameterDescriptor::default())
    }

    pub fn declare_parameter_with_descriptor<V: Into<ParameterValue>>(
        &self,
        name: &str,
        default: V,
        descriptor: ParameterDescriptor,
    ) -> std::result::Result<ParameterValue, ParameterError> {
        self.parameters.declare(name, default.into(), descriptor)
    }

    pub fn set_parameters(&self, parameters: Vec<Parameter>) -> Vec<SetParametersResult> {
        self.parameters.set(&parameters)
    }

    pub fn set_parameters_atomically(&self, parameters: Vec<Parameter>) -> SetParametersResult {
        self.parameters.set_atomically(&parameters)
    }

    pub fn get_parameter(&self, name: &str) -> std::result::Result<Parameter, ParameterError> {
        self.parameters.get(name)
    }

    /// `Ok(None)` when `name` is unset, `TypeMismatch` when it holds another
    /// type than `T`.
    pub fn get_parameter_as<T: ParameterKind>(
        &self,
        name: &str,
    ) -> std::result::Result<Option<T>, ParameterError> {
        match self.parameters.get_as(name) {
            Ok(value) => Ok(Some(value)),
            Err(ParameterError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_parameter_or<T: ParameterKind>(
        &self,
        name: &str,
        default: T,
    ) -> std::result::Result<T, ParameterError> {
        self.parameters.get_or(name, default)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.has(name)
    }

    pub fn list_parameters(&self, prefixes: &[&str], depth: u64) -> ListParametersResult {
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        self.parameters.list(&prefixes, depth)
    }

    pub fn describe_parameters(&self, names: &[&str]) -> Vec<ParameterDescriptor> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.parameters.describe(&names)
    }

    /// See [`SharedParameters::on_set_parameters`].
    pub fn on_set_parameters<F>(&self, callback: F)
    where
        F: Fn(&[Parameter]) -> SetParametersResult + Send + Sync + 'static,
    {
        self.parameters.on_set_parameters(callback);
    }
}
