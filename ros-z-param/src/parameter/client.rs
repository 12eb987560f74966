//! Clients for the parameter services of a (usually remote) node.
//!
//! Both flavours issue the same requests. [`SyncParametersClient`] blocks
//! until the response arrives or the client timeout elapses;
//! [`AsyncParametersClient`] sends the request right away and hands back a
//! [`ParameterFuture`].

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use tracing::{debug, trace};
use zenoh::{Result as ZResult, Session, Wait};

use crate::Builder;
use crate::context::GlobalCounter;
use crate::entity::{EndpointEntity, EntityKind, NodeEntity, service_liveliness_pattern};
use crate::error::ServiceError;
use crate::msg::{WithTypeInfo, ZMessage};
use crate::node::ZNode;
use crate::pubsub::{ZSub, ZSubBuilder};
use crate::service::{DEFAULT_SERVICE_TIMEOUT, ZClient, ZResponse};
use crate::topic_name;

use super::error::{ParameterError, Result};
use super::event::{PARAMETER_EVENTS_TOPIC, ParameterEvent};
use super::service::{
    DESCRIBE_PARAMETERS, GET_PARAMETER_TYPES, GET_PARAMETERS, LIST_PARAMETERS, SET_PARAMETERS,
    SET_PARAMETERS_ATOMICALLY,
};
use super::value::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterKind, ParameterType,
    SetParametersResult, extract, extract_or,
};
use super::wire::{
    DescribeParametersRequest, DescribeParametersResponse, DescribeParametersSrv,
    GetParameterTypesRequest, GetParameterTypesResponse, GetParameterTypesSrv,
    GetParametersRequest, GetParametersResponse, GetParametersSrv, ListParametersRequest,
    ListParametersResponse, ListParametersSrv, SetParametersAtomicallyRequest,
    SetParametersAtomicallyResponse, SetParametersAtomicallySrv, SetParametersRequest,
    SetParametersResponse, SetParametersSrv, WireParameterEvent, WireParameterValue,
};

const SERVICES: [&str; 6] = [
    GET_PARAMETERS,
    GET_PARAMETER_TYPES,
    SET_PARAMETERS,
    SET_PARAMETERS_ATOMICALLY,
    LIST_PARAMETERS,
    DESCRIBE_PARAMETERS,
];

const READINESS_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct ParametersClientBuilder<'a> {
    node: &'a ZNode,
    remote_node: String,
    timeout: Duration,
}

impl<'a> ParametersClientBuilder<'a> {
    pub(crate) fn new(node: &'a ZNode) -> Self {
        Self {
            node,
            remote_node: String::new(),
            timeout: DEFAULT_SERVICE_TIMEOUT,
        }
    }

    /// Node whose parameters the client accesses. Relative names resolve in
    /// the calling node's namespace; empty (the default) targets the
    /// calling node itself.
    pub fn with_remote_node<S: Into<String>>(mut self, remote_node: S) -> Self {
        self.remote_node = remote_node.into();
        self
    }

    /// Time a request may take before it fails; defaults to
    /// [`DEFAULT_SERVICE_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_sync(self) -> ZResult<SyncParametersClient> {
        let timeout = self.timeout;
        Ok(SyncParametersClient {
            inner: self.build()?,
            timeout,
        })
    }
}

impl Builder for ParametersClientBuilder<'_> {
    type Output = AsyncParametersClient;

    fn build(self) -> ZResult<AsyncParametersClient> {
        let entity = &self.node.entity;
        let remote_node =
            topic_name::resolve_remote_node(&self.remote_node, &entity.namespace, &entity.name)
                .map_err(|e| zenoh::Error::from(format!("Invalid remote node: {}", e)))?;
        let service = |name: &str| format!("{remote_node}/{name}");
        debug!("[CLN] Parameters client for {}", remote_node);

        let requests = ParameterRequests {
            get: self
                .node
                .create_client::<GetParametersSrv>(&service(GET_PARAMETERS))
                .with_timeout(self.timeout)
                .build()?,
            get_types: self
                .node
                .create_client::<GetParameterTypesSrv>(&service(GET_PARAMETER_TYPES))
                .with_timeout(self.timeout)
                .build()?,
            set: self
                .node
                .create_client::<SetParametersSrv>(&service(SET_PARAMETERS))
                .with_timeout(self.timeout)
                .build()?,
            set_atomically: self
                .node
                .create_client::<SetParametersAtomicallySrv>(&service(SET_PARAMETERS_ATOMICALLY))
                .with_timeout(self.timeout)
                .build()?,
            list: self
                .node
                .create_client::<ListParametersSrv>(&service(LIST_PARAMETERS))
                .with_timeout(self.timeout)
                .build()?,
            describe: self
                .node
                .create_client::<DescribeParametersSrv>(&service(DESCRIBE_PARAMETERS))
                .with_timeout(self.timeout)
                .build()?,
        };

        Ok(AsyncParametersClient {
            node: entity.clone(),
            session: self.node.session().clone(),
            counter: self.node.counter().clone(),
            remote_node,
            requests,
        })
    }
}

/// A request that was sent, plus how to turn its response into a result.
struct Pending<R, T> {
    sent: std::result::Result<ZResponse<R>, ServiceError>,
    map: Box<dyn FnOnce(R) -> Result<T> + Send>,
}

impl<R: ZMessage, T: 'static> Pending<R, T> {
    fn new<F>(sent: std::result::Result<ZResponse<R>, ServiceError>, map: F) -> Self
    where
        F: FnOnce(R) -> Result<T> + Send + 'static,
    {
        Self {
            sent,
            map: Box::new(map),
        }
    }

    fn wait(self, timeout: Duration) -> Result<T> {
        let response = self.sent?.wait(timeout)?;
        (self.map)(response)
    }
}

impl<R: ZMessage, T: Send + 'static> Pending<R, T> {
    fn detach(self) -> ParameterFuture<T> {
        ParameterFuture {
            inner: Box::pin(self.resolve()),
        }
    }

    async fn resolve(self) -> Result<T> {
        let response = self.sent?.recv_async().await?;
        (self.map)(response)
    }
}

/// Result of an asynchronous parameter request.
///
/// The request is already on the wire when the future is created; awaiting
/// only collects the response. Futures of concurrent requests may complete
/// in any order.
#[must_use = "the response is lost unless the future is awaited"]
pub struct ParameterFuture<T> {
    inner: Pin<Box<dyn Future<Output = Result<T>> + Send>>,
}

impl<T> Future for ParameterFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn expect_len<T>(items: Vec<T>, expected: usize) -> Result<Vec<T>> {
    if items.len() == expected {
        Ok(items)
    } else {
        Err(ParameterError::MalformedResponse {
            expected,
            got: items.len(),
        })
    }
}

fn single_value(response: GetParametersResponse) -> Result<WireParameterValue> {
    expect_len(response.values, 1)?
        .pop()
        .ok_or(ParameterError::MalformedResponse {
            expected: 1,
            got: 0,
        })
}

struct ParameterRequests {
    get: ZClient<GetParametersSrv>,
    get_types: ZClient<GetParameterTypesSrv>,
    set: ZClient<SetParametersSrv>,
    set_atomically: ZClient<SetParametersAtomicallySrv>,
    list: ZClient<ListParametersSrv>,
    describe: ZClient<DescribeParametersSrv>,
}

impl ParameterRequests {
    fn get_parameters(&self, names: &[&str]) -> Pending<GetParametersResponse, Vec<Parameter>> {
        let names = owned(names);
        let sent = self.get.send_request(&GetParametersRequest {
            names: names.clone(),
        });
        Pending::new(sent, move |response| {
            let values = expect_len(response.values, names.len())?;
            Ok(names
                .into_iter()
                .zip(values)
                .map(|(name, value)| Parameter {
                    name,
                    value: value.into(),
                })
                .collect())
        })
    }

    fn get_parameter<T>(&self, name: &str) -> Pending<GetParametersResponse, T>
    where
        T: ParameterKind + Send + 'static,
    {
        let name = name.to_string();
        let sent = self.get.send_request(&GetParametersRequest {
            names: vec![name.clone()],
        });
        Pending::new(sent, move |response| {
            extract(&name, single_value(response)?.into())
        })
    }

    fn get_parameter_or<T>(&self, name: &str, default: T) -> Pending<GetParametersResponse, T>
    where
        T: ParameterKind + Send + 'static,
    {
        let name = name.to_string();
        let sent = self.get.send_request(&GetParametersRequest {
            names: vec![name.clone()],
        });
        Pending::new(sent, move |response| {
            extract_or(&name, single_value(response)?.into(), default)
        })
    }

    fn get_parameter_types(
        &self,
        names: &[&str],
    ) -> Pending<GetParameterTypesResponse, Vec<ParameterType>> {
        let expected = names.len();
        let sent = self.get_types.send_request(&GetParameterTypesRequest {
            names: owned(names),
        });
        Pending::new(sent, move |response| {
            Ok(expect_len(response.types, expected)?
                .into_iter()
                .map(ParameterType::from)
                .collect())
        })
    }

    fn set_parameters(
        &self,
        parameters: Vec<Parameter>,
    ) -> Pending<SetParametersResponse, Vec<SetParametersResult>> {
        let expected = parameters.len();
        let sent = self.set.send_request(&SetParametersRequest {
            parameters: parameters.into_iter().map(Into::into).collect(),
        });
        Pending::new(sent, move |response| {
            Ok(expect_len(response.results, expected)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
    }

    fn set_parameters_atomically(
        &self,
        parameters: Vec<Parameter>,
    ) -> Pending<SetParametersAtomicallyResponse, SetParametersResult> {
        let sent = self
            .set_atomically
            .send_request(&SetParametersAtomicallyRequest {
                parameters: parameters.into_iter().map(Into::into).collect(),
            });
        Pending::new(sent, |response| Ok(response.result.into()))
    }

    fn list_parameters(
        &self,
        prefixes: &[&str],
        depth: u64,
    ) -> Pending<ListParametersResponse, ListParametersResult> {
        let sent = self.list.send_request(&ListParametersRequest {
            prefixes: owned(prefixes),
            depth,
        });
        Pending::new(sent, |response| Ok(response.result.into()))
    }

    fn has_parameter(&self, name: &str) -> Pending<ListParametersResponse, bool> {
        let name = name.to_string();
        let sent = self.list.send_request(&ListParametersRequest {
            prefixes: vec![name.clone()],
            depth: 1,
        });
        Pending::new(sent, move |response| {
            Ok(response.result.names.iter().any(|n| *n == name))
        })
    }

    fn describe_parameters(
        &self,
        names: &[&str],
    ) -> Pending<DescribeParametersResponse, Vec<ParameterDescriptor>> {
        let expected = names.len();
        let sent = self.describe.send_request(&DescribeParametersRequest {
            names: owned(names),
        });
        Pending::new(sent, move |response| {
            Ok(expect_len(response.descriptors, expected)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
    }
}

pub struct AsyncParametersClient {
    node: NodeEntity,
    session: Arc<Session>,
    counter: Arc<GlobalCounter>,
    remote_node: String,
    requests: ParameterRequests,
}

impl AsyncParametersClient {
    /// Fully-qualified name of the node this client talks to.
    pub fn remote_node(&self) -> &str {
        &self.remote_node
    }

    /// Values in request order; absent names come back as `NotSet`.
    pub fn get_parameters(&self, names: &[&str]) -> ParameterFuture<Vec<Parameter>> {
        self.requests.get_parameters(names).detach()
    }

    pub fn get_parameter<T>(&self, name: &str) -> ParameterFuture<T>
    where
        T: ParameterKind + Send + 'static,
    {
        self.requests.get_parameter(name).detach()
    }

    pub fn get_parameter_or<T>(&self, name: &str, default: T) -> ParameterFuture<T>
    where
        T: ParameterKind + Send + 'static,
    {
        self.requests.get_parameter_or(name, default).detach()
    }

    pub fn get_parameter_types(&self, names: &[&str]) -> ParameterFuture<Vec<ParameterType>> {
        self.requests.get_parameter_types(names).detach()
    }

    pub fn set_parameters(
        &self,
        parameters: Vec<Parameter>,
    ) -> ParameterFuture<Vec<SetParametersResult>> {
        self.requests.set_parameters(parameters).detach()
    }

    pub fn set_parameters_atomically(
        &self,
        parameters: Vec<Parameter>,
    ) -> ParameterFuture<SetParametersResult> {
        self.requests.set_parameters_atomically(parameters).detach()
    }

    pub fn list_parameters(
        &self,
        prefixes: &[&str],
        depth: u64,
    ) -> ParameterFuture<ListParametersResult> {
        self.requests.list_parameters(prefixes, depth).detach()
    }

    pub fn has_parameter(&self, name: &str) -> ParameterFuture<bool> {
        self.requests.has_parameter(name).detach()
    }

    pub fn describe_parameters(&self, names: &[&str]) -> ParameterFuture<Vec<ParameterDescriptor>> {
        self.requests.describe_parameters(names).detach()
    }

    fn service_names(&self) -> impl Iterator<Item = String> + '_ {
        SERVICES
            .iter()
            .map(move |service| format!("{}/{}", self.remote_node, service))
    }

    /// Whether every parameter service of the remote node is discoverable.
    pub async fn service_is_ready(&self) -> bool {
        for service in self.service_names() {
            match probe_service_async(&self.session, self.node.domain_id, &service).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    debug!("[CLN] Liveliness query for {} failed: {}", service, e);
                    return false;
                }
            }
        }
        true
    }

    /// Wait until the remote parameter services are discoverable or
    /// `timeout` elapses. Returns whether they became ready.
    pub async fn wait_for_service(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.service_is_ready().await {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("[CLN] {} not ready after {:?}", self.remote_node, timeout);
                return false;
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Deliver every parameter event of the remote node to `callback`.
    ///
    /// The subscription lives as long as the returned handle.
    pub fn on_parameter_event<F>(&self, callback: F) -> ZResult<ZSub<WireParameterEvent>>
    where
        F: Fn(ParameterEvent) + Send + Sync + 'static,
    {
        let builder: ZSubBuilder<WireParameterEvent> = ZSubBuilder {
            entity: EndpointEntity {
                id: self.counter.increment(),
                node: self.node.clone(),
                kind: EntityKind::Subscription,
                topic: PARAMETER_EVENTS_TOPIC.to_string(),
                type_info: Some(WireParameterEvent::type_info()),
            },
            session: self.session.clone(),
            _phantom_data: Default::default(),
        };
        let remote_node = self.remote_node.clone();
        builder.build_with_callback(move |event| {
            if event.node == remote_node {
                callback(event.into());
            } else {
                trace!("[CLN] Ignoring parameter event of {}", event.node);
            }
        })
    }
}

fn probe_service(session: &Session, domain_id: usize, service: &str) -> ZResult<bool> {
    let pattern = service_liveliness_pattern(domain_id, service)?;
    let replies = session
        .liveliness()
        .get(&pattern)
        .timeout(READINESS_PROBE_TIMEOUT)
        .wait()?;
    while let Ok(reply) = replies.recv() {
        if reply.into_result().is_ok() {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn probe_service_async(
    session: &Session,
    domain_id: usize,
    service: &str,
) -> ZResult<bool> {
    let pattern = service_liveliness_pattern(domain_id, service)?;
    let replies = session
        .liveliness()
        .get(&pattern)
        .timeout(READINESS_PROBE_TIMEOUT)
        .await?;
    while let Ok(reply) = replies.recv_async().await {
        if reply.into_result().is_ok() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Blocking flavour of [`AsyncParametersClient`].
pub struct SyncParametersClient {
    inner: AsyncParametersClient,
    timeout: Duration,
}

impl SyncParametersClient {
    pub fn remote_node(&self) -> &str {
        self.inner.remote_node()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The asynchronous client this one wraps.
    pub fn as_async(&self) -> &AsyncParametersClient {
        &self.inner
    }

    pub fn get_parameters(&self, names: &[&str]) -> Result<Vec<Parameter>> {
        self.inner.requests.get_parameters(names).wait(self.timeout)
    }

    /// Fails with `NotFound` if `name` is unset and `TypeMismatch` if it
    /// holds another type than `T`.
    pub fn get_parameter<T>(&self, name: &str) -> Result<T>
    where
        T: ParameterKind + Send + 'static,
    {
        self.inner.requests.get_parameter(name).wait(self.timeout)
    }

    /// Like [`get_parameter`](Self::get_parameter), with `default` standing
    /// in for an unset name.
    pub fn get_parameter_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: ParameterKind + Send + 'static,
    {
        self.inner
            .requests
            .get_parameter_or(name, default)
            .wait(self.timeout)
    }

    pub fn get_parameter_types(&self, names: &[&str]) -> Result<Vec<ParameterType>> {
        self.inner
            .requests
            .get_parameter_types(names)
            .wait(self.timeout)
    }

    pub fn set_parameters(&self, parameters: Vec<Parameter>) -> Result<Vec<SetParametersResult>> {
        self.inner
            .requests
            .set_parameters(parameters)
            .wait(self.timeout)
    }

    pub fn set_parameters_atomically(
        &self,
        parameters: Vec<Parameter>,
    ) -> Result<SetParametersResult> {
        self.inner
            .requests
            .set_parameters_atomically(parameters)
            .wait(self.timeout)
    }

    pub fn list_parameters(&self, prefixes: &[&str], depth: u64) -> Result<ListParametersResult> {
        self.inner
            .requests
            .list_parameters(prefixes, depth)
            .wait(self.timeout)
    }

    pub fn has_parameter(&self, name: &str) -> Result<bool> {
        self.inner.requests.has_parameter(name).wait(self.timeout)
    }

    pub fn describe_parameters(&self, names: &[&str]) -> Result<Vec<ParameterDescriptor>> {
        self.inner
            .requests
            .describe_parameters(names)
            .wait(self.timeout)
    }

    /// Whether every parameter service of the remote node is discoverable.
    /// Blocks for up to one liveliness query per service.
    pub fn service_is_ready(&self) -> bool {
        let inner = &self.inner;
        inner.service_names().all(|service| {
            match probe_service(&inner.session, inner.node.domain_id, &service) {
                Ok(ready) => ready,
                Err(e) => {
                    debug!("[CLN] Liveliness query for {} failed: {}", service, e);
                    false
                }
            }
        })
    }

    /// Block until the remote parameter services are discoverable or
    /// `timeout` elapses. Returns whether they became ready.
    pub fn wait_for_service(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.service_is_ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("[CLN] {} not ready after {:?}", self.remote_node(), timeout);
                return false;
            }
            std::thread::sleep(READINESS_POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn on_parameter_event<F>(&self, callback: F) -> ZResult<ZSub<WireParameterEvent>>
    where
        F: Fn(ParameterEvent) + Send + Sync + 'static,
    {
        self.inner.on_parameter_event(callback)
    }
}
