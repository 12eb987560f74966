use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering::AcqRel},
    },
    time::Duration,
};

use tracing::{debug, trace, warn};
use zenoh::{
    Result, Session, Wait, key_expr::KeyExpr, liveliness::LivelinessToken, query::Query,
};

use crate::{
    Builder,
    attachment::{Attachment, GidArray},
    entity::EndpointEntity,
    error::ServiceError,
    msg::{ZMessage, ZService},
    topic_name,
};

/// Default time a client waits for a response.
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(5);

fn qualify(entity: &mut EndpointEntity) -> Result<KeyExpr<'static>> {
    entity.topic =
        topic_name::qualify_service_name(&entity.topic, &entity.node.namespace, &entity.node.name)
            .map_err(|e| zenoh::Error::from(format!("Failed to qualify service: {}", e)))?;
    entity.topic_key_expr()
}

#[derive(Debug)]
pub struct ZClientBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub timeout: Duration,
    pub _phantom_data: PhantomData<T>,
}

impl<T> ZClientBuilder<T> {
    /// Transport-level deadline for every request issued by the client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ZClient<T: ZService> {
    service: String,
    sn: AtomicUsize,
    gid: GidArray,
    timeout: Duration,
    inner: zenoh::query::Querier<'static>,
    _lv_token: LivelinessToken,
    _phantom_data: PhantomData<T>,
}

impl<T> Builder for ZClientBuilder<T>
where
    T: ZService,
{
    type Output = ZClient<T>;

    fn build(mut self) -> Result<Self::Output> {
        let key_expr = qualify(&mut self.entity)?;
        debug!("[CLN] KE: {key_expr}");

        let inner = self
            .session
            .declare_querier(key_expr)
            .timeout(self.timeout)
            .wait()?;
        let lv_token = self
            .session
            .liveliness()
            .declare_token(self.entity.lv_token_key_expr()?)
            .wait()?;
        Ok(ZClient {
            service: self.entity.topic.clone(),
            sn: AtomicUsize::new(1), // Start at 1 for ROS compatibility
            gid: self.entity.gid(),
            timeout: self.timeout,
            inner,
            _lv_token: lv_token,
            _phantom_data: Default::default(),
        })
    }
}

type ReplyPayload = std::result::Result<Vec<u8>, String>;

/// A request in flight. Resolve it by blocking with [`ZResponse::wait`] or
/// by awaiting [`ZResponse::recv_async`].
#[must_use = "a request is only observed through its response"]
pub struct ZResponse<R> {
    service: String,
    sn: i64,
    rx: flume::Receiver<ReplyPayload>,
    _phantom_data: PhantomData<R>,
}

impl<R: ZMessage> ZResponse<R> {
    pub fn sequence_number(&self) -> i64 {
        self.sn
    }

    fn decode(&self, reply: ReplyPayload) -> std::result::Result<R, ServiceError> {
        match reply {
            Ok(bytes) => Ok(R::deserialize(&bytes)?),
            Err(reason) => Err(ServiceError::Remote {
                service: self.service.clone(),
                reason,
            }),
        }
    }

    /// Block the calling thread until the response arrives or `timeout` elapses.
    pub fn wait(self, timeout: Duration) -> std::result::Result<R, ServiceError> {
        match self.rx.recv_timeout(timeout) {
            Ok(reply) => self.decode(reply),
            Err(flume::RecvTimeoutError::Timeout) => Err(ServiceError::Timeout {
                service: self.service,
                timeout,
            }),
            Err(flume::RecvTimeoutError::Disconnected) => {
                Err(ServiceError::NoResponse(self.service))
            }
        }
    }

    /// Await the response. Resolves with [`ServiceError::NoResponse`] once
    /// the transport gives up on the query.
    pub async fn recv_async(self) -> std::result::Result<R, ServiceError> {
        match self.rx.recv_async().await {
            Ok(reply) => self.decode(reply),
            Err(_) => Err(ServiceError::NoResponse(self.service)),
        }
    }
}

impl<T> ZClient<T>
where
    T: ZService,
{
    fn new_attachment(&self) -> Attachment {
        Attachment::new(self.sn.fetch_add(1, AcqRel) as _, self.gid)
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request without waiting for its response.
    ///
    /// Every call gets its own reply channel, so concurrent requests on the
    /// same client never observe each other's responses.
    pub fn send_request(
        &self,
        msg: &T::Request,
    ) -> std::result::Result<ZResponse<T::Response>, ServiceError> {
        let payload = msg.serialize()?;
        let attachment = self.new_attachment();
        let sn = attachment.sequence_number;
        let (tx, rx) = flume::bounded(1);
        let service = self.service.clone();
        trace!("[CLN] Sending request sn={} to {}", sn, service);
        self.inner
            .get()
            .payload(payload)
            .attachment(attachment)
            .callback(move |reply| {
                let payload = match reply.into_result() {
                    Ok(sample) => Ok(sample.payload().to_bytes().into_owned()),
                    Err(err) => {
                        let reason = err.payload().try_to_string().map(|s| s.into_owned());
                        warn!("[CLN] Error reply from {}: {:?}", service, reason);
                        Err(reason.unwrap_or_else(|_| "undecodable error reply".to_string()))
                    }
                };
                let _ = tx.try_send(payload);
            })
            .wait()?;
        Ok(ZResponse {
            service: self.service.clone(),
            sn,
            rx,
            _phantom_data: PhantomData,
        })
    }

    /// Send a request and block until the response arrives.
    pub fn call(&self, msg: &T::Request) -> std::result::Result<T::Response, ServiceError> {
        self.send_request(msg)?.wait(self.timeout)
    }

    /// Send a request and await its response.
    pub async fn call_async(
        &self,
        msg: &T::Request,
    ) -> std::result::Result<T::Response, ServiceError> {
        self.send_request(msg)?.recv_async().await
    }
}

#[derive(Debug)]
pub struct ZServerBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub _phantom_data: PhantomData<T>,
}

pub struct ZServer<T: ZService> {
    key_expr: KeyExpr<'static>,
    _inner: zenoh::query::Queryable<()>,
    _lv_token: LivelinessToken,
    rx: Option<flume::Receiver<Query>>,
    map: HashMap<QueryKey, Query>,
    _phantom_data: PhantomData<T>,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct QueryKey {
    pub sn: i64,
    pub gid: GidArray,
}

impl From<Attachment> for QueryKey {
    fn from(value: Attachment) -> Self {
        Self {
            sn: value.sequence_number,
            gid: value.source_gid,
        }
    }
}

impl<T> ZServerBuilder<T>
where
    T: ZService,
{
    fn declare<F>(mut self, callback: F) -> Result<ZServer<T>>
    where
        F: Fn(Query) + Send + Sync + 'static,
    {
        let key_expr = qualify(&mut self.entity)?;
        debug!("[SRV] KE: {key_expr}");

        let inner = self
            .session
            .declare_queryable(&key_expr)
            .complete(true)
            .callback(callback)
            .wait()?;
        let lv_token = self
            .session
            .liveliness()
            .declare_token(self.entity.lv_token_key_expr()?)
            .wait()?;
        Ok(ZServer {
            key_expr,
            _inner: inner,
            _lv_token: lv_token,
            rx: None,
            map: HashMap::new(),
            _phantom_data: PhantomData,
        })
    }

    /// Build a server that answers every request inline with `handler`.
    ///
    /// The handler runs on the transport's callback thread and must not
    /// block on other requests of the same session.
    pub fn build_with_handler<F>(self, handler: F) -> Result<ZServer<T>>
    where
        F: Fn(T::Request) -> T::Response + Send + Sync + 'static,
    {
        let service = self.entity.topic.clone();
        self.declare(move |query| {
            let Some(request) = decode_request::<T::Request>(&query) else {
                if let Err(e) = query.reply_err("malformed request").wait() {
                    warn!("[SRV] Failed to reject request on {}: {}", service, e);
                }
                return;
            };
            let response = handler(request);
            if let Err(e) = reply_to(&query, &response) {
                warn!("[SRV] Failed to reply on {}: {}", service, e);
            }
        })
    }
}

impl<T> Builder for ZServerBuilder<T>
where
    T: ZService,
{
    type Output = ZServer<T>;

    fn build(self) -> Result<Self::Output> {
        let (tx, rx) = flume::unbounded();
        let mut server = self.declare(move |query| {
            trace!("[SRV] Received query on {}", query.key_expr());
            let _ = tx.send(query);
        })?;
        server.rx = Some(rx);
        Ok(server)
    }
}

fn decode_request<R: ZMessage>(query: &Query) -> Option<R> {
    let Some(payload) = query.payload() else {
        warn!("[SRV] Query without payload on {}", query.key_expr());
        return None;
    };
    match R::deserialize(&payload.to_bytes()) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!("[SRV] Failed to deserialize request: {}", e);
            None
        }
    }
}

fn reply_to<R: ZMessage>(query: &Query, response: &R) -> Result<()> {
    let bytes = response.serialize()?;
    let mut reply = query.reply(query.key_expr().clone(), bytes);
    if let Some(attachment) = query.attachment() {
        reply = reply.attachment(attachment.clone());
    }
    reply.wait()
}

impl<T> ZServer<T>
where
    T: ZService,
{
    pub fn key_expr(&self) -> &KeyExpr<'static> {
        &self.key_expr
    }

    fn queue(&self) -> Result<&flume::Receiver<Query>> {
        self.rx
            .as_ref()
            .ok_or_else(|| "Server was built with a handler, no queue available".into())
    }

    fn register(&mut self, query: Query) -> Result<(QueryKey, T::Request)> {
        let attachment: Attachment = query
            .attachment()
            .ok_or("Query carries no attachment")?
            .try_into()?;
        let key: QueryKey = attachment.into();
        if self.map.contains_key(&key) {
            return Err("Existing query detected".into());
        }
        let payload = query.payload().ok_or("Query carries no payload")?;
        let msg = T::Request::deserialize(&payload.to_bytes())?;
        self.map.insert(key.clone(), query);
        Ok((key, msg))
    }

    /// Blocks waiting for the next request and deserializes it.
    pub fn take_request(&mut self) -> Result<(QueryKey, T::Request)> {
        let query = self.queue()?.recv()?;
        self.register(query)
    }

    /// Awaits the next request and deserializes it.
    pub async fn take_request_async(&mut self) -> Result<(QueryKey, T::Request)> {
        let query = self.queue()?.recv_async().await?;
        self.register(query)
    }

    /// Reply to a request previously obtained from [take_request](Self::take_request).
    pub fn send_response(&mut self, msg: &T::Response, key: &QueryKey) -> Result<()> {
        match self.map.remove(key) {
            Some(query) => reply_to(&query, msg),
            None => Err(format!("Query map doesn't contain {:?}", key).into()),
        }
    }
}
