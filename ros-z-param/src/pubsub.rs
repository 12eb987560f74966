use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use std::{marker::PhantomData, sync::Arc};

use tracing::{debug, trace, warn};
use zenoh::liveliness::LivelinessToken;
use zenoh::{Result, Session, Wait, sample::Sample};

use crate::Builder;
use crate::attachment::{Attachment, GidArray};
use crate::entity::EndpointEntity;
use crate::msg::ZMessage;
use crate::topic_name;

fn qualify(entity: &mut EndpointEntity) -> Result<zenoh::key_expr::KeyExpr<'static>> {
    entity.topic =
        topic_name::qualify_topic_name(&entity.topic, &entity.node.namespace, &entity.node.name)
            .map_err(|e| zenoh::Error::from(format!("Failed to qualify topic: {}", e)))?;
    entity.topic_key_expr()
}

#[derive(Debug)]
pub struct ZPubBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub _phantom_data: PhantomData<T>,
}

pub struct ZPub<T: ZMessage> {
    pub entity: EndpointEntity,
    sn: AtomicUsize,
    gid: GidArray,
    inner: zenoh::pubsub::Publisher<'static>,
    _lv_token: LivelinessToken,
    _phantom_data: PhantomData<T>,
}

impl<T: ZMessage> Builder for ZPubBuilder<T> {
    type Output = ZPub<T>;

    fn build(mut self) -> Result<Self::Output> {
        let key_expr = qualify(&mut self.entity)?;
        debug!("[PUB] KE: {}", key_expr);

        let inner = self
            .session
            .declare_publisher(key_expr)
            .congestion_control(zenoh::qos::CongestionControl::Block)
            .wait()?;
        let lv_token = self
            .session
            .liveliness()
            .declare_token(self.entity.lv_token_key_expr()?)
            .wait()?;
        let gid = self.entity.gid();

        Ok(ZPub {
            entity: self.entity,
            sn: AtomicUsize::new(0),
            gid,
            inner,
            _lv_token: lv_token,
            _phantom_data: PhantomData,
        })
    }
}

impl<T: ZMessage> ZPub<T> {
    fn new_attachment(&self) -> Attachment {
        let sn = self.sn.fetch_add(1, Ordering::Relaxed);
        trace!("[PUB] Creating attachment: sn={}, gid={:02x?}", sn, &self.gid[..4]);
        Attachment::new(sn as _, self.gid)
    }

    pub fn publish(&self, msg: &T) -> Result<()> {
        let payload = msg.serialize()?;
        self.inner
            .put(payload)
            .attachment(self.new_attachment())
            .wait()
    }
}

#[derive(Debug)]
pub struct ZSubBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub _phantom_data: PhantomData<T>,
}

pub struct ZSub<T: ZMessage> {
    pub entity: EndpointEntity,
    rx: Option<flume::Receiver<T>>,
    _inner: zenoh::pubsub::Subscriber<()>,
    _lv_token: LivelinessToken,
}

fn decode_sample<T: ZMessage>(sample: &Sample) -> Option<T> {
    match T::deserialize(&sample.payload().to_bytes()) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("[SUB] Dropping undecodable sample on {}: {}", sample.key_expr(), e);
            None
        }
    }
}

impl<T: ZMessage> ZSubBuilder<T> {
    fn declare<F>(mut self, callback: F) -> Result<ZSub<T>>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let key_expr = qualify(&mut self.entity)?;
        debug!("[SUB] KE: {}", key_expr);

        let inner = self
            .session
            .declare_subscriber(key_expr)
            .callback(move |sample| {
                if let Some(msg) = decode_sample::<T>(&sample) {
                    callback(msg);
                }
            })
            .wait()?;
        let lv_token = self
            .session
            .liveliness()
            .declare_token(self.entity.lv_token_key_expr()?)
            .wait()?;
        Ok(ZSub {
            entity: self.entity,
            rx: None,
            _inner: inner,
            _lv_token: lv_token,
        })
    }

    /// Deliver every message to `callback` on the transport's thread.
    pub fn build_with_callback<F>(self, callback: F) -> Result<ZSub<T>>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.declare(callback)
    }
}

impl<T: ZMessage> Builder for ZSubBuilder<T> {
    type Output = ZSub<T>;

    fn build(self) -> Result<Self::Output> {
        let (tx, rx) = flume::unbounded();
        let mut sub = self.declare(move |msg| {
            let _ = tx.send(msg);
        })?;
        sub.rx = Some(rx);
        Ok(sub)
    }
}

impl<T: ZMessage> ZSub<T> {
    fn queue(&self) -> Result<&flume::Receiver<T>> {
        self.rx
            .as_ref()
            .ok_or_else(|| "Subscriber was built with callback, no queue available".into())
    }

    pub fn recv(&self) -> Result<T> {
        Ok(self.queue()?.recv()?)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T> {
        Ok(self.queue()?.recv_timeout(timeout)?)
    }

    pub async fn recv_async(&self) -> Result<T> {
        Ok(self.queue()?.recv_async().await?)
    }

    /// Next message already queued, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.as_ref()?.try_recv().ok()
    }
}
