//! ROS 2 style parameters for ros-z native nodes.
//!
//! A [`node::ZNode`] owns a typed parameter store. A
//! [`parameter::ParameterService`] exposes that store over Zenoh queryables,
//! and [`parameter::SyncParametersClient`] / [`parameter::AsyncParametersClient`]
//! read and write it from any node in the same Zenoh network.
//!
//! ```no_run
//! use ros_z_param::{Builder, context::ZContextBuilder, parameter::Parameter};
//!
//! # fn main() -> zenoh::Result<()> {
//! let ctx = ZContextBuilder::default().build()?;
//! let node = ctx.create_node("talker").build()?;
//! let _service = node.create_parameter_service().build()?;
//!
//! let client = node.create_parameters_client().build_sync()?;
//! client.set_parameters(vec![Parameter::new("rate", 10)])?;
//! assert_eq!(client.get_parameter::<i64>("rate")?, 10);
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod context;
pub mod entity;
pub mod error;
pub mod msg;
pub mod node;
pub mod parameter;
pub mod pubsub;
pub mod service;
pub mod topic_name;

pub use zenoh::Result;

pub trait Builder {
    type Output;
    fn build(self) -> Result<Self::Output>;
}
