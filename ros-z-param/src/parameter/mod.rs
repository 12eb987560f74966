//! Typed node parameters and their remote access protocol.
//!
//! ```text
//!  ZNode ──── Arc<SharedParameters> ──── ParameterStore
//!                    │     │
//!                    │     └── ZPub  /parameter_events
//!                    │
//!  ParameterService ─┘  ~/get_parameters, ~/set_parameters, ...
//!          ▲
//!          │ queries (CDR, rcl_interfaces layout)
//!          │
//!  SyncParametersClient / AsyncParametersClient
//! ```
//!
//! Reads are strictly typed: asking for an `f64` when an integer is stored
//! fails with [`ParameterError::TypeMismatch`], default or not.

pub mod client;
pub mod error;
pub mod event;
pub mod service;
pub mod shared;
pub mod store;
pub mod value;
pub mod wire;
pub mod yaml;

pub use client::{
    AsyncParametersClient, ParameterFuture, ParametersClientBuilder, SyncParametersClient,
};
pub use error::{ParameterError, ParameterFileError};
pub use event::{PARAMETER_EVENTS_TOPIC, ParameterEvent};
pub use service::{ParameterService, ParameterServiceBuilder};
pub use shared::SharedParameters;
pub use store::{DEPTH_RECURSIVE, ParameterChange, ParameterStore};
pub use value::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterKind, ParameterType,
    ParameterValue, SetParametersResult, parameters_to_json,
};
pub use yaml::{load_parameter_file, load_parameter_string};
