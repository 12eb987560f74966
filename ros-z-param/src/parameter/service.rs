//! Remote access to a node's parameters.
//!
//! A [`ParameterService`] declares the six rcl_interfaces services under the
//! node's private namespace (`~/get_parameters`, `~/set_parameters`, ...).
//! Every handler answers inline from the node's [`SharedParameters`].

use std::sync::Arc;

use tracing::{debug, info};
use zenoh::Result;

use crate::Builder;
use crate::node::ZNode;
use crate::service::ZServer;

use super::shared::SharedParameters;
use super::value::Parameter;
use super::wire::{
    DescribeParametersResponse, DescribeParametersSrv, GetParameterTypesResponse,
    GetParameterTypesSrv, GetParametersResponse, GetParametersSrv, ListParametersResponse,
    ListParametersSrv, SetParametersAtomicallyResponse, SetParametersAtomicallySrv,
    SetParametersResponse, SetParametersSrv,
};

pub const GET_PARAMETERS: &str = "get_parameters";
pub const GET_PARAMETER_TYPES: &str = "get_parameter_types";
pub const SET_PARAMETERS: &str = "set_parameters";
pub const SET_PARAMETERS_ATOMICALLY: &str = "set_parameters_atomically";
pub const LIST_PARAMETERS: &str = "list_parameters";
pub const DESCRIBE_PARAMETERS: &str = "describe_parameters";

pub struct ParameterServiceBuilder<'a> {
    pub(crate) node: &'a ZNode,
}

pub struct ParameterService {
    parameters: Arc<SharedParameters>,
    _get: ZServer<GetParametersSrv>,
    _get_types: ZServer<GetParameterTypesSrv>,
    _set: ZServer<SetParametersSrv>,
    _set_atomically: ZServer<SetParametersAtomicallySrv>,
    _list: ZServer<ListParametersSrv>,
    _describe: ZServer<DescribeParametersSrv>,
}

fn private(service: &str) -> String {
    format!("~/{service}")
}

fn into_parameters<W: Into<Parameter>>(wire: Vec<W>) -> Vec<Parameter> {
    wire.into_iter().map(Into::into).collect()
}

impl Builder for ParameterServiceBuilder<'_> {
    type Output = ParameterService;

    fn build(self) -> Result<ParameterService> {
        let node = self.node;
        let parameters = node.parameters().clone();

        let params = parameters.clone();
        let get = node
            .create_service::<GetParametersSrv>(&private(GET_PARAMETERS))
            .build_with_handler(move |req| {
                debug!("[PARAMS] get_parameters: {:?}", req.names);
                GetParametersResponse {
                    values: params
                        .get_many(&req.names)
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                }
            })?;

        let params = parameters.clone();
        let get_types = node
            .create_service::<GetParameterTypesSrv>(&private(GET_PARAMETER_TYPES))
            .build_with_handler(move |req| {
                debug!("[PARAMS] get_parameter_types: {:?}", req.names);
                GetParameterTypesResponse {
                    types: params
                        .get_types(&req.names)
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                }
            })?;

        let params = parameters.clone();
        let set = node
            .create_service::<SetParametersSrv>(&private(SET_PARAMETERS))
            .build_with_handler(move |req| {
                let request = into_parameters(req.parameters);
                debug!("[PARAMS] set_parameters: {} parameter(s)", request.len());
                SetParametersResponse {
                    results: params.set(&request).into_iter().map(Into::into).collect(),
                }
            })?;

        let params = parameters.clone();
        let set_atomically = node
            .create_service::<SetParametersAtomicallySrv>(&private(SET_PARAMETERS_ATOMICALLY))
            .build_with_handler(move |req| {
                let request = into_parameters(req.parameters);
                debug!(
                    "[PARAMS] set_parameters_atomically: {} parameter(s)",
                    request.len()
                );
                SetParametersAtomicallyResponse {
                    result: params.set_atomically(&request).into(),
                }
            })?;

        let params = parameters.clone();
        let list = node
            .create_service::<ListParametersSrv>(&private(LIST_PARAMETERS))
            .build_with_handler(move |req| {
                debug!(
                    "[PARAMS] list_parameters: prefixes={:?} depth={}",
                    req.prefixes, req.depth
                );
                ListParametersResponse {
                    result: params.list(&req.prefixes, req.depth).into(),
                }
            })?;

        let params = parameters.clone();
        let describe = node
            .create_service::<DescribeParametersSrv>(&private(DESCRIBE_PARAMETERS))
            .build_with_handler(move |req| {
                debug!("[PARAMS] describe_parameters: {:?}", req.names);
                DescribeParametersResponse {
                    descriptors: params
                        .describe(&req.names)
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                }
            })?;

        info!("[PARAMS] Parameter service up for {}", parameters.node_fqn());

        Ok(ParameterService {
            parameters,
            _get: get,
            _get_types: get_types,
            _set: set,
            _set_atomically: set_atomically,
            _list: list,
            _describe: describe,
        })
    }
}

impl ParameterService {
    /// The parameters this service answers for.
    pub fn parameters(&self) -> &Arc<SharedParameters> {
        &self.parameters
    }

    pub fn node_fqn(&self) -> &str {
        self.parameters.node_fqn()
    }
}
