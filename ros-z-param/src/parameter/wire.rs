//! rcl_interfaces message layouts used on the wire.
//!
//! Values travel as a type code plus one field per possible type, which is
//! how the ROS 2 IDL flattens its tagged union. Only the field selected by
//! `type_` is meaningful.

use serde::{Deserialize, Serialize};

use crate::entity::{TypeHash, TypeInfo};
use crate::msg::{ServiceTypeInfo, WithTypeInfo, ZService};

use super::value::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterType, ParameterValue,
    SetParametersResult,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameterValue {
    pub type_: u8,
    pub bool_value: bool,
    pub integer_value: i64,
    pub double_value: f64,
    pub string_value: String,
    pub byte_array_value: Vec<u8>,
    pub bool_array_value: Vec<bool>,
    pub integer_array_value: Vec<i64>,
    pub double_array_value: Vec<f64>,
    pub string_array_value: Vec<String>,
}

impl From<ParameterValue> for WireParameterValue {
    fn from(value: ParameterValue) -> Self {
        let mut wire = WireParameterValue {
            type_: value.parameter_type().into(),
            ..Default::default()
        };
        match value {
            ParameterValue::NotSet => {}
            ParameterValue::Bool(v) => wire.bool_value = v,
            ParameterValue::Integer(v) => wire.integer_value = v,
            ParameterValue::Double(v) => wire.double_value = v,
            ParameterValue::String(v) => wire.string_value = v,
            ParameterValue::ByteArray(v) => wire.byte_array_value = v,
            ParameterValue::BoolArray(v) => wire.bool_array_value = v,
            ParameterValue::IntegerArray(v) => wire.integer_array_value = v,
            ParameterValue::DoubleArray(v) => wire.double_array_value = v,
            ParameterValue::StringArray(v) => wire.string_array_value = v,
        }
        wire
    }
}

impl From<WireParameterValue> for ParameterValue {
    fn from(wire: WireParameterValue) -> Self {
        match ParameterType::from(wire.type_) {
            ParameterType::NotSet => ParameterValue::NotSet,
            ParameterType::Bool => ParameterValue::Bool(wire.bool_value),
            ParameterType::Integer => ParameterValue::Integer(wire.integer_value),
            ParameterType::Double => ParameterValue::Double(wire.double_value),
            ParameterType::String => ParameterValue::String(wire.string_value),
            ParameterType::ByteArray => ParameterValue::ByteArray(wire.byte_array_value),
            ParameterType::BoolArray => ParameterValue::BoolArray(wire.bool_array_value),
            ParameterType::IntegerArray => ParameterValue::IntegerArray(wire.integer_array_value),
            ParameterType::DoubleArray => ParameterValue::DoubleArray(wire.double_array_value),
            ParameterType::StringArray => ParameterValue::StringArray(wire.string_array_value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameter {
    pub name: String,
    pub value: WireParameterValue,
}

impl From<Parameter> for WireParameter {
    fn from(param: Parameter) -> Self {
        Self {
            name: param.name,
            value: param.value.into(),
        }
    }
}

impl From<WireParameter> for Parameter {
    fn from(wire: WireParameter) -> Self {
        Self {
            name: wire.name,
            value: wire.value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireSetParametersResult {
    pub successful: bool,
    pub reason: String,
}

impl From<SetParametersResult> for WireSetParametersResult {
    fn from(result: SetParametersResult) -> Self {
        Self {
            successful: result.successful,
            reason: result.reason,
        }
    }
}

impl From<WireSetParametersResult> for SetParametersResult {
    fn from(wire: WireSetParametersResult) -> Self {
        Self {
            successful: wire.successful,
            reason: wire.reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFloatingPointRange {
    pub from_value: f64,
    pub to_value: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireIntegerRange {
    pub from_value: i64,
    pub to_value: i64,
    pub step: u64,
}

/// Ranges are bounded sequences of at most one element in the IDL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameterDescriptor {
    pub name: String,
    pub type_: u8,
    pub description: String,
    pub additional_constraints: String,
    pub read_only: bool,
    pub dynamic_typing: bool,
    pub floating_point_range: Vec<WireFloatingPointRange>,
    pub integer_range: Vec<WireIntegerRange>,
}

impl From<ParameterDescriptor> for WireParameterDescriptor {
    fn from(descriptor: ParameterDescriptor) -> Self {
        Self {
            name: descriptor.name,
            type_: descriptor.type_.into(),
            description: descriptor.description,
            read_only: descriptor.read_only,
            dynamic_typing: true,
            ..Default::default()
        }
    }
}

impl From<WireParameterDescriptor> for ParameterDescriptor {
    fn from(wire: WireParameterDescriptor) -> Self {
        Self {
            name: wire.name,
            type_: wire.type_.into(),
            description: wire.description,
            read_only: wire.read_only,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireListParametersResult {
    pub names: Vec<String>,
    pub prefixes: Vec<String>,
}

impl From<ListParametersResult> for WireListParametersResult {
    fn from(result: ListParametersResult) -> Self {
        Self {
            names: result.names,
            prefixes: result.prefixes,
        }
    }
}

impl From<WireListParametersResult> for ListParametersResult {
    fn from(wire: WireListParametersResult) -> Self {
        Self {
            names: wire.names,
            prefixes: wire.prefixes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTime {
    pub sec: i32,
    pub nanosec: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameterEvent {
    pub stamp: WireTime,
    pub node: String,
    pub new_parameters: Vec<WireParameter>,
    pub changed_parameters: Vec<WireParameter>,
    pub deleted_parameters: Vec<WireParameter>,
}

impl WithTypeInfo for WireParameterEvent {
    fn type_info() -> TypeInfo {
        TypeInfo::new("rcl_interfaces::msg::dds_::ParameterEvent_", TypeHash::zero())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersResponse {
    pub values: Vec<WireParameterValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParameterTypesRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParameterTypesResponse {
    pub types: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersRequest {
    pub parameters: Vec<WireParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersResponse {
    pub results: Vec<WireSetParametersResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersAtomicallyRequest {
    pub parameters: Vec<WireParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersAtomicallyResponse {
    pub result: WireSetParametersResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersRequest {
    pub prefixes: Vec<String>,
    pub depth: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersResponse {
    pub result: WireListParametersResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeParametersRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeParametersResponse {
    pub descriptors: Vec<WireParameterDescriptor>,
}

macro_rules! parameter_service {
    ($srv:ident, $req:ty, $resp:ty, $type_name:literal) => {
        pub struct $srv;

        impl ZService for $srv {
            type Request = $req;
            type Response = $resp;
        }

        impl ServiceTypeInfo for $srv {
            fn service_type_info() -> TypeInfo {
                TypeInfo::new($type_name, TypeHash::zero())
            }
        }
    };
}

parameter_service!(
    GetParametersSrv,
    GetParametersRequest,
    GetParametersResponse,
    "rcl_interfaces::srv::dds_::GetParameters_"
);
parameter_service!(
    GetParameterTypesSrv,
    GetParameterTypesRequest,
    GetParameterTypesResponse,
    "rcl_interfaces::srv::dds_::GetParameterTypes_"
);
parameter_service!(
    SetParametersSrv,
    SetParametersRequest,
    SetParametersResponse,
    "rcl_interfaces::srv::dds_::SetParameters_"
);
parameter_service!(
    SetParametersAtomicallySrv,
    SetParametersAtomicallyRequest,
    SetParametersAtomicallyResponse,
    "rcl_interfaces::srv::dds_::SetParametersAtomically_"
);
parameter_service!(
    ListParametersSrv,
    ListParametersRequest,
    ListParametersResponse,
    "rcl_interfaces::srv::dds_::ListParameters_"
);
parameter_service!(
    DescribeParametersSrv,
    DescribeParametersRequest,
    DescribeParametersResponse,
    "rcl_interfaces::srv::dds_::DescribeParameters_"
);
