use std::marker::PhantomData;

use cdr::{CdrLe, Infinite};
use serde::{Serialize, de::DeserializeOwned};

use crate::entity::TypeInfo;

pub trait ZSerializer {
    type Input<'a>
    where
        Self: 'a;
    fn serialize(input: Self::Input<'_>) -> Result<Vec<u8>, cdr::Error>;
}

pub trait ZDeserializer {
    type Output;
    fn deserialize(input: &[u8]) -> Result<Self::Output, cdr::Error>;
}

// Core Z-Message trait
pub trait ZMessage: Sized + Send + Sync + 'static {
    type Serdes: for<'a> ZSerializer<Input<'a> = &'a Self> + ZDeserializer<Output = Self>;

    fn serialize(&self) -> Result<Vec<u8>, cdr::Error> {
        Self::Serdes::serialize(self)
    }

    fn deserialize(input: &[u8]) -> Result<Self, cdr::Error> {
        Self::Serdes::deserialize(input)
    }
}

// Blanket implementation for serde-compatible types using CDR
impl<T> ZMessage for T
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Serdes = CdrSerdes<T>;
}

pub struct CdrSerdes<T>(PhantomData<T>);

impl<T> ZSerializer for CdrSerdes<T>
where
    T: Serialize,
{
    type Input<'a>
        = &'a T
    where
        T: 'a;

    fn serialize(input: &T) -> Result<Vec<u8>, cdr::Error> {
        cdr::serialize::<_, _, CdrLe>(input, Infinite)
    }
}

impl<T> ZDeserializer for CdrSerdes<T>
where
    T: DeserializeOwned,
{
    type Output = T;

    fn deserialize(input: &[u8]) -> Result<T, cdr::Error> {
        cdr::deserialize::<T>(input)
    }
}

/// Type information attached to messages published on a topic
pub trait WithTypeInfo {
    fn type_info() -> TypeInfo;
}

/// Type information attached to a request/response pair
pub trait ServiceTypeInfo {
    fn service_type_info() -> TypeInfo;
}

pub trait ZService {
    type Request: ZMessage;
    type Response: ZMessage;
}
