use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::value::Parameter;
use super::wire::{WireParameterEvent, WireTime};

/// Topic on which every node announces parameter changes.
pub const PARAMETER_EVENTS_TOPIC: &str = "/parameter_events";

/// Changes committed by one set request on one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEvent {
    pub stamp: SystemTime,
    /// Fully-qualified name of the node that changed.
    pub node: String,
    pub new_parameters: Vec<Parameter>,
    pub changed_parameters: Vec<Parameter>,
    pub deleted_parameters: Vec<Parameter>,
}

impl ParameterEvent {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            stamp: SystemTime::now(),
            node: node.into(),
            new_parameters: Vec::new(),
            changed_parameters: Vec::new(),
            deleted_parameters: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_parameters.is_empty()
            && self.changed_parameters.is_empty()
            && self.deleted_parameters.is_empty()
    }

    /// Whether `name` was added, changed or deleted.
    pub fn touches(&self, name: &str) -> bool {
        self.new_parameters
            .iter()
            .chain(&self.changed_parameters)
            .chain(&self.deleted_parameters)
            .any(|p| p.name == name)
    }
}

fn to_wire_time(stamp: SystemTime) -> WireTime {
    let elapsed = stamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    WireTime {
        sec: elapsed.as_secs() as i32,
        nanosec: elapsed.subsec_nanos(),
    }
}

fn from_wire_time(stamp: WireTime) -> SystemTime {
    let secs = u64::try_from(stamp.sec).unwrap_or_default();
    UNIX_EPOCH + Duration::new(secs, stamp.nanosec)
}

impl From<ParameterEvent> for WireParameterEvent {
    fn from(event: ParameterEvent) -> Self {
        Self {
            stamp: to_wire_time(event.stamp),
            node: event.node,
            new_parameters: event.new_parameters.into_iter().map(Into::into).collect(),
            changed_parameters: event.changed_parameters.into_iter().map(Into::into).collect(),
            deleted_parameters: event.deleted_parameters.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<WireParameterEvent> for ParameterEvent {
    fn from(wire: WireParameterEvent) -> Self {
        Self {
            stamp: from_wire_time(wire.stamp),
            node: wire.node,
            new_parameters: wire.new_parameters.into_iter().map(Into::into).collect(),
            changed_parameters: wire.changed_parameters.into_iter().map(Into::into).collect(),
            deleted_parameters: wire.deleted_parameters.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_conversion_keeps_lists_apart() {
        let mut event = ParameterEvent::new("/talker");
        event.new_parameters.push(Parameter::new("a", 1));
        event.changed_parameters.push(Parameter::new("b", "x"));
        event.deleted_parameters.push(Parameter::unset("c"));

        let wire = WireParameterEvent::from(event.clone());
        assert_eq!(wire.node, "/talker");
        assert_eq!(wire.deleted_parameters[0].value.type_, 0);

        let back = ParameterEvent::from(wire);
        assert_eq!(back.new_parameters, event.new_parameters);
        assert_eq!(back.changed_parameters, event.changed_parameters);
        assert!(back.touches("c"));
        assert!(!back.touches("d"));
        let drift = event
            .stamp
            .duration_since(back.stamp)
            .unwrap_or_default();
        assert!(drift < Duration::from_micros(1));
    }
}
