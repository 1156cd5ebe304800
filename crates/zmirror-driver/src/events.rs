//! Driver event model.
//!
//! Events carry the post-merge record where one exists. Event names on
//! the registration surface are fixed two-token phrases such as
//! `"node ready"`; anything else is rejected at the API boundary.

use std::fmt;
use std::str::FromStr;
use zmirror_core::{ClassId, HomeId, NodeId, NodeInfo, SceneId, Value, ValueId};

/// A notification from the device-network driver (or a facade of it).
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// The driver initialised and scanning has started.
    DriverReady(HomeId),
    /// The driver failed to initialise.
    DriverFailed,
    /// The initial network scan finished.
    ScanComplete,
    /// A new node was found on the network.
    NodeAdded(NodeId),
    /// A node was removed from the network.
    NodeRemoved(NodeId),
    /// Naming information became available for a node.
    NodeNaming(NodeId, NodeInfo),
    /// A node completed its essential queries and is available.
    NodeAvailable(NodeId, NodeInfo),
    /// A node completed all queries and is ready for operation.
    NodeReady(NodeId, NodeInfo),
    /// A transient basic-set event from a node.
    NodeEvent(NodeId, serde_json::Value),
    /// A scene activation event from a node.
    SceneEvent(NodeId, SceneId),
    /// A new value was discovered.
    ValueAdded(NodeId, ClassId, Value),
    /// A value actually changed state.
    ValueChanged(NodeId, ClassId, Value),
    /// A value was refreshed from the device without changing.
    ValueRefreshed(NodeId, ClassId, Value),
    /// A value was removed.
    ValueRemoved(NodeId, ClassId, ValueId),
    /// Polling was enabled for a node.
    PollingEnabled(NodeId),
    /// Polling was disabled for a node.
    PollingDisabled(NodeId),
    /// The controller reported progress of the active command.
    ControllerCommand(NodeId, serde_json::Value),
}

impl DriverEvent {
    /// The kind discriminant of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DriverReady(_) => EventKind::DriverReady,
            Self::DriverFailed => EventKind::DriverFailed,
            Self::ScanComplete => EventKind::ScanComplete,
            Self::NodeAdded(_) => EventKind::NodeAdded,
            Self::NodeRemoved(_) => EventKind::NodeRemoved,
            Self::NodeNaming(..) => EventKind::NodeNaming,
            Self::NodeAvailable(..) => EventKind::NodeAvailable,
            Self::NodeReady(..) => EventKind::NodeReady,
            Self::NodeEvent(..) => EventKind::NodeEvent,
            Self::SceneEvent(..) => EventKind::SceneEvent,
            Self::ValueAdded(..) => EventKind::ValueAdded,
            Self::ValueChanged(..) => EventKind::ValueChanged,
            Self::ValueRefreshed(..) => EventKind::ValueRefreshed,
            Self::ValueRemoved(..) => EventKind::ValueRemoved,
            Self::PollingEnabled(_) => EventKind::PollingEnabled,
            Self::PollingDisabled(_) => EventKind::PollingDisabled,
            Self::ControllerCommand(..) => EventKind::ControllerCommand,
        }
    }
}

/// The closed set of recognized event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `"driver ready"`
    DriverReady,
    /// `"driver failed"`
    DriverFailed,
    /// `"scan complete"`
    ScanComplete,
    /// `"node added"`
    NodeAdded,
    /// `"node removed"`
    NodeRemoved,
    /// `"node naming"`
    NodeNaming,
    /// `"node available"`
    NodeAvailable,
    /// `"node ready"`
    NodeReady,
    /// `"node event"`
    NodeEvent,
    /// `"scene event"`
    SceneEvent,
    /// `"value added"`
    ValueAdded,
    /// `"value changed"`
    ValueChanged,
    /// `"value refreshed"`
    ValueRefreshed,
    /// `"value removed"`
    ValueRemoved,
    /// `"polling enabled"`
    PollingEnabled,
    /// `"polling disabled"`
    PollingDisabled,
    /// `"controller command"`
    ControllerCommand,
}

impl EventKind {
    /// Every recognized event kind.
    pub const ALL: [EventKind; 17] = [
        EventKind::DriverReady,
        EventKind::DriverFailed,
        EventKind::ScanComplete,
        EventKind::NodeAdded,
        EventKind::NodeRemoved,
        EventKind::NodeNaming,
        EventKind::NodeAvailable,
        EventKind::NodeReady,
        EventKind::NodeEvent,
        EventKind::SceneEvent,
        EventKind::ValueAdded,
        EventKind::ValueChanged,
        EventKind::ValueRefreshed,
        EventKind::ValueRemoved,
        EventKind::PollingEnabled,
        EventKind::PollingDisabled,
        EventKind::ControllerCommand,
    ];

    /// The canonical two-token phrase for this kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DriverReady => "driver ready",
            Self::DriverFailed => "driver failed",
            Self::ScanComplete => "scan complete",
            Self::NodeAdded => "node added",
            Self::NodeRemoved => "node removed",
            Self::NodeNaming => "node naming",
            Self::NodeAvailable => "node available",
            Self::NodeReady => "node ready",
            Self::NodeEvent => "node event",
            Self::SceneEvent => "scene event",
            Self::ValueAdded => "value added",
            Self::ValueChanged => "value changed",
            Self::ValueRefreshed => "value refreshed",
            Self::ValueRemoved => "value removed",
            Self::PollingEnabled => "polling enabled",
            Self::PollingDisabled => "polling disabled",
            Self::ControllerCommand => "controller command",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error rejecting an event name at registration time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventNameError {
    /// The name is not a `"<subject> <verb>"` two-token phrase.
    #[error("event name is not a \"<subject> <verb>\" phrase: {0:?}")]
    Malformed(String),
    /// The name is a phrase but not one of the recognized events.
    #[error("unknown event name: {0:?}")]
    Unknown(String),
}

impl FromStr for EventKind {
    type Err = EventNameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.split(' ').collect::<Vec<_>>().as_slice() {
            [subject, verb] if !subject.is_empty() && !verb.is_empty() => Self::ALL
                .into_iter()
                .find(|kind| kind.name() == name)
                .ok_or_else(|| EventNameError::Unknown(name.to_string())),
            _ => Err(EventNameError::Malformed(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_parses_from_its_own_name() {
        for kind in EventKind::ALL {
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn names_without_exactly_one_separator_are_malformed() {
        assert_eq!(
            "nodeready".parse::<EventKind>(),
            Err(EventNameError::Malformed("nodeready".to_string()))
        );
        assert_eq!(
            " ready".parse::<EventKind>(),
            Err(EventNameError::Malformed(" ready".to_string()))
        );
        assert_eq!(
            "node ready now".parse::<EventKind>(),
            Err(EventNameError::Malformed("node ready now".to_string()))
        );
    }

    #[test]
    fn unrecognized_phrases_are_unknown() {
        assert_eq!(
            "node exploded".parse::<EventKind>(),
            Err(EventNameError::Unknown("node exploded".to_string()))
        );
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(DriverEvent::NodeAdded(3).kind(), EventKind::NodeAdded);
        assert_eq!(
            DriverEvent::ValueRemoved(3, 37, zmirror_core::ValueId::new(3, 37, 1, 0)).kind(),
            EventKind::ValueRemoved
        );
    }
}
