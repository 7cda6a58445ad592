//! In-memory event types

use chrono::NaiveDateTime;

use crate::archive::archive_epoch;
use crate::variant::Variant;

/// Active and reference electrode of a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Active electrode label
    pub active: String,
    /// Reference electrode label
    pub reference: String,
}

impl Channel {
    /// Create a channel from its two electrode labels
    pub fn new(active: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            active: active.into(),
            reference: reference.into(),
        }
    }
}

/// Named, typed attribute attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Well-known attribute name, matched by string equality
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Attribute value
    pub value: Variant,
}

impl EventDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, unit: impl Into<String>, value: Variant) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            value,
        }
    }
}

/// Header shared by every event kind
#[derive(Debug, Clone, PartialEq)]
pub struct BaseEvent {
    /// Library-wide id, assigned when the event is added
    pub visible_id: i32,
    /// Internal name
    pub name: String,
    /// Display name (stored from version 78)
    pub user_visible_name: String,
    /// Event type code
    pub event_type: i32,
    /// Event state code
    pub state: i32,
    /// Non-zero if the event was created during acquisition
    pub original: i8,
    /// Duration in seconds
    pub duration: f64,
    /// Offset of the duration window in seconds
    pub duration_offset: f64,
    /// Point in time of the event
    pub stamp: NaiveDateTime,
    /// Optional attributes (stored from version 19)
    pub descriptors: Vec<EventDescriptor>,
}

impl Default for BaseEvent {
    fn default() -> Self {
        Self {
            visible_id: 0,
            name: String::new(),
            user_visible_name: String::new(),
            event_type: 0,
            state: 0,
            original: 0,
            duration: 0.0,
            duration_offset: 0.0,
            stamp: archive_epoch(),
            descriptors: Vec::new(),
        }
    }
}

impl BaseEvent {
    /// Create a header with a name and time stamp
    pub fn new(name: impl Into<String>, stamp: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            stamp,
            ..Self::default()
        }
    }

    /// First descriptor with the given name
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&EventDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Whether a descriptor with the given name is present
    #[must_use]
    pub fn has_descriptor(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }
}

/// Access to the shared header of an event
pub trait Event {
    /// Shared header
    fn common(&self) -> &BaseEvent;

    /// Mutable shared header
    fn common_mut(&mut self) -> &mut BaseEvent;
}

/// Point or interval marker, also used for impedance and video annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerEvent {
    /// Shared header
    pub common: BaseEvent,
    /// Channel the marker belongs to
    pub channel: Channel,
    /// Free text description
    pub description: String,
    /// Amplitude display flag (int8 on disk up to version 103)
    pub show_amplitude: i32,
    /// Duration display flag
    pub show_duration: i8,
}

/// Analysis epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochEvent {
    /// Shared header
    pub common: BaseEvent,
}

/// Artefact on a channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtefactEvent {
    /// Shared header
    pub common: BaseEvent,
    /// Affected channel
    pub channel: Channel,
    /// Free text description (stored from version 174)
    pub description: String,
}

/// Detected spike
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeEvent {
    /// Shared header
    pub common: BaseEvent,
    /// Channel of the spike
    pub channel: Channel,
    /// Peak amplitude
    pub amplitude_peak: f32,
    /// Polarity
    pub sign: i16,
    /// Spike group
    pub group: i16,
    /// Time of the peak
    pub top_date: NaiveDateTime,
}

impl Default for SpikeEvent {
    fn default() -> Self {
        Self {
            common: BaseEvent::default(),
            channel: Channel::default(),
            amplitude_peak: 0.0,
            sign: 0,
            group: 0,
            top_date: archive_epoch(),
        }
    }
}

/// Seizure on a channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeizureEvent {
    /// Shared header
    pub common: BaseEvent,
    /// Channel of onset
    pub channel: Channel,
}

/// Sleep staging parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepEvent {
    /// Shared header
    pub common: BaseEvent,
    /// Base level
    pub base_level: i16,
    /// Detection threshold
    pub threshold: i16,
    /// Minimum duration
    pub min_duration: i32,
    /// Maximum value
    pub max_value: i32,
    /// Epoch length
    pub epoch_length: i32,
    /// Display colour of the epoch
    pub epoch_color: i32,
}

/// ECG R-peak
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RPeakEvent {
    /// Shared header
    pub common: BaseEvent,
    /// ECG channel
    pub channel: Channel,
    /// Peak amplitude
    pub amplitude_peak: f32,
}

macro_rules! impl_event {
    ($($ty:ty),*) => {
        $(
            impl Event for $ty {
                fn common(&self) -> &BaseEvent {
                    &self.common
                }

                fn common_mut(&mut self) -> &mut BaseEvent {
                    &mut self.common
                }
            }
        )*
    };
}

impl_event!(
    MarkerEvent,
    EpochEvent,
    ArtefactEvent,
    SpikeEvent,
    SeizureEvent,
    SleepEvent,
    RPeakEvent
);
