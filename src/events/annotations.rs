//! Domain projections of marker and epoch events
//!
//! Impedance readings, video annotations and epoch annotations are stored as
//! ordinary marker or epoch records whose meaning lives in well-known
//! descriptors. Descriptors are always emitted in the same order:
//! `Condition`, `TriggerCode`, the type-specific descriptor, then extras.

use chrono::NaiveDateTime;

use super::library::{
    EventLibrary, CONDITION, IMPEDANCE, IMPEDANCE_UNIT, TRIGGER_CODE, VIDEO_FILE_NAME,
    VIDEO_MARKER_TYPE,
};
use super::model::{BaseEvent, EpochEvent, EventDescriptor, MarkerEvent};
use crate::variant::{Variant, VariantValue};
use crate::{EvtarcError, Result};

const OHMS_PER_KOHM: f32 = 1000.0;

/// Electrode impedances measured at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedanceReading {
    /// Event name
    pub name: String,
    /// Time of the measurement
    pub stamp: NaiveDateTime,
    /// One impedance per electrode, in ohms
    pub values: Vec<f32>,
    /// Recording condition label
    pub condition: Option<String>,
}

/// A marker pointing into a synchronized video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnnotation {
    /// Event name
    pub name: String,
    /// Start of the annotation
    pub stamp: NaiveDateTime,
    /// Duration in seconds
    pub duration: f64,
    /// Video marker type code
    pub marker_type: i32,
    /// Video file the annotation refers to
    pub file_name: Option<String>,
    /// Recording condition label
    pub condition: Option<String>,
    /// Trigger code
    pub trigger_code: Option<i32>,
}

/// An analysis epoch with its condition and trigger
#[derive(Debug, Clone, PartialEq)]
pub struct EpochAnnotation {
    /// Event name
    pub name: String,
    /// Start of the epoch
    pub stamp: NaiveDateTime,
    /// Duration in seconds
    pub duration: f64,
    /// Recording condition label
    pub condition: Option<String>,
    /// Trigger code
    pub trigger_code: Option<i32>,
}

fn optional<T: VariantValue>(common: &BaseEvent, name: &str) -> Result<Option<T>> {
    common
        .descriptor(name)
        .map(|d| d.value.get::<T>())
        .transpose()
}

fn required(common: &BaseEvent, name: &str) -> Result<Variant> {
    common
        .descriptor(name)
        .map(|d| d.value.clone())
        .ok_or_else(|| EvtarcError::MissingDescriptor(name.to_string()))
}

/// Descriptors shared by every projection, in their fixed leading order
fn leading_descriptors(condition: Option<&str>, trigger_code: Option<i32>) -> Vec<EventDescriptor> {
    let mut descriptors = Vec::new();
    if let Some(condition) = condition {
        descriptors.push(EventDescriptor::new(
            CONDITION,
            "",
            Variant::scalar(condition.to_string()),
        ));
    }
    if let Some(code) = trigger_code {
        descriptors.push(EventDescriptor::new(TRIGGER_CODE, "", Variant::scalar(code)));
    }
    descriptors
}

/// Project an impedance marker to a reading in ohms
///
/// # Errors
///
/// Returns [`EvtarcError::MissingDescriptor`] if there is no `Impedance`
/// descriptor, or a type mismatch if a descriptor has the wrong type
pub fn marker_to_impedance(marker: &MarkerEvent) -> Result<ImpedanceReading> {
    let common = &marker.common;
    let kohms = required(common, IMPEDANCE)?.get_array::<f32>()?;

    Ok(ImpedanceReading {
        name: common.name.clone(),
        stamp: common.stamp,
        values: kohms.into_iter().map(|k| k * OHMS_PER_KOHM).collect(),
        condition: optional(common, CONDITION)?,
    })
}

/// Build an impedance marker, storing the values in kOhm
pub fn impedance_to_marker(reading: &ImpedanceReading) -> MarkerEvent {
    let kohms: Vec<f32> = reading.values.iter().map(|v| v / OHMS_PER_KOHM).collect();

    let mut common = BaseEvent::new(reading.name.clone(), reading.stamp);
    common.descriptors = leading_descriptors(reading.condition.as_deref(), None);
    common.descriptors.push(EventDescriptor::new(
        IMPEDANCE,
        IMPEDANCE_UNIT,
        Variant::array(&kohms),
    ));

    MarkerEvent {
        common,
        ..MarkerEvent::default()
    }
}

/// Project a video marker to an annotation
///
/// # Errors
///
/// Returns [`EvtarcError::MissingDescriptor`] if there is no
/// `VideoMarkerType` descriptor, or a type mismatch if a descriptor has the
/// wrong type
pub fn marker_to_video(marker: &MarkerEvent) -> Result<VideoAnnotation> {
    let common = &marker.common;
    let marker_type = required(common, VIDEO_MARKER_TYPE)?.get::<i32>()?;

    Ok(VideoAnnotation {
        name: common.name.clone(),
        stamp: common.stamp,
        duration: common.duration,
        marker_type,
        file_name: optional(common, VIDEO_FILE_NAME)?,
        condition: optional(common, CONDITION)?,
        trigger_code: optional(common, TRIGGER_CODE)?,
    })
}

/// Build a video marker
pub fn video_to_marker(video: &VideoAnnotation) -> MarkerEvent {
    let mut common = BaseEvent::new(video.name.clone(), video.stamp);
    common.duration = video.duration;
    common.descriptors = leading_descriptors(video.condition.as_deref(), video.trigger_code);
    common.descriptors.push(EventDescriptor::new(
        VIDEO_MARKER_TYPE,
        "",
        Variant::scalar(video.marker_type),
    ));
    if let Some(file_name) = &video.file_name {
        common.descriptors.push(EventDescriptor::new(
            VIDEO_FILE_NAME,
            "",
            Variant::scalar(file_name.clone()),
        ));
    }

    MarkerEvent {
        common,
        ..MarkerEvent::default()
    }
}

/// Project an epoch to an annotation
///
/// # Errors
///
/// Returns a type mismatch if `Condition` or `TriggerCode` has the wrong type
pub fn epoch_to_annotation(epoch: &EpochEvent) -> Result<EpochAnnotation> {
    let common = &epoch.common;
    Ok(EpochAnnotation {
        name: common.name.clone(),
        stamp: common.stamp,
        duration: common.duration,
        condition: optional(common, CONDITION)?,
        trigger_code: optional(common, TRIGGER_CODE)?,
    })
}

/// Build an epoch
pub fn annotation_to_epoch(annotation: &EpochAnnotation) -> EpochEvent {
    let mut common = BaseEvent::new(annotation.name.clone(), annotation.stamp);
    common.duration = annotation.duration;
    common.descriptors =
        leading_descriptors(annotation.condition.as_deref(), annotation.trigger_code);
    EpochEvent { common }
}

impl EventLibrary {
    /// All impedance markers as readings
    ///
    /// # Errors
    ///
    /// Returns error if a marker's descriptors have unexpected types
    pub fn impedance_readings(&self) -> Result<Vec<ImpedanceReading>> {
        self.impedances().iter().map(marker_to_impedance).collect()
    }

    /// All video markers as annotations
    ///
    /// # Errors
    ///
    /// Returns error if a marker's descriptors have unexpected types
    pub fn video_annotations(&self) -> Result<Vec<VideoAnnotation>> {
        self.videos().iter().map(marker_to_video).collect()
    }

    /// All epochs as annotations
    ///
    /// # Errors
    ///
    /// Returns error if an epoch's descriptors have unexpected types
    pub fn epoch_annotations(&self) -> Result<Vec<EpochAnnotation>> {
        self.epochs().iter().map(epoch_to_annotation).collect()
    }

    /// Add an impedance reading and return its assigned id
    pub fn add_impedance_reading(&mut self, reading: &ImpedanceReading) -> i32 {
        self.add_impedance(impedance_to_marker(reading))
    }

    /// Add a video annotation and return its assigned id
    pub fn add_video_annotation(&mut self, video: &VideoAnnotation) -> i32 {
        self.add_video(video_to_marker(video))
    }

    /// Add an epoch annotation and return its assigned id
    pub fn add_epoch_annotation(&mut self, annotation: &EpochAnnotation) -> i32 {
        self.add_epoch(annotation_to_epoch(annotation))
    }
}
