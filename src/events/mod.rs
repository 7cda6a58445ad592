//! Event records and the event library

pub mod annotations;
pub mod library;
pub mod model;
pub mod record;

pub use annotations::{
    annotation_to_epoch, epoch_to_annotation, impedance_to_marker, marker_to_impedance,
    marker_to_video, video_to_marker, EpochAnnotation, ImpedanceReading, VideoAnnotation,
};
pub use library::{
    classify_marker, read_archive, read_archive_with, write_archive, write_partial_archive,
    write_record, EventKind, EventLibrary,
};
pub use model::{
    ArtefactEvent, BaseEvent, Channel, EpochEvent, Event, EventDescriptor, MarkerEvent,
    RPeakEvent, SeizureEvent, SleepEvent, SpikeEvent,
};
pub use record::{ArchiveRecord, EventRecord};
