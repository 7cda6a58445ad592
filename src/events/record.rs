//! Version-gated event record codec
//!
//! Every record starts with the shared [`BaseEvent`] header followed by its
//! own fields. Field presence and width depend only on the archive
//! [`FormatVersion`], which is passed unchanged to every load and store.

use std::io::{Read, Write};

use tracing::{trace, warn};
use uuid::Uuid;

use super::model::{
    ArtefactEvent, BaseEvent, Channel, EpochEvent, Event, EventDescriptor, MarkerEvent,
    RPeakEvent, SeizureEvent, SleepEvent, SpikeEvent,
};
use crate::archive::{ArchiveReader, ArchiveWriter, FormatVersion};
use crate::variant::Variant;
use crate::{EvtarcError, Result};

/// Class name of [`MarkerEvent`] records
pub const MARKER_CLASS: &str = "class dcEventMarker_c";
/// Class name of [`EpochEvent`] records
pub const EPOCH_CLASS: &str = "class dcEpochEvent_c";
/// Class name of [`ArtefactEvent`] records
pub const ARTEFACT_CLASS: &str = "class dcArtefactEvent_c";
/// Class name of [`SpikeEvent`] records
pub const SPIKE_CLASS: &str = "class dcSpikeEvent_c";
/// Class name of [`SeizureEvent`] records
pub const SEIZURE_CLASS: &str = "class dcSeizureEvent_c";
/// Class name of [`SleepEvent`] records
pub const SLEEP_CLASS: &str = "class dcSleepEvent_c";
/// Class name of [`RPeakEvent`] records
pub const RPEAK_CLASS: &str = "class dcRPeakEvent_c";

/// An event kind with an archive representation
pub trait ArchiveRecord: Event + Sized {
    /// Class name written before each record
    const CLASS_NAME: &'static str;

    /// Decode the record body
    ///
    /// # Errors
    ///
    /// Returns error if the body is malformed or the version is unsupported
    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self>;

    /// Encode the record body
    ///
    /// # Errors
    ///
    /// Returns error if a field cannot be represented in this version
    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()>;
}

impl BaseEvent {
    /// Decode the shared header
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::UnsupportedVersion`] for versions in `[11, 19)`,
    /// or any decoding error
    pub fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        version.check_supported()?;

        let visible_id = reader.read_i32()?;
        let _reserved = reader.read_guid()?;
        if let Some(class) = reader.read_class()? {
            return Err(EvtarcError::InvalidFormat(format!(
                "unexpected class {class:?} inside event header"
            )));
        }

        let name = reader.read_string()?;
        let user_visible_name = if version.has_user_visible_name() {
            reader.read_string()?
        } else {
            String::new()
        };

        let event_type = reader.read_i32()?;
        let state = reader.read_i32()?;
        let original = reader.read_i8()?;
        let duration = reader.read_f64()?;
        let duration_offset = reader.read_f64()?;
        let stamp = reader.read_timestamp()?;

        let descriptors = if version.has_descriptors() {
            load_descriptors(reader)?
        } else {
            Vec::new()
        };

        Ok(Self {
            visible_id,
            name,
            user_visible_name,
            event_type,
            state,
            original,
            duration,
            duration_offset,
            stamp,
            descriptors,
        })
    }

    /// Encode the shared header
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::UnsupportedVersion`] for versions in `[11, 19)`,
    /// or any encoding error
    pub fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        version.check_supported()?;

        writer.write_i32(self.visible_id)?;
        writer.write_guid(&Uuid::nil())?;
        writer.write_class(None)?;

        writer.write_string(&self.name)?;
        if version.has_user_visible_name() {
            writer.write_string(&self.user_visible_name)?;
        }

        writer.write_i32(self.event_type)?;
        writer.write_i32(self.state)?;
        writer.write_i8(self.original)?;
        writer.write_f64(self.duration)?;
        writer.write_f64(self.duration_offset)?;
        writer.write_timestamp(self.stamp)?;

        if version.has_descriptors() {
            store_descriptors(writer, &self.descriptors)?;
        } else if !self.descriptors.is_empty() {
            warn!(
                "Version {} has no event descriptors; dropping {} descriptors of event {}",
                version,
                self.descriptors.len(),
                self.visible_id
            );
        }

        Ok(())
    }
}

fn load_descriptors<R: Read>(reader: &mut ArchiveReader<R>) -> Result<Vec<EventDescriptor>> {
    let limit = reader.limits().max_descriptors;
    let count = reader.read_count("descriptor count", limit)?;

    let mut descriptors = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let name = reader.read_string()?;
        let unit = reader.read_string()?;
        let value = Variant::load(reader)?;
        descriptors.push(EventDescriptor { name, unit, value });
    }
    Ok(descriptors)
}

fn store_descriptors<W: Write>(
    writer: &mut ArchiveWriter<W>,
    descriptors: &[EventDescriptor],
) -> Result<()> {
    writer.write_count("descriptor count", descriptors.len())?;
    for descriptor in descriptors {
        writer.write_string(&descriptor.name)?;
        writer.write_string(&descriptor.unit)?;
        descriptor.value.store(writer)?;
    }
    Ok(())
}

fn load_channel<R: Read>(reader: &mut ArchiveReader<R>) -> Result<Channel> {
    let active = reader.read_string()?;
    let reference = reader.read_string()?;
    Ok(Channel { active, reference })
}

fn store_channel<W: Write>(writer: &mut ArchiveWriter<W>, channel: &Channel) -> Result<()> {
    writer.write_string(&channel.active)?;
    writer.write_string(&channel.reference)
}

impl ArchiveRecord for MarkerEvent {
    const CLASS_NAME: &'static str = MARKER_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        let channel = load_channel(reader)?;
        let description = reader.read_string()?;
        let show_amplitude = if version.has_wide_show_amplitude() {
            reader.read_i32()?
        } else {
            i32::from(reader.read_i8()?)
        };
        let show_duration = reader.read_i8()?;

        Ok(Self {
            common,
            channel,
            description,
            show_amplitude,
            show_duration,
        })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        store_channel(writer, &self.channel)?;
        writer.write_string(&self.description)?;
        if version.has_wide_show_amplitude() {
            writer.write_i32(self.show_amplitude)?;
        } else {
            let narrow = i8::try_from(self.show_amplitude).map_err(|_| {
                EvtarcError::limit("show_amplitude", self.show_amplitude, i8::MAX)
            })?;
            writer.write_i8(narrow)?;
        }
        writer.write_i8(self.show_duration)
    }
}

impl ArchiveRecord for EpochEvent {
    const CLASS_NAME: &'static str = EPOCH_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        if version.has_epoch_padding() {
            let _padding = reader.read_i32()?;
        }
        Ok(Self { common })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        if version.has_epoch_padding() {
            writer.write_i32(0)?;
        }
        Ok(())
    }
}

impl ArchiveRecord for ArtefactEvent {
    const CLASS_NAME: &'static str = ARTEFACT_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        let channel = load_channel(reader)?;
        let description = if version.has_artefact_description() {
            reader.read_string()?
        } else {
            String::new()
        };
        Ok(Self {
            common,
            channel,
            description,
        })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        store_channel(writer, &self.channel)?;
        if version.has_artefact_description() {
            writer.write_string(&self.description)?;
        }
        Ok(())
    }
}

impl ArchiveRecord for SpikeEvent {
    const CLASS_NAME: &'static str = SPIKE_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        let channel = load_channel(reader)?;
        let amplitude_peak = reader.read_f32()?;
        let sign = reader.read_i16()?;
        let group = reader.read_i16()?;
        let top_date = reader.read_timestamp()?;
        Ok(Self {
            common,
            channel,
            amplitude_peak,
            sign,
            group,
            top_date,
        })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        store_channel(writer, &self.channel)?;
        writer.write_f32(self.amplitude_peak)?;
        writer.write_i16(self.sign)?;
        writer.write_i16(self.group)?;
        writer.write_timestamp(self.top_date)
    }
}

impl ArchiveRecord for SeizureEvent {
    const CLASS_NAME: &'static str = SEIZURE_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        let channel = load_channel(reader)?;
        Ok(Self { common, channel })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        store_channel(writer, &self.channel)
    }
}

impl ArchiveRecord for SleepEvent {
    const CLASS_NAME: &'static str = SLEEP_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        Ok(Self {
            common,
            base_level: reader.read_i16()?,
            threshold: reader.read_i16()?,
            min_duration: reader.read_i32()?,
            max_value: reader.read_i32()?,
            epoch_length: reader.read_i32()?,
            epoch_color: reader.read_i32()?,
        })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        writer.write_i16(self.base_level)?;
        writer.write_i16(self.threshold)?;
        writer.write_i32(self.min_duration)?;
        writer.write_i32(self.max_value)?;
        writer.write_i32(self.epoch_length)?;
        writer.write_i32(self.epoch_color)
    }
}

impl ArchiveRecord for RPeakEvent {
    const CLASS_NAME: &'static str = RPEAK_CLASS;

    fn load<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let common = BaseEvent::load(reader, version)?;
        let channel = load_channel(reader)?;
        let amplitude_peak = reader.read_f32()?;
        Ok(Self {
            common,
            channel,
            amplitude_peak,
        })
    }

    fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        self.common.store(writer, version)?;
        store_channel(writer, &self.channel)?;
        writer.write_f32(self.amplitude_peak)
    }
}

/// One decoded record of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    /// Marker, impedance or video annotation
    Marker(MarkerEvent),
    /// Epoch
    Epoch(EpochEvent),
    /// Artefact
    Artefact(ArtefactEvent),
    /// Spike
    Spike(SpikeEvent),
    /// Seizure
    Seizure(SeizureEvent),
    /// Sleep staging
    Sleep(SleepEvent),
    /// R-peak
    RPeak(RPeakEvent),
}

impl EventRecord {
    /// Class name used on the wire for this record
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Marker(_) => MarkerEvent::CLASS_NAME,
            Self::Epoch(_) => EpochEvent::CLASS_NAME,
            Self::Artefact(_) => ArtefactEvent::CLASS_NAME,
            Self::Spike(_) => SpikeEvent::CLASS_NAME,
            Self::Seizure(_) => SeizureEvent::CLASS_NAME,
            Self::Sleep(_) => SleepEvent::CLASS_NAME,
            Self::RPeak(_) => RPeakEvent::CLASS_NAME,
        }
    }

    /// Shared header
    #[must_use]
    pub fn common(&self) -> &BaseEvent {
        match self {
            Self::Marker(e) => e.common(),
            Self::Epoch(e) => e.common(),
            Self::Artefact(e) => e.common(),
            Self::Spike(e) => e.common(),
            Self::Seizure(e) => e.common(),
            Self::Sleep(e) => e.common(),
            Self::RPeak(e) => e.common(),
        }
    }

    /// Decode a record body of the given class
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::UnknownClass`] for unknown class names
    pub fn load<R: Read>(
        reader: &mut ArchiveReader<R>,
        class_name: &str,
        version: FormatVersion,
    ) -> Result<Self> {
        Ok(match class_name {
            MARKER_CLASS => Self::Marker(MarkerEvent::load(reader, version)?),
            EPOCH_CLASS => Self::Epoch(EpochEvent::load(reader, version)?),
            ARTEFACT_CLASS => Self::Artefact(ArtefactEvent::load(reader, version)?),
            SPIKE_CLASS => Self::Spike(SpikeEvent::load(reader, version)?),
            SEIZURE_CLASS => Self::Seizure(SeizureEvent::load(reader, version)?),
            SLEEP_CLASS => Self::Sleep(SleepEvent::load(reader, version)?),
            RPEAK_CLASS => Self::RPeak(RPeakEvent::load(reader, version)?),
            other => return Err(EvtarcError::UnknownClass(other.to_string())),
        })
    }

    /// Decode a class marker and the record body it announces
    ///
    /// # Errors
    ///
    /// Returns error if the class marker is empty or names an unknown class
    pub fn load_tagged<R: Read>(reader: &mut ArchiveReader<R>, version: FormatVersion) -> Result<Self> {
        let offset = reader.position();
        let class_name = reader.read_class()?.ok_or_else(|| {
            EvtarcError::InvalidFormat(format!("missing record class at offset {offset}"))
        })?;
        let record = Self::load(reader, &class_name, version)?;
        trace!(
            "Loaded {} #{} at offset {}",
            class_name,
            record.common().visible_id,
            offset
        );
        Ok(record)
    }

    /// Encode the record body
    ///
    /// # Errors
    ///
    /// Returns error if a field cannot be represented in this version
    pub fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>, version: FormatVersion) -> Result<()> {
        match self {
            Self::Marker(e) => e.store(writer, version),
            Self::Epoch(e) => e.store(writer, version),
            Self::Artefact(e) => e.store(writer, version),
            Self::Spike(e) => e.store(writer, version),
            Self::Seizure(e) => e.store(writer, version),
            Self::Sleep(e) => e.store(writer, version),
            Self::RPeak(e) => e.store(writer, version),
        }
    }

    /// Encode the class marker followed by the record body
    ///
    /// # Errors
    ///
    /// Returns error if a field cannot be represented in this version
    pub fn store_tagged<W: Write>(
        &self,
        writer: &mut ArchiveWriter<W>,
        version: FormatVersion,
    ) -> Result<()> {
        writer.write_class(Some(self.class_name()))?;
        self.store(writer, version)
    }
}
