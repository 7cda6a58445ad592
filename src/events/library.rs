//! Event library aggregate and archive framing

use std::io::{Read, Write};

use tracing::{debug, info, trace};

use super::model::{
    ArtefactEvent, BaseEvent, EpochEvent, Event, MarkerEvent, RPeakEvent, SeizureEvent,
    SleepEvent, SpikeEvent,
};
use super::record::{ArchiveRecord, EventRecord};
use crate::archive::{
    validate_header, ArchiveHeader, ArchiveReader, ArchiveWriter, FormatVersion, LIBRARY_CLASS,
};
use crate::config::DecodeLimits;
use crate::variant::VariantType;
use crate::{EvtarcError, Result};

/// Descriptor holding a condition label (wide string)
pub const CONDITION: &str = "Condition";
/// Descriptor holding a trigger code (int32)
pub const TRIGGER_CODE: &str = "TriggerCode";
/// Descriptor holding per-channel impedances (float32 array, kOhm)
pub const IMPEDANCE: &str = "Impedance";
/// Unit of the [`IMPEDANCE`] descriptor
pub const IMPEDANCE_UNIT: &str = "kOhm";
/// Descriptor holding a video marker type (int32)
pub const VIDEO_MARKER_TYPE: &str = "VideoMarkerType";
/// Descriptor holding a video file name (wide string)
pub const VIDEO_FILE_NAME: &str = "VideoFileName";

/// Library bucket an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Marker carrying an impedance array
    Impedance,
    /// Marker carrying a video marker type
    Video,
    /// Plain marker
    Marker,
    /// Epoch
    Epoch,
    /// Artefact
    Artefact,
    /// Spike
    Spike,
    /// Seizure
    Seizure,
    /// Sleep staging
    Sleep,
    /// R-peak
    RPeak,
}

impl EventKind {
    /// Buckets in the order they are written to an archive
    pub const WIRE_ORDER: [Self; 9] = [
        Self::Impedance,
        Self::Video,
        Self::Marker,
        Self::Epoch,
        Self::Artefact,
        Self::Spike,
        Self::Seizure,
        Self::Sleep,
        Self::RPeak,
    ];

    /// Lowercase label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Impedance => "impedance",
            Self::Video => "video",
            Self::Marker => "marker",
            Self::Epoch => "epoch",
            Self::Artefact => "artefact",
            Self::Spike => "spike",
            Self::Seizure => "seizure",
            Self::Sleep => "sleep",
            Self::RPeak => "rpeak",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket a decoded marker belongs to.
///
/// An `Impedance` descriptor holding a float32 array wins over a
/// `VideoMarkerType` descriptor; anything else is a plain marker.
#[must_use]
pub fn classify_marker(marker: &MarkerEvent) -> EventKind {
    let common = marker.common();
    let is_impedance = common.descriptor(IMPEDANCE).is_some_and(|d| {
        d.value.is_array && d.value.value_type == VariantType::Float32
    });

    if is_impedance {
        EventKind::Impedance
    } else if common.has_descriptor(VIDEO_MARKER_TYPE) {
        EventKind::Video
    } else {
        EventKind::Marker
    }
}

/// In-memory event library
///
/// Events live in one bucket per kind. Every `add_*` method assigns the next
/// `visible_id` from a counter shared by all buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLibrary {
    /// Library name
    pub name: String,
    /// Format version used when writing
    pub version: FormatVersion,
    markers: Vec<MarkerEvent>,
    videos: Vec<MarkerEvent>,
    impedances: Vec<MarkerEvent>,
    epochs: Vec<EpochEvent>,
    artefacts: Vec<ArtefactEvent>,
    spikes: Vec<SpikeEvent>,
    seizures: Vec<SeizureEvent>,
    sleeps: Vec<SleepEvent>,
    rpeaks: Vec<RPeakEvent>,
}

impl Default for EventLibrary {
    fn default() -> Self {
        Self::new("")
    }
}

impl EventLibrary {
    /// Create an empty library at the current format version
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_version(name, FormatVersion::CURRENT)
    }

    /// Create an empty library at an explicit format version
    pub fn with_version(name: impl Into<String>, version: FormatVersion) -> Self {
        Self {
            name: name.into(),
            version,
            markers: Vec::new(),
            videos: Vec::new(),
            impedances: Vec::new(),
            epochs: Vec::new(),
            artefacts: Vec::new(),
            spikes: Vec::new(),
            seizures: Vec::new(),
            sleeps: Vec::new(),
            rpeaks: Vec::new(),
        }
    }

    /// Plain markers
    pub fn markers(&self) -> &[MarkerEvent] {
        &self.markers
    }

    /// Video markers
    pub fn videos(&self) -> &[MarkerEvent] {
        &self.videos
    }

    /// Impedance markers
    pub fn impedances(&self) -> &[MarkerEvent] {
        &self.impedances
    }

    /// Epochs
    pub fn epochs(&self) -> &[EpochEvent] {
        &self.epochs
    }

    /// Artefacts
    pub fn artefacts(&self) -> &[ArtefactEvent] {
        &self.artefacts
    }

    /// Spikes
    pub fn spikes(&self) -> &[SpikeEvent] {
        &self.spikes
    }

    /// Seizures
    pub fn seizures(&self) -> &[SeizureEvent] {
        &self.seizures
    }

    /// Sleep staging events
    pub fn sleeps(&self) -> &[SleepEvent] {
        &self.sleeps
    }

    /// R-peaks
    pub fn rpeaks(&self) -> &[RPeakEvent] {
        &self.rpeaks
    }

    /// Number of events in one bucket
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Impedance => self.impedances.len(),
            EventKind::Video => self.videos.len(),
            EventKind::Marker => self.markers.len(),
            EventKind::Epoch => self.epochs.len(),
            EventKind::Artefact => self.artefacts.len(),
            EventKind::Spike => self.spikes.len(),
            EventKind::Seizure => self.seizures.len(),
            EventKind::Sleep => self.sleeps.len(),
            EventKind::RPeak => self.rpeaks.len(),
        }
    }

    /// Number of events across all buckets
    #[must_use]
    pub fn total_events(&self) -> usize {
        EventKind::WIRE_ORDER.iter().map(|&kind| self.count(kind)).sum()
    }

    /// Whether the library holds no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_events() == 0
    }

    /// Shared headers of every event, in wire order
    pub fn records(&self) -> impl Iterator<Item = (EventKind, &BaseEvent)> + '_ {
        fn tagged<'a, T: Event + 'a>(
            kind: EventKind,
            events: &'a [T],
        ) -> impl Iterator<Item = (EventKind, &'a BaseEvent)> + 'a {
            events.iter().map(move |e| (kind, e.common()))
        }

        tagged(EventKind::Impedance, &self.impedances)
            .chain(tagged(EventKind::Video, &self.videos))
            .chain(tagged(EventKind::Marker, &self.markers))
            .chain(tagged(EventKind::Epoch, &self.epochs))
            .chain(tagged(EventKind::Artefact, &self.artefacts))
            .chain(tagged(EventKind::Spike, &self.spikes))
            .chain(tagged(EventKind::Seizure, &self.seizures))
            .chain(tagged(EventKind::Sleep, &self.sleeps))
            .chain(tagged(EventKind::RPeak, &self.rpeaks))
    }

    fn next_id(&self) -> i32 {
        i32::try_from(self.total_events())
            .unwrap_or(i32::MAX)
            .saturating_add(1)
    }

    fn assign<T: Event>(&self, event: &mut T) -> i32 {
        let id = self.next_id();
        event.common_mut().visible_id = id;
        id
    }

    /// Add a plain marker and return its assigned id
    pub fn add_marker(&mut self, mut event: MarkerEvent) -> i32 {
        let id = self.assign(&mut event);
        self.markers.push(event);
        id
    }

    /// Add a video marker and return its assigned id
    pub fn add_video(&mut self, mut event: MarkerEvent) -> i32 {
        let id = self.assign(&mut event);
        self.videos.push(event);
        id
    }

    /// Add an impedance marker and return its assigned id
    pub fn add_impedance(&mut self, mut event: MarkerEvent) -> i32 {
        let id = self.assign(&mut event);
        self.impedances.push(event);
        id
    }

    /// Add an epoch and return its assigned id
    pub fn add_epoch(&mut self, mut event: EpochEvent) -> i32 {
        let id = self.assign(&mut event);
        self.epochs.push(event);
        id
    }

    /// Add an artefact and return its assigned id
    pub fn add_artefact(&mut self, mut event: ArtefactEvent) -> i32 {
        let id = self.assign(&mut event);
        self.artefacts.push(event);
        id
    }

    /// Add a spike and return its assigned id
    pub fn add_spike(&mut self, mut event: SpikeEvent) -> i32 {
        let id = self.assign(&mut event);
        self.spikes.push(event);
        id
    }

    /// Add a seizure and return its assigned id
    pub fn add_seizure(&mut self, mut event: SeizureEvent) -> i32 {
        let id = self.assign(&mut event);
        self.seizures.push(event);
        id
    }

    /// Add a sleep staging event and return its assigned id
    pub fn add_sleep(&mut self, mut event: SleepEvent) -> i32 {
        let id = self.assign(&mut event);
        self.sleeps.push(event);
        id
    }

    /// Add an R-peak and return its assigned id
    pub fn add_rpeak(&mut self, mut event: RPeakEvent) -> i32 {
        let id = self.assign(&mut event);
        self.rpeaks.push(event);
        id
    }

    /// Place a decoded record in its bucket, keeping its stored id
    fn insert_decoded(&mut self, record: EventRecord) {
        match record {
            EventRecord::Marker(marker) => match classify_marker(&marker) {
                EventKind::Impedance => self.impedances.push(marker),
                EventKind::Video => self.videos.push(marker),
                _ => self.markers.push(marker),
            },
            EventRecord::Epoch(e) => self.epochs.push(e),
            EventRecord::Artefact(e) => self.artefacts.push(e),
            EventRecord::Spike(e) => self.spikes.push(e),
            EventRecord::Seizure(e) => self.seizures.push(e),
            EventRecord::Sleep(e) => self.sleeps.push(e),
            EventRecord::RPeak(e) => self.rpeaks.push(e),
        }
    }
}

/// Read a library archive with default decode limits
///
/// # Errors
///
/// Returns error on any malformed input; no partial library is returned
pub fn read_archive<R: Read>(source: R) -> Result<EventLibrary> {
    read_archive_with(source, DecodeLimits::default())
}

/// Read a library archive with explicit decode limits
///
/// # Errors
///
/// Returns error on any malformed input; no partial library is returned
pub fn read_archive_with<R: Read>(source: R, limits: DecodeLimits) -> Result<EventLibrary> {
    let mut reader = ArchiveReader::with_limits(source, limits);

    let header = reader.read_header()?;
    let version = validate_header(&header)?;
    debug!("Archive header: version {}", version);

    match reader.read_class()? {
        None => {
            debug!("Archive has no library object");
            return Ok(EventLibrary::with_version("", version));
        }
        Some(class) if class == LIBRARY_CLASS => {}
        Some(class) => return Err(EvtarcError::UnknownClass(class)),
    }

    let name = reader.read_string()?;
    let max_records = reader.limits().max_records;
    let count = reader.read_count("record count", max_records)?;
    debug!("Loading library {:?} with {} records", name, count);

    let mut library = EventLibrary::with_version(name, version);
    for index in 0..count {
        let record = EventRecord::load_tagged(&mut reader, version)?;
        trace!("Record {}/{}: {}", index + 1, count, record.class_name());
        library.insert_decoded(record);
    }

    info!(
        "Loaded library {:?}: {} events, version {}",
        library.name,
        library.total_events(),
        version
    );
    Ok(library)
}

/// Write a complete library archive at the library's version
///
/// # Errors
///
/// Returns error if the version is unsupported, a field does not fit the
/// version's layout, or the sink fails
pub fn write_archive<W: Write>(sink: W, library: &EventLibrary) -> Result<W> {
    let version = library.version;
    let count = library.total_events();

    let mut writer = ArchiveWriter::new(sink);
    write_partial_archive(&mut writer, &library.name, version, count)?;

    for marker in &library.impedances {
        write_record(&mut writer, marker, version)?;
    }
    for marker in &library.videos {
        write_record(&mut writer, marker, version)?;
    }
    for marker in &library.markers {
        write_record(&mut writer, marker, version)?;
    }
    for epoch in &library.epochs {
        write_record(&mut writer, epoch, version)?;
    }
    for artefact in &library.artefacts {
        write_record(&mut writer, artefact, version)?;
    }
    for spike in &library.spikes {
        write_record(&mut writer, spike, version)?;
    }
    for seizure in &library.seizures {
        write_record(&mut writer, seizure, version)?;
    }
    for sleep in &library.sleeps {
        write_record(&mut writer, sleep, version)?;
    }
    for rpeak in &library.rpeaks {
        write_record(&mut writer, rpeak, version)?;
    }

    writer.flush()?;
    info!(
        "Wrote library {:?}: {} events, {} bytes, version {}",
        library.name,
        count,
        writer.position(),
        version
    );
    Ok(writer.into_inner())
}

/// Write the archive header, library class, name and record count.
///
/// The caller must follow with exactly `count` calls to [`write_record`].
///
/// # Errors
///
/// Returns error if the version is unsupported or the sink fails
pub fn write_partial_archive<W: Write>(
    writer: &mut ArchiveWriter<W>,
    name: &str,
    version: FormatVersion,
    count: usize,
) -> Result<()> {
    version.check_supported()?;
    writer.write_header(&ArchiveHeader::new(version))?;
    writer.write_class(Some(LIBRARY_CLASS))?;
    writer.write_string(name)?;
    writer.write_count("record count", count)?;
    debug!("Library frame {:?}: {} records, version {}", name, count, version);
    Ok(())
}

/// Write one class-tagged record
///
/// # Errors
///
/// Returns error if a field does not fit the version's layout or the sink
/// fails
pub fn write_record<W: Write, T: ArchiveRecord>(
    writer: &mut ArchiveWriter<W>,
    record: &T,
    version: FormatVersion,
) -> Result<()> {
    writer.write_class(Some(T::CLASS_NAME))?;
    record.store(writer, version)?;
    trace!("Stored {} #{}", T::CLASS_NAME, record.common().visible_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::model::{Channel, EventDescriptor};
    use crate::variant::Variant;
    use crate::ErrorKind;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::io::Cursor;

    fn stamp(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_milli_opt(8, 0, second, 250)
            .unwrap()
    }

    fn marker(name: &str, descriptors: Vec<EventDescriptor>) -> MarkerEvent {
        let mut common = BaseEvent::new(name, stamp(0));
        common.descriptors = descriptors;
        MarkerEvent {
            common,
            channel: Channel::new("Fp1", "Cz"),
            description: name.to_lowercase(),
            show_amplitude: 1,
            show_duration: 0,
        }
    }

    fn roundtrip(library: &EventLibrary) -> EventLibrary {
        let bytes = write_archive(Vec::new(), library).unwrap();
        read_archive(Cursor::new(bytes)).unwrap()
    }

    fn full_library() -> EventLibrary {
        let mut library = EventLibrary::new("Patient 12 – night");

        library.add_impedance(marker(
            "Impedance",
            vec![EventDescriptor::new(
                IMPEDANCE,
                IMPEDANCE_UNIT,
                Variant::array(&[1.0f32, 4.5, 12.0]),
            )],
        ));
        library.add_video(marker(
            "Video",
            vec![
                EventDescriptor::new(VIDEO_MARKER_TYPE, "", Variant::scalar(2i32)),
                EventDescriptor::new(VIDEO_FILE_NAME, "", Variant::scalar("cam1.avi".to_string())),
            ],
        ));
        library.add_marker(marker("Blink", Vec::new()));

        let mut epoch = EpochEvent {
            common: BaseEvent::new("Epoch", stamp(1)),
        };
        epoch.common.duration = 30.0;
        epoch.common.user_visible_name = "Eyes closed".to_string();
        epoch.common.descriptors.push(EventDescriptor::new(
            CONDITION,
            "",
            Variant::scalar("EC".to_string()),
        ));
        library.add_epoch(epoch);

        library.add_artefact(ArtefactEvent {
            common: BaseEvent::new("Artefact", stamp(2)),
            channel: Channel::new("O1", "Cz"),
            description: "movement".to_string(),
        });
        library.add_spike(SpikeEvent {
            common: BaseEvent::new("Spike", stamp(3)),
            channel: Channel::new("T3", "Cz"),
            amplitude_peak: 120.5,
            sign: -1,
            group: 4,
            top_date: stamp(4),
        });
        library.add_seizure(SeizureEvent {
            common: BaseEvent::new("Seizure", stamp(5)),
            channel: Channel::new("F7", "Cz"),
        });
        library.add_sleep(SleepEvent {
            common: BaseEvent::new("Sleep", stamp(6)),
            base_level: 2,
            threshold: -3,
            min_duration: 10,
            max_value: 400,
            epoch_length: 30,
            epoch_color: 0x00FF_8000,
        });
        library.add_rpeak(RPeakEvent {
            common: BaseEvent::new("RPeak", stamp(7)),
            channel: Channel::new("ECG+", "ECG-"),
            amplitude_peak: 0.75,
        });

        library
    }

    #[test]
    fn test_full_roundtrip() {
        let library = full_library();
        assert_eq!(library.total_events(), 9);

        let loaded = roundtrip(&library);
        assert_eq!(loaded, library);
        for kind in EventKind::WIRE_ORDER {
            assert_eq!(loaded.count(kind), 1, "{kind}");
        }
    }

    #[test]
    fn test_marker_reclassification() {
        let mut library = EventLibrary::new("reclassify");
        library.add_marker(marker(
            "I",
            vec![EventDescriptor::new(
                IMPEDANCE,
                IMPEDANCE_UNIT,
                Variant::array(&[3.0f32]),
            )],
        ));
        library.add_marker(marker(
            "V",
            vec![EventDescriptor::new(VIDEO_MARKER_TYPE, "", Variant::scalar(1i32))],
        ));
        library.add_marker(marker("M", Vec::new()));
        assert_eq!(library.markers().len(), 3);

        let loaded = roundtrip(&library);
        assert_eq!(loaded.impedances().len(), 1);
        assert_eq!(loaded.impedances()[0].common.name, "I");
        assert_eq!(loaded.videos().len(), 1);
        assert_eq!(loaded.videos()[0].common.name, "V");
        assert_eq!(loaded.markers().len(), 1);
        assert_eq!(loaded.markers()[0].common.name, "M");
    }

    #[test]
    fn test_impedance_scalar_is_plain_marker() {
        let scalar = marker(
            "I",
            vec![EventDescriptor::new(IMPEDANCE, IMPEDANCE_UNIT, Variant::scalar(3.0f32))],
        );
        assert_eq!(classify_marker(&scalar), EventKind::Marker);
    }

    #[test]
    fn test_impedance_needs_float32_array() {
        let wide = marker(
            "I",
            vec![EventDescriptor::new(
                IMPEDANCE,
                IMPEDANCE_UNIT,
                Variant::array(&[3.0f64, 4.0]),
            )],
        );
        assert_eq!(classify_marker(&wide), EventKind::Marker);

        let mut library = EventLibrary::new("float64");
        library.add_impedance(wide);
        let loaded = roundtrip(&library);
        assert!(loaded.impedances().is_empty());
        assert_eq!(loaded.markers().len(), 1);
    }

    #[test]
    fn test_stamp_past_last_day_is_rejected_on_write() {
        let mut library = EventLibrary::new("far future");
        library.add_epoch(EpochEvent {
            common: BaseEvent::new(
                "E",
                NaiveDate::from_ymd_opt(10_500, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
        });

        let err = write_archive(Vec::new(), &library).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }

    #[test]
    fn test_shared_id_counter() {
        let mut library = EventLibrary::new("ids");
        assert_eq!(library.add_marker(marker("M", Vec::new())), 1);
        assert_eq!(library.add_epoch(EpochEvent::default()), 2);
        assert_eq!(library.add_video(marker("V", Vec::new())), 3);

        assert_eq!(library.markers()[0].common.visible_id, 1);
        assert_eq!(library.epochs()[0].common.visible_id, 2);
        assert_eq!(library.videos()[0].common.visible_id, 3);
    }

    #[test]
    fn test_libraries_are_independent() {
        let mut a = EventLibrary::new("a");
        let mut b = EventLibrary::new("b");
        a.add_marker(MarkerEvent::default());
        a.add_marker(MarkerEvent::default());
        assert_eq!(b.add_marker(MarkerEvent::default()), 1);
    }

    #[test]
    fn test_wire_order() {
        let library = full_library();
        let kinds: Vec<EventKind> = library.records().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, EventKind::WIRE_ORDER.to_vec());

        let bytes = write_archive(Vec::new(), &library).unwrap();
        let mut reader = ArchiveReader::new(Cursor::new(bytes));
        reader.read_header().unwrap();
        reader.read_class().unwrap();
        reader.read_string().unwrap();
        assert_eq!(reader.read_u32().unwrap(), 9);

        let names: Vec<String> = (0..9)
            .map(|_| {
                EventRecord::load_tagged(&mut reader, FormatVersion::CURRENT)
                    .unwrap()
                    .common()
                    .name
                    .clone()
            })
            .collect();
        assert_eq!(
            names,
            [
                "Impedance", "Video", "Blink", "Epoch", "Artefact", "Spike", "Seizure", "Sleep",
                "RPeak"
            ]
        );
    }

    #[test]
    fn test_empty_archive_without_library_class() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer
            .write_header(&ArchiveHeader::new(FormatVersion::new(100)))
            .unwrap();
        writer.write_class(None).unwrap();

        let library = read_archive(Cursor::new(writer.into_inner())).unwrap();
        assert!(library.is_empty());
        assert_eq!(library.version, FormatVersion::new(100));
    }

    #[test]
    fn test_unsupported_mode() {
        let mut header = ArchiveHeader::new(FormatVersion::CURRENT);
        header.compression_mode = 2;
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.write_header(&header).unwrap();
        writer.write_class(None).unwrap();

        let err = read_archive(Cursor::new(writer.into_inner())).unwrap_err();
        assert!(matches!(err, EvtarcError::UnsupportedMode { compression: 2, .. }));
    }

    #[test]
    fn test_foreign_library_class() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer
            .write_header(&ArchiveHeader::new(FormatVersion::CURRENT))
            .unwrap();
        writer.write_class(Some("class dcMontage_c")).unwrap();

        let err = read_archive(Cursor::new(writer.into_inner())).unwrap_err();
        assert!(matches!(err, EvtarcError::UnknownClass(_)));
    }

    #[test]
    fn test_unknown_record_class_aborts_load() {
        let mut writer = ArchiveWriter::new(Vec::new());
        write_partial_archive(&mut writer, "lib", FormatVersion::CURRENT, 2).unwrap();
        write_record(&mut writer, &EpochEvent::default(), FormatVersion::CURRENT).unwrap();
        writer.write_class(Some("class dcNoteEvent_c")).unwrap();

        let err = read_archive(Cursor::new(writer.into_inner())).unwrap_err();
        assert!(matches!(err, EvtarcError::UnknownClass(ref name) if name == "class dcNoteEvent_c"));
    }

    #[test]
    fn test_record_count_limit() {
        let mut writer = ArchiveWriter::new(Vec::new());
        write_partial_archive(&mut writer, "lib", FormatVersion::CURRENT, 1_000).unwrap();

        let limits = DecodeLimits {
            max_records: 10,
            ..DecodeLimits::default()
        };
        let err = read_archive_with(Cursor::new(writer.into_inner()), limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }

    #[test]
    fn test_old_version_drops_descriptors() {
        let mut library = full_library();
        library.version = FormatVersion::new(10);

        let loaded = roundtrip(&library);
        assert_eq!(loaded.version, FormatVersion::new(10));
        assert!(loaded.records().all(|(_, common)| common.descriptors.is_empty()));
        // Without descriptors the impedance and video markers fold into plain markers
        assert_eq!(loaded.markers().len(), 3);
        assert_eq!(loaded.artefacts()[0].description, "");
    }

    #[test]
    fn test_write_rejects_version_gap() {
        let library = EventLibrary::with_version("gap", FormatVersion::new(15));
        let err = write_archive(Vec::new(), &library).unwrap_err();
        assert!(matches!(err, EvtarcError::UnsupportedVersion(15)));
    }
}
