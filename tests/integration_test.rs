//! Integration tests for archive files

use std::fs;
use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use evtarc::archive::{ArchiveWriter, FormatVersion};
use evtarc::events::{
    write_partial_archive, write_record, ArtefactEvent, BaseEvent, Channel, EpochAnnotation,
    EpochEvent, EventKind, ImpedanceReading, MarkerEvent, SleepEvent, VideoAnnotation,
};
use evtarc::file::{read_library_file, write_library_file};
use evtarc::{read_archive, Config, DecodeLimits, ErrorKind, EventLibrary, EvtarcError};

fn stamp(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 11, 20)
        .unwrap()
        .and_hms_opt(14, minute, 0)
        .unwrap()
}

fn recording_library() -> EventLibrary {
    let mut library = EventLibrary::new("Routine EEG");

    library.add_impedance_reading(&ImpedanceReading {
        name: "Impedance".to_string(),
        stamp: stamp(0),
        values: vec![3000.0, 4000.0, 25_000.0],
        condition: Some("before".to_string()),
    });
    library.add_epoch_annotation(&EpochAnnotation {
        name: "Hyperventilation".to_string(),
        stamp: stamp(5),
        duration: 180.0,
        condition: Some("HV".to_string()),
        trigger_code: Some(2),
    });
    library.add_video_annotation(&VideoAnnotation {
        name: "Video".to_string(),
        stamp: stamp(6),
        duration: 4.0,
        marker_type: 7,
        file_name: Some("patient.avi".to_string()),
        condition: None,
        trigger_code: None,
    });
    library.add_marker(MarkerEvent {
        common: BaseEvent::new("Eyes open", stamp(8)),
        channel: Channel::new("O1", "Cz"),
        description: "patient instructed".to_string(),
        show_amplitude: 0,
        show_duration: 1,
    });
    library.add_artefact(ArtefactEvent {
        common: BaseEvent::new("Swallow", stamp(9)),
        channel: Channel::new("T4", "Cz"),
        description: String::new(),
    });

    library
}

#[test]
fn test_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("routine.evt");

    let library = recording_library();
    write_library_file(&path, &library).unwrap();
    let loaded = read_library_file(&path, &DecodeLimits::default()).unwrap();

    assert_eq!(loaded, library);
    assert_eq!(loaded.count(EventKind::Impedance), 1);
    assert_eq!(loaded.count(EventKind::Video), 1);
    assert_eq!(loaded.count(EventKind::Marker), 1);

    let readings = loaded.impedance_readings().unwrap();
    assert_eq!(readings[0].values, vec![3000.0, 4000.0, 25_000.0]);

    let videos = loaded.video_annotations().unwrap();
    assert_eq!(videos[0].file_name.as_deref(), Some("patient.avi"));

    let epochs = loaded.epoch_annotations().unwrap();
    assert_eq!(epochs[0].condition.as_deref(), Some("HV"));
    assert_eq!(epochs[0].trigger_code, Some(2));
}

#[test]
fn test_ids_follow_insertion_order() {
    let library = recording_library();
    let mut ids: Vec<i32> = library.records().map(|(_, e)| e.visible_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_convert_between_versions() {
    let temp_dir = TempDir::new().unwrap();
    let new_path = temp_dir.path().join("new.evt");
    let old_path = temp_dir.path().join("old.evt");

    let mut library = recording_library();
    write_library_file(&new_path, &library).unwrap();

    library.version = FormatVersion::new(50);
    write_library_file(&old_path, &library).unwrap();

    let old = read_library_file(&old_path, &DecodeLimits::default()).unwrap();
    assert_eq!(old.version, FormatVersion::new(50));
    assert_eq!(old.total_events(), library.total_events());
    // Descriptors survive at version 50, so the buckets do too
    assert_eq!(old.impedances().len(), 1);
    assert_eq!(old.videos().len(), 1);

    assert!(fs::metadata(&old_path).unwrap().len() < fs::metadata(&new_path).unwrap().len());
}

#[test]
fn test_streaming_writer() {
    let version = FormatVersion::CURRENT;
    let mut writer = ArchiveWriter::new(Vec::new());
    write_partial_archive(&mut writer, "stream", version, 3).unwrap();

    for (i, minute) in [1u32, 2].into_iter().enumerate() {
        let mut common = BaseEvent::new(format!("Epoch {i}"), stamp(minute));
        common.visible_id = i as i32 + 1;
        write_record(&mut writer, &EpochEvent { common }, version).unwrap();
    }
    let mut common = BaseEvent::new("Stage N2", stamp(3));
    common.visible_id = 3;
    let sleep = SleepEvent {
        common,
        base_level: 2,
        threshold: 1,
        min_duration: 30,
        max_value: 5,
        epoch_length: 30,
        epoch_color: 0x0000_80FF,
    };
    write_record(&mut writer, &sleep, version).unwrap();

    let library = read_archive(Cursor::new(writer.into_inner())).unwrap();
    assert_eq!(library.name, "stream");
    assert_eq!(library.epochs().len(), 2);
    assert_eq!(library.sleeps(), &[sleep]);
}

#[test]
fn test_count_larger_than_records_is_truncated() {
    let mut writer = ArchiveWriter::new(Vec::new());
    write_partial_archive(&mut writer, "short", FormatVersion::CURRENT, 2).unwrap();
    write_record(&mut writer, &EpochEvent::default(), FormatVersion::CURRENT).unwrap();

    let err = read_archive(Cursor::new(writer.into_inner())).unwrap_err();
    assert!(matches!(err, EvtarcError::Truncated(_)));
}

#[test]
fn test_truncated_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cut.evt");

    write_library_file(&path, &recording_library()).unwrap();
    let bytes = fs::read(&path).unwrap();

    for cut in [10, 24, 40, bytes.len() - 1] {
        fs::write(&path, &bytes[..cut]).unwrap();
        let err = read_library_file(&path, &DecodeLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data, "cut at {cut}");
    }
}

#[test]
fn test_garbage_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("garbage.evt");
    fs::write(&path, [0xABu8; 64]).unwrap();

    let err = read_library_file(&path, &DecodeLimits::default()).unwrap_err();
    assert!(err.is_data_error());
}

#[test]
fn test_limits_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("evtarc.toml");
    fs::write(&config_path, "[limits]\nmax_string_len = 4\n").unwrap();
    let config = Config::from_file(&config_path).unwrap();

    let path = temp_dir.path().join("routine.evt");
    write_library_file(&path, &recording_library()).unwrap();

    let err = read_library_file(&path, &config.limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Limit);
}
