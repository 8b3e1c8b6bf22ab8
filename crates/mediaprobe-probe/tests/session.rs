//! End-to-end session tests over synthetic files of every supported format.

use assert_matches::assert_matches;
use mediaprobe_fixtures::{
    sample_mp4, write_temp, AviBuilder, FlacBuilder, MkvBuilder, MkvTrack, Mp4Builder, TrackSpec,
    WavBuilder,
};
use mediaprobe_probe::{
    ContainerFormat, InfoKind, ProbeError, ProbeSession, SessionOptions, SessionState, StreamKind,
};

fn get(session: &mut ProbeSession, kind: StreamKind, index: usize, param: &str) -> Option<String> {
    session.get(kind, index, param).unwrap()
}

#[test]
fn test_mp4_scenario() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::General).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Video).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Audio).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Text).unwrap(), 0);

    assert_eq!(get(&mut session, StreamKind::General, 0, "Format").as_deref(), Some("MPEG-4"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Duration").as_deref(), Some("120000"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Width").as_deref(), Some("1920"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Height").as_deref(), Some("1080"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "FrameRate").as_deref(), Some("25"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "FrameCount").as_deref(), Some("3000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingRate").as_deref(), Some("48000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Channels").as_deref(), Some("2"));
    assert_eq!(session.format().unwrap(), Some(ContainerFormat::Mp4));
}

#[test]
fn test_missing_parameter_and_stream() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(get(&mut session, StreamKind::Video, 0, "NoSuchParameter"), None);
    assert_eq!(get(&mut session, StreamKind::Video, 1, "Duration"), None);
    assert_eq!(get(&mut session, StreamKind::Menu, 0, "Format"), None);
}

#[test]
fn test_repeated_queries_are_stable() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();

    let first = get(&mut session, StreamKind::Video, 0, "Duration");
    let second = get(&mut session, StreamKind::Video, 0, "Duration");
    assert_eq!(first, second);
    assert_eq!(
        session.parameters(StreamKind::Video, 0).unwrap(),
        session.parameters(StreamKind::Video, 0).unwrap()
    );
}

#[test]
fn test_non_media_file_has_no_streams() {
    let file = write_temp(b"just some plain text, nothing to see here\n", ".txt");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::General).unwrap(), 0);
    assert_eq!(session.count(StreamKind::Video).unwrap(), 0);
    assert_eq!(get(&mut session, StreamKind::General, 0, "Format"), None);
    assert_eq!(session.format().unwrap(), None);
}

#[test]
fn test_empty_file_has_no_streams() {
    let file = write_temp(b"", ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();
    assert_eq!(session.count(StreamKind::General).unwrap(), 0);
}

#[test]
fn test_strict_unknown_format() {
    let file = write_temp(b"just some plain text, nothing to see here\n", ".txt");
    let mut session = ProbeSession::open_with(file.path(), SessionOptions::strict()).unwrap();

    assert_matches!(session.count(StreamKind::General), Err(ProbeError::UnsupportedFormat));
    // Replayed on every query; the session itself stays usable.
    assert_matches!(
        session.get(StreamKind::General, 0, "Format"),
        Err(ProbeError::UnsupportedFormat)
    );
    assert_eq!(session.state(), SessionState::Parsed);
}

#[test]
fn test_truncated_file_lenient_and_strict() {
    let data = sample_mp4();
    let file = write_temp(&data[..data.len() / 2], ".mp4");

    let mut lenient = ProbeSession::open(file.path()).unwrap();
    assert_eq!(lenient.count(StreamKind::General).unwrap(), 1);
    assert!(lenient.count(StreamKind::Video).unwrap() <= 1);
    assert!(lenient.count(StreamKind::Audio).unwrap() <= 1);

    let mut strict = ProbeSession::open_with(file.path(), SessionOptions::strict()).unwrap();
    assert_matches!(strict.count(StreamKind::Video), Err(ProbeError::MalformedContainer(_)));
    assert_matches!(strict.count(StreamKind::Audio), Err(ProbeError::MalformedContainer(_)));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert_matches!(
        ProbeSession::open(dir.path().join("absent.mkv")),
        Err(ProbeError::FileNotFound(_))
    );
}

#[test]
fn test_close_is_idempotent() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();
    assert_eq!(session.count(StreamKind::Video).unwrap(), 1);

    session.close();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert_matches!(session.count(StreamKind::Video), Err(ProbeError::SessionClosed));
    assert_matches!(
        session.get(StreamKind::Video, 0, "Duration"),
        Err(ProbeError::SessionClosed)
    );
}

#[test]
fn test_cancel_before_first_query() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();
    let cancel = session.cancel_handle();

    std::thread::spawn(move || cancel.cancel()).join().unwrap();

    assert_matches!(session.count(StreamKind::Video), Err(ProbeError::SessionClosed));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_session_moves_between_threads() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();
    assert_eq!(session.count(StreamKind::Video).unwrap(), 1);

    let duration = std::thread::spawn(move || session.get(StreamKind::Video, 0, "Duration").unwrap())
        .join()
        .unwrap();
    assert_eq!(duration.as_deref(), Some("120000"));
}

#[test]
fn test_mp4_timecode_track() {
    let data = Mp4Builder::new()
        .movie(1000, 10_000)
        .track(TrackSpec::video(1280, 720).timing(30_000, 300_300, 1001, 300))
        .track(TrackSpec::timecode(0x1, 30_000, 1001, 30).timing(30_000, 300_300, 300_300, 1))
        .build();
    let file = write_temp(&data, ".mov");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::Other).unwrap(), 1);
    assert_eq!(get(&mut session, StreamKind::Other, 0, "Type").as_deref(), Some("Time code"));
    assert_eq!(get(&mut session, StreamKind::Other, 0, "Format").as_deref(), Some("QuickTime TC"));
    assert_eq!(get(&mut session, StreamKind::Other, 0, "FrameRate").as_deref(), Some("29.97"));
    assert_eq!(
        get(&mut session, StreamKind::Other, 0, "TimeCode_Settings").as_deref(),
        Some("Drop frame")
    );
    assert_eq!(get(&mut session, StreamKind::General, 0, "OtherCount").as_deref(), Some("1"));
}

#[test]
fn test_wav_pcm() {
    let data = WavBuilder::pcm(2, 48_000, 16)
        .data_len(192_000)
        .info(b"INAM", "Take One")
        .build();
    let file = write_temp(&data, ".wav");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::Audio).unwrap(), 1);
    assert_eq!(get(&mut session, StreamKind::General, 0, "Format").as_deref(), Some("Wave"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Title").as_deref(), Some("Take One"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Format").as_deref(), Some("PCM"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingRate").as_deref(), Some("48000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "BitDepth").as_deref(), Some("16"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "BitRate").as_deref(), Some("1536000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Duration").as_deref(), Some("1000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingCount").as_deref(), Some("48000"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Duration").as_deref(), Some("1000"));
}

#[test]
fn test_flac_high_sample_rate() {
    let data = FlacBuilder::new(96_000, 2, 24)
        .total_samples(960_000)
        .comment("TITLE", "Night Drive")
        .build();
    let file = write_temp(&data, ".flac");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::Audio).unwrap(), 1);
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingRate").as_deref(), Some("96000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "BitDepth").as_deref(), Some("24"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Channels").as_deref(), Some("2"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Duration").as_deref(), Some("10000"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Title").as_deref(), Some("Night Drive"));
}

#[test]
fn test_matroska_streams() {
    let data = MkvBuilder::matroska()
        .duration(5000.0)
        .title("Feature")
        .track(MkvTrack::video("V_MPEG4/ISO/AVC", 1280, 720))
        .track(MkvTrack {
            language: Some("eng".to_string()),
            ..MkvTrack::audio("A_OPUS", 2, 48_000.0)
        })
        .track(MkvTrack::subtitle("S_TEXT/UTF8"))
        .chapters(3)
        .build();
    let file = write_temp(&data, ".mkv");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::Video).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Audio).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Text).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Menu).unwrap(), 1);

    assert_eq!(get(&mut session, StreamKind::General, 0, "Format").as_deref(), Some("Matroska"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Duration").as_deref(), Some("5000"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Title").as_deref(), Some("Feature"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Width").as_deref(), Some("1280"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingRate").as_deref(), Some("48000"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "Language").as_deref(), Some("eng"));
    assert_eq!(get(&mut session, StreamKind::Text, 0, "Default").as_deref(), Some("Yes"));
    assert_eq!(get(&mut session, StreamKind::Menu, 0, "ChapterCount").as_deref(), Some("3"));
}

#[test]
fn test_avi_streams() {
    let data = AviBuilder::new()
        .video(b"XVID", 640, 480, 1, 25, 250)
        .named("Main")
        .audio(1, 2, 44_100, 16)
        .build();
    let file = write_temp(&data, ".avi");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(session.count(StreamKind::Video).unwrap(), 1);
    assert_eq!(session.count(StreamKind::Audio).unwrap(), 1);
    assert_eq!(get(&mut session, StreamKind::General, 0, "Format").as_deref(), Some("AVI"));
    assert_eq!(get(&mut session, StreamKind::General, 0, "Duration").as_deref(), Some("10000"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Title").as_deref(), Some("Main"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "Width").as_deref(), Some("640"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "FrameRate").as_deref(), Some("25"));
    assert_eq!(get(&mut session, StreamKind::Video, 0, "FrameCount").as_deref(), Some("250"));
    assert_eq!(get(&mut session, StreamKind::Audio, 0, "SamplingRate").as_deref(), Some("44100"));
}

#[test]
fn test_measure_and_name() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let mut session = ProbeSession::open(file.path()).unwrap();

    assert_eq!(
        session
            .get_info(StreamKind::Video, 0, "Duration", InfoKind::Measure)
            .unwrap()
            .as_deref(),
        Some(" ms")
    );
    assert_eq!(
        session
            .get_info(StreamKind::Video, 0, "Width", InfoKind::Name)
            .unwrap()
            .as_deref(),
        Some("Width")
    );
}
