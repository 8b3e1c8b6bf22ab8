//! Integration tests for sniffing and walking synthetic containers.

use std::io::Cursor;

use mediaprobe_container::sniff::{identify, sniff, DEFAULT_SNIFF_LIMIT};
use mediaprobe_container::{
    read_container, read_container_lenient, ContainerFormat, Error, Liveness, StreamKind,
};
use mediaprobe_fixtures::{
    sample_mp4, AviBuilder, FlacBuilder, MkvBuilder, MkvTrack, Mp4Builder, TrackSpec, WavBuilder,
};

fn samples() -> Vec<(ContainerFormat, Vec<u8>)> {
    vec![
        (ContainerFormat::Mp4, sample_mp4()),
        (
            ContainerFormat::Matroska,
            MkvBuilder::matroska()
                .duration(5000.0)
                .track(MkvTrack::video("V_MPEG4/ISO/AVC", 1280, 720))
                .track(MkvTrack::audio("A_OPUS", 2, 48000.0))
                .track(MkvTrack::subtitle("S_TEXT/UTF8"))
                .chapters(3)
                .build(),
        ),
        (
            ContainerFormat::WebM,
            MkvBuilder::webm()
                .track(MkvTrack::video("V_VP9", 640, 360))
                .track(MkvTrack::audio("A_VORBIS", 2, 44100.0))
                .build(),
        ),
        (ContainerFormat::Wave, WavBuilder::pcm(2, 44_100, 16).data_len(400).build()),
        (
            ContainerFormat::Avi,
            AviBuilder::new()
                .video(b"XVID", 720, 480, 1001, 30000, 300)
                .audio(0x55, 2, 44_100, 16)
                .build(),
        ),
        (
            ContainerFormat::Flac,
            FlacBuilder::new(44_100, 2, 16)
                .total_samples(441_000)
                .comment("TITLE", "Test")
                .build(),
        ),
    ]
}

fn counts(parsed: &mediaprobe_container::ParsedContainer) -> Vec<usize> {
    StreamKind::ALL[1..].iter().map(|k| parsed.count(*k)).collect()
}

#[test]
fn test_identify_every_format() {
    for (format, data) in samples() {
        assert_eq!(identify(&data), Some(format), "format {}", format);

        let mut cursor = Cursor::new(data);
        assert_eq!(sniff(&mut cursor, DEFAULT_SNIFF_LIMIT).unwrap(), Some(format));
    }
}

#[test]
fn test_walk_every_format() {
    let expected = [
        (ContainerFormat::Mp4, [1, 1, 0, 0, 0, 0]),
        (ContainerFormat::Matroska, [1, 1, 1, 0, 0, 1]),
        (ContainerFormat::WebM, [1, 1, 0, 0, 0, 0]),
        (ContainerFormat::Wave, [0, 1, 0, 0, 0, 0]),
        (ContainerFormat::Avi, [1, 1, 0, 0, 0, 0]),
        (ContainerFormat::Flac, [0, 1, 0, 0, 0, 0]),
    ];

    for ((format, data), (expected_format, expected_counts)) in samples().into_iter().zip(expected) {
        assert_eq!(format, expected_format);
        let mut cursor = Cursor::new(data);
        let parsed = read_container(format, &mut cursor, &Liveness::new())
            .unwrap_or_else(|e| panic!("{} failed: {}", format, e));
        assert_eq!(counts(&parsed), expected_counts.to_vec(), "format {}", format);
    }
}

#[test]
fn test_truncation_never_increases_counts() {
    for (format, data) in samples() {
        let mut full_cursor = Cursor::new(data.clone());
        let full = read_container(format, &mut full_cursor, &Liveness::new()).unwrap();
        let full_counts = counts(&full);

        for cut in 0..data.len() {
            let mut cursor = Cursor::new(data[..cut].to_vec());
            let (partial, _) = read_container_lenient(format, &mut cursor, &Liveness::new()).unwrap();
            let partial_counts = counts(&partial);
            for (p, f) in partial_counts.iter().zip(&full_counts) {
                assert!(p <= f, "{} cut at {}: {:?} > {:?}", format, cut, partial_counts, full_counts);
            }
        }
    }
}

#[test]
fn test_cancelled_walk() {
    let live = Liveness::new();
    live.kill();
    let mut cursor = Cursor::new(sample_mp4());
    let err = read_container(ContainerFormat::Mp4, &mut cursor, &live).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_moov_after_mdat() {
    let data = Mp4Builder::new()
        .movie(600, 6000)
        .track(TrackSpec::audio(1, 22_050).timing(22_050, 220_500, 1024, 216))
        .moov_last()
        .mdat_len(4096)
        .build();
    let mut cursor = Cursor::new(data);
    let parsed = read_container(ContainerFormat::Mp4, &mut cursor, &Liveness::new()).unwrap();
    assert_eq!(parsed.count(StreamKind::Audio), 1);
}

#[test]
fn test_text_sniffs_unknown() {
    assert_eq!(identify(b"just some words\n"), None);
    assert_eq!(identify(&[]), None);
}

#[test]
fn test_wave_with_zero_riff_size() {
    let mut data = WavBuilder::pcm(2, 48_000, 16).data_len(4800).build();
    data[4..8].copy_from_slice(&0u32.to_le_bytes());

    let mut cursor = Cursor::new(data);
    let parsed = read_container(ContainerFormat::Wave, &mut cursor, &Liveness::new()).unwrap();
    assert_eq!(parsed.count(StreamKind::Audio), 1);
}
