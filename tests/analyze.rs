//! Typed analysis over synthetic files.

use assert_matches::assert_matches;
use mediaprobe::config::{Config, ProbeConfig};
use mediaprobe::{analyze, analyze_all, analyze_dir, analyze_with, HdrFormat, ProbeError};
use mediaprobe_fixtures::mp4::colr_nclx;
use mediaprobe_fixtures::{
    sample_mp4, write_temp, FlacBuilder, MkvBuilder, MkvTrack, Mp4Builder, TrackSpec, WavBuilder,
};
use std::fs;

#[test]
fn test_analyze_sample_mp4() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let info = analyze(file.path()).unwrap();

    assert!(info.is_recognised());
    assert_eq!(info.general.format.as_deref(), Some("MPEG-4"));
    assert_eq!(info.general.duration_ms, Some(120_000.0));
    assert_eq!(info.general.is_streamable, Some(true));
    assert_eq!(info.general.file_size, Some(fs::metadata(file.path()).unwrap().len()));

    assert_eq!(info.video_tracks.len(), 1);
    let video = &info.video_tracks[0];
    assert_eq!(video.width, Some(1920));
    assert_eq!(video.height, Some(1080));
    assert_eq!(video.frame_rate, Some(25.0));
    assert_eq!(video.duration_ms, Some(120_000.0));

    assert_eq!(info.audio_tracks.len(), 1);
    assert_eq!(info.audio_tracks[0].channels, Some(2));
    assert_eq!(info.audio_tracks[0].sampling_rate, Some(48_000));
    assert!(info.text_tracks.is_empty());
}

#[test]
fn test_sample_mp4_sizes_counts_and_extras() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let info = analyze(file.path()).unwrap();

    let general = &info.general;
    assert_eq!(general.codec_id.as_deref(), Some("isom"));
    assert_eq!(general.codec_id_compatible.as_deref(), Some("isom/iso2/avc1/mp41"));
    assert_eq!(general.video_count, Some(1));
    assert_eq!(general.audio_count, Some(1));
    assert_eq!(general.frame_rate, Some(25.0));
    assert_eq!(general.frame_count, Some(3000));
    assert!(general.stream_size.is_some());
    assert!(general.header_size.is_some());
    assert_eq!(general.data_size, Some(72));
    assert_eq!(general.footer_size, Some(0));
    assert!(general.file_modified_date.is_some());
    assert!(general.file_modified_date_local.is_some());

    let file_size = &general.extras["FileSize"];
    assert_eq!(file_size.measure.as_deref(), Some(" byte"));
    assert_eq!(file_size.name_text.as_deref(), Some("File size"));
    assert_eq!(file_size.info.as_deref(), Some("File size in bytes"));

    let video = &info.video_tracks[0];
    assert_eq!(video.stream_order, Some(0));
    assert_eq!(video.pixel_aspect_ratio, Some(1.0));
    assert_eq!(video.stream_size, Some(3_000_000));
    assert_eq!(video.extras["Width"].measure.as_deref(), Some(" pixel"));

    let audio = &info.audio_tracks[0];
    assert_eq!(audio.stream_order, Some(1));
    assert_eq!(audio.sampling_count, Some(5_760_000));
    assert_eq!(audio.stream_size, Some(2_250_000));
    assert_eq!(audio.extras["SamplingRate"].name_text.as_deref(), Some("Sampling rate"));
}

#[test]
fn test_track_dates() {
    // 2021-03-31 in seconds since 1904
    let data = Mp4Builder::new()
        .creation_time(3_700_000_000)
        .movie(1000, 1000)
        .track(TrackSpec::video(640, 480).timing(1000, 1000, 40, 25))
        .track(TrackSpec::audio(2, 44_100).timing(44_100, 44_100, 1024, 43))
        .build();
    let file = write_temp(&data, ".mp4");
    let info = analyze(file.path()).unwrap();

    let encoded = info.general.encoded_date.unwrap();
    assert_eq!(encoded.format("%Y").to_string(), "2021");
    assert_eq!(info.general.tagged_date, Some(encoded));
    assert_eq!(info.video_tracks[0].encoded_date, Some(encoded));
    assert_eq!(info.audio_tracks[0].tagged_date, Some(encoded));
}

#[test]
fn test_prores_bit_depth_correction() {
    let data = Mp4Builder::new()
        .brands(b"qt  ", &[*b"qt  "])
        .movie(600, 6000)
        .track(TrackSpec::video(3840, 2160).codec(b"ap4h").timing(24_000, 240_240, 1001, 240))
        .build();
    let file = write_temp(&data, ".mov");
    let info = analyze(file.path()).unwrap();

    let video = &info.video_tracks[0];
    assert_eq!(video.format.as_deref(), Some("ProRes"));
    assert_eq!(video.format_profile.as_deref(), Some("4444"));
    assert_eq!(video.bit_depth, Some(12));
}

#[test]
fn test_hdr_from_colour_box() {
    let data = Mp4Builder::new()
        .movie(1000, 1000)
        .track(
            TrackSpec::video(3840, 2160)
                .codec(b"hvc1")
                .child(b"colr", colr_nclx(9, 16, 9, false))
                .timing(1000, 1000, 40, 25),
        )
        .build();
    let file = write_temp(&data, ".mp4");
    let info = analyze(file.path()).unwrap();

    let video = &info.video_tracks[0];
    assert_eq!(video.transfer_characteristics.as_deref(), Some("PQ"));
    assert_eq!(video.hdr_format, Some(HdrFormat::Hdr10));
    assert!(info.is_hdr());
}

#[test]
fn test_timecode_tracks() {
    let data = Mp4Builder::new()
        .movie(1000, 10_000)
        .track(TrackSpec::video(1920, 1080).timing(25, 250, 1, 250))
        .track(TrackSpec::timecode(0x2, 25, 1, 25).timing(25, 250, 250, 1))
        .build();
    let file = write_temp(&data, ".mov");
    let info = analyze(file.path()).unwrap();

    assert_eq!(info.timecode_tracks.len(), 1);
    let tc = &info.timecode_tracks[0];
    assert_eq!(tc.format.as_deref(), Some("QuickTime TC"));
    assert_eq!(tc.frame_rate, Some(25.0));
    assert_eq!(tc.settings.as_deref(), Some("24h max"));
}

#[test]
fn test_matroska_text_tracks() {
    let data = MkvBuilder::webm()
        .duration(2500.0)
        .track(MkvTrack::video("V_VP9", 1280, 720))
        .track(MkvTrack {
            name: Some("Signs".to_string()),
            forced: Some(true),
            ..MkvTrack::subtitle("S_TEXT/WEBVTT")
        })
        .build();
    let file = write_temp(&data, ".webm");
    let info = analyze(file.path()).unwrap();

    assert_eq!(info.general.format.as_deref(), Some("WebM"));
    assert_eq!(info.text_tracks.len(), 1);
    let text = &info.text_tracks[0];
    assert_eq!(text.title.as_deref(), Some("Signs"));
    assert_eq!(text.forced, Some(true));
    assert_eq!(text.id, Some(2));
}

#[test]
fn test_unknown_file_is_empty_model() {
    let file = write_temp(b"not a media file at all", ".bin");
    let info = analyze(file.path()).unwrap();
    assert!(!info.is_recognised());
    assert!(info.video_tracks.is_empty());
    assert_eq!(info.general.file_size, None);
}

#[test]
fn test_strict_config_surfaces_errors() {
    let config = Config {
        probe: ProbeConfig {
            strict: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let file = write_temp(b"not a media file at all", ".bin");
    assert_matches!(analyze_with(file.path(), &config), Err(ProbeError::UnsupportedFormat));

    let data = sample_mp4();
    let truncated = write_temp(&data[..data.len() / 2], ".mp4");
    assert_matches!(
        analyze_with(truncated.path(), &config),
        Err(ProbeError::MalformedContainer(_))
    );
}

#[test]
fn test_analyze_all_keeps_order_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    let flac = dir.path().join("tone.flac");
    fs::write(&wav, WavBuilder::pcm(1, 8000, 8).data_len(8000).build()).unwrap();
    fs::write(&flac, FlacBuilder::new(44_100, 2, 16).total_samples(44_100).build()).unwrap();
    let missing = dir.path().join("missing.mkv");

    let paths = vec![wav.clone(), missing.clone(), flac.clone()];
    let results = analyze_all(&paths, &Config::default());

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, wav);
    assert_eq!(results[1].0, missing);
    assert_eq!(results[2].0, flac);

    let wav_info = results[0].1.as_ref().unwrap();
    assert_eq!(wav_info.audio_tracks[0].bit_depth, Some(8));
    assert_eq!(wav_info.audio_tracks[0].duration_ms, Some(1000.0));
    assert_matches!(results[1].1, Err(ProbeError::FileNotFound(_)));
    let flac_info = results[2].1.as_ref().unwrap();
    assert_eq!(flac_info.audio_tracks[0].sampling_rate, Some(44_100));
}

#[test]
fn test_analyze_dir_filters_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("season 1");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("episode.mp4"), sample_mp4()).unwrap();
    fs::write(dir.path().join("notes.txt"), "nothing").unwrap();
    fs::write(dir.path().join("cover.MKV"), MkvBuilder::matroska().build()).unwrap();

    let mut results = analyze_dir(dir.path(), &Config::default());
    results.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert!(results.iter().all(|(p, _)| p.extension().is_some_and(|e| e != "txt")));
}

#[test]
fn test_json_output() {
    let file = write_temp(&sample_mp4(), ".mp4");
    let info = analyze(file.path()).unwrap();
    let json = info.to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["general"]["format"], "MPEG-4");
    assert_eq!(value["video_tracks"][0]["width"], 1920);
    assert_eq!(value["audio_tracks"][0]["sampling_rate"], 48000);
}

