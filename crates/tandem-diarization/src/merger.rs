//! Attribute transcript segments to diarized speakers

use std::cmp::Ordering;

use tandem_core::{DiarizationOutput, Segment, TranscriptResult};

use crate::error::DiarizationError;

/// Label every transcript segment and word with a speaker
///
/// A span belongs to the speaker whose turn contains its midpoint, else to the
/// turn whose midpoint is closest.
pub fn assign_speakers(
    mut transcript: TranscriptResult,
    diarization: &DiarizationOutput,
) -> Result<TranscriptResult, DiarizationError> {
    if diarization.is_empty() {
        return Err(DiarizationError::NoSpeakersDetected);
    }

    for segment in &mut transcript.segments {
        segment.speaker = find_speaker_at_time((segment.start + segment.end) / 2.0, diarization);

        for word in &mut segment.words {
            word.speaker = find_speaker_at_time((word.start + word.end) / 2.0, diarization);
        }
    }

    Ok(transcript)
}

fn find_speaker_at_time(time: f64, diarization: &DiarizationOutput) -> Option<String> {
    if let Some((speaker, _)) = diarization.iter().find(|(_, turn)| turn.contains(time)) {
        return Some(speaker.to_string());
    }

    diarization
        .iter()
        .min_by(|(_, a), (_, b)| {
            let dist_a = (a.midpoint() - time).abs();
            let dist_b = (b.midpoint() - time).abs();
            dist_a.partial_cmp(&dist_b).unwrap_or(Ordering::Equal)
        })
        .map(|(speaker, _)| speaker.to_string())
}

/// Join consecutive same-speaker segments separated by less than `max_gap` seconds
pub fn merge_consecutive_speaker_segments(mut transcript: TranscriptResult, max_gap: f64) -> TranscriptResult {
    if transcript.segments.len() <= 1 {
        return transcript;
    }

    let mut merged: Vec<Segment> = Vec::with_capacity(transcript.segments.len());

    for segment in transcript.segments.drain(..) {
        if let Some(last) = merged.last_mut() {
            if last.speaker == segment.speaker && (segment.start - last.end) < max_gap {
                last.text = format!("{} {}", last.text.trim_end(), segment.text.trim_start());
                last.end = segment.end;
                last.words.extend(segment.words);
                continue;
            }
        }
        merged.push(segment);
    }

    transcript.segments = merged;
    transcript
}
