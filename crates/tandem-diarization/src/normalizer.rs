//! Collapse a frame-level trace into speaker turns
//!
//! Pipelines emit one micro-segment per detected turn boundary and often
//! several in a row for the same speaker. A single left-to-right pass merges
//! every run of consecutive same-speaker entries into one interval running from
//! the run's first start to its last end. Non-adjacent repeats stay separate.

use tandem_core::DiarizationOutput;

use crate::trace::RawTrace;

/// Merge consecutive same-speaker entries of `trace`
///
/// An empty trace yields empty output.
pub fn normalize_trace(trace: &RawTrace) -> DiarizationOutput {
    let entries = trace.entries();
    let mut output = DiarizationOutput::default();

    let Some(first) = entries.first() else {
        return output;
    };

    if entries.len() == 1 {
        output.push(first.speaker.clone(), first.interval.start, first.interval.end);
        return output;
    }

    let last = entries.len() - 1;
    let mut run_start = 0;
    let mut current_speaker = &first.speaker;

    for (i, entry) in entries.iter().enumerate() {
        if entry.speaker != *current_speaker {
            output.push(
                current_speaker.clone(),
                entries[run_start].interval.start,
                entries[i - 1].interval.end,
            );
            run_start = i;
            current_speaker = &entry.speaker;
        }

        if i == last {
            output.push(
                current_speaker.clone(),
                entries[run_start].interval.start,
                entry.interval.end,
            );
        }
    }

    output
}
