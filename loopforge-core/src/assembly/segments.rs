use super::error::{AssemblyError, AssemblyResult};
use super::models::{ClipAsset, SegmentDescriptor, SegmentPlan};
use crate::probe::UNKNOWN_RESOLUTION;

/// Apportions the target duration evenly across the usable clips and
/// derives a loop count per clip.
///
/// `repeat_count = max(1, round(portion / duration))`, so the planned
/// duration may land above or below the target; no correction pass is
/// applied. Clips whose probe failed (`duration == 0`) are dropped before
/// apportioning.
pub fn plan_video_segments(clips: &[ClipAsset], target_seconds: f64) -> AssemblyResult<SegmentPlan> {
    if clips.is_empty() {
        return Err(AssemblyError::NoAssetsAvailable);
    }
    let usable: Vec<&ClipAsset> = clips.iter().filter(|clip| clip.usable()).collect();
    if usable.is_empty() {
        return Err(AssemblyError::NoUsableDurations);
    }

    let target_resolution = plurality_resolution(&usable);
    let portion = target_seconds / usable.len() as f64;
    let segments = usable
        .iter()
        .map(|clip| SegmentDescriptor {
            clip: (*clip).clone(),
            repeat_count: (portion / clip.duration).round().max(1.0) as u32,
        })
        .collect();

    Ok(SegmentPlan {
        segments,
        target_resolution,
    })
}

/// Most frequent resolution label across the clips; ties keep the
/// first-seen value.
fn plurality_resolution(clips: &[&ClipAsset]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for clip in clips {
        let label = clip.resolution.as_deref().unwrap_or(UNKNOWN_RESOLUTION);
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label.to_string())
        .unwrap_or_else(|| UNKNOWN_RESOLUTION.to_string())
}
