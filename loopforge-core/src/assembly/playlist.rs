use rand::seq::SliceRandom;
use rand::Rng;

use super::error::{AssemblyError, AssemblyResult};
use super::models::ClipAsset;

/// Selects whole clips until their summed duration meets or exceeds the
/// target.
///
/// The pool is reshuffled before every pick. When the pool runs dry below
/// the target it is refilled with the full candidate set minus the clip
/// that was just played, so the same track never plays twice in a row
/// unless it is the only candidate.
///
/// `exclude` removes any clip whose path contains the given fragment.
pub fn build_audio_playlist<R>(
    clips: &[ClipAsset],
    target_seconds: f64,
    exclude: Option<&str>,
    rng: &mut R,
) -> AssemblyResult<Vec<ClipAsset>>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<&ClipAsset> = clips
        .iter()
        .filter(|clip| match exclude {
            Some(fragment) => !clip.path.to_string_lossy().contains(fragment),
            None => true,
        })
        .collect();
    if candidates.is_empty() {
        return Err(AssemblyError::NoAssetsAvailable);
    }

    let usable: Vec<&ClipAsset> = candidates
        .into_iter()
        .filter(|clip| clip.usable())
        .collect();
    if usable.is_empty() {
        return Err(AssemblyError::NoUsableDurations);
    }

    let mut playlist = Vec::new();
    let mut accumulated = 0.0;
    let mut pool = usable.clone();

    while accumulated < target_seconds && !pool.is_empty() {
        pool.shuffle(rng);
        let next = pool.remove(0);
        accumulated += next.duration;
        playlist.push(next.clone());

        if pool.is_empty() && accumulated < target_seconds {
            pool = usable.clone();
            if pool.len() > 1 {
                pool.retain(|clip| clip.path != next.path);
            }
        }
    }

    Ok(playlist)
}
