use std::time::Duration;
use std::thread;
use rand::Rng;
use log::{debug, info};

pub fn pause(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    debug!("Pausing for {:?}...", duration);
    thread::sleep(duration);
}

/// Random pause between two profiles. `None` disables it.
pub fn random_profile_delay(range_secs: Option<(u64, u64)>) {
    let Some(delay_secs) = pick_delay(range_secs) else {
        return;
    };
    info!("Waiting for {} seconds (Profile Delay)...", delay_secs);
    thread::sleep(Duration::from_secs(delay_secs));
}

fn pick_delay(range_secs: Option<(u64, u64)>) -> Option<u64> {
    let (min, max) = range_secs?;
    let (min, max) = (min.min(max), min.max(max));
    if max == 0 {
        return None;
    }
    let mut rng = rand::thread_rng();
    Some(rng.gen_range(min..=max))
}
