//! Rate-of-fire gate
//!
//! Periodic re-fire может прийти на пару микросекунд раньше периода (jitter scheduler'а).
//! Без допуска full-auto молча теряет цикл, поэтому elapsed ≈ interval тоже проходит.

/// Прошло ли достаточно времени с последнего выстрела
///
/// `forgiveness` — допуск вокруг `min_interval` (секунды). Допуск не бывает меньше
/// нескольких ULP самих timestamps: `t0 + interval - t0` в float может быть чуть меньше interval.
pub fn can_fire_again(now: f64, last_fire_time: f64, min_interval: f64, forgiveness: f64) -> bool {
    let elapsed = now - last_fire_time;
    if elapsed >= min_interval {
        return true;
    }

    let magnitude = now.abs().max(last_fire_time.abs()).max(min_interval.abs());
    let tolerance = forgiveness.max(magnitude * 4.0 * f64::EPSILON);

    (elapsed - min_interval).abs() <= tolerance
}
