/// Absolute difference of a `"<int>-<int>"` score string.
///
/// Anything else (missing, blank, non-numeric parts, more than one separator)
/// is undefined.
pub fn score_differential(score: Option<&str>) -> Option<u64> {
    let score = score?;
    let mut parts = score.split('-');
    let home = parts.next()?.trim().parse::<i64>().ok()?;
    let away = parts.next()?.trim().parse::<i64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(home.abs_diff(away))
}
