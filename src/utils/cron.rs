//! Cron expression checks for backup schedules

/// Validate cron schedule syntax
///
/// Accepts the five-field form (`min hour dom month dow`). Each field may
/// use digits, `*`, `,`, `-` and `/`, plus month/day names.
pub fn validate_cron_schedule(schedule: &str) -> bool {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    if fields.len() != 5 {
        return false;
    }

    fields.iter().all(|field| {
        field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | ',' | '-' | '/' | '?'))
    })
}
