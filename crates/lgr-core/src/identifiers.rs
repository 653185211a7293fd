//! Canonical identifiers and console links for log groups
//!
//! Pure functions of name, region and account.

/// Canonical ARN of a log group
#[must_use]
pub fn log_group_arn(name: &str, region: &str, account_number: &str) -> String {
    format!("arn:aws:logs:{region}:{account_number}:log-group/{name}")
}

/// Wildcard-scoped ARN of a log group, covering all of its streams
#[must_use]
pub fn log_group_star_arn(name: &str, region: &str, account_number: &str) -> String {
    format!("arn:aws:logs:{region}:{account_number}:log-group:{name}:*")
}

/// Console link of a log group
///
/// The console routes on the name percent-encoded twice with every `%`
/// then rewritten to `$`.
#[must_use]
pub fn log_group_console_link(region: &str, name: &str) -> String {
    let once = urlencoding::encode(name);
    let twice = urlencoding::encode(&once);
    let encoded = twice.replace('%', "$");
    format!(
        "https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logsV2:log-groups/log-group/{encoded}"
    )
}
