//! Generation timestamp comment.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Prefix shared by both emitters. Tools comparing generated output for
/// determinism mask lines starting with this.
pub(crate) const GENERATED_PREFIX: &str = "# generated ";

/// The single timestamp comment line. It carries no semantic weight.
pub(crate) fn generated_line() -> String {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("at an unknown time"));
    format!("{GENERATED_PREFIX}{now}")
}
