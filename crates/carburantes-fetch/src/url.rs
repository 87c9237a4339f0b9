//! Price API URL construction.

use carburantes_types::DateKey;

/// Base URL of the historical station price service.
pub const BASE_URL: &str = "https://sedeaplicaciones.minetur.gob.es/ServiciosRESTCarburantes/PreciosCarburantes/EstacionesTerrestresHist";

/// Builds the URL of one date's snapshot.
///
/// URL format: `{base_url}/{dd-mm-yyyy}`. A trailing slash on the base is ignored.
///
/// # Example
///
/// ```
/// use carburantes_fetch::url::snapshot_url;
/// use carburantes_types::DateKey;
///
/// let date = DateKey::parse("01-01-2024").unwrap();
/// let url = snapshot_url("https://example.org/Hist/", date);
/// assert_eq!(url, "https://example.org/Hist/01-01-2024");
/// ```
#[must_use]
pub fn snapshot_url(base_url: &str, date: DateKey) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), date)
}

/// Returns the host part of a URL, used to key per-target limits.
#[must_use]
pub fn target_key(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| url.to_string())
}
