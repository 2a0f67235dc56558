/// Data acquisition for the groundwater sync service.
///
/// Submodules:
/// - `vizugy` — HTTP client for the vizugy.hu chart page endpoint.
/// - `chartview` — embedded JavaScript-array extraction and measurement
///   building (the parsing core).

pub mod chartview;
pub mod vizugy;
