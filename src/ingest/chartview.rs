/// Embedded chart-array extraction for vizugy.hu well pages.
///
/// The groundwater chart pages are server-rendered HTML with no data API:
/// the timeseries is embedded as a JavaScript call of the shape
///
///   chartView(["616","617",...],["2024-11-11 07:00:00.0000000",...],[],[...])
///
/// where the first array holds water levels in centimeters and the second
/// the matching timestamps. There is no schema guarantee behind this format;
/// the balanced-parenthesis scan and the single-occurrence `],[` split below
/// are tuned to the one observed page layout and are kept together in this
/// module so a future layout change only touches the extraction strategy,
/// not the rest of the pipeline.
///
/// Every failure mode is a distinct `ChartParseError` variant. The earlier
/// prototype returned an empty list for all of them, which made "page layout
/// changed" indistinguishable from "no data today" — the primary path to
/// silent data loss this module is designed to close.

use chrono::{NaiveDateTime, Timelike};

use crate::logging::{self, DataSource};
use crate::model::{ChartParseError, Measurement};
use crate::wells::Well;

/// Marker token preceding the embedded call that carries the data arrays.
pub const CHART_MARKER: &str = "chartView";

/// Timestamp layout used by the source, after the fractional part is dropped.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Array extractor
// ---------------------------------------------------------------------------

/// Returns the argument substring of the first `marker(...)` call in `html`,
/// exclusive of the outer parentheses.
///
/// The scan keeps a signed depth counter seeded at zero: every `(` after the
/// marker's own opens a nested sub-expression and increments depth; a `)` at
/// positive depth closes one and decrements; the first `)` seen at depth
/// zero is the marker call's own terminator. Matching the first `)`
/// naively would truncate the arguments whenever they contain parenthesized
/// sub-expressions, which the observed pages do.
pub fn extract_call_args<'a>(
    html: &'a str,
    marker: &str,
) -> Result<&'a str, ChartParseError> {
    let open = format!("{}(", marker);
    let call_start = html.find(&open).ok_or(ChartParseError::MarkerNotFound)?;
    let args_start = call_start + open.len();

    let mut depth: u32 = 0;
    for (offset, ch) in html[args_start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Ok(&html[args_start..args_start + offset]);
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    // Ran off the end of the document with the call still open.
    Err(ChartParseError::UnterminatedCall)
}

// ---------------------------------------------------------------------------
// Array splitter
// ---------------------------------------------------------------------------

/// Splits the call arguments into the raw values and timestamps payloads.
///
/// The two target arrays are adjacent and separated by a literal `],[`.
/// Only the first occurrence splits; everything after the second array's own
/// closing `]` belongs to trailing call arguments (an empty array and a
/// metadata array on the observed pages) and is discarded.
pub fn split_array_pair(args: &str) -> Result<(&str, &str), ChartParseError> {
    let (first, rest) = args
        .split_once("],[")
        .ok_or(ChartParseError::MissingBoundary)?;

    let values = first.strip_prefix('[').unwrap_or(first);

    let close = rest.find(']').ok_or(ChartParseError::UnboundedSecondArray)?;
    let timestamps = &rest[..close];

    Ok((values, timestamps))
}

// ---------------------------------------------------------------------------
// Array decoder
// ---------------------------------------------------------------------------

/// Decodes the two raw payloads as JSON array literals.
///
/// Water levels arrive as strings on the observed pages but are accepted as
/// bare numbers too; timestamps must be strings. Both arrays are required:
/// a decode failure on either side, or a length mismatch between them,
/// rejects the whole pair — partial use would corrupt the value/timestamp
/// pairing for every element after the divergence.
pub fn decode_series(
    values_raw: &str,
    timestamps_raw: &str,
) -> Result<(Vec<serde_json::Value>, Vec<String>), ChartParseError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(&format!("[{}]", values_raw))
        .map_err(|e| ChartParseError::DecodeError(format!("values array: {}", e)))?;

    let timestamps: Vec<String> = serde_json::from_str(&format!("[{}]", timestamps_raw))
        .map_err(|e| ChartParseError::DecodeError(format!("timestamps array: {}", e)))?;

    if values.len() != timestamps.len() {
        return Err(ChartParseError::LengthMismatch {
            values: values.len(),
            timestamps: timestamps.len(),
        });
    }

    Ok((values, timestamps))
}

// ---------------------------------------------------------------------------
// Measurement builder
// ---------------------------------------------------------------------------

/// Pairs the decoded sequences into `Measurement`s for one well.
///
/// Conversion: integer centimeters to meters at two-decimal precision.
/// Filter: only readings whose hour-of-day is in the well's morning set are
/// kept — the source publishes up to six samples per day and the service
/// retains one canonical daily reading. Per-element parse failures are
/// logged and skipped without aborting the remaining elements.
pub fn build_measurements(
    well: &Well,
    values: &[serde_json::Value],
    timestamps: &[String],
) -> Vec<Measurement> {
    let mut measurements = Vec::new();

    for (i, (value, timestamp)) in values.iter().zip(timestamps.iter()).enumerate() {
        let Some(level_cm) = value_as_centimeters(value) else {
            logging::debug(
                DataSource::Vizugy,
                Some(&well.code),
                &format!("skipping element {}: unusable water level {}", i, value),
            );
            continue;
        };

        let Some(parsed) = parse_source_timestamp(timestamp) else {
            logging::debug(
                DataSource::Vizugy,
                Some(&well.code),
                &format!("skipping element {}: malformed timestamp '{}'", i, timestamp),
            );
            continue;
        };

        if !well.morning_hours.contains(&parsed.hour()) {
            continue;
        }

        measurements.push(Measurement {
            well_code: well.code.clone(),
            timestamp: parsed,
            water_level_m: level_cm as f64 / 100.0,
        });
    }

    measurements
}

/// Full pipeline for one fetched page: extract, split, decode, build.
pub fn parse_chart_page(well: &Well, html: &str) -> Result<Vec<Measurement>, ChartParseError> {
    let args = extract_call_args(html, CHART_MARKER)?;
    let (values_raw, timestamps_raw) = split_array_pair(args)?;
    let (values, timestamps) = decode_series(values_raw, timestamps_raw)?;
    Ok(build_measurements(well, &values, &timestamps))
}

fn value_as_centimeters(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parses `"YYYY-MM-DD HH:MM:SS[.fraction]"`. The source pads a seven-digit
/// fractional part onto every timestamp; it carries no information and is
/// dropped so stored timestamps stay in canonical whole-second form.
fn parse_source_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let whole_seconds = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(whole_seconds.trim(), TIMESTAMP_FORMAT).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_well() -> Well {
        Well {
            code: "4576".to_string(),
            name: "Sátorhely".to_string(),
            morning_hours: vec![7, 8],
        }
    }

    // --- Extractor ----------------------------------------------------------

    #[test]
    fn test_extract_returns_exact_argument_substring() {
        let html = "<script>chartView(A,B,C);</script>";
        assert_eq!(extract_call_args(html, "chartView").unwrap(), "A,B,C");
    }

    #[test]
    fn test_extract_tolerates_nested_parentheses_in_arguments() {
        // A naive first-`)` match would stop inside f(x) and truncate.
        let html = "var x = chartView([1,2], g(f(x), h(y)), 'tail');";
        assert_eq!(
            extract_call_args(html, "chartView").unwrap(),
            "[1,2], g(f(x), h(y)), 'tail'"
        );
    }

    #[test]
    fn test_extract_uses_first_marker_occurrence() {
        let html = "chartView(first) chartView(second)";
        assert_eq!(extract_call_args(html, "chartView").unwrap(), "first");
    }

    #[test]
    fn test_extract_fails_when_marker_absent() {
        let html = "<html><body>maintenance page</body></html>";
        assert_eq!(
            extract_call_args(html, "chartView"),
            Err(ChartParseError::MarkerNotFound)
        );
    }

    #[test]
    fn test_extract_bare_marker_without_call_is_not_found() {
        // The marker must be followed by `(` to count as a call.
        let html = "the chartView widget failed to load";
        assert_eq!(
            extract_call_args(html, "chartView"),
            Err(ChartParseError::MarkerNotFound)
        );
    }

    #[test]
    fn test_extract_fails_when_call_never_closes() {
        // Scan must terminate at end-of-document, not run unbounded.
        let html = "chartView([1,2],[3,4";
        assert_eq!(
            extract_call_args(html, "chartView"),
            Err(ChartParseError::UnterminatedCall)
        );
    }

    #[test]
    fn test_extract_fails_when_only_nested_close_appears() {
        // The single `)` closes the nested f( — the marker call stays open.
        let html = "chartView(f(x)";
        assert_eq!(
            extract_call_args(html, "chartView"),
            Err(ChartParseError::UnterminatedCall)
        );
    }

    #[test]
    fn test_extract_empty_arguments() {
        assert_eq!(extract_call_args("chartView()", "chartView").unwrap(), "");
    }

    #[test]
    fn test_extract_handles_multibyte_text_around_call() {
        // Well names on the page are Hungarian; offsets must be byte-safe.
        let html = "<h1>Sátorhely kút</h1><script>chartView([\"616\"],[\"ts\"])</script>";
        assert_eq!(
            extract_call_args(html, "chartView").unwrap(),
            "[\"616\"],[\"ts\"]"
        );
    }

    // --- Splitter -----------------------------------------------------------

    #[test]
    fn test_split_returns_both_payloads() {
        let args = "[\"616\",\"617\"],[\"2024-11-11 07:00:00\",\"2024-11-11 08:00:00\"]";
        let (values, timestamps) = split_array_pair(args).unwrap();
        assert_eq!(values, "\"616\",\"617\"");
        assert_eq!(timestamps, "\"2024-11-11 07:00:00\",\"2024-11-11 08:00:00\"");
    }

    #[test]
    fn test_split_discards_trailing_call_arguments() {
        // Real pages pass four arguments; the last two are irrelevant.
        let args = "[\"616\"],[\"2024-11-11 07:00:00\"],[],[\"Sátorhely\"]";
        let (values, timestamps) = split_array_pair(args).unwrap();
        assert_eq!(values, "\"616\"");
        assert_eq!(timestamps, "\"2024-11-11 07:00:00\"");
    }

    #[test]
    fn test_split_uses_first_boundary_only() {
        // The `],[` inside trailing arguments must not re-split the pair.
        let args = "[1],[2],[3],[4]";
        let (values, timestamps) = split_array_pair(args).unwrap();
        assert_eq!(values, "1");
        assert_eq!(timestamps, "2");
    }

    #[test]
    fn test_split_fails_without_boundary() {
        assert_eq!(
            split_array_pair("[1,2,3]"),
            Err(ChartParseError::MissingBoundary)
        );
    }

    #[test]
    fn test_split_fails_when_second_array_never_closes() {
        assert_eq!(
            split_array_pair("[1,2],[3,4"),
            Err(ChartParseError::UnboundedSecondArray)
        );
    }

    // --- Decoder ------------------------------------------------------------

    #[test]
    fn test_decode_accepts_string_and_numeric_values() {
        let (values, timestamps) =
            decode_series("\"616\",617", "\"a\",\"b\"").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(timestamps, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_rejects_malformed_values_array() {
        let err = decode_series("\"616\",,", "\"a\"").unwrap_err();
        assert!(matches!(err, ChartParseError::DecodeError(_)));
    }

    #[test]
    fn test_decode_rejects_non_string_timestamps() {
        let err = decode_series("\"616\"", "42").unwrap_err();
        assert!(matches!(err, ChartParseError::DecodeError(_)));
    }

    #[test]
    fn test_decode_length_mismatch_is_hard_failure() {
        // Never silently truncate to the shorter array: misalignment would
        // corrupt the pairing for every element.
        assert_eq!(
            decode_series("\"616\",\"617\"", "\"a\""),
            Err(ChartParseError::LengthMismatch {
                values: 2,
                timestamps: 1
            })
        );
    }

    // --- Measurement builder ------------------------------------------------

    #[test]
    fn test_morning_readings_kept_and_converted_to_meters() {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(r#"["616","617","620"]"#).unwrap();
        let timestamps = vec![
            "2024-11-11 07:00:00.0000000".to_string(),
            "2024-11-11 08:00:00.0000000".to_string(),
            "2024-11-11 12:00:00.0000000".to_string(),
        ];

        let measurements = build_measurements(&test_well(), &values, &timestamps);

        // Hours 7 and 8 survive; the noon sample is intentionally dropped.
        assert_eq!(measurements.len(), 2);
        assert!((measurements[0].water_level_m - 6.16).abs() < 1e-9);
        assert!((measurements[1].water_level_m - 6.17).abs() < 1e-9);
        assert_eq!(
            measurements[0].timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-11-11 07:00:00"
        );
    }

    #[test]
    fn test_morning_set_is_per_well() {
        let mut well = test_well();
        well.morning_hours = vec![4];
        let values: Vec<serde_json::Value> = serde_json::from_str(r#"["500","501"]"#).unwrap();
        let timestamps = vec![
            "2024-11-11 04:00:00".to_string(),
            "2024-11-11 07:00:00".to_string(),
        ];

        let measurements = build_measurements(&well, &values, &timestamps);
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].timestamp.format("%H").to_string(), "04");
    }

    #[test]
    fn test_bad_element_is_skipped_without_aborting_rest() {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(r#"["not-a-number","617","618"]"#).unwrap();
        let timestamps = vec![
            "2024-11-11 07:00:00".to_string(),
            "garbage timestamp".to_string(),
            "2024-11-13 07:00:00".to_string(),
        ];

        // Element 0 has a bad value, element 1 a bad timestamp; element 2
        // must still come through.
        let measurements = build_measurements(&test_well(), &values, &timestamps);
        assert_eq!(measurements.len(), 1);
        assert!((measurements[0].water_level_m - 6.18).abs() < 1e-9);
    }

    #[test]
    fn test_measurements_preserve_source_order() {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(r#"["600","601","602"]"#).unwrap();
        let timestamps = vec![
            "2024-11-10 07:00:00".to_string(),
            "2024-11-11 07:00:00".to_string(),
            "2024-11-12 07:00:00".to_string(),
        ];

        let measurements = build_measurements(&test_well(), &values, &timestamps);
        let days: Vec<String> = measurements
            .iter()
            .map(|m| m.timestamp.format("%d").to_string())
            .collect();
        assert_eq!(days, vec!["10", "11", "12"], "insert order must follow source order");
    }

    #[test]
    fn test_negative_levels_are_accepted() {
        // Wells below the reference datum report negative centimeters.
        let values: Vec<serde_json::Value> = serde_json::from_str(r#"["-42"]"#).unwrap();
        let timestamps = vec!["2024-11-11 07:00:00".to_string()];

        let measurements = build_measurements(&test_well(), &values, &timestamps);
        assert_eq!(measurements.len(), 1);
        assert!((measurements[0].water_level_m + 0.42).abs() < 1e-9);
    }

    // --- Full page pipeline -------------------------------------------------

    #[test]
    fn test_parse_chart_page_end_to_end() {
        let html = concat!(
            "<html><head><title>Talajvízkút grafikon</title></head><body>\n",
            "<div id=\"chart\"></div>\n",
            "<script type=\"text/javascript\">\n",
            "$(document).ready(function() {\n",
            "  chartView([\"616\",\"617\",\"620\"],",
            "[\"2024-11-11 07:00:00.0000000\",\"2024-11-12 08:00:00.0000000\",",
            "\"2024-11-12 12:00:00.0000000\"],[],[\"Sátorhely\"]);\n",
            "});\n",
            "</script></body></html>"
        );

        let measurements = parse_chart_page(&test_well(), html).unwrap();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].well_code, "4576");
    }

    #[test]
    fn test_parse_chart_page_propagates_structural_failure() {
        let err = parse_chart_page(&test_well(), "<html>no chart here</html>").unwrap_err();
        assert_eq!(err, ChartParseError::MarkerNotFound);
    }
}
