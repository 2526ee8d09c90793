//! Pure translation of the upstream vocabulary into the local domain:
//! issue category/detail/status code tables, timestamp conversion and
//! HTML-entity decoding. No database access here.

use chrono::{LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Europe::Stockholm;

use super::error::SyncError;

/// Source timestamps are naive local time in this zone.
const SOURCE_TZ: chrono_tz::Tz = Stockholm;
const SOURCE_DATETIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    Unknown,
    Safety,
    Maintenance,
    Cleaning,
    Access,
    Information,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Safety => "safety",
            Self::Maintenance => "maintenance",
            Self::Cleaning => "cleaning",
            Self::Access => "access",
            Self::Information => "information",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIssueType {
    LooseRock,
    BoltWorn,
    AnchorWorn,
    Vegetation,
    WetRock,
    ParkingClosed,
    TrailDamage,
}

impl SubIssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LooseRock => "loose_rock",
            Self::BoltWorn => "bolt_worn",
            Self::AnchorWorn => "anchor_worn",
            Self::Vegetation => "vegetation",
            Self::WetRock => "wet_rock",
            Self::ParkingClosed => "parking_closed",
            Self::TrailDamage => "trail_damage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Reported,
    Viewed,
    InProgress,
    Completed,
    InModeration,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Viewed => "viewed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::InModeration => "in_moderation",
        }
    }
}

/// Upstream issue category code -> local issue type. Code 0 is the
/// upstream's own "unknown" and doubles as the fallback for codes we have
/// never seen.
pub fn map_issue_category(category_id: i64) -> IssueType {
    match category_id {
        1 => IssueType::Safety,
        2 => IssueType::Maintenance,
        3 => IssueType::Cleaning,
        4 => IssueType::Access,
        5 => IssueType::Information,
        _ => IssueType::Unknown,
    }
}

/// Two-level sub-type lookup. The detail table wins when both resolve;
/// unmapped in both yields None.
pub fn map_issue_detail(type_id: i64, detail_id: i64) -> Option<SubIssueType> {
    let by_detail = match detail_id {
        11 => Some(SubIssueType::LooseRock),
        12 => Some(SubIssueType::BoltWorn),
        13 => Some(SubIssueType::AnchorWorn),
        14 => Some(SubIssueType::Vegetation),
        15 => Some(SubIssueType::WetRock),
        _ => None,
    };
    if by_detail.is_some() {
        return by_detail;
    }
    match type_id {
        1 => Some(SubIssueType::LooseRock),
        2 => Some(SubIssueType::BoltWorn),
        4 => Some(SubIssueType::Vegetation),
        6 => Some(SubIssueType::ParkingClosed),
        7 => Some(SubIssueType::TrailDamage),
        _ => None,
    }
}

/// Unmapped status ids yield None; the caller logs a data-quality line
/// and stores NULL rather than failing the record.
pub fn map_status(status_id: i64) -> Option<IssueStatus> {
    match status_id {
        1 => Some(IssueStatus::Reported),
        2 => Some(IssueStatus::Viewed),
        3 => Some(IssueStatus::InProgress),
        4 => Some(IssueStatus::Completed),
        5 => Some(IssueStatus::InModeration),
        _ => None,
    }
}

/// Convert an upstream timestamp ("6/1/2024 3:00:00 PM", naive local time
/// in the source zone) to an RFC3339 UTC string.
pub fn convert_timestamp(value: &str) -> Result<String, SyncError> {
    let bad = || SyncError::DateFormat {
        value: value.to_string(),
    };
    let naive =
        NaiveDateTime::parse_from_str(value.trim(), SOURCE_DATETIME_FORMAT).map_err(|_| bad())?;
    let local = match SOURCE_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        // DST fold: take the earlier instant.
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Spring-forward gap: the wall time never existed.
        LocalResult::None => return Err(bad()),
    };
    Ok(local
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// The source emits HTML-escaped free text; decode every name/comment
/// before storage.
pub fn decode_text(value: &str) -> String {
    html_escape::decode_html_entities(value.trim()).into_owned()
}

/// "Project" -> "Project 2", "Project 2" -> "Project 3".
pub fn next_incremental_name(name: &str) -> String {
    let trimmed = name.trim_end();
    if let Some((base, last)) = trimmed.rsplit_once(' ') {
        if let Ok(n) = last.parse::<u64>() {
            return format!("{} {}", base, n + 1);
        }
    }
    format!("{} 2", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_table_is_total_with_unknown_fallback() {
        assert_eq!(map_issue_category(1), IssueType::Safety);
        assert_eq!(map_issue_category(5), IssueType::Information);
        assert_eq!(map_issue_category(0), IssueType::Unknown);
        assert_eq!(map_issue_category(999), IssueType::Unknown);
        assert_eq!(map_issue_category(-3), IssueType::Unknown);
    }

    #[test]
    fn detail_table_wins_over_type_table() {
        // detail 14 resolves, type 1 also would; detail wins.
        assert_eq!(map_issue_detail(1, 14), Some(SubIssueType::Vegetation));
        // detail unmapped, fall back to type.
        assert_eq!(map_issue_detail(6, 0), Some(SubIssueType::ParkingClosed));
        // neither resolves.
        assert_eq!(map_issue_detail(0, 0), None);
        assert_eq!(map_issue_detail(99, 99), None);
    }

    #[test]
    fn status_table_yields_none_for_unmapped() {
        assert_eq!(map_status(1), Some(IssueStatus::Reported));
        assert_eq!(map_status(5), Some(IssueStatus::InModeration));
        assert_eq!(map_status(0), None);
        assert_eq!(map_status(42), None);
    }

    #[test]
    fn timestamp_converts_summer_local_time_to_utc() {
        // CEST (UTC+2) on June 1st.
        let got = convert_timestamp("6/1/2024 3:00:00 PM").unwrap();
        assert_eq!(got, "2024-06-01T13:00:00Z");
    }

    #[test]
    fn timestamp_converts_winter_local_time_to_utc() {
        // CET (UTC+1) in January.
        let got = convert_timestamp("1/15/2024 9:30:00 AM").unwrap();
        assert_eq!(got, "2024-01-15T08:30:00Z");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        let err = convert_timestamp("not-a-date").unwrap_err();
        assert!(matches!(err, SyncError::DateFormat { .. }));
    }

    #[test]
    fn decodes_html_entities() {
        assert_eq!(decode_text("Kr&auml;ngan &amp; V&auml;nner"), "Krängan & Vänner");
        assert_eq!(decode_text("  plain  "), "plain");
    }

    #[test]
    fn incremental_name_chain() {
        assert_eq!(next_incremental_name("Project"), "Project 2");
        assert_eq!(next_incremental_name("Project 2"), "Project 3");
        assert_eq!(next_incremental_name("Project 9"), "Project 10");
        // A trailing word that is not an integer gets the fallback suffix.
        assert_eq!(next_incremental_name("Route Left"), "Route Left 2");
    }
}
