use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    #[serde(rename = "NS")]
    NotStarted,
    #[serde(rename = "LIVE")]
    Live,
    #[serde(rename = "FT")]
    Finished,
}

impl MatchStatus {
    /// Collapses a provider short code into one of three buckets.
    pub fn from_short(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "NS" | "TBD" | "PST" | "CANC" | "SUSP" | "INT" => Self::NotStarted,
            "FT" | "AET" | "PEN" => Self::Finished,
            _ => Self::Live,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::NotStarted => "NS",
            Self::Live => "LIVE",
            Self::Finished => "FT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "قريبًا",
            Self::Live => "جارية الآن",
            Self::Finished => "انتهت",
        }
    }
}

pub fn final_score(status: MatchStatus, home: Option<u32>, away: Option<u32>) -> Option<String> {
    if status != MatchStatus::Finished {
        return None;
    }
    Some(format!("{}-{}", home?, away?))
}
