use serde::{Deserialize, Serialize};

use super::Tier;

/// Response language requested from the analysis model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerWord {
    pub word: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    pub status: String,
    pub wpm: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyLanguage {
    pub eye_contact: String,
    pub posture: String,
    pub gestures: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechQuality {
    pub clarity: String,
    pub coherence: String,
    pub persuasion: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocalAnalysis {
    pub tone_variety: String,
    pub volume_control: String,
    pub articulation: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub attire: String,
    pub hair: String,
    pub face: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub exercises: Vec<String>,
    pub dynamics: Vec<String>,
    pub resources: Vec<String>,
}

/// Structured feedback produced by the analysis model
///
/// `vocal_analysis` and `image_analysis` are only requested for premium users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: f64,
    pub summary: String,
    pub filler_words: Vec<FillerWord>,
    pub pacing: Pacing,
    pub emotions: Vec<Emotion>,
    pub body_language: BodyLanguage,
    pub speech_analysis: SpeechQuality,
    pub improvement_tips: Vec<String>,
    pub action_plan: ActionPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal_analysis: Option<VocalAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<ImageAnalysis>,
}

/// Append-only history row, one per completed analysis
///
/// The result is kept as JSON text; bincode cannot round-trip
/// self-describing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    /// None for anonymous analyses
    pub user_id: Option<String>,
    pub language: Language,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub goal: Option<String>,
    /// Declared duration in seconds
    pub video_duration: Option<f64>,
    pub tier: Tier,
    /// Unix timestamp
    pub created_at: i64,
    pub analysis_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_defaults_to_spanish() {
        assert_eq!(Language::default(), Language::Es);
        let lang: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(lang, Language::En);
    }

    #[test]
    fn test_record_bincode_roundtrip() {
        let record = AnalysisRecord {
            id: "a1".to_string(),
            user_id: Some("u1".to_string()),
            language: Language::En,
            topic: Some("Quarterly results".to_string()),
            audience: None,
            goal: None,
            video_duration: Some(42.5),
            tier: Tier::Pro,
            created_at: 1_760_000_000,
            analysis_json: "{\"overallScore\":80}".to_string(),
        };

        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&record, config).unwrap();
        let (decoded, _): (AnalysisRecord, _) =
            bincode::serde::decode_from_slice(&bytes, config).unwrap();

        assert_eq!(decoded.id, record.id);
        assert_eq!(decoded.tier, Tier::Pro);
        assert_eq!(decoded.video_duration, Some(42.5));
        assert_eq!(decoded.analysis_json, record.analysis_json);
    }
}
