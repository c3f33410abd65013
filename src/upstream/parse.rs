use crate::constants::RAW_RESPONSE_EXCERPT_CHARS;
use crate::error::{AppError, Result};
use crate::models::AnalysisResult;

/// Slice from the first `{` to the last `}`
///
/// Models sometimes wrap the object in prose or code fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Parse the model's free-form text into an `AnalysisResult`
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let malformed = || AppError::UpstreamMalformedResponse {
        excerpt: excerpt(text, RAW_RESPONSE_EXCERPT_CHARS),
    };

    let Some(json) = extract_json_object(text) else {
        tracing::warn!("Upstream response contains no JSON object");
        return Err(malformed());
    };

    serde_json::from_str(json).map_err(|e| {
        tracing::warn!("Upstream JSON did not match the analysis schema: {}", e);
        malformed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS: &str = r#"{
        "overallScore": 78,
        "summary": "Clear delivery with a strong opening.",
        "fillerWords": [{"word": "um", "count": 4}],
        "pacing": {"status": "Normal", "wpm": 142, "feedback": "Steady."},
        "emotions": [{"name": "Confidence", "percentage": 60}],
        "bodyLanguage": {"eyeContact": "Bueno", "posture": "Erguido", "gestures": "Naturales", "feedback": "Good."},
        "speechAnalysis": {"clarity": "Claro", "coherence": "Buena", "persuasion": "Convincente", "feedback": "Solid."},
        "improvementTips": ["Pause before key points"],
        "actionPlan": {"exercises": ["Box breathing"], "dynamics": ["Daily 1-minute talk"], "resources": ["Talk Like TED"]}
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let result = parse_analysis(ANALYSIS).unwrap();
        assert_eq!(result.overall_score, 78.0);
        assert_eq!(result.filler_words[0].word, "um");
        assert!(result.vocal_analysis.is_none());
    }

    #[test]
    fn test_wrapped_json_parses_identically() {
        let wrapped = format!(
            "Here is the analysis you asked for:\n```json\n{}\n```\nLet me know if you need more.",
            ANALYSIS
        );
        assert_eq!(parse_analysis(&wrapped).unwrap(), parse_analysis(ANALYSIS).unwrap());
    }

    #[test]
    fn test_premium_fields_are_parsed() {
        let premium = ANALYSIS.trim_end().trim_end_matches('}').to_string()
            + r#", "vocalAnalysis": {"toneVariety": "Variado", "volumeControl": "Adecuado", "articulation": "Precisa", "feedback": "Nice range."}}"#;
        let result = parse_analysis(&premium).unwrap();
        assert_eq!(result.vocal_analysis.unwrap().tone_variety, "Variado");
        assert!(result.image_analysis.is_none());
    }

    #[test]
    fn test_no_braces_is_malformed() {
        assert!(matches!(
            parse_analysis("Sorry, I cannot analyze this video."),
            Err(AppError::UpstreamMalformedResponse { .. })
        ));
        assert!(matches!(
            parse_analysis("} backwards {"),
            Err(AppError::UpstreamMalformedResponse { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let Err(AppError::UpstreamMalformedResponse { excerpt }) =
            parse_analysis("prefix {\"overallScore\": 80,,} suffix")
        else {
            panic!("expected malformed response");
        };
        assert!(excerpt.starts_with("prefix"));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        assert!(matches!(
            parse_analysis(r#"{"overallScore": 80}"#),
            Err(AppError::UpstreamMalformedResponse { .. })
        ));
    }

    #[test]
    fn test_excerpt_is_truncated_on_char_boundary() {
        let long = "é".repeat(600);
        let short = excerpt(&long, 500);
        assert_eq!(short.chars().count(), 503);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("abc", 500), "abc");
    }
}
