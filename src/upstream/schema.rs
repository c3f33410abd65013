//! Structured-output schema sent with every analysis request, in the
//! OpenAPI subset the model accepts (`OBJECT`, `STRING`, `NUMBER`, ...).

use serde_json::{Map, Value, json};

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn number(description: &str) -> Value {
    json!({ "type": "NUMBER", "description": description })
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

/// Object whose listed fields are all required strings
fn string_object(fields: &[&str]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|field| (field.to_string(), string()))
        .collect();
    json!({ "type": "OBJECT", "properties": properties, "required": fields })
}

/// Schema of an `AnalysisResult`; premium adds the vocal and image sections
pub fn analysis_schema(premium: bool) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "overallScore".into(),
        number("Score from 0 to 100 based on public speaking best practices."),
    );
    properties.insert("summary".into(), string());
    properties.insert(
        "fillerWords".into(),
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": { "word": string(), "count": { "type": "INTEGER" } },
                "required": ["word", "count"]
            }
        }),
    );
    properties.insert(
        "pacing".into(),
        json!({
            "type": "OBJECT",
            "properties": {
                "status": string(),
                "wpm": number("Estimated words per minute."),
                "feedback": string()
            },
            "required": ["status", "wpm", "feedback"]
        }),
    );
    properties.insert(
        "emotions".into(),
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "name": string(),
                    "percentage": number("Share of the speech dominated by this emotion (0-100).")
                },
                "required": ["name", "percentage"]
            }
        }),
    );
    properties.insert(
        "bodyLanguage".into(),
        string_object(&["eyeContact", "posture", "gestures", "feedback"]),
    );
    properties.insert(
        "speechAnalysis".into(),
        string_object(&["clarity", "coherence", "persuasion", "feedback"]),
    );
    properties.insert("improvementTips".into(), string_list());
    properties.insert(
        "actionPlan".into(),
        json!({
            "type": "OBJECT",
            "properties": {
                "exercises": string_list(),
                "dynamics": string_list(),
                "resources": string_list()
            },
            "required": ["exercises", "dynamics", "resources"]
        }),
    );

    let mut required = vec![
        "overallScore",
        "summary",
        "fillerWords",
        "pacing",
        "emotions",
        "bodyLanguage",
        "speechAnalysis",
        "improvementTips",
        "actionPlan",
    ];

    if premium {
        properties.insert(
            "vocalAnalysis".into(),
            string_object(&["toneVariety", "volumeControl", "articulation", "feedback"]),
        );
        properties.insert(
            "imageAnalysis".into(),
            string_object(&["attire", "hair", "face", "feedback"]),
        );
        required.extend(["vocalAnalysis", "imageAnalysis"]);
    }

    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schema() {
        let schema = analysis_schema(false);
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["fillerWords"]["items"]["properties"]["count"]["type"], "INTEGER");
        assert_eq!(schema["properties"]["overallScore"]["type"], "NUMBER");
        assert!(schema["properties"].get("vocalAnalysis").is_none());
        assert!(schema["properties"].get("imageAnalysis").is_none());
        assert_eq!(schema["required"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_premium_schema_adds_sections() {
        let schema = analysis_schema(true);
        assert_eq!(schema["properties"]["vocalAnalysis"]["type"], "OBJECT");
        assert_eq!(
            schema["properties"]["imageAnalysis"]["required"],
            json!(["attire", "hair", "face", "feedback"])
        );
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("vocalAnalysis")));
        assert!(required.contains(&json!("imageAnalysis")));
    }

    #[test]
    fn test_required_fields_are_declared() {
        let schema = analysis_schema(true);
        for field in schema["required"].as_array().unwrap() {
            let field = field.as_str().unwrap();
            assert!(
                schema["properties"].get(field).is_some(),
                "missing property {}",
                field
            );
        }
    }
}
