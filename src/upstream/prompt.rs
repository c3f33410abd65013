use super::AnalysisRequest;
use crate::models::Language;

const SCHEMA_OUTLINE: &str = r#"{
  "overallScore": number 0-100,
  "summary": string,
  "fillerWords": [{"word": string, "count": integer}],
  "pacing": {"status": string, "wpm": number, "feedback": string},
  "emotions": [{"name": string, "percentage": number 0-100}],
  "bodyLanguage": {"eyeContact": string, "posture": string, "gestures": string, "feedback": string},
  "speechAnalysis": {"clarity": string, "coherence": string, "persuasion": string, "feedback": string},
  "improvementTips": [string],
  "actionPlan": {"exercises": [string], "dynamics": [string], "resources": [string]}
}"#;

const PREMIUM_OUTLINE: &str = r#"Also include:
  "vocalAnalysis": {"toneVariety": string, "volumeControl": string, "articulation": string, "feedback": string},
  "imageAnalysis": {"attire": string, "hair": string, "face": string, "feedback": string}"#;

fn base_instructions(language: Language) -> &'static str {
    match language {
        Language::Es => {
            "Actúa como un experto entrenador de oratoria de clase mundial. Analiza este video de una presentación.\n\
             Identifica muletillas, ritmo, emociones (con porcentajes estimados), lenguaje corporal y contenido (claridad, coherencia, persuasión).\n\n\
             CRUCIAL: Genera un 'actionPlan' detallado basado en las debilidades detectadas:\n\
             1. 'exercises': ejercicios vocales o físicos específicos e inmediatos.\n\
             2. 'dynamics': rutinas de práctica.\n\
             3. 'resources': recomendaciones concretas de qué leer o investigar."
        }
        Language::En => {
            "Act as a world-class public speaking coach. Analyze this presentation video.\n\
             Identify filler words, pacing, emotions (with estimated percentages), body language, and content (clarity, coherence, persuasion).\n\n\
             CRUCIAL: Generate a detailed 'actionPlan' based on detected weaknesses:\n\
             1. 'exercises': specific, immediate vocal or physical exercises.\n\
             2. 'dynamics': practice routines.\n\
             3. 'resources': concrete recommendations on what to read or research."
        }
    }
}

fn premium_instructions(language: Language) -> &'static str {
    match language {
        Language::Es => {
            "MODO PREMIUM: completa también 'vocalAnalysis' (variedad de tono, control de volumen, articulación) \
             e 'imageAnalysis' (vestimenta, cabello, rostro). Evalúa solo a la persona, no el fondo ni la iluminación."
        }
        Language::En => {
            "PREMIUM MODE: also fill in 'vocalAnalysis' (tone variety, volume control, articulation) \
             and 'imageAnalysis' (attire, hair, face). Evaluate only the person, not the background or lighting."
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build the natural-language instruction sent alongside the media
pub fn build_prompt(request: &AnalysisRequest) -> String {
    let language = request.language;
    let mut prompt = String::from(base_instructions(language));

    if request.premium {
        prompt.push_str("\n\n");
        prompt.push_str(premium_instructions(language));
    }

    if let Some(topic) = non_empty(&request.topic) {
        prompt.push_str(&match language {
            Language::Es => format!(
                "\nTEMA DEFINIDO POR EL USUARIO: \"{}\". Evalúa en 'speechAnalysis.coherence' y 'summary' si el discurso se mantiene alineado a este tema.",
                topic
            ),
            Language::En => format!(
                "\nUSER DEFINED TOPIC: \"{}\". Evaluate in 'speechAnalysis.coherence' and 'summary' whether the speech stays aligned with this topic.",
                topic
            ),
        });
    }

    if let Some(audience) = non_empty(&request.audience) {
        prompt.push_str(&match language {
            Language::Es => format!(
                "\nPÚBLICO OBJETIVO: \"{}\". Evalúa en 'speechAnalysis.persuasion' y 'summary' si el tono y el estilo son apropiados para este público.",
                audience
            ),
            Language::En => format!(
                "\nTARGET AUDIENCE: \"{}\". Evaluate in 'speechAnalysis.persuasion' and 'summary' whether tone and style suit this audience.",
                audience
            ),
        });
    }

    if let Some(goal) = non_empty(&request.goal) {
        prompt.push_str(&match language {
            Language::Es => format!(
                "\nOBJETIVO PRINCIPAL DEL USUARIO: \"{}\". Basa 'overallScore', 'speechAnalysis.persuasion' y 'actionPlan' en qué tan bien se cumple.",
                goal
            ),
            Language::En => format!(
                "\nUSER'S MAIN GOAL: \"{}\". Base 'overallScore', 'speechAnalysis.persuasion' and 'actionPlan' on how well it is achieved.",
                goal
            ),
        });
    }

    prompt.push_str("\n\nRespond with a single JSON object of this shape:\n");
    prompt.push_str(SCHEMA_OUTLINE);
    if request.premium {
        prompt.push('\n');
        prompt.push_str(PREMIUM_OUTLINE);
    }

    prompt.push_str(match language {
        Language::Es => "\nLA RESPUESTA DEBE ESTAR EN ESPAÑOL.",
        Language::En => "\nRESPONSE MUST BE IN ENGLISH.",
    });

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(language: Language, premium: bool) -> AnalysisRequest {
        AnalysisRequest {
            video_base64: String::new(),
            mime_type: "video/webm".to_string(),
            language,
            premium,
            topic: None,
            audience: None,
            goal: None,
        }
    }

    #[test]
    fn test_language_selects_instructions() {
        let es = build_prompt(&request(Language::Es, false));
        let en = build_prompt(&request(Language::En, false));
        assert!(es.contains("ESPAÑOL"));
        assert!(en.contains("ENGLISH"));
        assert!(en.contains("\"actionPlan\""));
    }

    #[test]
    fn test_premium_requests_extra_fields() {
        let basic = build_prompt(&request(Language::En, false));
        let premium = build_prompt(&request(Language::En, true));
        assert!(!basic.contains("vocalAnalysis"));
        assert!(premium.contains("vocalAnalysis"));
        assert!(premium.contains("imageAnalysis"));
    }

    #[test]
    fn test_context_is_injected_when_present() {
        let mut req = request(Language::En, false);
        req.topic = Some("Series A pitch".to_string());
        req.audience = Some("  ".to_string());
        req.goal = Some("Close the round".to_string());

        let prompt = build_prompt(&req);
        assert!(prompt.contains("Series A pitch"));
        assert!(prompt.contains("Close the round"));
        assert!(!prompt.contains("TARGET AUDIENCE"));
    }
}
