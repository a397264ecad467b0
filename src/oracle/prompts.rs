pub fn transcription_prompt() -> String {
    r#"Transcribe the attached recording of a medical verification call between a doctor and a customer.
If the call is not in English, translate it and transcribe the English translation.

Return JSON only, in exactly this shape:
{
  "segments": [
    {
      "segment_id": "1",
      "text": "what was said",
      "speaker": "doctor",
      "start_timestamp": "MM:SS",
      "end_timestamp": "MM:SS"
    }
  ]
}

SPEAKERS:
- "doctor" for the examining doctor
- "customer" for the person being examined

SEGMENTS:
- Start a new segment whenever the speaker changes
- Start a new segment if one speaker talks for more than 30 seconds
- Overlapping speech gets its own segment; timestamps may overlap

TIMESTAMPS:
- MM:SS offsets from the start of the recording, e.g. "01:23"
- start_timestamp must be before end_timestamp
- Leave gaps only for real silence

RULES:
- segment_id values are unique
- Do not repeat ids or timestamps inside text
- No markdown, no commentary"#
        .to_string()
}

pub fn qa_prompt(transcript: &str, mer: &str) -> String {
    format!(
        r#"You audit medical verification calls. Compare the call transcript with the filled MER (Medical Examination Report) form.

TRANSCRIPT:
{}

MER FORM:
{}

For EVERY question on the MER form, decide what was asked and answered on the call and how it compares to what the doctor documented.

Return JSON only, in exactly this shape:
{{
  "personal_particulars": {{
    "name": "string|null",
    "dob": "string|null",
    "id_proofs": [{{"type": "PAN|Aadhar|Passport|DL|VoterID|OCI", "value": "string", "present_in_mer": true}}],
    "nominee_name": "string|null",
    "nominee_dob": "string|null"
  }},
  "process_compliance": {{
    "disclaimer": {{"stated": true, "insurer_name": "string|null", "timestamp": "MM:SS|null"}},
    "language_preference": {{"asked": true, "selected_language": "string|null", "timestamp": "MM:SS|null"}}
  }},
  "qa_matrix": [
    {{
      "question_id": "3.1",
      "question_text": "question as printed on the MER",
      "captured_response": "answer given on the call, null if never asked",
      "expected_response": "answer documented on the MER",
      "status": "Correct|Incorrect|Missing|Paraphrased|Clubbed|NA",
      "timestamp": "MM:SS",
      "typo_in_expected_response": {{"has_typo": false, "corrected_text": null}}
    }}
  ],
  "summary": {{
    "critical_issues": ["..."],
    "recommendations": ["..."]
  }},
  "data_validation": {{
    "height_cm": "height stated on the call, in cm",
    "weight_kg": "weight stated on the call, in kg"
  }},
  "behavioral_flags": {{
    "prompting_detected": {{"value": false, "timestamps": ["MM:SS"], "examples": ["..."]}},
    "customer_hesitation": {{"value": false, "timestamps": ["MM:SS"], "examples": ["..."]}}
  }},
  "meta": {{
    "id": "proposal number or member id",
    "doctor_name": "string",
    "customer_name": "string",
    "insurance_company": "string",
    "date": "date of the call if stated"
  }}
}}

STATUS RULES:
- Missing: the question was never asked
- Incorrect: the documented answer differs from what was said
- Paraphrased: asked in different words, same information captured
- Clubbed: several questions were combined into one
- NA: the question does not apply to this customer (for example sibling entries beyond the number of siblings mentioned)
- Formatting, spacing and case differences are Correct

PERSONAL PARTICULARS:
- Verify them like any other question in qa_matrix, only when present on the MER
- Use ids PP.Name, PP.DOB, PP.ID.<TYPE>, PP.NomineeName, PP.NomineeDOB
- ID numbers may be full or partial and alphanumeric

TYPOS:
- typo_in_expected_response looks only at the documented answer
- Ignore spacing and case; flag only genuine misspellings and give the correction

BEHAVIOR:
- Prompting is rare: a third party feeding answers that the customer repeats. Normal doctor rephrasing is not prompting
- Hesitation means refusing, not answering, or repeatedly evading; "maybe" or "I think" alone is not hesitation

UNITS AND DATES:
- Convert feet and inches to cm (1 inch = 2.54 cm) and allow 1 cm tolerance
- Dates of birth may be spoken as digit runs ("11993" is 01-Jan-1993)

Do not include audio or video checks and do not compute summary counts; those are handled separately."#,
        transcript, mer
    )
}

pub fn qc_prompt(transcript: &str) -> String {
    format!(
        r#"Assess the doctor's conduct on this medical verification call. Use only evidence from the transcript and cite timestamps.

TRANSCRIPT:
{}

Return JSON only, in exactly this shape:
{{
  "qc_parameters": {{
    "greetings": {{"value": "Yes|No", "explanation": "", "timestamps": ["MM:SS"]}},
    "call_opening": {{"value": "Yes|Partial|No", "explanation": "", "timestamps": {{"self_intro": "MM:SS", "client_name": "MM:SS", "insurer_name": "MM:SS"}}}},
    "language_preference": {{"value": "Yes|No", "explanation": "", "timestamp": "MM:SS"}},
    "id_validation": {{"value": "Yes|No", "explanation": "", "timestamps": ["MM:SS"]}},
    "disclaimer": {{"value": "Yes|No", "explanation": "", "timestamp": "MM:SS"}},
    "politeness": {{"value": "Yes|Partial|No", "explanation": "", "timestamps": ["MM:SS"]}},
    "empathy": {{"value": "Yes|No|NA", "explanation": "", "timestamps": ["MM:SS"]}},
    "communication_skills": {{"value": "Yes|Partial|No", "explanation": "", "timestamps": {{"good_examples": ["MM:SS"], "poor_examples": ["MM:SS"]}}}},
    "probing": {{"value": "Yes|No|NA", "explanation": "", "timestamps": ["MM:SS"]}},
    "observations": {{"value": "Yes|No|NA", "explanation": "", "timestamps": ["MM:SS"]}},
    "call_closure": {{"value": "Yes|Partial|No", "explanation": "", "timestamps": {{"declaration": "MM:SS", "thank_you": "MM:SS"}}}}
  }}
}}

RULES:
- Empathy is only expected for serious health events (accident, surgery, severe illness); otherwise answer Yes
- Use NA where a parameter does not apply
- Keep each explanation under 50 words
- Judge the doctor, not the customer"#,
        transcript
    )
}

pub fn spelling_prompt(mer: &str) -> String {
    format!(
        r#"Check this filled MER (Medical Examination Report) for spelling mistakes in the values the doctor typed.

MER FORM:
{}

RULES:
- Only look at doctor-entered values: names, addresses, free-text notes, medications, comments
- Ignore template labels, headers, option lists and placeholders
- Ignore spacing, capitalization and grammar; report only genuine misspellings
- When unsure whether text is a label or a value, do not flag it

Return JSON only:
{{
  "documentation_quality": {{
    "spelling_errors_count": 0,
    "typos_found": ["misspelled words"],
    "notes": "short explanation"
  }}
}}"#,
        mer
    )
}

pub fn video_prompt(frame_count: usize) -> String {
    format!(
        r#"The {} attached images are frames sampled from a video medical verification call.

Return JSON only:
{{
  "attire_check": "yes|no|unknown",
  "attire_explanation": "",
  "visibility_status": "both_visible|only_doctor|only_customer|unknown",
  "visibility_explanation": "",
  "privacy_maintained": true,
  "privacy_explanation": ""
}}

RULES:
- attire_check: is the doctor wearing a clinical apron or coat? Use unknown only when the frames are inconclusive
- visibility_status: are both the doctor and the customer visible? Say which frames support the answer
- privacy_maintained: judge only the doctor's background. People passing behind the doctor, readable files or screens, or another patient nearby are breaches. Use null when it cannot be judged"#,
        frame_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qa_prompt_embeds_inputs() {
        let prompt = qa_prompt("Call - 1\n[Segment ID - call1_1] hello", "Name: John Doe");
        assert!(prompt.contains("[Segment ID - call1_1] hello"));
        assert!(prompt.contains("Name: John Doe"));
        assert!(prompt.contains("\"qa_matrix\""));
    }

    #[test]
    fn test_qc_prompt_lists_all_dimensions() {
        let prompt = qc_prompt("transcript");
        for dimension in [
            "greetings",
            "call_opening",
            "language_preference",
            "id_validation",
            "disclaimer",
            "politeness",
            "empathy",
            "communication_skills",
            "probing",
            "observations",
            "call_closure",
        ] {
            assert!(prompt.contains(dimension), "missing {}", dimension);
        }
    }

    #[test]
    fn test_video_prompt_counts_frames() {
        assert!(video_prompt(3).starts_with("The 3 attached images"));
    }
}
