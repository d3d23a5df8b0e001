use anyhow::{Context, Result};
use quiz_rules::check_answer_index;
use serde::Deserialize;
use tracing::warn;

/// One entry of a `questions.json` batch file.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    answer_index: u8,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    pub options: [String; 4],
    pub answer_index: u8,
}

impl TryFrom<RawQuestion> for NewQuestion {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        if raw.text.trim().is_empty() {
            return Err("empty question text".into());
        }
        let count = raw.options.len();
        let options: [String; 4] = raw
            .options
            .try_into()
            .map_err(|_| format!("expected 4 options, got {count}"))?;
        let answer_index = check_answer_index(raw.answer_index).map_err(|e| e.to_string())?;
        Ok(Self {
            text: raw.text,
            options,
            answer_index,
        })
    }
}

/// Parse a JSON array of questions. Entries of the wrong shape are skipped
/// with a warning; only a file that is not a JSON array is an error.
pub fn parse_questions(raw: &str) -> Result<Vec<NewQuestion>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("questions file must be a JSON array")?;

    let mut questions = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawQuestion>(entry)
            .map_err(|e| e.to_string())
            .and_then(NewQuestion::try_from);
        match parsed {
            Ok(question) => questions.push(question),
            Err(reason) => warn!(entry = i, %reason, "skipping invalid question"),
        }
    }
    Ok(questions)
}
