//! Fixed instruction template and function schema for note extraction.

use serde_json::{Value, json};

/// Name of the function the model is forced to answer through.
pub const FORMAT_NOTES_FUNCTION: &str = "formatNotes";

const NOTE_PROMPT_TEMPLATE: &str = r#"Take notes on the following scientific paper.
This is a technical paper outlining a computer science technique.
The goal is to be able to create a complete understanding of the paper after reading all notes.

Rules:
- Include specific quotes and details inside your notes.
- Respond with as many notes as it might take to cover the entire paper.
- Go into as much detail as you can, while keeping each note on a very specific part of the paper.
- Include notes about the results of any experiments the paper describes.
- Include notes about any steps to reproduce the results of the experiments.
- DO NOT respond with notes like: "The author discusses how well XYZ works.", instead explain what XYZ is and how it works.

Respond with a JSON array of objects with two keys: "text" and "pageNumbers".
"text" will be the specific note, and "pageNumbers" will be an array of numbers (if the note spans more than one page).
Take a deep breath, and work your way through the paper step by step.

Paper: {paper}"#;

/// Substitute the paper text into the fixed instruction template.
pub fn build_note_prompt(paper: &str) -> String {
    NOTE_PROMPT_TEMPLATE.replace("{paper}", paper)
}

/// JSON schema for the `formatNotes` function the model must populate.
pub fn notes_tool_schema() -> Value {
    json!({
        "name": FORMAT_NOTES_FUNCTION,
        "description": "Format the notes response",
        "parameters": {
            "type": "object",
            "properties": {
                "notes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "text": {
                                "type": "string",
                                "description": "The note text"
                            },
                            "pageNumbers": {
                                "type": "array",
                                "items": {
                                    "type": "number",
                                    "description": "The page number(s) of the note"
                                }
                            }
                        },
                        "required": ["text", "pageNumbers"]
                    }
                }
            },
            "required": ["notes"]
        }
    })
}
