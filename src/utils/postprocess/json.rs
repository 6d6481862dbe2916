use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{from_str, Value};
use thiserror::Error;


/// Filters invalid content and tries to parse the valid json string.
///
/// Returns a [serde_json::Value] if the string is valid json else a [SchemaError].
///
/// # Example
/// ```
/// use promptline::utils::postprocess::json::filter_to_json;
/// let valid_str = "partially valid: {\"a\":\"alice\"}";
/// let json_value = filter_to_json(valid_str).expect("Expect to be fine but failed");
/// assert_eq!(json_value["a"], "alice");
///
/// let invalid_str = "partially valid: \"a\":\"alice\"}";
/// assert_eq!(filter_to_json(invalid_str).is_err(), true)
/// ```
pub fn filter_to_json(string: impl Into<String>) -> Result<Value, SchemaError> {
    let string = string.into();
    let left_brace_idx = string.find('{');
    let right_brace_idx = string.rfind('}');
    match (left_brace_idx, right_brace_idx) {
        (Some(lbi), Some(rbi)) if lbi < rbi => {
            let valid_json = &string[lbi..rbi + 1];
            from_str(valid_json).map_err(|e| SchemaError::new("a JSON object", e.to_string(), &string))
        }
        _ => Err(SchemaError::new("a JSON object", "no JSON object found", string))
    }
}

/// A value that can be requested from a model as JSON and parsed back.
///
/// Blanket-implemented for every `DeserializeOwned + JsonSchema` type, so a `#[derive(Deserialize, JsonSchema)]`
/// struct is enough. Field doc comments end up as descriptions in the format instructions.
pub trait Structured: DeserializeOwned + JsonSchema {
    /// Instructions appended to a prompt to make the model answer with an instance of `Self`.
    fn format_instructions() -> String {
        let schema = schemars::schema_for!(Self);
        let schema = serde_json::to_string(&schema).unwrap_or_default();
        format!("The output should be formatted as a JSON instance that conforms to the JSON schema below. \
        Respond with the JSON instance only, not the schema itself.\n\
        Here is the output schema:\n```\n{}\n```", schema)
    }

    /// Parses a model reply into `Self`, tolerating text around the JSON object.
    fn parse_reply(reply: &str) -> Result<Self, SchemaError> {
        let value = filter_to_json(reply)?;
        serde_json::from_value(value)
            .map_err(|e| SchemaError::new(Self::schema_name(), e.to_string(), reply))
    }
}

impl<T: DeserializeOwned + JsonSchema> Structured for T {}

/// Error when a model reply cannot be coerced into the expected structured shape.
#[derive(Debug, Clone, Error)]
#[error("model output does not conform to {expected}: {reason}\nGot output:\n{output}")]
pub struct SchemaError {
    pub expected: String,
    pub reason: String,
    pub output: String,
}

impl SchemaError {
    pub fn new(expected: impl Into<String>, reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            reason: reason.into(),
            output: output.into(),
        }
    }
}


#[cfg(test)]
mod test_json {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use super::{filter_to_json, Structured};

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Users {
        /// List of product users
        users: Vec<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    enum Channel {
        Mail,
        LinkedIn,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct ChannelReply {
        platform: Channel,
    }

    #[test]
    fn test_filter_to_json() {
        let valid_str = "{\"a\":\"alice\"}";
        let json_value = filter_to_json(valid_str).expect("Expect to be fine but failed");
        assert_eq!(json_value["a"], "alice");

        let valid_str = "Here is the result you ask for: {\"a\":\"alice\"}";
        let json_value = filter_to_json(valid_str).expect("Expect to be fine but failed");
        assert_eq!(json_value["a"], "alice");

        let invalid_str = "Here is the result you ask for: {\"a\":\"alice\"";
        filter_to_json(invalid_str).expect_err("This should give error but not");

        let invalid_str = "{{}}";
        filter_to_json(invalid_str).expect_err("This should give error but not");

        let invalid_str = "} backwards {";
        filter_to_json(invalid_str).expect_err("This should give error but not");
    }

    #[test]
    fn test_parse_reply_in_code_fence() {
        let reply = "```json\n{\"users\": [\"Doctor\", \"Farmer\"]}\n```";
        let users = Users::parse_reply(reply).unwrap();
        assert_eq!(vec!["Doctor".to_string(), "Farmer".to_string()], users.users);
    }

    #[test]
    fn test_parse_reply_wrong_shape() {
        let err = Users::parse_reply("{\"people\": []}").unwrap_err();
        assert_eq!("Users", err.expected);
        assert!(err.output.contains("people"));
    }

    #[test]
    fn test_closed_enum_is_strict() {
        assert_eq!(Channel::Mail, ChannelReply::parse_reply("{\"platform\": \"Mail\"}").unwrap().platform);
        assert!(ChannelReply::parse_reply("{\"platform\": \"Twitter\"}").is_err());
    }

    #[test]
    fn test_format_instructions_mention_fields() {
        let instructions = Users::format_instructions();
        assert!(instructions.contains("\"users\""));
        assert!(instructions.contains("List of product users"));
    }
}
