use std::collections::HashMap;

use validator::ValidationErrors;

/// Flattens declarative validation failures into the `field -> [messages]`
/// map carried by the outcome envelope.
pub fn field_error_map(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut error_map = HashMap::new();

    for (field, field_errors) in errors.field_errors() {
        let error_messages: Vec<String> = field_errors
            .iter()
            .map(|error| {
                error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Invalid value".into())
                    .to_string()
            })
            .collect();

        error_map.insert(field.to_string(), error_messages);
    }

    error_map
}
