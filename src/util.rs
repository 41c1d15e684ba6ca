use crate::{Error, Result};

/// Section name that INI readers treat as a defaults block rather than a real section.
const RESERVED_SECTION: &str = "DEFAULT";

pub(crate) fn validate_jail_name(input: &str, file_extension: &str) -> Result<()> {
    validate_no_control("jail name", input)?;
    if input.is_empty() {
        return Err(Error::invalid_input("jail name must not be empty"));
    }
    if input.trim() != input {
        return Err(Error::invalid_input(
            "jail name must not have surrounding whitespace",
        ));
    }
    if input.contains('/') || input.contains('\\') {
        return Err(Error::invalid_input(
            "jail name must not contain path separators",
        ));
    }
    if input.contains("..") {
        return Err(Error::invalid_input("jail name must not contain '..'"));
    }
    if input.contains('[') || input.contains(']') {
        return Err(Error::invalid_input(
            "jail name must not contain '[' or ']'",
        ));
    }
    if input == RESERVED_SECTION {
        return Err(Error::invalid_input(format!(
            "jail name must not be {RESERVED_SECTION}"
        )));
    }
    if input.ends_with(&format!(".{file_extension}")) {
        return Err(Error::invalid_input(format!(
            "jail name must not include the .{file_extension} suffix"
        )));
    }
    Ok(())
}

pub(crate) fn validate_marker(input: &str) -> Result<()> {
    validate_no_control("managed marker", input)?;
    if !input.starts_with('#') && !input.starts_with(';') {
        return Err(Error::invalid_input(
            "managed marker must be a comment line starting with '#' or ';'",
        ));
    }
    if input.trim_end() != input {
        return Err(Error::invalid_input(
            "managed marker must not have trailing whitespace",
        ));
    }
    Ok(())
}

pub(crate) fn validate_file_extension(input: &str) -> Result<()> {
    validate_no_control("file extension", input)?;
    if input.trim().is_empty() {
        return Err(Error::invalid_input("file extension must not be empty"));
    }
    if input.contains('/') || input.contains('\\') || input.starts_with('.') {
        return Err(Error::invalid_input(
            "file extension must not contain path separators or a leading '.'",
        ));
    }
    Ok(())
}

pub(crate) fn validate_setting_value(key: &str, value: &str) -> Result<()> {
    validate_no_control("setting value", value)?;
    if value.trim() != value {
        return Err(Error::invalid_input(format!(
            "value of {key} must not have surrounding whitespace"
        )));
    }
    Ok(())
}

pub(crate) fn validate_no_control(context: &'static str, input: &str) -> Result<()> {
    if input.contains('\0') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain NUL"
        )));
    }
    if input.contains('\n') || input.contains('\r') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain newlines"
        )));
    }
    if input.chars().any(|c| c.is_control()) {
        return Err(Error::invalid_input(format!(
            "{context} must not contain control characters"
        )));
    }
    Ok(())
}
