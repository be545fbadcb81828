// src/config/validate.rs

use crate::config::model::{
    RawSettings, Settings, CONTEXT_PLACEHOLDER, FILE_PLACEHOLDER, TEMPLATE_PLACEHOLDER,
};
use crate::errors::{Jinja2ConfigError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = Jinja2ConfigError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    validate_commands(raw)?;
    validate_watch(raw)?;
    validate_entities(raw)?;
    validate_process(raw)?;
    Ok(())
}

fn validate_commands(raw: &RawSettings) -> Result<()> {
    if raw.renderer.program.trim().is_empty() {
        return Err(config_error("[renderer].program must not be empty"));
    }
    if !raw.renderer.args.iter().any(|a| a.contains(TEMPLATE_PLACEHOLDER)) {
        return Err(config_error(format!(
            "[renderer].args must reference {TEMPLATE_PLACEHOLDER}"
        )));
    }
    if !raw.renderer.args.iter().any(|a| a.contains(CONTEXT_PLACEHOLDER)) {
        tracing::warn!(
            "[renderer].args does not reference {CONTEXT_PLACEHOLDER}; template variables will not be passed"
        );
    }

    if raw.formatter.program.trim().is_empty() {
        return Err(config_error("[formatter].program must not be empty"));
    }
    if !raw.formatter.args.iter().any(|a| a.contains(FILE_PLACEHOLDER)) {
        return Err(config_error(format!(
            "[formatter].args must reference {FILE_PLACEHOLDER}"
        )));
    }
    Ok(())
}

fn validate_watch(raw: &RawSettings) -> Result<()> {
    if raw.watch.template_suffix.is_empty() {
        return Err(config_error("[watch].template_suffix must not be empty"));
    }
    if raw.watch.template_extension.is_empty()
        || raw.watch.template_extension.len() >= raw.watch.template_suffix.len()
        || !raw.watch.template_suffix.ends_with(&raw.watch.template_extension)
    {
        return Err(config_error(format!(
            "[watch].template_extension ({:?}) must be a proper trailing part of template_suffix ({:?})",
            raw.watch.template_extension, raw.watch.template_suffix
        )));
    }
    if raw.watch.debounce_secs == 0 {
        return Err(config_error("[watch].debounce_secs must be >= 1 (got 0)"));
    }
    if raw.watch.poll_interval_ms == 0 {
        return Err(config_error("[watch].poll_interval_ms must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_entities(raw: &RawSettings) -> Result<()> {
    if !raw.entities.enabled {
        return Ok(());
    }
    if raw.entities.base_url.trim().is_empty() {
        return Err(config_error("[entities].base_url must not be empty"));
    }
    if raw.entities.token_env.trim().is_empty() {
        return Err(config_error("[entities].token_env must not be empty"));
    }
    Ok(())
}

fn validate_process(raw: &RawSettings) -> Result<()> {
    if raw.process.timeout_secs == Some(0) {
        return Err(config_error("[process].timeout_secs must be >= 1 (got 0)"));
    }
    Ok(())
}

fn config_error(msg: impl Into<String>) -> Jinja2ConfigError {
    Jinja2ConfigError::ConfigError(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::try_from(RawSettings::default()).is_ok());
    }

    #[test]
    fn rejects_zero_debounce() {
        let mut raw = RawSettings::default();
        raw.watch.debounce_secs = 0;
        match Settings::try_from(raw) {
            Err(Jinja2ConfigError::ConfigError(msg)) => assert!(msg.contains("debounce_secs")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_renderer_without_template_placeholder() {
        let mut raw = RawSettings::default();
        raw.renderer.args = vec!["-d".to_string(), "{context}".to_string()];
        assert!(matches!(
            Settings::try_from(raw),
            Err(Jinja2ConfigError::ConfigError(_))
        ));
    }

    #[test]
    fn extension_must_trail_suffix() {
        let mut raw = RawSettings::default();
        raw.watch.template_extension = ".j2".to_string();
        assert!(matches!(
            Settings::try_from(raw),
            Err(Jinja2ConfigError::ConfigError(_))
        ));
    }

    #[test]
    fn disabled_entities_skip_url_checks() {
        let mut raw = RawSettings::default();
        raw.entities.enabled = false;
        raw.entities.base_url.clear();
        assert!(Settings::try_from(raw).is_ok());
    }
}
