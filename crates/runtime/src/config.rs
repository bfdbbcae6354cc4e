//! VM configuration (C11, ambient): the few runtime-tunable constants, loadable from TOML or
//! built as `VmConfig::default()`. Mirrors the teacher's `seq-compiler` lint config: a
//! `serde`-deserialized struct with a hardcoded default, loaded from an optional file.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum depth of the foreground GOSUB call stack before `FatalKind::CallStackOverflow`.
    pub max_call_stack_depth: usize,
    /// Maximum depth of the trigger call stack (§4.7's dedicated, isolated stack).
    pub max_trigger_stack_depth: usize,
    /// Whether a bare `pause` (no argument) waits forever for a trigger, vs. yielding exactly
    /// one scheduler tick. See DESIGN.md Open Question 1 — this implementation always uses
    /// `true`, but the knob is kept configurable since the corpus treats it as an open question.
    pub pause_waits_forever: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_stack_depth: 256,
            max_trigger_stack_depth: 64,
            pause_waits_forever: true,
        }
    }
}

impl VmConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_sane_bounds() {
        let cfg = VmConfig::default();
        assert_eq!(cfg.max_call_stack_depth, 256);
        assert!(cfg.pause_waits_forever);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = VmConfig::from_toml("max_call_stack_depth = 32\n").unwrap();
        assert_eq!(cfg.max_call_stack_depth, 32);
        assert_eq!(cfg.max_trigger_stack_depth, 64);
    }
}
